pub mod dev;
pub mod rewrite;
pub mod version;
