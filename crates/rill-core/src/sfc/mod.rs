//! Single-file component support: block splitting and template compilation.

pub mod descriptor;
pub mod template;

pub use descriptor::{parse_component, Block, ComponentDocument};
pub use template::{compile_template, empty_render};
