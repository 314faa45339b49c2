//! Unbundled dev serving.
//!
//! - `patch`: byte-range patching of source text
//! - `rewrite`: bare specifiers → `/@modules/<name>`
//! - `component`: driver / template / style decomposition of component files
//! - `resolve`: `/@modules/` package lookup
//! - `route`: URL → [`Route`]
//! - `server`: the request handler

pub mod component;
pub mod patch;
pub mod resolve;
pub mod rewrite;
pub mod route;
pub mod server;

pub use component::render_part;
pub use patch::{apply, Replacement};
pub use resolve::{package_name, PackageResolver};
pub use rewrite::{rewrite_imports, MODULES_PREFIX};
pub use route::{content_type_for, Route, StaticKind, SubResource};
pub use server::{DevRequest, DevResponse, DevServer};
