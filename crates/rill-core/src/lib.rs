#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::return_self_not_must_use)]

pub mod config;
pub mod dev;
pub mod error;
pub mod imports;
pub mod sfc;
pub mod version;

pub use config::{Config, ServerConfig};
pub use dev::{DevRequest, DevResponse, DevServer, Route, SubResource};
pub use error::{Error, ResolutionReason, Result};
pub use imports::{scan_imports, scan_module, ImportKind, ImportSpecifier};
pub use version::VERSION;
