//! Import discovery for JavaScript modules.
//!
//! Provides a lexical scanner that locates import/export specifiers with
//! exact byte offsets.

mod scan;

pub use scan::{
    is_bare_specifier, scan_imports, scan_module, ImportKind, ImportSpecifier, ModuleScan,
};
