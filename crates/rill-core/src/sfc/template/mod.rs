//! Template compilation.
//!
//! Compiles the markup of a `<template>` block into an ES module that
//! exports `render(_ctx, _cache)`:
//!
//! ```text
//! <p>{{ msg }}</p>
//!   =>
//! import { toDisplayString as _toDisplayString, ... } from "vue"
//! export function render(_ctx, _cache) {
//!   return _createElementVNode("p", null, _toDisplayString(_ctx.msg))
//! }
//! ```

mod codegen;
mod expr;
mod parse;

pub use expr::prefix_identifiers;
pub use parse::{parse_template, Element, Node};

use crate::error::{Error, Result};
use std::path::Path;

/// Compile template markup into a render module.
///
/// `file` names the component in parse errors.
pub fn compile_template(source: &str, file: &Path) -> Result<String> {
    let nodes = parse_template(source).map_err(|message| Error::parse(file, message))?;
    codegen::Codegen::default()
        .generate(&nodes)
        .map_err(|message| Error::parse(file, message))
}

/// Render module for a component without a template.
#[must_use]
pub fn empty_render() -> String {
    "export function render(_ctx, _cache) {\n  return null\n}\n".to_string()
}
