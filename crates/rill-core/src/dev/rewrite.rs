//! Import rewriting for unbundled dev serving.
//!
//! Bare specifiers (`vue`) become `/@modules/vue` so the browser's module
//! loader sends them back to the dev server. Relative and absolute paths are
//! left exactly as written.

use crate::dev::patch::{self, Replacement};
use crate::imports::{scan_imports, ImportSpecifier};
use std::borrow::Cow;

/// URL prefix under which installed packages are served.
pub const MODULES_PREFIX: &str = "/@modules/";

/// Rewrite bare import specifiers in `code`.
///
/// Returns the input slice itself when nothing needs rewriting.
#[must_use]
pub fn rewrite_imports(code: &str) -> Cow<'_, str> {
    let specifiers = scan_imports(code);
    let replacements = bare_replacements(&specifiers);

    if replacements.is_empty() {
        return Cow::Borrowed(code);
    }

    Cow::Owned(patch::apply(code, &replacements))
}

/// Replacements that prefix every bare specifier with [`MODULES_PREFIX`].
#[must_use]
pub fn bare_replacements(specifiers: &[ImportSpecifier<'_>]) -> Vec<Replacement> {
    specifiers
        .iter()
        .filter(|spec| spec.is_bare())
        .map(|spec| {
            Replacement::new(
                spec.start,
                spec.end,
                format!("{MODULES_PREFIX}{}", spec.specifier),
            )
        })
        .collect()
}
