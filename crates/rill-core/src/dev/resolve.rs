//! Package resolution for `/@modules/` requests.
//!
//! A bare name is looked up in `<root>/<modules_dir>/<name>/package.json` and
//! resolved through the manifest's `module` field. Only ESM entries are
//! served; `main` is never consulted.

use crate::error::{Error, ResolutionReason, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The parts of `package.json` the resolver reads.
#[derive(Debug, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    module: Option<String>,
}

/// Resolves bare package names to entry files under the modules directory.
#[derive(Debug, Clone)]
pub struct PackageResolver {
    modules_dir: PathBuf,
}

impl PackageResolver {
    /// Resolver for packages installed in `root/modules_dir`.
    #[must_use]
    pub fn new(root: &Path, modules_dir: &str) -> Self {
        Self {
            modules_dir: root.join(modules_dir),
        }
    }

    /// Resolve `specifier` (`vue`, `@scope/pkg`, `pkg/dist/file.js`) to a file.
    ///
    /// Deep imports name a file inside the package and skip the manifest.
    /// The returned path is not checked for existence.
    pub async fn resolve(&self, specifier: &str) -> Result<PathBuf> {
        let package = package_name(specifier);
        let package_dir = self.modules_dir.join(package);
        let subpath = specifier[package.len()..].trim_start_matches('/');
        if !subpath.is_empty() {
            return Ok(package_dir.join(subpath));
        }

        let manifest_path = package_dir.join("package.json");
        let raw = match tokio::fs::read_to_string(&manifest_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(resolution(package, ResolutionReason::ManifestMissing(manifest_path)));
            }
            Err(e) => {
                return Err(resolution(package, ResolutionReason::ManifestInvalid(e.to_string())));
            }
        };

        let manifest: PackageManifest = serde_json::from_str(&raw)
            .map_err(|e| resolution(package, ResolutionReason::ManifestInvalid(e.to_string())))?;
        let entry = manifest
            .module
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| resolution(package, ResolutionReason::NoEsmEntry))?;

        tracing::debug!(package, entry = %entry, "resolved package entry");
        Ok(package_dir.join(entry.trim_start_matches("./")))
    }
}

/// Package portion of a specifier: `@scope/pkg/sub` → `@scope/pkg`, `pkg/sub` → `pkg`.
#[must_use]
pub fn package_name(specifier: &str) -> &str {
    let segments = if specifier.starts_with('@') { 2 } else { 1 };
    match specifier.match_indices('/').nth(segments - 1) {
        Some((slash, _)) => &specifier[..slash],
        None => specifier,
    }
}

fn resolution(package: &str, reason: ResolutionReason) -> Error {
    Error::Resolution {
        package: package.to_string(),
        reason,
    }
}
