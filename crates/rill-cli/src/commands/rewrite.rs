//! `rill rewrite` - print one file exactly as the dev server would serve it.

use miette::{miette, IntoDiagnostic, Result};
use rill_core::config::{load_server_config, ServerConfig};
use rill_core::{DevRequest, DevServer};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Which part of a component file to print.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    Template,
    Style,
}

pub fn run(cwd: &Path, file: &Path, part: Option<Part>, index: Option<usize>) -> Result<()> {
    let cwd = dunce::canonicalize(cwd).into_diagnostic()?;
    let file = dunce::canonicalize(cwd.join(file)).into_diagnostic()?;

    // Files outside the project are served from their own directory.
    let root = if file.starts_with(&cwd) {
        cwd
    } else {
        file.parent().map_or_else(|| PathBuf::from("/"), Path::to_path_buf)
    };
    let config = load_server_config(&root, None)
        .into_diagnostic()?
        .map_or_else(ServerConfig::default, |(_, config)| config);

    let request = DevRequest {
        path: request_path(&root, &file)?,
        query: query(part, index),
    };
    tracing::debug!(path = %request.path, query = ?request.query, "rewriting");

    let server = DevServer::new(root, config);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;
    let response = runtime.block_on(server.handle(&request)).into_diagnostic()?;

    std::io::stdout().write_all(&response.body).into_diagnostic()?;
    Ok(())
}

/// `/`-separated URL path of `file` relative to `root`.
fn request_path(root: &Path, file: &Path) -> Result<String> {
    let rel = file
        .strip_prefix(root)
        .map_err(|_| miette!("{} is not under {}", file.display(), root.display()))?;
    let segments: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(format!("/{}", segments.join("/")))
}

fn query(part: Option<Part>, index: Option<usize>) -> Option<String> {
    match part? {
        Part::Template => Some("type=template".to_string()),
        Part::Style => Some(format!("type=style&index={}", index.unwrap_or(0))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query() {
        assert_eq!(query(None, Some(2)), None);
        assert_eq!(query(Some(Part::Template), None).as_deref(), Some("type=template"));
        assert_eq!(query(Some(Part::Style), Some(1)).as_deref(), Some("type=style&index=1"));
    }

    #[test]
    fn test_request_path() {
        let root = Path::new("/project");
        assert_eq!(
            request_path(root, Path::new("/project/src/App.vue")).unwrap(),
            "/src/App.vue"
        );
        assert!(request_path(root, Path::new("/elsewhere/x.js")).is_err());
    }
}
