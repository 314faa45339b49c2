//! The dev server request handler.
//!
//! [`DevServer`] is transport-independent: it maps a [`DevRequest`] (path and
//! raw query) to a [`DevResponse`] (status, media type, body). Every request
//! re-reads its files from disk; nothing is cached between requests.

use crate::config::ServerConfig;
use crate::dev::component;
use crate::dev::resolve::PackageResolver;
use crate::dev::rewrite::rewrite_imports;
use crate::dev::route::{is_script_path, Route, StaticKind, JAVASCRIPT};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// An incoming request, reduced to what routing needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevRequest {
    /// URL path as sent by the client (percent-encoded).
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
}

impl DevRequest {
    #[must_use]
    pub fn new(path: impl Into<String>, query: Option<&str>) -> Self {
        Self {
            path: path.into(),
            query: query.map(str::to_string),
        }
    }
}

/// A response ready to be written by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl DevResponse {
    fn ok(content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type,
            body,
        }
    }

    /// Body as UTF-8 text, lossily.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Serves one project root.
#[derive(Debug, Clone)]
pub struct DevServer {
    root: PathBuf,
    config: ServerConfig,
    resolver: PackageResolver,
}

impl DevServer {
    /// Create a server for `root` (expected to be absolute).
    #[must_use]
    pub fn new(root: PathBuf, config: ServerConfig) -> Self {
        let resolver = PackageResolver::new(&root, &config.modules_dir);
        Self {
            root,
            config,
            resolver,
        }
    }

    /// Handle `request`, turning any error into an error response.
    ///
    /// Error bodies for script requests are `console.error(...)` statements so
    /// the failure shows up in the browser console.
    pub async fn respond(&self, request: &DevRequest) -> DevResponse {
        let route = match Route::parse(&request.path, request.query.as_deref(), &self.config) {
            Ok(route) => route,
            Err(err) => {
                let script = is_script_path(&request.path, &self.config);
                return error_response(request, script, &err);
            }
        };
        match self.serve(request, &route).await {
            Ok(response) => response,
            Err(err) => error_response(request, route.is_script(&self.config), &err),
        }
    }

    /// Handle `request`, returning errors to the caller.
    pub async fn handle(&self, request: &DevRequest) -> Result<DevResponse> {
        let route = Route::parse(&request.path, request.query.as_deref(), &self.config)?;
        self.serve(request, &route).await
    }

    async fn serve(&self, request: &DevRequest, route: &Route) -> Result<DevResponse> {
        let content_type = route.content_type(&self.config);
        tracing::debug!(path = %request.path, ?route, "routed request");

        let body = match route {
            Route::Module { name } => {
                let entry = self.resolver.resolve(name).await?;
                if route.is_script(&self.config) {
                    let code = read_text(&entry).await?;
                    rewrite_imports(&code).into_owned().into_bytes()
                } else {
                    read_bytes(&entry).await?
                }
            }
            Route::Component { path, part } => {
                let file = self.root.join(path);
                let source = read_text(&file).await?;
                let request_path = format!("/{}", request.path.trim_start_matches('/'));
                component::render_part(&source, &file, &request_path, *part)?.into_bytes()
            }
            Route::Static {
                path,
                kind: StaticKind::Script,
            } => {
                let code = read_text(&self.root.join(path)).await?;
                rewrite_imports(&code).into_owned().into_bytes()
            }
            Route::Static {
                path,
                kind: StaticKind::Raw,
            } => read_bytes(&self.root.join(path)).await?,
        };

        Ok(DevResponse::ok(content_type, body))
    }
}

fn error_response(request: &DevRequest, script: bool, err: &Error) -> DevResponse {
    let status = err.status();
    tracing::warn!(path = %request.path, status, error = %err, "request failed");

    let message = err.to_string();
    let (content_type, body) = if script {
        (JAVASCRIPT, console_error(&message))
    } else {
        ("text/plain; charset=utf-8", message)
    };
    DevResponse {
        status,
        content_type,
        body: body.into_bytes(),
    }
}

async fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound {
            path: path.to_path_buf(),
        },
        _ => Error::Io(e),
    })
}

async fn read_text(path: &Path) -> Result<String> {
    let bytes = read_bytes(path).await?;
    String::from_utf8(bytes).map_err(|_| Error::parse(path, "file is not valid UTF-8"))
}

/// `console.error('<message>');` with the message escaped for a single-quoted string.
fn console_error(message: &str) -> String {
    let escaped = message
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace('\r', "\\r");
    format!("console.error('{escaped}');")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_error_escaping() {
        assert_eq!(
            console_error("can't parse\nC:\\x"),
            r"console.error('can\'t parse\nC:\\x');"
        );
    }

    #[test]
    fn test_request_constructor() {
        let req = DevRequest::new("/App.vue", Some("type=template"));
        assert_eq!(req.path, "/App.vue");
        assert_eq!(req.query.as_deref(), Some("type=template"));
    }

    #[tokio::test]
    async fn test_error_body_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let server = DevServer::new(dir.path().to_path_buf(), ServerConfig::default());

        let res = server.respond(&DevRequest::new("/missing.js", None)).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.content_type, JAVASCRIPT);
        assert!(res.text().starts_with("console.error('Not found: "));

        let res = server.respond(&DevRequest::new("/missing.css", None)).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.content_type, "text/plain; charset=utf-8");
        assert!(res.text().starts_with("Not found: "));

        let res = server.respond(&DevRequest::new("/App.vue", Some("type=bogus"))).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.content_type, JAVASCRIPT);
    }

    #[tokio::test]
    async fn test_style_error_body_is_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let server = DevServer::new(dir.path().to_path_buf(), ServerConfig::default());

        let res = server
            .respond(&DevRequest::new("/Missing.vue", Some("type=style")))
            .await;
        assert_eq!(res.status, 404);
        assert_eq!(res.content_type, "text/plain; charset=utf-8");
        assert!(res.text().starts_with("Not found: "));

        let res = server
            .respond(&DevRequest::new("/Missing.vue", Some("type=template")))
            .await;
        assert_eq!(res.status, 404);
        assert_eq!(res.content_type, JAVASCRIPT);
    }

    #[tokio::test]
    async fn test_deep_import_of_stylesheet_is_served_raw() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("node_modules/ui/dist");
        std::fs::create_dir_all(&pkg).unwrap();
        std::fs::write(pkg.join("style.css"), "@import 'base.css';\n.btn {}\n").unwrap();
        let server = DevServer::new(dir.path().to_path_buf(), ServerConfig::default());

        let res = server
            .respond(&DevRequest::new("/@modules/ui/dist/style.css", None))
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.content_type, "text/css; charset=utf-8");
        assert_eq!(res.text(), "@import 'base.css';\n.btn {}\n");

        let res = server
            .respond(&DevRequest::new("/@modules/ui/dist/missing.css", None))
            .await;
        assert_eq!(res.status, 404);
        assert_eq!(res.content_type, "text/plain; charset=utf-8");
    }
}
