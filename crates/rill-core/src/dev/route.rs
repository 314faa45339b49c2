//! Request routing.
//!
//! Maps a URL path and raw query string to a [`Route`]. The `?type=`
//! discriminator of component requests is parsed here, once, into a
//! [`SubResource`]; nothing downstream looks at the query string again.

use crate::config::ServerConfig;
use crate::dev::resolve::package_name;
use crate::dev::rewrite::MODULES_PREFIX;
use crate::error::{Error, Result};
use std::path::PathBuf;

/// Which logical resource of a component file is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubResource {
    /// The driver module (no `type` parameter).
    Plain,
    /// `?type=template`: the compiled render module.
    Template,
    /// `?type=style[&index=N]`: raw CSS of the `index`-th style block.
    Style { index: usize },
}

impl SubResource {
    /// Parse the discriminator from a raw query string.
    ///
    /// Parameters other than `type` and `index` are ignored, so cache-busting
    /// queries like `?t=123` still select the driver.
    pub fn from_query(query: Option<&str>) -> Result<Self> {
        let mut kind = None;
        let mut index = None;
        for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                "type" => kind = Some(value.into_owned()),
                "index" => index = Some(value.into_owned()),
                _ => {}
            }
        }

        match kind.as_deref() {
            None | Some("") => Ok(Self::Plain),
            Some("template") => Ok(Self::Template),
            Some("style") => {
                let index = match index {
                    Some(raw) => raw
                        .parse()
                        .map_err(|_| Error::BadRequest(format!("invalid style index '{raw}'")))?,
                    None => 0,
                };
                Ok(Self::Style { index })
            }
            Some(other) => Err(Error::BadRequest(format!(
                "unknown sub-resource type '{other}'"
            ))),
        }
    }

    /// Media type of this part of a component.
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Plain | Self::Template => JAVASCRIPT,
            Self::Style { .. } => "text/css; charset=utf-8",
        }
    }
}

/// How a non-component file is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticKind {
    /// Read as UTF-8 and passed through the import rewriter.
    Script,
    /// Served byte for byte.
    Raw,
}

/// A routed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/@modules/<name>`: an installed package's ESM entry.
    Module { name: String },
    /// A component document and the part of it requested.
    Component { path: PathBuf, part: SubResource },
    /// Any other file under the root.
    Static { path: PathBuf, kind: StaticKind },
}

pub(crate) const JAVASCRIPT: &str = "application/javascript; charset=utf-8";

impl Route {
    /// Route `path` (as sent by the client, percent-encoded) and `query`.
    ///
    /// Returned paths are relative to the served root.
    pub fn parse(path: &str, query: Option<&str>, config: &ServerConfig) -> Result<Self> {
        let decoded = percent_decode(path).ok_or_else(|| not_found(path))?;
        let trimmed = decoded.trim_start_matches('/');

        if let Some(name) = decoded.strip_prefix(MODULES_PREFIX) {
            if name.is_empty() || !is_safe(name) {
                return Err(not_found(path));
            }
            return Ok(Self::Module {
                name: name.to_string(),
            });
        }

        let relative = if trimmed.is_empty() {
            config.index.trim_start_matches('/')
        } else {
            trimmed
        };
        if !is_safe(relative) {
            return Err(not_found(path));
        }

        let ext = extension(relative);
        if config.is_component_ext(ext) {
            return Ok(Self::Component {
                path: PathBuf::from(relative),
                part: SubResource::from_query(query)?,
            });
        }

        let kind = if config.is_script_ext(ext) {
            StaticKind::Script
        } else {
            StaticKind::Raw
        };
        Ok(Self::Static {
            path: PathBuf::from(relative),
            kind,
        })
    }

    /// Media type of the response body for this route.
    #[must_use]
    pub fn content_type(&self, config: &ServerConfig) -> &'static str {
        match self {
            Self::Module { name } => match deep_import_extension(name) {
                "" => JAVASCRIPT,
                ext => content_type_for(ext, config),
            },
            Self::Component { part, .. } => part.content_type(),
            Self::Static { path, .. } => {
                content_type_for(path.to_str().map_or("", extension), config)
            }
        }
    }

    /// Whether this route serves JavaScript: its body goes through the
    /// import rewriter and its error bodies are `console.error` statements.
    #[must_use]
    pub fn is_script(&self, config: &ServerConfig) -> bool {
        match self {
            Self::Module { name } => {
                let ext = deep_import_extension(name);
                ext.is_empty() || config.is_script_ext(ext)
            }
            Self::Component { part, .. } => !matches!(part, SubResource::Style { .. }),
            Self::Static { kind, .. } => *kind == StaticKind::Script,
        }
    }
}

/// Whether a request path names something served as JavaScript, judged by
/// its prefix and extension alone. Used when routing itself failed.
#[must_use]
pub fn is_script_path(path: &str, config: &ServerConfig) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    if path.starts_with(MODULES_PREFIX) {
        return true;
    }
    let ext = extension(path);
    config.is_script_ext(ext) || config.is_component_ext(ext)
}

/// Media type for a file extension (without the dot).
#[must_use]
pub fn content_type_for(ext: &str, config: &ServerConfig) -> &'static str {
    if config.is_script_ext(ext) || config.is_component_ext(ext) {
        return JAVASCRIPT;
    }
    match ext {
        "css" => "text/css; charset=utf-8",
        "json" => "application/json; charset=utf-8",
        "ico" => "image/x-icon; charset=utf-8",
        "svg" => "image/svg+xml; charset=utf-8",
        "png" => "image/png; charset=utf-8",
        _ => "text/html; charset=utf-8",
    }
}

/// Extension of a deep package import such as `pkg/dist/style.css`.
/// Empty for bare package names, whose entry is always an ES module.
fn deep_import_extension(name: &str) -> &str {
    if package_name(name) == name {
        ""
    } else {
        extension(name)
    }
}

fn extension(path: &str) -> &str {
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rfind('.') {
        Some(dot) if dot > 0 => &file[dot + 1..],
        _ => "",
    }
}

/// Reject parent-directory segments, NUL bytes and backslashes.
fn is_safe(path: &str) -> bool {
    !path.contains('\0') && !path.contains('\\') && path.split('/').all(|segment| segment != "..")
}

fn not_found(path: &str) -> Error {
    Error::NotFound {
        path: PathBuf::from(path),
    }
}

/// Decode `%XX` escapes. `None` if the result is not UTF-8.
fn percent_decode(path: &str) -> Option<String> {
    if !path.contains('%') {
        return Some(path.to_string());
    }
    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escaped = (bytes[i] == b'%')
            .then(|| path.get(i + 1..i + 3))
            .flatten()
            .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        match escaped {
            Some(byte) => {
                out.push(byte);
                i += 3;
            }
            None => {
                out.push(bytes[i]);
                i += 1;
            }
        }
    }
    String::from_utf8(out).ok()
}
