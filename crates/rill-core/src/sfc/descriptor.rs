//! Component document parsing.
//!
//! A component document is a file of top-level blocks:
//!
//! ```text
//! <template> ... </template>
//! <script> ... </script>
//! <style scoped> ... </style>
//! ```
//!
//! Only the block boundaries are parsed here; block contents are returned
//! verbatim as slices of the document.

use crate::error::{Error, Result};
use std::path::Path;

/// One top-level block of a component document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<'a> {
    /// Raw text between the opening and closing tags.
    pub content: &'a str,
}

/// Parsed structure of a component document.
///
/// Every part is optional; a document without a template or script is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentDocument<'a> {
    pub script: Option<Block<'a>>,
    pub template: Option<Block<'a>>,
    pub styles: Vec<Block<'a>>,
}

/// Split a component document into its blocks.
///
/// `file` is only used for error messages.
pub fn parse_component<'a>(source: &'a str, file: &Path) -> Result<ComponentDocument<'a>> {
    let mut doc = ComponentDocument::default();
    let bytes = source.as_bytes();
    let mut i = 0;

    while let Some(offset) = source[i..].find('<') {
        let lt = i + offset;

        if source[lt..].starts_with("<!--") {
            i = match source[lt + 4..].find("-->") {
                Some(end) => lt + 4 + end + 3,
                None => return Err(Error::parse(file, "unterminated comment")),
            };
            continue;
        }

        let name_start = lt + 1;
        let name_end = name_start
            + source[name_start..]
                .bytes()
                .take_while(|b| b.is_ascii_alphanumeric() || *b == b'-')
                .count();
        if name_end == name_start {
            // Stray `<` in top-level text.
            i = lt + 1;
            continue;
        }
        let name = &source[name_start..name_end];

        let (_, tag_end, self_closing) = parse_open_tag(source, name_end)
            .ok_or_else(|| Error::parse(file, format!("unterminated <{name}> tag")))?;

        let (content_range, next) = if self_closing {
            (tag_end..tag_end, tag_end)
        } else {
            let close = find_close_tag(source, name, tag_end)
                .ok_or_else(|| Error::parse(file, format!("missing </{name}>")))?;
            let after_close = close
                + source[close..]
                    .find('>')
                    .map_or(bytes.len() - close, |p| p + 1);
            (tag_end..close, after_close)
        };

        let block = Block {
            content: &source[content_range],
        };

        match name {
            "script" => {
                if doc.script.is_some() {
                    return Err(Error::parse(file, "multiple <script> blocks"));
                }
                doc.script = Some(block);
            }
            "template" => {
                if doc.template.is_some() {
                    return Err(Error::parse(file, "multiple <template> blocks"));
                }
                doc.template = Some(block);
            }
            "style" => doc.styles.push(block),
            // Custom blocks are skipped.
            _ => {}
        }

        i = next;
    }

    Ok(doc)
}

pub(crate) type Attrs<'a> = Vec<(&'a str, Option<&'a str>)>;

/// Parse attributes from `start` to the end of an opening tag.
///
/// Returns the attributes, the offset just past `>`, and whether the tag was
/// self-closing.
pub(crate) fn parse_open_tag(source: &str, start: usize) -> Option<(Attrs<'_>, usize, bool)> {
    let bytes = source.as_bytes();
    let mut attrs = Vec::new();
    let mut i = start;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i)? {
            b'>' => return Some((attrs, i + 1, false)),
            b'/' if bytes.get(i + 1) == Some(&b'>') => return Some((attrs, i + 2, true)),
            _ => {}
        }

        let key_start = i;
        while i < bytes.len() && !matches!(bytes[i], b'=' | b'>' | b'/') && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let key = &source[key_start..i];
        if key.is_empty() {
            // Lone `/` not followed by `>`.
            i += 1;
            continue;
        }

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if bytes.get(i) != Some(&b'=') {
            attrs.push((key, None));
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let value = match *bytes.get(i)? {
            q @ (b'"' | b'\'') => {
                let end = i + 1 + source[i + 1..].find(q as char)?;
                let value = &source[i + 1..end];
                i = end + 1;
                value
            }
            _ => {
                let value_start = i;
                while i < bytes.len() && bytes[i] != b'>' && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                &source[value_start..i]
            }
        };
        attrs.push((key, Some(value)));
    }
}

/// Offset of the `</name` that closes a block whose content starts at `from`.
///
/// Nested openings are only counted for `<template>`, which may contain inner
/// `<template v-if>` elements. Script and style content is raw text.
fn find_close_tag(source: &str, name: &str, from: usize) -> Option<usize> {
    let open = format!("<{name}");
    let close = format!("</{name}");
    let nests = name == "template";
    let mut depth = 0usize;
    let mut i = from;

    loop {
        let next_close = i + source[i..].find(&close)?;
        let next_open = source[i..next_close]
            .match_indices(&open)
            .map(|(p, _)| i + p)
            .find(|&p| nests && is_tag_boundary(source, p + open.len()));

        if let Some(p) = next_open {
            // Self-closing inner tags do not nest.
            let self_closing = parse_open_tag(source, p + open.len()).is_some_and(|(_, _, sc)| sc);
            if !self_closing {
                depth += 1;
            }
            i = p + open.len();
            continue;
        }

        if depth == 0 {
            return Some(next_close);
        }
        depth -= 1;
        i = next_close + close.len();
    }
}

fn is_tag_boundary(source: &str, at: usize) -> bool {
    source
        .as_bytes()
        .get(at)
        .map_or(true, |b| b.is_ascii_whitespace() || *b == b'>' || *b == b'/')
}
