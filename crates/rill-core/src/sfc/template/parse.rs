//! Template markup parser.
//!
//! Produces a small element tree: elements, text, and `{{ }}` interpolations.
//! Comments are dropped. Whitespace is condensed the way browsers render it.

use crate::sfc::descriptor::parse_open_tag;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<'a> {
    Element(Element<'a>),
    /// Decoded, whitespace-condensed text.
    Text(String),
    /// Expression inside `{{ }}`, trimmed.
    Interpolation(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element<'a> {
    pub tag: &'a str,
    pub attrs: Vec<(&'a str, Option<&'a str>)>,
    pub children: Vec<Node<'a>>,
}

impl<'a> Element<'a> {
    /// Value of the first attribute named `name`.
    pub fn attr(&self, name: &str) -> Option<Option<&'a str>> {
        self.attrs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }
}

/// Parse template markup into a list of root nodes.
pub fn parse_template(source: &str) -> Result<Vec<Node<'_>>, String> {
    let mut stack: Vec<Element<'_>> = Vec::new();
    let mut roots: Vec<Node<'_>> = Vec::new();
    let mut i = 0;

    while i < source.len() {
        let rest = &source[i..];

        if rest.starts_with("<!--") {
            let end = rest[4..]
                .find("-->")
                .ok_or_else(|| "unterminated comment".to_string())?;
            i += 4 + end + 3;
            continue;
        }

        if let Some(after) = rest.strip_prefix("</") {
            let name_len = tag_name_len(after);
            let name = &after[..name_len];
            let gt = after.find('>').ok_or_else(|| format!("unterminated </{name}>"))?;
            let element = stack
                .pop()
                .ok_or_else(|| format!("unexpected closing tag </{name}>"))?;
            if element.tag != name {
                return Err(format!(
                    "mismatched closing tag </{name}>, expected </{}>",
                    element.tag
                ));
            }
            push_node(&mut stack, &mut roots, Node::Element(element));
            i += 2 + gt + 1;
            continue;
        }

        if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            let name_len = tag_name_len(&rest[1..]);
            let tag = &rest[1..=name_len];
            let (attrs, tag_end, self_closing) = parse_open_tag(source, i + 1 + name_len)
                .ok_or_else(|| format!("unterminated <{tag}> tag"))?;
            let element = Element {
                tag,
                attrs,
                children: Vec::new(),
            };
            if self_closing || VOID_ELEMENTS.contains(&tag) {
                push_node(&mut stack, &mut roots, Node::Element(element));
            } else {
                stack.push(element);
            }
            i = tag_end;
            continue;
        }

        if let Some(after) = rest.strip_prefix("{{") {
            let end = after
                .find("}}")
                .ok_or_else(|| "unterminated interpolation".to_string())?;
            let expr = after[..end].trim();
            if expr.is_empty() {
                return Err("empty interpolation".to_string());
            }
            push_node(&mut stack, &mut roots, Node::Interpolation(expr));
            i += 2 + end + 2;
            continue;
        }

        // Text runs until the next tag or interpolation.
        let len = rest
            .char_indices()
            .skip(1)
            .find(|&(p, _)| rest[p..].starts_with('<') || rest[p..].starts_with("{{"))
            .map_or(rest.len(), |(p, _)| p);
        push_text(&mut stack, &mut roots, &rest[..len]);
        i += len;
    }

    if let Some(open) = stack.last() {
        return Err(format!("unclosed <{}>", open.tag));
    }

    condense_whitespace(&mut roots);
    Ok(roots)
}

fn tag_name_len(s: &str) -> usize {
    s.bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':'))
        .count()
}

fn push_node<'a>(stack: &mut [Element<'a>], roots: &mut Vec<Node<'a>>, node: Node<'a>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn push_text<'a>(stack: &mut [Element<'a>], roots: &mut Vec<Node<'a>>, raw: &str) {
    let siblings = match stack.last_mut() {
        Some(parent) => &mut parent.children,
        None => roots,
    };
    let text = decode_entities(raw);
    if let Some(Node::Text(prev)) = siblings.last_mut() {
        prev.push_str(&text);
    } else {
        siblings.push(Node::Text(text));
    }
}

/// Drop whitespace-only text that separates elements and collapse runs of
/// whitespace inside text to a single space.
fn condense_whitespace(nodes: &mut Vec<Node<'_>>) {
    let len = nodes.len();
    let mut keep = vec![true; len];

    for idx in 0..len {
        match &mut nodes[idx] {
            Node::Text(text) => {
                if text.bytes().all(|b| b.is_ascii_whitespace()) {
                    let at_edge = idx == 0 || idx + 1 == len;
                    if at_edge || text.contains('\n') {
                        keep[idx] = false;
                    } else {
                        *text = " ".to_string();
                    }
                } else {
                    *text = collapse(text);
                }
            }
            Node::Element(el) => {
                if el.tag != "pre" && el.tag != "textarea" {
                    condense_whitespace(&mut el.children);
                }
            }
            Node::Interpolation(_) => {}
        }
    }

    let mut flags = keep.into_iter();
    nodes.retain(|_| flags.next().unwrap_or(true));
}

fn collapse(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_ws = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_ws {
                out.push(' ');
            }
            in_ws = true;
        } else {
            out.push(c);
            in_ws = false;
        }
    }
    out
}

/// Decode the HTML character references that commonly appear in templates.
pub(crate) fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &rest[1..semi];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| entity.strip_prefix('#').map(str::parse::<u32>))
                    .and_then(Result::ok)
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
