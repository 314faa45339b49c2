//! Template expression rewriting.
//!
//! Free identifiers in template expressions refer to the component instance,
//! so `count + 1` becomes `_ctx.count + 1`. Member names, object keys,
//! literals, allowed globals and local bindings (`v-for` aliases, arrow
//! parameters, `$event`) are left alone.

/// Globals reachable from template expressions without a `_ctx.` prefix.
const ALLOWED_GLOBALS: &[&str] = &[
    "Infinity",
    "undefined",
    "NaN",
    "isFinite",
    "isNaN",
    "parseFloat",
    "parseInt",
    "decodeURI",
    "decodeURIComponent",
    "encodeURI",
    "encodeURIComponent",
    "Math",
    "Number",
    "Date",
    "Array",
    "Object",
    "Boolean",
    "String",
    "RegExp",
    "Map",
    "Set",
    "JSON",
    "Intl",
    "BigInt",
    "console",
    "Error",
    "Symbol",
];

const KEYWORDS: &[&str] = &[
    "true",
    "false",
    "null",
    "this",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "void",
    "delete",
    "await",
    "async",
    "function",
    "return",
    "if",
    "else",
    "var",
    "let",
    "const",
    "class",
    "yield",
];

/// Prefix free identifiers in `expr` with `_ctx.`.
#[must_use]
pub fn prefix_identifiers(expr: &str, locals: &[String]) -> String {
    let mut scope: Vec<String> = locals.to_vec();
    collect_arrow_params(expr, &mut scope);

    let bytes = expr.as_bytes();
    let mut out = String::with_capacity(expr.len() + 16);
    // One entry per open `{`: true for object literals, false for arrow bodies.
    let mut braces: Vec<bool> = Vec::new();
    let mut prev_sig: Option<u8> = None;
    let mut prev_arrow = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'\'' | b'"' => {
                let end = string_end(bytes, i);
                out.push_str(&expr[i..end]);
                prev_sig = Some(b'"');
                prev_arrow = false;
                i = end;
            }
            b'`' => {
                i = copy_template(expr, i, &scope, &mut out);
                prev_sig = Some(b'`');
                prev_arrow = false;
            }
            b'0'..=b'9' => {
                let start = i;
                while i < bytes.len() && (is_ident_byte(bytes[i]) || bytes[i] == b'.') {
                    i += 1;
                }
                out.push_str(&expr[start..i]);
                prev_sig = Some(b'0');
                prev_arrow = false;
            }
            _ if is_ident_start(b) => {
                let start = i;
                while i < bytes.len() && is_ident_byte(bytes[i]) {
                    i += 1;
                }
                let name = &expr[start..i];
                let next = bytes[i..].iter().copied().find(|c| !c.is_ascii_whitespace());
                let in_object = braces.last() == Some(&true);
                let after_separator = matches!(prev_sig, Some(b'{' | b','));

                let member = prev_sig == Some(b'.') && !expr[..start].trim_end().ends_with("...");
                let key = in_object && after_separator && next == Some(b':');
                let shorthand = in_object && after_separator && matches!(next, Some(b',' | b'}'));

                if member || key || is_unprefixed(name, &scope) {
                    out.push_str(name);
                } else if shorthand {
                    out.push_str(name);
                    out.push_str(": _ctx.");
                    out.push_str(name);
                } else {
                    out.push_str("_ctx.");
                    out.push_str(name);
                }
                prev_sig = Some(b'a');
                prev_arrow = false;
            }
            b'{' => {
                braces.push(!prev_arrow);
                out.push('{');
                prev_sig = Some(b);
                prev_arrow = false;
                i += 1;
            }
            b'}' => {
                braces.pop();
                out.push('}');
                prev_sig = Some(b);
                prev_arrow = false;
                i += 1;
            }
            b'=' if bytes.get(i + 1) == Some(&b'>') => {
                out.push_str("=>");
                prev_sig = Some(b'>');
                prev_arrow = true;
                i += 2;
            }
            _ if b.is_ascii_whitespace() => {
                out.push(b as char);
                i += 1;
            }
            _ => {
                // Copy the whole character; multi-byte text only appears here
                // outside identifiers and literals.
                let ch_len = expr[i..].chars().next().map_or(1, char::len_utf8);
                out.push_str(&expr[i..i + ch_len]);
                prev_sig = Some(b);
                prev_arrow = false;
                i += ch_len;
            }
        }
    }

    out
}

/// Whether `expr` names a function to call rather than a statement to run,
/// e.g. `onClick`, `handlers.save`, `() => save(1)` or `function (e) {}`.
#[must_use]
pub fn is_handler_reference(expr: &str) -> bool {
    let expr = expr.trim();
    if expr.starts_with("function") || expr.starts_with("async ") {
        return true;
    }
    if is_member_path(expr) {
        return true;
    }
    // Arrow functions: `x => ...` or `(a, b) => ...`.
    if let Some(arrow) = expr.find("=>") {
        let params = expr[..arrow].trim();
        return (is_member_path(params) && !params.contains('.'))
            || (params.starts_with('(') && params.ends_with(')') && !params[1..].contains('('));
    }
    false
}

/// `a`, `a.b`, `a.b.c` (identifiers joined by dots).
#[must_use]
pub fn is_member_path(expr: &str) -> bool {
    !expr.is_empty()
        && expr.split('.').all(|part| {
            let bytes = part.as_bytes();
            !bytes.is_empty() && is_ident_start(bytes[0]) && bytes.iter().all(|&b| is_ident_byte(b))
        })
}

/// Collect every identifier in `text`, e.g. the aliases of a `v-for`.
#[must_use]
pub fn identifiers(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut names = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if is_ident_start(bytes[i]) {
            let start = i;
            while i < bytes.len() && is_ident_byte(bytes[i]) {
                i += 1;
            }
            names.push(text[start..i].to_string());
        } else {
            i += 1;
        }
    }
    names
}

fn is_unprefixed(name: &str, scope: &[String]) -> bool {
    KEYWORDS.contains(&name) || ALLOWED_GLOBALS.contains(&name) || scope.iter().any(|s| s == name)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

fn is_ident_byte(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

/// Offset just past the string literal opening at `start`.
fn string_end(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Copy the template literal opening at `start`, rewriting its substitutions.
fn copy_template(expr: &str, start: usize, scope: &[String], out: &mut String) -> usize {
    let bytes = expr.as_bytes();
    let mut i = start + 1;
    let mut chunk_start = start;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => {
                out.push_str(&expr[chunk_start..=i]);
                return i + 1;
            }
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                out.push_str(&expr[chunk_start..i + 2]);
                let inner_start = i + 2;
                let inner_end = matching_brace(bytes, inner_start);
                out.push_str(&prefix_identifiers(&expr[inner_start..inner_end], scope));
                if inner_end < bytes.len() {
                    out.push('}');
                }
                i = inner_end + 1;
                chunk_start = i;
            }
            _ => i += 1,
        }
    }

    if chunk_start < bytes.len() {
        out.push_str(&expr[chunk_start..]);
    }
    bytes.len()
}

/// Offset of the `}` closing a substitution whose body starts at `start`.
fn matching_brace(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => i = string_end(bytes, i),
            b'{' => {
                depth += 1;
                i += 1;
            }
            b'}' if depth == 0 => return i,
            b'}' => {
                depth -= 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Add the parameters of every arrow function in `expr` to `scope`.
fn collect_arrow_params(expr: &str, scope: &mut Vec<String>) {
    for (arrow, _) in expr.match_indices("=>") {
        let before = expr[..arrow].trim_end();
        let params = if before.ends_with(')') {
            let mut depth = 0usize;
            let open = before.char_indices().rev().find(|&(_, c)| {
                match c {
                    ')' => depth += 1,
                    '(' => depth -= 1,
                    _ => {}
                }
                depth == 0
            });
            match open {
                Some((p, _)) => &before[p..],
                None => continue,
            }
        } else {
            let start = before
                .rfind(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
                .map_or(0, |p| p + 1);
            &before[start..]
        };
        for name in identifiers(params) {
            // Default values may reference outer names; only take binding names.
            if !scope.contains(&name) {
                scope.push(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefix(expr: &str) -> String {
        prefix_identifiers(expr, &[])
    }

    #[test]
    fn test_simple_identifiers() {
        assert_eq!(prefix("msg"), "_ctx.msg");
        assert_eq!(prefix("count + 1"), "_ctx.count + 1");
        assert_eq!(prefix("ok ? yes : no"), "_ctx.ok ? _ctx.yes : _ctx.no");
    }

    #[test]
    fn test_members_literals_and_globals() {
        assert_eq!(prefix("user.name.first"), "_ctx.user.name.first");
        assert_eq!(prefix("user?.name"), "_ctx.user?.name");
        assert_eq!(prefix("'a' + \"b\" + 1.5"), "'a' + \"b\" + 1.5");
        assert_eq!(prefix("Math.max(a, 0)"), "Math.max(_ctx.a, 0)");
        assert_eq!(prefix("x === null || typeof y === 'undefined'"), "_ctx.x === null || typeof _ctx.y === 'undefined'");
    }

    #[test]
    fn test_object_literals() {
        assert_eq!(prefix("{ active: isActive }"), "{ active: _ctx.isActive }");
        assert_eq!(prefix("{ a, b: c }"), "{ a: _ctx.a, b: _ctx.c }");
        assert_eq!(prefix("{ 'text-danger': err }"), "{ 'text-danger': _ctx.err }");
    }

    #[test]
    fn test_locals_and_arrows() {
        let locals = vec!["item".to_string()];
        assert_eq!(prefix_identifiers("item.id + offset", &locals), "item.id + _ctx.offset");
        assert_eq!(
            prefix("items.filter(i => i.done)"),
            "_ctx.items.filter(i => i.done)"
        );
        assert_eq!(
            prefix("list.map((x, idx) => { return x + idx + base })"),
            "_ctx.list.map((x, idx) => { return x + idx + _ctx.base })"
        );
    }

    #[test]
    fn test_template_literal_substitutions() {
        assert_eq!(prefix("`Hi ${name}!`"), "`Hi ${_ctx.name}!`");
        assert_eq!(prefix("`${a}-${ {k: b}.k }`"), "`${_ctx.a}-${ {k: _ctx.b}.k }`");
    }

    #[test]
    fn test_spread_is_not_member_access() {
        assert_eq!(prefix("[...items]"), "[..._ctx.items]");
    }

    #[test]
    fn test_handler_reference() {
        assert!(is_handler_reference("onClick"));
        assert!(is_handler_reference("handlers.save"));
        assert!(is_handler_reference("() => save(1)"));
        assert!(is_handler_reference("e => save(e)"));
        assert!(is_handler_reference("function (e) { save(e) }"));
        assert!(!is_handler_reference("count++"));
        assert!(!is_handler_reference("save(1)"));
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(identifiers("(item, index)"), vec!["item", "index"]);
        assert_eq!(identifiers("{ id, name }"), vec!["id", "name"]);
    }
}
