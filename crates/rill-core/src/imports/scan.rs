//! Import specifier scanner.
//!
//! Scans JavaScript module source for import/export specifiers without full
//! parsing. The scanner walks the source bytes once, skipping comments, string
//! literals, template literals and regex literals, so that text which only
//! looks like an import is never reported.
//!
//! Offsets are byte offsets into the scanned source and point at the specifier
//! text itself (quotes excluded): `&source[spec.start..spec.end] == spec.specifier`.

use std::ops::Range;

/// How a specifier was referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// `import x from "y"` or `import "y"`.
    Static,
    /// `import("y")`.
    Dynamic,
    /// `export { x } from "y"` or `export * from "y"`.
    ReExport,
}

/// Import specifier found in source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSpecifier<'a> {
    /// Byte offset of the first character of the specifier.
    pub start: usize,
    /// Byte offset one past the last character of the specifier.
    pub end: usize,
    /// Specifier exactly as written.
    pub specifier: &'a str,
    /// Kind of reference.
    pub kind: ImportKind,
}

impl ImportSpecifier<'_> {
    /// Whether this specifier names an installed package rather than a path.
    ///
    /// Relative (`./x`, `../x`) and absolute (`/x`) paths are not bare, and
    /// neither are URLs.
    #[must_use]
    pub fn is_bare(&self) -> bool {
        is_bare_specifier(self.specifier)
    }
}

/// Check if a specifier is a bare import (not relative, not absolute, not a URL).
#[must_use]
pub fn is_bare_specifier(specifier: &str) -> bool {
    !specifier.is_empty()
        && !specifier.starts_with('.')
        && !specifier.starts_with('/')
        && !specifier.starts_with("data:")
        && !specifier.contains("://")
}

/// Everything the scanner learns about a module in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleScan<'a> {
    /// Specifiers in source order. Not deduplicated.
    pub specifiers: Vec<ImportSpecifier<'a>>,
    /// Byte range of the first `export default` marker, if any.
    pub default_export: Option<Range<usize>>,
}

/// Scan source code for import/export specifiers.
#[must_use]
pub fn scan_imports(source: &str) -> Vec<ImportSpecifier<'_>> {
    scan_module(source).specifiers
}

/// Scan source code for specifiers and the `export default` marker.
#[must_use]
pub fn scan_module(source: &str) -> ModuleScan<'_> {
    let mut scanner = Scanner::new(source);
    scanner.run();
    scanner.out
}

/// Keywords after which a `/` starts a regex literal rather than a division.
const REGEX_PREFIX_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
];

/// Keywords whose parenthesised head is followed by a statement, not an operand.
const CONTROL_KEYWORDS: &[&str] = &["if", "while", "for", "with"];

/// Keywords after which `{` starts an object literal rather than a block.
const EXPRESSION_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "yield",
    "await",
    "default",
];

struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    /// Whether the previous token allows a regex to follow.
    allow_regex: bool,
    /// Last byte of the previous significant token.
    last_sig: u8,
    /// The previous token when it was a word, otherwise empty.
    last_word: &'a str,
    /// One entry per open `(`: whether it opens a control-statement head.
    parens: Vec<bool>,
    /// One entry per open `{`: whether it opens a block rather than an expression.
    braces: Vec<bool>,
    brace_depth: usize,
    /// Brace depths at which open `${` substitutions return to template text.
    template_stack: Vec<usize>,
    out: ModuleScan<'a>,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            allow_regex: true,
            last_sig: b';',
            last_word: "",
            parens: Vec::new(),
            braces: Vec::new(),
            brace_depth: 0,
            template_stack: Vec::new(),
            out: ModuleScan::default(),
        }
    }

    fn run(&mut self) {
        while self.pos < self.bytes.len() {
            let ch = self.bytes[self.pos];
            match ch {
                b' ' | b'\t' | b'\r' | b'\n' => self.pos += 1,
                b'/' if self.peek(1) == Some(b'/') => self.pos = skip_line_comment(self.bytes, self.pos),
                b'/' if self.peek(1) == Some(b'*') => self.pos = skip_block_comment(self.bytes, self.pos),
                b'/' if self.allow_regex => {
                    self.pos = skip_regex(self.bytes, self.pos);
                    self.token_end(b'/', false);
                }
                b'\'' | b'"' => {
                    self.pos = skip_string(self.bytes, self.pos) + 1;
                    self.token_end(ch, false);
                }
                b'`' => {
                    self.pos += 1;
                    self.scan_template_text();
                }
                b'{' => {
                    let block = self.brace_opens_block();
                    self.braces.push(block);
                    self.brace_depth += 1;
                    self.pos += 1;
                    self.token_end(ch, true);
                }
                b'}' => {
                    self.pos += 1;
                    let block = self.braces.pop().unwrap_or(false);
                    if self.template_stack.last() == Some(&self.brace_depth) {
                        self.template_stack.pop();
                        self.brace_depth = self.brace_depth.saturating_sub(1);
                        self.scan_template_text();
                    } else {
                        self.brace_depth = self.brace_depth.saturating_sub(1);
                        self.token_end(ch, block);
                    }
                }
                b'(' => {
                    let control = self.last_sig == b'a' && CONTROL_KEYWORDS.contains(&self.last_word);
                    self.parens.push(control);
                    self.pos += 1;
                    self.token_end(ch, true);
                }
                b')' => {
                    self.pos += 1;
                    let control = self.parens.pop().unwrap_or(false);
                    self.token_end(ch, control);
                }
                b']' => {
                    self.pos += 1;
                    self.token_end(ch, false);
                }
                b'+' | b'-' if self.peek(1) == Some(ch) => {
                    // Postfix `x++` ends an operand; prefix `++x` still expects one.
                    self.pos += 2;
                    let allow = self.allow_regex;
                    self.token_end(ch, allow);
                }
                b'0'..=b'9' => {
                    while self.pos < self.bytes.len() && is_ident_byte(self.bytes[self.pos]) {
                        self.pos += 1;
                    }
                    self.token_end(b'0', false);
                }
                _ if is_ident_start(ch) => self.scan_word(),
                _ => {
                    self.pos += 1;
                    self.token_end(ch, true);
                }
            }
        }
    }

    fn peek(&self, n: usize) -> Option<u8> {
        self.bytes.get(self.pos + n).copied()
    }

    fn token_end(&mut self, last: u8, allow_regex: bool) {
        self.last_sig = last;
        self.last_word = "";
        self.allow_regex = allow_regex;
    }

    /// Whether a `{` at the current position opens a block statement.
    fn brace_opens_block(&self) -> bool {
        match self.last_sig {
            b';' | b'{' | b'}' | b')' => true,
            b'>' => self.source[..self.pos].trim_end().ends_with("=>"),
            b'a' => !EXPRESSION_KEYWORDS.contains(&self.last_word),
            _ => false,
        }
    }

    /// Scan template literal text up to the closing backtick or the next `${`.
    fn scan_template_text(&mut self) {
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => self.pos += 2,
                b'`' => {
                    self.pos += 1;
                    self.token_end(b'`', false);
                    return;
                }
                b'$' if self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    self.brace_depth += 1;
                    self.template_stack.push(self.brace_depth);
                    self.braces.push(false);
                    self.token_end(b'{', true);
                    return;
                }
                _ => self.pos += 1,
            }
        }
    }

    fn scan_word(&mut self) {
        let start = self.pos;
        let end = read_ident(self.bytes, start);
        let word = &self.source[start..end];
        let member_access = self.last_sig == b'.';
        self.pos = end;

        match word {
            "import" if !member_access => self.scan_import(end),
            "export" if !member_access => self.scan_export(start, end),
            _ => {
                let allow = !member_access && REGEX_PREFIX_KEYWORDS.contains(&word);
                self.token_end(b'a', allow);
                if !member_access {
                    self.last_word = word;
                }
            }
        }
    }

    /// Handle the text after an `import` keyword ending at `after_kw`.
    fn scan_import(&mut self, after_kw: usize) {
        self.token_end(b'a', false);
        let i = skip_trivia(self.bytes, after_kw);

        match self.bytes.get(i) {
            Some(b'(') => {
                let j = skip_trivia(self.bytes, i + 1);
                if let Some(end) = self.literal_end(j, true) {
                    self.record(j + 1, end, ImportKind::Dynamic);
                    self.pos = end + 1;
                }
            }
            Some(b'\'' | b'"') => {
                if let Some(end) = self.literal_end(i, false) {
                    self.record(i + 1, end, ImportKind::Static);
                    self.pos = end + 1;
                }
            }
            Some(_) => {
                if let Some((spec_start, end)) = self.find_from_clause(i) {
                    self.record(spec_start, end, ImportKind::Static);
                    self.pos = end + 1;
                }
            }
            None => {}
        }
    }

    /// Handle the text after an `export` keyword spanning `kw_start..after_kw`.
    fn scan_export(&mut self, kw_start: usize, after_kw: usize) {
        self.token_end(b'a', false);
        let mut i = skip_trivia(self.bytes, after_kw);

        match self.bytes.get(i) {
            Some(b'*') => {
                i = skip_trivia(self.bytes, i + 1);
                if self.word_at(i) == Some("as") {
                    i = skip_trivia(self.bytes, i + 2);
                    i = match self.bytes.get(i) {
                        Some(b'\'' | b'"') => skip_string(self.bytes, i) + 1,
                        Some(&b) if is_ident_start(b) => read_ident(self.bytes, i),
                        _ => return,
                    };
                }
                if let Some((spec_start, end)) = self.expect_from(i) {
                    self.record(spec_start, end, ImportKind::ReExport);
                    self.pos = end + 1;
                }
            }
            Some(b'{') => {
                let after_braces = skip_braces(self.bytes, i);
                if let Some((spec_start, end)) = self.expect_from(after_braces) {
                    self.record(spec_start, end, ImportKind::ReExport);
                    self.pos = end + 1;
                }
            }
            Some(_) if self.word_at(i) == Some("default") => {
                let end = i + "default".len();
                if self.out.default_export.is_none() {
                    self.out.default_export = Some(kw_start..end);
                }
                self.pos = end;
                self.token_end(b'a', true);
                self.last_word = "default";
            }
            _ => {}
        }
    }

    /// Walk an import clause (`x`, `{ a as b }`, `* as ns`, commas) to its
    /// `from "y"` and return the specifier range.
    fn find_from_clause(&self, mut i: usize) -> Option<(usize, usize)> {
        loop {
            i = skip_trivia(self.bytes, i);
            match *self.bytes.get(i)? {
                b'{' => i = skip_braces(self.bytes, i),
                b'*' | b',' => i += 1,
                b if is_ident_start(b) => {
                    let end = read_ident(self.bytes, i);
                    if &self.source[i..end] == "from" {
                        if let Some(found) = self.expect_string(end) {
                            return Some(found);
                        }
                    }
                    i = end;
                }
                _ => return None,
            }
        }
    }

    /// Expect `from "y"` at `i` (after trivia).
    fn expect_from(&self, i: usize) -> Option<(usize, usize)> {
        let i = skip_trivia(self.bytes, i);
        if self.word_at(i) != Some("from") {
            return None;
        }
        self.expect_string(i + 4)
    }

    /// Expect a quoted string at `i` (after trivia) and return the range of its contents.
    fn expect_string(&self, i: usize) -> Option<(usize, usize)> {
        let i = skip_trivia(self.bytes, i);
        match self.bytes.get(i) {
            Some(b'\'' | b'"') => self.literal_end(i, false).map(|end| (i + 1, end)),
            _ => None,
        }
    }

    /// Closing quote index of the literal opening at `i`.
    ///
    /// Template literals are only accepted when `allow_template` is set and
    /// they contain no substitutions.
    fn literal_end(&self, i: usize, allow_template: bool) -> Option<usize> {
        match *self.bytes.get(i)? {
            b'\'' | b'"' => {
                let end = skip_string(self.bytes, i);
                (end < self.bytes.len() && self.bytes[end] == self.bytes[i]).then_some(end)
            }
            b'`' if allow_template => {
                let mut j = i + 1;
                while j < self.bytes.len() {
                    match self.bytes[j] {
                        b'\\' => j += 2,
                        b'`' => return Some(j),
                        b'$' if self.bytes.get(j + 1) == Some(&b'{') => return None,
                        _ => j += 1,
                    }
                }
                None
            }
            _ => None,
        }
    }

    fn word_at(&self, i: usize) -> Option<&'a str> {
        let b = *self.bytes.get(i)?;
        if !is_ident_start(b) {
            return None;
        }
        Some(&self.source[i..read_ident(self.bytes, i)])
    }

    fn record(&mut self, start: usize, end: usize, kind: ImportKind) {
        self.out.specifiers.push(ImportSpecifier {
            start,
            end,
            specifier: &self.source[start..end],
            kind,
        });
        self.token_end(b'"', false);
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

fn is_ident_byte(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

fn read_ident(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && is_ident_byte(bytes[i]) {
        i += 1;
    }
    i
}

/// Skip whitespace and comments starting at `i`.
fn skip_trivia(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = skip_line_comment(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
            _ => break,
        }
    }
    i
}

fn skip_line_comment(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i] != b'\n' {
        i += 1;
    }
    i
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return i + 2;
        }
        i += 1;
    }
    bytes.len()
}

/// Index of the closing quote of the string opening at `start`, or the
/// position where an unterminated string gives up (newline or end of input).
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b if b == quote => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Position just past the regex literal opening at `start`.
fn skip_regex(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    let mut in_class = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => {
                i += 1;
                break;
            }
            b'\n' | b'\r' => break,
            _ => i += 1,
        }
    }
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    i.min(bytes.len())
}

/// Position just past the `}` matching the `{` at `start`.
fn skip_braces(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                depth += 1;
                i += 1;
            }
            b'}' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    return i;
                }
            }
            b'\'' | b'"' => i = skip_string(bytes, i) + 1,
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = skip_line_comment(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
            _ => i += 1,
        }
    }
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specifiers(source: &str) -> Vec<&str> {
        scan_imports(source).iter().map(|s| s.specifier).collect()
    }

    #[test]
    fn test_esm_import_from() {
        let source = r#"import { foo } from "./dep";"#;
        let imports = scan_imports(source);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].specifier, "./dep");
        assert_eq!(imports[0].kind, ImportKind::Static);
    }

    #[test]
    fn test_offsets_slice_back_to_specifier() {
        let source = "import a from 'vue';\nimport { b } from \"./b.js\";\nconst c = import('lazy');\n";
        let imports = scan_imports(source);
        assert_eq!(imports.len(), 3);
        for spec in &imports {
            assert_eq!(&source[spec.start..spec.end], spec.specifier);
        }
        assert_eq!(imports[2].kind, ImportKind::Dynamic);
    }

    #[test]
    fn test_offsets_after_multibyte_text() {
        let source = "// héllo wörld ✓\nconst s = 'ünïcode';\nimport x from 'pkg';";
        let imports = scan_imports(source);
        assert_eq!(imports.len(), 1);
        assert_eq!(&source[imports[0].start..imports[0].end], "pkg");
    }

    #[test]
    fn test_side_effect_and_star_imports() {
        let source = r#"
import "./polyfill";
import * as utils from "./utils";
import def, { named as alias } from 'mixed';
"#;
        assert_eq!(specifiers(source), vec!["./polyfill", "./utils", "mixed"]);
    }

    #[test]
    fn test_multiline_named_import() {
        let source = "import {\n  ref,\n  computed, // used below\n} from 'vue'\n";
        assert_eq!(specifiers(source), vec!["vue"]);
    }

    #[test]
    fn test_reexports() {
        let source = r#"
export * from "./all";
export * as ns from "./ns";
export { a, b as c } from 'lib';
export { local };
export const x = 1;
"#;
        let imports = scan_imports(source);
        assert_eq!(
            imports.iter().map(|s| s.specifier).collect::<Vec<_>>(),
            vec!["./all", "./ns", "lib"]
        );
        assert!(imports.iter().all(|s| s.kind == ImportKind::ReExport));
    }

    #[test]
    fn test_local_export_list_does_not_swallow_next_import() {
        let source = "export { a, b }\nimport c from 'dep'\n";
        let imports = scan_imports(source);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].specifier, "dep");
        assert_eq!(imports[0].kind, ImportKind::Static);
    }

    #[test]
    fn test_ignores_comments() {
        let source = r#"
// import foo from "commented"
/*
import baz from "also-commented"
*/
import bar from "./real";
"#;
        assert_eq!(specifiers(source), vec!["./real"]);
    }

    #[test]
    fn test_ignores_string_and_template_literals() {
        let source = r#"
const a = "import x from 'fake-one'";
const b = 'import("fake-two")';
const c = `import y from "fake-three"`;
import real from "real";
"#;
        assert_eq!(specifiers(source), vec!["real"]);
    }

    #[test]
    fn test_import_inside_template_substitution_is_real() {
        let source = "const s = `${await import('inner')} and ${ {a: 1}.a } import('nope')`;";
        assert_eq!(specifiers(source), vec!["inner"]);
    }

    #[test]
    fn test_regex_containing_quotes() {
        let source = "const re = /[\"'`]import/g;\nimport a from 'after-regex';";
        assert_eq!(specifiers(source), vec!["after-regex"]);
    }

    #[test]
    fn test_division_is_not_regex() {
        let source = "const half = total / 2; const q = x / y;\nimport a from 'after-division';";
        assert_eq!(specifiers(source), vec!["after-division"]);
    }

    #[test]
    fn test_postfix_increment_then_division() {
        let source = "let a = b++ / 2; import('lib')";
        assert_eq!(specifiers(source), vec!["lib"]);
        let source = "let a = b-- / c--; import x from 'lib'";
        assert_eq!(specifiers(source), vec!["lib"]);
    }

    #[test]
    fn test_regex_after_control_statement_head() {
        let source = "if (x) /'/.test(s); import y from 'lib'";
        assert_eq!(specifiers(source), vec!["lib"]);
        let source = "while (f(a)) /\"/g.exec(s)\nimport y from 'lib'";
        assert_eq!(specifiers(source), vec!["lib"]);
    }

    #[test]
    fn test_call_result_then_division() {
        let source = "const r = f(a) / g(b) / 2;\nimport y from 'lib'";
        assert_eq!(specifiers(source), vec!["lib"]);
    }

    #[test]
    fn test_regex_after_block_statement() {
        let source = "function f(){}\n/'/.test(s); import y from 'lib'";
        assert_eq!(specifiers(source), vec!["lib"]);
        let source = "if (a) { run() }\n/'/.test(s); import y from 'lib'";
        assert_eq!(specifiers(source), vec!["lib"]);
    }

    #[test]
    fn test_division_after_object_literal() {
        let source = "const n = ({ a: 1 }).a / 2 / 1;\nconst m = { a: 1 }.a / 2;\nimport y from 'lib'";
        assert_eq!(specifiers(source), vec!["lib"]);
    }

    #[test]
    fn test_import_meta_and_member_access() {
        let source = r#"
const url = import.meta.url;
loader.import("not-a-module");
import.meta.hot?.accept();
"#;
        assert!(scan_imports(source).is_empty());
    }

    #[test]
    fn test_dynamic_import_with_expression_is_skipped() {
        let source = "const m = import(name);\nconst n = import(`./pages/${page}.js`);\nconst o = import(`./static.js`);";
        let imports = scan_imports(source);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].specifier, "./static.js");
        assert_eq!(imports[0].kind, ImportKind::Dynamic);
    }

    #[test]
    fn test_keeps_duplicates_in_order() {
        let source = "import a from './dep';\nimport b from './dep';\n";
        let imports = scan_imports(source);
        assert_eq!(imports.len(), 2);
        assert!(imports[0].start < imports[1].start);
    }

    #[test]
    fn test_identifier_named_from() {
        let source = "import from from 'weird';";
        assert_eq!(specifiers(source), vec!["weird"]);
    }

    #[test]
    fn test_default_export_range() {
        let source = "import { ref } from 'vue'\nexport default {\n  name: 'App'\n}\n";
        let scan = scan_module(source);
        let range = scan.default_export.unwrap();
        assert_eq!(&source[range], "export default");
    }

    #[test]
    fn test_default_export_in_string_is_ignored() {
        let source = "const s = 'export default';\n// export default nope\nexport default 1";
        let scan = scan_module(source);
        let range = scan.default_export.unwrap();
        assert_eq!(range.start, source.rfind("export default").unwrap());
    }

    #[test]
    fn test_no_imports() {
        assert!(scan_imports("").is_empty());
        assert!(scan_imports("console.log('hello');").is_empty());
        assert!(scan_module("const x = 1;").default_export.is_none());
    }

    #[test]
    fn test_is_bare_specifier() {
        assert!(is_bare_specifier("vue"));
        assert!(is_bare_specifier("@scope/package"));
        assert!(is_bare_specifier("lodash/debounce"));
        assert!(!is_bare_specifier("./local.js"));
        assert!(!is_bare_specifier("../up.js"));
        assert!(!is_bare_specifier("/abs.js"));
        assert!(!is_bare_specifier("/@modules/vue"));
        assert!(!is_bare_specifier("https://cdn.example.com/x.js"));
        assert!(!is_bare_specifier("data:text/javascript,export default 1"));
        assert!(!is_bare_specifier(""));
    }
}
