//! Component decomposition.
//!
//! One component document is served as three resources on the same URL:
//!
//! - no query: the driver module, i.e. the script block bound to `__script`
//!   plus an import of the render function and `export default __script`
//! - `?type=template`: the compiled render module
//! - `?type=style`: raw CSS of one style block

use crate::dev::patch::{self, Replacement};
use crate::dev::rewrite::{bare_replacements, rewrite_imports};
use crate::dev::route::SubResource;
use crate::error::Result;
use crate::imports::scan_module;
use crate::sfc::{compile_template, empty_render, parse_component, ComponentDocument};
use std::path::Path;

/// Text that takes the place of the script's `export default`.
const SCRIPT_BINDING: &str = "const __script =";

/// Produce the body for `part` of the component `source`.
///
/// `file` names the component in errors; `request_path` is the URL path the
/// driver imports its render function from.
pub fn render_part(source: &str, file: &Path, request_path: &str, part: SubResource) -> Result<String> {
    let doc = parse_component(source, file)?;
    match part {
        SubResource::Plain => Ok(driver_module(&doc, request_path)),
        SubResource::Template => template_module(&doc, file),
        SubResource::Style { index } => Ok(style_block(&doc, index).to_string()),
    }
}

/// Driver module for a component served at `request_path`.
#[must_use]
pub fn driver_module(doc: &ComponentDocument<'_>, request_path: &str) -> String {
    let script = match &doc.script {
        Some(block) => bind_script(block.content),
        None => "const __script = {}".to_string(),
    };
    let template_url = serde_json::Value::String(format!("{request_path}?type=template"));
    format!(
        "{script}\nimport {{ render as __render }} from {template_url}\n__script.render = __render\nexport default __script\n"
    )
}

/// Compiled and rewritten render module. A component without a template
/// gets a render function returning `null`.
pub fn template_module(doc: &ComponentDocument<'_>, file: &Path) -> Result<String> {
    let code = match &doc.template {
        Some(block) => compile_template(block.content, file)?,
        None => empty_render(),
    };
    Ok(rewrite_imports(&code).into_owned())
}

/// Raw text of the `index`-th style block, or empty if there is none.
#[must_use]
pub fn style_block<'a>(doc: &ComponentDocument<'a>, index: usize) -> &'a str {
    doc.styles.get(index).map_or("", |block| block.content)
}

/// Rewrite bare imports in the script and bind its default export to
/// `__script`, in one patch pass over the original text.
fn bind_script(script: &str) -> String {
    let scan = scan_module(script);
    let mut replacements = bare_replacements(&scan.specifiers);

    let Some(marker) = scan.default_export else {
        let rewritten = patch::apply(script, &replacements);
        return format!("{rewritten}\nconst __script = {{}}");
    };

    let at = replacements.partition_point(|r| r.start < marker.start);
    replacements.insert(at, Replacement::new(marker.start, marker.end, SCRIPT_BINDING));
    patch::apply(script, &replacements)
}

#[cfg(test)]
mod tests {
    use super::*;

    const APP: &str = r#"<template>
  <div class="app">{{ msg }}</div>
</template>

<script>
import { ref } from 'vue'
import helper from './helper.js'
export default {
  data() { return { msg: 'hi' } }
}
</script>

<style>
.app { color: red; }
</style>
"#;

    fn part(source: &str, part: SubResource) -> String {
        render_part(source, Path::new("/src/App.vue"), "/src/App.vue", part).unwrap()
    }

    #[test]
    fn test_driver_module() {
        let driver = part(APP, SubResource::Plain);
        assert!(driver.contains("import { ref } from '/@modules/vue'"));
        assert!(driver.contains("import helper from './helper.js'"));
        assert!(driver.contains("const __script = {\n  data()"));
        assert!(!driver.contains("export default {"));

        let import = driver
            .find(r#"import { render as __render } from "/src/App.vue?type=template""#)
            .unwrap();
        let assign = driver.find("__script.render = __render").unwrap();
        let export = driver.find("export default __script").unwrap();
        assert!(import < assign && assign < export);
        assert!(driver.ends_with("export default __script\n"));
    }

    #[test]
    fn test_export_default_in_string_is_not_the_marker() {
        let source = "<script>\nconst s = 'export default';\nexport default { s }\n</script>";
        let driver = part(source, SubResource::Plain);
        assert!(driver.contains("const s = 'export default';\nconst __script = { s }"));
    }

    #[test]
    fn test_script_without_default_export() {
        let source = "<script>\nimport 'side-effect'\nconsole.log(1)\n</script>";
        let driver = part(source, SubResource::Plain);
        assert!(driver.contains("import '/@modules/side-effect'\nconsole.log(1)\n\nconst __script = {}"));
        assert!(driver.contains("__script.render = __render"));
    }

    #[test]
    fn test_component_without_script() {
        let driver = part("<template><p>hi</p></template>", SubResource::Plain);
        assert!(driver.starts_with("const __script = {}\nimport { render as __render }"));
    }

    #[test]
    fn test_template_module_is_rewritten() {
        let render = part(APP, SubResource::Template);
        assert!(render.contains(r#"from "/@modules/vue""#));
        assert!(render.contains("export function render(_ctx, _cache)"));
        assert!(render.contains("_toDisplayString(_ctx.msg)"));
    }

    #[test]
    fn test_missing_template_renders_null() {
        let render = part("<script>export default {}</script>", SubResource::Template);
        assert_eq!(render, empty_render());
    }

    #[test]
    fn test_style_blocks() {
        assert_eq!(part(APP, SubResource::Style { index: 0 }).trim(), ".app { color: red; }");
        assert_eq!(part(APP, SubResource::Style { index: 1 }), "");
        assert_eq!(part("<script>export default {}</script>", SubResource::Style { index: 0 }), "");
    }

    #[test]
    fn test_broken_template_is_parse_error() {
        let err = render_part(
            "<template><div></template>",
            Path::new("/Bad.vue"),
            "/Bad.vue",
            SubResource::Template,
        )
        .unwrap_err();
        assert!(matches!(err, crate::error::Error::Parse { .. }));
    }
}
