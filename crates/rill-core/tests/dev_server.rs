//! End-to-end tests for `DevServer` against a temporary project.

use rill_core::{DevRequest, DevServer, ServerConfig};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const APP_VUE: &str = r#"<template>
  <div id="app">
    <h1>{{ title }}</h1>
    <button @click="count++">clicked {{ count }} times</button>
  </div>
</template>

<script>
import { greet } from 'lib'
import Child from './Child.vue'

export default {
  components: { Child },
  data() {
    return { title: greet(), count: 0 }
  }
}
</script>

<style>
h1 { color: teal; }
</style>
"#;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn project() -> (TempDir, DevServer) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write(root, "index.html", "<!doctype html><script type=\"module\" src=\"/src/main.js\"></script>");
    write(
        root,
        "src/main.js",
        "import { createApp } from 'vue'\nimport App from './App.vue'\ncreateApp(App).mount('#app')\n",
    );
    write(root, "src/App.vue", APP_VUE);
    write(root, "src/util.js", "export const answer = 42;\n");
    write(
        root,
        "node_modules/lib/package.json",
        r#"{"name":"lib","main":"index.cjs","module":"dist/lib.esm.js"}"#,
    );
    write(root, "node_modules/lib/index.cjs", "module.exports = {}\n");
    write(
        root,
        "node_modules/lib/dist/lib.esm.js",
        "import { h } from 'vue'\nexport const greet = () => 'hello'\n",
    );

    let server = DevServer::new(root.to_path_buf(), ServerConfig::default());
    (dir, server)
}

#[tokio::test]
async fn test_index_served_for_root() {
    let (_dir, server) = project();
    let res = server.respond(&DevRequest::new("/", None)).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.content_type, "text/html; charset=utf-8");
    assert!(res.text().starts_with("<!doctype html>"));
}

#[tokio::test]
async fn test_script_is_rewritten() {
    let (_dir, server) = project();
    let res = server.respond(&DevRequest::new("/src/main.js", Some("t=1"))).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.content_type, "application/javascript; charset=utf-8");
    assert_eq!(
        res.text(),
        "import { createApp } from '/@modules/vue'\nimport App from './App.vue'\ncreateApp(App).mount('#app')\n"
    );
}

#[tokio::test]
async fn test_script_without_bare_imports_is_unchanged() {
    let (_dir, server) = project();
    let res = server.respond(&DevRequest::new("/src/util.js", None)).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.text(), "export const answer = 42;\n");
}

#[tokio::test]
async fn test_component_driver() {
    let (_dir, server) = project();
    let res = server.respond(&DevRequest::new("/src/App.vue", None)).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.content_type, "application/javascript; charset=utf-8");

    let body = res.text();
    assert!(body.contains("import { greet } from '/@modules/lib'"));
    assert!(body.contains("import Child from './Child.vue'"));
    assert!(body.contains("const __script = {"));
    assert!(body.contains(r#"import { render as __render } from "/src/App.vue?type=template""#));

    let assign = body.find("__script.render = __render").unwrap();
    let export = body.find("export default __script").unwrap();
    assert!(assign < export);
    assert!(!body.contains("export default {"));
}

#[tokio::test]
async fn test_component_template() {
    let (_dir, server) = project();
    let res = server
        .respond(&DevRequest::new("/src/App.vue", Some("type=template")))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.content_type, "application/javascript; charset=utf-8");

    let body = res.text();
    assert!(body.contains(r#"from "/@modules/vue""#));
    assert!(!body.contains(r#"from "vue""#));
    assert!(body.contains("export function render(_ctx, _cache)"));
    assert!(body.contains("_toDisplayString(_ctx.title)"));
    assert!(body.contains("onClick: $event => (_ctx.count++)"));
}

#[tokio::test]
async fn test_component_style() {
    let (_dir, server) = project();
    let res = server
        .respond(&DevRequest::new("/src/App.vue", Some("type=style")))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.content_type, "text/css; charset=utf-8");
    assert_eq!(res.text().trim(), "h1 { color: teal; }");

    let res = server
        .respond(&DevRequest::new("/src/App.vue", Some("type=style&index=3")))
        .await;
    assert_eq!(res.status, 200);
    assert!(res.body.is_empty());
}

#[tokio::test]
async fn test_style_of_component_without_styles_is_empty() {
    let (dir, server) = project();
    write(dir.path(), "src/Plain.vue", "<template><p>plain</p></template>");
    let res = server
        .respond(&DevRequest::new("/src/Plain.vue", Some("type=style")))
        .await;
    assert_eq!(res.status, 200);
    assert!(res.body.is_empty());
}

#[tokio::test]
async fn test_module_entry_uses_module_field() {
    let (_dir, server) = project();
    let res = server.respond(&DevRequest::new("/@modules/lib", None)).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.content_type, "application/javascript; charset=utf-8");
    assert_eq!(
        res.text(),
        "import { h } from '/@modules/vue'\nexport const greet = () => 'hello'\n"
    );
}

#[tokio::test]
async fn test_missing_things_are_404() {
    let (_dir, server) = project();

    let res = server.respond(&DevRequest::new("/nope.html", None)).await;
    assert_eq!(res.status, 404);

    let res = server.respond(&DevRequest::new("/@modules/not-installed", None)).await;
    assert_eq!(res.status, 404);
    assert!(res.text().starts_with("console.error("));

    let res = server.respond(&DevRequest::new("/src/Missing.vue", None)).await;
    assert_eq!(res.status, 404);

    let res = server.respond(&DevRequest::new("/../etc/passwd", None)).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn test_broken_component_is_500() {
    let (dir, server) = project();
    write(dir.path(), "src/Broken.vue", "<template><div></template>");
    let res = server
        .respond(&DevRequest::new("/src/Broken.vue", Some("type=template")))
        .await;
    assert_eq!(res.status, 500);
    assert!(res.text().contains("unclosed <div>"));
}

#[tokio::test]
async fn test_files_are_reread_per_request() {
    let (dir, server) = project();
    let first = server.respond(&DevRequest::new("/src/util.js", None)).await;
    write(dir.path(), "src/util.js", "import x from 'y';\n");
    let second = server.respond(&DevRequest::new("/src/util.js", None)).await;
    assert_ne!(first.body, second.body);
    assert_eq!(second.text(), "import x from '/@modules/y';\n");
}

#[tokio::test]
async fn test_raw_bytes_pass_through() {
    let (dir, server) = project();
    let png = [0x89, b'P', b'N', b'G', 0xff, 0x00];
    fs::write(dir.path().join("logo.png"), png).unwrap();
    let res = server.respond(&DevRequest::new("/logo.png", None)).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.content_type, "image/png; charset=utf-8");
    assert_eq!(res.body, png);
}
