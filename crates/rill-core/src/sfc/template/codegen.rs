//! Render function generation.
//!
//! Turns a parsed template into an ES module exporting
//! `render(_ctx, _cache)`. Runtime helpers are imported from `vue` under an
//! underscore alias, in order of first use.

use super::expr::{identifiers, is_handler_reference, prefix_identifiers};
use super::parse::{decode_entities, Element, Node};

type GenResult<T = String> = Result<T, String>;

/// SVG elements whose names contain uppercase letters.
const SVG_CAMEL_TAGS: &[&str] = &[
    "animateMotion",
    "animateTransform",
    "clipPath",
    "feBlend",
    "feColorMatrix",
    "feComposite",
    "feGaussianBlur",
    "feOffset",
    "foreignObject",
    "linearGradient",
    "radialGradient",
    "textPath",
];

/// Event modifiers handled by `withModifiers`.
const SYSTEM_MODIFIERS: &[&str] = &[
    "stop", "prevent", "self", "ctrl", "shift", "alt", "meta", "exact", "left", "middle", "right",
];

/// Event modifiers that become part of the listener key.
const OPTION_MODIFIERS: &[&str] = &["once", "capture", "passive"];

#[derive(Debug, Default)]
pub struct Codegen {
    helpers: Vec<&'static str>,
    components: Vec<String>,
}

impl Codegen {
    /// Generate the complete render module for `roots`.
    pub fn generate(mut self, roots: &[Node<'_>]) -> GenResult {
        let mut items = self.child_items(roots, &[], 1)?;
        let body = match items.len() {
            0 => "null".to_string(),
            1 => items.pop().unwrap_or_default(),
            _ => {
                let create = self.helper("createVNode");
                let fragment = self.helper("Fragment");
                format!("{create}({fragment}, null, {})", array(&items, 1))
            }
        };

        let mut out = String::new();
        if !self.helpers.is_empty() {
            let imports: Vec<String> = self.helpers.iter().map(|h| format!("{h} as _{h}")).collect();
            out.push_str(&format!("import {{ {} }} from \"vue\"\n\n", imports.join(", ")));
        }
        out.push_str("export function render(_ctx, _cache) {\n");
        for tag in &self.components {
            out.push_str(&format!(
                "  const {} = _resolveComponent({})\n",
                component_var(tag),
                js_string(tag)
            ));
        }
        if !self.components.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("  return {body}\n}}\n"));
        Ok(out)
    }

    fn helper(&mut self, name: &'static str) -> String {
        if !self.helpers.contains(&name) {
            self.helpers.push(name);
        }
        format!("_{name}")
    }

    fn component(&mut self, tag: &str) -> String {
        self.helper("resolveComponent");
        if !self.components.iter().any(|c| c == tag) {
            self.components.push(tag.to_string());
        }
        component_var(tag)
    }

    /// Generate one vnode expression per child, folding `v-if` chains and
    /// merging adjacent text and interpolations.
    fn child_items(&mut self, nodes: &[Node<'_>], locals: &[String], indent: usize) -> GenResult<Vec<String>> {
        let mut items = Vec::new();
        let mut i = 0;

        while i < nodes.len() {
            match &nodes[i] {
                Node::Text(_) | Node::Interpolation(_) => {
                    let start = i;
                    while i < nodes.len() && !matches!(nodes[i], Node::Element(_)) {
                        i += 1;
                    }
                    let text = self.text_expr(&nodes[start..i], locals);
                    let create = self.helper("createTextVNode");
                    items.push(format!("{create}({text})"));
                }
                Node::Element(el) => {
                    if el.attr("v-if").is_some() {
                        let (chain, next) = self.if_chain(nodes, i, locals, indent)?;
                        items.push(chain);
                        i = next;
                    } else if el.attr("v-else-if").is_some() || el.attr("v-else").is_some() {
                        return Err(format!("<{}> has v-else without an adjacent v-if", el.tag));
                    } else {
                        items.push(self.for_or_element(el, locals, indent)?);
                        i += 1;
                    }
                }
            }
        }

        Ok(items)
    }

    /// `a + _toDisplayString(b)` for a run of text and interpolation nodes.
    fn text_expr(&mut self, nodes: &[Node<'_>], locals: &[String]) -> String {
        let mut parts = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Text(text) => parts.push(js_string(text)),
                Node::Interpolation(expr) => {
                    let display = self.helper("toDisplayString");
                    parts.push(format!("{display}({})", prefix_identifiers(expr, locals)));
                }
                Node::Element(_) => {}
            }
        }
        parts.join(" + ")
    }

    /// Fold a `v-if` / `v-else-if` / `v-else` chain starting at `start` into
    /// nested conditionals. Returns the expression and the index after the chain.
    fn if_chain(
        &mut self,
        nodes: &[Node<'_>],
        start: usize,
        locals: &[String],
        indent: usize,
    ) -> GenResult<(String, usize)> {
        let mut branches: Vec<(Option<String>, String)> = Vec::new();
        let mut i = start;

        while let Some(Node::Element(el)) = nodes.get(i) {
            let condition = if i == start {
                Some(required(el.attr("v-if").flatten(), "v-if")?)
            } else if el.attr("v-else-if").is_some() {
                Some(required(el.attr("v-else-if").flatten(), "v-else-if")?)
            } else {
                None
            };
            let is_else = condition.is_none();
            let condition = condition.map(|c| prefix_identifiers(c, locals));
            branches.push((condition, self.for_or_element(el, locals, indent + 1)?));
            i += 1;
            if is_else {
                break;
            }

            // Whitespace between branches does not break the chain.
            let mut next = i;
            while matches!(nodes.get(next), Some(Node::Text(t)) if t.trim().is_empty()) {
                next += 1;
            }
            match nodes.get(next) {
                Some(Node::Element(el)) if el.attr("v-else-if").is_some() || el.attr("v-else").is_some() => {
                    i = next;
                }
                _ => break,
            }
        }

        let pad = "  ".repeat(indent);
        let has_else = branches.last().is_some_and(|(condition, _)| condition.is_none());
        let mut rest = if has_else {
            String::new()
        } else {
            let comment = self.helper("createCommentVNode");
            format!("{comment}(\"v-if\", true)")
        };
        for (condition, node) in branches.into_iter().rev() {
            rest = match condition {
                Some(condition) => format!("({condition})\n{pad}  ? {node}\n{pad}  : {rest}"),
                None => node,
            };
        }
        Ok((rest, i))
    }

    fn for_or_element(&mut self, el: &Element<'_>, locals: &[String], indent: usize) -> GenResult {
        let Some(value) = el.attr("v-for") else {
            return self.element(el, locals, indent);
        };
        let source = required(value, "v-for")?;
        let (aliases, list) =
            split_for(source).ok_or_else(|| format!("invalid v-for expression: {source}"))?;

        let mut scope = locals.to_vec();
        scope.extend(identifiers(aliases));
        let list = prefix_identifiers(list, locals);
        let node = self.element(el, &scope, indent + 1)?;

        let params = if aliases.starts_with('(') {
            aliases.to_string()
        } else {
            format!("({aliases})")
        };
        let create = self.helper("createVNode");
        let fragment = self.helper("Fragment");
        let render_list = self.helper("renderList");
        let pad = "  ".repeat(indent);
        Ok(format!(
            "{create}({fragment}, null, {render_list}({list}, {params} => {{\n{pad}  return {node}\n{pad}}}))"
        ))
    }

    fn element(&mut self, el: &Element<'_>, locals: &[String], indent: usize) -> GenResult {
        if el.tag == "template" {
            let items = self.child_items(&el.children, locals, indent + 1)?;
            let create = self.helper("createVNode");
            let fragment = self.helper("Fragment");
            return Ok(format!("{create}({fragment}, null, {})", array(&items, indent)));
        }
        if el.tag == "slot" {
            return self.slot(el, locals, indent);
        }
        if is_component(el.tag) {
            return self.component_vnode(el, locals, indent);
        }

        let (props, directives) = self.props(el, locals, false)?;
        let children = if el.children.is_empty() {
            None
        } else if el.children.iter().all(|n| !matches!(n, Node::Element(_))) {
            Some(self.text_expr(&el.children, locals))
        } else {
            let items = self.child_items(&el.children, locals, indent + 1)?;
            Some(array(&items, indent))
        };

        let create = self.helper("createElementVNode");
        let mut args = vec![js_string(el.tag)];
        if props.is_some() || children.is_some() {
            args.push(props.unwrap_or_else(|| "null".to_string()));
        }
        args.extend(children);
        let vnode = format!("{create}({})", args.join(", "));
        Ok(self.with_directives(vnode, &directives))
    }

    fn component_vnode(&mut self, el: &Element<'_>, locals: &[String], indent: usize) -> GenResult {
        let var = self.component(el.tag);
        let (props, directives) = self.props(el, locals, true)?;

        let slots = if el.children.is_empty() {
            None
        } else {
            let items = self.child_items(&el.children, locals, indent + 2)?;
            let with_ctx = self.helper("withCtx");
            let pad = "  ".repeat(indent);
            Some(format!(
                "{{\n{pad}  default: {with_ctx}(() => {})\n{pad}}}",
                array(&items, indent + 1)
            ))
        };

        let create = self.helper("createVNode");
        let mut args = vec![var];
        if props.is_some() || slots.is_some() {
            args.push(props.unwrap_or_else(|| "null".to_string()));
        }
        args.extend(slots);
        let vnode = format!("{create}({})", args.join(", "));
        Ok(self.with_directives(vnode, &directives))
    }

    fn slot(&mut self, el: &Element<'_>, locals: &[String], indent: usize) -> GenResult {
        let name = match (el.attr("name"), el.attr(":name")) {
            (Some(Some(name)), _) => js_string(name),
            (_, Some(Some(expr))) => prefix_identifiers(expr.trim(), locals),
            _ => "\"default\"".to_string(),
        };
        let slot_props = Element {
            tag: el.tag,
            attrs: el
                .attrs
                .iter()
                .filter(|(key, _)| !matches!(*key, "name" | ":name" | "v-bind:name"))
                .cloned()
                .collect(),
            children: Vec::new(),
        };
        let (props, _) = self.props(&slot_props, locals, false)?;

        let render_slot = self.helper("renderSlot");
        if el.children.is_empty() {
            return Ok(match props {
                Some(props) => format!("{render_slot}(_ctx.$slots, {name}, {props})"),
                None => format!("{render_slot}(_ctx.$slots, {name})"),
            });
        }
        let items = self.child_items(&el.children, locals, indent + 1)?;
        Ok(format!(
            "{render_slot}(_ctx.$slots, {name}, {}, () => {})",
            props.unwrap_or_else(|| "{}".to_string()),
            array(&items, indent)
        ))
    }

    fn with_directives(&mut self, vnode: String, directives: &[String]) -> String {
        if directives.is_empty() {
            return vnode;
        }
        let with = self.helper("withDirectives");
        format!("{with}({vnode}, [{}])", directives.join(", "))
    }

    /// Build the props object and the runtime directive list for `el`.
    fn props(
        &mut self,
        el: &Element<'_>,
        locals: &[String],
        component: bool,
    ) -> GenResult<(Option<String>, Vec<String>)> {
        let mut props: Vec<(String, String)> = Vec::new();
        let mut directives = Vec::new();
        let mut class = MergedProp::default();
        let mut style = MergedProp::default();

        for &(name, value) in &el.attrs {
            if matches!(name, "v-if" | "v-else-if" | "v-else" | "v-for" | "v-cloak") {
                continue;
            }

            if let Some(arg) = name.strip_prefix(':').or_else(|| name.strip_prefix("v-bind:")) {
                let (arg, modifiers) = split_modifiers(arg);
                let arg = if modifiers.contains(&"camel") { camelize(arg) } else { arg.to_string() };
                let expr = match value.map(str::trim).filter(|v| !v.is_empty()) {
                    Some(v) => prefix_identifiers(v, locals),
                    // Same-name shorthand: `:id` binds `id`.
                    None => prefix_identifiers(&camelize(&arg), locals),
                };
                match arg.as_str() {
                    "class" => class.push(&mut props, "class", expr, true),
                    "style" => style.push(&mut props, "style", expr, true),
                    _ => props.push((arg, expr)),
                }
            } else if let Some(arg) = name.strip_prefix('@').or_else(|| name.strip_prefix("v-on:")) {
                let handler = required(value, name)?;
                let (event, modifiers) = split_modifiers(arg);
                props.push(self.event(event, &modifiers, handler, locals));
            } else if name == "v-model" || name.starts_with("v-model:") || name.starts_with("v-model.") {
                let target = required(value, "v-model")?;
                let (arg, modifiers) = split_modifiers(&name["v-model".len()..]);
                let arg = arg.strip_prefix(':').filter(|a| !a.is_empty());
                self.model(el, arg, &modifiers, target, locals, component, &mut props, &mut directives)?;
            } else if name == "v-show" {
                let expr = prefix_identifiers(required(value, "v-show")?, locals);
                let show = self.helper("vShow");
                directives.push(format!("[{show}, {expr}]"));
            } else if name == "v-html" {
                let expr = prefix_identifiers(required(value, "v-html")?, locals);
                props.push(("innerHTML".to_string(), expr));
            } else if name == "v-text" {
                let expr = prefix_identifiers(required(value, "v-text")?, locals);
                let display = self.helper("toDisplayString");
                props.push(("textContent".to_string(), format!("{display}({expr})")));
            } else if name.starts_with("v-") || name.starts_with('#') {
                return Err(format!("unsupported directive {name} on <{}>", el.tag));
            } else {
                let literal = js_string(&decode_entities(value.unwrap_or("")));
                match name {
                    "class" => class.push(&mut props, "class", literal, false),
                    "style" => style.push(&mut props, "style", literal, false),
                    _ => props.push((name.to_string(), literal)),
                }
            }
        }

        if let Some(at) = class.slot {
            props[at].1 = class.finish(|| self.helper("normalizeClass"));
        }
        if let Some(at) = style.slot {
            props[at].1 = style.finish(|| self.helper("normalizeStyle"));
        }

        if props.is_empty() {
            return Ok((None, directives));
        }
        let entries: Vec<String> = props
            .iter()
            .map(|(key, value)| format!("{}: {value}", prop_key(key)))
            .collect();
        Ok((Some(format!("{{ {} }}", entries.join(", "))), directives))
    }

    fn event(&mut self, event: &str, modifiers: &[&str], handler: &str, locals: &[String]) -> (String, String) {
        let handler = handler.trim();
        let mut key = format!("on{}", capitalize(&camelize(event)));
        let mut system = Vec::new();
        let mut keys = Vec::new();
        for &modifier in modifiers {
            if OPTION_MODIFIERS.contains(&modifier) {
                key.push_str(&capitalize(modifier));
            } else if SYSTEM_MODIFIERS.contains(&modifier) {
                system.push(js_string(modifier));
            } else {
                keys.push(js_string(modifier));
            }
        }

        let mut value = if is_handler_reference(handler) {
            prefix_identifiers(handler, locals)
        } else {
            let mut scope = locals.to_vec();
            scope.push("$event".to_string());
            let body = prefix_identifiers(handler, &scope);
            if body.contains(';') {
                format!("$event => {{ {body} }}")
            } else {
                format!("$event => ({body})")
            }
        };
        if !system.is_empty() {
            let with = self.helper("withModifiers");
            value = format!("{with}({value}, [{}])", system.join(", "));
        }
        if !keys.is_empty() {
            let with = self.helper("withKeys");
            value = format!("{with}({value}, [{}])", keys.join(", "));
        }
        (key, value)
    }

    #[allow(clippy::too_many_arguments)]
    fn model(
        &mut self,
        el: &Element<'_>,
        arg: Option<&str>,
        modifiers: &[&str],
        target: &str,
        locals: &[String],
        component: bool,
        props: &mut Vec<(String, String)>,
        directives: &mut Vec<String>,
    ) -> GenResult<()> {
        let target = prefix_identifiers(target.trim(), locals);
        let assign = format!("$event => (({target}) = $event)");
        let modifier_object = (!modifiers.is_empty()).then(|| {
            let entries: Vec<String> = modifiers.iter().map(|m| format!("{}: true", prop_key(m))).collect();
            format!("{{ {} }}", entries.join(", "))
        });

        if component {
            let prop = arg.unwrap_or("modelValue");
            props.push((prop.to_string(), target));
            props.push((format!("onUpdate:{prop}"), assign));
            if let Some(object) = modifier_object {
                let name = if prop == "modelValue" { "model" } else { prop };
                props.push((format!("{name}Modifiers"), object));
            }
            return Ok(());
        }

        if arg.is_some() {
            return Err(format!("v-model with an argument is not supported on <{}>", el.tag));
        }
        let directive = match el.tag {
            "select" => "vModelSelect",
            "textarea" => "vModelText",
            "input" => match el.attr("type") {
                Some(Some("checkbox")) => "vModelCheckbox",
                Some(Some("radio")) => "vModelRadio",
                _ => "vModelText",
            },
            tag => return Err(format!("v-model is not supported on <{tag}>")),
        };
        props.push(("onUpdate:modelValue".to_string(), assign));
        let directive = self.helper(directive);
        directives.push(match modifier_object {
            Some(object) => format!("[{directive}, {target}, void 0, {object}]"),
            None => format!("[{directive}, {target}]"),
        });
        Ok(())
    }
}

/// A `class` or `style` prop assembled from static and bound attributes.
#[derive(Debug, Default)]
struct MergedProp {
    slot: Option<usize>,
    parts: Vec<(String, bool)>,
}

impl MergedProp {
    fn push(&mut self, props: &mut Vec<(String, String)>, name: &str, value: String, bound: bool) {
        if self.slot.is_none() {
            props.push((name.to_string(), String::new()));
            self.slot = Some(props.len() - 1);
        }
        self.parts.push((value, bound));
    }

    /// Final prop value; `normalize` registers and names the runtime helper.
    fn finish(&self, normalize: impl FnOnce() -> String) -> String {
        match self.parts.as_slice() {
            [(value, false)] => value.clone(),
            [(value, true)] => format!("{}({value})", normalize()),
            parts => {
                let values: Vec<&str> = parts.iter().map(|(v, _)| v.as_str()).collect();
                format!("{}([{}])", normalize(), values.join(", "))
            }
        }
    }
}

fn required<'a>(value: Option<&'a str>, directive: &str) -> GenResult<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("{directive} requires an expression"))
}

/// Split `alias in list` (or `of`) into its two sides.
fn split_for(source: &str) -> Option<(&str, &str)> {
    let bytes = source.as_bytes();
    (1..bytes.len().saturating_sub(2))
        .find_map(|p| {
            let word = &bytes[p..p + 2];
            let keyword = word == b"in" || word == b"of";
            let spaced = bytes[p - 1].is_ascii_whitespace() && bytes[p + 2].is_ascii_whitespace();
            (keyword && spaced).then(|| (source[..p].trim(), source[p + 2..].trim()))
        })
        .filter(|(aliases, list)| !aliases.is_empty() && !list.is_empty())
}

fn split_modifiers(arg: &str) -> (&str, Vec<&str>) {
    let mut parts = arg.split('.');
    let name = parts.next().unwrap_or_default();
    (name, parts.filter(|m| !m.is_empty()).collect())
}

fn is_component(tag: &str) -> bool {
    !SVG_CAMEL_TAGS.contains(&tag) && (tag.contains('-') || tag.bytes().any(|b| b.is_ascii_uppercase()))
}

fn component_var(tag: &str) -> String {
    let name: String = tag
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    format!("_component_{name}")
}

/// `foo-bar` to `fooBar`.
fn camelize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn prop_key(key: &str) -> String {
    let bytes = key.as_bytes();
    let identifier = !bytes.is_empty()
        && !bytes[0].is_ascii_digit()
        && bytes.iter().all(|&b| b.is_ascii_alphanumeric() || b == b'_' || b == b'$');
    if identifier {
        key.to_string()
    } else {
        js_string(key)
    }
}

/// Double-quoted JavaScript string literal.
fn js_string(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

fn array(items: &[String], indent: usize) -> String {
    let pad = "  ".repeat(indent);
    let mut out = String::from("[\n");
    for (n, item) in items.iter().enumerate() {
        out.push_str(&pad);
        out.push_str("  ");
        out.push_str(item);
        if n + 1 < items.len() {
            out.push(',');
        }
        out.push('\n');
    }
    out.push_str(&pad);
    out.push(']');
    out
}
