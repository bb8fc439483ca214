//! Markdown rendering of component manifests for agent consumption.

use std::fmt::Write;

use crate::manifest::{ComponentManifest, JsDocTag};

/// Render one component's documentation as Markdown.
///
/// Stories are rendered in manifest order; `props` is not rendered.
pub fn render_component(component: &ComponentManifest) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# {}", component.name());
    let _ = writeln!(out);
    let _ = writeln!(out, "ID: {}", component.id);

    if let Some(summary) = &component.summary {
        let _ = writeln!(out);
        let _ = writeln!(out, "{summary}");
    }
    if let Some(description) = &component.base.description {
        let _ = writeln!(out);
        let _ = writeln!(out, "{description}");
    }

    if let Some(import) = &component.base.import {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Import");
        let _ = writeln!(out);
        push_code_block(&mut out, import);
    }

    write_tags(&mut out, component.js_doc_tags(), component.summary.is_some());

    let stories = component.stories();
    if !stories.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Stories");
        for story in stories {
            let _ = writeln!(out);
            let _ = writeln!(out, "### {}", story.base.name);
            if let Some(description) = &story.base.description {
                let _ = writeln!(out);
                let _ = writeln!(out, "{description}");
            }
            let _ = writeln!(out);
            push_code_block(&mut out, &story.snippet);
        }
    }

    out
}

/// Render several components, separated by horizontal rules.
pub fn render_components<'a>(components: impl IntoIterator<Item = &'a ComponentManifest>) -> String {
    components
        .into_iter()
        .map(render_component)
        .collect::<Vec<_>>()
        .join("\n---\n\n")
}

/// `@summary` is left out when the manifest's own summary is already shown.
fn write_tags(out: &mut String, tags: &[JsDocTag], has_summary: bool) {
    let tags: Vec<&JsDocTag> = tags
        .iter()
        .filter(|t| !(has_summary && t.key == "summary"))
        .collect();
    if tags.is_empty() {
        return;
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "## Tags");
    let _ = writeln!(out);
    for tag in tags {
        let _ = writeln!(out, "- @{}: {}", tag.key, tag.value);
    }
}

fn push_code_block(out: &mut String, code: &str) {
    let _ = writeln!(out, "```tsx");
    let _ = writeln!(out, "{}", code.trim_end());
    let _ = writeln!(out, "```");
}
