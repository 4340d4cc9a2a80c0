//! Page generation from HTML templates.

use std::path::Path;

use crate::loaders::{LoaderContext, LoaderValue};
use crate::output::OutputKind;
use crate::{Error, Result};

/// Tags added to every generated page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageAssets {
    /// Stylesheet hrefs, linked in `<head>`.
    pub styles: Vec<String>,
    /// Script srcs, loaded at the end of `<body>`.
    pub scripts: Vec<String>,
    /// Extra raw `<head>` markup, such as favicon links.
    pub head: Option<String>,
}

/// Run `template` through its rules and emit the finished page as `filename`.
pub fn emit_page(
    ctx: &mut LoaderContext<'_>,
    filename: &str,
    template: &Path,
    assets: &PageAssets,
) -> Result<()> {
    let processed = ctx.process(template)?;
    let LoaderValue::Markup(markup) = processed.value else {
        return Err(Error::UnhandledFile(ctx.config.resource_name(template)));
    };

    let page = inject(&markup, assets);
    ctx.output
        .emit(filename, page.into_bytes(), OutputKind::Page)?;
    tracing::debug!(page = filename, "generated page");
    Ok(())
}

/// Insert head and body tags into `html`.
pub fn inject(html: &str, assets: &PageAssets) -> String {
    let mut head = Vec::new();
    if let Some(extra) = &assets.head {
        head.push(extra.clone());
    }
    head.extend(
        assets
            .styles
            .iter()
            .map(|href| format!(r#"<link href="{}" rel="stylesheet">"#, href)),
    );
    let scripts: Vec<String> = assets
        .scripts
        .iter()
        .map(|src| format!(r#"<script src="{}"></script>"#, src))
        .collect();

    let html = insert_before(html, "</head>", &head.join("\n"), false);
    insert_before(&html, "</body>", &scripts.join("\n"), true)
}

/// Insert `tags` before the last `closing` tag. Without one the tags go at
/// the end, or at the start when `append` is false.
fn insert_before(html: &str, closing: &str, tags: &str, append: bool) -> String {
    if tags.is_empty() {
        return html.to_string();
    }
    match find_ignore_case(html, closing) {
        Some(index) => format!("{}{}\n{}", &html[..index], tags, &html[index..]),
        None if append => format!("{}\n{}", html, tags),
        None => format!("{}\n{}", tags, html),
    }
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().rfind(&needle.to_ascii_lowercase())
}
