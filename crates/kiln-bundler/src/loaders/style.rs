//! Stylesheet steps: `sass`, `postcss`, `css`, `style-inject` and
//! `css-extract`.

use std::path::Path;

use kiln_config::PostcssPlugin;
use lightningcss::dependencies::{Dependency, DependencyOptions};
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use super::Css;
use crate::{Error, Result};

/// Module left behind once CSS has been moved into the extracted sheet.
pub const EXTRACTED_MODULE: &str = "// extracted by kiln\n";

/// Compile SCSS. Imports resolve against the file's own directory.
pub fn compile_sass(path: &Path, source: &str) -> Result<String> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let options = grass::Options::default().load_path(dir);
    grass::from_string(source.to_owned(), &options)
        .map_err(|e| Error::transform("sass", path.display().to_string(), e))
}

/// Apply the post-processing plugins in order.
///
/// Prefixing and size optimization both happen in one lightningcss pass:
/// `autoprefixer` contributes the browser targets and `cssnano` switches the
/// printer to minified output.
pub fn postprocess(resource: &str, css: &Css, plugins: &[PostcssPlugin]) -> Result<Css> {
    let mut minify = css.minified;
    let mut queries: Option<&[String]> = None;
    for plugin in plugins {
        match plugin {
            PostcssPlugin::Noop => {}
            PostcssPlugin::Cssnano => minify = true,
            PostcssPlugin::Autoprefixer { browsers } => queries = Some(browsers),
        }
    }

    if !minify && queries.is_none() {
        return Ok(css.clone());
    }

    let targets = match queries {
        Some(queries) => targets_for(resource, queries)?,
        None => Targets::default(),
    };

    let mut sheet = StyleSheet::parse(
        &css.code,
        ParserOptions {
            filename: resource.to_string(),
            ..Default::default()
        },
    )
    .map_err(|e| Error::transform("postcss", resource, e))?;

    sheet
        .minify(MinifyOptions {
            targets,
            ..Default::default()
        })
        .map_err(|e| Error::transform("postcss", resource, e))?;

    let printed = sheet
        .to_css(PrinterOptions {
            minify,
            targets,
            ..Default::default()
        })
        .map_err(|e| Error::transform("postcss", resource, e))?;

    Ok(Css {
        code: printed.code,
        minified: minify,
    })
}

fn targets_for(resource: &str, queries: &[String]) -> Result<Targets> {
    let browsers = Browsers::from_browserslist(queries)
        .map_err(|e| Error::transform("postcss", resource, e))?;
    Ok(Targets {
        browsers,
        ..Targets::default()
    })
}

/// Replace every local `url()` with the URL `resolve` returns for it.
///
/// `resolve` returns `None` for references that stay as written.
pub fn resolve_urls<F>(resource: &str, css: &Css, mut resolve: F) -> Result<Css>
where
    F: FnMut(&str) -> Result<Option<String>>,
{
    let sheet = StyleSheet::parse(
        &css.code,
        ParserOptions {
            filename: resource.to_string(),
            ..Default::default()
        },
    )
    .map_err(|e| Error::transform("css", resource, e))?;

    let printed = sheet
        .to_css(PrinterOptions {
            minify: css.minified,
            analyze_dependencies: Some(DependencyOptions {
                remove_imports: false,
            }),
            ..Default::default()
        })
        .map_err(|e| Error::transform("css", resource, e))?;

    let mut code = printed.code;
    for dependency in printed.dependencies.unwrap_or_default() {
        match dependency {
            Dependency::Url(url) => {
                let replacement = match resolve(&url.url)? {
                    Some(resolved) => resolved,
                    None => quote_if_needed(&url.url),
                };
                code = code.replace(&url.placeholder, &replacement);
            }
            Dependency::Import(import) => {
                code = code.replace(&import.placeholder, &import.url.replace('"', "\\\""));
            }
        }
    }

    Ok(Css {
        code,
        minified: css.minified,
    })
}

/// The printer writes placeholders unquoted inside `url()`.
fn quote_if_needed(url: &str) -> String {
    let needs_quotes = url
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '(' | ')' | '\\'));
    if needs_quotes {
        format!("\"{}\"", url.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        url.to_string()
    }
}

/// Module that appends `css` to the document head when it runs.
pub fn inject_module(css: &str) -> String {
    let literal = serde_json::Value::String(css.to_string()).to_string();
    format!("__kiln_require.i({});\n", literal)
}
