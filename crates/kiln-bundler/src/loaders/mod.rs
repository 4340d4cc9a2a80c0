//! Per-file loader steps and the pipeline that runs them.
//!
//! A file starts as [`LoaderValue::Source`] and each step the rule table
//! selects for it transforms the value in apply order. Whatever comes out
//! is then turned into a JavaScript module by [`into_module_source`].

pub mod asset;
pub mod markup;
pub mod raster;
pub mod script;
pub mod style;

use std::path::{Path, PathBuf};

use kiln_config::{BuildConfig, LoaderStep, RuleSet};
use path_clean::PathClean;
use rustc_hash::FxHashMap;

use crate::output::BuildOutput;
use crate::{Error, Result};

/// CSS text moving between style steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Css {
    pub code: String,
    /// Set once a size-optimizing pass has printed the code.
    pub minified: bool,
}

/// Content of one file between loader steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderValue {
    /// Raw bytes, as read or as left by a byte-level step.
    Source(Vec<u8>),
    Css(Css),
    Markup(String),
    /// Public URL of an emitted file.
    AssetUrl(String),
    /// JavaScript module source.
    Module(String),
}

impl LoaderValue {
    fn kind(&self) -> &'static str {
        match self {
            LoaderValue::Source(_) => "raw source",
            LoaderValue::Css(_) => "css",
            LoaderValue::Markup(_) => "markup",
            LoaderValue::AssetUrl(_) => "asset url",
            LoaderValue::Module(_) => "module",
        }
    }
}

/// Result of running a file through its pipeline.
#[derive(Debug, Clone)]
pub struct Processed {
    pub value: LoaderValue,
    pub extracted_css: Option<String>,
}

/// Shared state for every loader invocation in one build pass.
pub struct LoaderContext<'a> {
    pub config: &'a BuildConfig,
    pub rules: &'a RuleSet,
    pub output: &'a mut BuildOutput,
    asset_urls: FxHashMap<PathBuf, String>,
}

impl<'a> LoaderContext<'a> {
    pub fn new(config: &'a BuildConfig, rules: &'a RuleSet, output: &'a mut BuildOutput) -> Self {
        Self {
            config,
            rules,
            output,
            asset_urls: FxHashMap::default(),
        }
    }

    /// Run `path` through the steps its rules select.
    pub fn process(&mut self, path: &Path) -> Result<Processed> {
        let bytes = std::fs::read(path).map_err(|e| Error::read(path, e))?;
        self.process_bytes(path, bytes)
    }

    pub fn process_bytes(&mut self, path: &Path, bytes: Vec<u8>) -> Result<Processed> {
        let resource = self.config.resource_name(path);
        let steps = self.rules.pipeline(&resource);
        tracing::trace!(resource = %resource, steps = steps.len(), "loading");

        let mut value = LoaderValue::Source(bytes);
        let mut extracted_css = None;

        for step in &steps {
            value = match step {
                LoaderStep::Sass => {
                    let source = text(value, step, &resource)?;
                    let code = style::compile_sass(path, &source)?;
                    LoaderValue::Css(Css {
                        code,
                        minified: false,
                    })
                }
                LoaderStep::Postcss { plugins } => {
                    let css = css(value, step, &resource)?;
                    LoaderValue::Css(style::postprocess(&resource, &css, plugins)?)
                }
                LoaderStep::Css => {
                    let css = css(value, step, &resource)?;
                    let base = path.parent().unwrap_or(Path::new("."));
                    let resolved = style::resolve_urls(&resource, &css, |url| {
                        self.resolve_reference(base, url)
                    })?;
                    LoaderValue::Css(resolved)
                }
                LoaderStep::StyleInject => {
                    let css = css(value, step, &resource)?;
                    LoaderValue::Module(style::inject_module(&css.code))
                }
                LoaderStep::CssExtract => {
                    let css = css(value, step, &resource)?;
                    extracted_css = Some(css.code);
                    LoaderValue::Module(style::EXTRACTED_MODULE.to_string())
                }
                LoaderStep::Babel { target } => {
                    let source = text(value, step, &resource)?;
                    LoaderValue::Module(script::downlevel(path, &source, target)?)
                }
                LoaderStep::Html => {
                    let source = text(value, step, &resource)?;
                    let base = path.parent().unwrap_or(Path::new("."));
                    let html = markup::rewrite_image_sources(&source, |src| {
                        self.resolve_reference(base, src)
                    })?;
                    LoaderValue::Markup(html)
                }
                LoaderStep::ImageOptimize { mozjpeg } => {
                    let bytes = self::bytes(value, step, &resource)?;
                    LoaderValue::Source(raster::optimize(path, bytes, mozjpeg)?)
                }
                LoaderStep::File { name } => {
                    let bytes = self::bytes(value, step, &resource)?;
                    LoaderValue::AssetUrl(asset::emit_file(self.output, path, bytes, name)?)
                }
            };
        }

        Ok(Processed {
            value,
            extracted_css,
        })
    }

    /// Public URL for a local file referenced from CSS or markup, or `None`
    /// when the reference is external and stays untouched.
    fn resolve_reference(&mut self, base: &Path, reference: &str) -> Result<Option<String>> {
        if !is_local_reference(reference) {
            return Ok(None);
        }
        let (file_part, suffix) = split_query(reference);
        let path = base.join(file_part).clean();
        let url = self.asset_url(&path)?;
        Ok(Some(format!("{}{}", url, suffix)))
    }

    /// Emit `path` as an asset and return its URL. Repeat calls are cached.
    pub fn asset_url(&mut self, path: &Path) -> Result<String> {
        if let Some(url) = self.asset_urls.get(path) {
            return Ok(url.clone());
        }
        if !path.is_file() {
            return Err(Error::Resolution {
                specifier: path.display().to_string(),
                importer: "asset reference".to_string(),
            });
        }
        let processed = self.process(path)?;
        let LoaderValue::AssetUrl(url) = processed.value else {
            return Err(Error::UnhandledFile(self.config.resource_name(path)));
        };
        self.asset_urls.insert(path.to_path_buf(), url.clone());
        Ok(url)
    }
}

/// Turn the final loader value into JavaScript module source.
pub fn into_module_source(path: &Path, resource: &str, value: LoaderValue) -> Result<String> {
    let export_string = |s: &str| -> Result<String> {
        Ok(format!("export default {};\n", serde_json::to_string(s).map_err(|e| {
            Error::transform("module", resource, e)
        })?))
    };

    match value {
        LoaderValue::Module(code) => Ok(code),
        LoaderValue::Css(css) => export_string(&css.code),
        LoaderValue::Markup(html) => export_string(&html),
        LoaderValue::AssetUrl(url) => export_string(&url),
        LoaderValue::Source(bytes) => match path.extension().and_then(|e| e.to_str()) {
            Some("js") | Some("mjs") => String::from_utf8(bytes)
                .map_err(|e| Error::transform("module", resource, e)),
            Some("json") => {
                let parsed: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
                    Error::Parse {
                        path: resource.to_string(),
                        message: e.to_string(),
                    }
                })?;
                Ok(format!("export default {};\n", parsed))
            }
            _ => Err(Error::UnhandledFile(resource.to_string())),
        },
    }
}

fn is_local_reference(reference: &str) -> bool {
    let lower = reference.trim().to_ascii_lowercase();
    !(lower.is_empty()
        || lower.starts_with("data:")
        || lower.starts_with("http:")
        || lower.starts_with("https:")
        || lower.starts_with("//")
        || lower.starts_with('/')
        || lower.starts_with('#')
        || lower.contains("<%")
        || lower.contains("{{"))
}

/// Split `a.svg#icon` or `font.woff?v=2` into the file and the suffix.
fn split_query(reference: &str) -> (&str, &str) {
    match reference.find(['?', '#']) {
        Some(index) => reference.split_at(index),
        None => (reference, ""),
    }
}

fn text(value: LoaderValue, step: &LoaderStep, resource: &str) -> Result<String> {
    match value {
        LoaderValue::Source(bytes) => {
            String::from_utf8(bytes).map_err(|e| Error::transform(step.name(), resource, e))
        }
        LoaderValue::Css(css) => Ok(css.code),
        LoaderValue::Markup(html) => Ok(html),
        LoaderValue::Module(code) => Ok(code),
        other => Err(unexpected(step, resource, &other)),
    }
}

fn css(value: LoaderValue, step: &LoaderStep, resource: &str) -> Result<Css> {
    match value {
        LoaderValue::Css(css) => Ok(css),
        other => Ok(Css {
            code: text(other, step, resource)?,
            minified: false,
        }),
    }
}

fn bytes(value: LoaderValue, step: &LoaderStep, resource: &str) -> Result<Vec<u8>> {
    match value {
        LoaderValue::Source(bytes) => Ok(bytes),
        LoaderValue::Css(css) => Ok(css.code.into_bytes()),
        LoaderValue::Markup(html) => Ok(html.into_bytes()),
        other => Err(unexpected(step, resource, &other)),
    }
}

fn unexpected(step: &LoaderStep, resource: &str, value: &LoaderValue) -> Error {
    Error::transform(
        step.name(),
        resource,
        format!("cannot accept {} input", value.kind()),
    )
}
