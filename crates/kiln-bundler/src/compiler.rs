//! Build execution.
//!
//! One [`Compiler::compile`] call is one build pass over a resolved
//! configuration. Nothing touches the output directory here; the pass
//! returns a [`BuildOutput`] that the caller writes as one set.

use std::path::{Path, PathBuf};
use std::time::Instant;

use kiln_config::{BuildConfig, NAME_PLACEHOLDER};

use crate::graph::{self, LinkedModule, ModuleGraph};
use crate::linker;
use crate::loaders::{self, LoaderContext};
use crate::minify;
use crate::output::{BuildOutput, OutputKind};
use crate::plugins::{PageAssets, favicon, html};
use crate::runtime;
use crate::{Error, Result};

/// Runs build passes for one resolved configuration.
#[derive(Debug, Clone)]
pub struct Compiler {
    config: BuildConfig,
}

/// The bundle written for one entry.
struct EntryBundle {
    script: String,
    stylesheet: Option<String>,
}

impl Compiler {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Run one build pass.
    ///
    /// Any failure aborts the pass; no partial output is returned.
    pub fn compile(&self) -> Result<BuildOutput> {
        let start = Instant::now();
        let config = &self.config;
        let rules = config.rule_set()?;

        if config.entry.len() > 1 && !config.output.filename.contains(NAME_PLACEHOLDER) {
            return Err(Error::OutputConflict(format!(
                "{} entries would all be written to '{}'",
                config.entry.len(),
                config.output.filename
            )));
        }

        let mut output = BuildOutput::new();
        let mut ctx = LoaderContext::new(config, &rules, &mut output);

        let favicons = match config.favicon_logo() {
            Some(logo) => Some(favicon::generate(ctx.output, &config.context.join(logo))?),
            None => None,
        };

        let mut bundles = Vec::with_capacity(config.entry.len());
        for (name, entry) in &config.entry {
            bundles.push(self.bundle_entry(&mut ctx, name, entry)?);
        }

        let assets = PageAssets {
            styles: bundles.iter().filter_map(|b| b.stylesheet.clone()).collect(),
            scripts: bundles.iter().map(|b| b.script.clone()).collect(),
            head: favicons.as_ref().map(|f| f.html()),
        };
        for (filename, template) in config.html_pages() {
            let template = config.context.join(template);
            html::emit_page(&mut ctx, filename, &template, &assets)?;
        }

        tracing::info!(
            mode = %config.mode,
            files = output.len(),
            bytes = output.total_size(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "build finished"
        );
        Ok(output)
    }

    fn bundle_entry(
        &self,
        ctx: &mut LoaderContext<'_>,
        name: &str,
        entry: &Path,
    ) -> Result<EntryBundle> {
        let config = &self.config;
        let entry_path = config.context.join(entry);
        if !entry_path.is_file() {
            return Err(Error::Resolution {
                specifier: entry.display().to_string(),
                importer: format!("entry '{}'", name),
            });
        }

        let graph = build_graph(ctx, &entry_path)?;
        tracing::debug!(entry = name, modules = graph.modules.len(), "module graph");

        let filename = config.bundle_filename(name);
        let mut script = runtime::assemble(&graph);

        if let Some(minimizer) = config.optimization.minimizer.first() {
            let minified = minify::minify_bundle(&filename, &script, minimizer)?;
            if let Some(map) = minified.map {
                ctx.output.emit(
                    format!("{}.map", filename),
                    map.into_bytes(),
                    OutputKind::SourceMap,
                )?;
            }
            script = minified.code;
        }
        ctx.output
            .emit(filename.clone(), script.into_bytes(), OutputKind::Script)?;

        let extracted = graph.extracted_css();
        let stylesheet = match config.css_filename(name) {
            Some(css_name) if !extracted.is_empty() => {
                ctx.output.emit(
                    css_name.clone(),
                    extracted.join("\n").into_bytes(),
                    OutputKind::Stylesheet,
                )?;
                Some(css_name)
            }
            _ => None,
        };

        Ok(EntryBundle {
            script: filename,
            stylesheet,
        })
    }
}

/// Load and link every module reachable from `entry`, depth first.
fn build_graph(ctx: &mut LoaderContext<'_>, entry: &Path) -> Result<ModuleGraph> {
    let context = ctx.config.context.clone();
    let mut graph = ModuleGraph::new(graph::module_id(&context, entry));
    let mut pending: Vec<PathBuf> = vec![entry.to_path_buf()];

    while let Some(path) = pending.pop() {
        let id = graph::module_id(&context, &path);
        if graph.contains(&id) {
            continue;
        }

        let (module, imports) = load_module(ctx, &context, &path)?;
        // Reversed so the first import is visited first.
        for (dep_id, dep_path) in imports.into_iter().rev() {
            if !graph.contains(&dep_id) {
                pending.push(dep_path);
            }
        }
        graph.modules.insert(id, module);
    }

    Ok(graph)
}

/// Load and link one module, returning it with its resolved imports.
fn load_module(
    ctx: &mut LoaderContext<'_>,
    context: &Path,
    path: &Path,
) -> Result<(LinkedModule, Vec<(String, PathBuf)>)> {
    let resource = ctx.config.resource_name(path);
    let processed = ctx.process(path)?;
    let source = loaders::into_module_source(path, &resource, processed.value)?;

    let mut resolved = Vec::new();
    let linked = linker::link(&resource, &source, |specifier| {
        let target = graph::resolve_specifier(path, specifier)?;
        let id = graph::module_id(context, &target);
        resolved.push((id.clone(), target));
        Ok(id)
    })?;

    Ok((
        LinkedModule {
            path: path.to_path_buf(),
            code: linked.code,
            dependencies: linked.dependencies,
            extracted_css: processed.extracted_css,
        },
        resolved,
    ))
}
