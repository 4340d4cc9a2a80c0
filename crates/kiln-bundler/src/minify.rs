//! Production minification of assembled bundles.

use std::path::PathBuf;

use kiln_config::Minimizer;
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{CompressOptions, MangleOptions, Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct Minified {
    pub code: String,
    /// Source map JSON, when the minimizer asks for one.
    pub map: Option<String>,
}

/// Compress and mangle `code`, the bundle written to `filename`.
///
/// With a source map the code ends in a `sourceMappingURL` comment naming
/// `<filename>.map`.
pub fn minify_bundle(filename: &str, code: &str, minimizer: &Minimizer) -> Result<Minified> {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, code, SourceType::mjs()).parse();
    if let Some(error) = parsed.errors.first() {
        return Err(Error::Minify {
            filename: filename.to_string(),
            message: error.message.to_string(),
        });
    }
    let mut program = parsed.program;

    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions {
            drop_console: minimizer.compress.drop_console,
            ..CompressOptions::default()
        }),
    };
    let minified = Minifier::new(options).minify(&allocator, &mut program);

    let printed = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            source_map_path: minimizer.source_map.then(|| PathBuf::from(filename)),
            ..CodegenOptions::default()
        })
        .with_scoping(minified.scoping)
        .build(&program);

    let map = printed.map.map(|map| map.to_json_string());
    let mut code = printed.code;
    if map.is_some() {
        let basename = filename.rsplit('/').next().unwrap_or(filename);
        code.push_str(&format!("\n//# sourceMappingURL={}.map\n", basename));
    }

    tracing::debug!(filename, size = code.len(), "minified bundle");
    Ok(Minified { code, map })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_config::CompressSettings;

    fn minimizer(source_map: bool, drop_console: bool) -> Minimizer {
        Minimizer {
            source_map,
            compress: CompressSettings {
                inline: false,
                drop_console,
            },
        }
    }

    const SOURCE: &str = "function greet(personName) {\n  console.log(personName);\n  return 'hello ' + personName;\n}\nwindow.greeting = greet('kiln');\n";

    #[test]
    fn console_calls_are_dropped_and_map_is_linked() {
        let out = minify_bundle("bundle.js", SOURCE, &minimizer(true, true)).unwrap();
        assert!(!out.code.contains("console.log"));
        assert!(out.code.len() < SOURCE.len() + 40);
        assert!(out.code.contains("//# sourceMappingURL=bundle.js.map"));

        let map: serde_json::Value = serde_json::from_str(out.map.as_deref().unwrap()).unwrap();
        assert_eq!(map["version"], 3);
    }

    #[test]
    fn console_is_kept_when_not_dropped() {
        let out = minify_bundle("bundle.js", SOURCE, &minimizer(false, false)).unwrap();
        assert!(out.code.contains("console.log"));
        assert!(out.map.is_none());
        assert!(!out.code.contains("sourceMappingURL"));
    }

    #[test]
    fn invalid_bundle_is_a_minify_error() {
        let err = minify_bundle("bundle.js", "function (", &minimizer(true, true)).unwrap_err();
        assert!(matches!(err, Error::Minify { .. }));
    }
}
