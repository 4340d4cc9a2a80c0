//! The `babel` step: downlevel modern syntax with the oxc transformer.

use std::path::Path;

use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{TransformOptions, Transformer};

use crate::{Error, Result};

const STEP: &str = "babel";

/// Parse `source` as an ES module and print it back lowered to `target`.
pub fn downlevel(path: &Path, source: &str, target: &str) -> Result<String> {
    let display = path.display().to_string();
    let options = TransformOptions::from_target(target)
        .map_err(|e| Error::transform(STEP, display.clone(), e))?;

    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, source, SourceType::mjs()).parse();
    if let Some(error) = parsed.errors.first() {
        return Err(Error::Parse {
            path: display,
            message: error.message.to_string(),
        });
    }
    let mut program = parsed.program;

    let scoping = SemanticBuilder::new()
        .build(&program)
        .semantic
        .into_scoping();

    let transformed = Transformer::new(&allocator, path, &options)
        .build_with_scoping(scoping, &mut program);
    if let Some(error) = transformed.errors.first() {
        return Err(Error::transform(STEP, display, error.message.to_string()));
    }

    Ok(Codegen::new().build(&program).code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn es2015_syntax_and_module_statements_survive() {
        let out = downlevel(
            Path::new("src/index.js"),
            "import { a } from './a.js';\nexport const double = (n) => n * a;\n",
            "es2015",
        )
        .unwrap();
        assert!(out.contains("export const double"));
        assert!(out.contains("=>"));
        assert!(out.contains("./a.js"));
    }

    #[test]
    fn exponent_operator_is_lowered_for_es2015() {
        let out = downlevel(Path::new("src/math.js"), "export const sq = 3 ** 2;\n", "es2015").unwrap();
        assert!(!out.contains("**"));
        assert!(out.contains("Math.pow"));
    }

    #[test]
    fn syntax_errors_are_reported_with_path() {
        let err = downlevel(Path::new("src/broken.js"), "const = ;", "es2015").unwrap_err();
        match err {
            Error::Parse { path, .. } => assert_eq!(path, "src/broken.js"),
            other => panic!("unexpected error: {}", other),
        }
    }
}
