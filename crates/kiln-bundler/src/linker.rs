//! ES module linking.
//!
//! Each module's `import` and `export` statements are rewritten in place
//! into calls on the bundle's module registry. The rewritten text becomes a
//! function body taking `(module, exports, __kiln_require)`.
//!
//! Exports are registered up front as getters. Imported bindings become a
//! namespace variable per import, and every reference to one is rewritten
//! to a property read on that namespace, so importers see the current value
//! and a cycle only touches a binding when it is actually used.

use oxc_allocator::Allocator;
use oxc_ast::AstKind;
use oxc_ast::ast::{
    BindingIdentifier, Declaration, ExportDefaultDeclarationKind, ImportDeclarationSpecifier,
    Statement,
};
use oxc_parser::Parser;
use oxc_semantic::{SemanticBuilder, SymbolId};
use oxc_span::{GetSpan, SourceType, Span};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{Error, Result};

const REQUIRE: &str = "__kiln_require";
const DEFAULT_LOCAL: &str = "__kiln_default";

/// A module body ready for the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedSource {
    pub code: String,
    /// Resolved ids of required modules: imports in source order, then
    /// re-export sources.
    pub dependencies: Vec<String>,
}

/// An imported local and the namespace read that replaces it.
struct Binding {
    symbol: SymbolId,
    local: String,
    expr: String,
}

struct Edit {
    start: usize,
    end: usize,
    text: String,
}

#[derive(Default)]
struct Linker {
    edits: Vec<Edit>,
    /// `(exported name, expression)` pairs exposed through getters.
    exports: Vec<(String, String)>,
    dependencies: Vec<String>,
    namespaces: usize,
    bindings: Vec<Binding>,
    /// Imported local name to its namespace read.
    imported: FxHashMap<String, String>,
}

impl Linker {
    fn replace(&mut self, span: Span, text: String) {
        self.edits.push(Edit {
            start: span.start as usize,
            end: span.end as usize,
            text,
        });
    }

    fn splice(&mut self, start: u32, end: u32, text: &str) {
        self.replace(Span::new(start, end), text.to_string());
    }

    fn depend(&mut self, id: &str) -> String {
        if !self.dependencies.iter().any(|d| d == id) {
            self.dependencies.push(id.to_string());
        }
        format!("{}({})", REQUIRE, js_string(id))
    }

    fn namespace(&mut self) -> String {
        self.namespaces += 1;
        format!("__kiln_ns_{}", self.namespaces)
    }

    fn bind(&mut self, local: &BindingIdentifier<'_>, expr: String) {
        self.imported.insert(local.name.to_string(), expr.clone());
        self.bindings.push(Binding {
            symbol: local.symbol_id(),
            local: local.name.to_string(),
            expr,
        });
    }

    /// The expression a module-level `local` resolves to.
    fn local_expr(&self, local: &str) -> String {
        self.imported
            .get(local)
            .cloned()
            .unwrap_or_else(|| local.to_string())
    }

    fn export(&mut self, exported: impl Into<String>, expr: impl Into<String>) {
        self.exports.push((exported.into(), expr.into()));
    }
}

/// Rewrite `source` for the registry. `resolve` maps specifiers to ids.
pub fn link<F>(resource: &str, source: &str, mut resolve: F) -> Result<LinkedSource>
where
    F: FnMut(&str) -> Result<String>,
{
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, source, SourceType::mjs()).parse();
    if let Some(error) = parsed.errors.first() {
        return Err(Error::Parse {
            path: resource.to_string(),
            message: error.message.to_string(),
        });
    }
    let semantic = SemanticBuilder::new().build(&parsed.program).semantic;

    let mut linker = Linker::default();

    // Imports are hoisted, so every binding is known before exports are read.
    for statement in &parsed.program.body {
        let Statement::ImportDeclaration(decl) = statement else {
            continue;
        };
        if decl.import_kind.is_type() {
            linker.replace(decl.span, String::new());
            continue;
        }
        let id = resolve(decl.source.value.as_str())?;
        let require = linker.depend(&id);

        let Some(specifiers) = decl.specifiers.as_ref().filter(|s| !s.is_empty()) else {
            linker.replace(decl.span, format!("{};", require));
            continue;
        };
        let ns = linker.namespace();
        for specifier in specifiers {
            match specifier {
                ImportDeclarationSpecifier::ImportSpecifier(s) => {
                    linker.bind(&s.local, member(&ns, s.imported.name().as_str()));
                }
                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                    linker.bind(&s.local, member(&ns, "default"));
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                    linker.bind(&s.local, ns.clone());
                }
            }
        }
        linker.replace(decl.span, format!("var {} = {};", ns, require));
    }

    for statement in &parsed.program.body {
        match statement {
            Statement::ExportNamedDeclaration(decl) => {
                if decl.export_kind.is_type() {
                    linker.replace(decl.span, String::new());
                    continue;
                }

                if let Some(declaration) = &decl.declaration {
                    for name in declared_names(declaration) {
                        linker.export(name.clone(), name);
                    }
                    linker.splice(decl.span.start, declaration.span().start, "");
                    continue;
                }

                match &decl.source {
                    Some(from) => {
                        let id = resolve(from.value.as_str())?;
                        let require = linker.depend(&id);
                        let ns = linker.namespace();
                        for specifier in &decl.specifiers {
                            let local = specifier.local.name();
                            linker.export(
                                specifier.exported.name().to_string(),
                                member(&ns, local.as_str()),
                            );
                        }
                        linker.replace(decl.span, format!("var {} = {};", ns, require));
                    }
                    None => {
                        for specifier in &decl.specifiers {
                            let expr = linker.local_expr(specifier.local.name().as_str());
                            linker.export(specifier.exported.name().to_string(), expr);
                        }
                        linker.replace(decl.span, String::new());
                    }
                }
            }

            Statement::ExportDefaultDeclaration(decl) => {
                let declaration_start = decl.declaration.span().start;
                let named = match &decl.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                        func.id.as_ref().map(|id| id.name.to_string())
                    }
                    ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                        class.id.as_ref().map(|id| id.name.to_string())
                    }
                    _ => None,
                };
                match named {
                    Some(local) => {
                        linker.splice(decl.span.start, declaration_start, "");
                        linker.export("default", local);
                    }
                    None => {
                        let text = format!("var {} = ", DEFAULT_LOCAL);
                        linker.splice(decl.span.start, declaration_start, &text);
                        // Anonymous function and class declarations carry no `;`.
                        linker.splice(decl.span.end, decl.span.end, ";");
                        linker.export("default", DEFAULT_LOCAL);
                    }
                }
            }

            Statement::ExportAllDeclaration(decl) => {
                if decl.export_kind.is_type() {
                    linker.replace(decl.span, String::new());
                    continue;
                }
                let id = resolve(decl.source.value.as_str())?;
                let require = linker.depend(&id);
                match &decl.exported {
                    Some(exported) => {
                        let ns = linker.namespace();
                        linker.export(exported.name().to_string(), ns.clone());
                        linker.replace(decl.span, format!("var {} = {};", ns, require));
                    }
                    None => {
                        linker.replace(
                            decl.span,
                            format!("{}.s(exports, {});", REQUIRE, require),
                        );
                    }
                }
            }

            _ => {}
        }
    }

    // Every use of an imported binding reads through the namespace.
    let shorthand: FxHashSet<u32> = semantic
        .nodes()
        .iter()
        .filter_map(|node| match node.kind() {
            AstKind::ObjectProperty(prop) if prop.shorthand => Some(prop.value.span().start),
            _ => None,
        })
        .collect();
    let scoping = semantic.scoping();
    for binding in std::mem::take(&mut linker.bindings) {
        for &reference_id in scoping.get_resolved_reference_ids(binding.symbol) {
            let node_id = scoping.get_reference(reference_id).node_id();
            let span = semantic.nodes().get_node(node_id).kind().span();
            let text = if shorthand.contains(&span.start) {
                format!("{}: {}", binding.local, binding.expr)
            } else {
                binding.expr.clone()
            };
            linker.replace(span, text);
        }
    }

    Ok(LinkedSource {
        code: apply(source, linker.edits, &linker.exports),
        dependencies: linker.dependencies,
    })
}

/// `ns.name`, or `ns["name"]` when `name` is not an identifier.
fn member(ns: &str, name: &str) -> String {
    let mut chars = name.chars();
    let identifier = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if identifier {
        format!("{}.{}", ns, name)
    } else {
        format!("{}[{}]", ns, js_string(name))
    }
}

fn declared_names(declaration: &Declaration<'_>) -> Vec<String> {
    match declaration {
        Declaration::VariableDeclaration(var) => var
            .declarations
            .iter()
            .flat_map(|d| d.id.get_binding_identifiers())
            .map(|id| id.name.to_string())
            .collect(),
        Declaration::FunctionDeclaration(func) => {
            func.id.iter().map(|id| id.name.to_string()).collect()
        }
        Declaration::ClassDeclaration(class) => {
            class.id.iter().map(|id| id.name.to_string()).collect()
        }
        _ => Vec::new(),
    }
}

fn apply(source: &str, mut edits: Vec<Edit>, exports: &[(String, String)]) -> String {
    edits.sort_by_key(|edit| edit.start);

    let mut out = String::with_capacity(source.len() + 64);
    if !exports.is_empty() {
        let getters: Vec<String> = exports
            .iter()
            .map(|(name, expr)| format!("{}: function () {{ return {}; }}", js_string(name), expr))
            .collect();
        out.push_str(&format!("{}.d(exports, {{ {} }});\n", REQUIRE, getters.join(", ")));
    }

    let mut cursor = 0;
    for edit in edits {
        if edit.start < cursor {
            continue;
        }
        out.push_str(&source[cursor..edit.start]);
        out.push_str(&edit.text);
        cursor = edit.end;
    }
    out.push_str(&source[cursor..]);
    out
}

pub(crate) fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
