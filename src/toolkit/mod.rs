// OXC adapter - parse, collect module references, print
//
// The bundler never touches AST node types outside this module. The arena
// allocator keeps the AST lifetime confined to `analyze`, so callers only
// ever see owned strings and counts.

use crate::error::CompileError;
use oxc_allocator::Allocator;
use oxc_ast::ast::{Argument, CallExpression, Expression, ImportDeclaration, ImportExpression};
use oxc_ast_visit::{walk, Visit};
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::path::Path;

/// Per-file reference counts reported to `after_parse` taps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AstStats {
    /// `import … from "…"` declarations
    pub static_imports: usize,
    /// `require("…")` and `import("…")` calls with a literal argument
    pub dynamic_requires: usize,
}

/// Result of analyzing one source file.
#[derive(Debug, Clone)]
pub struct AnalyzedSource {
    /// Code printed back from the AST
    pub code: String,
    /// Raw specifiers in document order, deduplicated
    pub specifiers: Vec<String>,
    pub stats: AstStats,
}

/// Parse `source`, collect every statically- and dynamically-referenced
/// specifier, and print the AST back to text.
///
/// # Errors
///
/// `CompileError::Syntax` when the parser reports errors.
pub fn analyze(source: &str, path: &Path) -> Result<AnalyzedSource, CompileError> {
    let source_type = SourceType::from_path(path)
        .unwrap_or_else(|_| SourceType::mjs())
        .with_module(true);
    let allocator = Allocator::default();

    let parsed = Parser::new(&allocator, source, source_type).parse();
    if !parsed.errors.is_empty() {
        let message = parsed
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        return Err(CompileError::Syntax {
            path: path.to_path_buf(),
            message,
        });
    }

    let mut collector = SpecifierCollector::default();
    collector.visit_program(&parsed.program);

    let code = Codegen::new().build(&parsed.program).code;

    Ok(AnalyzedSource {
        code,
        specifiers: collector.specifiers,
        stats: collector.stats,
    })
}

/// Visitor collecting module references in document order.
#[derive(Default)]
struct SpecifierCollector {
    specifiers: Vec<String>,
    stats: AstStats,
}

impl SpecifierCollector {
    fn push(&mut self, specifier: &str) {
        if !self.specifiers.iter().any(|s| s == specifier) {
            self.specifiers.push(specifier.to_string());
        }
    }
}

impl<'a> Visit<'a> for SpecifierCollector {
    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        self.stats.static_imports += 1;
        self.push(decl.source.value.as_str());
        walk::walk_import_declaration(self, decl);
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &call.callee {
            if callee.name == "require" {
                self.stats.dynamic_requires += 1;
                // Only literal-string arguments are statically bundleable.
                if let Some(Argument::StringLiteral(lit)) = call.arguments.first() {
                    self.push(lit.value.as_str());
                }
            }
        }
        walk::walk_call_expression(self, call);
    }

    fn visit_import_expression(&mut self, expr: &ImportExpression<'a>) {
        if let Expression::StringLiteral(lit) = &expr.source {
            self.stats.dynamic_requires += 1;
            self.push(lit.value.as_str());
        }
        walk::walk_import_expression(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn analyze_js(source: &str) -> AnalyzedSource {
        analyze(source, &PathBuf::from("test.js")).expect("analysis should succeed")
    }

    #[test]
    fn collects_static_imports_in_document_order() {
        let out = analyze_js(
            r#"
            import { a } from "./a";
            import b from "./b";
            import "./side-effect";
            "#,
        );
        assert_eq!(out.specifiers, vec!["./a", "./b", "./side-effect"]);
        assert_eq!(out.stats.static_imports, 3);
        assert_eq!(out.stats.dynamic_requires, 0);
    }

    #[test]
    fn collects_require_calls_with_literal_argument() {
        let out = analyze_js(
            r#"
            const a = require("./a");
            const dynamic = require(someVariable);
            function later() { return require("./nested/dep"); }
            "#,
        );
        assert_eq!(out.specifiers, vec!["./a", "./nested/dep"]);
        assert_eq!(out.stats.dynamic_requires, 3);
    }

    #[test]
    fn collects_dynamic_import_expressions() {
        let out = analyze_js(r#"const mod = import("./lazy");"#);
        assert_eq!(out.specifiers, vec!["./lazy"]);
        assert_eq!(out.stats.dynamic_requires, 1);
    }

    #[test]
    fn mixed_references_keep_document_order_and_dedupe() {
        let out = analyze_js(
            r#"
            import { x } from "./shared";
            const y = require("./other");
            const z = require("./shared");
            "#,
        );
        assert_eq!(out.specifiers, vec!["./shared", "./other"]);
    }

    #[test]
    fn printed_code_round_trips_semantics() {
        let out = analyze_js("const add = (a, b) => a + b;");
        assert!(out.code.contains("add"));
        assert!(out.code.contains("=>"));
    }

    #[test]
    fn syntax_error_reported_with_path() {
        let err = analyze("const x = ", &PathBuf::from("broken.js")).unwrap_err();
        match err {
            CompileError::Syntax { path, message } => {
                assert_eq!(path, PathBuf::from("broken.js"));
                assert!(!message.is_empty());
            }
            other => panic!("expected Syntax error, got {other:?}"),
        }
    }

    #[test]
    fn module_with_no_references() {
        let out = analyze_js("export const x = 5;");
        assert!(out.specifiers.is_empty());
        assert_eq!(out.stats, AstStats::default());
    }
}
