//! Declaration and reset synthesis.
//!
//! Declaration shells are rendered as text and parsed into the caller's
//! allocator; function bodies are then filled with assignments built through
//! `AstBuilder`. Template text is prefixed with enough blank space that every
//! synthesized span lies past the end of the original source, so the emitter
//! never attaches one of the file's comments to a synthesized node.

use oxc_allocator::{Allocator, Vec as ArenaVec};
use oxc_ast::ast::*;
use oxc_ast::AstBuilder;
use oxc_parser::Parser;
use oxc_span::{SourceType, SPAN};

use crate::error::{TransformError, INJ_ERR_INTERNAL};
use crate::naming::{GeneratedNames, OVERWRITE_PARAM, RESET_FUNCTION};
use crate::scope::{declared_names, declaring_statement, Binding};

/// Where a target's declaration block landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Front of the module body.
    Prepended,
    /// Directly after the statement that initializes the target.
    AfterDeclaration(usize),
}

pub struct Injector<'a> {
    allocator: &'a Allocator,
    ast: AstBuilder<'a>,
    source_type: SourceType,
    padding: usize,
    file: String,
}

impl<'a> Injector<'a> {
    pub fn new(allocator: &'a Allocator, source_type: SourceType, source_len: usize, file: &str) -> Self {
        Injector {
            allocator,
            ast: AstBuilder::new(allocator),
            source_type,
            padding: source_len + 1,
            file: file.to_string(),
        }
    }

    /// Inserts `default<K>`, `overwritten<K>` and `overwrite<K>` for one target
    /// and appends the `injectable<K>` export.
    pub fn inject(
        &self,
        program: &mut Program<'a>,
        binding: &Binding,
        names: &GeneratedNames,
    ) -> Result<Placement, TransformError> {
        let template = format!(
            "var {default} = {target};\nvar {overwritten} = {target};\nfunction {overwrite}({param}) {{}}\n",
            default = names.default,
            overwritten = names.overwritten,
            target = names.target,
            overwrite = names.overwrite,
            param = OVERWRITE_PARAM,
        );
        let mut block = self.parse_statements(&template)?;

        let assign = self.assignment(&names.overwritten, OVERWRITE_PARAM);
        match block.last_mut() {
            Some(Statement::FunctionDeclaration(func)) => self.push_into_body(func, assign)?,
            _ => return Err(self.internal("override function missing from declaration block")),
        }

        let placement = if binding.is_hoisted() {
            Placement::Prepended
        } else {
            let index = binding
                .symbol
                .and_then(|symbol| declaring_statement(program, symbol))
                .ok_or_else(|| {
                    self.internal(&format!("no declaring statement for \"{}\"", binding.name))
                })?;
            Placement::AfterDeclaration(index)
        };

        let at = match placement {
            Placement::Prepended => 0,
            Placement::AfterDeclaration(index) => index + 1,
        };
        for (offset, stmt) in block.into_iter().enumerate() {
            program.body.insert(at + offset, stmt);
        }

        let export = format!(
            "export var {} = {};\n",
            names.injectable, names.overwrite
        );
        for stmt in self.parse_statements(&export)? {
            program.body.push(stmt);
        }

        Ok(placement)
    }

    /// Rewrites `export let K = ...` as a plain `let K = ...` and exports the
    /// alias under the public name instead, so importers observe the writes that
    /// now land on `overwritten<K>`. Other names in the same declaration keep
    /// exporting themselves. Returns how many declarations were re-pointed.
    pub fn repoint_exports(
        &self,
        program: &mut Program<'a>,
        targets: &[GeneratedNames],
    ) -> Result<usize, TransformError> {
        let mut specifiers = Vec::new();
        let mut repointed = 0;

        for stmt in program.body.iter_mut() {
            let Statement::ExportNamedDeclaration(export) = &mut *stmt else {
                continue;
            };
            let Some(Declaration::VariableDeclaration(decl)) = &export.declaration else {
                continue;
            };
            if decl.declare {
                continue;
            }
            let names: Vec<String> = declared_names(decl).iter().map(|id| id.name.to_string()).collect();
            let aliased: Vec<Option<&GeneratedNames>> = names
                .iter()
                .map(|name| targets.iter().find(|t| &t.target == name))
                .collect();
            if aliased.iter().all(Option::is_none) {
                continue;
            }
            for (name, alias) in names.iter().zip(&aliased) {
                match alias {
                    Some(generated) => specifiers.push(format!("{} as {}", generated.overwritten, name)),
                    None => specifiers.push(name.clone()),
                }
            }

            let span = export.span;
            if let Some(Declaration::VariableDeclaration(mut decl)) = export.declaration.take() {
                // Leading comments are keyed on the statement start.
                decl.span = span;
                *stmt = Statement::VariableDeclaration(decl);
                repointed += 1;
            }
        }

        if !specifiers.is_empty() {
            let export = format!("export {{ {} }};\n", specifiers.join(", "));
            for stmt in self.parse_statements(&export)? {
                program.body.push(stmt);
            }
        }
        Ok(repointed)
    }

    /// Appends `export function resetAllInjects() { ... }` with one restore per target.
    pub fn append_reset(&self, program: &mut Program<'a>, targets: &[GeneratedNames]) -> Result<(), TransformError> {
        let template = format!("export function {}() {{}}\n", RESET_FUNCTION);
        let mut block = self.parse_statements(&template)?;
        let Some(Statement::ExportNamedDeclaration(export)) = block.first_mut() else {
            return Err(self.internal("reset export missing from template"));
        };
        let Some(Declaration::FunctionDeclaration(func)) = &mut export.declaration else {
            return Err(self.internal("reset export is not a function"));
        };
        for names in targets {
            let restore = self.assignment(&names.overwritten, &names.default);
            self.push_into_body(func, restore)?;
        }
        for stmt in block {
            program.body.push(stmt);
        }
        Ok(())
    }

    /// `target = value;`
    fn assignment(&self, target: &str, value: &str) -> Statement<'a> {
        let target: &'a str = self.allocator.alloc_str(target);
        let value: &'a str = self.allocator.alloc_str(value);
        let left = SimpleAssignmentTarget::AssignmentTargetIdentifier(
            self.ast.alloc(self.ast.identifier_reference(SPAN, target)),
        );
        self.ast.statement_expression(
            SPAN,
            self.ast.expression_assignment(
                SPAN,
                AssignmentOperator::Assign,
                AssignmentTarget::from(left),
                self.ast.expression_identifier(SPAN, value),
            ),
        )
    }

    fn push_into_body(&self, func: &mut Function<'a>, stmt: Statement<'a>) -> Result<(), TransformError> {
        match &mut func.body {
            Some(body) => {
                body.statements.push(stmt);
                Ok(())
            }
            None => Err(self.internal("synthesized function has no body")),
        }
    }

    fn parse_statements(&self, text: &str) -> Result<ArenaVec<'a, Statement<'a>>, TransformError> {
        let padded = format!("{}{}", " ".repeat(self.padding), text);
        let padded: &'a str = self.allocator.alloc_str(&padded);
        let ret = Parser::new(self.allocator, padded, self.source_type).parse();
        if ret.panicked || !ret.errors.is_empty() {
            let detail = ret
                .errors
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "parser panicked".to_string());
            return Err(self.internal(&format!("template failed to parse: {}", detail)));
        }
        Ok(ret.program.body)
    }

    fn internal(&self, message: &str) -> TransformError {
        TransformError::new(INJ_ERR_INTERNAL, message, &self.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::resolve_binding;
    use oxc_codegen::Codegen;
    use oxc_semantic::SemanticBuilder;

    fn source_type() -> SourceType {
        SourceType::default()
            .with_module(true)
            .with_typescript(true)
            .with_jsx(true)
    }

    fn inject_one(code: &str, target: &str) -> (String, Placement) {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, code, source_type()).parse();
        assert!(ret.errors.is_empty());
        let mut program = ret.program;
        let _scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();

        let binding = resolve_binding(&program, target);
        let names = GeneratedNames::for_target(target);
        let injector = Injector::new(&allocator, source_type(), code.len(), "test.js");
        let placement = injector.inject(&mut program, &binding, &names).unwrap();
        injector.append_reset(&mut program, &[names]).unwrap();
        (Codegen::new().build(&program).code, placement)
    }

    #[test]
    fn test_import_block_is_prepended() {
        let (out, placement) = inject_one("import { fetch } from './http';\n", "fetch");
        assert_eq!(placement, Placement::Prepended);
        let default_at = out.find("var defaultFetch = fetch").unwrap();
        let import_at = out.find("import { fetch }").unwrap();
        assert!(default_at < import_at);
        assert!(out.contains("var overwrittenFetch = fetch"));
        assert!(out.contains("function overwriteFetch(paramOverwrite)"));
        assert!(out.contains("overwrittenFetch = paramOverwrite"));
        assert!(out.contains("export var injectableFetch = overwriteFetch"));
        assert!(out.contains("export function resetAllInjects()"));
        assert!(out.contains("overwrittenFetch = defaultFetch"));
    }

    #[test]
    fn test_const_block_follows_declaration() {
        let (out, placement) = inject_one(
            "import a from 'a';\nconst limit = a * 2;\nexport default limit;\n",
            "limit",
        );
        assert_eq!(placement, Placement::AfterDeclaration(1));
        let decl_at = out.find("const limit").unwrap();
        let default_at = out.find("var defaultLimit = limit").unwrap();
        let export_at = out.find("export default").unwrap();
        assert!(decl_at < default_at);
        assert!(default_at < export_at);
    }

    #[test]
    fn test_comments_are_not_duplicated() {
        let code = "// leading\nimport { fetch } from './http';\n/* keep */\nfetch();\n";
        let (out, _) = inject_one(code, "fetch");
        assert_eq!(out.matches("keep").count(), 1);
    }

    #[test]
    fn test_exported_declaration_is_repointed() {
        let allocator = Allocator::default();
        let code = "// counter\nexport let count = 0, step = 1;\nexport const label = 'n';\n";
        let mut program = Parser::new(&allocator, code, source_type()).parse().program;
        let injector = Injector::new(&allocator, source_type(), code.len(), "m.js");
        let repointed = injector
            .repoint_exports(&mut program, &[GeneratedNames::for_target("count")])
            .unwrap();
        assert_eq!(repointed, 1);
        assert!(matches!(program.body[0], Statement::VariableDeclaration(_)));
        assert!(matches!(program.body[1], Statement::ExportNamedDeclaration(_)));

        let out = Codegen::new().build(&program).code;
        assert!(out.contains("export { overwrittenCount as count, step };"));
        assert!(out.contains("export const label"));
        assert_eq!(out.matches("counter").count(), 1);
    }

    #[test]
    fn test_reset_orders_restores_by_target() {
        let allocator = Allocator::default();
        let code = "import { a, b } from './m';\n";
        let mut program = Parser::new(&allocator, code, source_type()).parse().program;
        let injector = Injector::new(&allocator, source_type(), code.len(), "m.js");
        let targets = vec![GeneratedNames::for_target("b"), GeneratedNames::for_target("a")];
        injector.append_reset(&mut program, &targets).unwrap();
        let out = Codegen::new().build(&program).code;
        let b_at = out.find("overwrittenB = defaultB").unwrap();
        let a_at = out.find("overwrittenA = defaultA").unwrap();
        assert!(b_at < a_at);
    }
}
