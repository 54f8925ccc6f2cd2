//! Binding resolution for target names.
//!
//! Finds the top-level declaration that owns a target name and reports whether
//! the name arrives through an import. Scope analysis (`oxc_semantic`) has
//! already stamped a `SymbolId` on every binding identifier, so the declaring
//! statement can be found again after earlier targets have shifted the body.

use oxc_ast::ast::{
    BindingIdentifier, BindingPattern, Class, Declaration, ExportDefaultDeclarationKind,
    Function, IdentifierReference, ImportDeclarationSpecifier, Program, Statement,
    TSImportEqualsDeclaration, TSModuleDeclarationName, TSModuleReference, VariableDeclaration,
};
use oxc_ast_visit::Visit;
use oxc_syntax::symbol::SymbolId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    Import,
    Function,
    Class,
    Variable,
    Enum,
    Namespace,
    /// `import x = require('x')` or `import x = Some.Name`.
    #[serde(rename = "import-equals")]
    ImportEquals,
    /// A global: either undeclared or only declared ambiently (`declare const K`).
    Free,
}

impl BindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingKind::Import => "import",
            BindingKind::Function => "function",
            BindingKind::Class => "class",
            BindingKind::Variable => "variable",
            BindingKind::Enum => "enum",
            BindingKind::Namespace => "namespace",
            BindingKind::ImportEquals => "import-equals",
            BindingKind::Free => "free",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    pub is_known_import: bool,
    pub symbol: Option<SymbolId>,
    /// Byte offset of the declaring identifier, if any.
    pub offset: Option<u32>,
}

impl Binding {
    /// True when the bound value exists before the first top-level statement runs.
    pub fn is_hoisted(&self) -> bool {
        matches!(
            self.kind,
            BindingKind::Import | BindingKind::Function | BindingKind::Free
        )
    }
}

/// Only import specifiers and `import x = require(..)` count here; local
/// declarations of the same name do not.
pub fn is_known_import(program: &Program, name: &str) -> bool {
    let mut declared = Vec::new();
    for stmt in &program.body {
        match stmt {
            Statement::ImportDeclaration(_) => collect_top_level(stmt, &mut declared),
            Statement::TSImportEqualsDeclaration(decl) if is_module_import(decl) => {
                declared.push((&decl.id, BindingKind::ImportEquals));
            }
            _ => {}
        }
    }
    declared.iter().any(|(ident, _)| ident.name == name)
}

fn is_module_import(decl: &TSImportEqualsDeclaration) -> bool {
    !decl.import_kind.is_type()
        && matches!(decl.module_reference, TSModuleReference::ExternalModuleReference(_))
}

pub fn resolve_binding(program: &Program, name: &str) -> Binding {
    let is_known_import = is_known_import(program, name);

    let mut declared = Vec::new();
    for stmt in &program.body {
        collect_top_level(stmt, &mut declared);
    }

    match declared.into_iter().find(|(ident, _)| ident.name == name) {
        Some((ident, kind)) => Binding {
            name: name.to_string(),
            kind,
            is_known_import,
            symbol: ident.symbol_id.get(),
            offset: Some(ident.span.start),
        },
        None => Binding {
            name: name.to_string(),
            kind: BindingKind::Free,
            is_known_import,
            symbol: None,
            offset: None,
        },
    }
}

/// Index of the top-level statement that declares `symbol`.
pub fn declaring_statement(program: &Program, symbol: SymbolId) -> Option<usize> {
    program.body.iter().position(|stmt| {
        let mut declared = Vec::new();
        collect_top_level(stmt, &mut declared);
        declared
            .iter()
            .any(|(ident, _)| ident.symbol_id.get() == Some(symbol))
    })
}

fn collect_top_level<'s, 'a>(
    stmt: &'s Statement<'a>,
    out: &mut Vec<(&'s BindingIdentifier<'a>, BindingKind)>,
) {
    match stmt {
        Statement::ImportDeclaration(decl) => {
            if decl.import_kind.is_type() {
                return;
            }
            let Some(specifiers) = &decl.specifiers else {
                return;
            };
            for specifier in specifiers {
                match specifier {
                    ImportDeclarationSpecifier::ImportSpecifier(s) => {
                        if !s.import_kind.is_type() {
                            out.push((&s.local, BindingKind::Import));
                        }
                    }
                    ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                        out.push((&s.local, BindingKind::Import));
                    }
                    ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                        out.push((&s.local, BindingKind::Import));
                    }
                }
            }
        }
        Statement::ExportNamedDeclaration(export) => {
            if let Some(decl) = &export.declaration {
                collect_declaration(decl, out);
            }
        }
        Statement::ExportDefaultDeclaration(export) => match &export.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(func) => collect_function(func, out),
            ExportDefaultDeclarationKind::ClassDeclaration(class) => collect_class(class, out),
            _ => {}
        },
        _ => {
            if let Some(decl) = stmt.as_declaration() {
                collect_declaration(decl, out);
            }
        }
    }
}

/// Ambient (`declare`) bindings describe globals and resolve as `Free`.
fn collect_declaration<'s, 'a>(
    decl: &'s Declaration<'a>,
    out: &mut Vec<(&'s BindingIdentifier<'a>, BindingKind)>,
) {
    match decl {
        Declaration::FunctionDeclaration(func) => collect_function(func, out),
        Declaration::ClassDeclaration(class) => collect_class(class, out),
        Declaration::VariableDeclaration(decl) => collect_variables(decl, out),
        Declaration::TSEnumDeclaration(decl) => {
            // const enums are inlined and leave no runtime object.
            if decl.r#const {
                return;
            }
            let kind = if decl.declare { BindingKind::Free } else { BindingKind::Enum };
            out.push((&decl.id, kind));
        }
        Declaration::TSModuleDeclaration(decl) => {
            if let TSModuleDeclarationName::Identifier(id) = &decl.id {
                let kind = if decl.declare { BindingKind::Free } else { BindingKind::Namespace };
                out.push((id, kind));
            }
        }
        Declaration::TSImportEqualsDeclaration(decl) => {
            if !decl.import_kind.is_type() {
                out.push((&decl.id, BindingKind::ImportEquals));
            }
        }
        _ => {}
    }
}

fn collect_function<'s, 'a>(
    func: &'s Function<'a>,
    out: &mut Vec<(&'s BindingIdentifier<'a>, BindingKind)>,
) {
    let Some(id) = &func.id else {
        return;
    };
    if func.declare {
        out.push((id, BindingKind::Free));
    } else if func.body.is_some() {
        // Overload signatures share the implementation's symbol.
        out.push((id, BindingKind::Function));
    }
}

fn collect_class<'s, 'a>(class: &'s Class<'a>, out: &mut Vec<(&'s BindingIdentifier<'a>, BindingKind)>) {
    if let Some(id) = &class.id {
        let kind = if class.declare { BindingKind::Free } else { BindingKind::Class };
        out.push((id, kind));
    }
}

fn collect_variables<'s, 'a>(
    decl: &'s VariableDeclaration<'a>,
    out: &mut Vec<(&'s BindingIdentifier<'a>, BindingKind)>,
) {
    let kind = if decl.declare { BindingKind::Free } else { BindingKind::Variable };
    for declarator in &decl.declarations {
        collect_pattern(&declarator.id, kind, out);
    }
}

/// Names bound by a variable declaration, in source order.
pub fn declared_names<'s, 'a>(decl: &'s VariableDeclaration<'a>) -> Vec<&'s BindingIdentifier<'a>> {
    let mut declared = Vec::new();
    collect_variables(decl, &mut declared);
    declared.into_iter().map(|(ident, _)| ident).collect()
}

fn collect_pattern<'s, 'a>(
    pattern: &'s BindingPattern<'a>,
    kind: BindingKind,
    out: &mut Vec<(&'s BindingIdentifier<'a>, BindingKind)>,
) {
    match pattern {
        BindingPattern::BindingIdentifier(id) => out.push((id, kind)),
        BindingPattern::ObjectPattern(obj) => {
            for prop in &obj.properties {
                collect_pattern(&prop.value, kind, out);
            }
            if let Some(rest) = &obj.rest {
                collect_pattern(&rest.argument, kind, out);
            }
        }
        BindingPattern::ArrayPattern(arr) => {
            for elem in arr.elements.iter().flatten() {
                collect_pattern(elem, kind, out);
            }
            if let Some(rest) = &arr.rest {
                collect_pattern(&rest.argument, kind, out);
            }
        }
        BindingPattern::AssignmentPattern(assign) => collect_pattern(&assign.left, kind, out),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTIFIER INVENTORY
// ═══════════════════════════════════════════════════════════════════════════════

/// Every binding and reference name in a file, at any depth, with the offset
/// of its first occurrence. A generated name found here would shadow or be
/// shadowed by existing code.
#[derive(Debug, Default)]
pub struct IdentifierInventory {
    pub names: HashMap<String, u32>,
}

impl IdentifierInventory {
    pub fn collect(program: &Program) -> Self {
        let mut inventory = IdentifierInventory::default();
        inventory.visit_program(program);
        inventory
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn first_offset(&self, name: &str) -> Option<u32> {
        self.names.get(name).copied()
    }

    fn record(&mut self, name: &str, offset: u32) {
        self.names.entry(name.to_string()).or_insert(offset);
    }
}

impl<'a> Visit<'a> for IdentifierInventory {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        self.record(&ident.name, ident.span.start);
    }

    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        self.record(&ident.name, ident.span.start);
    }
}
