//! Use-site redirection.
//!
//! `UsageRewriter` walks the tree and renames every identifier reference that
//! belongs to a target binding. Membership is decided by `ReferenceId`, so the
//! rewrite follows the binding and not the spelling: a parameter named `fetch`
//! inside some function keeps its own references.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    AssignmentTarget, AssignmentTargetMaybeDefault, AssignmentTargetProperty,
    AssignmentTargetPropertyIdentifier, Expression, IdentifierReference, JSXClosingElement,
    JSXElementName, ObjectProperty, Program, TSInterfaceDeclaration, TSType,
    TSTypeAliasDeclaration, TSTypeName,
};
use oxc_ast::AstBuilder;
use oxc_ast_visit::{walk_mut, Visit, VisitMut};
use oxc_semantic::Scoping;
use oxc_span::{Atom, SPAN};
use oxc_syntax::reference::ReferenceId;
use std::collections::HashSet;

use crate::scope::Binding;

/// References that must be redirected for one target.
///
/// Computed up front from scope analysis, before any node is mutated. Synthesized
/// nodes carry no reference id and are never members.
pub fn target_references(program: &Program, scoping: &Scoping, binding: &Binding) -> HashSet<ReferenceId> {
    match binding.symbol {
        Some(symbol) => scoping
            .get_resolved_reference_ids(symbol)
            .iter()
            .copied()
            .collect(),
        None => {
            let mut collector = FreeReferenceCollector {
                name: &binding.name,
                scoping,
                references: HashSet::new(),
            };
            collector.visit_program(program);
            collector.references
        }
    }
}

/// References to a name with no declaration anywhere in reach.
struct FreeReferenceCollector<'s> {
    name: &'s str,
    scoping: &'s Scoping,
    references: HashSet<ReferenceId>,
}

impl<'a, 's> Visit<'a> for FreeReferenceCollector<'s> {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        if ident.name != self.name {
            return;
        }
        if let Some(reference_id) = ident.reference_id.get() {
            if self.scoping.get_reference(reference_id).symbol_id().is_none() {
                self.references.insert(reference_id);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// `<K />`: a lower-case alias would turn the component into an intrinsic tag.
    JsxTagName,
}

impl SkipReason {
    pub fn describe(&self) -> &'static str {
        match self {
            SkipReason::JsxTagName => "JSX tag name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedSite {
    pub offset: u32,
    pub reason: SkipReason,
}

pub struct UsageRewriter<'a> {
    ast: AstBuilder<'a>,
    alias: Atom<'a>,
    references: HashSet<ReferenceId>,
    pub rewritten: u32,
    pub skipped: Vec<SkippedSite>,
    in_closing_tag: bool,
}

impl<'a> UsageRewriter<'a> {
    pub fn new(allocator: &'a Allocator, alias: Atom<'a>, references: HashSet<ReferenceId>) -> Self {
        UsageRewriter {
            ast: AstBuilder::new(allocator),
            alias,
            references,
            rewritten: 0,
            skipped: Vec::new(),
            in_closing_tag: false,
        }
    }

    pub fn rewrite(mut self, program: &mut Program<'a>) -> Self {
        self.visit_program(program);
        self
    }

    fn is_target(&self, ident: &IdentifierReference<'a>) -> bool {
        ident
            .reference_id
            .get()
            .is_some_and(|id| self.references.contains(&id))
    }

    /// `{ K = init }` becomes `{ K: K = init }`; the value side is renamed by the walk.
    fn expand_shorthand_target(
        &self,
        prop: &mut AssignmentTargetPropertyIdentifier<'a>,
    ) -> AssignmentTargetProperty<'a> {
        let key = self.ast.property_key_static_identifier(prop.binding.span, prop.binding.name);
        let reference = std::mem::replace(&mut prop.binding, self.ast.identifier_reference(SPAN, ""));
        let target = AssignmentTarget::AssignmentTargetIdentifier(self.ast.alloc(reference));
        let binding = match prop.init.take() {
            Some(init) => self
                .ast
                .assignment_target_maybe_default_assignment_target_with_default(prop.span, target, init),
            None => AssignmentTargetMaybeDefault::from(target),
        };
        self.ast
            .assignment_target_property_assignment_target_property_property(prop.span, key, binding, false)
    }
}

impl<'a> VisitMut<'a> for UsageRewriter<'a> {
    fn visit_identifier_reference(&mut self, ident: &mut IdentifierReference<'a>) {
        if self.is_target(ident) {
            ident.name = self.alias;
            self.rewritten += 1;
        }
    }

    fn visit_object_property(&mut self, prop: &mut ObjectProperty<'a>) {
        walk_mut::walk_object_property(self, prop);
        // `{ K }` would now print as `{ overwrittenK }` and change the key.
        if prop.shorthand {
            if let Expression::Identifier(ident) = &prop.value {
                if ident.name == self.alias {
                    prop.shorthand = false;
                }
            }
        }
    }

    fn visit_jsx_element_name(&mut self, name: &mut JSXElementName<'a>) {
        if let JSXElementName::IdentifierReference(ident) = name {
            if self.is_target(ident) {
                if !self.in_closing_tag {
                    self.skipped.push(SkippedSite {
                        offset: ident.span.start,
                        reason: SkipReason::JsxTagName,
                    });
                }
                return;
            }
        }
        walk_mut::walk_jsx_element_name(self, name);
    }

    fn visit_jsx_closing_element(&mut self, element: &mut JSXClosingElement<'a>) {
        self.in_closing_tag = true;
        walk_mut::walk_jsx_closing_element(self, element);
        self.in_closing_tag = false;
    }

    fn visit_assignment_target_property(&mut self, prop: &mut AssignmentTargetProperty<'a>) {
        // `({ K } = obj)` must keep writing the key `K` while storing into the alias.
        let expanded = match prop {
            AssignmentTargetProperty::AssignmentTargetPropertyIdentifier(shorthand)
                if self.is_target(&shorthand.binding) =>
            {
                Some(self.expand_shorthand_target(shorthand))
            }
            _ => None,
        };
        if let Some(expanded) = expanded {
            *prop = expanded;
        }
        walk_mut::walk_assignment_target_property(self, prop);
    }

    // Type positions have no runtime value to redirect.
    fn visit_ts_type(&mut self, _ty: &mut TSType<'a>) {}

    fn visit_ts_type_name(&mut self, _name: &mut TSTypeName<'a>) {}

    fn visit_ts_interface_declaration(&mut self, _decl: &mut TSInterfaceDeclaration<'a>) {}

    fn visit_ts_type_alias_declaration(&mut self, _decl: &mut TSTypeAliasDeclaration<'a>) {}
}
