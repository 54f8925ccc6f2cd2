#[cfg(feature = "napi")]
use napi_derive::napi;
use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::Atom;
use serde::{Deserialize, Serialize};

use crate::error::{
    Diagnostic, SourceLocation, TransformError, INJ_ERR_COLLISION, INJ_ERR_PARSE,
    INJ_ERR_REAPPLY, INJ_WARN_UNKNOWN_TARGET, INJ_WARN_UNREWRITTEN,
};
use crate::inject::Injector;
use crate::naming::{wrap_with_markers, GeneratedNames, BEGIN_MARKER, RESET_FUNCTION};
use crate::options::{TargetSet, TransformOptions};
use crate::renamer::{target_references, UsageRewriter};
use crate::scope::{resolve_binding, IdentifierInventory};

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Manifest entry for one injected target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct InjectedBinding {
    pub target: String,
    pub injectable: String,
    pub overwrite: String,
    pub overwritten: String,
    pub default: String,
    pub known_import: bool,
    /// One of `import`, `import-equals`, `function`, `class`, `variable`,
    /// `enum`, `namespace` or `free`.
    pub kind: String,
    pub rewritten: u32,
}

impl InjectedBinding {
    pub fn names(&self) -> GeneratedNames {
        GeneratedNames {
            target: self.target.clone(),
            injectable: self.injectable.clone(),
            overwrite: self.overwrite.clone(),
            overwritten: self.overwritten.clone(),
            default: self.default.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct TransformOutput {
    pub code: String,
    pub changed: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub bindings: Vec<InjectedBinding>,
}

impl TransformOutput {
    pub fn unchanged(source: &str) -> Self {
        TransformOutput {
            code: source.to_string(),
            changed: false,
            diagnostics: vec![],
            bindings: vec![],
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFORM
// ═══════════════════════════════════════════════════════════════════════════════

/// Rewrites `source` so every requested target can be replaced at runtime.
///
/// With no targets the source is returned as-is. Otherwise the output is the
/// re-emitted module between the begin/end markers, with one
/// `injectable<K>` export per target and a single `resetAllInjects` export.
pub fn transform(source: &str, options: &TransformOptions) -> Result<TransformOutput, TransformError> {
    let file = options.file_label();
    let targets = options.target_set()?;
    if targets.is_empty() {
        return Ok(TransformOutput::unchanged(source));
    }

    // Transformed output always opens with the marker.
    let body = source.trim_start();
    if body.starts_with(BEGIN_MARKER) {
        let offset = (source.len() - body.len()) as u32;
        return Err(TransformError::at(
            INJ_ERR_REAPPLY,
            "Module has already been transformed.",
            file,
            SourceLocation::from_offset(source, offset),
        ));
    }

    let allocator = Allocator::default();
    let source_type = options.source_type();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if ret.panicked || !ret.errors.is_empty() {
        return Err(parse_error(source, file, &ret.errors));
    }
    let mut program = ret.program;
    let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();

    let bundles: Vec<GeneratedNames> = targets.iter().map(GeneratedNames::for_target).collect();
    check_collisions(&IdentifierInventory::collect(&program), &targets, &bundles, source, file)?;

    // Reference sets come from the untouched tree; synthesized nodes never join them.
    let plans: Vec<_> = bundles
        .into_iter()
        .map(|names| {
            let binding = resolve_binding(&program, &names.target);
            let references = target_references(&program, &scoping, &binding);
            (binding, names, references)
        })
        .collect();

    let injector = Injector::new(&allocator, source_type, source.len(), file);
    let mut diagnostics = Vec::new();
    let mut bindings = Vec::new();
    let mut restored = Vec::new();

    for (binding, names, references) in plans {
        tracing::debug!(target_name = %names.target, file = %file, "touch");

        if !binding.is_known_import {
            let location = binding
                .offset
                .map(|offset| SourceLocation::from_offset(source, offset))
                .unwrap_or_default();
            diagnostics.push(Diagnostic::warning(
                INJ_WARN_UNKNOWN_TARGET,
                &names.target,
                format!("\"{}\" is not imported in this module.", names.target),
                file,
                location,
            ));
        }

        let alias: Atom = allocator.alloc_str(&names.overwritten).into();
        let rewriter = UsageRewriter::new(&allocator, alias, references).rewrite(&mut program);
        for site in &rewriter.skipped {
            diagnostics.push(Diagnostic::warning(
                INJ_WARN_UNREWRITTEN,
                &names.target,
                format!(
                    "\"{}\" used as a {} cannot be redirected.",
                    names.target,
                    site.reason.describe()
                ),
                file,
                SourceLocation::from_offset(source, site.offset),
            ));
        }

        injector.inject(&mut program, &binding, &names)?;

        bindings.push(InjectedBinding {
            target: names.target.clone(),
            injectable: names.injectable.clone(),
            overwrite: names.overwrite.clone(),
            overwritten: names.overwritten.clone(),
            default: names.default.clone(),
            known_import: binding.is_known_import,
            kind: binding.kind.as_str().to_string(),
            rewritten: rewriter.rewritten,
        });
        restored.push(names);
    }

    let repointed = injector.repoint_exports(&mut program, &restored)?;
    if repointed > 0 {
        tracing::debug!(file = %file, repointed, "exported declarations now export their alias");
    }
    injector.append_reset(&mut program, &restored)?;

    let code = Codegen::new().build(&program).code;
    Ok(TransformOutput {
        code: wrap_with_markers(&code),
        changed: true,
        diagnostics,
        bindings,
    })
}

fn parse_error(source: &str, file: &str, errors: &[oxc_diagnostics::OxcDiagnostic]) -> TransformError {
    let Some(first) = errors.first() else {
        return TransformError::new(INJ_ERR_PARSE, "Parser aborted.", file);
    };
    let offset = first
        .labels
        .as_ref()
        .and_then(|labels| labels.first())
        .map(|label| label.offset() as u32)
        .unwrap_or(0);
    let mut err = TransformError::at(
        INJ_ERR_PARSE,
        &first.message,
        file,
        SourceLocation::from_offset(source, offset),
    );
    for extra in errors.iter().skip(1) {
        err = err.with_hint(extra.message.to_string());
    }
    err
}

/// Fails when a generated name is already spelled anywhere in the file or
/// coincides with another target.
fn check_collisions(
    inventory: &IdentifierInventory,
    targets: &TargetSet,
    bundles: &[GeneratedNames],
    source: &str,
    file: &str,
) -> Result<(), TransformError> {
    let generated = bundles
        .iter()
        .flat_map(|names| names.all().into_iter().map(move |name| (name, names.target.as_str())))
        .chain(std::iter::once((RESET_FUNCTION, "")));

    for (name, owner) in generated {
        let owner_text = if owner.is_empty() {
            String::from("the reset function")
        } else {
            format!("target \"{}\"", owner)
        };
        if let Some(offset) = inventory.first_offset(name) {
            return Err(TransformError::at(
                INJ_ERR_COLLISION,
                &format!("\"{}\" (generated for {}) already exists in this module.", name, owner_text),
                file,
                SourceLocation::from_offset(source, offset),
            ));
        }
        if targets.contains(name) {
            return Err(TransformError::new(
                INJ_ERR_COLLISION,
                &format!("Target \"{}\" clashes with the name generated for {}.", name, owner_text),
                file,
            ));
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODE BINDING
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
#[napi]
pub fn transform_injectable_native(
    source: String,
    query: String,
    file_path: Option<String>,
) -> napi::Result<TransformOutput> {
    let mut options = TransformOptions::from_query(&query)
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;
    options.file_path = file_path;
    transform(&source, &options).map_err(|e| napi::Error::from_reason(e.to_string()))
}

#[cfg(feature = "napi")]
#[napi]
pub fn parse_injectable_query_native(query: String) -> napi::Result<Vec<String>> {
    crate::options::parse_query(&query).map_err(|e| napi::Error::from_reason(e.to_string()))
}
