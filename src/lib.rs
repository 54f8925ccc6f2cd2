//! # Injectable Native
//!
//! Source-to-source transform that makes chosen top-level bindings of a
//! JavaScript/TypeScript module replaceable at runtime, for tests.
//!
//! For every target `K` the transformed module gets:
//!
//! - `var defaultK = K;` the load-time capture
//! - `var overwrittenK = K;` the alias every use-site of `K` now reads
//! - `function overwriteK(paramOverwrite) { overwrittenK = paramOverwrite; }`
//! - `export var injectableK = overwriteK;`
//!
//! and one `export function resetAllInjects()` restoring every alias. The
//! output is bracketed by `// BEGIN-injectable-loader` and
//! `// END-injectable-loader`.
//!
//! ## Pipeline
//!
//! 1. Parse with `oxc_parser` and bind references with `oxc_semantic`.
//! 2. Reject re-application and generated-name collisions.
//! 3. Per target: resolve the binding, redirect the references scope analysis
//!    attributes to it, insert the declaration block.
//! 4. Append the reset function and emit with `oxc_codegen`.
//!
//! Requesting no targets returns the source unchanged.

mod batch;
mod cache;
mod error;
mod inject;
mod naming;
mod options;
mod renamer;
mod runtime;
mod scope;
mod transform;


pub use batch::{discover_sources, transform_tree, BatchReport, SOURCE_EXTENSIONS};
pub use cache::{IncrementalCache, DEFAULT_CACHE_DIR};
pub use error::*;
pub use naming::{
    capitalize_first, is_valid_identifier, wrap_with_markers, GeneratedNames, BEGIN_MARKER,
    END_MARKER, OVERWRITE_PARAM, RESET_FUNCTION,
};
pub use options::{parse_query, TargetSet, TransformOptions};
pub use runtime::{InjectableModule, RuntimeError};
pub use scope::{is_known_import, resolve_binding, Binding, BindingKind};
pub use transform::{transform, InjectedBinding, TransformOutput};

#[cfg(feature = "napi")]
pub use transform::{parse_injectable_query_native, transform_injectable_native};
