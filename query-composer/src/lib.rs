//! Composition of GraphQL query documents.
//!
//! Two pure transforms over [`apollo_compiler::ast::Document`]:
//!
//! - [`extend`] grafts the root selections of an extension document onto the operation of a base
//!   document that selects the same root field, appending new fields and never duplicating
//!   existing ones.
//! - [`prune`] shrinks the `items` selection of a paginated list query down to a set of visible
//!   columns, keeping whole fragments where a column is only reachable through a spread.
//!
//! Both finish with the liveness passes in [`closure`], which drop fragment definitions that no
//! operation reaches any more and variable definitions that no argument references.
//!
//! ## Structural sharing
//!
//! Documents are never mutated in place. Every transform clones the input (which only copies
//! reference-counted [`Node`][apollo_compiler::Node] pointers) and calls
//! [`make_mut`][apollo_compiler::Node::make_mut] along the path of change, so untouched subtrees
//! stay shared with the input.

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    unused_qualifications,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]

pub mod closure;
pub mod document;
pub mod error;
pub mod extend;
pub mod prune;
pub mod traverse;
pub(crate) mod utils;

pub use crate::closure::remove_unused_fragments;
pub use crate::closure::remove_unused_variables;
pub use crate::closure::shake;
pub use crate::error::ExtendError;
pub use crate::error::ParseErrors;
pub use crate::extend::ExtendOptions;
pub use crate::extend::Extender;
pub use crate::extend::Extension;
pub use crate::extend::extend;
pub use crate::prune::ColumnSelection;
pub use crate::prune::ListPruner;
pub use crate::prune::PruneOptions;
pub use crate::prune::prune;
