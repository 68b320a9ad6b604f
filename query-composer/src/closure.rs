//! Liveness passes: drop fragment and variable definitions that nothing references any more.
//!
//! Both passes are generic over any executable document, terminate on cyclic fragment graphs,
//! and return a document sharing every node with the input when there is nothing to remove.
use apollo_compiler::Name;
use apollo_compiler::ast;
use apollo_compiler::collections::HashSet;
use apollo_compiler::collections::IndexSet;

use crate::document::FragmentIndex;
use crate::document::operations;
use crate::traverse;
use crate::traverse::Visitor;
use crate::utils::logging::snapshot;

/// Removes unused fragments, then unused variables.
pub fn shake(document: &ast::Document) -> ast::Document {
    remove_unused_variables(&remove_unused_fragments(document))
}

/// Removes every fragment definition that is not transitively reachable, through fragment
/// spreads, from an operation of `document`.
///
/// Reachability is by name: when several definitions share a name, they live or die together.
#[cfg_attr(
    feature = "snapshot_tracing",
    tracing::instrument(level = "trace", skip_all, name = "remove_unused_fragments")
)]
pub fn remove_unused_fragments(document: &ast::Document) -> ast::Document {
    let fragments = FragmentIndex::new(document);
    if fragments.is_empty() {
        return document.clone();
    }
    let reachable = reachable_fragments(document, &fragments);
    let unused: Vec<&str> = fragments
        .names()
        .filter(|name| !reachable.contains(*name))
        .collect();
    if unused.is_empty() {
        return document.clone();
    }
    tracing::debug!(?unused, "removing unused fragment definitions");

    let mut shaken = document.clone();
    shaken.definitions.retain(|definition| match definition {
        ast::Definition::FragmentDefinition(fragment) => reachable.contains(fragment.name.as_str()),
        _ => true,
    });
    snapshot!(shaken, "removed unused fragments");
    shaken
}

/// Names of the fragments spread, directly or through other fragments, by some operation.
fn reachable_fragments(document: &ast::Document, fragments: &FragmentIndex<'_>) -> IndexSet<Name> {
    let mut seeds = SpreadCollector::default();
    for operation in operations(document) {
        traverse::operation(&mut seeds, operation);
    }

    let mut reachable = IndexSet::default();
    let mut pending = seeds.names;
    while let Some(name) = pending.pop() {
        // Already resolved: also what stops mutually spreading fragments from looping.
        if !reachable.insert(name.clone()) {
            continue;
        }
        for fragment in fragments.get(name.as_str()) {
            let mut spreads = SpreadCollector::default();
            traverse::fragment_definition(&mut spreads, fragment);
            pending.extend(
                spreads
                    .names
                    .into_iter()
                    .filter(|spread| !reachable.contains(spread)),
            );
        }
    }
    reachable
}

/// Collects the names of fragment spreads found anywhere below a node, without following them.
#[derive(Default)]
pub(crate) struct SpreadCollector {
    pub(crate) names: Vec<Name>,
}

impl Visitor for SpreadCollector {
    fn fragment_spread(&mut self, def: &ast::FragmentSpread) {
        self.names.push(def.fragment_name.clone());
        traverse::fragment_spread(self, def)
    }
}

/// Removes, from each operation, the variable definitions that no argument references.
///
/// References are searched in field and directive arguments, through list and object literals,
/// and inside the fragments the operation spreads (transitively).
#[cfg_attr(
    feature = "snapshot_tracing",
    tracing::instrument(level = "trace", skip_all, name = "remove_unused_variables")
)]
pub fn remove_unused_variables(document: &ast::Document) -> ast::Document {
    let fragments = FragmentIndex::new(document);
    let mut shaken = document.clone();
    for definition in &mut shaken.definitions {
        let ast::Definition::OperationDefinition(operation) = definition else {
            continue;
        };
        if operation.variables.is_empty() {
            continue;
        }
        let used = variables_used(operation, &fragments);
        let unused: Vec<&Name> = operation
            .variables
            .iter()
            .map(|variable| &variable.name)
            .filter(|name| !used.contains(*name))
            .collect();
        if unused.is_empty() {
            continue;
        }
        tracing::debug!(
            operation = ?operation.name,
            ?unused,
            "removing unused variable definitions"
        );
        operation
            .make_mut()
            .variables
            .retain(|variable| used.contains(&variable.name));
    }
    snapshot!(shaken, "removed unused variables");
    shaken
}

fn variables_used(
    operation: &ast::OperationDefinition,
    fragments: &FragmentIndex<'_>,
) -> HashSet<Name> {
    let mut collector = VariableCollector {
        fragments,
        visited_fragments: HashSet::default(),
        used: HashSet::default(),
    };
    traverse::operation(&mut collector, operation);
    collector.used
}

struct VariableCollector<'a, 'doc> {
    fragments: &'a FragmentIndex<'doc>,
    /// Avoid infinite recursion
    visited_fragments: HashSet<Name>,
    used: HashSet<Name>,
}

impl Visitor for VariableCollector<'_, '_> {
    fn fragment_spread(&mut self, def: &ast::FragmentSpread) {
        if self.visited_fragments.insert(def.fragment_name.clone()) {
            let fragments = self.fragments;
            for fragment in fragments.get(def.fragment_name.as_str()) {
                traverse::fragment_definition(self, fragment);
            }
        }
        traverse::fragment_spread(self, def)
    }

    fn value(&mut self, def: &ast::Value) {
        if let ast::Value::Variable(name) = def {
            self.used.insert(name.clone());
        }
        traverse::value(self, def)
    }
}
