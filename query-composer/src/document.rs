//! Read-only helpers over the [`ast`] grammar shared with the parser and printer.
//!
//! The grammar itself is [`apollo_compiler::ast`]; this module only adds the lookups the
//! transforms need. Field identity is by name alone: aliases are not considered.
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::collections::IndexMap;

pub const TYPENAME: &str = "__typename";

/// Operation definitions of `document`, in document order.
pub fn operations(
    document: &ast::Document,
) -> impl Iterator<Item = &Node<ast::OperationDefinition>> {
    document.definitions.iter().filter_map(|definition| match definition {
        ast::Definition::OperationDefinition(operation) => Some(operation),
        _ => None,
    })
}

/// Fragment definitions of `document`, in document order. Names may repeat.
pub fn fragments(
    document: &ast::Document,
) -> impl Iterator<Item = &Node<ast::FragmentDefinition>> {
    document.definitions.iter().filter_map(|definition| match definition {
        ast::Definition::FragmentDefinition(fragment) => Some(fragment),
        _ => None,
    })
}

/// The root field of an operation: the first field at the top of its selection set.
///
/// Operations are matched by this field, not by their name.
pub fn root_field(operation: &ast::OperationDefinition) -> Option<&Node<ast::Field>> {
    operation.selection_set.iter().find_map(as_field)
}

/// Returns the first field selection named `name` directly inside `selections`.
pub fn find_field<'a>(
    selections: &'a [ast::Selection],
    name: &str,
) -> Option<&'a Node<ast::Field>> {
    selections
        .iter()
        .filter_map(as_field)
        .find(|field| field.name.as_str() == name)
}

pub(crate) fn as_field(selection: &ast::Selection) -> Option<&Node<ast::Field>> {
    match selection {
        ast::Selection::Field(field) => Some(field),
        ast::Selection::FragmentSpread(_) | ast::Selection::InlineFragment(_) => None,
    }
}

/// Index of the first field selection named `name` directly inside `selections`.
pub(crate) fn field_position(selections: &[ast::Selection], name: &str) -> Option<usize> {
    selections
        .iter()
        .position(|selection| matches!(selection, ast::Selection::Field(field) if field.name == name))
}

/// Whether `selections` directly spreads the fragment `name`.
pub fn has_fragment_spread(selections: &[ast::Selection], name: &str) -> bool {
    selections.iter().any(|selection| {
        matches!(
            selection,
            ast::Selection::FragmentSpread(spread) if spread.fragment_name.as_str() == name
        )
    })
}

/// Builds a leaf field selection with no arguments, directives or alias.
pub(crate) fn leaf_field(name: Name) -> ast::Selection {
    ast::Selection::Field(Node::new(ast::Field {
        alias: None,
        name,
        arguments: Vec::new(),
        directives: Default::default(),
        selection_set: Vec::new(),
    }))
}

/// Every fragment definition of a document, grouped by name.
///
/// A composed document may legitimately carry several definitions with the same name (an
/// extension never merges its fragments into the base ones), so each name maps to all of its
/// instances, in document order.
#[derive(Debug, Default)]
pub struct FragmentIndex<'doc> {
    by_name: IndexMap<&'doc str, Vec<&'doc Node<ast::FragmentDefinition>>>,
}

impl<'doc> FragmentIndex<'doc> {
    pub fn new(document: &'doc ast::Document) -> Self {
        let mut by_name: IndexMap<&'doc str, Vec<_>> = IndexMap::default();
        for fragment in fragments(document) {
            by_name
                .entry(fragment.name.as_str())
                .or_default()
                .push(fragment);
        }
        Self { by_name }
    }

    /// All definitions named `name`; empty if the fragment is undefined.
    pub fn get(&self, name: &str) -> &[&'doc Node<ast::FragmentDefinition>] {
        self.by_name
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'doc str> + '_ {
        self.by_name.keys().copied()
    }
}
