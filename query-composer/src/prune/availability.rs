//! Which fields a selection set makes available, directly or through fragment spreads.
use apollo_compiler::ast;
use apollo_compiler::collections::HashSet;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::collections::IndexSet;

use crate::document::FragmentIndex;

/// Availability index over the direct children of one selection set.
#[derive(Debug, Default)]
pub(crate) struct Availability<'doc> {
    /// Fields selected literally.
    direct: IndexSet<&'doc str>,
    /// Fragments spread directly, with every field name each one provides.
    spreads: IndexMap<&'doc str, IndexSet<&'doc str>>,
}

impl<'doc> Availability<'doc> {
    pub(crate) fn new(selections: &'doc [ast::Selection], fragments: &FragmentIndex<'doc>) -> Self {
        let mut availability = Self::default();
        for selection in selections {
            match selection {
                ast::Selection::Field(field) => {
                    availability.direct.insert(field.name.as_str());
                }
                ast::Selection::FragmentSpread(spread) => {
                    let name = spread.fragment_name.as_str();
                    if !availability.spreads.contains_key(name) {
                        availability
                            .spreads
                            .insert(name, provided_by_fragment(name, fragments));
                    }
                }
                // Inline fragments are kept verbatim and never consulted.
                ast::Selection::InlineFragment(_) => {}
            }
        }
        availability
    }

    pub(crate) fn is_direct(&self, field: &str) -> bool {
        self.direct.contains(field)
    }

    /// Directly spread fragments providing `field`, in spread order.
    pub(crate) fn providers(&self, field: &str) -> Vec<&'doc str> {
        self.spreads
            .iter()
            .filter(|(_, provided)| provided.contains(field))
            .map(|(name, _)| *name)
            .collect()
    }
}

/// Every field name a fragment provides at its top level, following nested spreads and inline
/// fragments transitively.
pub(crate) fn provided_by_fragment<'doc>(
    name: &'doc str,
    fragments: &FragmentIndex<'doc>,
) -> IndexSet<&'doc str> {
    let mut provided = IndexSet::default();
    let mut visited = HashSet::default();
    provided_through_spread(name, fragments, &mut visited, &mut provided);
    provided
}

fn provided_through_spread<'doc>(
    name: &'doc str,
    fragments: &FragmentIndex<'doc>,
    visited: &mut HashSet<&'doc str>,
    provided: &mut IndexSet<&'doc str>,
) {
    if !visited.insert(name) {
        return;
    }
    for &fragment in fragments.get(name) {
        provided_fields(&fragment.selection_set, fragments, visited, provided);
    }
}

fn provided_fields<'doc>(
    selections: &'doc [ast::Selection],
    fragments: &FragmentIndex<'doc>,
    visited: &mut HashSet<&'doc str>,
    provided: &mut IndexSet<&'doc str>,
) {
    for selection in selections {
        match selection {
            ast::Selection::Field(field) => {
                provided.insert(field.name.as_str());
            }
            ast::Selection::FragmentSpread(spread) => {
                provided_through_spread(spread.fragment_name.as_str(), fragments, visited, provided)
            }
            ast::Selection::InlineFragment(inline) => {
                provided_fields(&inline.selection_set, fragments, visited, provided)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::find_field;
    use crate::document::operations;
    use crate::document::root_field;

    fn parse(source: &str) -> ast::Document {
        let Ok(document) = ast::Document::parse(source, "test.graphql") else {
            panic!("invalid test document");
        };
        document
    }

    #[test]
    fn indexes_direct_and_transitive_fields() {
        let document = parse(
            "query {
                 products {
                     items { id ...Card ...Price }
                 }
             }
             fragment Card on Product { name ...Asset ... on Product { slug } }
             fragment Asset on Product { featuredAsset { preview } }
             fragment Price on Product { price name }",
        );
        let fragments = FragmentIndex::new(&document);
        let operation = operations(&document).next().unwrap();
        let products = root_field(operation).unwrap();
        let items = find_field(&products.selection_set, "items").unwrap();
        let availability = Availability::new(&items.selection_set, &fragments);

        assert!(availability.is_direct("id"));
        assert!(!availability.is_direct("name"));
        assert_eq!(availability.providers("name"), ["Card", "Price"]);
        assert_eq!(availability.providers("featuredAsset"), ["Card"]);
        assert_eq!(availability.providers("slug"), ["Card"]);
        assert!(availability.providers("preview").is_empty());
        assert!(availability.providers("sku").is_empty());
    }

    #[test]
    fn cyclic_fragments_terminate() {
        let document = parse(
            "fragment A on T { a ...B }
             fragment B on T { b ...A }",
        );
        let fragments = FragmentIndex::new(&document);
        let provided = provided_by_fragment("A", &fragments);
        let names: Vec<_> = provided.into_iter().collect();
        assert_eq!(names, ["a", "b"]);
    }
}
