//! Shrinking a paginated list query to the columns a list view actually displays.
//!
//! A list query has the shape `query { <list>(...) { items { ... } totalItems } }`. Pruning only
//! rewrites the selection set of `items` and of the fragments it spreads; everything else is kept.
//! Fragments are resolved as whole units: a fragment providing any requested column is spread,
//! then trimmed down to its requested top-level selections.
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::collections::IndexSet;
use serde::Deserialize;
use serde::Serialize;

use crate::closure::shake;
use crate::document::FragmentIndex;
use crate::document::TYPENAME;
use crate::document::field_position;
use crate::document::find_field;
use crate::document::has_fragment_spread;
use crate::document::leaf_field;
use crate::utils::logging::snapshot;

mod availability;

use availability::Availability;
use availability::provided_by_fragment;

/// A column of a list view, as its visibility state describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSelection {
    pub name: String,
    /// The column is a leaf of the `customFields` object rather than a field of the item.
    #[serde(default)]
    pub is_custom_field: bool,
}

impl ColumnSelection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_custom_field: false,
        }
    }

    pub fn custom_field(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_custom_field: true,
        }
    }
}

/// Names of the fields making up a list query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PruneOptions {
    /// Root field of the list query.
    /// default: the first root field with an `items_field` child
    pub list_field: Option<String>,

    /// default: "items"
    pub items_field: String,

    /// Field kept on every item so rows stay identifiable.
    /// default: "id"
    pub identity_field: String,

    /// default: "customFields"
    pub custom_fields_field: String,
}

impl Default for PruneOptions {
    fn default() -> Self {
        Self {
            list_field: None,
            items_field: "items".to_owned(),
            identity_field: "id".to_owned(),
            custom_fields_field: "customFields".to_owned(),
        }
    }
}

/// Prunes `document` to `columns` using default [`PruneOptions`].
///
/// See [`ListPruner::prune`].
pub fn prune(document: &ast::Document, columns: &[ColumnSelection]) -> ast::Document {
    ListPruner::default().prune(document, columns)
}

#[derive(Debug, Clone, Default)]
pub struct ListPruner {
    options: PruneOptions,
}

impl ListPruner {
    pub fn new(options: PruneOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PruneOptions {
        &self.options
    }

    /// Returns a copy of `document` where the `items` selection of the list query only selects
    /// `columns`, then removes the fragments and variables left unused.
    ///
    /// Returns `document` unchanged when `columns` is empty or when it holds no list query.
    /// Columns that are selected nowhere are ignored. The identity field is always kept when
    /// selected literally, and is added back when nothing else would be left on `items`.
    #[cfg_attr(
        feature = "snapshot_tracing",
        tracing::instrument(level = "trace", skip_all, name = "ListPruner::prune")
    )]
    pub fn prune(&self, document: &ast::Document, columns: &[ColumnSelection]) -> ast::Document {
        if columns.is_empty() {
            return document.clone();
        }
        let Some(path) = self.locate(document) else {
            tracing::debug!(
                list_field = ?self.options.list_field,
                items_field = %self.options.items_field,
                "no list query found, nothing to prune"
            );
            return document.clone();
        };
        let Some(items) = path.items(document) else {
            return document.clone();
        };

        let requested = Requested::new(columns, &self.options);
        let fragments = FragmentIndex::new(document);
        let availability = Availability::new(&items.selection_set, &fragments);

        let mut needed = self.needed_fragments(&requested, &availability);
        let mut selection_set = self.filter_items(&items.selection_set, &requested);
        if needed.is_empty() && !has_content(&selection_set) {
            self.restore_identity(&availability, &mut needed, &mut selection_set);
        }
        for selection in &items.selection_set {
            if let ast::Selection::FragmentSpread(spread) = selection {
                let name = spread.fragment_name.as_str();
                if needed.contains(name) && !has_fragment_spread(&selection_set, name) {
                    selection_set.push(selection.clone());
                }
            }
        }
        tracing::trace!(?needed, "fragments spread by the pruned items");

        let mut pruned = document.clone();
        if let Some(items) = path.items_mut(&mut pruned) {
            items.selection_set = selection_set;
        }
        let mut replacements = Vec::new();
        for (index, definition) in document.definitions.iter().enumerate() {
            let ast::Definition::FragmentDefinition(fragment) = definition else {
                continue;
            };
            if !needed.contains(fragment.name.as_str()) {
                continue;
            }
            if let Some(selection_set) = self.filter_fragment(fragment, &requested, &fragments) {
                replacements.push((index, selection_set));
            }
        }
        for (index, selection_set) in replacements {
            if let Some(ast::Definition::FragmentDefinition(fragment)) =
                pruned.definitions.get_mut(index)
            {
                fragment.make_mut().selection_set = selection_set;
            }
        }
        snapshot!(pruned, "pruned list query");
        shake(&pruned)
    }

    fn locate(&self, document: &ast::Document) -> Option<ListQueryPath> {
        let (operation, definition) = document
            .definitions
            .iter()
            .enumerate()
            .find_map(|(index, definition)| match definition {
                ast::Definition::OperationDefinition(operation) => Some((index, operation)),
                _ => None,
            })?;
        let items_field = self.options.items_field.as_str();
        let list_field = self.options.list_field.as_deref();
        let (root, items) = definition
            .selection_set
            .iter()
            .enumerate()
            .find_map(|(index, selection)| {
                let ast::Selection::Field(field) = selection else {
                    return None;
                };
                if list_field.is_some_and(|list_field| field.name != list_field) {
                    return None;
                }
                let items = field_position(&field.selection_set, items_field)?;
                Some((index, items))
            })?;
        Some(ListQueryPath {
            operation,
            root,
            items,
        })
    }

    /// Fragments spread by `items` that must stay to provide a requested column.
    fn needed_fragments<'doc>(
        &self,
        requested: &Requested<'_>,
        availability: &Availability<'doc>,
    ) -> IndexSet<&'doc str> {
        let mut needed = IndexSet::default();
        let mut unavailable = Vec::new();
        for &column in &requested.fields {
            if availability.is_direct(column) {
                continue;
            }
            let providers = availability.providers(column);
            if providers.is_empty() {
                unavailable.push(column);
            }
            needed.extend(providers);
        }
        let custom_fields = self.options.custom_fields_field.as_str();
        if !requested.custom_fields.is_empty() && !availability.is_direct(custom_fields) {
            let providers = availability.providers(custom_fields);
            if providers.is_empty() {
                unavailable.push(custom_fields);
            }
            needed.extend(providers);
        }
        if !unavailable.is_empty() {
            tracing::debug!(?unavailable, "ignoring columns selected nowhere in the list query");
        }
        needed
    }

    /// Literal fields and inline fragments of `items` that survive, in their original order.
    /// Fragment spreads are handled separately.
    fn filter_items(
        &self,
        selections: &[ast::Selection],
        requested: &Requested<'_>,
    ) -> Vec<ast::Selection> {
        let identity_field = self.options.identity_field.as_str();
        selections
            .iter()
            .filter_map(|selection| match selection {
                ast::Selection::Field(field) if field.name == identity_field => {
                    Some(selection.clone())
                }
                ast::Selection::Field(field) => self.filter_field(selection, field, requested),
                ast::Selection::InlineFragment(_) => Some(selection.clone()),
                ast::Selection::FragmentSpread(_) => None,
            })
            .collect()
    }

    /// The keep/drop rule shared by `items` and the fragments it spreads.
    fn filter_field(
        &self,
        selection: &ast::Selection,
        field: &Node<ast::Field>,
        requested: &Requested<'_>,
    ) -> Option<ast::Selection> {
        let name = field.name.as_str();
        if name == TYPENAME || requested.fields.contains(name) {
            Some(selection.clone())
        } else if name == self.options.custom_fields_field && !requested.custom_fields.is_empty() {
            filter_custom_fields(field, requested)
        } else {
            None
        }
    }

    /// Adds exactly one selection of the identity field to an otherwise empty `items`.
    fn restore_identity<'doc>(
        &self,
        availability: &Availability<'doc>,
        needed: &mut IndexSet<&'doc str>,
        selection_set: &mut Vec<ast::Selection>,
    ) {
        let identity_field = self.options.identity_field.as_str();
        if let Some(&fragment) = availability.providers(identity_field).first() {
            tracing::debug!(fragment, "keeping identity field through a fragment");
            needed.insert(fragment);
            return;
        }
        match Name::new(identity_field) {
            Ok(name) => selection_set.insert(0, leaf_field(name)),
            Err(error) => tracing::warn!(%error, "cannot select the identity field"),
        }
    }

    /// The trimmed selection set of a fragment spread by `items`, or `None` to keep it as is.
    fn filter_fragment(
        &self,
        fragment: &ast::FragmentDefinition,
        requested: &Requested<'_>,
        fragments: &FragmentIndex<'_>,
    ) -> Option<Vec<ast::Selection>> {
        let mut selection_set: Vec<ast::Selection> = fragment
            .selection_set
            .iter()
            .filter_map(|selection| match selection {
                ast::Selection::Field(field) => self.filter_field(selection, field, requested),
                ast::Selection::InlineFragment(_) => Some(selection.clone()),
                ast::Selection::FragmentSpread(spread) => {
                    let provided = provided_by_fragment(spread.fragment_name.as_str(), fragments);
                    provided
                        .iter()
                        .any(|field| self.is_requested(field, requested))
                        .then(|| selection.clone())
                }
            })
            .collect();
        if !has_content(&selection_set) {
            let identity = find_field(&fragment.selection_set, &self.options.identity_field)?;
            selection_set.insert(0, ast::Selection::Field(identity.clone()));
        }
        (selection_set != fragment.selection_set).then_some(selection_set)
    }

    fn is_requested(&self, field: &str, requested: &Requested<'_>) -> bool {
        requested.fields.contains(field)
            || (field == self.options.custom_fields_field && !requested.custom_fields.is_empty())
    }
}

/// Requested column names, split by kind.
struct Requested<'a> {
    fields: IndexSet<&'a str>,
    /// Leaf names under the custom fields object.
    custom_fields: IndexSet<&'a str>,
}

impl<'a> Requested<'a> {
    fn new(columns: &'a [ColumnSelection], options: &PruneOptions) -> Self {
        let mut fields = IndexSet::default();
        let mut custom_fields = IndexSet::default();
        for column in columns {
            let name = column.name.as_str();
            if column.is_custom_field {
                let leaf = name
                    .strip_prefix(options.custom_fields_field.as_str())
                    .and_then(|rest| rest.strip_prefix('.'))
                    .unwrap_or(name);
                custom_fields.insert(leaf);
            } else if name != TYPENAME {
                fields.insert(name);
            }
        }
        Self {
            fields,
            custom_fields,
        }
    }
}

/// Indices from the document root down to the `items` field of the list query.
struct ListQueryPath {
    operation: usize,
    root: usize,
    items: usize,
}

impl ListQueryPath {
    fn items<'doc>(&self, document: &'doc ast::Document) -> Option<&'doc Node<ast::Field>> {
        let ast::Definition::OperationDefinition(operation) =
            document.definitions.get(self.operation)?
        else {
            return None;
        };
        let ast::Selection::Field(root) = operation.selection_set.get(self.root)? else {
            return None;
        };
        let ast::Selection::Field(items) = root.selection_set.get(self.items)? else {
            return None;
        };
        Some(items)
    }

    fn items_mut<'doc>(
        &self,
        document: &'doc mut ast::Document,
    ) -> Option<&'doc mut ast::Field> {
        let ast::Definition::OperationDefinition(operation) =
            document.definitions.get_mut(self.operation)?
        else {
            return None;
        };
        let ast::Selection::Field(root) = operation.make_mut().selection_set.get_mut(self.root)?
        else {
            return None;
        };
        let ast::Selection::Field(items) = root.make_mut().selection_set.get_mut(self.items)?
        else {
            return None;
        };
        Some(items.make_mut())
    }
}

/// Rebuilds the custom fields object with only the requested leaves; `None` if none is left.
fn filter_custom_fields(
    field: &Node<ast::Field>,
    requested: &Requested<'_>,
) -> Option<ast::Selection> {
    let selection_set: Vec<ast::Selection> = field
        .selection_set
        .iter()
        .filter(|selection| {
            matches!(
                selection,
                ast::Selection::Field(leaf) if requested.custom_fields.contains(leaf.name.as_str())
            )
        })
        .cloned()
        .collect();
    if selection_set.is_empty() {
        return None;
    }
    let mut field = field.clone();
    field.make_mut().selection_set = selection_set;
    Some(ast::Selection::Field(field))
}

/// Whether a selection set selects anything besides `__typename`.
fn has_content(selections: &[ast::Selection]) -> bool {
    selections.iter().any(|selection| match selection {
        ast::Selection::Field(field) => field.name != TYPENAME,
        ast::Selection::FragmentSpread(_) | ast::Selection::InlineFragment(_) => true,
    })
}
