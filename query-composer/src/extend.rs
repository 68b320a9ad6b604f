//! Grafting the selections of an extension document onto a base document.
//!
//! Operations are matched by their root field, never by name: the base operation keeps its
//! keyword, name and variables, and only its selection set grows. New selections are appended
//! after the existing ones, existing fields are merged recursively and nothing is duplicated.
//!
//! Fragment definitions are not merged. Those of the extension are appended after those of the
//! base unchanged, even when a name is already defined by the base, so the result may hold
//! several fragment definitions with the same name. A consumer sending the document to a GraphQL
//! server as-is must unify same-named fragments first.
use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::parser::Parser;
use serde::Deserialize;
use serde::Serialize;

use crate::document::field_position;
use crate::document::fragments;
use crate::document::has_fragment_spread;
use crate::document::operations;
use crate::document::root_field;
use crate::error::ExtendError;
use crate::utils::logging::snapshot;

/// Configuration for parsing extension source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtendOptions {
    /// Path reported in parser diagnostics for extension source text.
    /// default: "extension.graphql"
    pub source_path: String,

    /// Maximum nesting depth accepted by the parser.
    /// default: the parser's own limit
    pub recursion_limit: Option<usize>,

    /// Maximum number of tokens accepted by the parser.
    /// default: unlimited
    pub token_limit: Option<usize>,
}

impl Default for ExtendOptions {
    fn default() -> Self {
        Self {
            source_path: "extension.graphql".to_owned(),
            recursion_limit: None,
            token_limit: None,
        }
    }
}

/// An extension, either already parsed or as GraphQL source text.
#[derive(Debug, Clone)]
pub enum Extension {
    Document(ast::Document),
    Source(String),
}

impl From<ast::Document> for Extension {
    fn from(document: ast::Document) -> Self {
        Self::Document(document)
    }
}

impl From<&ast::Document> for Extension {
    fn from(document: &ast::Document) -> Self {
        Self::Document(document.clone())
    }
}

impl From<String> for Extension {
    fn from(source: String) -> Self {
        Self::Source(source)
    }
}

impl From<&str> for Extension {
    fn from(source: &str) -> Self {
        Self::Source(source.to_owned())
    }
}

/// Extends `base` with `extension` using default [`ExtendOptions`].
///
/// See [`Extender::extend`].
pub fn extend(
    base: &ast::Document,
    extension: impl Into<Extension>,
) -> Result<ast::Document, ExtendError> {
    Extender::default().extend(base, extension)
}

#[derive(Debug, Clone, Default)]
pub struct Extender {
    options: ExtendOptions,
}

impl Extender {
    pub fn new(options: ExtendOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtendOptions {
        &self.options
    }

    /// Returns a new document where each operation of `extension` has been merged into the
    /// operation of `base` selecting the same root field.
    ///
    /// Output order: the operations of `base` (merged), the fragments of `base`, the fragments of
    /// `extension`, then any other definition of `base` and of `extension`.
    ///
    /// # Errors
    /// - [`ExtendError::Parse`] if the extension is source text with syntax errors.
    /// - [`ExtendError::TargetMismatch`] if an extension operation's root field is not the root
    ///   field of any operation of `base`.
    #[cfg_attr(
        feature = "snapshot_tracing",
        tracing::instrument(level = "trace", skip_all, name = "Extender::extend")
    )]
    pub fn extend(
        &self,
        base: &ast::Document,
        extension: impl Into<Extension>,
    ) -> Result<ast::Document, ExtendError> {
        match extension.into() {
            Extension::Document(extension) => extend_document(base, &extension),
            Extension::Source(source) => extend_document(base, &self.parse(&source)?),
        }
    }

    /// Applies several extensions in order, each one to the result of the previous.
    pub fn extend_all<I>(
        &self,
        base: &ast::Document,
        extensions: I,
    ) -> Result<ast::Document, ExtendError>
    where
        I: IntoIterator,
        I::Item: Into<Extension>,
    {
        extensions
            .into_iter()
            .try_fold(base.clone(), |document, extension| {
                self.extend(&document, extension)
            })
    }

    fn parse(&self, source: &str) -> Result<ast::Document, ExtendError> {
        let mut parser = Parser::new();
        if let Some(limit) = self.options.recursion_limit {
            parser = parser.recursion_limit(limit);
        }
        if let Some(limit) = self.options.token_limit {
            parser = parser.token_limit(limit);
        }
        let result = parser.parse_ast(source, &self.options.source_path);

        // Trace log recursion limit data
        let recursion_limit = parser.recursion_reached();
        tracing::trace!(?recursion_limit, "recursion limit data");

        result.map_err(|invalid| ExtendError::Parse(invalid.into()))
    }
}

fn extend_document(
    base: &ast::Document,
    extension: &ast::Document,
) -> Result<ast::Document, ExtendError> {
    let mut merged_operations: Vec<Node<ast::OperationDefinition>> =
        operations(base).cloned().collect();

    for extension_operation in operations(extension) {
        let actual = root_field(extension_operation).map(|field| &field.name);
        let target = actual.and_then(|actual| {
            merged_operations.iter().position(|operation| {
                root_field(operation).is_some_and(|field| field.name == *actual)
            })
        });
        let Some(index) = target else {
            return Err(ExtendError::TargetMismatch {
                expected: expected_root_fields(base),
                actual: actual.map_or_else(|| "(none)".to_owned(), |name| name.to_string()),
            });
        };

        let target = &mut merged_operations[index];
        tracing::debug!(
            root_field = ?actual,
            operation = ?target.name,
            "merging extension selections"
        );
        let selection_set =
            merge_selection_set(&target.selection_set, &extension_operation.selection_set);
        target.make_mut().selection_set = selection_set;
    }

    let is_other = |definition: &&ast::Definition| {
        !matches!(
            definition,
            ast::Definition::OperationDefinition(_) | ast::Definition::FragmentDefinition(_)
        )
    };
    let mut extended = base.clone();
    extended.definitions = merged_operations
        .into_iter()
        .map(ast::Definition::OperationDefinition)
        .chain(
            fragments(base)
                .chain(fragments(extension))
                .cloned()
                .map(ast::Definition::FragmentDefinition),
        )
        .chain(base.definitions.iter().filter(is_other).cloned())
        .chain(extension.definitions.iter().filter(is_other).cloned())
        .collect();
    snapshot!(extended, "extended document");
    Ok(extended)
}

fn expected_root_fields(base: &ast::Document) -> String {
    let names: Vec<String> = operations(base)
        .filter_map(|operation| root_field(operation))
        .map(|field| field.name.to_string())
        .collect();
    if names.is_empty() {
        "(none)".to_owned()
    } else {
        names.join("', '")
    }
}

/// Merges `extension` into `base`, returning the new selection set.
///
/// - A field already present by name with a sub-selection on both sides is merged recursively in
///   place; a field already present otherwise is left alone.
/// - A new field is appended.
/// - A fragment spread is appended unless `base` already spreads the same fragment.
/// - An inline fragment is always appended, never merged.
///
/// `base` keeps its order and its untouched selections are shared, not copied.
pub fn merge_selection_set(
    base: &[ast::Selection],
    extension: &[ast::Selection],
) -> Vec<ast::Selection> {
    let mut merged = base.to_vec();
    for selection in extension {
        match selection {
            ast::Selection::Field(field) => {
                let Some(index) = field_position(&merged, field.name.as_str()) else {
                    merged.push(selection.clone());
                    continue;
                };
                let ast::Selection::Field(existing) = &mut merged[index] else {
                    continue;
                };
                if !existing.selection_set.is_empty() && !field.selection_set.is_empty() {
                    let selection_set =
                        merge_selection_set(&existing.selection_set, &field.selection_set);
                    existing.make_mut().selection_set = selection_set;
                }
            }
            ast::Selection::FragmentSpread(spread) => {
                if !has_fragment_spread(&merged, spread.fragment_name.as_str()) {
                    merged.push(selection.clone());
                }
            }
            ast::Selection::InlineFragment(_) => merged.push(selection.clone()),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(source: &str) -> ast::Document {
        let Ok(document) = ast::Document::parse(source, "test.graphql") else {
            panic!("invalid test document");
        };
        document
    }

    fn merge(base: &str, extension: &str) -> String {
        let base = parse(base);
        let extension = parse(extension);
        let (Some(base), Some(extension)) =
            (operations(&base).next(), operations(&extension).next())
        else {
            panic!("expected operations");
        };
        let mut merged = base.clone();
        merged.make_mut().selection_set =
            merge_selection_set(&base.selection_set, &extension.selection_set);
        merged.to_string()
    }

    fn normalized(source: &str) -> String {
        operations(&parse(source)).next().unwrap().to_string()
    }

    #[test]
    fn appends_new_fields_after_existing_ones() {
        assert_eq!(merge("{ a b }", "{ c }"), normalized("{ a b c }"));
    }

    #[test]
    fn does_not_duplicate_existing_fields() {
        assert_eq!(merge("{ a b }", "{ a }"), normalized("{ a b }"));
    }

    #[test]
    fn merges_nested_selections_in_place() {
        assert_eq!(
            merge("{ a { x } b }", "{ a { y x { z } } }"),
            normalized("{ a { x y } b }"),
        );
    }

    #[test]
    fn ignores_field_shape_mismatch() {
        assert_eq!(merge("{ a b { c } }", "{ a { x } b }"), normalized("{ a b { c } }"));
    }

    #[test]
    fn fragment_spreads_are_not_duplicated() {
        assert_eq!(
            merge("{ a { ...F } }", "{ a { ...F ...G } }"),
            normalized("{ a { ...F ...G } }"),
        );
    }

    #[test]
    fn inline_fragments_are_always_appended() {
        assert_eq!(
            merge("{ a { ... on T { x } } }", "{ a { ... on T { x } } }"),
            normalized("{ a { ... on T { x } ... on T { x } } }"),
        );
    }

    #[test]
    fn untouched_selections_are_shared() {
        let base = parse("{ a { x } b { y } }");
        let extension = parse("{ a { z } }");
        let base_operation = operations(&base).next().unwrap();
        let merged = merge_selection_set(
            &base_operation.selection_set,
            &operations(&extension).next().unwrap().selection_set,
        );
        let (ast::Selection::Field(before), ast::Selection::Field(after)) =
            (&base_operation.selection_set[1], &merged[1])
        else {
            panic!("expected fields");
        };
        assert!(before.ptr_eq(after));
        assert_eq!(base.to_string(), parse("{ a { x } b { y } }").to_string());
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: ExtendOptions =
            serde_json::from_str(r#"{ "recursion_limit": 64 }"#).unwrap();
        assert_eq!(
            options,
            ExtendOptions {
                recursion_limit: Some(64),
                ..Default::default()
            }
        );
    }

    #[test]
    fn options_reject_unknown_fields() {
        assert!(serde_json::from_str::<ExtendOptions>(r#"{ "recursion": 64 }"#).is_err());
    }

    #[test]
    fn reports_parse_errors_with_configured_path() {
        let extender = Extender::new(ExtendOptions {
            source_path: "plugin.graphql".to_owned(),
            ..Default::default()
        });
        let base = parse("query { product { id } }");
        let Err(ExtendError::Parse(errors)) = extender.extend(&base, "query { product { ") else {
            panic!("expected a parse error");
        };
        assert!(!errors.errors.is_empty());
    }

    #[test]
    fn parser_limits_are_forwarded() {
        let base = parse("query { a { x } }");
        let source = "{ a { b { c { d { e } } } } }";
        assert!(extend(&base, source).is_ok());

        let extender = Extender::new(ExtendOptions {
            token_limit: Some(3),
            ..Default::default()
        });
        let Err(ExtendError::Parse(errors)) = extender.extend(&base, source) else {
            panic!("expected the token limit to be reached");
        };
        assert!(!errors.errors.is_empty());

        let extender = Extender::new(ExtendOptions {
            recursion_limit: Some(2),
            ..Default::default()
        });
        let Err(ExtendError::Parse(errors)) = extender.extend(&base, source) else {
            panic!("expected the recursion limit to be reached");
        };
        assert!(!errors.errors.is_empty());
    }
}
