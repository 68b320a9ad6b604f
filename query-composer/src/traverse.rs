//! Recursive, schema-less traversal of executable definitions.
//!
//! Implement [`Visitor`] and override the methods for the nodes of interest; each method
//! defaults to the free function of the same name, which descends into the node's children.
use apollo_compiler::ast;

/// Traverse every operation and fragment definition of a document with the given visitor.
pub fn document(visitor: &mut impl Visitor, document: &ast::Document) {
    document.definitions.iter().for_each(|def| match def {
        ast::Definition::OperationDefinition(def) => operation(visitor, def),
        ast::Definition::FragmentDefinition(def) => fragment_definition(visitor, def),
        _ => {}
    })
}

pub trait Visitor: Sized {
    /// Traverse a field within a selection set.
    ///
    /// Call the [`field`] free function for the default behavior.
    fn field(&mut self, def: &ast::Field) {
        field(self, def)
    }

    /// Traverse a fragment spread within a selection set.
    ///
    /// Call the [`fragment_spread`] free function for the default behavior.
    fn fragment_spread(&mut self, def: &ast::FragmentSpread) {
        fragment_spread(self, def)
    }

    /// Traverse an inline fragment within a selection set.
    ///
    /// Call the [`inline_fragment`] free function for the default behavior.
    fn inline_fragment(&mut self, def: &ast::InlineFragment) {
        inline_fragment(self, def)
    }

    /// Traverse an argument value, of a field or of a directive.
    ///
    /// Call the [`value`] free function for the default behavior.
    fn value(&mut self, def: &ast::Value) {
        value(self, def)
    }
}

/// The default behavior for traversing an operation.
pub fn operation(visitor: &mut impl Visitor, def: &ast::OperationDefinition) {
    directives(visitor, &def.directives);
    selection_set(visitor, &def.selection_set)
}

/// The default behavior for traversing a fragment definition.
pub fn fragment_definition(visitor: &mut impl Visitor, def: &ast::FragmentDefinition) {
    directives(visitor, &def.directives);
    selection_set(visitor, &def.selection_set)
}

/// The default behavior for traversing a field: arguments, directives, then sub-selections.
pub fn field(visitor: &mut impl Visitor, def: &ast::Field) {
    for argument in &def.arguments {
        visitor.value(&argument.value);
    }
    directives(visitor, &def.directives);
    selection_set(visitor, &def.selection_set)
}

/// The default behavior for traversing a fragment spread.
///
/// Does not follow the spread into the fragment definition.
pub fn fragment_spread(visitor: &mut impl Visitor, def: &ast::FragmentSpread) {
    directives(visitor, &def.directives)
}

/// The default behavior for traversing an inline fragment.
pub fn inline_fragment(visitor: &mut impl Visitor, def: &ast::InlineFragment) {
    directives(visitor, &def.directives);
    selection_set(visitor, &def.selection_set)
}

/// The default behavior for traversing a value: list items and object fields.
pub fn value(visitor: &mut impl Visitor, def: &ast::Value) {
    match def {
        ast::Value::List(items) => {
            for item in items {
                visitor.value(item);
            }
        }
        ast::Value::Object(fields) => {
            for (_name, item) in fields {
                visitor.value(item);
            }
        }
        ast::Value::Null
        | ast::Value::Enum(_)
        | ast::Value::Variable(_)
        | ast::Value::String(_)
        | ast::Value::Float(_)
        | ast::Value::Int(_)
        | ast::Value::Boolean(_) => {}
    }
}

pub fn selection_set(visitor: &mut impl Visitor, set: &[ast::Selection]) {
    set.iter().for_each(|def| match def {
        ast::Selection::Field(def) => visitor.field(def),
        ast::Selection::FragmentSpread(def) => visitor.fragment_spread(def),
        ast::Selection::InlineFragment(def) => visitor.inline_fragment(def),
    })
}

fn directives(visitor: &mut impl Visitor, list: &ast::DirectiveList) {
    for directive in list.iter() {
        for argument in &directive.arguments {
            visitor.value(&argument.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountNodes {
        fields: u32,
        spreads: u32,
        variables: Vec<String>,
    }

    impl Visitor for CountNodes {
        fn field(&mut self, def: &ast::Field) {
            self.fields += 1;
            field(self, def)
        }

        fn fragment_spread(&mut self, def: &ast::FragmentSpread) {
            self.spreads += 1;
            fragment_spread(self, def)
        }

        fn value(&mut self, def: &ast::Value) {
            if let ast::Value::Variable(name) = def {
                self.variables.push(name.to_string());
            }
            value(self, def)
        }
    }

    #[test]
    fn test_count_nodes() {
        let graphql = "
            query($id: ID, $flag: Boolean!, $tags: [String]) {
                a(id: $id)
                ... @include(if: $flag) {
                    b(filter: { tags: [\"x\", $tags] })
                }
                ... F
                ... F
            }

            fragment F on Query {
                next {
                    a
                }
            }
        ";
        let Ok(ast) = ast::Document::parse(graphql, "") else {
            panic!("invalid test document");
        };
        let mut visitor = CountNodes::default();
        document(&mut visitor, &ast);
        assert_eq!(visitor.fields, 4);
        assert_eq!(visitor.spreads, 2);
        assert_eq!(visitor.variables, ["id", "flag", "tags"]);
    }
}
