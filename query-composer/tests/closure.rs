use pretty_assertions::assert_eq;
use query_composer::remove_unused_fragments;
use query_composer::remove_unused_variables;
use query_composer::shake;

use crate::normalized;
use crate::parse;

#[test]
fn removes_orphaned_fragments_and_variables() {
    let document = parse(
        "query Q($keep: Int, $drop: Int) {
             list(take: $keep) { ...F }
         }
         fragment F on T { id }
         fragment G on T { name(size: $drop) }",
    );
    insta::assert_snapshot!(shake(&document), @r###"
    query Q($keep: Int) {
      list(take: $keep) {
        ...F
      }
    }

    fragment F on T {
      id
    }
    "###);
}

#[test]
fn fragment_pass_does_not_touch_variables() {
    let document = parse(
        "query Q($unused: Int) { a }
         fragment F on Query { b }",
    );
    assert_eq!(
        remove_unused_fragments(&document).to_string(),
        normalized("query Q($unused: Int) { a }")
    );
}

#[test]
fn variable_pass_does_not_touch_fragments() {
    let document = parse(
        "query Q($unused: Int) { a }
         fragment F on Query { b }",
    );
    assert_eq!(
        remove_unused_variables(&document).to_string(),
        normalized(
            "query Q { a }
             fragment F on Query { b }"
        )
    );
}

#[test]
fn is_idempotent() {
    let document = parse(
        "query Q($a: Int, $b: Int) { x(a: $a) { ...F } }
         fragment F on X { y ...G }
         fragment G on X { z(b: $b) }
         fragment H on X { w }",
    );
    let once = shake(&document);
    let twice = shake(&once);
    assert_eq!(twice.to_string(), once.to_string());
}
