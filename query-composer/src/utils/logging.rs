/// This macro is a wrapper around `tracing::trace!` that records the printed form of a document
/// at a given stage of a transform, so that a log viewer can show how the document evolves.
///
/// The value must implement `Display`; for documents this is the GraphQL printer. EX:
/// ```ignore
/// snapshot!(document, "after merging extension");
/// // Generates:
/// // trace!(snapshot = "apollo_compiler::ast::Document", data = "query { .. }", "after merging extension");
/// ```
/// Nothing is emitted unless the `snapshot_tracing` feature is enabled.
macro_rules! snapshot {
    ($value:expr, $msg:literal) => {
        #[cfg(feature = "snapshot_tracing")]
        tracing::trace!(
            snapshot = std::any::type_name_of_val(&$value),
            data = %$value,
            $msg
        );
    };
}

pub(crate) use snapshot;
