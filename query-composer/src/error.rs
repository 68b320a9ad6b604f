//! Composition errors.
use apollo_compiler::validation::DiagnosticList;
use apollo_compiler::validation::WithErrors;
use displaydoc::Display;
use thiserror::Error;

/// Errors returned by [`extend`][crate::extend()].
///
/// Pruning and the closure passes never fail: irregular shapes degrade to a best-effort document.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ExtendError {
    /// the extension must extend the '{expected}' query, but it selects '{actual}' instead
    TargetMismatch {
        /// Root field(s) selected by the base document's operations.
        expected: String,
        /// Root field selected by the extension operation.
        actual: String,
    },

    /// {0}
    Parse(#[from] ParseErrors),
}

/// Syntax errors reported by the parser for extension source text, passed through untouched.
#[derive(Debug)]
pub struct ParseErrors {
    pub errors: DiagnosticList,
}

impl<T> From<WithErrors<T>> for ParseErrors {
    fn from(WithErrors { errors, .. }: WithErrors<T>) -> Self {
        Self { errors }
    }
}

impl std::fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut errors = self.errors.iter();
        for (i, error) in errors.by_ref().take(5).enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", error)?;
        }
        let remaining = errors.count();
        if remaining > 0 {
            write!(f, "\n...and {remaining} other errors")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseErrors {}
