//! CFG construction failures.
//!
//! These are internal-consistency errors in the resolved input tree, not
//! user-facing diagnostics: a well-formed resolver output never produces
//! them. Unreachable or non-terminating code is *not* an error.

use veld_common::interner::Atom;
use veld_common::span::Span;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CfgBuildError {
    /// `break`/`continue` with no enclosing matching construct.
    UnresolvedLabel { label: Atom, span: Span },
    /// The body nests deeper than the builder's recursion limit.
    NestingTooDeep { span: Span },
}

impl std::fmt::Display for CfgBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnresolvedLabel { label, span } => {
                if label.is_none() {
                    write!(f, "jump at {span} has no enclosing loop")
                } else {
                    write!(f, "jump at {span} targets an unresolved label (atom {})", label.0)
                }
            }
            Self::NestingTooDeep { span } => {
                write!(f, "body at {span} exceeds the CFG builder nesting limit")
            }
        }
    }
}

impl std::error::Error for CfgBuildError {}
