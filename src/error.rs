//! Unified error model for the filter-criteria compiler.
//! Every variant is an unrecoverable configuration/programming error local to
//! the build path: it aborts the current build and surfaces to the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CriteriaError {
    /// A WHERE fragment was empty or vacuous (whitespace/parentheses only).
    #[error("invalid where statement: {fragment:?}")]
    InvalidWhereStatement { fragment: String },

    /// The base select provider returned no fields.
    #[error("select field list is empty")]
    EmptySelectFieldsList,

    /// DISTINCT injection found no SELECT keyword in the query template.
    #[error("no SELECT keyword found in query template")]
    MissingSelectKeyword,

    #[error("custom column '{id}' is not registered")]
    CustomColumnNotRegistered { id: String },

    #[error("join '{id}' not found among added or registered joins")]
    JoinIdNotFound { id: String },

    #[error("join '{id}' is already registered")]
    JoinAlreadyRegistered { id: String },

    #[error("join '{id}' is already added")]
    JoinAlreadyAdded { id: String },

    #[error("custom column '{id}' cannot be registered again")]
    CannotRegisterColumnAgain { id: String },

    /// The custom-column fixpoint loop kept discovering work past the cap.
    /// A non-convergent enablement cycle is a configuration bug.
    #[error("query build did not stabilize after {iterations} iterations")]
    MaxBuildIterationsReached { iterations: usize },
}

pub type Result<T> = std::result::Result<T, CriteriaError>;
