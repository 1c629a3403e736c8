pub mod clause;
pub mod criteria;
pub mod error;
pub mod join;
pub mod placeholder;
pub mod search;
pub mod template;
pub mod value;

// Re-export the public surface so callers can use `criterium::FilterCriteria`
// without walking the module tree.
pub use crate::clause::SqlStatement;
pub use crate::criteria::custom::{CustomColumn, CustomColumnSet, CUSTOM_COLUMN_SUFFIX};
pub use crate::criteria::{
    BuildContext, BuiltQuery, CriteriaState, FilterCriteria, QuerySource, SortOrder, TableBinding,
    MAX_BUILD_ITERATIONS,
};
pub use crate::error::{CriteriaError, Result};
pub use crate::join::{Join, JoinRegistry};
pub use crate::placeholder::{Placeholder, PlaceholderRegistry, PLACEHOLDER_SIGIL};
pub use crate::search::SearchKeywords;
pub use crate::value::BindValue;
