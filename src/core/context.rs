//! Caller identity passed into every ledger operation.

use serde::{Deserialize, Serialize};

/// Which branch an operation targets and which operator performs it.
///
/// The presentation layer owns the session; the core never looks identity up on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchContext {
    /// Branch key scoping every collection
    pub branch: String,
    /// Operator identity recorded on writes
    pub operator: String,
}

impl BranchContext {
    #[must_use]
    pub fn new(branch: impl Into<String>, operator: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            operator: operator.into(),
        }
    }
}
