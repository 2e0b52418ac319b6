//! Ownership resolution
//!
//! Decides which observed indexes the planner should treat as "current".
//! A table may carry indexes this declaration was never told about (created
//! by hand, or by an older declaration). Creation never touches those;
//! updates and deletes adopt them so they get reconciled away.

use crate::model::{IndexInfo, RequestKind};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Indexes the planner diffs against
    pub candidates: Vec<IndexInfo>,
    /// True when untracked indexes were pulled into `candidates`
    pub adopted: bool,
    /// Observed indexes whose names are not managed
    pub untracked_count: usize,
}

/// Names managed by a reconciliation: the current declaration, plus the prior
/// declaration on updates so indexes removed between versions are still ours.
pub fn managed_names<'a>(
    kind: RequestKind,
    desired: impl IntoIterator<Item = &'a str>,
    prior: impl IntoIterator<Item = &'a str>,
) -> BTreeSet<String> {
    let mut names: BTreeSet<String> = desired.into_iter().map(str::to_string).collect();
    if kind == RequestKind::Update {
        names.extend(prior.into_iter().map(str::to_string));
    }
    names
}

/// Select the candidate indexes for planning
pub fn resolve(
    kind: RequestKind,
    observed: &[IndexInfo],
    managed_names: &BTreeSet<String>,
) -> Resolution {
    let (tracked, untracked): (Vec<&IndexInfo>, Vec<&IndexInfo>) = observed
        .iter()
        .partition(|index| managed_names.contains(&index.index_name));
    let untracked_count = untracked.len();

    let adopt = match kind {
        RequestKind::Create => false,
        RequestKind::Update | RequestKind::Delete => untracked_count > 0,
    };

    let candidates: Vec<IndexInfo> = if adopt {
        observed.to_vec()
    } else {
        tracked.into_iter().cloned().collect()
    };

    if adopt {
        tracing::info!(
            request = %kind,
            untracked = untracked_count,
            "Adopting untracked indexes for reconciliation"
        );
    } else if untracked_count > 0 {
        tracing::debug!(
            untracked = untracked_count,
            "Leaving untracked indexes untouched on create"
        );
    }

    Resolution {
        candidates,
        adopted: adopt,
        untracked_count,
    }
}
