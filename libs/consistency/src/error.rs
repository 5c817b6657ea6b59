use deals_api::StoreError;

/// Step of a two-phase sequence an error or escalation is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Topic subscribe after the provisional store insert.
    RegisterSubscribe,
    /// Compensating store delete after a failed subscribe.
    RegisterCompensation,
    /// Topic unsubscribe, store untouched so far.
    UnregisterUnsubscribe,
    /// Store delete after a successful unsubscribe.
    UnregisterDelete,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::RegisterSubscribe => f.write_str("register/subscribe"),
            Phase::RegisterCompensation => f.write_str("register/compensation"),
            Phase::UnregisterUnsubscribe => f.write_str("unregister/unsubscribe"),
            Phase::UnregisterDelete => f.write_str("unregister/delete"),
        }
    }
}

/// Tri-state consistency result of a register/unregister call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyOutcome {
    /// Both sides agree: the token is (un)subscribed and (un)recorded.
    Committed,
    /// The operation aborted cleanly; neither side holds the token
    /// beyond what it held before the call.
    RolledBack,
    /// Compensation failed; store and service disagree and an operator
    /// must reconcile. Surfaced through the escalation reporter.
    Inconsistent,
}

/// Everything that can go wrong in a register/unregister sequence.
///
/// `Validation`, `Store` and `Service` are recoverable: no partial state
/// exists, the whole operation is safe to retry. `Inconsistent` is
/// terminal for the request and never auto-retried — a retry could
/// double-apply side effects.
#[derive(Debug, thiserror::Error)]
pub enum ConsistencyError {
    #[error("{0}")]
    Validation(&'static str),

    /// Store failure before anything external changed.
    #[error("store: {0}")]
    Store(#[from] StoreError),

    /// Topic service failure with local state intact (register: the
    /// provisional record was compensated away; unregister: nothing was
    /// touched yet).
    #[error("topic service ({phase}): {reason}")]
    Service { phase: Phase, reason: String },

    /// Store and service disagree about `token` and automatic repair
    /// failed. Carries both underlying errors so an operator can
    /// reconstruct which side holds what.
    #[error("inconsistent state for '{token}' ({phase}): {original}")]
    Inconsistent {
        token: String,
        record_id: Option<i64>,
        phase: Phase,
        original: String,
        compensation: Option<String>,
    },
}

impl ConsistencyError {
    /// The outcome an `Err` maps to. `Ok` means `Committed`.
    pub fn outcome(&self) -> ConsistencyOutcome {
        match self {
            ConsistencyError::Inconsistent { .. } => ConsistencyOutcome::Inconsistent,
            _ => ConsistencyOutcome::RolledBack,
        }
    }
}
