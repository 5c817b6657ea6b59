use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use deals_api::now_ms;

use crate::error::Phase;

// ════════════════════════════════════════════════════════════════
//  Escalation payload
// ════════════════════════════════════════════════════════════════

/// Manual-intervention-required record emitted when compensation fails.
///
/// Carries everything an operator needs to reconcile by hand: the token,
/// the record it maps to, the step that diverged and both underlying
/// error texts.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Escalation {
    pub token: String,
    pub record_id: Option<i64>,
    pub phase: Phase,
    /// The failure that started the divergence.
    pub original: String,
    /// The compensation failure, when a compensating action was attempted.
    pub compensation: Option<String>,
    pub at_ms: i64,
}

impl Escalation {
    pub fn new(
        token: impl Into<String>,
        record_id: Option<i64>,
        phase: Phase,
        original: impl Into<String>,
        compensation: Option<String>,
    ) -> Self {
        Self {
            token: token.into(),
            record_id,
            phase,
            original: original.into(),
            compensation,
            at_ms: now_ms(),
        }
    }
}

/// Channel surfacing inconsistencies to an operator.
///
/// The signature is infallible on purpose: whatever happens to the
/// channel, the coordinator still returns the original error to its
/// caller. Implementations log their own failures and move on.
pub trait EscalationReporter: Send + Sync {
    fn escalate(&self, escalation: &Escalation);
}

// ════════════════════════════════════════════════════════════════
//  Reporters
// ════════════════════════════════════════════════════════════════

/// Structured-log reporter. The replacement for the original policy of
/// crashing the whole process: the alarm goes to the error log and
/// unrelated in-flight requests keep being served.
pub struct LogReporter;

impl EscalationReporter for LogReporter {
    fn escalate(&self, e: &Escalation) {
        tracing::error!(
            token = %e.token,
            record_id = ?e.record_id,
            phase = %e.phase,
            original = %e.original,
            compensation = ?e.compensation,
            "MANUAL RECONCILIATION REQUIRED: store and topic service disagree"
        );
    }
}

/// Appends escalations as JSON lines to a file, so reconciliation
/// survives a restart. Write failures are logged, never propagated.
pub struct DeadLetterReporter {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl DeadLetterReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn append(&self, e: &Escalation) -> std::io::Result<()> {
        let line = serde_json::to_string(e)?;
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(f, "{line}")
    }
}

impl EscalationReporter for DeadLetterReporter {
    fn escalate(&self, e: &Escalation) {
        if let Err(err) = self.append(e) {
            tracing::error!(
                path = %self.path.display(),
                token = %e.token,
                error = %err,
                "failed to append escalation to dead-letter file"
            );
        }
    }
}

/// Fan-out to several channels (log + dead-letter is the usual pair).
pub struct CompositeReporter {
    reporters: Vec<Box<dyn EscalationReporter>>,
}

impl CompositeReporter {
    pub fn new(reporters: Vec<Box<dyn EscalationReporter>>) -> Self {
        Self { reporters }
    }
}

impl EscalationReporter for CompositeReporter {
    fn escalate(&self, e: &Escalation) {
        for r in &self.reporters {
            r.escalate(e);
        }
    }
}
