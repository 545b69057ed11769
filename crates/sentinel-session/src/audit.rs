use serde::{Deserialize, Serialize};
use strum::Display;

/// The kinds of events the session manager's audit log records (§4.4's
/// Audit paragraph, §7's "the audit log records every failure"). An
/// append-only, ordered sequence — §5: "the audit log is an append-only
/// total order across all components in one session."
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum AuditEventKind {
    SessionOpened,
    ChannelDegraded,
    SwapSimulated,
    SwapRejected,
    SwapApproved,
    SwapRolledBack,
    SessionClosing,
    SessionSettled,
}

/// A single audit log entry. `correlation_id` is a proposal id, a session
/// id, or whatever identifier ties the entry back to the call that
/// produced it, so a reader can reconstruct the full story of one proposal
/// or one session from the log alone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub sequence: u64,
    pub timestamp: u64,
    pub kind: AuditEventKind,
    pub correlation_id: String,
    pub detail: String,
}
