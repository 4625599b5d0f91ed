// Core types for the report status lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::errors::StatusParseError;

/// Opaque report identifier, assigned once at creation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub String);

impl ReportId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReportId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ReportId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Which family of report a record belongs to; selects the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReportKind {
    IllegalParking,
    Obstruction,
}

impl ReportKind {
    pub const ALL: [ReportKind; 2] = [ReportKind::IllegalParking, ReportKind::Obstruction];

    /// Notice letters are only produced for plate-number scoped records
    pub fn issues_notices(self) -> bool {
        matches!(self, ReportKind::IllegalParking)
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportKind::IllegalParking => f.write_str("IllegalParking"),
            ReportKind::Obstruction => f.write_str("Obstruction"),
        }
    }
}

impl FromStr for ReportKind {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "illegalparking" | "platenumber" | "parking" => Ok(ReportKind::IllegalParking),
            "obstruction" => Ok(ReportKind::Obstruction),
            _ => Err(StatusParseError::UnknownKind(s.to_string())),
        }
    }
}

/// Canonical report status. Serialized as the label shown to administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReportStatus {
    #[serde(rename = "Pending")]
    Pending,
    #[serde(rename = "Reviewed for Proper Action")]
    ReviewedForProperAction,
    #[serde(rename = "Ongoing Investigation")]
    OngoingInvestigation,
    #[serde(rename = "Under Investigation")]
    UnderInvestigation,
    #[serde(rename = "Approved")]
    Approved,
    #[serde(rename = "Disapproved")]
    Disapproved,
    #[serde(rename = "Declined")]
    Declined,
    #[serde(rename = "Resolved")]
    Resolved,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 8] = [
        ReportStatus::Pending,
        ReportStatus::ReviewedForProperAction,
        ReportStatus::OngoingInvestigation,
        ReportStatus::UnderInvestigation,
        ReportStatus::Approved,
        ReportStatus::Disapproved,
        ReportStatus::Declined,
        ReportStatus::Resolved,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ReportStatus::Pending => "Pending",
            ReportStatus::ReviewedForProperAction => "Reviewed for Proper Action",
            ReportStatus::OngoingInvestigation => "Ongoing Investigation",
            ReportStatus::UnderInvestigation => "Under Investigation",
            ReportStatus::Approved => "Approved",
            ReportStatus::Disapproved => "Disapproved",
            ReportStatus::Declined => "Declined",
            ReportStatus::Resolved => "Resolved",
        }
    }

    /// Statuses in which violation edits are disallowed
    pub fn is_locked(self) -> bool {
        matches!(
            self,
            ReportStatus::Resolved
                | ReportStatus::Approved
                | ReportStatus::Disapproved
                | ReportStatus::Declined
        )
    }

    /// Leaving one of these always needs a justification
    pub fn is_investigation(self) -> bool {
        matches!(
            self,
            ReportStatus::OngoingInvestigation | ReportStatus::UnderInvestigation
        )
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReportStatus {
    type Err = StatusParseError;

    /// Accepts the display label or the variant name, ignoring case, spacing
    /// and punctuation. Distinct investigation labels stay distinct.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = squash(s);
        ReportStatus::ALL
            .into_iter()
            .find(|status| {
                squash(status.label()) == wanted || squash(&format!("{status:?}")) == wanted
            })
            .ok_or_else(|| StatusParseError::UnknownStatus(s.to_string()))
    }
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Role of the administrator requesting a change. Recorded, not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    #[default]
    Admin,
    SuperAdmin,
}

impl FromStr for ActorRole {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match squash(s).as_str() {
            "admin" => Ok(ActorRole::Admin),
            "superadmin" => Ok(ActorRole::SuperAdmin),
            _ => Err(StatusParseError::UnknownRole(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
}

impl ImageRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// One committed status change, kept for audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub from: ReportStatus,
    pub to: ReportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub actor_role: ActorRole,
    pub at: DateTime<Utc>,
}

/// A citizen report under workflow control. Owned by the persistence layer;
/// the engine only ever receives and returns snapshots of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    pub id: ReportId,
    pub kind: ReportKind,
    pub status: ReportStatus,
    #[serde(default)]
    pub status_change_count: u32,
    /// Reason field carried by older records. Never satisfies a reason
    /// requirement and is cleared once a transition commits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub violations: Vec<String>,
    #[serde(default)]
    pub confirmation_images: Vec<ImageRef>,
    #[serde(default)]
    pub notice_number: u64,
    #[serde(default)]
    pub history: Vec<StatusHistoryEntry>,
    /// Optimistic concurrency token, owned by the store
    #[serde(default)]
    pub revision: u64,
}

impl ReportRecord {
    /// New record in `Pending` with a fresh id
    pub fn new(kind: ReportKind, violations: Vec<String>) -> Self {
        Self::with_id(ReportId::generate(), kind, violations)
    }

    pub fn with_id(id: ReportId, kind: ReportKind, violations: Vec<String>) -> Self {
        Self {
            id,
            kind,
            status: ReportStatus::Pending,
            status_change_count: 0,
            reason: None,
            violations,
            confirmation_images: Vec::new(),
            notice_number: 0,
            history: Vec::new(),
            revision: 0,
        }
    }

    pub fn with_status(mut self, status: ReportStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_status_change_count(mut self, count: u32) -> Self {
        self.status_change_count = count;
        self
    }

    pub fn with_notice_number(mut self, notice_number: u64) -> Self {
        self.notice_number = notice_number;
        self
    }

    /// Most recent reason recorded in history, if any
    pub fn last_reason(&self) -> Option<&str> {
        self.history.iter().rev().find_map(|entry| entry.reason.as_deref())
    }
}

/// Ephemeral input for a status change
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub record: ReportRecord,
    pub target: ReportStatus,
    pub reason: Option<String>,
    pub actor_role: ActorRole,
    pub at: DateTime<Utc>,
}

impl TransitionRequest {
    pub fn new(record: ReportRecord, target: ReportStatus) -> Self {
        Self {
            record,
            target,
            reason: None,
            actor_role: ActorRole::default(),
            at: Utc::now(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_actor_role(mut self, actor_role: ActorRole) -> Self {
        self.actor_role = actor_role;
        self
    }

    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = at;
        self
    }
}

/// User-visible notification the presentation layer should raise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    #[serde(rename = "status-updated")]
    StatusUpdated,
}

impl Notification {
    pub fn as_str(self) -> &'static str {
        match self {
            Notification::StatusUpdated => "status-updated",
        }
    }
}

/// Intent emitted by the engine; performing it is the caller's job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideEffect {
    Notify(Notification),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub record: ReportRecord,
    pub effects: Vec<SideEffect>,
}

/// Sequence number stamped on a generated notice letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoticeSequence(pub u64);

impl NoticeSequence {
    pub fn value(self) -> u64 {
        self.0
    }

    /// Printed form, e.g. `2025-006`
    pub fn label(self, year: i32) -> String {
        format!("{year}-{:03}", self.0)
    }
}

impl fmt::Display for NoticeSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
