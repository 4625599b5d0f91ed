// Report workflow engine
//
// Pure and synchronous: every operation takes a record snapshot and returns a
// new snapshot. No I/O, no interior mutability, safe to share across threads.

use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::errors::{EditTarget, TableError, WorkflowError};
use super::table::{PlateVariant, TransitionRule, TransitionTable};
use super::types::{
    ImageRef, Notification, NoticeSequence, ReportKind, ReportRecord, ReportStatus, SideEffect,
    StatusHistoryEntry, TransitionOutcome, TransitionRequest,
};

pub const DEFAULT_MAX_STATUS_CHANGES: u32 = 3;

pub type TransitionResult = Result<TransitionOutcome, WorkflowError>;

#[derive(Debug, Clone)]
pub struct ReportWorkflowEngine {
    table: TransitionTable,
    max_changes: u32,
}

impl ReportWorkflowEngine {
    pub fn new(table: TransitionTable, max_changes: u32) -> Self {
        Self { table, max_changes }
    }

    /// Engine over the built-in tables with the default change limit
    pub fn with_builtin_tables(variant: PlateVariant) -> Result<Self, TableError> {
        Ok(Self::new(
            TransitionTable::builtin(variant)?,
            DEFAULT_MAX_STATUS_CHANGES,
        ))
    }

    pub fn with_max_changes(mut self, max_changes: u32) -> Self {
        self.max_changes = max_changes;
        self
    }

    pub fn max_changes(&self) -> u32 {
        self.max_changes
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    fn limit_reached(&self, record: &ReportRecord) -> bool {
        record.status_change_count >= self.max_changes
    }

    /// Status changes still available to this record
    pub fn remaining_changes(&self, record: &ReportRecord) -> u32 {
        self.max_changes.saturating_sub(record.status_change_count)
    }

    /// Moves currently offered for this record. Empty once the limit is hit.
    pub fn available_actions(&self, record: &ReportRecord) -> Vec<TransitionRule> {
        if self.limit_reached(record) {
            return Vec::new();
        }
        self.table.rules(record.kind, record.status).to_vec()
    }

    pub fn apply_transition(&self, request: TransitionRequest) -> TransitionResult {
        let TransitionRequest {
            mut record,
            target,
            reason,
            actor_role,
            at,
        } = request;

        if self.limit_reached(&record) {
            warn!(
                report_id = %record.id,
                used = record.status_change_count,
                max = self.max_changes,
                "Status change rejected: limit reached"
            );
            return Err(WorkflowError::LimitExceeded {
                used: record.status_change_count,
                max: self.max_changes,
            });
        }

        let rule = self
            .table
            .rules(record.kind, record.status)
            .iter()
            .find(|rule| rule.target == target)
            .copied()
            .ok_or(WorkflowError::InvalidTransition {
                kind: record.kind,
                from: record.status,
                to: target,
            })?;

        // Only the actor's own reason counts; nothing left on the record does
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        if let Some(leftover) = record.reason.as_deref() {
            debug!(
                report_id = %record.id,
                leftover = leftover,
                "Ignoring reason left on record"
            );
        }

        if rule.requires_reason && reason.is_none() {
            return Err(WorkflowError::MissingReason {
                from: record.status,
                to: target,
            });
        }

        let from = record.status;
        record.history.push(StatusHistoryEntry {
            from,
            to: target,
            reason,
            actor_role,
            at,
        });
        record.status = target;
        record.status_change_count += 1;
        record.reason = None;

        info!(
            report_id = %record.id,
            kind = %record.kind,
            from = %from,
            to = %target,
            status_change_count = record.status_change_count,
            remaining = self.remaining_changes(&record),
            "Report status transition"
        );

        Ok(TransitionOutcome {
            record,
            effects: vec![SideEffect::Notify(Notification::StatusUpdated)],
        })
    }

    pub fn can_edit_violations(&self, record: &ReportRecord) -> bool {
        !record.status.is_locked()
    }

    /// Labels administrators may choose for `kind`; empty means free text
    pub fn violation_catalogue(&self, kind: ReportKind) -> &[String] {
        self.table.violation_catalogue(kind)
    }

    /// Replace the whole violation list. Labels are trimmed, blanks dropped
    /// and repeats collapsed to their first occurrence. Kinds with a
    /// catalogue only accept its labels, stored in catalogue spelling.
    pub fn set_violations(
        &self,
        record: &ReportRecord,
        violations: &[String],
    ) -> Result<ReportRecord, WorkflowError> {
        if !self.can_edit_violations(record) {
            return Err(WorkflowError::EditNotAllowed {
                target: EditTarget::Violations,
                status: record.status,
            });
        }

        let normalized = self.normalize_violations(record.kind, violations)?;

        debug!(
            report_id = %record.id,
            count = normalized.len(),
            "Violations replaced"
        );

        let mut updated = record.clone();
        updated.violations = normalized;
        Ok(updated)
    }

    /// Trim, drop blanks, check against the catalogue and dedupe
    pub fn normalize_violations(
        &self,
        kind: ReportKind,
        violations: &[String],
    ) -> Result<Vec<String>, WorkflowError> {
        let catalogue = self.table.kind_table(kind);
        let mut seen = HashSet::new();
        let mut normalized = Vec::new();

        for label in violations.iter().map(|label| label.trim()) {
            if label.is_empty() {
                continue;
            }
            let label = match catalogue {
                Some(table) => table.canonical_violation(label).ok_or_else(|| {
                    WorkflowError::UnknownViolation {
                        kind,
                        label: label.to_string(),
                    }
                })?,
                None => label,
            };
            if seen.insert(label.to_string()) {
                normalized.push(label.to_string());
            }
        }

        if normalized.is_empty() {
            return Err(WorkflowError::EmptyViolationList);
        }
        Ok(normalized)
    }

    pub fn attach_confirmation_images(
        &self,
        record: &ReportRecord,
        images: &[ImageRef],
    ) -> Result<ReportRecord, WorkflowError> {
        if record.status != ReportStatus::Resolved {
            return Err(WorkflowError::EditNotAllowed {
                target: EditTarget::ConfirmationImages,
                status: record.status,
            });
        }

        let mut updated = record.clone();
        updated.confirmation_images.extend_from_slice(images);
        debug!(
            report_id = %record.id,
            attached = images.len(),
            total = updated.confirmation_images.len(),
            "Confirmation images attached"
        );
        Ok(updated)
    }

    /// Allocate the next notice number.
    ///
    /// Every call consumes a number. Call it exactly once per notice letter
    /// actually produced; the engine cannot tell whether a download finished.
    pub fn issue_notice(
        &self,
        record: &ReportRecord,
    ) -> Result<(ReportRecord, NoticeSequence), WorkflowError> {
        if !record.kind.issues_notices() {
            return Err(WorkflowError::EditNotAllowed {
                target: EditTarget::Notice,
                status: record.status,
            });
        }

        let next = record
            .notice_number
            .checked_add(1)
            .ok_or(WorkflowError::LimitExceeded {
                used: u32::MAX,
                max: u32::MAX,
            })?;

        let mut updated = record.clone();
        updated.notice_number = next;
        info!(report_id = %record.id, notice_number = next, "Notice number issued");
        Ok((updated, NoticeSequence(next)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::errors::ErrorKind;
    use crate::workflow::types::ActorRole;

    fn engine() -> ReportWorkflowEngine {
        ReportWorkflowEngine::with_builtin_tables(PlateVariant::Investigation).unwrap()
    }

    fn obstruction(status: ReportStatus) -> ReportRecord {
        ReportRecord::new(ReportKind::Obstruction, vec!["Hazard Parking".to_string()])
            .with_status(status)
    }

    #[test]
    fn test_limit_boundary_is_inclusive() {
        let engine = engine();
        let record = obstruction(ReportStatus::Pending).with_status_change_count(2);
        assert_eq!(engine.remaining_changes(&record), 1);
        assert_eq!(engine.available_actions(&record).len(), 1);

        let third = engine
            .apply_transition(TransitionRequest::new(
                record,
                ReportStatus::ReviewedForProperAction,
            ))
            .unwrap();
        assert_eq!(third.record.status_change_count, 3);
        assert_eq!(engine.remaining_changes(&third.record), 0);
        assert!(engine.available_actions(&third.record).is_empty());

        let fourth = engine
            .apply_transition(TransitionRequest::new(
                third.record,
                ReportStatus::OngoingInvestigation,
            ))
            .unwrap_err();
        assert_eq!(fourth.kind(), ErrorKind::LimitExceeded);
    }

    #[test]
    fn test_limit_takes_precedence_over_invalid_target() {
        let engine = engine();
        let record = obstruction(ReportStatus::Pending).with_status_change_count(3);
        let err = engine
            .apply_transition(TransitionRequest::new(record, ReportStatus::Resolved))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LimitExceeded);
    }

    #[test]
    fn test_reason_is_recorded_in_history_not_retained() {
        let engine = engine();
        let mut record = obstruction(ReportStatus::OngoingInvestigation);
        record.reason = Some("stale draft".to_string());

        let outcome = engine
            .apply_transition(
                TransitionRequest::new(record, ReportStatus::Declined)
                    .with_reason("  no obstruction found on site  ")
                    .with_actor_role(ActorRole::SuperAdmin),
            )
            .unwrap();

        assert_eq!(outcome.record.reason, None);
        let entry = outcome.record.history.last().unwrap();
        assert_eq!(entry.reason.as_deref(), Some("no obstruction found on site"));
        assert_eq!(entry.actor_role, ActorRole::SuperAdmin);
        assert_eq!(entry.from, ReportStatus::OngoingInvestigation);
        assert_eq!(entry.to, ReportStatus::Declined);
    }

    #[test]
    fn test_leftover_record_reason_does_not_satisfy_requirement() {
        let engine = engine();
        let mut record = obstruction(ReportStatus::OngoingInvestigation);
        record.reason = Some("confirmed by barangay".to_string());

        let err = engine
            .apply_transition(TransitionRequest::new(record.clone(), ReportStatus::Approved))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingReason);

        let outcome = engine
            .apply_transition(
                TransitionRequest::new(record, ReportStatus::Approved).with_reason("towed"),
            )
            .unwrap();
        assert_eq!(outcome.record.last_reason(), Some("towed"));
        assert_eq!(outcome.record.reason, None);
    }

    #[test]
    fn test_whitespace_reason_is_missing() {
        let engine = engine();
        let err = engine
            .apply_transition(
                TransitionRequest::new(
                    obstruction(ReportStatus::OngoingInvestigation),
                    ReportStatus::Approved,
                )
                .with_reason("   "),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingReason);
    }

    #[test]
    fn test_transition_changes_only_workflow_fields() {
        let engine = engine();
        let record = obstruction(ReportStatus::Pending).with_notice_number(4);
        let before = record.clone();

        let outcome = engine
            .apply_transition(TransitionRequest::new(
                record,
                ReportStatus::ReviewedForProperAction,
            ))
            .unwrap();

        assert_eq!(outcome.record.id, before.id);
        assert_eq!(outcome.record.violations, before.violations);
        assert_eq!(outcome.record.notice_number, 4);
        assert_eq!(outcome.record.revision, before.revision);
        assert_eq!(
            outcome.effects,
            vec![SideEffect::Notify(Notification::StatusUpdated)]
        );
    }

    #[test]
    fn test_set_violations_normalizes_labels() {
        let engine = engine();
        let record = obstruction(ReportStatus::Pending);
        let updated = engine
            .set_violations(
                &record,
                &[
                    " Towing Zone ".to_string(),
                    "".to_string(),
                    "Towing Zone".to_string(),
                    "Illegal Sidewalk Use".to_string(),
                ],
            )
            .unwrap();
        assert_eq!(updated.violations, vec!["Towing Zone", "Illegal Sidewalk Use"]);
    }

    #[test]
    fn test_obstruction_violations_come_from_catalogue() {
        let engine = engine();
        let record = obstruction(ReportStatus::Pending);

        let updated = engine
            .set_violations(&record, &["towing zone".to_string(), "Towing Zone".to_string()])
            .unwrap();
        assert_eq!(updated.violations, vec!["Towing Zone"]);

        let err = engine
            .set_violations(&record, &["Towing Zone".to_string(), "Double Parking".to_string()])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownViolation);
        assert!(err.to_string().contains("Double Parking"));
    }

    #[test]
    fn test_plate_violations_are_free_text() {
        let engine = engine();
        let record =
            ReportRecord::new(ReportKind::IllegalParking, vec!["Illegal Parking".to_string()]);
        let updated = engine
            .set_violations(&record, &["Blocking a driveway".to_string()])
            .unwrap();
        assert_eq!(updated.violations, vec!["Blocking a driveway"]);
        assert!(engine.violation_catalogue(ReportKind::IllegalParking).is_empty());
    }

    #[test]
    fn test_blank_only_violation_list_is_empty() {
        let engine = engine();
        let err = engine
            .set_violations(&obstruction(ReportStatus::Pending), &["  ".to_string()])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyViolationList);
    }

    #[test]
    fn test_investigation_states_allow_violation_edits() {
        let engine = engine();
        for status in [
            ReportStatus::Pending,
            ReportStatus::ReviewedForProperAction,
            ReportStatus::OngoingInvestigation,
            ReportStatus::UnderInvestigation,
        ] {
            assert!(engine.can_edit_violations(&obstruction(status)), "{status}");
        }
    }

    #[test]
    fn test_notice_refused_for_obstruction_reports() {
        let engine = engine();
        let err = engine
            .issue_notice(&obstruction(ReportStatus::Approved))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EditNotAllowed);
    }

    #[test]
    fn test_notice_counter_overflow_is_an_error() {
        let engine = engine();
        let record =
            ReportRecord::new(ReportKind::IllegalParking, vec!["Illegal Parking".to_string()])
                .with_notice_number(u64::MAX);
        let err = engine.issue_notice(&record).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LimitExceeded);
    }

    #[test]
    fn test_custom_limit() {
        let engine = engine().with_max_changes(1);
        let record = obstruction(ReportStatus::Pending);
        let outcome = engine
            .apply_transition(TransitionRequest::new(
                record,
                ReportStatus::ReviewedForProperAction,
            ))
            .unwrap();
        assert!(engine.available_actions(&outcome.record).is_empty());
    }
}
