// Boundary orchestration: fetch the authoritative record, run the engine,
// commit the result. Conflicts surface as `StaleRecord`; nothing is retried here.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

use crate::store::ReportStore;
use crate::telemetry::{create_workflow_span, generate_correlation_id};
use crate::workflow::{
    ActorRole, ImageRef, NoticeSequence, ReportId, ReportKind, ReportRecord, ReportStatus,
    ReportWorkflowEngine, TransitionOutcome, TransitionRequest, TransitionRule, WorkflowError,
};

/// Everything a presentation layer needs to render one report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    pub record: ReportRecord,
    pub actions: Vec<TransitionRule>,
    pub remaining_changes: u32,
    pub can_edit_violations: bool,
    /// Labels to offer when editing violations; empty means free text
    pub violation_catalogue: Vec<String>,
}

pub struct ReportWorkflowService<S: ReportStore> {
    engine: Arc<ReportWorkflowEngine>,
    store: Arc<S>,
}

impl<S: ReportStore> Clone for ReportWorkflowService<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ReportStore> ReportWorkflowService<S> {
    pub fn new(engine: ReportWorkflowEngine, store: S) -> Self {
        Self {
            engine: Arc::new(engine),
            store: Arc::new(store),
        }
    }

    pub fn engine(&self) -> &ReportWorkflowEngine {
        &self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn create(
        &self,
        kind: ReportKind,
        violations: &[String],
    ) -> Result<ReportRecord, WorkflowError> {
        let violations = self.engine.normalize_violations(kind, violations)?;
        let record = ReportRecord::new(kind, violations);
        let stored = self.store.insert(record).await?;
        info!(report_id = %stored.id, kind = %kind, "Report created");
        Ok(stored)
    }

    pub async fn view(&self, id: &ReportId) -> Result<ReportView, WorkflowError> {
        let record = self.store.load(id).await?;
        Ok(ReportView {
            actions: self.engine.available_actions(&record),
            remaining_changes: self.engine.remaining_changes(&record),
            can_edit_violations: self.engine.can_edit_violations(&record),
            violation_catalogue: self.engine.violation_catalogue(record.kind).to_vec(),
            record,
        })
    }

    pub async fn transition(
        &self,
        id: &ReportId,
        target: ReportStatus,
        reason: Option<String>,
        actor_role: ActorRole,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let correlation_id = generate_correlation_id();
        let span = create_workflow_span("transition", id.as_str(), &correlation_id);

        async move {
            let record = self.store.load(id).await?;
            let mut request = TransitionRequest::new(record, target)
                .with_actor_role(actor_role)
                .at(Utc::now());
            request.reason = reason;

            let outcome = self.engine.apply_transition(request).inspect_err(|e| {
                warn!(error = %e, kind = %e.kind(), "Transition refused");
            })?;

            let record = self.store.save(outcome.record).await?;
            Ok(TransitionOutcome {
                record,
                effects: outcome.effects,
            })
        }
        .instrument(span)
        .await
    }

    pub async fn update_violations(
        &self,
        id: &ReportId,
        violations: &[String],
    ) -> Result<ReportRecord, WorkflowError> {
        let correlation_id = generate_correlation_id();
        let span = create_workflow_span("update_violations", id.as_str(), &correlation_id);

        async move {
            let record = self.store.load(id).await?;
            let updated = self.engine.set_violations(&record, violations)?;
            self.store.save(updated).await
        }
        .instrument(span)
        .await
    }

    pub async fn attach_confirmation_images(
        &self,
        id: &ReportId,
        images: &[ImageRef],
    ) -> Result<ReportRecord, WorkflowError> {
        let correlation_id = generate_correlation_id();
        let span = create_workflow_span("attach_confirmation_images", id.as_str(), &correlation_id);

        async move {
            let record = self.store.load(id).await?;
            let updated = self.engine.attach_confirmation_images(&record, images)?;
            self.store.save(updated).await
        }
        .instrument(span)
        .await
    }

    /// Allocate and persist the next notice number. Only call this once the
    /// notice letter has actually been produced for the user.
    pub async fn issue_notice(
        &self,
        id: &ReportId,
    ) -> Result<(ReportRecord, NoticeSequence), WorkflowError> {
        let correlation_id = generate_correlation_id();
        let span = create_workflow_span("issue_notice", id.as_str(), &correlation_id);

        async move {
            let record = self.store.load(id).await?;
            let (updated, sequence) = self.engine.issue_notice(&record)?;
            let stored = self.store.save(updated).await?;
            Ok((stored, sequence))
        }
        .instrument(span)
        .await
    }
}
