//! Requirement Assessment State Machine
//!
//! Drives the requirement-level workflow for one (tenant, framework) pair:
//! navigation over the framework's leaves in declaration order, skip, the
//! various saves, progress, reset and summary. Recorded statuses live in
//! the [`AssessmentStore`]; navigation sessions are in-memory.
//!
//! Saves read, edit and write back one record. Every save and every reset
//! of a (tenant, framework) pair runs under that pair's write lock, so two
//! saves never interleave and no save straddles a reset.

pub mod navigator;
pub mod summary;

pub use navigator::{Cursor, Position};
pub use summary::{AssessmentSummary, GroupRollup, Progress, RecordMap, RequirementGap, StatusCounts};

use crate::audit::{AuditEventType, AuditTrail};
use crate::catalog::{CatalogStore, Framework, RequirementNode};
use crate::scoring::{AnswerSheet, RequirementView, ScoringEngine};
use dashmap::DashMap;
use grc_common::{
    with_timeout, AddressableChoice, AddressableDecision, AssessmentStatus, AssessmentStore,
    EvidenceRef, FrameworkId, GrcError, GrcResult, RequirementAssessment, RequirementId, TenantId,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Requirement assessment workflow
pub struct AssessmentService {
    catalog: Arc<CatalogStore>,
    store: Arc<dyn AssessmentStore>,
    audit: Arc<AuditTrail>,
    sessions: DashMap<(TenantId, FrameworkId), Position>,
    write_locks: DashMap<(TenantId, FrameworkId), Arc<Mutex<()>>>,
    timeout: Duration,
    gap_cap: usize,
}

impl AssessmentService {
    pub fn new(
        catalog: Arc<CatalogStore>,
        store: Arc<dyn AssessmentStore>,
        audit: Arc<AuditTrail>,
        timeout: Duration,
        gap_cap: usize,
    ) -> Self {
        Self {
            catalog,
            store,
            audit,
            sessions: DashMap::new(),
            write_locks: DashMap::new(),
            timeout,
            gap_cap,
        }
    }

    async fn write_lock(&self, tenant: TenantId, framework: &FrameworkId) -> OwnedMutexGuard<()> {
        let lock = self
            .write_locks
            .entry((tenant, framework.clone()))
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    fn leaf<'a>(framework: &'a Framework, requirement: &str) -> GrcResult<&'a RequirementNode> {
        framework
            .requirements
            .leaf(requirement)
            .ok_or_else(|| GrcError::RequirementNotFound {
                framework: framework.id.to_string(),
                requirement: requirement.to_string(),
            })
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    fn cursor(&self, tenant: TenantId, framework: &Framework) -> Cursor {
        let position = self
            .sessions
            .get(&(tenant, framework.id.clone()))
            .map(|p| *p)
            .unwrap_or_default();
        Cursor::new(position, framework.requirements.leaf_count())
    }

    fn save_cursor(&self, tenant: TenantId, framework: &Framework, cursor: Cursor) {
        self.sessions
            .insert((tenant, framework.id.clone()), cursor.position());
    }

    fn leaf_at(framework: &Framework, idx: Option<usize>) -> Option<RequirementId> {
        idx.and_then(|i| framework.requirements.leaves().nth(i))
            .map(|node| node.id.clone())
    }

    /// Current position
    pub fn position(&self, tenant: TenantId, framework: &str) -> GrcResult<Position> {
        let catalog = self.catalog.view(tenant);
        let framework = catalog.require_framework(framework)?;
        Ok(self.cursor(tenant, framework).position())
    }

    /// Leaf currently displayed, `None` before the first selection or in review
    pub fn current(&self, tenant: TenantId, framework: &str) -> GrcResult<Option<RequirementId>> {
        let catalog = self.catalog.view(tenant);
        let framework = catalog.require_framework(framework)?;
        let cursor = self.cursor(tenant, framework);
        Ok(Self::leaf_at(framework, cursor.current()))
    }

    /// Advance to the next leaf; `None` once in review
    pub fn next(&self, tenant: TenantId, framework: &str) -> GrcResult<Option<RequirementId>> {
        let catalog = self.catalog.view(tenant);
        let framework = catalog.require_framework(framework)?;
        let mut cursor = self.cursor(tenant, framework);
        let idx = cursor.next();
        self.save_cursor(tenant, framework, cursor);
        Ok(Self::leaf_at(framework, idx))
    }

    /// Step back to the previous leaf
    pub fn previous(&self, tenant: TenantId, framework: &str) -> GrcResult<Option<RequirementId>> {
        let catalog = self.catalog.view(tenant);
        let framework = catalog.require_framework(framework)?;
        let mut cursor = self.cursor(tenant, framework);
        let idx = cursor.previous();
        self.save_cursor(tenant, framework, cursor);
        Ok(Self::leaf_at(framework, idx))
    }

    /// Select a leaf directly
    pub fn jump_to(&self, tenant: TenantId, framework: &str, requirement: &str) -> GrcResult<RequirementId> {
        let catalog = self.catalog.view(tenant);
        let framework = catalog.require_framework(framework)?;
        let idx = framework
            .requirements
            .leaves()
            .position(|leaf| leaf.id.as_str() == requirement)
            .ok_or_else(|| GrcError::RequirementNotFound {
                framework: framework.id.to_string(),
                requirement: requirement.to_string(),
            })?;

        let mut cursor = self.cursor(tenant, framework);
        cursor.jump(idx);
        self.save_cursor(tenant, framework, cursor);
        Ok(RequirementId::new(requirement))
    }

    /// Enter the review step
    pub fn jump_to_review(&self, tenant: TenantId, framework: &str) -> GrcResult<()> {
        let catalog = self.catalog.view(tenant);
        let framework = catalog.require_framework(framework)?;
        let mut cursor = self.cursor(tenant, framework);
        cursor.review();
        self.save_cursor(tenant, framework, cursor);
        Ok(())
    }

    /// Place the cursor on the first untouched leaf, or review when none remain
    pub async fn resume(&self, tenant: TenantId, framework: &str) -> GrcResult<Option<RequirementId>> {
        let catalog = self.catalog.view(tenant);
        let framework = catalog.require_framework(framework)?;
        let records = self.records(tenant, framework).await?;

        let first_open = framework
            .requirements
            .leaves()
            .position(|leaf| !records.get(&leaf.id).is_some_and(|r| r.is_touched()));

        let mut cursor = self.cursor(tenant, framework);
        let idx = match first_open {
            Some(idx) => cursor.jump(idx),
            None => {
                cursor.review();
                None
            }
        };
        self.save_cursor(tenant, framework, cursor);
        Ok(Self::leaf_at(framework, idx))
    }

    /// Defer the current leaf and advance
    pub async fn skip(&self, tenant: TenantId, framework: &str) -> GrcResult<Option<RequirementId>> {
        let catalog = self.catalog.view(tenant);
        let framework = catalog.require_framework(framework)?;
        let mut cursor = self.cursor(tenant, framework);
        let current = Self::leaf_at(framework, cursor.current()).ok_or(GrcError::NoCurrentRequirement)?;

        let _guard = self.write_lock(tenant, &framework.id).await;
        let mut record = self.load_or_new(tenant, &framework.id, &current).await?;
        record.skipped = true;
        record.updated_at = chrono::Utc::now();
        self.put(record).await?;
        self.audit.log(
            tenant,
            AuditEventType::RequirementSkipped,
            format!("{}/{}", framework.id, current),
            "deferred",
        );

        let idx = cursor.next();
        self.save_cursor(tenant, framework, cursor);
        Ok(Self::leaf_at(framework, idx))
    }

    // =========================================================================
    // Saves
    // =========================================================================

    async fn load_or_new(
        &self,
        tenant: TenantId,
        framework: &FrameworkId,
        requirement: &RequirementId,
    ) -> GrcResult<RequirementAssessment> {
        let existing = with_timeout(
            self.timeout,
            "assessment.get",
            self.store.get(tenant, framework, requirement),
        )
        .await?;
        Ok(existing.unwrap_or_else(|| {
            RequirementAssessment::new(tenant, framework.clone(), requirement.clone())
        }))
    }

    async fn put(&self, record: RequirementAssessment) -> GrcResult<()> {
        with_timeout(self.timeout, "assessment.put", self.store.put(record)).await?;
        Ok(())
    }

    /// Save an assessor verdict; clears any skip
    pub async fn record_status(
        &self,
        tenant: TenantId,
        framework: &str,
        requirement: &str,
        status: AssessmentStatus,
        note: Option<String>,
    ) -> GrcResult<RequirementAssessment> {
        let catalog = self.catalog.view(tenant);
        let framework = catalog.require_framework(framework)?;
        let leaf = Self::leaf(framework, requirement)?;

        let _guard = self.write_lock(tenant, &framework.id).await;
        let mut record = self.load_or_new(tenant, &framework.id, &leaf.id).await?;
        record.status = status;
        record.skipped = false;
        record.updated_at = chrono::Utc::now();
        if let Some(note) = note.filter(|n| !n.trim().is_empty()) {
            record.push_note(note);
        }
        self.put(record.clone()).await?;

        self.audit.log(
            tenant,
            AuditEventType::StatusRecorded,
            format!("{}/{}", framework.id, leaf.id),
            format!("{:?}", status),
        );
        tracing::debug!(%tenant, framework = %framework.id, requirement = %leaf.id, ?status, "Recorded status");
        Ok(record)
    }

    /// Save a decision for an addressable leaf
    pub async fn record_addressable_decision(
        &self,
        tenant: TenantId,
        framework: &str,
        requirement: &str,
        choice: AddressableChoice,
        justification: &str,
    ) -> GrcResult<RequirementAssessment> {
        let catalog = self.catalog.view(tenant);
        let framework = catalog.require_framework(framework)?;
        let leaf = Self::leaf(framework, requirement)?;
        if leaf.required {
            return Err(GrcError::AddressableDecisionNotAllowed(leaf.id.to_string()));
        }

        let justification = justification.trim();
        let needs_justification = matches!(
            choice,
            AddressableChoice::AlternativeMeasure | AddressableChoice::NotReasonable
        );
        if needs_justification && justification.is_empty() {
            return Err(GrcError::InvalidInput(format!(
                "{:?} on {} requires a justification",
                choice, leaf.id
            )));
        }

        let decision = AddressableDecision::new(choice, justification);
        let _guard = self.write_lock(tenant, &framework.id).await;
        let mut record = self.load_or_new(tenant, &framework.id, &leaf.id).await?;
        record.status = decision.implied_status();
        record.skipped = false;
        record.addressable_decision = Some(decision);
        record.updated_at = chrono::Utc::now();
        self.put(record.clone()).await?;

        self.audit.log(
            tenant,
            AuditEventType::AddressableDecisionRecorded,
            format!("{}/{}", framework.id, leaf.id),
            format!("{:?}: {}", choice, justification),
        );
        Ok(record)
    }

    /// Attach an evidence reference; attaching the same id twice is a no-op
    pub async fn attach_evidence(
        &self,
        tenant: TenantId,
        framework: &str,
        requirement: &str,
        evidence: EvidenceRef,
    ) -> GrcResult<RequirementAssessment> {
        if evidence.id.trim().is_empty() {
            return Err(GrcError::InvalidInput("evidence id must not be empty".into()));
        }
        let catalog = self.catalog.view(tenant);
        let framework = catalog.require_framework(framework)?;
        let leaf = Self::leaf(framework, requirement)?;

        let _guard = self.write_lock(tenant, &framework.id).await;
        let mut record = self.load_or_new(tenant, &framework.id, &leaf.id).await?;
        if record.evidence.iter().any(|e| e.id == evidence.id) {
            return Ok(record);
        }

        let target = format!("{}/{}", framework.id, leaf.id);
        let details = evidence.id.clone();
        record.evidence.push(evidence);
        record.updated_at = chrono::Utc::now();
        self.put(record.clone()).await?;

        self.audit
            .log(tenant, AuditEventType::EvidenceAttached, target, details);
        Ok(record)
    }

    /// Detach an evidence reference; `false` when it was not attached
    pub async fn detach_evidence(
        &self,
        tenant: TenantId,
        framework: &str,
        requirement: &str,
        evidence_id: &str,
    ) -> GrcResult<bool> {
        let catalog = self.catalog.view(tenant);
        let framework = catalog.require_framework(framework)?;
        let leaf = Self::leaf(framework, requirement)?;

        let _guard = self.write_lock(tenant, &framework.id).await;
        let existing = with_timeout(
            self.timeout,
            "assessment.get",
            self.store.get(tenant, &framework.id, &leaf.id),
        )
        .await?;
        let Some(mut record) = existing else {
            return Ok(false);
        };

        let before = record.evidence.len();
        record.evidence.retain(|e| e.id != evidence_id);
        if record.evidence.len() == before {
            return Ok(false);
        }
        record.updated_at = chrono::Utc::now();
        self.put(record).await?;

        self.audit.log(
            tenant,
            AuditEventType::EvidenceDetached,
            format!("{}/{}", framework.id, leaf.id),
            evidence_id,
        );
        Ok(true)
    }

    /// Append to a leaf's note log
    pub async fn add_note(
        &self,
        tenant: TenantId,
        framework: &str,
        requirement: &str,
        text: &str,
    ) -> GrcResult<RequirementAssessment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(GrcError::InvalidInput("note must not be empty".into()));
        }
        let catalog = self.catalog.view(tenant);
        let framework = catalog.require_framework(framework)?;
        let leaf = Self::leaf(framework, requirement)?;

        let _guard = self.write_lock(tenant, &framework.id).await;
        let mut record = self.load_or_new(tenant, &framework.id, &leaf.id).await?;
        record.push_note(text);
        self.put(record.clone()).await?;

        self.audit.log(
            tenant,
            AuditEventType::NoteAdded,
            format!("{}/{}", framework.id, leaf.id),
            text,
        );
        Ok(record)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Recorded assessments for current leaves; orphaned rows are dropped
    pub async fn records(&self, tenant: TenantId, framework: &Framework) -> GrcResult<RecordMap> {
        let rows = with_timeout(
            self.timeout,
            "assessment.all_for_framework",
            self.store.all_for_framework(tenant, &framework.id),
        )
        .await?;

        let mut records = RecordMap::with_capacity(rows.len());
        for row in rows {
            if !framework.requirements.is_leaf(row.requirement_id.as_str()) {
                tracing::warn!(
                    %tenant,
                    framework = %framework.id,
                    requirement = %row.requirement_id,
                    "Ignoring orphaned assessment record"
                );
                continue;
            }
            records.insert(row.requirement_id.clone(), row);
        }
        Ok(records)
    }

    /// Touched leaves over total leaves
    pub async fn progress(&self, tenant: TenantId, framework: &str) -> GrcResult<Progress> {
        let catalog = self.catalog.view(tenant);
        let framework = catalog.require_framework(framework)?;
        let records = self.records(tenant, framework).await?;
        Ok(summary::progress(framework, &records))
    }

    /// Status counts, progress, compliance percentage and critical gaps
    pub async fn summary(&self, tenant: TenantId, framework: &str) -> GrcResult<AssessmentSummary> {
        let catalog = self.catalog.view(tenant);
        let framework = catalog.require_framework(framework)?;
        let records = self.records(tenant, framework).await?;
        Ok(summary::summarize(framework, &records, self.gap_cap))
    }

    /// Rollups for every grouping node
    pub async fn group_rollups(&self, tenant: TenantId, framework: &str) -> GrcResult<Vec<GroupRollup>> {
        let catalog = self.catalog.view(tenant);
        let framework = catalog.require_framework(framework)?;
        let records = self.records(tenant, framework).await?;
        Ok(summary::group_rollups(framework, &records))
    }

    /// Views of every leaf with implied and recorded status
    pub async fn requirement_views(
        &self,
        tenant: TenantId,
        framework: &str,
        sheet: &AnswerSheet,
    ) -> GrcResult<Vec<RequirementView>> {
        let catalog = self.catalog.view(tenant);
        let framework = catalog.require_framework(framework)?;
        let records = self.records(tenant, framework).await?;

        Ok(framework
            .requirements
            .leaves()
            .map(|leaf| {
                let score = ScoringEngine::requirement_score(&catalog, sheet, framework.id.as_str(), leaf.id.as_str());
                let record = records.get(&leaf.id);
                RequirementView {
                    requirement_id: leaf.id.clone(),
                    title: leaf.title.clone(),
                    level: leaf.level,
                    required: leaf.required,
                    mapped_controls: score.mapped_controls,
                    score: score.score,
                    implied: score.implied,
                    recorded: record.map(|r| r.status),
                    skipped: record.is_some_and(|r| r.skipped),
                }
            })
            .collect())
    }

    /// Delete every record for the pair and clear the session
    pub async fn reset(&self, tenant: TenantId, framework: &str) -> GrcResult<usize> {
        let catalog = self.catalog.view(tenant);
        let framework = catalog.require_framework(framework)?;
        let _guard = self.write_lock(tenant, &framework.id).await;
        let removed = with_timeout(
            self.timeout,
            "assessment.delete_all",
            self.store.delete_all(tenant, &framework.id),
        )
        .await?;
        self.sessions.remove(&(tenant, framework.id.clone()));

        self.audit.log(
            tenant,
            AuditEventType::AssessmentReset,
            framework.id.to_string(),
            format!("{} records removed", removed),
        );
        tracing::info!(%tenant, framework = %framework.id, removed, "Reset assessment");
        Ok(removed)
    }
}
