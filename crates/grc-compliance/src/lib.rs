//! OpenGRC Compliance Engine
//!
//! Compliance scoring and requirement mapping for multi-tenant GRC
//! assessments.
//!
//! # Built-in Frameworks
//!
//! - **SOC 2**: Trust Services Criteria
//! - **ISO 27001:2022**: Annex A controls
//! - **HIPAA**: Security Rule safeguards (required and addressable)
//! - **PCI-DSS 4.0**: Payment card data security
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                        COMPLIANCE ENGINE                              │
//! │                                                                       │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────────────┐   │
//! │  │   Catalog    │──▶│   Mapping    │──▶│      Scoring Engine      │   │
//! │  │ base+overlay │   │    Index     │   │ control/domain/framework │   │
//! │  └──────────────┘   └──────┬───────┘   └────────────┬─────────────┘   │
//! │                            │                        │                 │
//! │  ┌─────────────────────────▼──────┐   ┌─────────────▼─────────────┐   │
//! │  │  Requirement Assessment        │   │  Trend & Gap Analytics    │   │
//! │  │  navigate | skip | save | reset│   │  snapshots | deltas | gaps│   │
//! │  └────────────────────────────────┘   └───────────────────────────┘   │
//! │                                                                       │
//! │  Audit Trail (hash chain)  ·  Score Cache (moka)  ·  Reporting Feed   │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```

pub mod analytics;
pub mod assessment;
pub mod audit;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod frameworks;
pub mod mapping;
pub mod reporting;
pub mod scoring;

use chrono::{DateTime, Utc};
use grc_common::{
    with_timeout, Answer, AssessmentStore, ComplianceSnapshot, ControlResponse, FrameworkId,
    GrcError, GrcResult, InMemoryAssessmentStore, InMemoryResponseStore, InMemorySnapshotStore,
    RequirementId, ResponseStore, SnapshotStore, TenantId,
};
use std::sync::Arc;

pub use analytics::{GapAnalysis, GapItem, ScoreDelta, TrendPoint};
pub use assessment::{AssessmentService, AssessmentSummary, Position, Progress};
pub use audit::{AuditEvent, AuditEventType, AuditFilter, AuditTrail, ExportFormat};
pub use cache::ScoreCache;
pub use catalog::{Catalog, CatalogStore, Control, CustomControlDraft, Domain, FrameworkInfo, RiskLevel, TenantCatalog};
pub use config::EngineConfig;
pub use mapping::{CoverageStats, MappingIndex};
pub use scoring::{AnswerSheet, CriticalGap, ImpliedStatus, RequirementView, ScoreBoard, ScoringEngine};

/// Persistence backends for tenant-owned records
#[derive(Clone)]
pub struct ComplianceStores {
    pub responses: Arc<dyn ResponseStore>,
    pub assessments: Arc<dyn AssessmentStore>,
    pub snapshots: Arc<dyn SnapshotStore>,
}

impl ComplianceStores {
    /// In-memory stores for tests and development
    pub fn in_memory() -> Self {
        Self {
            responses: Arc::new(InMemoryResponseStore::new()),
            assessments: Arc::new(InMemoryAssessmentStore::new()),
            snapshots: Arc::new(InMemorySnapshotStore::new()),
        }
    }
}

/// Main Compliance Engine
pub struct ComplianceEngine {
    /// Shared catalog with tenant overlays
    pub catalog: Arc<CatalogStore>,
    /// Requirement assessment workflow
    pub assessments: Arc<AssessmentService>,
    /// Audit trail
    pub audit: Arc<AuditTrail>,
    /// Score cache
    pub cache: Arc<ScoreCache>,
    responses: Arc<dyn ResponseStore>,
    snapshots: Arc<dyn SnapshotStore>,
    config: EngineConfig,
}

impl ComplianceEngine {
    /// Create engine over a catalog and stores
    pub fn new(catalog: Catalog, stores: ComplianceStores, config: EngineConfig) -> GrcResult<Self> {
        config.validate()?;

        let catalog = Arc::new(CatalogStore::new(catalog));
        let audit = Arc::new(AuditTrail::new());
        let assessments = Arc::new(AssessmentService::new(
            catalog.clone(),
            stores.assessments,
            audit.clone(),
            config.store_timeout(),
            config.summary_gap_cap,
        ));

        Ok(Self {
            catalog,
            assessments,
            audit,
            cache: Arc::new(ScoreCache::new(&config.cache)),
            responses: stores.responses,
            snapshots: stores.snapshots,
            config,
        })
    }

    /// Create engine from configuration; falls back to the built-in catalog
    pub fn from_config(config: EngineConfig, stores: ComplianceStores) -> GrcResult<Self> {
        let catalog = match &config.catalog_path {
            Some(path) => Catalog::load(path)?,
            None => Catalog::builtin()?,
        };
        Self::new(catalog, stores, config)
    }

    /// Built-in catalog, in-memory stores, default configuration
    pub fn in_memory() -> GrcResult<Self> {
        Self::new(Catalog::builtin()?, ComplianceStores::in_memory(), EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// All controls visible to the tenant
    pub fn controls(&self, tenant: TenantId) -> Vec<Control> {
        self.catalog.view(tenant).controls().cloned().collect()
    }

    /// Controls in one domain
    pub fn controls_in_domain(&self, tenant: TenantId, domain: &str) -> Vec<Control> {
        self.catalog
            .view(tenant)
            .controls_in_domain(domain)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Domains; includes the custom domain once the tenant has custom controls
    pub fn domains(&self, tenant: TenantId) -> Vec<Domain> {
        self.catalog.view(tenant).domains()
    }

    /// Framework listing
    pub fn frameworks(&self) -> Vec<FrameworkInfo> {
        self.catalog.view(TenantId::nil()).framework_infos()
    }

    /// Coverage statistics for a framework, tenant overlay included
    pub fn coverage(&self, tenant: TenantId, framework: &str) -> CoverageStats {
        self.catalog.view(tenant).index().coverage(framework)
    }

    /// Leaf requirements a control satisfies
    pub fn requirements_for_control(&self, tenant: TenantId, control: &str) -> Vec<(FrameworkId, RequirementId)> {
        self.catalog
            .view(tenant)
            .index()
            .requirements_for(control)
            .to_vec()
    }

    /// Create a custom control in the organization-specific domain
    pub fn add_custom_control(&self, tenant: TenantId, draft: CustomControlDraft) -> GrcResult<Control> {
        let control = self.catalog.add_custom(tenant, draft)?;
        self.cache.invalidate(tenant);
        self.audit.log(
            tenant,
            AuditEventType::CustomControlAdded,
            control.id.to_string(),
            control.title.clone(),
        );
        Ok(control)
    }

    /// Delete a custom control; its stored answers become orphans
    pub fn remove_custom_control(&self, tenant: TenantId, control_id: &str) -> GrcResult<Control> {
        let control = self.catalog.remove_custom(tenant, control_id)?;
        self.cache.invalidate(tenant);
        self.audit.log(
            tenant,
            AuditEventType::CustomControlRemoved,
            control.id.to_string(),
            control.title.clone(),
        );
        Ok(control)
    }

    /// Swap the base catalog and drop every derived cache
    pub fn reload_catalog(&self, catalog: Catalog) {
        self.catalog.reload(catalog);
        self.cache.invalidate_all();
        tracing::info!("Reloaded catalog v{}", self.catalog.version());
    }

    // =========================================================================
    // Control responses
    // =========================================================================

    /// Record the tenant's answer to a control
    pub async fn answer_control(
        &self,
        tenant: TenantId,
        control_id: &str,
        answer: Answer,
        notes: &str,
        remediation_plan: Option<String>,
    ) -> GrcResult<ControlResponse> {
        let catalog = self.catalog.view(tenant);
        let control = catalog
            .control(control_id)
            .ok_or_else(|| GrcError::ControlNotFound(control_id.to_string()))?;

        let mut response = ControlResponse::new(tenant, control.id.clone(), answer);
        response.notes = notes.to_string();
        if answer == Answer::No {
            response.remediation_plan = remediation_plan.filter(|p| !p.trim().is_empty());
        }

        with_timeout(
            self.config.store_timeout(),
            "response.put",
            self.responses.put(response.clone()),
        )
        .await?;
        self.cache.invalidate(tenant);
        self.audit.log(
            tenant,
            AuditEventType::ControlAnswered,
            control.id.to_string(),
            format!("{:?}", answer),
        );
        Ok(response)
    }

    /// Stored response for a control
    pub async fn response(&self, tenant: TenantId, control_id: &str) -> GrcResult<Option<ControlResponse>> {
        let response = with_timeout(
            self.config.store_timeout(),
            "response.get",
            self.responses.get(tenant, &control_id.into()),
        )
        .await?;
        Ok(response)
    }

    async fn answer_sheet(&self, tenant: TenantId, catalog: &TenantCatalog) -> GrcResult<AnswerSheet> {
        let responses = with_timeout(
            self.config.store_timeout(),
            "response.all_for_tenant",
            self.responses.all_for_tenant(tenant),
        )
        .await?;
        Ok(AnswerSheet::from_responses(catalog, responses))
    }

    /// Answer sheet, or an empty one when the store is unavailable
    async fn answer_sheet_or_empty(&self, tenant: TenantId, catalog: &TenantCatalog) -> Option<AnswerSheet> {
        match self.answer_sheet(tenant, catalog).await {
            Ok(sheet) => Some(sheet),
            Err(e) => {
                tracing::warn!(%tenant, error = %e, "Response store unavailable, returning empty result");
                None
            }
        }
    }

    // =========================================================================
    // Scoring
    // =========================================================================

    /// Scores at every aggregate level (cached per tenant)
    pub async fn score_board(&self, tenant: TenantId) -> Arc<ScoreBoard> {
        match self.live_board(tenant).await {
            Some(board) => board,
            None => Arc::new(ScoreBoard::default()),
        }
    }

    /// Score board from current answers; `None` when the response store is unavailable
    async fn live_board(&self, tenant: TenantId) -> Option<Arc<ScoreBoard>> {
        let generation = self.cache.generation(tenant);
        if let Some(board) = self.cache.get(tenant, generation) {
            return Some(board);
        }

        let catalog = self.catalog.view(tenant);
        let sheet = self.answer_sheet_or_empty(tenant, &catalog).await?;

        let board = Arc::new(ScoringEngine::score_board(&catalog, &sheet));
        self.cache.insert(tenant, generation, board.clone());
        Some(board)
    }

    /// Global score
    pub async fn global_score(&self, tenant: TenantId) -> u32 {
        self.score_board(tenant).await.global
    }

    /// Domain score, 0 for unknown domains
    pub async fn domain_score(&self, tenant: TenantId, domain: &str) -> u32 {
        self.score_board(tenant)
            .await
            .domain_scores
            .get(domain)
            .copied()
            .unwrap_or(0)
    }

    /// Framework score, 0 for unknown frameworks
    pub async fn framework_score(&self, tenant: TenantId, framework: &str) -> u32 {
        self.score_board(tenant)
            .await
            .framework_scores
            .get(framework)
            .copied()
            .unwrap_or(0)
    }

    /// Critical/high controls answered "no", capped by configuration
    pub async fn critical_gaps(&self, tenant: TenantId) -> Vec<CriticalGap> {
        let catalog = self.catalog.view(tenant);
        match self.answer_sheet_or_empty(tenant, &catalog).await {
            Some(sheet) => ScoringEngine::critical_gaps(&catalog, &sheet, self.config.critical_gap_limit),
            None => Vec::new(),
        }
    }

    /// Every leaf of a framework with implied and recorded status
    pub async fn requirement_views(&self, tenant: TenantId, framework: &str) -> GrcResult<Vec<RequirementView>> {
        let catalog = self.catalog.view(tenant);
        let sheet = self.answer_sheet(tenant, &catalog).await?;
        self.assessments
            .requirement_views(tenant, framework, &sheet)
            .await
    }

    // =========================================================================
    // Trend & gap analytics
    // =========================================================================

    /// Recompute scores from current answers and store a snapshot
    pub async fn create_snapshot(&self, tenant: TenantId) -> GrcResult<ComplianceSnapshot> {
        let catalog = self.catalog.view(tenant);
        let sheet = self.answer_sheet(tenant, &catalog).await?;
        let board = ScoringEngine::score_board(&catalog, &sheet);
        let snapshot = analytics::build_snapshot(tenant, &board, Utc::now());

        with_timeout(
            self.config.store_timeout(),
            "snapshot.insert",
            self.snapshots.insert(snapshot.clone()),
        )
        .await?;
        self.audit.log(
            tenant,
            AuditEventType::SnapshotCreated,
            snapshot.id.to_string(),
            format!("overall {}", snapshot.overall_score),
        );
        tracing::info!(%tenant, snapshot = %snapshot.id, score = snapshot.overall_score, "Created snapshot");
        Ok(snapshot)
    }

    async fn snapshots_until(
        &self,
        tenant: TenantId,
        from: Option<DateTime<Utc>>,
        until: DateTime<Utc>,
    ) -> Option<Vec<ComplianceSnapshot>> {
        let result = with_timeout(
            self.config.store_timeout(),
            "snapshot.range",
            self.snapshots.range(tenant, from, until),
        )
        .await;
        match result {
            Ok(snapshots) => Some(snapshots),
            Err(e) => {
                tracing::warn!(%tenant, error = %e, "Snapshot store unavailable, returning empty result");
                None
            }
        }
    }

    /// Overall score over the last `days` days, oldest first
    pub async fn trend(&self, tenant: TenantId, days: u32) -> Vec<TrendPoint> {
        let now = Utc::now();
        let from = now - chrono::Duration::days(i64::from(days));
        self.snapshots_until(tenant, Some(from), now)
            .await
            .unwrap_or_default()
            .iter()
            .map(TrendPoint::from)
            .collect()
    }

    /// Live score minus the latest snapshot dated at or before `today - days_ago`
    pub async fn score_delta(&self, tenant: TenantId, days_ago: u32) -> Option<i32> {
        self.score_delta_at(tenant, days_ago, Utc::now()).await
    }

    /// `score_delta` evaluated at an explicit instant
    pub async fn score_delta_at(&self, tenant: TenantId, days_ago: u32, now: DateTime<Utc>) -> Option<i32> {
        let cutoff = analytics::baseline_cutoff(now, days_ago);
        let snapshots = self.snapshots_until(tenant, None, cutoff).await?;
        let baseline = analytics::select_baseline(&snapshots, cutoff)?;
        let current = self.live_board(tenant).await?.global;
        Some(current as i32 - baseline.overall_score as i32)
    }

    /// Deltas over the 7, 30 and 90 day windows
    pub async fn trend_deltas(&self, tenant: TenantId) -> Vec<ScoreDelta> {
        let now = Utc::now();
        let mut deltas = Vec::with_capacity(analytics::DELTA_WINDOWS.len());
        for days in analytics::DELTA_WINDOWS {
            deltas.push(ScoreDelta {
                days,
                delta: self.score_delta_at(tenant, days, now).await,
            });
        }
        deltas
    }

    /// Unmet controls bucketed by risk with framework and domain counts
    pub async fn gap_analysis(&self, tenant: TenantId) -> GapAnalysis {
        let catalog = self.catalog.view(tenant);
        match self.answer_sheet_or_empty(tenant, &catalog).await {
            Some(sheet) => analytics::gap_analysis(&catalog, &sheet),
            None => GapAnalysis::default(),
        }
    }
}
