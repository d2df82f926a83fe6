//! Compliance Reporting
//!
//! Plain serde structures for external document generators.

use crate::analytics::{GapAnalysis, ScoreDelta};
use crate::assessment::{AssessmentSummary, GroupRollup};
use crate::audit::{ExportFormat, IntegrityResult};
use crate::mapping::CoverageStats;
use crate::scoring::{CriticalGap, RequirementView};
use crate::ComplianceEngine;
use chrono::{DateTime, Utc};
use grc_common::{AnswerCounts, DomainId, FrameworkId, GrcResult, TenantId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Report generator
pub struct ReportGenerator;

impl ReportGenerator {
    /// Generate executive summary
    pub async fn executive_summary(engine: &ComplianceEngine, tenant: TenantId) -> ExecutiveSummary {
        let board = engine.score_board(tenant).await;

        let framework_scores = engine
            .frameworks()
            .into_iter()
            .map(|info| FrameworkScore {
                score: board.framework_scores.get(&info.id).copied().unwrap_or(0),
                coverage: engine.coverage(tenant, info.id.as_str()),
                framework_id: info.id,
                name: info.name,
            })
            .collect();

        ExecutiveSummary {
            tenant_id: tenant,
            overall_score: board.global,
            answer_counts: board.answer_counts,
            framework_scores,
            domain_scores: board.domain_scores.clone(),
            trend: engine.trend_deltas(tenant).await,
            critical_gaps: engine.critical_gaps(tenant).await,
            gap_analysis: engine.gap_analysis(tenant).await,
            generated_at: Utc::now(),
        }
    }

    /// Generate a single-framework report
    pub async fn framework_report(
        engine: &ComplianceEngine,
        tenant: TenantId,
        framework: &str,
    ) -> GrcResult<FrameworkReport> {
        let catalog = engine.catalog.view(tenant);
        let info = catalog.require_framework(framework)?.info();

        Ok(FrameworkReport {
            tenant_id: tenant,
            score: engine.framework_score(tenant, framework).await,
            coverage: catalog.index().coverage(framework),
            requirements: engine.requirement_views(tenant, framework).await?,
            summary: engine.assessments.summary(tenant, framework).await?,
            groups: engine.assessments.group_rollups(tenant, framework).await?,
            framework_id: info.id,
            name: info.full_name,
            generated_at: Utc::now(),
        })
    }

    /// Framework report bundled with the tenant's verified audit trail
    pub async fn auditor_package(
        engine: &ComplianceEngine,
        tenant: TenantId,
        framework: &str,
    ) -> GrcResult<AuditorPackage> {
        let report = Self::framework_report(engine, tenant, framework).await?;
        let integrity = engine.audit.verify_integrity(tenant);
        if !integrity.valid {
            tracing::warn!(%tenant, error = ?integrity.error, "Audit chain failed verification");
        }

        Ok(AuditorPackage {
            report,
            audit_log: engine.audit.export(tenant, ExportFormat::Json)?,
            audit_event_count: engine.audit.len(tenant),
            integrity,
            generated_at: Utc::now(),
        })
    }
}

/// Per-framework line of the executive summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkScore {
    pub framework_id: FrameworkId,
    pub name: String,
    pub score: u32,
    pub coverage: CoverageStats,
}

/// Executive summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub tenant_id: TenantId,
    pub overall_score: u32,
    pub answer_counts: AnswerCounts,
    pub framework_scores: Vec<FrameworkScore>,
    pub domain_scores: BTreeMap<DomainId, u32>,
    pub trend: Vec<ScoreDelta>,
    pub critical_gaps: Vec<CriticalGap>,
    pub gap_analysis: GapAnalysis,
    pub generated_at: DateTime<Utc>,
}

/// Framework report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkReport {
    pub tenant_id: TenantId,
    pub framework_id: FrameworkId,
    pub name: String,
    pub score: u32,
    pub coverage: CoverageStats,
    pub requirements: Vec<RequirementView>,
    pub summary: AssessmentSummary,
    pub groups: Vec<GroupRollup>,
    pub generated_at: DateTime<Utc>,
}

/// Auditor package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditorPackage {
    pub report: FrameworkReport,
    /// JSON export of the audit chain
    pub audit_log: String,
    pub audit_event_count: usize,
    pub integrity: IntegrityResult,
    pub generated_at: DateTime<Utc>,
}
