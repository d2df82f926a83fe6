//! Trend & Gap Analytics
//!
//! Snapshot construction and verification, baseline selection for score
//! deltas, and gap analysis. Store round-trips happen in the engine; the
//! functions here are pure.

use crate::catalog::{Control, RiskLevel, TenantCatalog};
use crate::scoring::{AnswerSheet, ScoreBoard};
use chrono::{DateTime, Days, Duration, TimeZone, Utc};
use grc_common::{Answer, ComplianceSnapshot, ControlId, DomainId, FrameworkId, TenantId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Windows reported by `trend_deltas`
pub const DELTA_WINDOWS: [u32; 3] = [7, 30, 90];

/// Build an immutable snapshot from a freshly computed board
pub fn build_snapshot(tenant: TenantId, board: &ScoreBoard, taken_at: DateTime<Utc>) -> ComplianceSnapshot {
    let mut snapshot = ComplianceSnapshot {
        id: Uuid::new_v4(),
        tenant_id: tenant,
        taken_at,
        overall_score: board.global,
        answer_counts: board.answer_counts,
        framework_scores: board.framework_scores.clone(),
        domain_scores: board.domain_scores.clone(),
        digest: String::new(),
    };
    snapshot.digest = snapshot_digest(&snapshot);
    snapshot
}

/// SHA-256 over the snapshot content, hex encoded
pub fn snapshot_digest(snapshot: &ComplianceSnapshot) -> String {
    let mut hasher = Sha256::new();
    hasher.update(snapshot.id.as_bytes());
    hasher.update(snapshot.tenant_id.as_bytes());
    hasher.update(snapshot.taken_at.to_rfc3339().as_bytes());
    hasher.update(snapshot.overall_score.to_le_bytes());

    let counts = &snapshot.answer_counts;
    for count in [counts.yes, counts.partial, counts.no, counts.not_applicable, counts.unanswered] {
        hasher.update((count as u64).to_le_bytes());
    }
    for (id, score) in &snapshot.framework_scores {
        hasher.update(b"f:");
        hasher.update(id.as_str().as_bytes());
        hasher.update(score.to_le_bytes());
    }
    for (id, score) in &snapshot.domain_scores {
        hasher.update(b"d:");
        hasher.update(id.as_str().as_bytes());
        hasher.update(score.to_le_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Whether the stored digest still matches the content
pub fn verify_snapshot(snapshot: &ComplianceSnapshot) -> bool {
    snapshot_digest(snapshot) == snapshot.digest
}

/// Latest instant on the calendar day `days_ago` days before `now`
pub fn baseline_cutoff(now: DateTime<Utc>, days_ago: u32) -> DateTime<Utc> {
    let day = now
        .date_naive()
        .checked_sub_days(Days::new(u64::from(days_ago)))
        .unwrap_or(chrono::NaiveDate::MIN);
    let start_of_next = day
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    start_of_next - Duration::nanoseconds(1)
}

/// Snapshot with the latest date at or before the cutoff
pub fn select_baseline(snapshots: &[ComplianceSnapshot], cutoff: DateTime<Utc>) -> Option<&ComplianceSnapshot> {
    snapshots
        .iter()
        .filter(|s| s.taken_at <= cutoff)
        .max_by_key(|s| s.taken_at)
}

/// One point on a score trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub taken_at: DateTime<Utc>,
    pub score: u32,
}

impl From<&ComplianceSnapshot> for TrendPoint {
    fn from(snapshot: &ComplianceSnapshot) -> Self {
        Self {
            taken_at: snapshot.taken_at,
            score: snapshot.overall_score,
        }
    }
}

/// Score change against a past baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDelta {
    pub days: u32,
    /// `None` when no snapshot exists at or before the cutoff
    pub delta: Option<i32>,
}

/// Unmet control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapItem {
    pub control_id: ControlId,
    pub title: String,
    pub domain: DomainId,
    pub risk_level: RiskLevel,
    pub answer: Answer,
    pub frameworks: Vec<FrameworkId>,
    pub remediation_hint: String,
}

impl GapItem {
    fn new(control: &Control, answer: Answer) -> Self {
        Self {
            control_id: control.id.clone(),
            title: control.title.clone(),
            domain: control.domain.clone(),
            risk_level: control.risk_level,
            answer,
            frameworks: control.frameworks().into_iter().cloned().collect(),
            remediation_hint: control.remediation_hint.clone(),
        }
    }
}

/// Unmet controls bucketed by risk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysis {
    pub critical: Vec<GapItem>,
    pub high: Vec<GapItem>,
    /// Medium and low risk
    pub medium: Vec<GapItem>,
    pub by_framework: BTreeMap<FrameworkId, usize>,
    pub by_domain: BTreeMap<DomainId, usize>,
}

impl GapAnalysis {
    /// Total unmet controls
    pub fn total(&self) -> usize {
        self.critical.len() + self.high.len() + self.medium.len()
    }
}

/// Controls answered "no" or never answered, bucketed by risk level
pub fn gap_analysis(catalog: &TenantCatalog, sheet: &AnswerSheet) -> GapAnalysis {
    let mut analysis = GapAnalysis::default();

    for control in catalog.controls() {
        let answer = sheet.answer(control.id.as_str());
        if !answer.is_unmet() {
            continue;
        }

        let item = GapItem::new(control, answer);
        for framework in &item.frameworks {
            *analysis.by_framework.entry(framework.clone()).or_default() += 1;
        }
        *analysis.by_domain.entry(control.domain.clone()).or_default() += 1;

        match control.risk_level {
            RiskLevel::Critical => analysis.critical.push(item),
            RiskLevel::High => analysis.high.push(item),
            RiskLevel::Medium | RiskLevel::Low => analysis.medium.push(item),
        }
    }

    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CatalogStore};
    use crate::scoring::ScoringEngine;

    fn snapshot_at(taken_at: DateTime<Utc>, score: u32) -> ComplianceSnapshot {
        let board = ScoreBoard {
            global: score,
            ..Default::default()
        };
        build_snapshot(Uuid::new_v4(), &board, taken_at)
    }

    #[test]
    fn test_digest_detects_tampering() {
        let catalog = CatalogStore::new(Catalog::builtin().unwrap()).view(Uuid::new_v4());
        let board = ScoringEngine::score_board(&catalog, &AnswerSheet::default());
        let mut snapshot = build_snapshot(Uuid::new_v4(), &board, Utc::now());
        assert!(verify_snapshot(&snapshot));

        snapshot.overall_score += 1;
        assert!(!verify_snapshot(&snapshot));
    }

    #[test]
    fn test_baseline_cutoff_is_end_of_day() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 9, 30, 0).unwrap();
        let cutoff = baseline_cutoff(now, 30);
        assert_eq!(cutoff.date_naive(), chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert!(cutoff < Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap());
        assert!(cutoff > Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap());
    }

    #[test]
    fn test_select_baseline() {
        let now = Utc::now();
        let snapshots = vec![
            snapshot_at(now - Duration::days(45), 40),
            snapshot_at(now - Duration::days(5), 70),
        ];

        let baseline = select_baseline(&snapshots, baseline_cutoff(now, 30)).unwrap();
        assert_eq!(baseline.overall_score, 40);
        assert_eq!(select_baseline(&snapshots, baseline_cutoff(now, 60)), None);
        assert_eq!(select_baseline(&snapshots, baseline_cutoff(now, 0)).unwrap().overall_score, 70);
    }

    #[test]
    fn test_same_day_snapshot_counts() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 9, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 3, 24, 23, 0, 0).unwrap();
        let snapshots = vec![snapshot_at(late, 55)];
        assert!(select_baseline(&snapshots, baseline_cutoff(now, 7)).is_some());
        assert!(select_baseline(&snapshots, baseline_cutoff(now, 8)).is_none());
    }

    #[test]
    fn test_gap_analysis_buckets() {
        let catalog = CatalogStore::new(Catalog::builtin().unwrap()).view(Uuid::new_v4());
        let sheet = AnswerSheet::from_answers([
            ("AC-01", Answer::No),
            ("AC-02", Answer::Yes),
            ("HR-02", Answer::No),
            ("OP-04", Answer::NotApplicable),
        ]);

        let analysis = gap_analysis(&catalog, &sheet);
        // Everything but AC-02 and OP-04 is unmet
        assert_eq!(analysis.total(), catalog.control_count() - 2);
        assert!(analysis.critical.iter().any(|g| g.control_id.as_str() == "AC-01"));
        assert!(analysis.medium.iter().any(|g| g.control_id.as_str() == "HR-02"));
        assert!(analysis.high.iter().all(|g| g.control_id.as_str() != "AC-02"));
        assert_eq!(analysis.by_domain.values().sum::<usize>(), analysis.total());
        assert!(analysis.by_framework.contains_key("hipaa"));
    }

    #[test]
    fn test_gap_analysis_all_met() {
        let catalog = CatalogStore::new(Catalog::builtin().unwrap()).view(Uuid::new_v4());
        let sheet = AnswerSheet::from_answers(catalog.controls().map(|c| (c.id.clone(), Answer::Yes)));
        let analysis = gap_analysis(&catalog, &sheet);
        assert_eq!(analysis.total(), 0);
        assert!(analysis.by_framework.is_empty());
    }
}
