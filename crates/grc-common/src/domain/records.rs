//! Tenant-owned records
//!
//! Every record carries its tenant id and is only ever read or written
//! through a tenant-scoped store query.

use super::value_objects::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Anything that contributes a weight to a compliance percentage.
///
/// `None` means the item is excluded from both numerator and denominator.
pub trait Weighted {
    /// Contribution in `[0.0, 1.0]`, or `None` when not applicable
    fn weight(&self) -> Option<f64>;
}

/// Answer to a control's assessment question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    Yes,
    No,
    Partial,
    NotApplicable,
    #[default]
    Unanswered,
}

impl Answer {
    /// Whether the tenant gave any answer at all
    pub fn is_answered(&self) -> bool {
        !matches!(self, Self::Unanswered)
    }

    /// Unmet for gap purposes: explicitly "no" or never answered
    pub fn is_unmet(&self) -> bool {
        matches!(self, Self::No | Self::Unanswered)
    }
}

impl Weighted for Answer {
    fn weight(&self) -> Option<f64> {
        match self {
            Self::Yes => Some(1.0),
            Self::Partial => Some(0.5),
            Self::No | Self::Unanswered => Some(0.0),
            Self::NotApplicable => None,
        }
    }
}

/// Control Response - one per (tenant, control)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub tenant_id: TenantId,
    pub control_id: ControlId,
    pub answer: Answer,
    pub notes: String,
    /// Only kept when `answer` is `No`
    pub remediation_plan: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ControlResponse {
    /// Create response stamped now
    pub fn new(tenant_id: TenantId, control_id: ControlId, answer: Answer) -> Self {
        Self {
            tenant_id,
            control_id,
            answer,
            notes: String::new(),
            remediation_plan: None,
            updated_at: Utc::now(),
        }
    }
}

/// Requirement-level assessment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    #[default]
    NotAssessed,
    Compliant,
    PartiallyCompliant,
    NonCompliant,
    NotApplicable,
}

impl AssessmentStatus {
    /// All statuses, in reporting order
    pub const ALL: [AssessmentStatus; 5] = [
        Self::NotAssessed,
        Self::Compliant,
        Self::PartiallyCompliant,
        Self::NonCompliant,
        Self::NotApplicable,
    ];

    /// A final verdict (anything other than not assessed)
    pub fn is_verdict(&self) -> bool {
        !matches!(self, Self::NotAssessed)
    }
}

impl Weighted for AssessmentStatus {
    fn weight(&self) -> Option<f64> {
        match self {
            Self::Compliant => Some(1.0),
            Self::PartiallyCompliant => Some(0.5),
            Self::NonCompliant => Some(0.0),
            Self::NotApplicable | Self::NotAssessed => None,
        }
    }
}

/// What the organization decided for an addressable requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressableChoice {
    /// Safeguard implemented as specified
    Implemented,
    /// Equivalent alternative measure implemented instead
    AlternativeMeasure,
    /// Not reasonable and appropriate for this environment
    NotReasonable,
}

/// Addressable decision with its business justification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressableDecision {
    pub choice: AddressableChoice,
    pub justification: String,
    pub decided_at: DateTime<Utc>,
}

impl AddressableDecision {
    /// Create decision stamped now
    pub fn new(choice: AddressableChoice, justification: impl Into<String>) -> Self {
        Self {
            choice,
            justification: justification.into(),
            decided_at: Utc::now(),
        }
    }

    /// Status implied by the decision
    pub fn implied_status(&self) -> AssessmentStatus {
        match self.choice {
            AddressableChoice::Implemented | AddressableChoice::AlternativeMeasure => {
                AssessmentStatus::Compliant
            }
            AddressableChoice::NotReasonable => AssessmentStatus::NotApplicable,
        }
    }
}

/// Reference to evidence held by an external file store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRef {
    pub id: String,
    pub title: String,
    pub added_at: DateTime<Utc>,
}

impl EvidenceRef {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            added_at: Utc::now(),
        }
    }
}

/// Append-only assessor annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentNote {
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Requirement Assessment - one per (tenant, framework, leaf requirement)
///
/// Authoritative over any status implied by control answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementAssessment {
    pub tenant_id: TenantId,
    pub framework_id: FrameworkId,
    pub requirement_id: RequirementId,
    pub status: AssessmentStatus,
    /// Deferred by the assessor; never a verdict on its own
    #[serde(default)]
    pub skipped: bool,
    pub addressable_decision: Option<AddressableDecision>,
    #[serde(default)]
    pub evidence: Vec<EvidenceRef>,
    #[serde(default)]
    pub notes: Vec<AssessmentNote>,
    pub updated_at: DateTime<Utc>,
}

impl RequirementAssessment {
    /// Fresh, untouched record
    pub fn new(tenant_id: TenantId, framework_id: FrameworkId, requirement_id: RequirementId) -> Self {
        Self {
            tenant_id,
            framework_id,
            requirement_id,
            status: AssessmentStatus::NotAssessed,
            skipped: false,
            addressable_decision: None,
            evidence: Vec::new(),
            notes: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Counts toward progress: has a verdict or was deliberately deferred
    pub fn is_touched(&self) -> bool {
        self.status.is_verdict() || self.skipped
    }

    /// Append a note to the log
    pub fn push_note(&mut self, text: impl Into<String>) {
        self.notes.push(AssessmentNote {
            text: text.into(),
            created_at: Utc::now(),
        });
        self.updated_at = Utc::now();
    }
}

/// Control counts by answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerCounts {
    pub yes: usize,
    pub partial: usize,
    pub no: usize,
    pub not_applicable: usize,
    pub unanswered: usize,
}

impl AnswerCounts {
    /// Count one answer
    pub fn record(&mut self, answer: Answer) {
        match answer {
            Answer::Yes => self.yes += 1,
            Answer::Partial => self.partial += 1,
            Answer::No => self.no += 1,
            Answer::NotApplicable => self.not_applicable += 1,
            Answer::Unanswered => self.unanswered += 1,
        }
    }

    /// Total controls counted
    pub fn total(&self) -> usize {
        self.yes + self.partial + self.no + self.not_applicable + self.unanswered
    }
}

/// Compliance Snapshot - immutable point-in-time rollup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceSnapshot {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub taken_at: DateTime<Utc>,
    pub overall_score: u32,
    pub answer_counts: AnswerCounts,
    pub framework_scores: BTreeMap<FrameworkId, u32>,
    pub domain_scores: BTreeMap<DomainId, u32>,
    /// SHA-256 over the fields above, hex encoded
    pub digest: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_weights() {
        assert_eq!(Answer::Yes.weight(), Some(1.0));
        assert_eq!(Answer::Partial.weight(), Some(0.5));
        assert_eq!(Answer::No.weight(), Some(0.0));
        assert_eq!(Answer::Unanswered.weight(), Some(0.0));
        assert_eq!(Answer::NotApplicable.weight(), None);
    }

    #[test]
    fn test_status_weights() {
        assert_eq!(AssessmentStatus::Compliant.weight(), Some(1.0));
        assert_eq!(AssessmentStatus::NotAssessed.weight(), None);
        assert_eq!(AssessmentStatus::NotApplicable.weight(), None);
    }

    #[test]
    fn test_addressable_implied_status() {
        let decision = AddressableDecision::new(AddressableChoice::AlternativeMeasure, "VPN-only access");
        assert_eq!(decision.implied_status(), AssessmentStatus::Compliant);

        let decision = AddressableDecision::new(AddressableChoice::NotReasonable, "No ePHI at rest");
        assert_eq!(decision.implied_status(), AssessmentStatus::NotApplicable);
    }

    #[test]
    fn test_touched() {
        let mut record = RequirementAssessment::new(Uuid::new_v4(), "hipaa".into(), "1.1.1".into());
        assert!(!record.is_touched());

        record.skipped = true;
        assert!(record.is_touched());
        assert_eq!(record.status, AssessmentStatus::NotAssessed);
    }

    #[test]
    fn test_answer_serde() {
        let json = serde_json::to_string(&Answer::NotApplicable).unwrap();
        assert_eq!(json, "\"not_applicable\"");
    }
}
