//! Scoring Engine
//!
//! Weighted compliance percentages at the control, domain, framework and
//! requirement level. Every function here is total: empty or degenerate
//! input scores 0 and yields empty lists.

use crate::catalog::{Control, RiskLevel, TenantCatalog};
use grc_common::{
    Answer, AnswerCounts, AssessmentStatus, ControlId, ControlResponse, DomainId, FrameworkId,
    RequirementId, Weighted,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Running Σweight / applicable
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightedTally {
    sum: f64,
    applicable: usize,
}

impl WeightedTally {
    /// Count one item; non-applicable items are ignored
    #[inline]
    pub fn add(&mut self, item: &impl Weighted) {
        if let Some(weight) = item.weight() {
            self.sum += weight;
            self.applicable += 1;
        }
    }

    /// Items that counted
    pub fn applicable(&self) -> usize {
        self.applicable
    }

    /// round(100 × Σweight / applicable), 0 when nothing applies
    pub fn score(&self) -> u32 {
        if self.applicable == 0 {
            return 0;
        }
        (100.0 * self.sum / self.applicable as f64).round() as u32
    }
}

/// Score a set of weighted items
pub fn weighted_score<'a, W, I>(items: I) -> u32
where
    W: Weighted + 'a,
    I: IntoIterator<Item = &'a W>,
{
    let mut tally = WeightedTally::default();
    for item in items {
        tally.add(item);
    }
    tally.score()
}

/// A tenant's answers keyed by control
#[derive(Debug, Clone, Default)]
pub struct AnswerSheet {
    answers: HashMap<ControlId, Answer>,
}

impl AnswerSheet {
    /// Keep responses for controls the tenant can see; the rest are orphans
    pub fn from_responses(catalog: &TenantCatalog, responses: impl IntoIterator<Item = ControlResponse>) -> Self {
        let mut answers = HashMap::new();
        for response in responses {
            if catalog.control(response.control_id.as_str()).is_none() {
                tracing::debug!(
                    tenant = %response.tenant_id,
                    control = %response.control_id,
                    "Skipping orphaned control response"
                );
                continue;
            }
            answers.insert(response.control_id, response.answer);
        }
        Self { answers }
    }

    /// Build directly from (control, answer) pairs
    pub fn from_answers<I, C>(answers: I) -> Self
    where
        I: IntoIterator<Item = (C, Answer)>,
        C: Into<ControlId>,
    {
        Self {
            answers: answers.into_iter().map(|(c, a)| (c.into(), a)).collect(),
        }
    }

    /// Answer for a control, `Unanswered` when absent
    #[inline]
    pub fn answer(&self, control: &str) -> Answer {
        self.answers.get(control).copied().unwrap_or_default()
    }

    /// Number of stored answers
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

/// Requirement status derived from control answers.
///
/// Advisory only; a recorded verdict always takes precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpliedStatus {
    #[default]
    NotAssessed,
    Compliant,
    PartiallyCompliant,
    NonCompliant,
}

impl ImpliedStatus {
    /// Derive from the answers of a leaf's mapped controls
    pub fn from_answers(answers: impl IntoIterator<Item = Answer>) -> Self {
        let mut answered = false;
        let mut all_met = true;
        let mut any_no = false;
        let mut any_credit = false;

        for answer in answers {
            answered |= answer.is_answered();
            all_met &= matches!(answer, Answer::Yes | Answer::NotApplicable);
            any_no |= answer == Answer::No;
            any_credit |= matches!(answer, Answer::Yes | Answer::Partial);
        }

        if !answered {
            Self::NotAssessed
        } else if all_met {
            Self::Compliant
        } else if any_no && !any_credit {
            // Not applicable and unanswered controls neither rescue nor condemn
            Self::NonCompliant
        } else {
            Self::PartiallyCompliant
        }
    }

    /// Same value in the recorded-status vocabulary
    pub fn as_status(self) -> AssessmentStatus {
        match self {
            Self::NotAssessed => AssessmentStatus::NotAssessed,
            Self::Compliant => AssessmentStatus::Compliant,
            Self::PartiallyCompliant => AssessmentStatus::PartiallyCompliant,
            Self::NonCompliant => AssessmentStatus::NonCompliant,
        }
    }
}

/// Requirement-level score over a leaf's mapped controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementScore {
    pub framework_id: FrameworkId,
    pub requirement_id: RequirementId,
    pub mapped_controls: Vec<ControlId>,
    pub score: u32,
    pub implied: ImpliedStatus,
}

/// Requirement as shown to an assessor: implied and recorded side by side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementView {
    pub requirement_id: RequirementId,
    pub title: String,
    pub level: usize,
    pub required: bool,
    pub mapped_controls: Vec<ControlId>,
    pub score: u32,
    pub implied: ImpliedStatus,
    /// Assessor's saved status, if any record exists
    pub recorded: Option<AssessmentStatus>,
    pub skipped: bool,
}

impl RequirementView {
    /// Recorded verdict when present, otherwise the implied status
    pub fn effective(&self) -> AssessmentStatus {
        match self.recorded {
            Some(status) if status.is_verdict() => status,
            _ => self.implied.as_status(),
        }
    }
}

/// Control whose failure matters most
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalGap {
    pub control_id: ControlId,
    pub title: String,
    pub domain: DomainId,
    pub risk_level: RiskLevel,
    pub frameworks: Vec<FrameworkId>,
    pub remediation_hint: String,
}

impl CriticalGap {
    fn from_control(control: &Control) -> Self {
        Self {
            control_id: control.id.clone(),
            title: control.title.clone(),
            domain: control.domain.clone(),
            risk_level: control.risk_level,
            frameworks: control.frameworks().into_iter().cloned().collect(),
            remediation_hint: control.remediation_hint.clone(),
        }
    }
}

/// Scores for one tenant at every aggregate level
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBoard {
    pub global: u32,
    pub domain_scores: BTreeMap<DomainId, u32>,
    pub framework_scores: BTreeMap<FrameworkId, u32>,
    pub answer_counts: AnswerCounts,
}

/// Stateless scoring over a tenant catalog view and answer sheet
pub struct ScoringEngine;

impl ScoringEngine {
    /// Every aggregate score in one pass over the controls
    pub fn score_board(catalog: &TenantCatalog, sheet: &AnswerSheet) -> ScoreBoard {
        let mut global = WeightedTally::default();
        let mut counts = AnswerCounts::default();
        let mut domains: BTreeMap<DomainId, WeightedTally> = catalog
            .domains()
            .into_iter()
            .map(|d| (d.id, WeightedTally::default()))
            .collect();
        let mut frameworks: BTreeMap<FrameworkId, WeightedTally> = catalog
            .frameworks()
            .iter()
            .map(|f| (f.id.clone(), WeightedTally::default()))
            .collect();

        for control in catalog.controls() {
            let answer = sheet.answer(control.id.as_str());
            global.add(&answer);
            counts.record(answer);
            if let Some(tally) = domains.get_mut(&control.domain) {
                tally.add(&answer);
            }
            for framework in control.frameworks() {
                if let Some(tally) = frameworks.get_mut(framework) {
                    tally.add(&answer);
                }
            }
        }

        ScoreBoard {
            global: global.score(),
            domain_scores: domains.into_iter().map(|(id, t)| (id, t.score())).collect(),
            framework_scores: frameworks.into_iter().map(|(id, t)| (id, t.score())).collect(),
            answer_counts: counts,
        }
    }

    /// Global score over all the tenant's controls
    pub fn global_score(catalog: &TenantCatalog, sheet: &AnswerSheet) -> u32 {
        Self::tally(catalog.controls(), sheet).score()
    }

    /// Score over the controls in one domain
    pub fn domain_score(catalog: &TenantCatalog, sheet: &AnswerSheet, domain: &str) -> u32 {
        Self::tally(catalog.controls().filter(|c| c.domain.as_str() == domain), sheet).score()
    }

    /// Score over controls with at least one mapping to the framework
    pub fn framework_score(catalog: &TenantCatalog, sheet: &AnswerSheet, framework: &str) -> u32 {
        Self::tally(catalog.controls().filter(|c| c.maps_to(framework)), sheet).score()
    }

    fn tally<'a>(controls: impl Iterator<Item = &'a Control>, sheet: &AnswerSheet) -> WeightedTally {
        let mut tally = WeightedTally::default();
        for control in controls {
            tally.add(&sheet.answer(control.id.as_str()));
        }
        tally
    }

    /// Score and implied status for one leaf requirement
    pub fn requirement_score(
        catalog: &TenantCatalog,
        sheet: &AnswerSheet,
        framework: &str,
        requirement: &str,
    ) -> RequirementScore {
        let mapped = catalog.index().controls_for(framework, requirement);
        let answers: Vec<Answer> = mapped.iter().map(|c| sheet.answer(c.as_str())).collect();

        RequirementScore {
            framework_id: framework.into(),
            requirement_id: requirement.into(),
            mapped_controls: mapped.to_vec(),
            score: weighted_score(&answers),
            implied: ImpliedStatus::from_answers(answers.iter().copied()),
        }
    }

    /// Critical/high controls answered "no", critical first then by id
    pub fn critical_gaps(catalog: &TenantCatalog, sheet: &AnswerSheet, limit: usize) -> Vec<CriticalGap> {
        let mut gaps: Vec<&Control> = catalog
            .controls()
            .filter(|c| c.risk_level >= RiskLevel::High)
            .filter(|c| sheet.answer(c.id.as_str()) == Answer::No)
            .collect();

        gaps.sort_by(|a, b| b.risk_level.cmp(&a.risk_level).then_with(|| a.id.cmp(&b.id)));
        gaps.into_iter().take(limit).map(CriticalGap::from_control).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CatalogStore, CustomControlDraft, ControlMapping};
    use proptest::prelude::*;
    use uuid::Uuid;

    const FEED: &str = r#"{
        "domains": [
            { "id": "access-control", "name": "Access Control" },
            { "id": "cryptography", "name": "Cryptography" }
        ],
        "frameworks": [
            { "id": "f", "name": "F", "full_name": "Framework F", "requirements": [
                { "id": "1", "title": "One", "children": [
                    { "id": "1.1", "title": "One.One" },
                    { "id": "1.2", "title": "One.Two" }
                ]}
            ]},
            { "id": "g", "name": "G", "full_name": "Framework G", "requirements": [
                { "id": "9", "title": "Nine" }
            ]}
        ],
        "controls": [
            { "id": "A", "title": "A", "description": "", "question": "?", "domain": "access-control",
              "risk_level": "critical",
              "mappings": [ { "framework": "f", "clause_id": "1.1", "clause_title": "" },
                            { "framework": "f", "clause_id": "1.2", "clause_title": "" } ] },
            { "id": "B", "title": "B", "description": "", "question": "?", "domain": "access-control",
              "risk_level": "high",
              "mappings": [ { "framework": "f", "clause_id": "1.1", "clause_title": "" } ] },
            { "id": "C", "title": "C", "description": "", "question": "?", "domain": "cryptography",
              "risk_level": "high",
              "mappings": [ { "framework": "g", "clause_id": "9", "clause_title": "" } ] },
            { "id": "D", "title": "D", "description": "", "question": "?", "domain": "cryptography",
              "risk_level": "low" }
        ]
    }"#;

    fn view() -> TenantCatalog {
        CatalogStore::new(Catalog::from_json(FEED).unwrap()).view(Uuid::new_v4())
    }

    fn sheet(answers: &[(&str, Answer)]) -> AnswerSheet {
        AnswerSheet::from_answers(answers.iter().copied())
    }

    #[test]
    fn test_weighted_score_formula() {
        assert_eq!(weighted_score(&[Answer::Yes, Answer::Partial, Answer::No]), 50);
        assert_eq!(weighted_score(&[Answer::Yes, Answer::Yes, Answer::Partial]), 83);
        assert_eq!(weighted_score(&[Answer::Yes, Answer::NotApplicable]), 100);
        assert_eq!(weighted_score(&[Answer::Unanswered, Answer::Yes]), 50);
    }

    #[test]
    fn test_all_not_applicable_scores_zero() {
        assert_eq!(weighted_score(&[Answer::NotApplicable, Answer::NotApplicable]), 0);
        assert_eq!(weighted_score::<Answer, _>(&[]), 0);
    }

    #[test]
    fn test_framework_score_counts_each_control_once() {
        let catalog = view();
        let sheet = sheet(&[("A", Answer::Yes), ("B", Answer::No)]);

        // A maps to two clauses of f but contributes once
        assert_eq!(ScoringEngine::framework_score(&catalog, &sheet, "f"), 50);

        let score = ScoringEngine::requirement_score(&catalog, &sheet, "f", "1.1");
        assert_eq!(score.score, 50);
        assert_eq!(score.implied, ImpliedStatus::PartiallyCompliant);
        assert_eq!(score.mapped_controls.len(), 2);
    }

    #[test]
    fn test_implied_status_rules() {
        use Answer::*;
        assert_eq!(ImpliedStatus::from_answers([]), ImpliedStatus::NotAssessed);
        assert_eq!(ImpliedStatus::from_answers([Unanswered, Unanswered]), ImpliedStatus::NotAssessed);
        assert_eq!(ImpliedStatus::from_answers([Yes, NotApplicable]), ImpliedStatus::Compliant);
        assert_eq!(ImpliedStatus::from_answers([No, No]), ImpliedStatus::NonCompliant);
        assert_eq!(ImpliedStatus::from_answers([Yes, No]), ImpliedStatus::PartiallyCompliant);
        assert_eq!(ImpliedStatus::from_answers([Partial]), ImpliedStatus::PartiallyCompliant);
        assert_eq!(ImpliedStatus::from_answers([Yes, Unanswered]), ImpliedStatus::PartiallyCompliant);
        assert_eq!(ImpliedStatus::from_answers([No, NotApplicable]), ImpliedStatus::NonCompliant);
        assert_eq!(ImpliedStatus::from_answers([No, Unanswered]), ImpliedStatus::NonCompliant);
        assert_eq!(ImpliedStatus::from_answers([No, Partial]), ImpliedStatus::PartiallyCompliant);
    }

    #[test]
    fn test_recorded_status_wins() {
        let view = RequirementView {
            requirement_id: "1.1".into(),
            title: String::new(),
            level: 2,
            required: true,
            mapped_controls: vec![],
            score: 100,
            implied: ImpliedStatus::Compliant,
            recorded: Some(AssessmentStatus::NonCompliant),
            skipped: false,
        };
        assert_eq!(view.effective(), AssessmentStatus::NonCompliant);

        let deferred = RequirementView {
            recorded: Some(AssessmentStatus::NotAssessed),
            ..view
        };
        assert_eq!(deferred.effective(), AssessmentStatus::Compliant);
    }

    #[test]
    fn test_score_board() {
        let catalog = view();
        let sheet = sheet(&[
            ("A", Answer::Yes),
            ("B", Answer::Partial),
            ("C", Answer::No),
            ("D", Answer::NotApplicable),
        ]);

        let board = ScoringEngine::score_board(&catalog, &sheet);
        assert_eq!(board.global, 50);
        assert_eq!(board.domain_scores[&DomainId::new("access-control")], 75);
        assert_eq!(board.domain_scores[&DomainId::new("cryptography")], 0);
        assert_eq!(board.framework_scores[&FrameworkId::new("f")], 75);
        assert_eq!(board.framework_scores[&FrameworkId::new("g")], 0);
        assert_eq!(board.answer_counts.total(), 4);
        assert_eq!(board.answer_counts.not_applicable, 1);

        assert_eq!(board.global, ScoringEngine::global_score(&catalog, &sheet));
        assert_eq!(ScoringEngine::domain_score(&catalog, &sheet, "access-control"), 75);
    }

    #[test]
    fn test_custom_domain_scored_once_present() {
        let store = CatalogStore::new(Catalog::from_json(FEED).unwrap());
        let tenant = Uuid::new_v4();
        let board = ScoringEngine::score_board(&store.view(tenant), &AnswerSheet::default());
        assert!(!board.domain_scores.contains_key(crate::catalog::CUSTOM_DOMAIN_ID));

        let control = store
            .add_custom(
                tenant,
                CustomControlDraft {
                    title: "Local".into(),
                    mappings: vec![ControlMapping::new("f", "1.2", "")],
                    ..Default::default()
                },
            )
            .unwrap();
        let sheet = sheet(&[(control.id.as_str(), Answer::Yes)]);
        let board = ScoringEngine::score_board(&store.view(tenant), &sheet);
        assert_eq!(board.domain_scores[crate::catalog::CUSTOM_DOMAIN_ID], 100);
    }

    #[test]
    fn test_orphaned_responses_dropped() {
        let catalog = view();
        let tenant = Uuid::new_v4();
        let responses = vec![
            ControlResponse::new(tenant, "A".into(), Answer::Yes),
            ControlResponse::new(tenant, "custom-gone".into(), Answer::No),
        ];
        let sheet = AnswerSheet::from_responses(&catalog, responses);
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.answer("custom-gone"), Answer::Unanswered);
    }

    #[test]
    fn test_critical_gaps_ranked() {
        let catalog = view();
        let sheet = sheet(&[
            ("A", Answer::No),
            ("B", Answer::No),
            ("C", Answer::No),
            ("D", Answer::No),
        ]);

        let gaps = ScoringEngine::critical_gaps(&catalog, &sheet, 10);
        let ids: Vec<_> = gaps.iter().map(|g| g.control_id.to_string()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert_eq!(ScoringEngine::critical_gaps(&catalog, &sheet, 1).len(), 1);

        // Unanswered is not a critical gap
        assert!(ScoringEngine::critical_gaps(&catalog, &AnswerSheet::default(), 10).is_empty());
    }

    fn answer_strategy() -> impl Strategy<Value = Answer> {
        prop_oneof![
            Just(Answer::Yes),
            Just(Answer::No),
            Just(Answer::Partial),
            Just(Answer::NotApplicable),
            Just(Answer::Unanswered),
        ]
    }

    proptest! {
        #[test]
        fn prop_score_in_range_and_matches_formula(answers in prop::collection::vec(answer_strategy(), 0..64)) {
            let score = weighted_score(&answers);
            prop_assert!(score <= 100);

            let applicable: Vec<f64> = answers.iter().filter_map(|a| a.weight()).collect();
            let expected = if applicable.is_empty() {
                0
            } else {
                (100.0 * applicable.iter().sum::<f64>() / applicable.len() as f64).round() as u32
            };
            prop_assert_eq!(score, expected);
        }

        #[test]
        fn prop_not_applicable_is_neutral(
            answers in prop::collection::vec(answer_strategy(), 1..32),
            extra in 0usize..8,
        ) {
            let mut padded = answers.clone();
            padded.extend(std::iter::repeat(Answer::NotApplicable).take(extra));
            prop_assert_eq!(weighted_score(&answers), weighted_score(&padded));
        }
    }
}
