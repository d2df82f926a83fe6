//! Progress and summary rollups over recorded assessments

use crate::catalog::{Framework, RequirementNode};
use crate::scoring::WeightedTally;
use grc_common::{AssessmentStatus, FrameworkId, RequirementAssessment, RequirementId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Touched leaves over total leaves
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub assessed: usize,
    pub total: usize,
}

impl Progress {
    /// Share of leaves touched, 0.0 for an empty framework
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.assessed as f64 / self.total as f64
        }
    }

    pub fn percent(&self) -> u32 {
        (100.0 * self.fraction()).round() as u32
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.assessed == self.total
    }
}

/// Leaves per recorded status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Includes skipped leaves
    pub not_assessed: usize,
    pub compliant: usize,
    pub partially_compliant: usize,
    pub non_compliant: usize,
    pub not_applicable: usize,
    pub skipped: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: AssessmentStatus, skipped: bool) {
        match status {
            AssessmentStatus::NotAssessed => self.not_assessed += 1,
            AssessmentStatus::Compliant => self.compliant += 1,
            AssessmentStatus::PartiallyCompliant => self.partially_compliant += 1,
            AssessmentStatus::NonCompliant => self.non_compliant += 1,
            AssessmentStatus::NotApplicable => self.not_applicable += 1,
        }
        if skipped {
            self.skipped += 1;
        }
    }

    pub fn get(&self, status: AssessmentStatus) -> usize {
        match status {
            AssessmentStatus::NotAssessed => self.not_assessed,
            AssessmentStatus::Compliant => self.compliant,
            AssessmentStatus::PartiallyCompliant => self.partially_compliant,
            AssessmentStatus::NonCompliant => self.non_compliant,
            AssessmentStatus::NotApplicable => self.not_applicable,
        }
    }

    /// Leaves counted (skipped ones are already under not_assessed)
    pub fn total(&self) -> usize {
        AssessmentStatus::ALL.iter().map(|s| self.get(*s)).sum()
    }
}

/// Required leaf judged non-compliant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementGap {
    pub requirement_id: RequirementId,
    pub title: String,
}

/// Framework-level assessment summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSummary {
    pub framework_id: FrameworkId,
    pub counts: StatusCounts,
    pub progress: Progress,
    /// Compliant 1.0, partial 0.5, non-compliant 0.0; the rest excluded
    pub compliance_percentage: u32,
    pub critical_gaps: Vec<RequirementGap>,
}

/// Rollup for a grouping node over its descendant leaves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRollup {
    pub requirement_id: RequirementId,
    pub title: String,
    pub level: usize,
    pub counts: StatusCounts,
    pub progress: Progress,
    pub compliance_percentage: u32,
}

/// Recorded assessments for one framework, keyed by leaf
pub type RecordMap = HashMap<RequirementId, RequirementAssessment>;

struct Tally {
    counts: StatusCounts,
    progress: Progress,
    weights: WeightedTally,
}

fn tally<'a>(leaves: impl Iterator<Item = &'a RequirementNode>, records: &RecordMap) -> Tally {
    let mut counts = StatusCounts::default();
    let mut progress = Progress::default();
    let mut weights = WeightedTally::default();

    for leaf in leaves {
        progress.total += 1;
        let (status, skipped) = records
            .get(&leaf.id)
            .map_or((AssessmentStatus::NotAssessed, false), |r| (r.status, r.skipped));
        counts.record(status, skipped);
        weights.add(&status);
        if status.is_verdict() || skipped {
            progress.assessed += 1;
        }
    }

    Tally {
        counts,
        progress,
        weights,
    }
}

/// Progress over every leaf of the framework
pub fn progress(framework: &Framework, records: &RecordMap) -> Progress {
    tally(framework.requirements.leaves(), records).progress
}

/// Summary with critical gaps capped at `gap_cap`
pub fn summarize(framework: &Framework, records: &RecordMap, gap_cap: usize) -> AssessmentSummary {
    let Tally {
        counts,
        progress,
        weights,
    } = tally(framework.requirements.leaves(), records);

    let mut seen = HashSet::new();
    let critical_gaps = framework
        .requirements
        .leaves()
        .filter(|leaf| leaf.required)
        .filter(|leaf| {
            records
                .get(&leaf.id)
                .is_some_and(|r| r.status == AssessmentStatus::NonCompliant)
        })
        .filter(|leaf| seen.insert(leaf.id.clone()))
        .take(gap_cap)
        .map(|leaf| RequirementGap {
            requirement_id: leaf.id.clone(),
            title: leaf.title.clone(),
        })
        .collect();

    AssessmentSummary {
        framework_id: framework.id.clone(),
        counts,
        progress,
        compliance_percentage: weights.score(),
        critical_gaps,
    }
}

/// Rollups for every grouping node, in tree order
pub fn group_rollups(framework: &Framework, records: &RecordMap) -> Vec<GroupRollup> {
    let tree = &framework.requirements;
    let mut rollups = Vec::new();
    let mut stack: Vec<&RequirementNode> = tree.roots().collect();
    stack.reverse();

    while let Some(node) = stack.pop() {
        if node.is_leaf() {
            continue;
        }
        let leaves = tree.descendant_leaves(node.id.as_str());
        let Tally {
            counts,
            progress,
            weights,
        } = tally(leaves.into_iter(), records);
        rollups.push(GroupRollup {
            requirement_id: node.id.clone(),
            title: node.title.clone(),
            level: node.level,
            counts,
            progress,
            compliance_percentage: weights.score(),
        });

        let mut children = tree.children(node.id.as_str());
        children.reverse();
        stack.extend(children);
    }
    rollups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RequirementTree;
    use uuid::Uuid;

    fn framework() -> Framework {
        Framework {
            id: "f".into(),
            name: "F".into(),
            full_name: "F".into(),
            color: String::new(),
            requirements: RequirementTree::from_paths(vec![
                ("1.1", "a", true),
                ("1.2", "b", false),
                ("2.1", "c", true),
                ("2.2", "d", true),
            ])
            .unwrap(),
        }
    }

    fn records(entries: &[(&str, AssessmentStatus, bool)]) -> RecordMap {
        let tenant = Uuid::new_v4();
        entries
            .iter()
            .map(|(id, status, skipped)| {
                let mut record = RequirementAssessment::new(tenant, "f".into(), (*id).into());
                record.status = *status;
                record.skipped = *skipped;
                ((*id).into(), record)
            })
            .collect()
    }

    #[test]
    fn test_summary_counts_and_percentage() {
        let records = records(&[
            ("1.1", AssessmentStatus::Compliant, false),
            ("1.2", AssessmentStatus::NonCompliant, false),
            ("2.1", AssessmentStatus::NonCompliant, false),
            ("2.2", AssessmentStatus::NotAssessed, true),
        ]);

        let summary = summarize(&framework(), &records, 10);
        assert_eq!(summary.counts.compliant, 1);
        assert_eq!(summary.counts.non_compliant, 2);
        assert_eq!(summary.counts.not_assessed, 1);
        assert_eq!(summary.counts.skipped, 1);
        assert_eq!(summary.counts.total(), 4);
        assert_eq!(summary.progress.assessed, 4);
        assert_eq!(summary.compliance_percentage, 33);

        // 1.2 is addressable, so only 2.1 is a critical gap
        let gaps: Vec<_> = summary.critical_gaps.iter().map(|g| g.requirement_id.to_string()).collect();
        assert_eq!(gaps, vec!["2.1"]);
    }

    #[test]
    fn test_gap_cap() {
        let records = records(&[
            ("1.1", AssessmentStatus::NonCompliant, false),
            ("2.1", AssessmentStatus::NonCompliant, false),
            ("2.2", AssessmentStatus::NonCompliant, false),
        ]);
        let summary = summarize(&framework(), &records, 2);
        let gaps: Vec<_> = summary.critical_gaps.iter().map(|g| g.requirement_id.to_string()).collect();
        assert_eq!(gaps, vec!["1.1", "2.1"]);
    }

    #[test]
    fn test_empty_records() {
        let summary = summarize(&framework(), &RecordMap::new(), 10);
        assert_eq!(summary.counts.not_assessed, 4);
        assert_eq!(summary.progress.assessed, 0);
        assert_eq!(summary.progress.percent(), 0);
        assert_eq!(summary.compliance_percentage, 0);
        assert!(summary.critical_gaps.is_empty());
    }

    #[test]
    fn test_progress_fraction() {
        let records = records(&[("1.1", AssessmentStatus::NotApplicable, false)]);
        let progress = progress(&framework(), &records);
        assert_eq!(progress.assessed, 1);
        assert!((progress.fraction() - 0.25).abs() < f64::EPSILON);
        assert_eq!(progress.percent(), 25);
        assert!(!progress.is_complete());
        assert_eq!(Progress::default().fraction(), 0.0);
    }

    #[test]
    fn test_group_rollups() {
        let records = records(&[
            ("2.1", AssessmentStatus::Compliant, false),
            ("2.2", AssessmentStatus::PartiallyCompliant, false),
        ]);
        let rollups = group_rollups(&framework(), &records);
        let ids: Vec<_> = rollups.iter().map(|r| r.requirement_id.to_string()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(rollups[0].progress.assessed, 0);
        assert_eq!(rollups[1].compliance_percentage, 75);
        assert!(rollups[1].progress.is_complete());
    }
}
