//! Mapping Index
//!
//! Many-to-many relation between controls and leaf requirements. Built in
//! one pass over every control's mapping list; queries afterwards are hash
//! lookups or a walk over one framework's leaves.

use crate::catalog::{Control, Framework};
use grc_common::{ControlId, FrameworkId, RequirementId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Coverage statistics for one framework
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageStats {
    /// Leaf requirements in the framework
    pub total: usize,
    /// Leaves with at least one mapped control
    pub mapped: usize,
    /// Leaves with no mapped control
    pub unmapped: usize,
    /// Mean mapped controls per leaf
    pub average_coverage: f64,
}

impl CoverageStats {
    /// Mapped leaves as a rounded percentage
    pub fn percent_mapped(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (100.0 * self.mapped as f64 / self.total as f64).round() as u32
    }
}

#[derive(Debug, Clone, Default)]
struct FrameworkEdges {
    leaves: Vec<RequirementId>,
    edges: HashMap<RequirementId, Vec<ControlId>>,
}

/// Control ↔ leaf requirement index
#[derive(Debug, Clone, Default)]
pub struct MappingIndex {
    frameworks: HashMap<FrameworkId, FrameworkEdges>,
    by_control: HashMap<ControlId, Vec<(FrameworkId, RequirementId)>>,
    unmatched: usize,
}

impl MappingIndex {
    /// Build from frameworks and controls
    pub fn build<'a>(frameworks: &[Framework], controls: impl IntoIterator<Item = &'a Control>) -> Self {
        let mut index = Self {
            frameworks: frameworks
                .iter()
                .map(|f| {
                    let leaves = f.requirements.leaf_ids();
                    let edges = leaves.iter().map(|id| (id.clone(), Vec::new())).collect();
                    (f.id.clone(), FrameworkEdges { leaves, edges })
                })
                .collect(),
            by_control: HashMap::new(),
            unmatched: 0,
        };
        index.extend(controls);
        index
    }

    /// Add edges for more controls (tenant overlay)
    pub fn extend<'a>(&mut self, controls: impl IntoIterator<Item = &'a Control>) {
        for control in controls {
            for mapping in &control.mappings {
                let slot = self
                    .frameworks
                    .get_mut(&mapping.framework)
                    .and_then(|f| f.edges.get_mut(&mapping.clause_id));

                let Some(mapped) = slot else {
                    // Coarser or unknown clause: unmapped, not an error.
                    tracing::debug!(
                        control = %control.id,
                        framework = %mapping.framework,
                        clause = %mapping.clause_id,
                        "Clause does not match a leaf requirement"
                    );
                    self.unmatched += 1;
                    continue;
                };

                if mapped.contains(&control.id) {
                    continue;
                }
                mapped.push(control.id.clone());
                self.by_control
                    .entry(control.id.clone())
                    .or_default()
                    .push((mapping.framework.clone(), mapping.clause_id.clone()));
            }
        }
    }

    /// Controls mapped to a leaf requirement (empty for unknown ids)
    pub fn controls_for(&self, framework: &str, requirement: &str) -> &[ControlId] {
        self.frameworks
            .get(framework)
            .and_then(|f| f.edges.get(requirement))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Leaf requirements a control satisfies, across all frameworks
    pub fn requirements_for(&self, control: &str) -> &[(FrameworkId, RequirementId)] {
        self.by_control
            .get(control)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Coverage statistics (all zero for unknown or empty frameworks)
    pub fn coverage(&self, framework: &str) -> CoverageStats {
        let Some(f) = self.frameworks.get(framework) else {
            return CoverageStats::default();
        };

        let total = f.leaves.len();
        let mut mapped = 0;
        let mut edges = 0;
        for leaf in &f.leaves {
            let count = f.edges.get(leaf).map_or(0, Vec::len);
            edges += count;
            if count > 0 {
                mapped += 1;
            }
        }

        CoverageStats {
            total,
            mapped,
            unmapped: total - mapped,
            average_coverage: if total > 0 { edges as f64 / total as f64 } else { 0.0 },
        }
    }

    /// Leaves with no mapped control, in declaration order
    pub fn unmapped_requirements(&self, framework: &str) -> Vec<&RequirementId> {
        self.frameworks
            .get(framework)
            .map(|f| {
                f.leaves
                    .iter()
                    .filter(|leaf| f.edges.get(*leaf).map_or(true, Vec::is_empty))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Mapping entries that matched no leaf
    pub fn unmatched_count(&self) -> usize {
        self.unmatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, ControlMapping, RequirementTree, RiskLevel};

    fn framework(id: &str, paths: &[(&str, &str, bool)]) -> Framework {
        Framework {
            id: id.into(),
            name: id.to_uppercase(),
            full_name: id.to_string(),
            color: String::new(),
            requirements: RequirementTree::from_paths(paths.iter().copied()).unwrap(),
        }
    }

    fn control(id: &str, mappings: &[(&str, &str)]) -> Control {
        Control {
            id: id.into(),
            title: id.to_string(),
            description: String::new(),
            question: String::new(),
            domain: "access-control".into(),
            risk_level: RiskLevel::Medium,
            mappings: mappings
                .iter()
                .map(|(f, c)| ControlMapping::new(f, c, ""))
                .collect(),
            guidance: String::new(),
            evidence_example: String::new(),
            remediation_hint: String::new(),
            custom: false,
        }
    }

    #[test]
    fn test_controls_for_and_reverse_lookup() {
        let frameworks = vec![framework("f", &[("1.1", "a", true), ("1.2", "b", true)])];
        let controls = vec![
            control("A", &[("f", "1.1")]),
            control("B", &[("f", "1.1"), ("f", "1.2")]),
        ];
        let index = MappingIndex::build(&frameworks, &controls);

        assert_eq!(index.controls_for("f", "1.1"), &[ControlId::new("A"), ControlId::new("B")]);
        assert_eq!(index.controls_for("f", "1.2"), &[ControlId::new("B")]);
        assert!(index.controls_for("f", "9.9").is_empty());
        assert!(index.controls_for("g", "1.1").is_empty());
        assert_eq!(index.requirements_for("B").len(), 2);
        assert!(index.requirements_for("missing").is_empty());
    }

    #[test]
    fn test_coarse_and_unknown_clauses_are_unmapped() {
        let frameworks = vec![framework("f", &[("1.1", "a", true)])];
        let controls = vec![control("A", &[("f", "1"), ("g", "1.1"), ("f", "1.1"), ("f", "1.1")])];
        let index = MappingIndex::build(&frameworks, &controls);

        assert_eq!(index.unmatched_count(), 2);
        assert_eq!(index.controls_for("f", "1.1").len(), 1);
        assert_eq!(index.requirements_for("A").len(), 1);
    }

    #[test]
    fn test_coverage() {
        let frameworks = vec![framework(
            "f",
            &[("1.1", "a", true), ("1.2", "b", true), ("1.3", "c", true), ("1.4", "d", true)],
        )];
        let controls = vec![
            control("A", &[("f", "1.1")]),
            control("B", &[("f", "1.1"), ("f", "1.2")]),
        ];
        let index = MappingIndex::build(&frameworks, &controls);

        let stats = index.coverage("f");
        assert_eq!(stats.total, 4);
        assert_eq!(stats.mapped, 2);
        assert_eq!(stats.unmapped, 2);
        assert!((stats.average_coverage - 0.75).abs() < f64::EPSILON);
        assert_eq!(stats.percent_mapped(), 50);

        let unmapped: Vec<_> = index.unmapped_requirements("f").iter().map(|r| r.to_string()).collect();
        assert_eq!(unmapped, vec!["1.3", "1.4"]);
    }

    #[test]
    fn test_empty_framework_coverage() {
        let frameworks = vec![framework("empty", &[])];
        let index = MappingIndex::build(&frameworks, &[]);

        let stats = index.coverage("empty");
        assert_eq!(stats, CoverageStats::default());
        assert_eq!(stats.average_coverage, 0.0);
        assert_eq!(stats.percent_mapped(), 0);
        assert_eq!(index.coverage("unknown"), CoverageStats::default());
    }

    #[test]
    fn test_extend_with_overlay() {
        let frameworks = vec![framework("f", &[("1.1", "a", true), ("1.2", "b", true)])];
        let base = MappingIndex::build(&frameworks, &[control("A", &[("f", "1.1")])]);

        let mut tenant = base.clone();
        tenant.extend(&[control("custom-1", &[("f", "1.2")])]);

        assert_eq!(base.coverage("f").mapped, 1);
        assert_eq!(tenant.coverage("f").mapped, 2);
    }

    #[test]
    fn test_builtin_coverage() {
        let catalog = Catalog::builtin().unwrap();
        let index = MappingIndex::build(catalog.frameworks(), catalog.controls());

        let hipaa = index.coverage("hipaa");
        assert_eq!(hipaa.total, 21);
        assert_eq!(hipaa.unmapped, 2);
        assert_eq!(index.unmatched_count(), 0);
    }
}
