//! Built-in Framework Definitions
//!
//! The built-in catalog ships four frameworks, the fixed control domains and
//! a starter control set mapped across them.

pub mod soc2;
pub mod iso27001;
pub mod hipaa;
pub mod pci_dss;
pub mod controls;

use crate::catalog::{Catalog, Domain, Framework, RequirementTree};
use grc_common::GrcResult;

/// Static framework declaration: requirements as `(dotted id, title, required)`
pub struct FrameworkDef {
    pub id: &'static str,
    pub name: &'static str,
    pub full_name: &'static str,
    pub color: &'static str,
    pub requirements: &'static [(&'static str, &'static str, bool)],
}

impl FrameworkDef {
    /// Build the framework and its requirement tree
    pub fn build(&self) -> GrcResult<Framework> {
        Ok(Framework {
            id: self.id.into(),
            name: self.name.to_string(),
            full_name: self.full_name.to_string(),
            color: self.color.to_string(),
            requirements: RequirementTree::from_paths(self.requirements.iter().copied())?,
        })
    }
}

/// Fixed control domains
pub fn domains() -> Vec<Domain> {
    [
        ("access-control", "Access Control", "Identity, authentication and authorization"),
        ("cryptography", "Cryptography", "Encryption of data at rest and in transit"),
        ("operations-security", "Operations Security", "Logging, vulnerability and change management"),
        ("incident-management", "Incident Management", "Detection, response and lessons learned"),
        ("business-continuity", "Business Continuity", "Backup, recovery and resilience"),
        ("governance", "Governance & Risk", "Policies, risk assessment and oversight"),
        ("people-security", "People Security", "Screening, awareness and training"),
        ("supplier-management", "Supplier Management", "Third-party and vendor risk"),
        ("physical-security", "Physical Security", "Facility and equipment protection"),
    ]
    .into_iter()
    .map(|(id, name, description)| Domain {
        id: id.into(),
        name: name.to_string(),
        description: description.to_string(),
    })
    .collect()
}

/// Build the built-in catalog
pub fn builtin() -> GrcResult<Catalog> {
    let frameworks = [
        soc2::definition(),
        iso27001::definition(),
        hipaa::definition(),
        pci_dss::definition(),
    ]
    .iter()
    .map(FrameworkDef::build)
    .collect::<GrcResult<Vec<_>>>()?;

    // Clause titles come from the trees so the two never drift apart.
    let mut controls = controls::builtin_controls();
    for control in &mut controls {
        for mapping in &mut control.mappings {
            if !mapping.clause_title.is_empty() {
                continue;
            }
            if let Some(node) = frameworks
                .iter()
                .find(|f| f.id == mapping.framework)
                .and_then(|f| f.requirements.get(mapping.clause_id.as_str()))
            {
                mapping.clause_title = node.title.clone();
            }
        }
    }

    let catalog = Catalog::new(domains(), frameworks, controls)?;
    tracing::info!(
        "Loaded built-in catalog: {} controls across {} frameworks",
        catalog.controls().len(),
        catalog.frameworks().len()
    );
    Ok(catalog)
}

impl Catalog {
    /// The built-in catalog
    pub fn builtin() -> GrcResult<Self> {
        builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.frameworks().len(), 4);
        assert_eq!(catalog.domains().len(), 9);
        assert!(catalog.controls().len() >= 20);
    }

    #[test]
    fn test_builtin_mappings_hit_leaves() {
        let catalog = Catalog::builtin().unwrap();
        for control in catalog.controls() {
            assert!(!control.mappings.is_empty(), "{} has no mappings", control.id);
            for mapping in &control.mappings {
                let framework = catalog.framework(mapping.framework.as_str()).unwrap();
                assert!(
                    framework.requirements.is_leaf(mapping.clause_id.as_str()),
                    "{} maps to non-leaf {}/{}",
                    control.id,
                    mapping.framework,
                    mapping.clause_id
                );
                assert!(!mapping.clause_title.is_empty());
            }
        }
    }

    #[test]
    fn test_hipaa_addressable_leaves() {
        let catalog = Catalog::builtin().unwrap();
        let hipaa = catalog.framework(hipaa::ID).unwrap();
        assert!(hipaa.requirements.leaf("1.1.1").unwrap().required);
        assert!(!hipaa.requirements.leaf("3.1.4").unwrap().required);
        assert_eq!(hipaa.requirements.leaf_count(), 21);
    }

    #[test]
    fn test_iso_implicit_annex_root() {
        let catalog = Catalog::builtin().unwrap();
        let iso = catalog.framework(iso27001::ID).unwrap();
        assert!(iso.requirements.get("A").unwrap().implicit);
        assert_eq!(iso.requirements.roots().count(), 1);
    }

    #[test]
    fn test_pci_declaration_order() {
        let catalog = Catalog::builtin().unwrap();
        let pci = catalog.framework(pci_dss::ID).unwrap();
        let leaves = pci.requirements.leaf_ids();
        assert_eq!(leaves.first().unwrap().as_str(), "1.2.1");
        assert_eq!(leaves.last().unwrap().as_str(), "12.10.1");
    }
}
