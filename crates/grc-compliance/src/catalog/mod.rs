//! Control Catalog
//!
//! Process-wide reference data: controls, domains, frameworks and their
//! requirement trees. The base catalog is immutable once built; tenant
//! custom controls live in an overlay (see [`store::CatalogStore`]).

pub mod tree;
pub mod store;

use grc_common::{ControlId, DomainId, FrameworkId, GrcError, GrcResult, RequirementId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub use store::{CatalogStore, CustomControlDraft, TenantCatalog};
pub use tree::{RequirementDef, RequirementNode, RequirementTree};

/// Domain holding tenant-created controls
pub const CUSTOM_DOMAIN_ID: &str = "organization-specific";

/// Risk level (ordinal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// Binding of a control to one framework clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMapping {
    pub framework: FrameworkId,
    pub clause_id: RequirementId,
    pub clause_title: String,
}

impl ControlMapping {
    pub fn new(framework: &str, clause_id: &str, clause_title: &str) -> Self {
        Self {
            framework: framework.into(),
            clause_id: clause_id.into(),
            clause_title: clause_title.to_string(),
        }
    }
}

/// Control definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub id: ControlId,
    pub title: String,
    pub description: String,
    /// Single yes/no assessment question
    pub question: String,
    pub domain: DomainId,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub mappings: Vec<ControlMapping>,
    #[serde(default)]
    pub guidance: String,
    #[serde(default)]
    pub evidence_example: String,
    #[serde(default)]
    pub remediation_hint: String,
    /// Tenant-created
    #[serde(default)]
    pub custom: bool,
}

impl Control {
    /// Whether any mapping entry targets `framework`
    pub fn maps_to(&self, framework: &str) -> bool {
        self.mappings.iter().any(|m| m.framework.as_str() == framework)
    }

    /// Distinct frameworks this control maps to, in mapping order
    pub fn frameworks(&self) -> Vec<&FrameworkId> {
        let mut seen = HashSet::new();
        self.mappings
            .iter()
            .map(|m| &m.framework)
            .filter(|f| seen.insert(*f))
            .collect()
    }
}

/// Domain definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: DomainId,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Domain {
    /// The synthetic domain for tenant custom controls
    pub fn custom() -> Self {
        Self {
            id: CUSTOM_DOMAIN_ID.into(),
            name: "Organization-Specific".into(),
            description: "Controls defined by your organization".into(),
        }
    }
}

/// Framework with its requirement hierarchy
#[derive(Debug, Clone)]
pub struct Framework {
    pub id: FrameworkId,
    pub name: String,
    pub full_name: String,
    /// Presentation only
    pub color: String,
    pub requirements: RequirementTree,
}

impl Framework {
    /// Framework listing entry
    pub fn info(&self) -> FrameworkInfo {
        FrameworkInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            full_name: self.full_name.clone(),
            color: self.color.clone(),
            leaf_count: self.requirements.leaf_count(),
        }
    }
}

/// Framework listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkInfo {
    pub id: FrameworkId,
    pub name: String,
    pub full_name: String,
    pub color: String,
    pub leaf_count: usize,
}

/// Framework as it appears in a catalog feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkFeed {
    pub id: FrameworkId,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub requirements: Vec<RequirementDef>,
}

/// External catalog feed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFeed {
    pub domains: Vec<Domain>,
    pub frameworks: Vec<FrameworkFeed>,
    pub controls: Vec<Control>,
}

/// Immutable base catalog
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    controls: Vec<Control>,
    control_index: HashMap<ControlId, usize>,
    frameworks: Vec<Framework>,
    framework_index: HashMap<FrameworkId, usize>,
    domains: Vec<Domain>,
}

impl Catalog {
    /// Build and validate a catalog
    pub fn new(domains: Vec<Domain>, frameworks: Vec<Framework>, controls: Vec<Control>) -> GrcResult<Self> {
        let mut domain_ids = HashSet::new();
        for domain in &domains {
            if domain.id.as_str() == CUSTOM_DOMAIN_ID {
                return Err(GrcError::InvalidCatalog(format!("domain id {} is reserved", CUSTOM_DOMAIN_ID)));
            }
            if !domain_ids.insert(domain.id.clone()) {
                return Err(GrcError::InvalidCatalog(format!("duplicate domain {}", domain.id)));
            }
        }

        let mut framework_index = HashMap::new();
        for (idx, framework) in frameworks.iter().enumerate() {
            if framework_index.insert(framework.id.clone(), idx).is_some() {
                return Err(GrcError::InvalidCatalog(format!("duplicate framework {}", framework.id)));
            }
        }

        let mut control_index = HashMap::new();
        for (idx, control) in controls.iter().enumerate() {
            if !domain_ids.contains(&control.domain) {
                return Err(GrcError::InvalidCatalog(format!(
                    "control {} references unknown domain {}",
                    control.id, control.domain
                )));
            }
            if control_index.insert(control.id.clone(), idx).is_some() {
                return Err(GrcError::InvalidCatalog(format!("duplicate control {}", control.id)));
            }
            for mapping in &control.mappings {
                let known = framework_index
                    .get(&mapping.framework)
                    .map(|&f| frameworks[f].requirements.is_leaf(mapping.clause_id.as_str()))
                    .unwrap_or(false);
                if !known {
                    tracing::warn!(
                        control = %control.id,
                        framework = %mapping.framework,
                        clause = %mapping.clause_id,
                        "Mapping does not reference a leaf requirement"
                    );
                }
            }
        }

        Ok(Self {
            controls,
            control_index,
            frameworks,
            framework_index,
            domains,
        })
    }

    /// Build from a catalog feed
    pub fn from_feed(feed: CatalogFeed) -> GrcResult<Self> {
        let frameworks = feed
            .frameworks
            .into_iter()
            .map(|f| {
                Ok(Framework {
                    requirements: RequirementTree::from_nodes(f.requirements)?,
                    id: f.id,
                    name: f.name,
                    full_name: f.full_name,
                    color: f.color,
                })
            })
            .collect::<GrcResult<Vec<_>>>()?;
        Self::new(feed.domains, frameworks, feed.controls)
    }

    /// Parse a JSON catalog feed
    pub fn from_json(json: &str) -> GrcResult<Self> {
        let feed: CatalogFeed =
            serde_json::from_str(json).map_err(|e| GrcError::InvalidCatalog(e.to_string()))?;
        Self::from_feed(feed)
    }

    /// Load a JSON catalog feed from file
    pub fn load(path: impl AsRef<Path>) -> GrcResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&content)?;
        tracing::info!(
            "Loaded catalog: {} controls, {} frameworks, {} domains",
            catalog.controls.len(),
            catalog.frameworks.len(),
            catalog.domains.len()
        );
        Ok(catalog)
    }

    /// All controls, in declaration order
    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    /// Control by id
    pub fn control(&self, id: &str) -> Option<&Control> {
        self.control_index.get(id).map(|&idx| &self.controls[idx])
    }

    /// All frameworks, in declaration order
    pub fn frameworks(&self) -> &[Framework] {
        &self.frameworks
    }

    /// Framework by id
    pub fn framework(&self, id: &str) -> Option<&Framework> {
        self.framework_index.get(id).map(|&idx| &self.frameworks[idx])
    }

    /// Fixed domains (never includes the custom domain)
    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }
}
