//! Hot-swappable catalog with per-tenant overlays
//!
//! The base catalog and its mapping index are swapped together as one
//! `Arc`, so readers never pair a catalog with another catalog's index.
//! Tenant custom controls live in a `DashMap` overlay; each tenant's
//! extended index is derived lazily and tagged with the base version and
//! overlay it was built from.

use super::{Catalog, Control, ControlMapping, Domain, Framework, FrameworkInfo, RiskLevel, CUSTOM_DOMAIN_ID};
use crate::mapping::MappingIndex;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use grc_common::{ControlId, DomainId, GrcError, GrcResult, TenantId};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Base catalog paired with the index built from it
#[derive(Debug)]
struct BaseLayer {
    catalog: Catalog,
    index: MappingIndex,
    version: u64,
}

impl BaseLayer {
    fn new(catalog: Catalog, version: u64) -> Self {
        let index = MappingIndex::build(catalog.frameworks(), catalog.controls());
        tracing::info!(
            "Built mapping index v{}: {} controls, {} unmatched clauses",
            version,
            catalog.controls().len(),
            index.unmatched_count()
        );
        Self { catalog, index, version }
    }
}

/// Caller input for a new custom control
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomControlDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub question: String,
    /// Ignored: custom controls always land in the organization-specific domain
    #[serde(default)]
    pub domain: Option<DomainId>,
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub mappings: Vec<ControlMapping>,
    #[serde(default)]
    pub guidance: String,
    #[serde(default)]
    pub evidence_example: String,
    #[serde(default)]
    pub remediation_hint: String,
}

/// Shared catalog store
pub struct CatalogStore {
    base: ArcSwap<BaseLayer>,
    version: AtomicU64,
    custom: DashMap<TenantId, Arc<Vec<Control>>>,
    tenant_indexes: DashMap<TenantId, TenantIndex>,
}

/// Tenant index and the inputs it was derived from
struct TenantIndex {
    version: u64,
    custom: Arc<Vec<Control>>,
    index: Arc<MappingIndex>,
}

impl CatalogStore {
    /// Create store over a base catalog
    pub fn new(catalog: Catalog) -> Self {
        Self {
            base: ArcSwap::from_pointee(BaseLayer::new(catalog, 1)),
            version: AtomicU64::new(1),
            custom: DashMap::new(),
            tenant_indexes: DashMap::new(),
        }
    }

    /// Base catalog version, bumped on every reload
    #[inline]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Atomically replace the base catalog.
    ///
    /// Tenant overlays are kept; every tenant index is rebuilt on next read.
    pub fn reload(&self, catalog: Catalog) {
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        self.base.store(Arc::new(BaseLayer::new(catalog, version)));
        self.tenant_indexes.clear();
    }

    /// Catalog as seen by one tenant
    pub fn view(&self, tenant: TenantId) -> TenantCatalog {
        let base = self.base.load_full();
        let custom = self
            .custom
            .get(&tenant)
            .map(|entry| Arc::clone(entry.value()))
            .unwrap_or_default();

        let index = if custom.is_empty() {
            // No overlay: share the base index directly.
            None
        } else {
            Some(self.tenant_index(tenant, &base, &custom))
        };

        TenantCatalog { base, custom, index }
    }

    fn tenant_index(&self, tenant: TenantId, base: &Arc<BaseLayer>, custom: &Arc<Vec<Control>>) -> Arc<MappingIndex> {
        if let Some(entry) = self.tenant_indexes.get(&tenant) {
            // Overlays are replaced, never mutated, so pointer identity tracks them
            if entry.version == base.version && Arc::ptr_eq(&entry.custom, custom) {
                return Arc::clone(&entry.index);
            }
        }

        let mut index = base.index.clone();
        index.extend(custom.iter());
        let index = Arc::new(index);
        tracing::debug!(%tenant, custom = custom.len(), "Rebuilt tenant mapping index");
        self.tenant_indexes.insert(
            tenant,
            TenantIndex {
                version: base.version,
                custom: Arc::clone(custom),
                index: Arc::clone(&index),
            },
        );
        index
    }

    /// Create a custom control for `tenant`.
    ///
    /// The domain is forced to the organization-specific domain and mapping
    /// clauses are stored as given.
    pub fn add_custom(&self, tenant: TenantId, draft: CustomControlDraft) -> GrcResult<Control> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(GrcError::InvalidInput("custom control title must not be empty".into()));
        }
        if let Some(requested) = &draft.domain {
            if requested.as_str() != CUSTOM_DOMAIN_ID {
                tracing::debug!(%tenant, domain = %requested, "Ignoring requested domain for custom control");
            }
        }

        let question = if draft.question.trim().is_empty() {
            format!("Is \"{}\" implemented?", title)
        } else {
            draft.question
        };

        let control = Control {
            id: ControlId::new(format!("custom-{}", Uuid::new_v4())),
            title: title.to_string(),
            description: draft.description,
            question,
            domain: CUSTOM_DOMAIN_ID.into(),
            risk_level: draft.risk_level.unwrap_or(RiskLevel::Medium),
            mappings: draft.mappings,
            guidance: draft.guidance,
            evidence_example: draft.evidence_example,
            remediation_hint: draft.remediation_hint,
            custom: true,
        };

        {
            let mut entry = self.custom.entry(tenant).or_default();
            let mut controls = entry.value().as_ref().clone();
            controls.push(control.clone());
            *entry.value_mut() = Arc::new(controls);
        }
        self.tenant_indexes.remove(&tenant);

        tracing::info!(%tenant, control = %control.id, "Added custom control");
        Ok(control)
    }

    /// Delete one of `tenant`'s custom controls.
    ///
    /// Stored answers for it become orphans and drop out of scoring.
    pub fn remove_custom(&self, tenant: TenantId, control_id: &str) -> GrcResult<Control> {
        let base = self.base.load();
        if base.catalog.control(control_id).is_some() {
            return Err(GrcError::NotCustomControl(control_id.to_string()));
        }

        let removed = {
            let mut entry = self
                .custom
                .get_mut(&tenant)
                .ok_or_else(|| GrcError::ControlNotFound(control_id.to_string()))?;
            let pos = entry
                .value()
                .iter()
                .position(|c| c.id.as_str() == control_id)
                .ok_or_else(|| GrcError::ControlNotFound(control_id.to_string()))?;
            let mut controls = entry.value().as_ref().clone();
            let removed = controls.remove(pos);
            *entry.value_mut() = Arc::new(controls);
            removed
        };

        self.custom.remove_if(&tenant, |_, controls| controls.is_empty());
        self.tenant_indexes.remove(&tenant);

        tracing::info!(%tenant, control = %removed.id, "Removed custom control");
        Ok(removed)
    }
}

/// Point-in-time catalog view for one tenant (base + overlay)
#[derive(Debug, Clone)]
pub struct TenantCatalog {
    base: Arc<BaseLayer>,
    custom: Arc<Vec<Control>>,
    index: Option<Arc<MappingIndex>>,
}

impl TenantCatalog {
    /// Base catalog version this view was taken from
    pub fn version(&self) -> u64 {
        self.base.version
    }

    /// Base catalog
    pub fn base(&self) -> &Catalog {
        &self.base.catalog
    }

    /// Mapping index including the tenant's custom controls
    pub fn index(&self) -> &MappingIndex {
        self.index.as_deref().unwrap_or(&self.base.index)
    }

    /// All controls: base first, then custom in creation order
    pub fn controls(&self) -> impl Iterator<Item = &Control> + '_ {
        self.base.catalog.controls().iter().chain(self.custom.iter())
    }

    /// Number of controls visible to the tenant
    pub fn control_count(&self) -> usize {
        self.base.catalog.controls().len() + self.custom.len()
    }

    /// Tenant custom controls
    pub fn custom_controls(&self) -> &[Control] {
        &self.custom
    }

    /// Control by id
    pub fn control(&self, id: &str) -> Option<&Control> {
        self.base
            .catalog
            .control(id)
            .or_else(|| self.custom.iter().find(|c| c.id.as_str() == id))
    }

    /// Domains; the custom domain only once the tenant has custom controls
    pub fn domains(&self) -> Vec<Domain> {
        let mut domains = self.base.catalog.domains().to_vec();
        if !self.custom.is_empty() {
            domains.push(Domain::custom());
        }
        domains
    }

    /// Controls in one domain
    pub fn controls_in_domain(&self, domain: &str) -> Vec<&Control> {
        self.controls()
            .filter(|c| c.domain.as_str() == domain)
            .collect()
    }

    /// All frameworks
    pub fn frameworks(&self) -> &[Framework] {
        self.base.catalog.frameworks()
    }

    /// Framework by id
    pub fn framework(&self, id: &str) -> Option<&Framework> {
        self.base.catalog.framework(id)
    }

    /// Framework by id, or `FrameworkNotFound`
    pub fn require_framework(&self, id: &str) -> GrcResult<&Framework> {
        self.framework(id)
            .ok_or_else(|| GrcError::FrameworkNotFound(id.to_string()))
    }

    /// Framework listing
    pub fn framework_infos(&self) -> Vec<FrameworkInfo> {
        self.frameworks().iter().map(Framework::info).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CatalogStore {
        CatalogStore::new(Catalog::builtin().unwrap())
    }

    fn draft(title: &str) -> CustomControlDraft {
        CustomControlDraft {
            title: title.to_string(),
            domain: Some("access-control".into()),
            mappings: vec![ControlMapping::new("hipaa", "1.1.4", "")],
            ..Default::default()
        }
    }

    #[test]
    fn test_custom_control_forced_into_custom_domain() {
        let store = store();
        let tenant = Uuid::new_v4();

        let control = store.add_custom(tenant, draft("Badge audits")).unwrap();
        assert!(control.id.as_str().starts_with("custom-"));
        assert_eq!(control.domain.as_str(), CUSTOM_DOMAIN_ID);
        assert!(control.custom);
        assert_eq!(control.risk_level, RiskLevel::Medium);

        let view = store.view(tenant);
        assert_eq!(view.controls_in_domain(CUSTOM_DOMAIN_ID).len(), 1);
        assert!(view.domains().iter().any(|d| d.id.as_str() == CUSTOM_DOMAIN_ID));
        assert_eq!(view.control_count(), view.base().controls().len() + 1);
    }

    #[test]
    fn test_custom_controls_are_tenant_scoped() {
        let store = store();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let control = store.add_custom(a, draft("Badge audits")).unwrap();
        assert!(store.view(a).control(control.id.as_str()).is_some());
        assert!(store.view(b).control(control.id.as_str()).is_none());
        assert_eq!(store.view(b).domains().len(), 9);
    }

    #[test]
    fn test_custom_ids_are_unique() {
        let store = store();
        let tenant = Uuid::new_v4();
        let first = store.add_custom(tenant, draft("One")).unwrap();
        let second = store.add_custom(tenant, draft("One")).unwrap();
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_empty_title_rejected() {
        let store = store();
        let result = store.add_custom(Uuid::new_v4(), draft("   "));
        assert!(matches!(result, Err(GrcError::InvalidInput(_))));
    }

    #[test]
    fn test_tenant_index_includes_overlay() {
        let store = store();
        let tenant = Uuid::new_v4();
        assert_eq!(store.view(tenant).index().coverage("hipaa").unmapped, 2);

        let control = store.add_custom(tenant, draft("Sanction policy")).unwrap();
        let view = store.view(tenant);
        assert_eq!(view.index().coverage("hipaa").unmapped, 1);
        assert_eq!(view.index().controls_for("hipaa", "1.1.4"), &[control.id.clone()]);

        // Other tenants keep the base index
        assert_eq!(store.view(Uuid::new_v4()).index().coverage("hipaa").unmapped, 2);
    }

    #[test]
    fn test_remove_custom() {
        let store = store();
        let tenant = Uuid::new_v4();
        let control = store.add_custom(tenant, draft("Badge audits")).unwrap();

        store.remove_custom(tenant, control.id.as_str()).unwrap();
        let view = store.view(tenant);
        assert!(view.control(control.id.as_str()).is_none());
        assert_eq!(view.domains().len(), 9);
        assert_eq!(view.index().coverage("hipaa").unmapped, 2);
    }

    #[test]
    fn test_remove_rejects_builtin_and_unknown() {
        let store = store();
        let tenant = Uuid::new_v4();
        assert!(matches!(
            store.remove_custom(tenant, "AC-01"),
            Err(GrcError::NotCustomControl(_))
        ));
        assert!(matches!(
            store.remove_custom(tenant, "custom-missing"),
            Err(GrcError::ControlNotFound(_))
        ));

        let other = store.add_custom(Uuid::new_v4(), draft("Elsewhere")).unwrap();
        assert!(matches!(
            store.remove_custom(tenant, other.id.as_str()),
            Err(GrcError::ControlNotFound(_))
        ));
    }

    #[test]
    fn test_index_built_from_superseded_overlay_is_not_reused() {
        let store = store();
        let tenant = Uuid::new_v4();
        store.add_custom(tenant, draft("Sanction policy")).unwrap();

        // A reader captured the overlay, then a writer replaced it before the
        // reader cached its index.
        let base = store.base.load_full();
        let stale = store.custom.get(&tenant).map(|e| Arc::clone(e.value())).unwrap();
        let added = store.add_custom(tenant, draft("Visitor escort")).unwrap();
        let stale_index = store.tenant_index(tenant, &base, &stale);
        assert!(stale_index.controls_for("hipaa", "1.1.4").iter().all(|c| *c != added.id));

        let view = store.view(tenant);
        assert!(view.control(added.id.as_str()).is_some());
        assert!(view.index().controls_for("hipaa", "1.1.4").contains(&added.id));
        assert_eq!(view.index().requirements_for(added.id.as_str()).len(), 1);
    }

    #[test]
    fn test_reload_keeps_overlay_and_bumps_version() {
        let store = store();
        let tenant = Uuid::new_v4();
        let control = store.add_custom(tenant, draft("Badge audits")).unwrap();
        let before = store.view(tenant);

        store.reload(Catalog::builtin().unwrap());
        let after = store.view(tenant);

        assert_eq!(store.version(), 2);
        assert_eq!(before.version(), 1);
        assert_eq!(after.version(), 2);
        assert!(after.control(control.id.as_str()).is_some());
        assert_eq!(after.index().coverage("hipaa").unmapped, 1);
    }
}
