//! Audit Trail (Tamper-Evident)
//!
//! One hash chain per tenant. Each event hashes its own fields together
//! with the previous event's hash, so editing or dropping any event breaks
//! every later link.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use grc_common::{GrcError, GrcResult, TenantId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

const GENESIS: &str = "genesis";

/// Audit trail with per-tenant hash chains
pub struct AuditTrail {
    chains: DashMap<TenantId, Vec<AuditEvent>>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self {
            chains: DashMap::new(),
        }
    }

    /// Append an event to the tenant's chain
    pub fn log(
        &self,
        tenant: TenantId,
        event_type: AuditEventType,
        target: impl Into<String>,
        details: impl Into<String>,
    ) -> AuditEvent {
        let mut chain = self.chains.entry(tenant).or_default();
        let prev_hash = chain
            .last()
            .map(|e| e.hash.clone())
            .unwrap_or_else(|| GENESIS.to_string());

        let event = AuditEvent::new(tenant, event_type, target.into(), details.into(), prev_hash);
        chain.push(event.clone());
        tracing::debug!(%tenant, event_type = ?event.event_type, target = %event.target, "Audit event");
        event
    }

    /// Events for a tenant, oldest first
    pub fn events(&self, tenant: TenantId, filter: Option<&AuditFilter>) -> Vec<AuditEvent> {
        let Some(chain) = self.chains.get(&tenant) else {
            return Vec::new();
        };
        match filter {
            Some(f) => chain.iter().filter(|e| f.matches(e)).cloned().collect(),
            None => chain.clone(),
        }
    }

    /// Number of events for a tenant
    pub fn len(&self, tenant: TenantId) -> usize {
        self.chains.get(&tenant).map_or(0, |chain| chain.len())
    }

    /// Verify a tenant's chain
    pub fn verify_integrity(&self, tenant: TenantId) -> IntegrityResult {
        match self.chains.get(&tenant) {
            Some(chain) => verify_chain(&chain),
            None => verify_chain(&[]),
        }
    }

    /// Export a tenant's chain
    pub fn export(&self, tenant: TenantId, format: ExportFormat) -> GrcResult<String> {
        let events = self.events(tenant, None);
        match format {
            ExportFormat::Json => serde_json::to_string_pretty(&events)
                .map_err(|e| GrcError::InvalidInput(format!("audit export failed: {}", e))),
            ExportFormat::Csv => Ok(to_csv(&events)),
        }
    }

    #[cfg(test)]
    fn tamper(&self, tenant: TenantId, index: usize, details: &str) {
        if let Some(mut chain) = self.chains.get_mut(&tenant) {
            chain[index].details = details.to_string();
        }
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk a chain from genesis
pub fn verify_chain(events: &[AuditEvent]) -> IntegrityResult {
    let mut prev_hash = GENESIS.to_string();
    let mut checked_count = 0;

    for event in events {
        if event.prev_hash != prev_hash {
            return IntegrityResult {
                valid: false,
                checked_count,
                error: Some(format!("Hash chain broken at event {}", event.id)),
            };
        }
        if event.compute_hash() != event.hash {
            return IntegrityResult {
                valid: false,
                checked_count,
                error: Some(format!("Event {} hash mismatch", event.id)),
            };
        }
        prev_hash = event.hash.clone();
        checked_count += 1;
    }

    IntegrityResult {
        valid: true,
        checked_count,
        error: None,
    }
}

fn to_csv(events: &[AuditEvent]) -> String {
    let mut csv = "id,timestamp,event_type,target,details,hash\n".to_string();
    for e in events {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            e.id,
            e.timestamp.to_rfc3339(),
            e.event_type.as_str(),
            csv_field(&e.target),
            csv_field(&e.details),
            e.hash
        ));
    }
    csv
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Audit event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub target: String,
    pub details: String,
    pub prev_hash: String,
    pub hash: String,
}

impl AuditEvent {
    fn new(
        tenant_id: TenantId,
        event_type: AuditEventType,
        target: String,
        details: String,
        prev_hash: String,
    ) -> Self {
        let mut event = Self {
            id: Uuid::new_v4(),
            tenant_id,
            timestamp: Utc::now(),
            event_type,
            target,
            details,
            prev_hash,
            hash: String::new(),
        };
        event.hash = event.compute_hash();
        event
    }

    fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.id.as_bytes());
        hasher.update(self.tenant_id.as_bytes());
        for field in [
            self.timestamp.to_rfc3339().as_str(),
            self.event_type.as_str(),
            self.target.as_str(),
            self.details.as_str(),
            self.prev_hash.as_str(),
        ] {
            // Length prefix keeps field boundaries unambiguous
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// Mutation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    ControlAnswered,
    CustomControlAdded,
    CustomControlRemoved,
    StatusRecorded,
    AddressableDecisionRecorded,
    EvidenceAttached,
    EvidenceDetached,
    NoteAdded,
    RequirementSkipped,
    AssessmentReset,
    SnapshotCreated,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ControlAnswered => "control_answered",
            Self::CustomControlAdded => "custom_control_added",
            Self::CustomControlRemoved => "custom_control_removed",
            Self::StatusRecorded => "status_recorded",
            Self::AddressableDecisionRecorded => "addressable_decision_recorded",
            Self::EvidenceAttached => "evidence_attached",
            Self::EvidenceDetached => "evidence_detached",
            Self::NoteAdded => "note_added",
            Self::RequirementSkipped => "requirement_skipped",
            Self::AssessmentReset => "assessment_reset",
            Self::SnapshotCreated => "snapshot_created",
        }
    }
}

/// Audit filter
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub event_type: Option<AuditEventType>,
    /// Substring match on the target
    pub target: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl AuditFilter {
    fn matches(&self, event: &AuditEvent) -> bool {
        if self.event_type.is_some_and(|t| t != event.event_type) {
            return false;
        }
        if let Some(target) = &self.target {
            if !event.target.contains(target.as_str()) {
                return false;
            }
        }
        if self.start_time.is_some_and(|s| event.timestamp < s) {
            return false;
        }
        if self.end_time.is_some_and(|e| event.timestamp > e) {
            return false;
        }
        true
    }
}

/// Integrity check result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityResult {
    pub valid: bool,
    pub checked_count: usize,
    pub error: Option<String>,
}

/// Export format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Json,
    Csv,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_verifies() {
        let trail = AuditTrail::new();
        let tenant = Uuid::new_v4();
        trail.log(tenant, AuditEventType::ControlAnswered, "AC-01", "yes");
        trail.log(tenant, AuditEventType::StatusRecorded, "hipaa/1.1.1", "compliant");
        trail.log(tenant, AuditEventType::SnapshotCreated, "snapshot", "score 80");

        let result = trail.verify_integrity(tenant);
        assert!(result.valid);
        assert_eq!(result.checked_count, 3);

        let events = trail.events(tenant, None);
        assert_eq!(events[0].prev_hash, GENESIS);
        assert_eq!(events[1].prev_hash, events[0].hash);
    }

    #[test]
    fn test_tampering_detected() {
        let trail = AuditTrail::new();
        let tenant = Uuid::new_v4();
        trail.log(tenant, AuditEventType::ControlAnswered, "AC-01", "no");
        trail.log(tenant, AuditEventType::ControlAnswered, "AC-02", "yes");

        trail.tamper(tenant, 0, "yes");
        let result = trail.verify_integrity(tenant);
        assert!(!result.valid);
        assert_eq!(result.checked_count, 0);
        assert!(result.error.unwrap().contains("hash mismatch"));
    }

    #[test]
    fn test_hash_separates_target_from_details() {
        let event = AuditEvent::new(
            Uuid::new_v4(),
            AuditEventType::NoteAdded,
            "hipaa/1.1.1|x".into(),
            "note".into(),
            GENESIS.into(),
        );
        let mut shifted = event.clone();
        shifted.target = "hipaa/1.1.1".into();
        shifted.details = "x|note".into();

        assert_ne!(event.compute_hash(), shifted.compute_hash());
        assert_eq!(event.compute_hash(), event.hash);
    }

    #[test]
    fn test_chains_are_per_tenant() {
        let trail = AuditTrail::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        trail.log(a, AuditEventType::ControlAnswered, "AC-01", "yes");

        assert_eq!(trail.len(a), 1);
        assert_eq!(trail.len(b), 0);
        assert!(trail.events(b, None).is_empty());
        assert!(trail.verify_integrity(b).valid);
    }

    #[test]
    fn test_filter() {
        let trail = AuditTrail::new();
        let tenant = Uuid::new_v4();
        trail.log(tenant, AuditEventType::ControlAnswered, "AC-01", "yes");
        trail.log(tenant, AuditEventType::NoteAdded, "hipaa/1.1.1", "note");
        trail.log(tenant, AuditEventType::ControlAnswered, "CR-01", "no");

        let filter = AuditFilter {
            event_type: Some(AuditEventType::ControlAnswered),
            ..Default::default()
        };
        assert_eq!(trail.events(tenant, Some(&filter)).len(), 2);

        let filter = AuditFilter {
            target: Some("hipaa".into()),
            ..Default::default()
        };
        assert_eq!(trail.events(tenant, Some(&filter)).len(), 1);
    }

    #[test]
    fn test_export() {
        let trail = AuditTrail::new();
        let tenant = Uuid::new_v4();
        trail.log(tenant, AuditEventType::NoteAdded, "hipaa/1.1.1", "reviewed, \"ok\"");

        let csv = trail.export(tenant, ExportFormat::Csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("id,timestamp,event_type,target,details,hash"));
        assert!(lines.next().unwrap().contains("\"reviewed, \"\"ok\"\"\""));

        let json = trail.export(tenant, ExportFormat::Json).unwrap();
        let parsed: Vec<AuditEvent> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(verify_chain(&parsed).valid);
    }
}
