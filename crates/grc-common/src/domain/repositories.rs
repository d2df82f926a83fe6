//! Repositories - Persistence contracts for tenant-owned records
//!
//! Repository pattern:
//! - Abstracts persistence details
//! - Every query is partitioned by tenant
//! - In-memory implementations for testing and development

use super::records::*;
use super::value_objects::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

/// Repository result type
pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepositoryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },
}

/// Bound a store round-trip by `limit`
pub async fn with_timeout<T, F>(limit: Duration, operation: &'static str, fut: F) -> RepoResult<T>
where
    F: Future<Output = RepoResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::debug!(operation, ?limit, "Store call timed out");
            Err(RepositoryError::Timeout {
                operation,
                elapsed: limit,
            })
        }
    }
}

/// Control Response store
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Get response for (tenant, control)
    async fn get(&self, tenant: TenantId, control: &ControlId) -> RepoResult<Option<ControlResponse>>;

    /// Insert or overwrite a response
    async fn put(&self, response: ControlResponse) -> RepoResult<()>;

    /// All responses for tenant
    async fn all_for_tenant(&self, tenant: TenantId) -> RepoResult<Vec<ControlResponse>>;
}

/// Requirement Assessment store
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    /// Get record for (tenant, framework, requirement)
    async fn get(
        &self,
        tenant: TenantId,
        framework: &FrameworkId,
        requirement: &RequirementId,
    ) -> RepoResult<Option<RequirementAssessment>>;

    /// Insert or overwrite a record
    async fn put(&self, record: RequirementAssessment) -> RepoResult<()>;

    /// All records for tenant + framework
    async fn all_for_framework(
        &self,
        tenant: TenantId,
        framework: &FrameworkId,
    ) -> RepoResult<Vec<RequirementAssessment>>;

    /// Delete all records for tenant + framework.
    ///
    /// Must be atomic: readers observe either every record or none.
    async fn delete_all(&self, tenant: TenantId, framework: &FrameworkId) -> RepoResult<usize>;
}

/// Compliance Snapshot store (append-only)
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Append snapshot
    async fn insert(&self, snapshot: ComplianceSnapshot) -> RepoResult<()>;

    /// Snapshots with `from <= taken_at <= until`, oldest first
    async fn range(
        &self,
        tenant: TenantId,
        from: Option<DateTime<Utc>>,
        until: DateTime<Utc>,
    ) -> RepoResult<Vec<ComplianceSnapshot>>;
}

/// In-memory response store
pub struct InMemoryResponseStore {
    responses: RwLock<HashMap<TenantId, HashMap<ControlId, ControlResponse>>>,
}

impl InMemoryResponseStore {
    pub fn new() -> Self {
        Self {
            responses: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryResponseStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseStore for InMemoryResponseStore {
    async fn get(&self, tenant: TenantId, control: &ControlId) -> RepoResult<Option<ControlResponse>> {
        Ok(self
            .responses
            .read()
            .get(&tenant)
            .and_then(|responses| responses.get(control))
            .cloned())
    }

    async fn put(&self, response: ControlResponse) -> RepoResult<()> {
        self.responses
            .write()
            .entry(response.tenant_id)
            .or_default()
            .insert(response.control_id.clone(), response);
        Ok(())
    }

    async fn all_for_tenant(&self, tenant: TenantId) -> RepoResult<Vec<ControlResponse>> {
        Ok(self
            .responses
            .read()
            .get(&tenant)
            .map(|responses| responses.values().cloned().collect())
            .unwrap_or_default())
    }
}

/// In-memory assessment store
pub struct InMemoryAssessmentStore {
    records: RwLock<HashMap<(TenantId, FrameworkId), HashMap<RequirementId, RequirementAssessment>>>,
}

impl InMemoryAssessmentStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryAssessmentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssessmentStore for InMemoryAssessmentStore {
    async fn get(
        &self,
        tenant: TenantId,
        framework: &FrameworkId,
        requirement: &RequirementId,
    ) -> RepoResult<Option<RequirementAssessment>> {
        Ok(self
            .records
            .read()
            .get(&(tenant, framework.clone()))
            .and_then(|records| records.get(requirement))
            .cloned())
    }

    async fn put(&self, record: RequirementAssessment) -> RepoResult<()> {
        self.records
            .write()
            .entry((record.tenant_id, record.framework_id.clone()))
            .or_default()
            .insert(record.requirement_id.clone(), record);
        Ok(())
    }

    async fn all_for_framework(
        &self,
        tenant: TenantId,
        framework: &FrameworkId,
    ) -> RepoResult<Vec<RequirementAssessment>> {
        Ok(self
            .records
            .read()
            .get(&(tenant, framework.clone()))
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_all(&self, tenant: TenantId, framework: &FrameworkId) -> RepoResult<usize> {
        // One write lock over the whole partition keeps the clear atomic.
        Ok(self
            .records
            .write()
            .remove(&(tenant, framework.clone()))
            .map(|records| records.len())
            .unwrap_or(0))
    }
}

/// In-memory snapshot store
pub struct InMemorySnapshotStore {
    snapshots: RwLock<HashMap<TenantId, Vec<ComplianceSnapshot>>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self {
            snapshots: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn insert(&self, snapshot: ComplianceSnapshot) -> RepoResult<()> {
        let mut snapshots = self.snapshots.write();
        let tenant_snapshots = snapshots.entry(snapshot.tenant_id).or_default();
        if tenant_snapshots.iter().any(|s| s.id == snapshot.id) {
            return Err(RepositoryError::Conflict(snapshot.id.to_string()));
        }
        tenant_snapshots.push(snapshot);
        Ok(())
    }

    async fn range(
        &self,
        tenant: TenantId,
        from: Option<DateTime<Utc>>,
        until: DateTime<Utc>,
    ) -> RepoResult<Vec<ComplianceSnapshot>> {
        let mut matching: Vec<_> = self
            .snapshots
            .read()
            .get(&tenant)
            .map(|snapshots| {
                snapshots
                    .iter()
                    .filter(|s| from.map_or(true, |from| s.taken_at >= from))
                    .filter(|s| s.taken_at <= until)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        matching.sort_by_key(|s| s.taken_at);
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn snapshot(tenant: TenantId, taken_at: DateTime<Utc>, score: u32) -> ComplianceSnapshot {
        ComplianceSnapshot {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            taken_at,
            overall_score: score,
            answer_counts: AnswerCounts::default(),
            framework_scores: BTreeMap::new(),
            domain_scores: BTreeMap::new(),
            digest: String::new(),
        }
    }

    #[tokio::test]
    async fn test_response_store_partitions_tenants() {
        let store = InMemoryResponseStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store.put(ControlResponse::new(a, "AC-01".into(), Answer::Yes)).await.unwrap();
        store.put(ControlResponse::new(b, "AC-01".into(), Answer::No)).await.unwrap();

        let got = store.get(a, &"AC-01".into()).await.unwrap().unwrap();
        assert_eq!(got.answer, Answer::Yes);
        assert_eq!(store.all_for_tenant(b).await.unwrap().len(), 1);
        assert!(store.all_for_tenant(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assessment_store_delete_all() {
        let store = InMemoryAssessmentStore::new();
        let tenant = Uuid::new_v4();
        let hipaa = FrameworkId::new("hipaa");
        let soc2 = FrameworkId::new("soc2");

        store.put(RequirementAssessment::new(tenant, hipaa.clone(), "1.1.1".into())).await.unwrap();
        store.put(RequirementAssessment::new(tenant, hipaa.clone(), "1.1.2".into())).await.unwrap();
        store.put(RequirementAssessment::new(tenant, soc2.clone(), "CC6.1".into())).await.unwrap();

        assert_eq!(store.delete_all(tenant, &hipaa).await.unwrap(), 2);
        assert!(store.all_for_framework(tenant, &hipaa).await.unwrap().is_empty());
        assert_eq!(store.all_for_framework(tenant, &soc2).await.unwrap().len(), 1);
        assert_eq!(store.delete_all(tenant, &hipaa).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_range() {
        let store = InMemorySnapshotStore::new();
        let tenant = Uuid::new_v4();
        let now = Utc::now();

        store.insert(snapshot(tenant, now - chrono::Duration::days(10), 40)).await.unwrap();
        store.insert(snapshot(tenant, now - chrono::Duration::days(2), 60)).await.unwrap();
        store.insert(snapshot(tenant, now - chrono::Duration::days(40), 20)).await.unwrap();

        let all = store.range(tenant, None, now).await.unwrap();
        assert_eq!(all.iter().map(|s| s.overall_score).collect::<Vec<_>>(), vec![20, 40, 60]);

        let recent = store
            .range(tenant, Some(now - chrono::Duration::days(7)), now)
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_insert_is_append_only() {
        let store = InMemorySnapshotStore::new();
        let s = snapshot(Uuid::new_v4(), Utc::now(), 50);
        store.insert(s.clone()).await.unwrap();
        assert!(matches!(store.insert(s).await, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_with_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, RepositoryError>(())
        };
        let result = with_timeout(Duration::from_millis(10), "slow op", slow).await;
        assert!(matches!(result, Err(RepositoryError::Timeout { .. })));
    }
}
