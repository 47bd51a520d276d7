//! Expired Record Sweep Task
//!
//! Background task that periodically sweeps expired records out of the
//! tables configured for it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cache::CacheService;
use crate::error::CacheError;

/// Spawns a background task that sweeps `table_ids` every `interval`.
///
/// Tables are swept one after another; a failing table is logged and does
/// not stop the others.
///
/// # Arguments
/// * `service` - Shared cache service
/// * `table_ids` - Logical ids of the tables to sweep
/// * `interval` - Pause between sweep rounds
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_sweep_task(service.clone(), vec!["sessions".into()], Duration::from_secs(60));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_sweep_task(
    service: Arc<CacheService>,
    table_ids: Vec<String>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            tables = ?table_ids,
            "Starting expired record sweep with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            for table_id in &table_ids {
                match service.delete_expired(table_id).await {
                    Ok(0) => debug!(table = %table_id, "Sweep: no expired records found"),
                    Ok(deleted) => info!(table = %table_id, deleted, "Sweep: removed expired records"),
                    Err(CacheError::SweepFailed { table, errors }) => {
                        for err in &errors {
                            error!(table = %table, error = %err, "Sweep failure");
                        }
                    }
                    Err(err) => error!(table = %table_id, error = %err, "Sweep failed"),
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;

    use crate::cache::TableResolver;
    use crate::record::{Record, RecordCodec, TypeRegistry};
    use crate::store::{MemoryHashStore, StoreOperation, WriteCondition};

    fn service_with(store: Arc<MemoryHashStore>) -> Arc<CacheService> {
        Arc::new(CacheService::new(
            store,
            RecordCodec::new(TypeRegistry::with_builtins()),
            TableResolver::default(),
        ))
    }

    async fn seed(service: &CacheService, table: &str) {
        let stale = Record::new_at(
            "stale",
            "v".to_string(),
            Some(Duration::from_secs(1)),
            Utc::now() - chrono::Duration::minutes(5),
        )
        .unwrap();
        let live = Record::new("live", "v".to_string(), None).unwrap();
        service
            .set_many(table, &[stale, live], WriteCondition::Always)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sweep_task_removes_expired_records() {
        let store = Arc::new(MemoryHashStore::new());
        let service = service_with(store.clone());
        seed(&service, "sessions").await;

        let handle = spawn_sweep_task(
            service.clone(),
            vec!["sessions".to_string()],
            Duration::from_millis(50),
        );
        tokio::time::sleep(Duration::from_millis(300)).await;
        handle.abort();

        assert_eq!(store.len("sessions").await, 1);
        assert!(service.get("sessions", "live").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweep_task_survives_failures() {
        let store = Arc::new(MemoryHashStore::new());
        let service = service_with(store.clone());
        seed(&service, "sessions").await;
        store.fail_on(StoreOperation::HashScan);

        let handle = spawn_sweep_task(
            service.clone(),
            vec!["sessions".to_string()],
            Duration::from_millis(50),
        );
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!handle.is_finished(), "Task should keep running after a failed sweep");

        store.heal();
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        assert_eq!(store.len("sessions").await, 1);
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let service = service_with(Arc::new(MemoryHashStore::new()));
        let handle = spawn_sweep_task(service, Vec::new(), Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
