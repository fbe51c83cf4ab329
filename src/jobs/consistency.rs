//! Background job: registry consistency audit.
//!
//! Runs hourly. The transactional approve path cannot leave an approved
//! application without a provider profile, but out-of-band writes (support
//! tooling, manual SQL) still can; the audit surfaces any divergence as an
//! admin notification. It also reports applications pending longer than the
//! configured threshold and sweeps expired local cache entries.

use std::time::Duration;

use tokio::time;

use crate::cache::QueryCache;
use crate::store::postgres::PgStore;

/// Spawn the audit task. Call this once at startup.
pub fn spawn(store: PgStore, cache: QueryCache, stale_pending_days: i64) {
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            let evicted = cache.evict_expired();
            if evicted > 0 {
                tracing::debug!(evicted, "evicted expired cache entries");
            }
            if let Err(e) = audit_registries(&store, stale_pending_days).await {
                tracing::error!("consistency audit failed: {}", e);
            }
        }
    });
}

async fn audit_registries(store: &PgStore, stale_pending_days: i64) -> anyhow::Result<()> {
    let orphaned = store.count_approved_without_profile().await?;
    if orphaned > 0 {
        tracing::error!(
            count = orphaned,
            "approved applications without a provider profile — registries \
             were modified out of band"
        );
        store
            .create_notification(
                "registry_divergence",
                "Approved applications missing provider profiles",
                Some("Manual reconciliation required; see service logs."),
                Some(serde_json::json!({ "count": orphaned })),
            )
            .await?;
    }

    let stale = store.count_stale_pending(stale_pending_days).await?;
    if stale > 0 {
        tracing::warn!(
            count = stale,
            threshold_days = stale_pending_days,
            "applications pending past the review threshold"
        );
    }

    Ok(())
}
