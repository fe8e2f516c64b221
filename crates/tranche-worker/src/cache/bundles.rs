//! Local copy of the worker's active bundles

use tranche_common::types::{ActiveBundle, ActiveBundles};

use super::{to_u32, LocalCache};
use crate::error::Result;

#[derive(sqlx::FromRow)]
struct BundleRow {
    sub_region: String,
    bundle_number: i64,
    count: i64,
}

impl TryFrom<BundleRow> for ActiveBundle {
    type Error = crate::error::WorkerError;

    fn try_from(row: BundleRow) -> Result<Self> {
        Ok(ActiveBundle {
            sub_region: row.sub_region,
            bundle_number: to_u32(row.bundle_number, "bundle_number")?,
            count: to_u32(row.count, "count")?,
        })
    }
}

pub(super) async fn fetch_active_bundle<'e, E>(
    executor: E,
    sub_region: &str,
) -> Result<Option<ActiveBundle>>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, BundleRow>(
        "SELECT sub_region, bundle_number, count FROM active_bundles WHERE sub_region = ?1",
    )
    .bind(sub_region.trim())
    .fetch_optional(executor)
    .await?;
    row.map(ActiveBundle::try_from).transpose()
}

/// Combine the local map with the one held remotely.
///
/// The remote map decides which bundles exist. When both sides hold the same
/// bundle of a sub-region, the larger count wins, so a count update that
/// never reached the server cannot move the id sequence backwards.
pub fn merge_active_bundles(local: &ActiveBundles, remote: &ActiveBundles) -> ActiveBundles {
    remote
        .iter()
        .map(|(key, remote_bundle)| {
            let local_bundle = local
                .values()
                .find(|b| b.sub_region.eq_ignore_ascii_case(&remote_bundle.sub_region));
            let count = match local_bundle {
                Some(l) if l.bundle_number == remote_bundle.bundle_number => {
                    l.count.max(remote_bundle.count)
                },
                _ => remote_bundle.count,
            };
            (
                key.clone(),
                ActiveBundle {
                    count,
                    ..remote_bundle.clone()
                },
            )
        })
        .collect()
}

impl LocalCache {
    pub async fn active_bundles(&self) -> Result<ActiveBundles> {
        let rows = sqlx::query_as::<_, BundleRow>(
            "SELECT sub_region, bundle_number, count FROM active_bundles ORDER BY sub_region",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                let bundle = ActiveBundle::try_from(row)?;
                Ok((bundle.sub_region.clone(), bundle))
            })
            .collect()
    }

    /// Active bundle of a sub-region; the name is matched case-insensitively.
    pub async fn active_bundle(&self, sub_region: &str) -> Result<Option<ActiveBundle>> {
        fetch_active_bundle(&self.pool, sub_region).await
    }

    pub async fn put_active_bundle(&self, bundle: &ActiveBundle) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO active_bundles (sub_region, bundle_number, count)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(sub_region) DO UPDATE SET
                sub_region = excluded.sub_region,
                bundle_number = excluded.bundle_number,
                count = excluded.count
            "#,
        )
        .bind(bundle.sub_region.trim())
        .bind(i64::from(bundle.bundle_number))
        .bind(i64::from(bundle.count))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove_active_bundle(&self, sub_region: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM active_bundles WHERE sub_region = ?1")
            .bind(sub_region.trim())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the whole local map.
    pub async fn replace_active_bundles(&self, bundles: &ActiveBundles) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM active_bundles")
            .execute(&mut *tx)
            .await?;
        for bundle in bundles.values() {
            sqlx::query(
                "INSERT INTO active_bundles (sub_region, bundle_number, count) VALUES (?1, ?2, ?3)",
            )
            .bind(bundle.sub_region.trim())
            .bind(i64::from(bundle.bundle_number))
            .bind(i64::from(bundle.count))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Refresh the local map from the remote one (see
    /// [`merge_active_bundles`]) and return the result.
    pub async fn refresh_active_bundles(&self, remote: &ActiveBundles) -> Result<ActiveBundles> {
        let local = self.active_bundles().await?;
        let merged = merge_active_bundles(&local, remote);
        self.replace_active_bundles(&merged).await?;
        Ok(merged)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn bundle(sub_region: &str, number: u32, count: u32) -> ActiveBundle {
        ActiveBundle {
            sub_region: sub_region.into(),
            bundle_number: number,
            count,
        }
    }

    fn map(bundles: &[ActiveBundle]) -> ActiveBundles {
        bundles
            .iter()
            .map(|b| (b.sub_region.clone(), b.clone()))
            .collect()
    }

    #[test]
    fn test_merge_keeps_larger_count_for_same_bundle() {
        let local = map(&[bundle("Paithan", 2, 40), bundle("Sillod", 1, 10)]);
        let remote = map(&[bundle("Paithan", 2, 38), bundle("Kannad", 7, 0)]);

        let merged = merge_active_bundles(&local, &remote);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["Paithan"].count, 40);
        assert_eq!(merged["Kannad"], bundle("Kannad", 7, 0));
        assert!(!merged.contains_key("Sillod"));
    }

    #[test]
    fn test_merge_takes_remote_for_reassigned_bundle() {
        let local = map(&[bundle("Paithan", 2, 120)]);
        let remote = map(&[bundle("paithan", 9, 0)]);
        let merged = merge_active_bundles(&local, &remote);
        assert_eq!(merged["paithan"], bundle("paithan", 9, 0));
    }

    #[tokio::test]
    async fn test_active_bundle_round_trip_and_case_insensitive_lookup() {
        let cache = LocalCache::in_memory().await.unwrap();
        cache.put_active_bundle(&bundle("Phulambri", 3, 0)).await.unwrap();
        cache.put_active_bundle(&bundle("Phulambri", 3, 5)).await.unwrap();

        assert_eq!(
            cache.active_bundle("PHULAMBRI").await.unwrap(),
            Some(bundle("Phulambri", 3, 5))
        );
        assert!(cache.remove_active_bundle("phulambri").await.unwrap());
        assert!(!cache.remove_active_bundle("phulambri").await.unwrap());
        assert!(cache.active_bundles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_replaces_local_map() {
        let cache = LocalCache::in_memory().await.unwrap();
        cache.put_active_bundle(&bundle("Sillod", 1, 12)).await.unwrap();
        cache.put_active_bundle(&bundle("Kannad", 4, 3)).await.unwrap();

        let remote = map(&[bundle("Sillod", 1, 10)]);
        let merged = cache.refresh_active_bundles(&remote).await.unwrap();

        assert_eq!(merged["Sillod"].count, 12);
        assert_eq!(cache.active_bundles().await.unwrap(), merged);
    }
}
