use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, warn};

use super::Indexer;
use super::episodes::number;
use super::fields::episode as keys;
use crate::error::{Error, Result};
use crate::tvdb::TvdbApi;

impl Indexer {
    /// Ids of shows updated since `from_time` (epoch seconds).
    ///
    /// Polls at most `weeks` times, each poll starting at the newest update of
    /// the previous one. With a non-empty `filter`, only ids found in it are
    /// returned, in filter order. An empty filter returns every updated id.
    pub async fn get_last_updated_series(
        &self,
        from_time: i64,
        weeks: u32,
        filter: Option<&[u64]>,
    ) -> Result<Vec<u64>> {
        let updated = self
            .session
            .call("updates", |api| poll_updates(api, from_time, weeks))
            .await?;

        let Some(filter) = filter.filter(|ids| !ids.is_empty()) else {
            return Ok(updated);
        };

        let updated: BTreeSet<u64> = updated.into_iter().collect();
        Ok(filter
            .iter()
            .copied()
            .filter(|id| updated.contains(id))
            .collect())
    }

    /// Seasons of each show with an episode changed after `from_time`.
    ///
    /// Downloads every episode of every show.
    pub async fn get_last_updated_seasons(
        &self,
        show_ids: &[u64],
        from_time: i64,
    ) -> Result<BTreeMap<u64, Vec<i64>>> {
        let mut updates = BTreeMap::new();

        for &show_id in show_ids {
            debug!(show_id, "Getting episodes for season updates");
            let records = self.download_episodes(show_id, &[], self.language()).await?;

            let mut seasons = BTreeSet::new();
            for record in &records {
                let (Some(season), Some(_)) = (number(record, keys::SEASON), number(record, keys::EPISODE))
                else {
                    warn!(
                        show_id,
                        season = ?record.get(keys::SEASON),
                        episode = ?record.get(keys::EPISODE),
                        "Episode has incomplete information, the season or episode number is missing"
                    );
                    continue;
                };

                if number(record, keys::LAST_UPDATED).is_some_and(|updated| updated > from_time) {
                    seasons.insert(season);
                }
            }

            updates.insert(show_id, seasons.into_iter().collect());
        }

        Ok(updates)
    }
}

async fn poll_updates(api: Arc<dyn TvdbApi>, mut from_time: i64, weeks: u32) -> Result<Vec<u64>> {
    let mut ids = Vec::new();

    for _ in 0..weeks {
        let updates = api.updated_since(from_time).await.map_err(update_error)?;
        let Some(newest) = updates.iter().map(|u| u.last_updated).max() else {
            break;
        };

        from_time = newest;
        ids.extend(updates.iter().map(|u| u.id));
    }

    Ok(ids)
}

fn update_error(err: Error) -> Error {
    match err.into_auth_failure() {
        auth @ Error::AuthFailed(_) => auth,
        other => Error::Unavailable(format!("Error connecting to Tvdb api. Caused by: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::tests::single;
    use crate::tvdb::fake::{self, Failure, FakeTvdb};
    use serde_json::json;

    fn tvdb() -> FakeTvdb {
        let mut tvdb = FakeTvdb::named("primary");
        tvdb.update_batches = vec![
            vec![fake::update(1, 100), fake::update(2, 150)],
            vec![fake::update(3, 200)],
            vec![],
            vec![fake::update(4, 300)],
        ];
        tvdb
    }

    #[tokio::test]
    async fn test_polls_until_weeks_or_empty() {
        let (indexer, primary) = single(tvdb());
        assert_eq!(
            indexer.get_last_updated_series(0, 1, None).await.unwrap(),
            vec![1, 2]
        );

        let (indexer, _) = single(tvdb());
        // Stops at the empty third batch.
        assert_eq!(
            indexer.get_last_updated_series(0, 10, None).await.unwrap(),
            vec![1, 2, 3]
        );
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn test_filter() {
        let (indexer, _) = single(tvdb());
        let ids = indexer
            .get_last_updated_series(0, 2, Some(&[3, 9, 1]))
            .await
            .unwrap();
        assert_eq!(ids, vec![3, 1]);

        let (indexer, _) = single(tvdb());
        let ids = indexer
            .get_last_updated_series(0, 2, Some(&[]))
            .await
            .unwrap();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_update_errors() {
        let tvdb = FakeTvdb::named("primary");
        tvdb.fail_with(Some(Failure::Status(503)));
        let (indexer, _) = single(tvdb);
        assert!(matches!(
            indexer.get_last_updated_series(0, 1, None).await,
            Err(Error::Unavailable(_))
        ));

        let tvdb = FakeTvdb::named("primary");
        tvdb.fail_with(Some(Failure::Auth));
        let (indexer, _) = single(tvdb);
        assert!(matches!(
            indexer.get_last_updated_series(0, 1, None).await,
            Err(Error::AuthFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_updated_seasons() {
        let mut tvdb = FakeTvdb::named("primary");
        let mut episodes = vec![
            fake::episode(1, json!(1), json!(1)),
            fake::episode(2, json!(2), json!(1)),
            fake::episode(3, json!(2), json!(2)),
            fake::episode(4, json!(3), json!(1)),
            fake::episode(5, json!(4), json!(null)),
        ];
        let stamps = [50, 150, 200, 100, 500];
        for (episode, stamp) in episodes.iter_mut().zip(stamps) {
            episode.last_updated = Some(stamp);
        }
        tvdb.episodes = episodes;
        let (indexer, _) = single(tvdb);

        let updates = indexer.get_last_updated_seasons(&[76156], 100).await.unwrap();
        assert_eq!(updates.get(&76156), Some(&vec![2]));
    }
}
