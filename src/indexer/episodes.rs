use std::sync::Arc;

use tracing::{debug, warn};

use super::fields::{SERIES_FIELDS, episode as keys};
use super::normalize::{DEFAULT_SEPARATOR, Field, Record, normalize_all};
use super::{Artwork, Indexer};
use crate::error::{Error, Result};
use crate::sanitize;
use crate::show::EpisodeRecord;
use crate::tvdb::{Episode, TvdbApi};

impl Indexer {
    /// Download every episode of a show, or only those of `seasons` when
    /// non-empty, and normalize them as one batch.
    pub async fn download_episodes(
        &self,
        id: u64,
        seasons: &[i64],
        language: &str,
    ) -> Result<Vec<Record>> {
        debug!(show_id = id, ?seasons, "Getting episodes");

        let episodes = self
            .session
            .call("episodes", |api| fetch_episodes(api, id, seasons, language))
            .await?;

        Ok(normalize_all(&episodes, &SERIES_FIELDS, DEFAULT_SEPARATOR).into_records())
    }

    /// All episodes of a show, numbered by the configured ordering.
    pub async fn get_episodes(&self, id: u64, language: &str) -> Result<Vec<EpisodeRecord>> {
        let records = self.download_episodes(id, &[], language).await?;
        Ok(resolve_episodes(
            id,
            records,
            self.settings.dvd_order,
            &self.settings.artwork,
        ))
    }
}

async fn fetch_episodes(
    api: Arc<dyn TvdbApi>,
    id: u64,
    seasons: &[i64],
    language: &str,
) -> Result<Vec<Episode>> {
    let search_type = if seasons.is_empty() {
        "full".to_string()
    } else {
        format!("season {:?}", seasons)
    };

    let filters: Vec<Option<i64>> = if seasons.is_empty() {
        vec![None]
    } else {
        seasons.iter().copied().map(Some).collect()
    };

    let mut results = Vec::new();
    for season in filters {
        // Each page tells us how many pages there are.
        let mut page = 1;
        let mut last = 1;
        while page <= last {
            let paged = api
                .episodes_page(id, page, language, season)
                .await
                .map_err(|e| episode_error(e, &search_type))?;
            results.extend(paged.episodes);
            last = paged.last_page;
            page += 1;
        }
    }

    if results.is_empty() {
        debug!(show_id = id, "Series results incomplete");
        return Err(Error::ShowIncomplete(format!(
            "Show episode search returned incomplete results, could not get any episodes. Did a {} search.",
            search_type
        )));
    }

    Ok(results)
}

fn episode_error(err: Error, search_type: &str) -> Error {
    match err.into_auth_failure() {
        Error::Api { status, reason } => Error::ShowIncomplete(format!(
            "Show episode search exception, could not get any episodes. Did a {} search. Exception: {} ({})",
            search_type, reason, status
        )),
        Error::Network(e) => Error::Unavailable(format!("Error connecting to Tvdb api. Caused by: {}", e)),
        other => other,
    }
}

/// Season or episode number as an integer. TVDB sometimes sends `"2.0"`.
pub(crate) fn number(record: &Record, key: &str) -> Option<i64> {
    record
        .get(key)
        .and_then(Field::as_f64)
        .filter(|n| n.is_finite())
        .map(|n| n.floor() as i64)
}

/// Pick the season/episode pair for each record and clean up its fields.
/// Episodes without usable numbers are skipped.
pub fn resolve_episodes(
    show_id: u64,
    records: Vec<Record>,
    dvd_order: bool,
    artwork: &Artwork,
) -> Vec<EpisodeRecord> {
    let mut episodes = Vec::with_capacity(records.len());

    for record in records {
        let has_dvd = record.contains_key(keys::DVD_SEASON) && record.contains_key(keys::DVD_EPISODE);

        let (season_key, episode_key) = if dvd_order && has_dvd {
            (keys::DVD_SEASON, keys::DVD_EPISODE)
        } else {
            if dvd_order {
                warn!(
                    show_id,
                    season = ?record.get(keys::SEASON),
                    episode = ?record.get(keys::EPISODE),
                    "Episode doesn't have DVD order available, falling back to aired order"
                );
            }
            (keys::SEASON, keys::EPISODE)
        };

        let (Some(season), Some(episode)) = (number(&record, season_key), number(&record, episode_key))
        else {
            warn!(
                show_id,
                season = ?record.get(season_key),
                episode = ?record.get(episode_key),
                "Episode has incomplete information, the season or episode number is missing"
            );
            continue;
        };

        let fields = record
            .into_iter()
            .map(|(key, value)| {
                let key = key.to_lowercase();
                let value = match value {
                    Field::Text(path) if key == keys::FILENAME => Field::Text(artwork.resolve(&path)),
                    Field::Text(text) => Field::Text(sanitize::clean(&text)),
                    other => other,
                };
                (key, value)
            })
            .collect();

        episodes.push(EpisodeRecord {
            season,
            episode,
            fields,
        });
    }

    episodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::tests::single;
    use crate::tvdb::fake::{self, Failure, FakeTvdb};
    use serde_json::json;

    fn artwork() -> Artwork {
        Artwork::new("https://thetvdb.com/banners/{}")
    }

    fn record(pairs: &[(&str, Field)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn text(s: &str) -> Field {
        Field::Text(s.to_string())
    }

    #[test]
    fn test_float_strings_are_truncated() {
        let records = vec![record(&[
            ("seasonnumber", text("2.0")),
            ("episodenumber", text("5.0")),
        ])];
        let episodes = resolve_episodes(1, records, false, &artwork());
        assert_eq!(episodes.len(), 1);
        assert_eq!((episodes[0].season, episodes[0].episode), (2, 5));
    }

    #[test]
    fn test_dvd_order_with_aired_fallback() {
        let records = vec![
            record(&[
                ("seasonnumber", Field::Int(1)),
                ("episodenumber", Field::Int(3)),
                ("dvd_season", Field::Float(1.0)),
                ("dvd_episodenumber", Field::Float(2.0)),
            ]),
            record(&[
                ("seasonnumber", Field::Int(1)),
                ("episodenumber", Field::Int(4)),
                ("dvd_season", Field::Int(1)),
            ]),
        ];

        let dvd = resolve_episodes(1, records.clone(), true, &artwork());
        assert_eq!((dvd[0].season, dvd[0].episode), (1, 2));
        assert_eq!((dvd[1].season, dvd[1].episode), (1, 4));

        let aired = resolve_episodes(1, records, false, &artwork());
        assert_eq!((aired[0].season, aired[0].episode), (1, 3));
    }

    #[test]
    fn test_bad_numbers_skip_only_that_episode() {
        let records = vec![
            record(&[("seasonnumber", Field::Int(1))]),
            record(&[("seasonnumber", text("abc")), ("episodenumber", Field::Int(1))]),
            record(&[("seasonnumber", Field::Int(1)), ("episodenumber", Field::Int(2))]),
        ];
        let episodes = resolve_episodes(1, records, false, &artwork());
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].episode, 2);
    }

    #[test]
    fn test_fields_are_cleaned() {
        let records = vec![record(&[
            ("seasonnumber", Field::Int(1)),
            ("episodenumber", Field::Int(1)),
            ("filename", text("episodes/76156/184602.jpg")),
            ("episodename", text(" My First Day &amp; Night ")),
            ("Overview", text("J.D. starts")),
        ])];
        let episode = &resolve_episodes(1, records, false, &artwork())[0];
        assert_eq!(
            episode.fields.get("filename"),
            Some(&text("https://thetvdb.com/banners/episodes/76156/184602.jpg"))
        );
        assert_eq!(episode.fields.get("episodename"), Some(&text("My First Day & Night")));
        assert!(episode.fields.contains_key("overview"));
    }

    #[tokio::test]
    async fn test_pages_are_accumulated() {
        let mut tvdb = FakeTvdb::named("primary");
        tvdb.page_size = 2;
        tvdb.episodes = (1..=5)
            .map(|n| fake::episode(n, json!(1), json!(n)))
            .collect();
        let (indexer, primary) = single(tvdb);

        let episodes = indexer.get_episodes(76156, "en").await.unwrap();
        assert_eq!(episodes.len(), 5);
        assert_eq!(primary.calls(), 3);
        assert_eq!(
            episodes[0].fields.get("episodename"),
            Some(&text("Episode 1"))
        );
    }

    #[tokio::test]
    async fn test_season_filters_are_fetched_separately() {
        let mut tvdb = FakeTvdb::named("primary");
        tvdb.episodes = vec![
            fake::episode(1, json!(1), json!(1)),
            fake::episode(2, json!(2), json!(1)),
            fake::episode(3, json!(3), json!(1)),
        ];
        let (indexer, primary) = single(tvdb);

        let records = indexer.download_episodes(76156, &[1, 3], "en").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(primary.requested_seasons(), vec![Some(1), Some(3)]);
    }

    #[tokio::test]
    async fn test_no_episodes_is_incomplete() {
        let (indexer, _) = single(FakeTvdb::named("primary"));
        let err = indexer.get_episodes(76156, "en").await.unwrap_err();
        assert!(matches!(err, Error::ShowIncomplete(ref msg) if msg.contains("full search")));
    }

    #[tokio::test]
    async fn test_errors_are_mapped() {
        let tvdb = FakeTvdb::named("primary");
        tvdb.fail_with(Some(Failure::Status(500)));
        let (indexer, _) = single(tvdb);
        let err = indexer.download_episodes(1, &[2], "en").await.unwrap_err();
        assert!(matches!(err, Error::ShowIncomplete(ref msg) if msg.contains("season [2]")));

        let tvdb = FakeTvdb::named("primary");
        tvdb.fail_with(Some(Failure::Auth));
        let (indexer, _) = single(tvdb);
        assert!(matches!(
            indexer.get_episodes(1, "en").await,
            Err(Error::AuthFailed(_))
        ));
    }
}
