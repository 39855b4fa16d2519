//! TVDB metadata fetchers and show assembly.
//!
//! Every remote call goes through the shared [`Session`], which handles the
//! thetvdb.com/mirror routing. Responses are flattened with the tables in
//! [`fields`] before they reach the caller.

pub mod episodes;
pub mod fallback;
pub mod fields;
pub mod images;
pub mod normalize;
pub mod updates;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::notify::NotificationSink;
use crate::select::{FirstResult, SeriesSelector};
use crate::show::{ActorRecord, ShowRecord};
use crate::tvdb::{Series, TvdbApi, TvdbClient};
use fallback::Session;
use fields::{SERIES_FIELDS, SERIES_NAME};
use normalize::{DEFAULT_SEPARATOR, Field, Record, normalize, normalize_all};

/// Show fields that hold a relative artwork path.
const ARTWORK_FIELDS: [&str; 3] = ["banner", "fanart", "poster"];

/// Artwork URL template. `{}` stands for the relative image path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artwork {
    template: String,
}

impl Artwork {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn resolve(&self, path: &str) -> String {
        if self.template.contains("{}") {
            self.template.replacen("{}", path, 1)
        } else {
            format!("{}{}", self.template, path)
        }
    }
}

/// Feature flags and request settings taken from [`Config`].
#[derive(Debug, Clone)]
pub struct IndexerSettings {
    /// Overrides the show's own language when set.
    pub language: Option<String>,
    pub dvd_order: bool,
    pub episodes_enabled: bool,
    pub banners_enabled: bool,
    pub actors_enabled: bool,
    /// Only fetch this image type (`poster_thumb` also admits `poster`).
    pub image_type: Option<String>,
    pub artwork: Artwork,
}

impl From<&Config> for IndexerSettings {
    fn from(config: &Config) -> Self {
        let non_empty = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        Self {
            language: non_empty(&config.general.language),
            dvd_order: config.indexer.dvd_order,
            episodes_enabled: config.indexer.episodes_enabled,
            banners_enabled: config.indexer.banners_enabled,
            actors_enabled: config.indexer.actors_enabled,
            image_type: non_empty(&config.indexer.image_type),
            artwork: Artwork::new(config.indexer.artwork_prefix.clone()),
        }
    }
}

pub struct Indexer {
    session: Arc<Session>,
    settings: IndexerSettings,
    selector: Box<dyn SeriesSelector>,
}

impl Indexer {
    pub fn new(session: Arc<Session>, settings: IndexerSettings) -> Self {
        Self {
            session,
            settings,
            selector: Box::new(FirstResult),
        }
    }

    /// Build both TVDB clients and a fresh session from the configuration.
    pub fn from_config(config: &Config, notifier: Arc<dyn NotificationSink>) -> Result<Self> {
        let timeout = Duration::from_secs(config.indexer.request_timeout_secs);
        let primary = TvdbClient::new(&config.indexer.api_base_url, &config.indexer.api_key, timeout)?;
        let mirror = TvdbClient::new(&config.indexer.mirror_base_url, &config.indexer.api_key, timeout)?;

        let session = Session::new(Arc::new(primary), Arc::new(mirror), config.fallback, notifier);
        Ok(Self::new(Arc::new(session), IndexerSettings::from(config)))
    }

    /// Reuse an existing session, refreshing its fallback settings from `config`.
    pub fn with_session(session: Arc<Session>, config: &Config) -> Self {
        session.reconfigure(config.fallback);
        Self::new(session, IndexerSettings::from(config))
    }

    pub fn with_selector(mut self, selector: Box<dyn SeriesSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn settings(&self) -> &IndexerSettings {
        &self.settings
    }

    /// Language for requests that don't belong to a specific show.
    pub fn language(&self) -> &str {
        self.settings.language.as_deref().unwrap_or("en")
    }

    /// Search shows by name. Shows without a name in `language` are left out.
    pub async fn search(&self, query: &str, language: &str) -> Result<Vec<Record>> {
        debug!(query, language, "Searching for show");

        let results = self
            .session
            .call("search", |api| async move {
                api.search_series(query, language).await.map_err(search_error)
            })
            .await?;

        let records = normalize_all(&results, &SERIES_FIELDS, DEFAULT_SEPARATOR)
            .into_records()
            .into_iter()
            .filter(|record| record.get(SERIES_NAME).is_some_and(|name| !name.is_empty()))
            .collect();

        Ok(records)
    }

    /// Search by name and let the selector pick one show.
    pub async fn get_series(&self, name: &str) -> Result<Record> {
        let candidates = self.search(name, self.language()).await?;
        if candidates.is_empty() {
            debug!(name, "Series result returned zero");
            return Err(Error::ShowNotFound(
                "Show search returned zero results (cannot find show on TVDB)".to_string(),
            ));
        }

        self.selector.select_series(candidates)
    }

    pub async fn get_show_by_id(&self, id: u64, language: &str) -> Result<Record> {
        debug!(show_id = id, language, "Getting all show data");

        let series = self
            .session
            .call("show_by_id", |api| fetch_series(api, id, language))
            .await?;

        Ok(normalize(&series, &SERIES_FIELDS, DEFAULT_SEPARATOR))
    }

    pub async fn get_actors(&self, id: u64) -> Result<Vec<ActorRecord>> {
        debug!(show_id = id, "Getting actors");

        let actors = self
            .session
            .call("actors", |api| async move {
                api.actors(id).await.map_err(Error::into_auth_failure)
            })
            .await?;

        if actors.is_empty() {
            debug!(show_id = id, "Actors result returned zero");
        }

        Ok(actors
            .into_iter()
            .map(|actor| ActorRecord {
                id: actor.id,
                image_url: actor
                    .image
                    .filter(|image| !image.is_empty())
                    .map(|image| self.settings.artwork.resolve(&image)),
                name: actor.name,
                role: actor.role,
                sort_order: 0,
            })
            .collect())
    }

    /// Configured language first, then the show's own.
    fn show_language(&self, show_language: Option<&str>) -> Result<String> {
        match (&self.settings.language, show_language) {
            (Some(configured), _) => Ok(configured.clone()),
            (None, Some(language)) if !language.trim().is_empty() => Ok(language.to_string()),
            _ => Err(Error::Indexer(
                "No language configured and the show has none".to_string(),
            )),
        }
    }

    /// Assemble a complete show: core fields, then episodes, images and
    /// actors as enabled in the settings.
    pub async fn get_show(&self, id: u64, show_language: Option<&str>) -> Result<ShowRecord> {
        let language = self.show_language(show_language)?;
        info!(show_id = id, language = %language, "Indexing show");

        let series = self.get_show_by_id(id, &language).await?;
        let mut show = ShowRecord::new(id);

        for (key, value) in series {
            let value = match value {
                Field::Text(path) if ARTWORK_FIELDS.contains(&key.as_str()) => {
                    Field::Text(self.settings.artwork.resolve(&path))
                }
                other => other,
            };
            show.data.insert(key, value);
        }

        let imdb_id = show
            .data
            .get("imdb_id")
            .map(ToString::to_string)
            .unwrap_or_default();
        let mut externals = Record::new();
        externals.insert("imdb_id".to_string(), Field::Text(imdb_id));
        show.data.insert("externals".to_string(), Field::Record(externals));

        if self.settings.episodes_enabled {
            for episode in self.get_episodes(id, &language).await? {
                show.insert_episode(episode);
            }
        }

        if self.settings.banners_enabled {
            match self.get_images(id, &language).await {
                Ok(images) => show.images = images,
                Err(e) if e.is_auth_failure() => return Err(e),
                Err(e) => warn!(show_id = id, "Could not get images: {}", e),
            }
        }

        if self.settings.actors_enabled {
            match self.get_actors(id).await {
                Ok(actors) => show.actors = actors,
                Err(e) if e.is_auth_failure() => return Err(e),
                Err(e) => warn!(show_id = id, "Could not get actors: {}", e),
            }
        }

        Ok(show)
    }
}

fn search_error(err: Error) -> Error {
    match err.into_auth_failure() {
        Error::Api { reason, .. } => Error::ShowNotFound(format!(
            "Show search failed in getting a result with reason: {}",
            reason
        )),
        other => other,
    }
}

async fn fetch_series(api: Arc<dyn TvdbApi>, id: u64, language: &str) -> Result<Series> {
    let series = api
        .series(id, language)
        .await
        .map_err(|err| match err.into_auth_failure() {
            Error::Api { status, reason } => Error::ShowNotFound(format!(
                "Show search failed in getting a result with reason: {} ({})",
                reason, status
            )),
            other => other,
        })?;

    if series.series_name.as_deref().is_none_or(str::is_empty) {
        return Err(Error::ShowNotFoundInLanguage {
            language: language.to_string(),
        });
    }

    Ok(series)
}
