//! In-memory [`TvdbApi`] for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;

use super::TvdbApi;
use super::models::{
    Actor, Episode, EpisodePage, ImageCounts, Series, SeriesImage, SeriesSearchResult, Update,
};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Auth,
    Unavailable,
    Status(u16),
}

impl Failure {
    fn to_error(self) -> Error {
        match self {
            Failure::Auth => Error::api(401, "Unauthorized"),
            Failure::Unavailable => Error::Unavailable("connection refused".to_string()),
            Failure::Status(status) => Error::api(status, "Server error"),
        }
    }
}

#[derive(Default)]
pub struct FakeTvdb {
    pub base_url: String,
    pub search_results: Vec<SeriesSearchResult>,
    pub series: HashMap<u64, Series>,
    pub episodes: Vec<Episode>,
    pub page_size: usize,
    pub image_counts: ImageCounts,
    pub images: HashMap<String, Vec<SeriesImage>>,
    pub failing_image_types: Vec<String>,
    pub actors: Vec<Actor>,
    pub update_batches: Vec<Vec<Update>>,
    failure: Mutex<Option<Failure>>,
    calls: AtomicUsize,
    update_calls: AtomicUsize,
    credentials_cleared: AtomicUsize,
    requested_seasons: Mutex<Vec<Option<i64>>>,
}

impl FakeTvdb {
    pub fn named(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            page_size: 100,
            ..Default::default()
        }
    }

    pub fn fail_with(&self, failure: Option<Failure>) {
        *self.failure.lock().unwrap() = failure;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn credentials_cleared(&self) -> usize {
        self.credentials_cleared.load(Ordering::SeqCst)
    }

    pub fn requested_seasons(&self) -> Vec<Option<i64>> {
        self.requested_seasons.lock().unwrap().clone()
    }

    fn check(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match *self.failure.lock().unwrap() {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

fn number(value: &Option<Value>) -> Option<i64> {
    value.as_ref().and_then(|v| match v {
        Value::Number(n) => n.as_f64().map(|f| f.floor() as i64),
        Value::String(s) => s.parse::<f64>().ok().map(|f| f.floor() as i64),
        _ => None,
    })
}

#[async_trait::async_trait]
impl TvdbApi for FakeTvdb {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn search_series(&self, _name: &str, _language: &str) -> Result<Vec<SeriesSearchResult>> {
        self.check()?;
        Ok(self.search_results.clone())
    }

    async fn series(&self, id: u64, _language: &str) -> Result<Series> {
        self.check()?;
        self.series
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::api(404, "Resource not found"))
    }

    async fn episodes_page(
        &self,
        _id: u64,
        page: u32,
        _language: &str,
        aired_season: Option<i64>,
    ) -> Result<EpisodePage> {
        self.check()?;
        self.requested_seasons.lock().unwrap().push(aired_season);

        let matching: Vec<Episode> = self
            .episodes
            .iter()
            .filter(|e| aired_season.is_none() || number(&e.aired_season) == aired_season)
            .cloned()
            .collect();

        let page_size = self.page_size.max(1);
        let last_page = matching.len().div_ceil(page_size).max(1) as u32;
        let episodes = matching
            .chunks(page_size)
            .nth(page as usize - 1)
            .map(<[Episode]>::to_vec)
            .unwrap_or_default();

        Ok(EpisodePage {
            episodes,
            last_page,
        })
    }

    async fn image_counts(&self, _id: u64, _language: &str) -> Result<ImageCounts> {
        self.check()?;
        Ok(self.image_counts.clone())
    }

    async fn images(&self, _id: u64, key_type: &str, _language: &str) -> Result<Vec<SeriesImage>> {
        self.check()?;
        if self.failing_image_types.iter().any(|t| t == key_type) {
            return Err(Error::api(500, "Image query failed"));
        }
        Ok(self.images.get(key_type).cloned().unwrap_or_default())
    }

    async fn actors(&self, _id: u64) -> Result<Vec<Actor>> {
        self.check()?;
        Ok(self.actors.clone())
    }

    async fn updated_since(&self, _from_time: i64) -> Result<Vec<Update>> {
        self.check()?;
        let call = self.update_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.update_batches.get(call).cloned().unwrap_or_default())
    }

    fn clear_credentials(&self) {
        self.credentials_cleared.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn series(id: u64, name: Option<&str>) -> Series {
    Series {
        id,
        series_name: name.map(String::from),
        ..Default::default()
    }
}

pub fn search_result(id: u64, name: Option<&str>) -> SeriesSearchResult {
    SeriesSearchResult {
        id,
        series_name: name.map(String::from),
        ..Default::default()
    }
}

pub fn episode(id: u64, season: Value, number: Value) -> Episode {
    Episode {
        id,
        aired_season: Some(season),
        aired_episode_number: Some(number),
        episode_name: Some(format!("Episode {}", id)),
        ..Default::default()
    }
}

pub fn update(id: u64, last_updated: i64) -> Update {
    Update { id, last_updated }
}
