use crate::error::Result;

mod client;
#[cfg(test)]
pub(crate) mod fake;
pub mod models;

pub use client::TvdbClient;
pub use models::{
    Actor, Episode, EpisodePage, ImageCounts, Series, SeriesImage, SeriesSearchResult, Update,
};

/// Remote TVDB operations, one implementation per API host.
#[async_trait::async_trait]
pub trait TvdbApi: Send + Sync {
    /// Base URL of the host this client talks to.
    fn base_url(&self) -> &str;

    /// An empty list when nothing matches.
    async fn search_series(&self, name: &str, language: &str) -> Result<Vec<SeriesSearchResult>>;

    async fn series(&self, id: u64, language: &str) -> Result<Series>;

    async fn episodes_page(
        &self,
        id: u64,
        page: u32,
        language: &str,
        aired_season: Option<i64>,
    ) -> Result<EpisodePage>;

    async fn image_counts(&self, id: u64, language: &str) -> Result<ImageCounts>;

    async fn images(&self, id: u64, key_type: &str, language: &str) -> Result<Vec<SeriesImage>>;

    async fn actors(&self, id: u64) -> Result<Vec<Actor>>;

    async fn updated_since(&self, from_time: i64) -> Result<Vec<Update>>;

    /// Forget any cached credentials so the next request logs in again.
    fn clear_credentials(&self) {}
}
