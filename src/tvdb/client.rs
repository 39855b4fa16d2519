use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use reqwest::{Client, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use super::TvdbApi;
use super::models::{
    Actor, Envelope, EpisodePage, ImageCounts, LoginResponse, Series, SeriesImage,
    SeriesSearchResult, Update,
};
use crate::error::{Error, Result};

/// TVDB v2 REST API client for a single host (thetvdb.com or a mirror).
pub struct TvdbClient {
    client: Client,
    base_url: String,
    api_key: String,
    token: Mutex<Option<String>>,
}

impl TvdbClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            token: Mutex::new(None),
        })
    }

    fn cached_token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_token(&self, token: Option<String>) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = token;
    }

    async fn token(&self) -> Result<String> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let url = format!("{}/login", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "apikey": self.api_key }))
            .send()
            .await?;

        let response = check_status(response).await?;
        let login: LoginResponse = serde_json::from_str(&response.text().await?)?;

        debug!(base_url = %self.base_url, "Logged in to TVDB");
        self.store_token(Some(login.token.clone()));
        Ok(login.token)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        language: Option<&str>,
    ) -> Result<Envelope<T>> {
        let token = self.token().await?;
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.client.get(&url).bearer_auth(token).query(query);
        if let Some(language) = language {
            request = request.header(header::ACCEPT_LANGUAGE, language);
        }

        debug!(url = %url, "TVDB request");
        let response = request.send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            // Expired or revoked token, log in again on the next request.
            self.store_token(None);
        }

        let response = check_status(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_data<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        language: Option<&str>,
    ) -> Result<T> {
        self.get::<T>(path, query, language)
            .await?
            .data
            .ok_or_else(|| Error::Unavailable(format!("Response for {} has no data", path)))
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let reason = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("Error").and_then(|e| e.as_str()).map(String::from))
        .or_else(|| status.canonical_reason().map(String::from))
        .unwrap_or_else(|| "Unknown error".to_string());

    Err(Error::api(status.as_u16(), reason))
}

#[async_trait::async_trait]
impl TvdbApi for TvdbClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn search_series(&self, name: &str, language: &str) -> Result<Vec<SeriesSearchResult>> {
        let result = self
            .get::<Vec<SeriesSearchResult>>(
                "/search/series",
                &[("name", name.to_string())],
                Some(language),
            )
            .await;

        match result {
            Ok(envelope) => Ok(envelope.data.unwrap_or_default()),
            // TVDB answers a search without matches with a 404.
            Err(Error::Api { status: 404, .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn series(&self, id: u64, language: &str) -> Result<Series> {
        self.get_data(&format!("/series/{}", id), &[], Some(language))
            .await
    }

    async fn episodes_page(
        &self,
        id: u64,
        page: u32,
        language: &str,
        aired_season: Option<i64>,
    ) -> Result<EpisodePage> {
        let mut query = vec![("page", page.to_string())];
        if let Some(season) = aired_season {
            query.push(("airedSeason", season.to_string()));
        }

        let envelope = self
            .get::<Vec<super::Episode>>(
                &format!("/series/{}/episodes/query", id),
                &query,
                Some(language),
            )
            .await?;

        let last_page = envelope
            .links
            .and_then(|links| links.last)
            .unwrap_or(page);

        Ok(EpisodePage {
            episodes: envelope.data.unwrap_or_default(),
            last_page,
        })
    }

    async fn image_counts(&self, id: u64, language: &str) -> Result<ImageCounts> {
        self.get_data(&format!("/series/{}/images", id), &[], Some(language))
            .await
    }

    async fn images(&self, id: u64, key_type: &str, language: &str) -> Result<Vec<SeriesImage>> {
        let envelope = self
            .get::<Vec<SeriesImage>>(
                &format!("/series/{}/images/query", id),
                &[("keyType", key_type.to_string())],
                Some(language),
            )
            .await?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn actors(&self, id: u64) -> Result<Vec<Actor>> {
        let envelope = self
            .get::<Vec<Actor>>(&format!("/series/{}/actors", id), &[], None)
            .await?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn updated_since(&self, from_time: i64) -> Result<Vec<Update>> {
        let envelope = self
            .get::<Vec<Update>>("/updated/query", &[("fromTime", from_time.to_string())], None)
            .await?;
        Ok(envelope.data.unwrap_or_default())
    }

    fn clear_credentials(&self) {
        self.store_token(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header as header_eq, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn server_with_login() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_json(json!({ "apikey": "key" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "t0k" })))
            .mount(&server)
            .await;
        server
    }

    fn client(server: &MockServer) -> TvdbClient {
        TvdbClient::new(&server.uri(), "key", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_search_sends_token_and_language() {
        let server = server_with_login().await;
        Mock::given(method("GET"))
            .and(path("/search/series"))
            .and(query_param("name", "Scrubs"))
            .and(header_eq("authorization", "Bearer t0k"))
            .and(header_eq("accept-language", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "id": 76156, "seriesName": "Scrubs", "aliases": null, "firstAired": "2001-10-02" },
                    { "id": 1, "seriesName": null }
                ]
            })))
            .mount(&server)
            .await;

        let results = client(&server).search_series("Scrubs", "en").await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 76156);
        assert_eq!(results[0].series_name.as_deref(), Some("Scrubs"));
        assert!(results[0].aliases.is_empty());
        assert!(results[1].series_name.is_none());
    }

    #[tokio::test]
    async fn test_search_404_is_empty() {
        let server = server_with_login().await;
        Mock::given(method("GET"))
            .and(path("/search/series"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "Error": "Resource not found" })),
            )
            .mount(&server)
            .await;

        let results = client(&server).search_series("nothing", "en").await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_bad_api_key_is_401() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "Error": "API Key Required" })))
            .mount(&server)
            .await;

        let err = client(&server).series(1, "en").await.unwrap_err();
        assert!(err.is_auth_failure());
        assert!(matches!(err, Error::Api { status: 401, ref reason } if reason == "API Key Required"));
    }

    #[tokio::test]
    async fn test_episode_page_reads_last_link() {
        let server = server_with_login().await;
        Mock::given(method("GET"))
            .and(path("/series/76156/episodes/query"))
            .and(query_param("page", "1"))
            .and(query_param("airedSeason", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "links": { "first": 1, "last": 3, "next": 2, "prev": null },
                "data": [
                    { "id": 10, "airedSeason": 2, "airedEpisodeNumber": 1, "episodeName": "My Overkill" },
                    { "id": 11, "airedSeason": "2.0", "airedEpisodeNumber": 2.0 }
                ]
            })))
            .mount(&server)
            .await;

        let page = client(&server)
            .episodes_page(76156, 1, "en", Some(2))
            .await
            .unwrap();
        assert_eq!(page.last_page, 3);
        assert_eq!(page.episodes.len(), 2);
        assert_eq!(page.episodes[0].episode_name.as_deref(), Some("My Overkill"));
        assert_eq!(page.episodes[1].aired_season, Some(json!("2.0")));
    }

    #[tokio::test]
    async fn test_image_counts_and_server_error() {
        let server = server_with_login().await;
        Mock::given(method("GET"))
            .and(path("/series/76156/images"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "fanart": 12, "poster": 4, "season": 0 }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/series/76156/actors"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let tvdb = client(&server);
        let counts = tvdb.image_counts(76156, "en").await.unwrap();
        assert_eq!(counts.fanart, Some(12));
        assert_eq!(counts.season, Some(0));
        assert_eq!(counts.series, None);

        let err = tvdb.actors(76156).await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 503, .. }));
    }
}
