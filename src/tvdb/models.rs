use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::indexer::normalize::{Attribute, AttrValue, Attributes, ToAttr, attr};

/// TVDB sends `null` for empty lists and strings as often as it omits them.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `{"data": ..., "links": ...}` wrapper around every TVDB v2 response body.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub links: Option<Links>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    pub first: Option<u32>,
    pub last: Option<u32>,
    pub next: Option<u32>,
    pub prev: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeriesSearchResult {
    #[serde(deserialize_with = "nullable")]
    pub aliases: Vec<String>,
    pub banner: Option<String>,
    pub first_aired: Option<String>,
    pub id: u64,
    pub network: Option<String>,
    pub overview: Option<String>,
    pub series_name: Option<String>,
    pub slug: Option<String>,
    pub status: Option<String>,
}

impl Attributes for SeriesSearchResult {
    fn attributes(&self) -> Vec<Attribute> {
        vec![
            attr("aliases", &self.aliases),
            attr("banner", &self.banner),
            attr("first_aired", &self.first_aired),
            attr("id", &self.id),
            attr("network", &self.network),
            attr("overview", &self.overview),
            attr("series_name", &self.series_name),
            attr("slug", &self.slug),
            attr("status", &self.status),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Series {
    pub added: Option<String>,
    pub airs_day_of_week: Option<String>,
    pub airs_time: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub aliases: Vec<String>,
    pub banner: Option<String>,
    pub fanart: Option<String>,
    pub poster: Option<String>,
    pub first_aired: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub genre: Vec<String>,
    pub id: u64,
    pub imdb_id: Option<String>,
    pub language: Option<String>,
    pub last_updated: Option<i64>,
    pub network: Option<String>,
    pub network_id: Option<String>,
    pub overview: Option<String>,
    pub rating: Option<String>,
    pub runtime: Option<String>,
    pub series_name: Option<String>,
    pub site_rating: Option<f64>,
    pub site_rating_count: Option<i64>,
    pub slug: Option<String>,
    pub status: Option<String>,
    pub zap2it_id: Option<String>,
}

impl Attributes for Series {
    fn attributes(&self) -> Vec<Attribute> {
        vec![
            attr("added", &self.added),
            attr("airs_day_of_week", &self.airs_day_of_week),
            attr("airs_time", &self.airs_time),
            attr("aliases", &self.aliases),
            attr("banner", &self.banner),
            attr("fanart", &self.fanart),
            attr("poster", &self.poster),
            attr("first_aired", &self.first_aired),
            attr("genre", &self.genre),
            attr("id", &self.id),
            attr("imdb_id", &self.imdb_id),
            attr("language", &self.language),
            attr("last_updated", &self.last_updated),
            attr("network", &self.network),
            attr("network_id", &self.network_id),
            attr("overview", &self.overview),
            attr("rating", &self.rating),
            attr("runtime", &self.runtime),
            attr("series_name", &self.series_name),
            attr("site_rating", &self.site_rating),
            attr("site_rating_count", &self.site_rating_count),
            attr("slug", &self.slug),
            attr("status", &self.status),
            attr("zap2it_id", &self.zap2it_id),
        ]
    }
}

/// Season and episode numbers are loosely typed: some records carry `2`,
/// others `2.0` or `"2.0"`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Episode {
    pub absolute_number: Option<Value>,
    pub aired_episode_number: Option<Value>,
    pub aired_season: Option<Value>,
    #[serde(rename = "airedSeasonID")]
    pub aired_season_id: Option<u64>,
    pub dvd_episode_number: Option<Value>,
    pub dvd_season: Option<Value>,
    pub episode_name: Option<String>,
    pub first_aired: Option<String>,
    pub id: u64,
    pub language: Option<EpisodeLanguage>,
    pub last_updated: Option<i64>,
    pub overview: Option<String>,
    pub filename: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub directors: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub writers: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub guest_stars: Vec<String>,
    pub imdb_id: Option<String>,
    pub site_rating: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EpisodeLanguage {
    pub episode_name: Option<String>,
    pub overview: Option<String>,
}

impl Attributes for EpisodeLanguage {
    fn attributes(&self) -> Vec<Attribute> {
        vec![
            attr("episode_name", &self.episode_name),
            attr("overview", &self.overview),
        ]
    }
}

impl ToAttr for EpisodeLanguage {
    fn to_attr(&self) -> AttrValue {
        AttrValue::Object(self.attributes())
    }
}

impl Attributes for Episode {
    fn attributes(&self) -> Vec<Attribute> {
        vec![
            attr("absolute_number", &self.absolute_number),
            attr("aired_episode_number", &self.aired_episode_number),
            attr("aired_season", &self.aired_season),
            attr("aired_season_id", &self.aired_season_id),
            attr("dvd_episode_number", &self.dvd_episode_number),
            attr("dvd_season", &self.dvd_season),
            attr("episode_name", &self.episode_name),
            attr("first_aired", &self.first_aired),
            attr("id", &self.id),
            attr("language", &self.language),
            attr("last_updated", &self.last_updated),
            attr("overview", &self.overview),
            attr("filename", &self.filename),
            attr("directors", &self.directors),
            attr("writers", &self.writers),
            attr("guest_stars", &self.guest_stars),
            attr("imdb_id", &self.imdb_id),
            attr("site_rating", &self.site_rating),
        ]
    }
}

/// One page of `/series/{id}/episodes/query`.
#[derive(Debug, Clone, Default)]
pub struct EpisodePage {
    pub episodes: Vec<Episode>,
    pub last_page: u32,
}

/// Number of images available per image type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImageCounts {
    pub fanart: Option<u32>,
    pub poster: Option<u32>,
    pub season: Option<u32>,
    pub seasonwide: Option<u32>,
    pub series: Option<u32>,
}

impl Attributes for ImageCounts {
    fn attributes(&self) -> Vec<Attribute> {
        vec![
            attr("fanart", &self.fanart),
            attr("poster", &self.poster),
            attr("season", &self.season),
            attr("seasonwide", &self.seasonwide),
            attr("series", &self.series),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeriesImage {
    pub file_name: Option<String>,
    pub id: u64,
    pub key_type: Option<String>,
    pub language_id: Option<i64>,
    pub ratings_info: Option<RatingsInfo>,
    pub resolution: Option<String>,
    pub sub_key: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RatingsInfo {
    pub average: Option<f64>,
    pub count: Option<i64>,
}

impl Attributes for RatingsInfo {
    fn attributes(&self) -> Vec<Attribute> {
        vec![attr("average", &self.average), attr("count", &self.count)]
    }
}

impl ToAttr for RatingsInfo {
    fn to_attr(&self) -> AttrValue {
        AttrValue::Object(self.attributes())
    }
}

impl Attributes for SeriesImage {
    fn attributes(&self) -> Vec<Attribute> {
        vec![
            attr("file_name", &self.file_name),
            attr("id", &self.id),
            attr("key_type", &self.key_type),
            attr("language_id", &self.language_id),
            attr("ratings_info", &self.ratings_info),
            attr("resolution", &self.resolution),
            attr("sub_key", &self.sub_key),
            attr("thumbnail", &self.thumbnail),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Actor {
    pub id: u64,
    pub image: Option<String>,
    pub image_added: Option<String>,
    pub image_author: Option<i64>,
    pub last_updated: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub role: String,
    pub series_id: Option<u64>,
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Update {
    pub id: u64,
    pub last_updated: i64,
}
