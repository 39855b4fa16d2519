//! Rename tables from TVDB attribute names to indexer field names.

use super::normalize::{FieldMap, FieldTarget};

/// Shared by series, search results and episodes.
pub const SERIES_FIELDS: FieldMap = FieldMap::new(&[
    ("id", FieldTarget::Rename("id")),
    ("series_name", FieldTarget::Rename("seriesname")),
    ("summary", FieldTarget::Rename("overview")),
    ("first_aired", FieldTarget::Rename("firstaired")),
    ("banner", FieldTarget::Rename("banner")),
    ("url", FieldTarget::Rename("show_url")),
    ("epnum", FieldTarget::Rename("absolute_number")),
    ("episode_name", FieldTarget::Rename("episodename")),
    ("aired_episode_number", FieldTarget::Rename("episodenumber")),
    ("aired_season", FieldTarget::Rename("seasonnumber")),
    ("dvd_episode_number", FieldTarget::Rename("dvd_episodenumber")),
    ("airs_day_of_week", FieldTarget::Rename("airs_dayofweek")),
    ("last_updated", FieldTarget::Rename("lastupdated")),
    ("network_id", FieldTarget::Rename("networkid")),
    ("rating", FieldTarget::Rename("contentrating")),
    ("imdb_id", FieldTarget::Rename("imdb_id")),
]);

pub const IMAGE_FIELDS: FieldMap = FieldMap::new(&[
    ("file_name", FieldTarget::Rename("bannerpath")),
    ("language_id", FieldTarget::Rename("language")),
    ("key_type", FieldTarget::Rename("bannertype")),
    ("resolution", FieldTarget::Rename("bannertype2")),
    (
        "ratings_info",
        FieldTarget::Nested(&[("count", "ratingcount"), ("average", "rating")]),
    ),
    ("thumbnail", FieldTarget::Rename("thumbnailpath")),
    ("sub_key", FieldTarget::Rename("sub_key")),
    ("id", FieldTarget::Rename("id")),
]);

/// Record keys the episode ordering policy reads.
pub mod episode {
    pub const SEASON: &str = "seasonnumber";
    pub const EPISODE: &str = "episodenumber";
    pub const DVD_SEASON: &str = "dvd_season";
    pub const DVD_EPISODE: &str = "dvd_episodenumber";
    pub const LAST_UPDATED: &str = "lastupdated";
    pub const FILENAME: &str = "filename";
}

pub const SERIES_NAME: &str = "seriesname";
