use std::collections::BTreeMap;

use serde::Serialize;

use crate::indexer::normalize::Record;

/// Everything the indexer knows about one show.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShowRecord {
    pub id: u64,
    /// Core show fields plus the `externals` sub-record.
    pub data: Record,
    /// season number -> episode number -> episode fields
    pub seasons: BTreeMap<i64, BTreeMap<i64, Record>>,
    #[serde(skip_serializing_if = "ImageIndex::is_empty")]
    pub images: ImageIndex,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actors: Vec<ActorRecord>,
}

impl ShowRecord {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// A later episode with the same (season, episode) pair replaces the earlier one.
    pub fn insert_episode(&mut self, episode: EpisodeRecord) {
        self.seasons
            .entry(episode.season)
            .or_default()
            .insert(episode.episode, episode.fields);
    }

    pub fn episode(&self, season: i64, episode: i64) -> Option<&Record> {
        self.seasons.get(&season).and_then(|s| s.get(&episode))
    }

    pub fn episode_count(&self) -> usize {
        self.seasons.values().map(BTreeMap::len).sum()
    }
}

/// One episode with the season/episode pair chosen by the ordering policy.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeRecord {
    pub season: i64,
    pub episode: i64,
    pub fields: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActorRecord {
    pub id: u64,
    pub image_url: Option<String>,
    pub name: String,
    pub role: String,
    pub sort_order: i64,
}

/// Images of one type and resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ImageGroup {
    /// image id -> attributes
    ById(BTreeMap<u64, Record>),
    /// season number -> image id -> attributes, for `season` and `seasonwide`
    BySeason(BTreeMap<i64, BTreeMap<u64, Record>>),
}

/// image type -> resolution -> [season ->] image id -> attributes
///
/// Levels are created on first insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ImageIndex {
    by_type: BTreeMap<String, BTreeMap<String, ImageGroup>>,
}

impl ImageIndex {
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.by_type.keys().map(String::as_str)
    }

    pub fn resolutions(&self, image_type: &str) -> Option<&BTreeMap<String, ImageGroup>> {
        self.by_type.get(image_type)
    }

    /// Insert an image. `season` is `Some` for season-bucketed types only.
    pub fn insert(
        &mut self,
        image_type: &str,
        resolution: &str,
        season: Option<i64>,
        id: u64,
        attributes: Record,
    ) {
        let resolutions = self.by_type.entry(image_type.to_string()).or_default();

        match season {
            Some(season) => {
                let group = resolutions
                    .entry(resolution.to_string())
                    .or_insert_with(|| ImageGroup::BySeason(BTreeMap::new()));
                if let ImageGroup::BySeason(seasons) = group {
                    seasons.entry(season).or_default().insert(id, attributes);
                }
            }
            None => {
                let group = resolutions
                    .entry(resolution.to_string())
                    .or_insert_with(|| ImageGroup::ById(BTreeMap::new()));
                if let ImageGroup::ById(images) = group {
                    images.insert(id, attributes);
                }
            }
        }
    }

    pub fn get(
        &self,
        image_type: &str,
        resolution: &str,
        season: Option<i64>,
        id: u64,
    ) -> Option<&Record> {
        match (self.by_type.get(image_type)?.get(resolution)?, season) {
            (ImageGroup::ById(images), None) => images.get(&id),
            (ImageGroup::BySeason(seasons), Some(season)) => seasons.get(&season)?.get(&id),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.by_type
            .values()
            .flat_map(BTreeMap::values)
            .map(|group| match group {
                ImageGroup::ById(images) => images.len(),
                ImageGroup::BySeason(seasons) => seasons.values().map(BTreeMap::len).sum(),
            })
            .sum()
    }
}
