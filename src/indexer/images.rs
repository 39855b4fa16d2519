use std::sync::Arc;

use tracing::{debug, info, warn};

use super::fields::IMAGE_FIELDS;
use super::normalize::{DEFAULT_SEPARATOR, Field, FieldMap, Record, normalize};
use super::{Artwork, Indexer};
use crate::error::Result;
use crate::show::ImageIndex;
use crate::tvdb::{SeriesImage, TvdbApi};

/// Image types whose images are grouped by season number.
const SEASON_TYPES: [&str; 2] = ["season", "seasonwide"];

const DEFAULT_RESOLUTION: &str = "original";

impl Indexer {
    /// Fetch the images of a show, limited to the configured image type if any.
    ///
    /// A failing image type is logged and skipped. Only an authentication
    /// failure is returned as an error.
    pub async fn get_images(&self, id: u64, language: &str) -> Result<ImageIndex> {
        debug!(show_id = id, "Getting show banners");

        let image_type = self.settings.image_type.as_deref();
        let batches = self
            .session
            .call("images", |api| fetch_images(api, id, language, image_type))
            .await?;

        Ok(index_images(id, batches, &self.settings.artwork))
    }
}

/// `poster_thumb` is served from the `poster` images.
fn admits(wanted: Option<&str>, image_type: &str) -> bool {
    match wanted {
        None => true,
        Some(wanted) => wanted == image_type || (image_type == "poster" && wanted == "poster_thumb"),
    }
}

async fn fetch_images(
    api: Arc<dyn TvdbApi>,
    id: u64,
    language: &str,
    image_type: Option<&str>,
) -> Result<Vec<(String, Vec<SeriesImage>)>> {
    let counts = match api.image_counts(id, language).await {
        Ok(counts) => counts,
        Err(e) if e.is_auth_failure() => return Err(e.into_auth_failure()),
        Err(e) => {
            info!(show_id = id, "Could not get image count: {}", e);
            return Ok(Vec::new());
        }
    };

    let mut batches = Vec::new();
    for (key_type, count) in normalize(&counts, &FieldMap::EMPTY, DEFAULT_SEPARATOR) {
        if !admits(image_type, &key_type) {
            continue;
        }
        if count.as_f64().unwrap_or_default() <= 0.0 {
            continue;
        }

        match api.images(id, &key_type, language).await {
            Ok(images) => batches.push((key_type, images)),
            Err(e) if e.is_auth_failure() => return Err(e.into_auth_failure()),
            Err(e) => warn!(show_id = id, image_type = %key_type, "Could not get images: {}", e),
        }
    }

    Ok(batches)
}

/// Build the image index from per-type batches. Path fields become
/// `_<name>` with an absolute URL.
pub fn index_images(
    show_id: u64,
    batches: Vec<(String, Vec<SeriesImage>)>,
    artwork: &Artwork,
) -> ImageIndex {
    let mut index = ImageIndex::default();

    for (image_type, images) in batches {
        let by_season = SEASON_TYPES.contains(&image_type.as_str());

        for image in images {
            let resolution = image
                .resolution
                .as_deref()
                .filter(|r| !r.is_empty())
                .unwrap_or(DEFAULT_RESOLUTION)
                .to_string();

            let season = if by_season {
                match image.sub_key.as_deref().map(str::trim).map(str::parse::<i64>) {
                    Some(Ok(season)) => Some(season),
                    _ => {
                        warn!(
                            show_id,
                            image_id = image.id,
                            sub_key = ?image.sub_key,
                            "Season image without a usable season number"
                        );
                        continue;
                    }
                }
            } else {
                None
            };

            let mut attributes = normalize(&image, &IMAGE_FIELDS, DEFAULT_SEPARATOR);
            attributes.remove("id");

            let attributes: Record = attributes
                .into_iter()
                .map(|(key, value)| match value {
                    Field::Text(path) if key.ends_with("path") => {
                        debug!(path = %path, "Adding base url for image");
                        (format!("_{}", key), Field::Text(artwork.resolve(&path)))
                    }
                    other => (key, other),
                })
                .collect();

            index.insert(&image_type, &resolution, season, image.id, attributes);
        }
    }

    index
}
