use crate::error::{Error, Result};
use crate::indexer::normalize::Record;

/// Picks one show out of the search candidates for a name lookup.
pub trait SeriesSelector: Send + Sync {
    fn select_series(&self, candidates: Vec<Record>) -> Result<Record>;
}

/// Non-interactive selection: the first candidate wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstResult;

impl SeriesSelector for FirstResult {
    fn select_series(&self, candidates: Vec<Record>) -> Result<Record> {
        candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::ShowNotFound("No candidates to select from".to_string()))
    }
}
