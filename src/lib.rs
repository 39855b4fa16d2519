pub mod config;
pub mod error;
pub mod indexer;
pub mod notify;
pub mod sanitize;
pub mod select;
pub mod show;
pub mod tvdb;

pub use error::{Error, Result};
pub use indexer::{Indexer, IndexerSettings};
pub use show::ShowRecord;
