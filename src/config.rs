use crate::codec::Grammar;
use crate::error::{MeasursError, Result};
use crate::keystore::FileKeyStore;
use crate::observe::Observer;
use crate::service::Service;
use crate::sink::{FileResource, JsonlCollection};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default key file name inside the data directory
pub const KEY_FILE: &str = "measurs.key";

/// Default primary collection file name
pub const COLLECTION_FILE: &str = "history.jsonl";

/// Default secondary history file name
pub const HISTORY_FILE: &str = "history.json";

/// Where the service keeps its key and both sinks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub key_file: PathBuf,
    /// Primary sink (one JSON record per line)
    pub collection_file: PathBuf,
    /// Secondary sink (JSON array)
    pub history_file: PathBuf,
    pub grammar: Grammar,
}

impl Default for Config {
    fn default() -> Self {
        Self::in_dir(".")
    }
}

impl Config {
    /// Default layout under one directory
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            key_file: dir.join(KEY_FILE),
            collection_file: dir.join(COLLECTION_FILE),
            history_file: dir.join(HISTORY_FILE),
            grammar: Grammar::default(),
        }
    }

    /// Reject layouts where two roles share one file
    pub fn validate(&self) -> Result<()> {
        let paths = [
            ("key file", &self.key_file),
            ("collection file", &self.collection_file),
            ("history file", &self.history_file),
        ];
        for (i, (name_a, path_a)) in paths.iter().enumerate() {
            for (name_b, path_b) in &paths[i + 1..] {
                if path_a == path_b {
                    return Err(MeasursError::InvalidConfig(format!(
                        "{} and {} are both {}",
                        name_a,
                        name_b,
                        path_a.display()
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn key_store(&self) -> FileKeyStore {
        FileKeyStore::new(&self.key_file)
    }

    /// Validate, load the key and open both file-backed sinks
    pub fn open_service(&self, observer: Arc<dyn Observer>) -> Result<Service> {
        self.validate()?;
        Service::open(
            self.grammar,
            &self.key_store(),
            Arc::new(JsonlCollection::new(&self.collection_file)),
            Arc::new(FileResource::new(&self.history_file)),
            observer,
        )
    }
}
