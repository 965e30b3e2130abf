// config lets you read a separate config file
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

pub const DEFAULT_SETTINGS_FILE: &str = "fieldref.toml";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Path of the mirrored reference-data database.
    pub database: PathBuf,
    pub survey: i64,
    pub work_mode: bool,
    /// Ordered survey languages, matching the label columns by position.
    pub languages: Vec<String>,
    pub max_results: u32,
    /// Zero disables the timeout.
    pub query_timeout_ms: u64,
    pub apply_version_filter: bool,
    pub log_filter: String,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_SETTINGS_FILE))
    }
    /// Reads defaults, then the (optional) settings file, then `FIELDREF_*`
    /// environment variables, later sources overriding earlier ones.
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = Config::builder()
            .set_default("database", "fieldref.db")?
            .set_default("survey", 1)?
            .set_default("work_mode", false)?
            .set_default("languages", vec!["en"])?
            .set_default("max_results", 50)?
            .set_default("query_timeout_ms", 5000)?
            .set_default("apply_version_filter", false)?
            .set_default("log_filter", "info")?
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("FIELDREF")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("languages"),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
    pub fn query_timeout(&self) -> Option<Duration> {
        (self.query_timeout_ms > 0).then(|| Duration::from_millis(self.query_timeout_ms))
    }
}
