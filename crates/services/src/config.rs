//! Environment-driven configuration for the practice services.
//!
//! | variable                | default                       |
//! |-------------------------|-------------------------------|
//! | `EAR_DB_URL`            | `sqlite://ear-training.sqlite3` |
//! | `EAR_API_BASE_URL`      | unset (remote save disabled)  |
//! | `EAR_API_TOKEN`         | unset                         |
//! | `EAR_FEEDBACK_DELAY_MS` | `600`                         |

use std::env;
use std::path::{Path, PathBuf};

use chrono::Duration;

use crate::error::AppServicesError;
use crate::remote::RemoteSaveConfig;

pub const DEFAULT_DB_URL: &str = "sqlite://ear-training.sqlite3";
pub const DEFAULT_FEEDBACK_DELAY_MS: i64 = 600;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PracticeConfig {
    pub db_url: String,
    pub remote: Option<RemoteSaveConfig>,
    pub feedback_delay: Duration,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.to_string(),
            remote: None,
            feedback_delay: Duration::milliseconds(DEFAULT_FEEDBACK_DELAY_MS),
        }
    }
}

impl PracticeConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unparsable values fall back to
    /// their defaults and are logged.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_url = lookup("EAR_DB_URL")
            .filter(|raw| !raw.trim().is_empty())
            .map_or_else(|| DEFAULT_DB_URL.to_string(), normalize_sqlite_url);

        let remote = lookup("EAR_API_BASE_URL")
            .filter(|raw| !raw.trim().is_empty())
            .and_then(|base| match RemoteSaveConfig::new(&base, lookup("EAR_API_TOKEN")) {
                Ok(config) => Some(config),
                Err(err) => {
                    tracing::warn!(error = %err, "remote save disabled");
                    None
                }
            });

        let delay_ms = match lookup("EAR_FEEDBACK_DELAY_MS") {
            None => DEFAULT_FEEDBACK_DELAY_MS,
            Some(raw) => raw.trim().parse::<u32>().map_or_else(
                |_| {
                    tracing::warn!(value = %raw, "ignoring invalid EAR_FEEDBACK_DELAY_MS");
                    DEFAULT_FEEDBACK_DELAY_MS
                },
                i64::from,
            ),
        };

        Self {
            db_url,
            remote,
            feedback_delay: Duration::milliseconds(delay_ms),
        }
    }
}

/// Turns a bare path or `sqlite:` path into an absolute `sqlite://` URL.
#[must_use]
pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim();
    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Creates the database file and its parent directory so `SQLite` can open it.
///
/// # Errors
///
/// Returns `AppServicesError::InvalidDbUrl` for URLs without a file path and
/// `AppServicesError::Io` if the file cannot be created.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), AppServicesError> {
    if db_url == "sqlite::memory:" || db_url.contains("mode=memory") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| AppServicesError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(AppServicesError::InvalidDbUrl {
            raw: db_url.to_string(),
        });
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = PracticeConfig::from_lookup(lookup(&[]));
        assert_eq!(config, PracticeConfig::default());
        assert_eq!(config.feedback_delay, Duration::milliseconds(600));
    }

    #[test]
    fn reads_every_variable() {
        let config = PracticeConfig::from_lookup(lookup(&[
            ("EAR_DB_URL", "sqlite:///tmp/ear.sqlite3"),
            ("EAR_API_BASE_URL", "https://api.example.com"),
            ("EAR_API_TOKEN", "secret"),
            ("EAR_FEEDBACK_DELAY_MS", "250"),
        ]));
        assert_eq!(config.db_url, "sqlite:///tmp/ear.sqlite3");
        let remote = config.remote.unwrap();
        assert!(remote.has_token());
        assert_eq!(remote.base_url().as_str(), "https://api.example.com/");
        assert_eq!(config.feedback_delay, Duration::milliseconds(250));
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = PracticeConfig::from_lookup(lookup(&[
            ("EAR_API_BASE_URL", "::nope::"),
            ("EAR_FEEDBACK_DELAY_MS", "soon"),
        ]));
        assert!(config.remote.is_none());
        assert_eq!(config.feedback_delay, Duration::milliseconds(600));
    }

    #[test]
    fn bare_paths_become_absolute_urls() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
        assert_eq!(normalize_sqlite_url("/var/ear.db".into()), "sqlite:///var/ear.db");
        assert_eq!(normalize_sqlite_url("sqlite:/var/ear.db".into()), "sqlite:///var/ear.db");
        let relative = normalize_sqlite_url("ear.db".into());
        assert!(relative.starts_with("sqlite:///"));
        assert!(relative.ends_with("ear.db"));
    }

    #[test]
    fn memory_urls_need_no_file() {
        assert!(prepare_sqlite_file("sqlite::memory:").is_ok());
        assert!(matches!(
            prepare_sqlite_file("postgres://db"),
            Err(AppServicesError::InvalidDbUrl { .. })
        ));
    }
}
