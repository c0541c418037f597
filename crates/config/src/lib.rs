//! Layered configuration for tally.
//!
//! Values are merged from, in increasing order of precedence:
//!
//! 1. Built-in defaults ([`Config::default()`]).
//! 2. A configuration file: either the one given explicitly, or
//!    `config.toml` in the platform config directory if it exists. TOML,
//!    YAML and JSON are supported, chosen by file extension.
//! 3. Environment variables prefixed with `TALLY_`, using `__` to reach
//!    nested keys (`TALLY_SERVER__BIND=0.0.0.0:8000`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "TALLY_";
const DATABASE_FILE: &str = "tally.db";
const CONFIG_FILE: &str = "config.toml";
/// Ten years.
const MAX_RETENTION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "tally")
}

/// Where `config.toml` is looked for when no file is given explicitly.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

fn default_database_path() -> PathBuf {
    project_dirs().map(|dirs| dirs.data_dir().join(DATABASE_FILE)).unwrap_or_else(|| PathBuf::from(DATABASE_FILE))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite result store.
    pub database: PathBuf,
    pub server: ServerConfig,
    pub scan: ScanConfig,
    pub listing: ListingConfig,
    pub object_store: ObjectStoreDefaults,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            server: ServerConfig::default(),
            scan: ScanConfig::default(),
            listing: ListingConfig::default(),
            object_store: ObjectStoreDefaults::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}
impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 8000)) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Stop scans automatically after this many seconds.
    pub timeout_secs: Option<u64>,
    /// Keep finished scans in memory for this many seconds.
    pub retention_secs: u64,
}
impl Default for ScanConfig {
    fn default() -> Self {
        Self { timeout_secs: None, retention_secs: 3600 }
    }
}
impl ScanConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Number of scans returned by the recent scans listing.
    pub recent_limit: usize,
    /// Files per page when the client doesn't ask for a size.
    pub page_size: usize,
    /// Upper bound on a client-requested page size.
    pub max_page_size: usize,
}
impl Default for ListingConfig {
    fn default() -> Self {
        Self { recent_limit: 10, page_size: 100, max_page_size: 1000 }
    }
}

/// Used for object store submissions that leave these out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStoreDefaults {
    pub region: String,
    pub endpoint: Option<String>,
}
impl Default for ObjectStoreDefaults {
    fn default() -> Self {
        Self { region: "us-east-1".to_string(), endpoint: None }
    }
}

impl Config {
    /// Load and validate the configuration.
    ///
    /// An explicit `path` must have a supported extension; the default
    /// location is only used if a file exists there.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match path {
            Some(path) => figment = figment.merge(Self::file_provider(path)?),
            None => {
                if let Some(default_path) = default_config_path().filter(|p| p.is_file()) {
                    tracing::debug!(path = %default_path.display(), "Using default configuration file");
                    figment = figment.merge(Toml::file(default_path));
                }
            },
        }
        let config: Config =
            figment.merge(Env::prefixed(ENV_PREFIX).split("__")).extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    fn file_provider(path: &Path) -> Result<Figment> {
        let extension = path.extension().and_then(|e| e.to_str()).map(str::to_lowercase);
        let figment = match extension.as_deref() {
            Some("toml") => Figment::from(Toml::file_exact(path)),
            Some("yaml" | "yml") => Figment::from(Yaml::file_exact(path)),
            Some("json") => Figment::from(Json::file_exact(path)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
        };
        if !path.is_file() {
            exn::bail!(ErrorKind::Load);
        }
        Ok(figment)
    }

    pub fn validate(&self) -> Result<()> {
        let listing = &self.listing;
        if listing.recent_limit == 0 {
            exn::bail!(ErrorKind::Invalid("listing.recent_limit must be greater than zero".to_string()));
        }
        if listing.page_size == 0 || listing.max_page_size == 0 {
            exn::bail!(ErrorKind::Invalid("listing page sizes must be greater than zero".to_string()));
        }
        if listing.page_size > listing.max_page_size {
            exn::bail!(ErrorKind::Invalid(format!(
                "listing.page_size ({}) exceeds listing.max_page_size ({})",
                listing.page_size, listing.max_page_size
            )));
        }
        if self.scan.timeout_secs == Some(0) {
            exn::bail!(ErrorKind::Invalid("scan.timeout_secs must be greater than zero".to_string()));
        }
        if self.scan.retention_secs > MAX_RETENTION_SECS {
            exn::bail!(ErrorKind::Invalid(format!(
                "scan.retention_secs ({}) exceeds {MAX_RETENTION_SECS}",
                self.scan.retention_secs
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.server.bind.to_string(), "127.0.0.1:8000");
        assert_eq!(config.listing.recent_limit, 10);
        assert_eq!(config.scan.timeout(), None);
        assert_eq!(config.scan.retention(), Duration::from_secs(3600));
    }

    #[rstest]
    #[case(ListingConfig { recent_limit: 0, page_size: 100, max_page_size: 1000 })]
    #[case(ListingConfig { recent_limit: 10, page_size: 0, max_page_size: 1000 })]
    #[case(ListingConfig { recent_limit: 10, page_size: 500, max_page_size: 100 })]
    fn test_invalid_listing(#[case] listing: ListingConfig) {
        let config = Config { listing, ..Config::default() };
        let err = config.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[rstest]
    #[case("config.toml", "[server]\nbind = \"0.0.0.0:9000\"\n[scan]\ntimeout_secs = 60\n")]
    #[case("config.yaml", "server:\n  bind: \"0.0.0.0:9000\"\nscan:\n  timeout_secs: 60\n")]
    #[case("config.json", r#"{"server": {"bind": "0.0.0.0:9000"}, "scan": {"timeout_secs": 60}}"#)]
    fn test_load_file(#[case] name: &str, #[case] contents: &str) {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.server.bind.port(), 9000);
        assert_eq!(config.scan.timeout(), Some(Duration::from_secs(60)));
        // Untouched sections keep their defaults.
        assert_eq!(config.listing, ListingConfig::default());
    }

    #[test]
    fn test_invalid_retention() {
        let scan = ScanConfig { retention_secs: u64::MAX, ..ScanConfig::default() };
        let err = Config { scan, ..Config::default() }.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
        let scan = ScanConfig { retention_secs: MAX_RETENTION_SECS, ..ScanConfig::default() };
        Config { scan, ..Config::default() }.validate().unwrap();
    }

    #[rstest]
    #[case("tally.ini", false)]
    #[case("tally.ini", true)]
    #[case("tally", true)]
    fn test_load_unsupported_format(#[case] name: &str, #[case] exists: bool) {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(name);
        if exists {
            std::fs::write(&path, "[server]\n").unwrap();
        }
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&temp_dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load));
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("tally.toml", "database = \"/var/lib/tally/tally.db\"\n[listing]\npage_size = 50\n")?;
            jail.set_env("TALLY_LISTING__PAGE_SIZE", "25");
            jail.set_env("TALLY_OBJECT_STORE__REGION", "us-west-004");
            let config = Config::load(Some(Path::new("tally.toml"))).unwrap();
            assert_eq!(config.database, PathBuf::from("/var/lib/tally/tally.db"));
            assert_eq!(config.listing.page_size, 25);
            assert_eq!(config.object_store.region, "us-west-004");
            Ok(())
        });
    }

    #[test]
    fn test_env_values_are_validated() {
        Jail::expect_with(|jail| {
            jail.create_file("tally.toml", "")?;
            jail.set_env("TALLY_LISTING__PAGE_SIZE", "5000");
            let err = Config::load(Some(Path::new("tally.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Invalid(_)));
            Ok(())
        });
    }
}
