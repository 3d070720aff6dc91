use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:9200";
const DEFAULT_MAX_RETRIES: u8 = 5;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Name every generation is derived from, also bound to the first one.
pub const DEFAULT_INDEX_NAME: &str = "elasticbook";
/// Alias search traffic targets.
pub const DEFAULT_ALIAS_NAME: &str = "elasticbookdefault";
/// Document type of the original mapping. Elasticsearch 7 and later reject
/// typed mappings and 8 rejects typed document URLs, so modern clusters need
/// `document_type: _doc`.
pub const DEFAULT_DOCUMENT_TYPE: &str = "bookmark";
const DEFAULT_WORKERS: u16 = 5;
const MAX_WORKERS: u16 = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// Connection settings for the document store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub credentials: Option<Credentials>,

    /// Retries for transport failures and 5xx responses, per request
    #[serde(default = "default_max_retries")]
    pub max_retries: u8,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credentials: None,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop feeding workers after the first failed document
    #[default]
    Abort,
    /// Attempt every document and report failures afterwards
    Continue,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_base_name")]
    pub base_name: String,

    #[serde(default = "default_alias")]
    pub default_alias: String,

    /// `bookmark` for pre-7 clusters, `_doc` (typeless) for Elasticsearch 7+
    #[serde(default = "default_document_type")]
    pub document_type: String,

    #[serde(default = "default_workers")]
    pub workers: u16,

    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            base_name: DEFAULT_INDEX_NAME.to_string(),
            default_alias: DEFAULT_ALIAS_NAME.to_string(),
            document_type: DEFAULT_DOCUMENT_TYPE.to_string(),
            workers: DEFAULT_WORKERS,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_max_retries() -> u8 {
    DEFAULT_MAX_RETRIES
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_base_name() -> String {
    DEFAULT_INDEX_NAME.to_string()
}

fn default_alias() -> String {
    DEFAULT_ALIAS_NAME.to_string()
}

fn default_document_type() -> String {
    DEFAULT_DOCUMENT_TYPE.to_string()
}

fn default_workers() -> u16 {
    DEFAULT_WORKERS
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub bookmarks_path: Option<String>,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

/// Parses `user` or `user:password`.
pub fn parse_basic_auth(value: &str) -> Option<Credentials> {
    let parts: Vec<_> = value.trim().splitn(2, ':').collect();
    match parts.as_slice() {
        [""] => None,
        [username] => Some(Credentials {
            username: username.to_string(),
            password: None,
        }),
        [username, password] if !username.is_empty() => Some(Credentials {
            username: username.to_string(),
            password: Some(password.to_string()),
        }),
        _ => {
            log::warn!("Invalid basic auth format. Expected 'username' or 'username:password'");
            None
        }
    }
}

impl Config {
    pub fn validate(&mut self) -> AppResult<()> {
        if self.index.workers == 0 {
            self.index.workers = 1
        }
        if self.index.workers > MAX_WORKERS {
            return Err(AppError::Config(format!(
                "index.workers cannot exceed {MAX_WORKERS}, got {}",
                self.index.workers
            )));
        }

        let endpoint = url::Url::parse(&self.store.endpoint).map_err(|err| {
            AppError::Config(format!(
                "store.endpoint {:?} is not a valid url: {err}",
                self.store.endpoint
            ))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(AppError::Config(format!(
                "store.endpoint must use http or https, got {}",
                endpoint.scheme()
            )));
        }

        for (field, value) in [
            ("index.base_name", &self.index.base_name),
            ("index.default_alias", &self.index.default_alias),
            ("index.document_type", &self.index.document_type),
        ] {
            if value.is_empty() {
                return Err(AppError::Config(format!("{field} cannot be empty")));
            }
        }

        for (field, value) in [
            ("index.base_name", &self.index.base_name),
            ("index.default_alias", &self.index.default_alias),
        ] {
            if value.to_lowercase() != *value {
                return Err(AppError::Config(format!(
                    "{field} must be lowercase, got {value:?}"
                )));
            }
        }

        if self.index.base_name == self.index.default_alias {
            return Err(AppError::Config(
                "index.default_alias must differ from index.base_name".to_string(),
            ));
        }

        Ok(())
    }

    pub fn load_with(base_path: &Path) -> AppResult<Self> {
        std::fs::create_dir_all(base_path)?;
        let path = base_path.join(CONFIG_FILE);

        // create new if does not exist
        if !path.exists() {
            log::info!("Creating default config at {}", path.display());
            write_atomic(&path, &to_yaml(&Self::default())?)?;
        }

        let config_str = std::fs::read_to_string(&path)?;
        let mut config: Self = serde_yml::from_str(&config_str)
            .map_err(|err| AppError::Config(format!("{} is malformed: {err}", path.display())))?;

        config.base_path = base_path.to_path_buf();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != to_yaml(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> AppResult<()> {
        write_atomic(&self.base_path.join(CONFIG_FILE), &to_yaml(self)?)
    }

    /// Overlays connection settings taken from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> AppResult<()> {
        if let Some(endpoint) = lookup("ELASTICBOOK_URL").filter(|v| !v.trim().is_empty()) {
            self.store.endpoint = endpoint.trim().to_string();
        }
        if let Some(auth) = lookup("ELASTICBOOK_BASIC_AUTH") {
            self.store.credentials = parse_basic_auth(&auth);
        }
        if let Some(path) = lookup("ELASTICBOOK_BOOKMARKS").filter(|v| !v.trim().is_empty()) {
            self.bookmarks_path = Some(path);
        }

        self.validate()
    }

    pub fn apply_env(&mut self) -> AppResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }
}

fn to_yaml(config: &Config) -> AppResult<String> {
    serde_yml::to_string(config).map_err(|err| AppError::Config(err.to_string()))
}

fn write_atomic(path: &Path, data: &str) -> AppResult<()> {
    let temp_path = path.with_extension("yaml-tmp");
    std::fs::write(&temp_path, data)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}
