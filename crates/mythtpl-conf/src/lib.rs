use std::path::Path;

use config::Config;
use config::ConfigError as ExternalConfigError;
use config::File;
use config::FileFormat;
use directories::ProjectDirs;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

const CONFIG_FILE: &str = "mythtpl.toml";
const DOT_CONFIG_FILE: &str = ".mythtpl.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration build/deserialize error")]
    Config(#[from] ExternalConfigError),
    #[error("Failed to serialize settings for checksum")]
    Checksum(#[from] serde_json::Error),
}

/// Engine settings shared by the compiler and the artifact cache.
///
/// Field names follow the keys accepted in `mythtpl.toml`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub template_dir: String,
    pub cache_dir: String,
    pub extension: String,
    /// Recompile on every render, ignoring artifact freshness.
    pub debug: bool,
    pub tags_icase: bool,
    pub allow_php: bool,
    pub remove_comments: bool,
    pub auto_escape: bool,
    pub charset: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            template_dir: "templates/".to_string(),
            cache_dir: "cache/".to_string(),
            extension: "html".to_string(),
            debug: false,
            tags_icase: false,
            allow_php: false,
            remove_comments: false,
            auto_escape: false,
            charset: "UTF-8".to_string(),
        }
    }
}

impl Settings {
    pub fn new(project_root: &Path) -> Result<Self, ConfigError> {
        let user_config_file = ProjectDirs::from("com.github", "mythtpl", "mythtpl")
            .map(|proj_dirs| proj_dirs.config_dir().join(CONFIG_FILE));

        Self::load_from_paths(project_root, user_config_file.as_deref())
    }

    fn load_from_paths(
        project_root: &Path,
        user_config_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = user_config_path {
            tracing::debug!("user config candidate: {}", path.display());
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        builder = builder.add_source(
            File::from(project_root.join(DOT_CONFIG_FILE))
                .format(FileFormat::Toml)
                .required(false),
        );

        builder = builder.add_source(
            File::from(project_root.join(CONFIG_FILE))
                .format(FileFormat::Toml)
                .required(false),
        );

        let config = builder.build()?;
        let settings: Settings = config.try_deserialize()?;
        Ok(settings.normalized())
    }

    /// Directories always carry a trailing slash so they can be used as
    /// string prefixes.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.template_dir = with_trailing_slash(&self.template_dir);
        self.cache_dir = with_trailing_slash(&self.cache_dir);
        self
    }

    /// Stable digest of every setting that influences compiled output or
    /// artifact location.
    pub fn checksum(&self) -> Result<String, ConfigError> {
        let serialized = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&serialized);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

fn with_trailing_slash(dir: &str) -> String {
    if dir.is_empty() || dir.ends_with('/') {
        dir.to_string()
    } else {
        format!("{dir}/")
    }
}
