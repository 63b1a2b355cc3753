use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use displayinframe::LinkStyle;
use displayinframe::host::{AccessRule, AccessRules};

/// Name of the optional settings file at the root of a wiki directory.
pub const CONFIG_FILE: &str = "wiki.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config '{}'", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Settings of a directory-backed wiki.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WikiConfig {
    pub main_wiki: String,
    /// Prefix of the links frames point to.
    pub view_path: String,
    pub default_user: Option<String>,
    pub default_locale: Option<String>,
    pub rights: Vec<AccessRule>,
}

impl Default for WikiConfig {
    fn default() -> Self {
        WikiConfig {
            main_wiki: "xwiki".to_string(),
            view_path: "/bin/view/".to_string(),
            default_user: None,
            default_locale: None,
            rights: Vec::new(),
        }
    }
}

impl WikiConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `wiki.toml` of `dir`, or the defaults when there is none.
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn link_style(&self) -> LinkStyle {
        LinkStyle::for_wiki(&self.main_wiki).with_view_path(self.view_path.clone())
    }

    pub fn access_rules(&self) -> AccessRules {
        AccessRules::new(self.rights.clone())
    }
}
