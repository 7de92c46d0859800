use crate::error::VjassError;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// How `vjassc parse` prints a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Indented dump with positions and text
    #[default]
    Tree,
    /// Named structure as an S-expression
    Sexp,
    /// Full tree and errors as JSON
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Cap on diagnostics rendered per file.
    #[serde(default)]
    pub max_errors: Option<usize>,
    #[serde(default)]
    pub verbose: bool,
}

fn default_extensions() -> Vec<String> {
    ["j", "vj", "jass"].iter().map(|ext| ext.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            format: OutputFormat::default(),
            extensions: default_extensions(),
            max_errors: None,
            verbose: false,
        }
    }
}

impl Config {
    /// Loads the first config file found, or the defaults when there is none.
    /// A file that exists but does not parse is an error.
    pub fn load() -> Result<Self, VjassError> {
        match Self::find_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, VjassError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents).map_err(|source| VjassError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    /// Writes this config to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), VjassError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self).map_err(|source| VjassError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// `$VJASS_CONFIG`, then `./vjass.json`, then the user config, whichever
    /// exists first.
    pub fn find_config_path() -> Option<PathBuf> {
        if let Ok(custom) = env::var("VJASS_CONFIG") {
            return Some(PathBuf::from(custom));
        }

        let local = Path::new("vjass.json");
        if local.is_file() {
            return Some(local.to_path_buf());
        }

        let user = Self::get_user_config_path();
        user.is_file().then_some(user)
    }

    pub fn get_user_config_path() -> PathBuf {
        let home = if cfg!(windows) {
            env::var("USERPROFILE")
        } else {
            env::var("HOME")
        };
        PathBuf::from(home.unwrap_or_else(|_| String::from(".")))
            .join(".vjass")
            .join("config.json")
    }

    /// True when `path` carries one of the configured source extensions.
    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}
