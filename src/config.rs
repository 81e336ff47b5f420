//! 設定ファイル（YAML）とコマンドライン引数。
//!
//! 優先順位: コマンドライン > 設定ファイル > 既定値。

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

use crate::application::dashboard::Role;

#[derive(Parser, Debug, Default)]
#[command(name = "library-dashboard")]
#[command(about = "Librarian & patron dashboard for the library REST backend (MCP over stdio)", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config", env = "LIBRARY_DASHBOARD_CONFIG")]
    pub config_path: Option<PathBuf>,

    #[arg(long, env = "LIBRARY_BASE_URL")]
    pub base_url: Option<String>,

    /// librarian or patron
    #[arg(long)]
    pub role: Option<Role>,

    #[arg(long = "storage")]
    pub storage_path: Option<PathBuf>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("library-dashboard")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

pub fn default_storage_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("library-dashboard")
        .join("storage.json")
}

/// RESTエンドポイントのパス。ID付きの操作は末尾に `/{id}` を付ける。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub list: String,
    pub search: String,
    pub add: String,
    pub update: String,
    pub remove: String,
    pub register: String,
    pub checkout: String,
    #[serde(rename = "return")]
    pub return_book: String,
    pub reserve: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            list: "/books".into(),
            search: "/books/search".into(),
            add: "/books/add".into(),
            update: "/books/update".into(),
            remove: "/books/remove".into(),
            register: "/users/register".into(),
            checkout: "/users/checkout".into(),
            return_book: "/users/return".into(),
            reserve: "/users/reserve".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
    /// 一覧を保持するキー
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            key: "books".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub role: Role,
    pub endpoints: Endpoints,
    pub storage: StorageConfig,
    pub notification_duration_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".into(),
            role: Role::default(),
            endpoints: Endpoints::default(),
            storage: StorageConfig::default(),
            notification_duration_ms: 3000,
        }
    }
}

impl Config {
    /// 設定を読み込む。
    /// パス指定時はファイル必須。未指定時は既定パスにあれば読み、なければ既定値。
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = default_config_path();
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml(&yaml).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// コマンドライン引数で上書きした設定を作る。
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let mut config = Self::load(cli.config_path.as_deref())?;
        if let Some(base_url) = &cli.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(role) = cli.role {
            config.role = role;
        }
        if let Some(path) = &cli.storage_path {
            config.storage.path = path.clone();
        }
        Ok(config)
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_millis(self.notification_duration_ms)
    }
}
