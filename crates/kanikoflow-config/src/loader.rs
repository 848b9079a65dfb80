//! 設定ファイルの探索と読み込み

use crate::error::{ConfigError, Result};
use crate::model::RunConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 設定ファイルパスを直接指定する環境変数
pub const CONFIG_ENV: &str = "KANIKOFLOW_CONFIG";

const CANDIDATES: [&str; 2] = ["kanikoflow.local.yaml", "kanikoflow.yaml"];

/// 設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 KANIKOFLOW_CONFIG (直接パス指定)
/// 2. カレントディレクトリ: kanikoflow.local.yaml, kanikoflow.yaml
/// 3. ./.kanikoflow/ ディレクトリ内: 同様の順序
/// 4. ~/.config/kanikoflow/kanikoflow.yaml (グローバル設定)
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        debug!(path = %path.display(), "{} points to a missing file", CONFIG_ENV);
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let local_dir = current_dir.join(".kanikoflow");
    if local_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = local_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("kanikoflow").join("kanikoflow.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// 設定ファイルを読み込み、検証する
///
/// 相対パスのワークスペースは設定ファイルのあるディレクトリ基準で解決されます。
#[tracing::instrument]
pub fn load_config(path: &Path) -> Result<RunConfig> {
    let content = std::fs::read_to_string(path)?;
    let mut config: RunConfig =
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let base_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    config.resolve_paths(&base_dir);
    config.validate()?;

    debug!(
        artifacts = config.build.artifacts.len(),
        cluster = config.build.cluster.is_some(),
        "Loaded run configuration"
    );

    Ok(config)
}
