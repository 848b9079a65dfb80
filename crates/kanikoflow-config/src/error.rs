use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "設定ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: kanikoflow.local.yaml, kanikoflow.yaml\n\
        - ./.kanikoflow/ ディレクトリ\n\
        - ~/.config/kanikoflow/kanikoflow.yaml\n\
        または KANIKOFLOW_CONFIG 環境変数で直接指定できます"
    )]
    ConfigFileNotFound,

    #[error("YAMLパースエラー: {path}\n理由: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
