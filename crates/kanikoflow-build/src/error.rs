use crate::exec::Interrupted;
use std::path::PathBuf;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// ビルダーのエラー種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 設定が不正でビルダーを作れない
    Configuration,
    /// アーティファクトの依存ファイルを解決できない
    DependencyResolution,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("parsing {field}: {source}")]
    Configuration {
        field: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("getting dependencies for {image}: {source}")]
    DependencyResolution {
        image: String,
        #[source]
        source: ResolveError,
    },
}

impl BuildError {
    pub fn configuration(field: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Configuration {
            field,
            source: source.into(),
        }
    }

    pub fn dependency_resolution(image: impl Into<String>, source: ResolveError) -> Self {
        Self::DependencyResolution {
            image: image.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::Configuration { .. } => ErrorKind::Configuration,
            BuildError::DependencyResolution { .. } => ErrorKind::DependencyResolution,
        }
    }

    /// キャンセルまたはデッドライン超過で打ち切られたか
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            BuildError::DependencyResolution {
                source: ResolveError::Interrupted(_),
                ..
            }
        )
    }

    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            BuildError::Configuration { field: "timeout", .. } => {
                format!(
                    "{}\n\
                     \n\
                     build.cluster.timeout は \"20m\" や \"1h30m\" のような形式で指定してください。\n\
                     使用できる単位: ns, us, ms, s, m, h",
                    self
                )
            }
            BuildError::Configuration { field: "cluster", .. } => {
                format!(
                    "{}\n\
                     \n\
                     Kaniko ビルダーを使うには設定ファイルに build.cluster ブロックが必要です。",
                    self
                )
            }
            BuildError::DependencyResolution {
                source: ResolveError::DockerfileNotFound(path),
                ..
            } => {
                format!(
                    "{}\n\
                     \n\
                     解決方法:\n\
                     1. Dockerfileのパスを確認してください\n\
                     2. kaniko.dockerfile で明示的にパスを指定してください: {}",
                    self,
                    path.display()
                )
            }
            _ => format!("{}", self),
        }
    }
}

/// 依存ファイル解決の失敗
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),

    #[error("Dockerfile not found: {0}")]
    DockerfileNotFound(PathBuf),

    #[error("parsing {path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("invalid source pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("file pattern {pattern:?} must match at least one file")]
    NoMatch { pattern: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Interrupted(#[from] Interrupted),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, BuildError>;
