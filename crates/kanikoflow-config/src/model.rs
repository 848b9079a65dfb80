//! Run configuration データモデル

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// クラスタビルドのデフォルトタイムアウト
pub const DEFAULT_TIMEOUT: &str = "20m";
/// デフォルトの Kubernetes namespace
pub const DEFAULT_NAMESPACE: &str = "default";
/// Kaniko pod がレジストリ認証に使う Secret 名のデフォルト
pub const DEFAULT_PULL_SECRET_NAME: &str = "kaniko-secret";
pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";

/// ビルド引数
///
/// 値が `None` の場合はプロセスの環境変数から取得します（未設定なら Dockerfile 側のデフォルト）。
pub type BuildArgs = BTreeMap<String, Option<String>>;

/// 設定ファイル全体
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    #[serde(default)]
    pub build: BuildConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    /// ビルド対象のイメージ
    #[serde(default)]
    pub artifacts: Vec<Artifact>,

    /// TLS 検証を緩めて接続するレジストリのホスト名
    #[serde(default)]
    pub insecure_registries: Vec<String>,

    /// クラスタ実行設定（Kaniko ビルダーを使う場合は必須）
    #[serde(default)]
    pub cluster: Option<ClusterConfig>,
}

/// クラスタ上でのビルド実行設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// ビルド全体のタイムアウト（Go 形式の duration 文字列）
    #[serde(default = "default_timeout")]
    pub timeout: String,

    #[serde(default)]
    pub service_account: Option<String>,

    #[serde(default = "default_pull_secret_name")]
    pub pull_secret_name: String,

    /// Secret として登録する認証情報ファイルのパス
    #[serde(default)]
    pub pull_secret: Option<PathBuf>,

    #[serde(default)]
    pub docker_config: Option<DockerConfig>,

    #[serde(default)]
    pub resources: ResourceRequirements,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            timeout: default_timeout(),
            service_account: None,
            pull_secret_name: default_pull_secret_name(),
            pull_secret: None,
            docker_config: None,
            resources: ResourceRequirements::default(),
        }
    }
}

/// Docker config.json の供給方法
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerConfig {
    pub path: Option<PathBuf>,
    pub secret_name: Option<String>,
}

/// Kaniko pod のリソース要求
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    pub requests: Option<Resources>,
    pub limits: Option<Resources>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    pub cpu: Option<String>,
    pub memory: Option<String>,
}

/// ビルド対象のイメージ1つ分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// イメージ名（例: registry.local:5000/app）
    #[serde(rename = "image")]
    pub image_name: String,

    /// ワークスペース（ビルドコンテキスト）のパス
    #[serde(rename = "context", default = "default_workspace")]
    pub workspace: PathBuf,

    #[serde(default)]
    pub kaniko: KanikoArtifact,
}

impl Artifact {
    pub fn new(image_name: impl Into<String>, workspace: impl Into<PathBuf>) -> Self {
        Self {
            image_name: image_name.into(),
            workspace: workspace.into(),
            kaniko: KanikoArtifact::default(),
        }
    }

    pub fn dockerfile_path(&self) -> &Path {
        &self.kaniko.dockerfile
    }

    pub fn build_args(&self) -> &BuildArgs {
        &self.kaniko.build_args
    }
}

/// Kaniko 固有のビルド設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KanikoArtifact {
    /// ワークスペースからの相対パス
    #[serde(default = "default_dockerfile")]
    pub dockerfile: PathBuf,

    #[serde(default)]
    pub build_args: BuildArgs,

    /// マルチステージビルドのターゲット
    #[serde(default)]
    pub target: Option<String>,

    #[serde(default)]
    pub cache: Option<KanikoCache>,

    /// Kaniko executor にそのまま渡す追加フラグ
    #[serde(default)]
    pub flags: Vec<String>,
}

impl Default for KanikoArtifact {
    fn default() -> Self {
        Self {
            dockerfile: default_dockerfile(),
            build_args: BuildArgs::new(),
            target: None,
            cache: None,
            flags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KanikoCache {
    /// レイヤキャッシュを置くリポジトリ
    pub repo: Option<String>,
}

impl RunConfig {
    /// 設定内容の検証
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for (index, artifact) in self.build.artifacts.iter().enumerate() {
            if artifact.image_name.trim().is_empty() {
                return Err(ConfigError::InvalidConfig(format!(
                    "artifacts[{}]: image が空です",
                    index
                )));
            }
            if artifact.workspace.as_os_str().is_empty() {
                return Err(ConfigError::InvalidConfig(format!(
                    "artifacts[{}] ({}): context が空です",
                    index, artifact.image_name
                )));
            }
            if artifact.kaniko.dockerfile.as_os_str().is_empty() {
                return Err(ConfigError::InvalidConfig(format!(
                    "artifacts[{}] ({}): dockerfile が空です",
                    index, artifact.image_name
                )));
            }
            if !seen.insert(artifact.image_name.as_str()) {
                return Err(ConfigError::InvalidConfig(format!(
                    "image '{}' が重複しています",
                    artifact.image_name
                )));
            }
        }

        Ok(())
    }

    /// 相対パスのワークスペースを `base_dir` 基準の絶対パスに変換
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        for artifact in &mut self.build.artifacts {
            if artifact.workspace.is_relative() {
                artifact.workspace = normalize(&base_dir.join(&artifact.workspace));
            }
        }
    }

    pub fn find_artifact(&self, image_name: &str) -> Option<&Artifact> {
        self.build
            .artifacts
            .iter()
            .find(|a| a.image_name == image_name)
    }
}

/// `.` 成分を取り除く（`..` はそのまま残す）
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect()
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_timeout() -> String {
    DEFAULT_TIMEOUT.to_string()
}

fn default_pull_secret_name() -> String {
    DEFAULT_PULL_SECRET_NAME.to_string()
}

fn default_workspace() -> PathBuf {
    PathBuf::from(".")
}

fn default_dockerfile() -> PathBuf {
    PathBuf::from(DEFAULT_DOCKERFILE)
}
