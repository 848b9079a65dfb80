//! Kaniko によるクラスタビルダー
//!
//! イメージのビルド自体はクラスタ上の Kaniko executor が行います。
//! ここではビルダーの構築・依存ファイルの解決・ラベル付与を扱います。

use crate::builder::ArtifactBuilder;
use crate::error::{BuildError, ResolveError, Result};
use crate::exec::ExecContext;
use crate::labels;
use crate::paths::absolute_paths;
use crate::resolver::{DependencyRequest, DependencyResolver, DockerfileResolver};
use async_trait::async_trait;
use kanikoflow_config::{
    Artifact, ClusterConfig, InsecureRegistries, RunContext, format_duration, parse_duration,
};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Kubernetes 上で Kaniko を使ってイメージをビルドするビルダー
///
/// 構築後は不変なので、複数のアーティファクトの依存解決を並行して呼び出せる。
#[derive(Clone)]
pub struct ClusterBuilder {
    cluster: ClusterConfig,
    timeout: Duration,
    insecure_registries: InsecureRegistries,
    resolver: Arc<dyn DependencyResolver>,
}

impl ClusterBuilder {
    /// クラスタ設定からビルダーを作成
    ///
    /// タイムアウトが解釈できない場合は失敗する（デフォルト値での代用はしない）。
    pub fn new(cluster: ClusterConfig, insecure_registries: InsecureRegistries) -> Result<Self> {
        let timeout = parse_duration(&cluster.timeout)
            .map_err(|source| BuildError::configuration("timeout", source))?;

        debug!(
            namespace = %cluster.namespace,
            timeout = %format_duration(timeout),
            insecure_registries = insecure_registries.len(),
            "Created kaniko cluster builder"
        );

        Ok(Self {
            cluster,
            timeout,
            insecure_registries,
            resolver: Arc::new(DockerfileResolver::new()),
        })
    }

    /// 実行コンテキストからビルダーを作成（build.cluster が必要）
    pub fn from_run_context(ctx: &RunContext) -> Result<Self> {
        let cluster = ctx.cluster().cloned().ok_or_else(|| {
            BuildError::configuration("cluster", "build.cluster is not configured")
        })?;
        Self::new(cluster, ctx.insecure_registries.clone())
    }

    /// 依存ファイルの解決方法を差し替える
    pub fn with_resolver(mut self, resolver: Arc<dyn DependencyResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn cluster(&self) -> &ClusterConfig {
        &self.cluster
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn insecure_registries(&self) -> &InsecureRegistries {
        &self.insecure_registries
    }
}

impl fmt::Debug for ClusterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterBuilder")
            .field("cluster", &self.cluster)
            .field("timeout", &self.timeout)
            .field("insecure_registries", &self.insecure_registries)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ArtifactBuilder for ClusterBuilder {
    fn labels(&self) -> BTreeMap<String, String> {
        labels::builder_labels(labels::KANIKO)
    }

    #[tracing::instrument(skip_all, fields(image = %artifact.image_name))]
    async fn dependencies_for_artifact(
        &self,
        ctx: &ExecContext,
        artifact: &Artifact,
    ) -> Result<Vec<PathBuf>> {
        let fail = |source: ResolveError| {
            BuildError::dependency_resolution(&artifact.image_name, source)
        };

        if artifact.workspace.as_os_str().is_empty() {
            return Err(fail(ResolveError::InvalidArtifact(
                "workspace path is empty".to_string(),
            )));
        }
        if artifact.dockerfile_path().as_os_str().is_empty() {
            return Err(fail(ResolveError::InvalidArtifact(
                "Dockerfile path is empty".to_string(),
            )));
        }

        let workspace =
            std::path::absolute(&artifact.workspace).map_err(|e| fail(ResolveError::Io(e)))?;
        let request = DependencyRequest {
            workspace: &workspace,
            dockerfile: artifact.dockerfile_path(),
            build_args: artifact.build_args(),
            insecure_registries: &self.insecure_registries,
        };

        let paths = match ctx.run(self.resolver.resolve(ctx, &request)).await {
            Ok(result) => result.map_err(fail)?,
            Err(reason) => return Err(fail(reason.into())),
        };

        let paths = absolute_paths(&workspace, paths);
        debug!(count = paths.len(), "Resolved artifact dependencies");
        Ok(paths)
    }

    /// クラスタ上のリソースは executor 側が管理するため、何もしない
    fn prune(&self, _ctx: &ExecContext, _out: &mut dyn Write) -> Result<()> {
        Ok(())
    }
}
