use crate::error::Result;
use crate::exec::ExecContext;
use async_trait::async_trait;
use kanikoflow_config::Artifact;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

/// ビルダー共通の機能
///
/// オーケストレーション層はビルダー種別に関わらずこのトレイト経由で呼び出す。
#[async_trait]
pub trait ArtifactBuilder: Send + Sync {
    /// ビルダー固有のラベル
    fn labels(&self) -> BTreeMap<String, String>;

    /// 変更されたら再ビルドが必要になるファイル（絶対パス）
    async fn dependencies_for_artifact(
        &self,
        ctx: &ExecContext,
        artifact: &Artifact,
    ) -> Result<Vec<PathBuf>>;

    /// ビルドセッション後にビルダーが持つ一時リソースを片付ける
    fn prune(&self, ctx: &ExecContext, out: &mut dyn Write) -> Result<()>;
}
