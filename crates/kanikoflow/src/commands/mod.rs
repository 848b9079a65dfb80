pub mod deps;
pub mod labels;
pub mod prune;
pub mod validate;

use colored::Colorize;
use kanikoflow_build::{BuildError, ClusterBuilder};
use kanikoflow_config::{RunContext, find_config_file, load_config};
use std::path::Path;

/// 設定ファイルを読み込み、CLI で指定されたレジストリと合わせる
pub fn load_run_context(config: Option<&Path>, insecure: &[String]) -> anyhow::Result<RunContext> {
    let path = match config {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };
    tracing::debug!(path = %path.display(), "Using config file");

    let config = load_config(&path)?;
    Ok(RunContext::new(config, insecure))
}

/// ビルダーを作成（失敗時はヒント付きで終了）
pub fn cluster_builder(run_context: &RunContext) -> ClusterBuilder {
    match ClusterBuilder::from_run_context(run_context) {
        Ok(builder) => builder,
        Err(e) => exit_with(&e),
    }
}

fn exit_with(err: &BuildError) -> ! {
    eprintln!("{}", "✗ ビルダーを作成できません".red().bold());
    eprintln!("  {}", err.user_message());
    std::process::exit(1);
}
