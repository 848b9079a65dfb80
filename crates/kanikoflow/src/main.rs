mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kflow")]
#[command(about = "クラスタの Kaniko ビルドを、手元で確かめる。", long_about = None)]
struct Cli {
    /// 設定ファイルのパス（省略時は kanikoflow.yaml を探索）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// TLS 検証を緩めるレジストリ（複数指定可）
    #[arg(long = "insecure-registry", global = true, value_name = "REGISTRY")]
    insecure_registries: Vec<String>,

    /// デバッグログを表示
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// アーティファクトの依存ファイルを表示
    Deps {
        /// イメージ名（省略時は全アーティファクト）
        image: Option<String>,
        /// JSON で出力
        #[arg(long)]
        json: bool,
        /// 解決の制限時間（例: 30s, 2m）
        #[arg(long)]
        timeout: Option<String>,
    },
    /// ビルダーが付与するラベルを表示
    Labels {
        /// JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// ビルダーの一時リソースを片付け
    Prune,
    /// 設定ファイルを検証
    Validate,
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログは stderr に出力（stdout は結果の出力に使う）
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("kanikoflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let run_context = commands::load_run_context(cli.config.as_deref(), &cli.insecure_registries)?;

    match cli.command {
        Commands::Deps {
            image,
            json,
            timeout,
        } => {
            let ok =
                commands::deps::handle(&run_context, image.as_deref(), json, timeout.as_deref())
                    .await?;
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::Labels { json } => {
            commands::labels::handle(&run_context, json)?;
        }
        Commands::Prune => {
            commands::prune::handle(&run_context)?;
        }
        Commands::Validate => {
            commands::validate::handle(&run_context)?;
        }
        Commands::Version => {
            unreachable!("Version is handled before config loading");
        }
    }

    Ok(())
}
