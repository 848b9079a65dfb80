use colored::Colorize;
use futures_util::future::join_all;
use kanikoflow_build::{ArtifactBuilder, ExecContext};
use kanikoflow_config::{Artifact, RunContext, parse_duration};
use serde_json::json;

/// 依存ファイルを表示する。1つでも失敗したら `false` を返す
pub async fn handle(
    run_context: &RunContext,
    image: Option<&str>,
    json: bool,
    timeout: Option<&str>,
) -> anyhow::Result<bool> {
    let builder = super::cluster_builder(run_context);

    let artifacts: Vec<&Artifact> = match image {
        Some(image) => match run_context.config.find_artifact(image) {
            Some(artifact) => vec![artifact],
            None => anyhow::bail!("アーティファクトが見つかりません: {}", image),
        },
        None => run_context.config.build.artifacts.iter().collect(),
    };

    if artifacts.is_empty() {
        if json {
            println!("{{}}");
        } else {
            println!("{}", "アーティファクトが定義されていません".yellow());
        }
        return Ok(true);
    }

    let ctx = match timeout {
        Some(timeout) => ExecContext::with_timeout(parse_duration(timeout)?),
        None => ExecContext::new(),
    };

    // Ctrl-C で解決中の処理を打ち切る
    let token = ctx.token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let results = join_all(
        artifacts
            .iter()
            .map(|artifact| builder.dependencies_for_artifact(&ctx, artifact)),
    )
    .await;

    let mut ok = true;

    if json {
        let mut output = serde_json::Map::new();
        for (artifact, result) in artifacts.iter().zip(results) {
            let entry = match result {
                Ok(paths) => {
                    let paths: Vec<String> =
                        paths.iter().map(|p| p.display().to_string()).collect();
                    json!({ "dependencies": paths })
                }
                Err(e) => {
                    ok = false;
                    json!({ "error": e.to_string() })
                }
            };
            output.insert(artifact.image_name.clone(), entry);
        }
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(ok);
    }

    for (artifact, result) in artifacts.iter().zip(results) {
        match result {
            Ok(paths) => {
                println!(
                    "{} ({}個)",
                    artifact.image_name.cyan().bold(),
                    paths.len()
                );
                for path in paths {
                    println!("  {}", path.display());
                }
            }
            Err(e) => {
                ok = false;
                eprintln!("{} {}", "✗".red().bold(), artifact.image_name.cyan());
                eprintln!("  {}", e.user_message());
            }
        }
    }

    Ok(ok)
}
