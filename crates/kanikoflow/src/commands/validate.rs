use colored::Colorize;
use kanikoflow_config::{RunContext, format_duration};

pub fn handle(run_context: &RunContext) -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());

    let builder = super::cluster_builder(run_context);
    let cluster = builder.cluster();
    let artifacts = &run_context.config.build.artifacts;

    println!("{}", "✓ 設定ファイルは正常です！".green().bold());
    println!();
    println!("サマリー:");
    println!("  ネームスペース: {}", cluster.namespace.cyan());
    println!("  タイムアウト: {}", format_duration(builder.timeout()));
    if let Some(account) = &cluster.service_account {
        println!("  サービスアカウント: {}", account);
    }
    println!("  プルシークレット: {}", cluster.pull_secret_name);

    println!("  アーティファクト: {}個", artifacts.len());
    for artifact in artifacts {
        println!(
            "    - {} ({}, {})",
            artifact.image_name.cyan(),
            artifact.workspace.display(),
            artifact.dockerfile_path().display()
        );
    }

    let registries = builder.insecure_registries();
    if !registries.is_empty() {
        println!("  insecure レジストリ: {}個", registries.len());
        for registry in registries.iter() {
            println!("    - {}", registry);
        }
    }

    Ok(())
}
