use colored::Colorize;
use kanikoflow_build::{ArtifactBuilder, ExecContext};
use kanikoflow_config::RunContext;
use std::io::Write;

pub fn handle(run_context: &RunContext) -> anyhow::Result<()> {
    let builder = super::cluster_builder(run_context);

    let mut stdout = std::io::stdout().lock();
    builder.prune(&ExecContext::new(), &mut stdout)?;
    stdout.flush()?;

    eprintln!("{}", "✓ 片付けが完了しました".green());
    Ok(())
}
