use kanikoflow_build::ArtifactBuilder;
use kanikoflow_config::RunContext;

pub fn handle(run_context: &RunContext, json: bool) -> anyhow::Result<()> {
    let builder = super::cluster_builder(run_context);
    let labels = builder.labels();

    if json {
        println!("{}", serde_json::to_string_pretty(&labels)?);
    } else {
        for (key, value) in &labels {
            println!("{}={}", key, value);
        }
    }

    Ok(())
}
