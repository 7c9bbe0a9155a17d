use fluxmgmt_http::{BatchOptions, ManagementClient, ResourceUpsert};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let project = std::env::var("FLUXMGMT_PROJECT")?;
    let client = ManagementClient::from_env()?;

    let items: Vec<ResourceUpsert> = (1..=20)
        .map(|n| ResourceUpsert::new(format!("post-{n}"), "post", json!({"title": format!("Post {n}")})))
        .collect();

    let options = BatchOptions::default()
        .with_concurrency(5)
        .with_progress(|progress| {
            println!("{}/{} done (item {})", progress.completed, progress.total, progress.index)
        });

    let result = client.batch_upsert_resources(&project, items, options).await?;
    println!("{} upserted", result.succeeded.len());
    for failure in result.failed {
        eprintln!("item {} ({}) failed: {}", failure.index, failure.key, failure.error);
    }

    Ok(())
}
