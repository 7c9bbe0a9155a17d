use fluxmgmt_http::{ListQuery, ManagementClient, ResourceUpsert};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let project = std::env::var("FLUXMGMT_PROJECT")?;
    let client = ManagementClient::from_env()?;

    for project in client.list_projects().await? {
        println!("project {} ({})", project.id, project.name);
    }

    let page = ResourceUpsert::new("home", "page", json!({"title": "Welcome"})).with_name("Home");
    let stored = client.upsert_resource(&project, &page).await?;
    println!("stored {} at version {:?}", stored.key, stored.version);

    let pages = client
        .list_resources(&project, &ListQuery::of_type("page").with_limit(20))
        .await?;
    for summary in pages {
        println!("{summary:?}");
    }

    Ok(())
}
