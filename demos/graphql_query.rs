use cognite_pygen::{Client, ClientConfig, DataModelId, GraphQlConnection, Page};
use serde::Deserialize;
use std::env;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Data {
    list_wind_turbine: GraphQlConnection<WindTurbine>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
struct WindTurbine {
    external_id: String,
    name: Option<String>,
    capacity: Option<f64>,
}

const QUERY: &str = r#"
query ListTurbines($cursor: String) {
  listWindTurbine(first: 100, after: $cursor) {
    items { externalId name capacity }
    pageInfo { hasNextPage endCursor }
  }
}
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();

    let space = env::var("CDF_MODEL_SPACE").unwrap_or_else(|_| "power-models".to_string());
    let client = Client::new(ClientConfig::from_env()?)?;
    let data_model = DataModelId::new(space, "Windmill", "1");

    let mut cursor: Option<String> = None;
    loop {
        let variables = serde_json::json!({ "cursor": cursor });
        let response = client.graphql::<Data>(&data_model, QUERY, Some(variables)).await?;
        let Some(data) = response.data else { break };

        let page: Page<WindTurbine> = data.list_wind_turbine.into();
        for turbine in &page.items {
            println!("{turbine:?}");
        }
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Ok(())
}
