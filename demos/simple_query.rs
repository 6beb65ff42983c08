use cognite_pygen::{
    Client, ClientConfig, Direction, NodeId, QueryBuilder, QueryStep, ViewId,
};
use std::env;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();

    let space = env::var("CDF_MODEL_SPACE").unwrap_or_else(|_| "power-models".to_string());
    let client = Client::new(ClientConfig::from_env()?.with_client_name("simple-query-demo"))?;

    let turbine = ViewId::new(&space, "WindTurbine", "1");
    let blade = ViewId::new(&space, "Blade", "1");

    let mut builder = QueryBuilder::new()
        .with_step(QueryStep::nodes("turbines", None).select_view(&turbine).with_limit(100))?
        .with_step(
            QueryStep::edges(
                "blade_edges",
                "turbines",
                &NodeId::new(&space, "WindTurbine.blades"),
                Direction::Outwards,
            )
            .with_connection_property("blades"),
        )?
        .with_step(QueryStep::edge_targets("blades", "blade_edges").select_view(&blade))?;

    let turbines = client.execute_query(&mut builder).await?;
    for turbine in &turbines {
        let blades = turbine
            .get("blades")
            .and_then(|blades| blades.as_array())
            .map_or(0, Vec::len);
        println!("{}: {} blades", turbine["externalId"], blades);
    }

    Ok(())
}
