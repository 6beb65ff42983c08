//! generated windmill client
//!
//! typed models and apis for the `power-models:Windmill/1` data model.

pub mod blade;
pub mod nacelle;
pub mod wind_turbine;

pub use blade::{Blade, BladeApi, BladeFilter, BladeWrite};
pub use nacelle::{Nacelle, NacelleApi, NacelleFilter, NacelleWrite};
pub use wind_turbine::{WindTurbine, WindTurbineApi, WindTurbineFilter, WindTurbineWrite};

use cognite_pygen::{Client, ClientConfig, DataModelId, GraphQlResponse, Result};
use serde_json::Value;

/// space holding the data model and its views
pub const DATA_MODEL_SPACE: &str = "power-models";

/// space new instances are written to unless a write model names another
pub const DEFAULT_INSTANCE_SPACE: &str = "windmill-instances";

pub fn data_model_id() -> DataModelId {
    DataModelId::new(DATA_MODEL_SPACE, "Windmill", "1")
}

/// entry point grouping the per-view apis
#[derive(Clone)]
pub struct WindmillClient {
    client: Client,
}

impl WindmillClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self::from_client(Client::new(config)?))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// the underlying data modeling client
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn wind_turbine(&self) -> WindTurbineApi<'_> {
        WindTurbineApi::new(&self.client)
    }

    pub fn blade(&self) -> BladeApi<'_> {
        BladeApi::new(&self.client)
    }

    pub fn nacelle(&self) -> NacelleApi<'_> {
        NacelleApi::new(&self.client)
    }

    /// run a graphql query against the windmill data model
    pub async fn graphql_query(
        &self,
        query: &str,
        variables: Option<Value>,
    ) -> Result<GraphQlResponse<Value>> {
        self.client
            .graphql_query(&data_model_id(), query, variables)
            .await
    }
}
