//! cognite data modeling client
//!
//! this crate provides a typed client for the cdf data modeling api: instance
//! listing, search, aggregation, apply and delete, graphql against a data
//! model, and a multi-step query builder that pages large traversals with
//! adaptive batch sizes. start with [`Client`] and [`ClientConfig`]; generated
//! model crates implement [`DomainModel`] and use [`NodeApi`].
//!
//! ## quick start
//!
//! ```no_run
//! use cognite_pygen::{Client, ClientConfig, QueryBuilder, QueryStep};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new(ClientConfig::new(
//!     "https://westeurope-1.cognitedata.com",
//!     "my-project",
//!     "token",
//! ))?;
//! let mut builder = QueryBuilder::new().with_step(QueryStep::nodes("nodes", None).with_limit(10))?;
//! let objects = client.execute_query(&mut builder).await?;
//! println!("{} nodes", objects.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## generated clients
//!
//! per-view model types derive `serde::Deserialize` with a flattened
//! [`NodeMeta`] and implement [`DomainModel`]; see the `windmill-client`
//! crate for a complete example.

mod api;
mod client;
mod config;
mod domain;
mod error;
mod filters;
mod graphql;
mod ids;
mod instances;
mod pagination;
pub mod query;

pub use api::{NodeApi, DEFAULT_LIMIT_READ};
pub use client::Client;
pub use config::{ClientConfig, ENV_BASE_URL, ENV_PROJECT, ENV_TOKEN};
pub use domain::{decode, node_apply, DomainModel, DomainModelWrite, NodeMeta, Relation};
pub use error::{Error, Result, REQUEST_TOO_LARGE};
pub use filters::{Filter, FilterBuilder};
pub use graphql::{GraphQlConnection, GraphQlError, GraphQlLocation, GraphQlResponse, PageInfo};
pub use ids::{
    DataModelId, InstanceRef, InstanceType, NodeId, PropertyRef, ViewId, ViewPropertyRef,
};
pub use instances::{
    AggregateGroup, AggregateRequest, AggregateResponse, AggregatedValue, Aggregation,
    AppliedInstance, ApplyRequest, ByIdsRequest, DeleteRequest, Edge, EdgeApply,
    HistogramBucket, Instance, InstanceApply, InstanceList, InstanceSort, ListRequest, Node,
    NodeApply, PropertiesBySource, SearchRequest, SortDirection, SourceData, SourceRef,
    SourceSelector, INSTANCE_ITEM_LIMIT, INSTANCE_LIST_LIMIT,
};
pub use pagination::{Page, Paginator};
pub use query::{Direction, QueryBuilder, QueryStep, QueryTransport, ReturnStep};
