//! seam between the query executor and the service

use crate::error::Result;
use crate::instances::{AggregateRequest, AggregateResponse};
use crate::query::expression::{QueryRequest, QueryResponse};
use async_trait::async_trait;

/// the two calls the executor needs from the service
///
/// [`crate::Client`] implements this over http; tests drive the executor
/// with scripted responses.
#[async_trait]
pub trait QueryTransport: Send + Sync {
    /// run one round of a multi-step query
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse>;

    /// run an aggregate, used for count estimation
    async fn aggregate(&self, request: &AggregateRequest) -> Result<AggregateResponse>;
}
