//! multi-step instance queries
//!
//! a [`QueryBuilder`] holds an ordered chain of [`QueryStep`]s: a root node
//! set followed by hops over direct relations, reverse relations, and edges.
//! executing it pages every step against `models/instances/query`, shrinks
//! the batch size when the service answers with a 408, and unpacks the flat
//! batches into nested json objects that typed models deserialize from.

mod builder;
mod expression;
mod progress;
mod step;
mod transport;
mod unpack;

pub use builder::QueryBuilder;
pub use expression::{
    ChainTo, Direction, EdgeExpression, Expression, NodeExpression, QueryRequest, QueryResponse,
    ResultSetExpression, Select,
};
pub use progress::LARGE_QUERY_THRESHOLD;
pub use step::{QueryStep, INSTANCE_QUERY_LIMIT, MIN_BATCH_LIMIT};
pub use transport::QueryTransport;
pub use unpack::{unpack_instance, ReturnStep};
