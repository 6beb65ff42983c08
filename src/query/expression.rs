//! query wire types
//!
//! result-set expressions, selects, and the request/response of
//! `POST models/instances/query`.

use crate::filters::Filter;
use crate::ids::{ViewId, ViewPropertyRef};
use crate::instances::{Instance, InstanceSort, SourceSelector};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// traversal direction for edges and `through` relations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Outwards,
    Inwards,
}

impl Direction {
    /// edge attribute holding the node the traversal starts from
    pub fn near_end(self) -> &'static str {
        match self {
            Direction::Outwards => "startNode",
            Direction::Inwards => "endNode",
        }
    }

    /// edge attribute holding the node the traversal arrives at
    pub fn far_end(self) -> &'static str {
        match self {
            Direction::Outwards => "endNode",
            Direction::Inwards => "startNode",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainTo {
    Source,
    Destination,
}

/// nodes matching a filter, optionally reached from a prior result set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExpression {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub through: Option<ViewPropertyRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_to: Option<ChainTo>,
}

/// edges reached from the nodes of a prior result set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeExpression {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_filter: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination_filter: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<u32>,
    pub direction: Direction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_each: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_to: Option<ChainTo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Expression {
    Nodes(NodeExpression),
    Edges(EdgeExpression),
}

impl Expression {
    /// name of the result set this expression starts from
    pub fn from_step(&self) -> Option<&str> {
        match self {
            Expression::Nodes(nodes) => nodes.from.as_deref(),
            Expression::Edges(edges) => edges.from.as_deref(),
        }
    }

    pub fn filter(&self) -> Option<&Filter> {
        match self {
            Expression::Nodes(nodes) => nodes.filter.as_ref(),
            Expression::Edges(edges) => edges.filter.as_ref(),
        }
    }

    pub fn is_edges(&self) -> bool {
        matches!(self, Expression::Edges(_))
    }
}

/// one entry of the request's `with` map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSetExpression {
    #[serde(flatten)]
    pub expression: Expression,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<InstanceSort>,
}

/// projection of a result set; no sources means identifiers only
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Select {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceSelector>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<InstanceSort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl Select {
    /// every property of one view
    pub fn view(view: &ViewId) -> Self {
        Self {
            sources: vec![SourceSelector::all(view)],
            ..Self::default()
        }
    }

    /// identifiers only
    pub fn none() -> Self {
        Self::default()
    }

    pub fn has_projection(&self) -> bool {
        !self.sources.is_empty()
    }

    pub fn first_view(&self) -> Option<&ViewId> {
        self.sources.first().map(|selector| &selector.source)
    }
}

/// body of `POST models/instances/query`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub with: BTreeMap<String, ResultSetExpression>,
    pub select: BTreeMap<String, Select>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub cursors: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
}

/// response of `POST models/instances/query`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub items: BTreeMap<String, Vec<Instance>>,
    #[serde(default)]
    pub next_cursor: BTreeMap<String, Option<String>>,
}

impl QueryResponse {
    /// take the batch and next cursor for one result set
    pub fn take(&mut self, name: &str) -> (Vec<Instance>, Option<String>) {
        let items = self.items.remove(name).unwrap_or_default();
        let cursor = self.next_cursor.remove(name).flatten();
        (items, cursor)
    }
}
