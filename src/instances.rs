//! instance wire types
//!
//! request and response bodies for the `models/instances` endpoints.

use crate::filters::Filter;
use crate::ids::{InstanceRef, InstanceType, NodeId, PropertyRef, ViewId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// max items the service accepts in one apply, delete, or by-ids call
pub const INSTANCE_ITEM_LIMIT: usize = 1_000;

/// max items returned by one list or search call
pub const INSTANCE_LIST_LIMIT: u64 = 1_000;

/// property values of an instance: space -> "view/version" -> property -> value
pub type PropertiesBySource = BTreeMap<String, BTreeMap<String, Map<String, Value>>>;

/// a node or an edge as returned by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "instanceType", rename_all = "lowercase")]
pub enum Instance {
    Node(Node),
    Edge(Edge),
}

impl Instance {
    pub fn id(&self) -> NodeId {
        match self {
            Instance::Node(node) => NodeId::new(&node.space, &node.external_id),
            Instance::Edge(edge) => NodeId::new(&edge.space, &edge.external_id),
        }
    }

    pub fn instance_type(&self) -> InstanceType {
        match self {
            Instance::Node(_) => InstanceType::Node,
            Instance::Edge(_) => InstanceType::Edge,
        }
    }

    pub fn properties(&self) -> &PropertiesBySource {
        match self {
            Instance::Node(node) => &node.properties,
            Instance::Edge(edge) => &edge.properties,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Instance::Node(node) => Some(node),
            Instance::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Instance::Edge(edge) => Some(edge),
            Instance::Node(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub space: String,
    pub external_id: String,
    pub version: i64,
    pub last_updated_time: i64,
    pub created_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_time: Option<i64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<NodeId>,
    #[serde(default)]
    pub properties: PropertiesBySource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub space: String,
    pub external_id: String,
    pub version: i64,
    pub last_updated_time: i64,
    pub created_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_time: Option<i64>,
    #[serde(rename = "type")]
    pub edge_type: NodeId,
    pub start_node: NodeId,
    pub end_node: NodeId,
    #[serde(default)]
    pub properties: PropertiesBySource,
}

/// which properties of a view to return
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSelector {
    pub source: ViewId,
    #[serde(default)]
    pub properties: Vec<String>,
}

impl SourceSelector {
    /// every property of the view
    pub fn all(view: &ViewId) -> Self {
        Self {
            source: view.clone(),
            properties: vec!["*".to_string()],
        }
    }
}

/// view to read properties through, for list and by-ids calls
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRef {
    pub source: ViewId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSort {
    pub property: PropertyRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<SortDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nulls_first: Option<bool>,
}

impl InstanceSort {
    pub fn ascending(property: PropertyRef) -> Self {
        Self {
            property,
            direction: Some(SortDirection::Ascending),
            nulls_first: None,
        }
    }

    pub fn descending(property: PropertyRef) -> Self {
        Self {
            property,
            direction: Some(SortDirection::Descending),
            nulls_first: None,
        }
    }
}

/// body of `POST models/instances/list`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    pub instance_type: InstanceType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<InstanceSort>,
    pub limit: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl ListRequest {
    pub fn nodes(view: &ViewId) -> Self {
        Self {
            instance_type: InstanceType::Node,
            sources: vec![SourceRef {
                source: view.clone(),
            }],
            filter: None,
            sort: Vec::new(),
            limit: INSTANCE_LIST_LIMIT,
            cursor: None,
        }
    }

    pub fn with_filter(mut self, filter: Option<Filter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_sort(mut self, sort: Vec<InstanceSort>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit.min(INSTANCE_LIST_LIMIT);
        self
    }
}

/// response of list, search, by-ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceList {
    #[serde(default)]
    pub items: Vec<Instance>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// body of `POST models/instances/byids`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ByIdsRequest {
    pub items: Vec<InstanceRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceRef>,
}

/// body of `POST models/instances/search`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub view: ViewId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub instance_type: InstanceType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    pub limit: u64,
}

/// an aggregate to compute over a view's property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Aggregation {
    Count { property: String },
    Sum { property: String },
    Avg { property: String },
    Min { property: String },
    Max { property: String },
    Histogram { property: String, interval: f64 },
}

impl Aggregation {
    pub fn count() -> Self {
        Aggregation::Count {
            property: "externalId".to_string(),
        }
    }
}

/// body of `POST models/instances/aggregate`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRequest {
    pub view: ViewId,
    pub instance_type: InstanceType,
    pub aggregates: Vec<Aggregation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl AggregateRequest {
    pub fn new(view: &ViewId, aggregates: Vec<Aggregation>) -> Self {
        Self {
            view: view.clone(),
            instance_type: InstanceType::Node,
            aggregates,
            group_by: Vec::new(),
            query: None,
            properties: Vec::new(),
            filter: None,
            limit: None,
        }
    }

    pub fn with_filter(mut self, filter: Option<Filter>) -> Self {
        self.filter = filter;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResponse {
    #[serde(default)]
    pub items: Vec<AggregateGroup>,
}

impl AggregateResponse {
    /// the count of the first group, if the first aggregate is a count
    pub fn first_count(&self) -> Option<u64> {
        let value = self.items.first()?.aggregates.first()?;
        if value.aggregate != "count" {
            return None;
        }
        value.value.map(|count| count.max(0.0) as u64)
    }
}

/// aggregates for one group (or the whole set when not grouped)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateGroup {
    #[serde(default)]
    pub instance_type: Option<InstanceType>,
    #[serde(default)]
    pub group: Map<String, Value>,
    #[serde(default)]
    pub aggregates: Vec<AggregatedValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedValue {
    pub aggregate: String,
    pub property: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub interval: Option<f64>,
    #[serde(default)]
    pub buckets: Vec<HistogramBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub start: f64,
    pub count: u64,
}

/// property values written through one view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceData {
    pub source: ViewId,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeApply {
    pub space: String,
    pub external_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_version: Option<i64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<NodeId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceData>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeApply {
    pub space: String,
    pub external_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_version: Option<i64>,
    #[serde(rename = "type")]
    pub edge_type: NodeId,
    pub start_node: NodeId,
    pub end_node: NodeId,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceData>,
}

impl EdgeApply {
    /// edge without properties; the external id follows `{start}:{end}`
    pub fn connect(edge_type: &NodeId, start: &NodeId, end: &NodeId) -> Self {
        Self {
            space: start.space.clone(),
            external_id: format!("{}:{}", start.external_id, end.external_id),
            existing_version: None,
            edge_type: edge_type.clone(),
            start_node: start.clone(),
            end_node: end.clone(),
            sources: Vec::new(),
        }
    }
}

/// an item of an apply request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "instanceType", rename_all = "lowercase")]
pub enum InstanceApply {
    Node(NodeApply),
    Edge(EdgeApply),
}

/// body of `POST models/instances`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub items: Vec<InstanceApply>,
    pub auto_create_direct_relations: bool,
    pub replace: bool,
}

/// per-instance result of an apply call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedInstance {
    pub instance_type: InstanceType,
    pub space: String,
    pub external_id: String,
    pub version: i64,
    pub was_modified: bool,
    #[serde(default)]
    pub created_time: Option<i64>,
    #[serde(default)]
    pub last_updated_time: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct AppliedList {
    #[serde(default)]
    pub items: Vec<AppliedInstance>,
}

/// body of `POST models/instances/delete`, also its response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub items: Vec<InstanceRef>,
}
