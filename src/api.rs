//! per-view node apis
//!
//! [`NodeApi`] binds a [`Client`] to one [`DomainModel`] so generated crates
//! only have to add their filter arguments on top.

use crate::client::Client;
use crate::domain::{decode, DomainModel, DomainModelWrite};
use crate::error::Result;
use crate::filters::Filter;
use crate::ids::{InstanceRef, InstanceType, NodeId, ViewId};
use crate::instances::{
    AggregateRequest, AggregateResponse, AppliedInstance, Aggregation, Instance, InstanceSort,
    ListRequest, SearchRequest, INSTANCE_LIST_LIMIT,
};
use crate::query::{unpack_instance, QueryBuilder, QueryStep};
use std::marker::PhantomData;

/// limit used when a read call does not name one
pub const DEFAULT_LIMIT_READ: u64 = 25;

/// typed access to the nodes of one view
pub struct NodeApi<'a, T> {
    client: &'a Client,
    view: ViewId,
    _model: PhantomData<fn() -> T>,
}

impl<'a, T: DomainModel> NodeApi<'a, T> {
    pub fn new(client: &'a Client) -> Self {
        Self {
            client,
            view: T::view_id(),
            _model: PhantomData,
        }
    }

    pub fn view_id(&self) -> &ViewId {
        &self.view
    }

    pub fn client(&self) -> &'a Client {
        self.client
    }

    /// fetch nodes by id; ids that do not exist are skipped
    pub async fn retrieve(&self, ids: &[NodeId]) -> Result<Vec<T>> {
        let refs: Vec<InstanceRef> = ids.iter().map(InstanceRef::node).collect();
        let instances = self
            .client
            .retrieve(&refs, std::slice::from_ref(&self.view))
            .await?;
        decode_nodes(&instances)
    }

    pub async fn retrieve_one(&self, id: &NodeId) -> Result<Option<T>> {
        let mut found = self.retrieve(std::slice::from_ref(id)).await?;
        Ok(found.pop())
    }

    /// list nodes with data in this view; `None` reads [`DEFAULT_LIMIT_READ`]
    pub async fn list(
        &self,
        filter: Option<Filter>,
        limit: Option<u64>,
        sort: Vec<InstanceSort>,
    ) -> Result<Vec<T>> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT_READ);
        let request = ListRequest::nodes(&self.view)
            .with_filter(self.with_has_data(filter))
            .with_sort(sort);
        let instances = self.client.list_all(request, Some(limit)).await?;
        decode_nodes(&instances)
    }

    /// list every matching node
    pub async fn list_all(&self, filter: Option<Filter>, sort: Vec<InstanceSort>) -> Result<Vec<T>> {
        let request = ListRequest::nodes(&self.view)
            .with_filter(self.with_has_data(filter))
            .with_sort(sort);
        let instances = self.client.list_all(request, None).await?;
        decode_nodes(&instances)
    }

    /// free-text search over `properties`, or every text property when empty
    pub async fn search(
        &self,
        query: &str,
        properties: &[&str],
        filter: Option<Filter>,
        limit: Option<u64>,
    ) -> Result<Vec<T>> {
        let request = SearchRequest {
            view: self.view.clone(),
            query: Some(query.to_string()),
            instance_type: InstanceType::Node,
            properties: properties.iter().map(|p| p.to_string()).collect(),
            filter,
            limit: limit.unwrap_or(DEFAULT_LIMIT_READ).min(INSTANCE_LIST_LIMIT),
        };
        let instances = self.client.search(&request).await?;
        decode_nodes(&instances)
    }

    pub async fn aggregate(
        &self,
        aggregations: Vec<Aggregation>,
        group_by: &[&str],
        query: Option<&str>,
        properties: &[&str],
        filter: Option<Filter>,
    ) -> Result<AggregateResponse> {
        let mut request = AggregateRequest::new(&self.view, aggregations).with_filter(filter);
        request.group_by = group_by.iter().map(|p| p.to_string()).collect();
        request.query = query.map(str::to_string);
        request.properties = properties.iter().map(|p| p.to_string()).collect();
        self.client.aggregate(&request).await
    }

    /// number of nodes matching `filter`
    pub async fn count(&self, filter: Option<Filter>) -> Result<u64> {
        let response = self
            .aggregate(vec![Aggregation::count()], &[], None, &[], filter)
            .await?;
        Ok(response.first_count().unwrap_or(0))
    }

    /// create or update nodes (and their edges)
    pub async fn apply<W: DomainModelWrite>(
        &self,
        items: &[W],
        replace: bool,
    ) -> Result<Vec<AppliedInstance>> {
        let instances = items
            .iter()
            .flat_map(|item| item.to_instances_apply())
            .collect();
        self.client.apply(instances, replace).await
    }

    pub async fn delete(&self, ids: &[NodeId]) -> Result<Vec<NodeId>> {
        let refs = ids.iter().map(InstanceRef::node).collect();
        let deleted = self.client.delete(refs).await?;
        Ok(deleted.iter().map(InstanceRef::id).collect())
    }

    /// a query builder whose root step selects this view's nodes
    ///
    /// the root step is named after the view's external id; chain further
    /// hops onto it before executing.
    pub fn query(&self, filter: Option<Filter>, limit: Option<u64>) -> Result<QueryBuilder> {
        let mut root = QueryStep::nodes(self.root_step_name(), self.with_has_data(filter))
            .select_view(&self.view);
        if let Some(limit) = limit {
            root = root.with_limit(limit);
        }
        QueryBuilder::new().with_step(root)
    }

    pub fn root_step_name(&self) -> String {
        self.view.external_id.clone()
    }

    fn with_has_data(&self, filter: Option<Filter>) -> Option<Filter> {
        Filter::and_all(
            std::iter::once(Filter::has_data([self.view.clone()])).chain(filter),
        )
    }
}

fn decode_nodes<T: DomainModel>(instances: &[Instance]) -> Result<Vec<T>> {
    instances
        .iter()
        .filter(|instance| instance.as_node().is_some())
        .map(|instance| decode(unpack_instance(instance)))
        .collect()
}

impl Client {
    /// typed api for the nodes of `T`'s view
    pub fn nodes<T: DomainModel>(&self) -> NodeApi<'_, T> {
        NodeApi::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::domain::NodeMeta;
    use crate::filters::FilterBuilder;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Blade {
        #[serde(flatten)]
        meta: NodeMeta,
    }

    impl DomainModel for Blade {
        fn view_id() -> ViewId {
            ViewId::new("power", "Blade", "1")
        }
    }

    fn client() -> Client {
        Client::new(ClientConfig::new("http://localhost:1234", "windfarm", "token")).unwrap()
    }

    #[test]
    fn test_query_root_step() {
        let client = client();
        let api = client.nodes::<Blade>();
        let filter = FilterBuilder::new(api.view_id())
            .boolean("isDamaged", Some(true))
            .build();
        let builder = api.query(filter, Some(5)).unwrap();

        let step = builder.step("Blade").expect("root step");
        assert_eq!(step.max_retrieve_limit(), Some(5));
        assert!(step.has_projection());

        let request = serde_json::to_value(builder.build()).unwrap();
        let filter = &request["with"]["Blade"]["nodes"]["filter"];
        assert_eq!(filter["and"][0]["hasData"][0]["externalId"], "Blade");
        assert_eq!(filter["and"][1]["equals"]["value"], json!(true));
    }

    #[test]
    fn test_has_data_without_filter() {
        let client = client();
        let api = client.nodes::<Blade>();
        let filter = api.with_has_data(None).unwrap();
        assert!(matches!(filter, Filter::HasData(ref views) if views.len() == 1));
    }

    #[test]
    fn test_decode_nodes_skips_edges() {
        let instances: Vec<Instance> = serde_json::from_value(json!([
            {
                "instanceType": "node",
                "space": "power",
                "externalId": "blade-1",
                "version": 1,
                "lastUpdatedTime": 2,
                "createdTime": 1,
                "properties": {}
            },
            {
                "instanceType": "edge",
                "space": "power",
                "externalId": "e",
                "version": 1,
                "lastUpdatedTime": 2,
                "createdTime": 1,
                "type": {"space": "power", "externalId": "WindTurbine.blades"},
                "startNode": {"space": "power", "externalId": "wt-1"},
                "endNode": {"space": "power", "externalId": "blade-1"},
                "properties": {}
            }
        ]))
        .unwrap();
        let blades: Vec<Blade> = decode_nodes(&instances).unwrap();
        assert_eq!(blades.len(), 1);
        assert_eq!(blades[0].meta.external_id, "blade-1");
    }
}
