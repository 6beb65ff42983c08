//! generated wind turbine model
//!
//! `nacelle` is a direct relation to [`Nacelle`]; `blades` are edges of type
//! `WindTurbine.blades` pointing at [`Blade`] nodes.

use cognite_pygen::{
    node_apply, AppliedInstance, Client, Direction, DomainModel, DomainModelWrite, EdgeApply,
    Filter, FilterBuilder, InstanceApply, NodeApi, NodeId, NodeMeta, QueryBuilder, QueryStep,
    Relation, Result, ViewId,
};
use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::blade::{self, Blade, BladeWrite};
use crate::nacelle::{self, Nacelle, NacelleWrite};
use crate::{DATA_MODEL_SPACE, DEFAULT_INSTANCE_SPACE};

pub fn view_id() -> ViewId {
    ViewId::new(DATA_MODEL_SPACE, "WindTurbine", "1")
}

pub fn blades_edge_type() -> NodeId {
    NodeId::new(DATA_MODEL_SPACE, "WindTurbine.blades")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindTurbine {
    #[serde(flatten)]
    pub meta: NodeMeta,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub capacity: Option<f64>,
    #[serde(default)]
    pub windfarm: Option<String>,
    #[serde(default)]
    pub nacelle: Option<Relation<Nacelle>>,
    #[serde(default)]
    pub blades: Vec<Relation<Blade>>,
}

impl DomainModel for WindTurbine {
    fn view_id() -> ViewId {
        view_id()
    }
}

impl WindTurbine {
    /// write model; fetched connections become id references
    pub fn as_write(&self) -> WindTurbineWrite {
        WindTurbineWrite {
            space: self.meta.space.clone(),
            external_id: self.meta.external_id.clone(),
            existing_version: Some(self.meta.version),
            name: self.name.clone(),
            capacity: self.capacity,
            windfarm: self.windfarm.clone(),
            nacelle: self.nacelle.as_ref().map(|nacelle| match nacelle {
                Relation::Id(id) => Relation::Id(id.clone()),
                Relation::Resolved(nacelle) => Relation::Id(nacelle.meta.id()),
            }),
            blades: self
                .blades
                .iter()
                .map(|blade| match blade {
                    Relation::Id(id) => Relation::Id(id.clone()),
                    Relation::Resolved(blade) => Relation::Id(blade.meta.id()),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindTurbineWrite {
    pub space: String,
    pub external_id: String,
    pub existing_version: Option<i64>,
    pub name: Option<String>,
    pub capacity: Option<f64>,
    pub windfarm: Option<String>,
    pub nacelle: Option<Relation<NacelleWrite>>,
    pub blades: Vec<Relation<BladeWrite>>,
}

impl WindTurbineWrite {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            space: DEFAULT_INSTANCE_SPACE.to_string(),
            external_id: external_id.into(),
            existing_version: None,
            name: None,
            capacity: None,
            windfarm: None,
            nacelle: None,
            blades: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        NodeId::new(&self.space, &self.external_id)
    }
}

impl DomainModelWrite for WindTurbineWrite {
    fn view_id() -> ViewId {
        view_id()
    }

    fn to_instances_apply(&self) -> Vec<InstanceApply> {
        let id = self.id();
        let mut properties = Map::new();
        properties.insert("name".into(), self.name.clone().into());
        properties.insert("capacity".into(), self.capacity.into());
        properties.insert("windfarm".into(), self.windfarm.clone().into());

        let mut related = Vec::new();
        if let Some(nacelle) = &self.nacelle {
            let target = match nacelle {
                Relation::Id(target) => target.clone(),
                Relation::Resolved(nacelle) => {
                    related.extend(nacelle.to_instances_apply());
                    nacelle.id()
                }
            };
            properties.insert("nacelle".into(), target.to_value());
        }

        let edge_type = blades_edge_type();
        for blade in &self.blades {
            let target = match blade {
                Relation::Id(target) => target.clone(),
                Relation::Resolved(blade) => {
                    related.extend(blade.to_instances_apply());
                    blade.id()
                }
            };
            related.push(InstanceApply::Edge(EdgeApply::connect(
                &edge_type, &id, &target,
            )));
        }

        let mut items = vec![node_apply(
            &id,
            &view_id(),
            None,
            self.existing_version,
            properties,
        )];
        items.extend(related);
        items
    }
}

#[derive(Debug, Clone, Default)]
pub struct WindTurbineFilter<'a> {
    pub name: Option<&'a str>,
    pub name_prefix: Option<&'a str>,
    pub min_capacity: Option<f64>,
    pub max_capacity: Option<f64>,
    pub windfarm: Option<Vec<&'a str>>,
    pub nacelle: Option<&'a [NodeId]>,
    pub external_id_prefix: Option<&'a str>,
    pub space: Option<&'a str>,
    pub filter: Option<Filter>,
}

impl WindTurbineFilter<'_> {
    pub fn build(&self) -> Option<Filter> {
        FilterBuilder::new(&view_id())
            .equals("name", self.name)
            .prefix("name", self.name_prefix)
            .range("capacity", self.min_capacity, self.max_capacity)
            .one_of("windfarm", self.windfarm.clone())
            .direct_relation("nacelle", self.nacelle)
            .external_id_prefix(self.external_id_prefix)
            .space(self.space)
            .filter(self.filter.clone())
            .build()
    }
}

pub struct WindTurbineApi<'a> {
    nodes: NodeApi<'a, WindTurbine>,
}

impl<'a> WindTurbineApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self {
            nodes: client.nodes(),
        }
    }

    pub async fn retrieve(&self, ids: &[NodeId]) -> Result<Vec<WindTurbine>> {
        self.nodes.retrieve(ids).await
    }

    /// list turbines without their connections
    pub async fn list(
        &self,
        filter: &WindTurbineFilter<'_>,
        limit: Option<u64>,
    ) -> Result<Vec<WindTurbine>> {
        self.nodes.list(filter.build(), limit, Vec::new()).await
    }

    /// list turbines with their nacelle and blades resolved
    pub async fn list_with_connections(
        &self,
        filter: &WindTurbineFilter<'_>,
        limit: Option<u64>,
    ) -> Result<Vec<WindTurbine>> {
        let mut builder = self.list_query(filter, limit)?;
        builder.execute_as(self.nodes.client()).await
    }

    /// query builder for turbines and their connections, not yet executed
    pub fn list_query(
        &self,
        filter: &WindTurbineFilter<'_>,
        limit: Option<u64>,
    ) -> Result<QueryBuilder> {
        let mut builder = self.nodes.query(filter.build(), limit)?;
        let root = self.nodes.root_step_name();

        let nacelle_step = builder.create_name("nacelle");
        builder.push(
            QueryStep::direct_relation(nacelle_step, &root, view_id().property("nacelle"))
                .select_view(&nacelle::view_id()),
        )?;

        let blades_edges = builder.create_name("blades_edges");
        builder.push(
            QueryStep::edges(&blades_edges, &root, &blades_edge_type(), Direction::Outwards)
                .with_connection_property("blades"),
        )?;
        let blades_step = builder.create_name("blades");
        builder.push(
            QueryStep::edge_targets(blades_step, &blades_edges).select_view(&blade::view_id()),
        )?;

        Ok(builder)
    }

    pub async fn search(
        &self,
        query: &str,
        filter: &WindTurbineFilter<'_>,
        limit: Option<u64>,
    ) -> Result<Vec<WindTurbine>> {
        self.nodes
            .search(query, &["name", "windfarm"], filter.build(), limit)
            .await
    }

    pub async fn count(&self, filter: &WindTurbineFilter<'_>) -> Result<u64> {
        self.nodes.count(filter.build()).await
    }

    pub async fn apply(
        &self,
        items: &[WindTurbineWrite],
        replace: bool,
    ) -> Result<Vec<AppliedInstance>> {
        self.nodes.apply(items, replace).await
    }

    pub async fn delete(&self, ids: &[NodeId]) -> Result<Vec<NodeId>> {
        self.nodes.delete(ids).await
    }
}
