//! generated blade model

use cognite_pygen::{
    node_apply, AppliedInstance, DomainModel, DomainModelWrite, Filter, FilterBuilder,
    InstanceApply, NodeApi, NodeId, NodeMeta, Result, ViewId,
};
use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::{DATA_MODEL_SPACE, DEFAULT_INSTANCE_SPACE};

pub fn view_id() -> ViewId {
    ViewId::new(DATA_MODEL_SPACE, "Blade", "1")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blade {
    #[serde(flatten)]
    pub meta: NodeMeta,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_damaged: Option<bool>,
}

impl DomainModel for Blade {
    fn view_id() -> ViewId {
        view_id()
    }
}

impl Blade {
    pub fn as_write(&self) -> BladeWrite {
        BladeWrite {
            space: self.meta.space.clone(),
            external_id: self.meta.external_id.clone(),
            existing_version: Some(self.meta.version),
            name: self.name.clone(),
            is_damaged: self.is_damaged,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BladeWrite {
    pub space: String,
    pub external_id: String,
    pub existing_version: Option<i64>,
    pub name: Option<String>,
    pub is_damaged: Option<bool>,
}

impl BladeWrite {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            space: DEFAULT_INSTANCE_SPACE.to_string(),
            external_id: external_id.into(),
            existing_version: None,
            name: None,
            is_damaged: None,
        }
    }

    pub fn id(&self) -> NodeId {
        NodeId::new(&self.space, &self.external_id)
    }
}

impl DomainModelWrite for BladeWrite {
    fn view_id() -> ViewId {
        view_id()
    }

    fn to_instances_apply(&self) -> Vec<InstanceApply> {
        let mut properties = Map::new();
        properties.insert("name".into(), self.name.clone().into());
        properties.insert("isDamaged".into(), self.is_damaged.into());
        vec![node_apply(
            &self.id(),
            &view_id(),
            None,
            self.existing_version,
            properties,
        )]
    }
}

#[derive(Debug, Clone, Default)]
pub struct BladeFilter<'a> {
    pub name: Option<&'a str>,
    pub name_prefix: Option<&'a str>,
    pub is_damaged: Option<bool>,
    pub external_id_prefix: Option<&'a str>,
    pub space: Option<&'a str>,
    pub filter: Option<Filter>,
}

impl BladeFilter<'_> {
    pub fn build(&self) -> Option<Filter> {
        FilterBuilder::new(&view_id())
            .equals("name", self.name)
            .prefix("name", self.name_prefix)
            .boolean("isDamaged", self.is_damaged)
            .external_id_prefix(self.external_id_prefix)
            .space(self.space)
            .filter(self.filter.clone())
            .build()
    }
}

pub struct BladeApi<'a> {
    nodes: NodeApi<'a, Blade>,
}

impl<'a> BladeApi<'a> {
    pub fn new(client: &'a cognite_pygen::Client) -> Self {
        Self {
            nodes: client.nodes(),
        }
    }

    pub async fn retrieve(&self, ids: &[NodeId]) -> Result<Vec<Blade>> {
        self.nodes.retrieve(ids).await
    }

    pub async fn list(&self, filter: &BladeFilter<'_>, limit: Option<u64>) -> Result<Vec<Blade>> {
        self.nodes.list(filter.build(), limit, Vec::new()).await
    }

    pub async fn search(
        &self,
        query: &str,
        filter: &BladeFilter<'_>,
        limit: Option<u64>,
    ) -> Result<Vec<Blade>> {
        self.nodes.search(query, &["name"], filter.build(), limit).await
    }

    pub async fn count(&self, filter: &BladeFilter<'_>) -> Result<u64> {
        self.nodes.count(filter.build()).await
    }

    pub async fn apply(&self, items: &[BladeWrite], replace: bool) -> Result<Vec<AppliedInstance>> {
        self.nodes.apply(items, replace).await
    }

    pub async fn delete(&self, ids: &[NodeId]) -> Result<Vec<NodeId>> {
        self.nodes.delete(ids).await
    }
}
