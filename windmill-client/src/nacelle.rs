//! generated nacelle model

use cognite_pygen::{
    node_apply, AppliedInstance, DomainModel, DomainModelWrite, Filter, FilterBuilder,
    InstanceApply, NodeApi, NodeId, NodeMeta, Result, ViewId,
};
use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::{DATA_MODEL_SPACE, DEFAULT_INSTANCE_SPACE};

pub fn view_id() -> ViewId {
    ViewId::new(DATA_MODEL_SPACE, "Nacelle", "1")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nacelle {
    #[serde(flatten)]
    pub meta: NodeMeta,
    #[serde(default)]
    pub gearbox_type: Option<String>,
    #[serde(default)]
    pub yaw_direction: Option<f64>,
}

impl DomainModel for Nacelle {
    fn view_id() -> ViewId {
        view_id()
    }
}

impl Nacelle {
    pub fn as_write(&self) -> NacelleWrite {
        NacelleWrite {
            space: self.meta.space.clone(),
            external_id: self.meta.external_id.clone(),
            existing_version: Some(self.meta.version),
            gearbox_type: self.gearbox_type.clone(),
            yaw_direction: self.yaw_direction,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NacelleWrite {
    pub space: String,
    pub external_id: String,
    pub existing_version: Option<i64>,
    pub gearbox_type: Option<String>,
    pub yaw_direction: Option<f64>,
}

impl NacelleWrite {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            space: DEFAULT_INSTANCE_SPACE.to_string(),
            external_id: external_id.into(),
            existing_version: None,
            gearbox_type: None,
            yaw_direction: None,
        }
    }

    pub fn id(&self) -> NodeId {
        NodeId::new(&self.space, &self.external_id)
    }
}

impl DomainModelWrite for NacelleWrite {
    fn view_id() -> ViewId {
        view_id()
    }

    fn to_instances_apply(&self) -> Vec<InstanceApply> {
        let mut properties = Map::new();
        properties.insert("gearboxType".into(), self.gearbox_type.clone().into());
        properties.insert("yawDirection".into(), self.yaw_direction.into());
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
pub struct NacelleFilter<'a> {
    pub gearbox_type: Option<&'a str>,
    pub min_yaw_direction: Option<f64>,
    pub max_yaw_direction: Option<f64>,
    pub external_id_prefix: Option<&'a str>,
    pub space: Option<&'a str>,
    pub filter: Option<Filter>,
}

impl NacelleFilter<'_> {
    pub fn build(&self) -> Option<Filter> {
        FilterBuilder::new(&view_id())
            .equals("gearboxType", self.gearbox_type)
            .range("yawDirection", self.min_yaw_direction, self.max_yaw_direction)
            .external_id_prefix(self.external_id_prefix)
            .space(self.space)
            .filter(self.filter.clone())
            .build()
    }
}

pub struct NacelleApi<'a> {
    nodes: NodeApi<'a, Nacelle>,
}

impl<'a> NacelleApi<'a> {
    pub fn new(client: &'a cognite_pygen::Client) -> Self {
        Self {
            nodes: client.nodes(),
        }
    }

    pub async fn retrieve(&self, ids: &[NodeId]) -> Result<Vec<Nacelle>> {
        self.nodes.retrieve(ids).await
    }

    pub async fn list(&self, filter: &NacelleFilter<'_>, limit: Option<u64>) -> Result<Vec<Nacelle>> {
        self.nodes.list(filter.build(), limit, Vec::new()).await
    }

    pub async fn search(
        &self,
        query: &str,
        filter: &NacelleFilter<'_>,
        limit: Option<u64>,
    ) -> Result<Vec<Nacelle>> {
        self.nodes
            .search(query, &["gearboxType"], filter.build(), limit)
            .await
    }

    pub async fn count(&self, filter: &NacelleFilter<'_>) -> Result<u64> {
        self.nodes.count(filter.build()).await
    }

    pub async fn apply(&self, items: &[NacelleWrite], replace: bool) -> Result<Vec<AppliedInstance>> {
        self.nodes.apply(items, replace).await
    }

    pub async fn delete(&self, ids: &[NodeId]) -> Result<Vec<NodeId>> {
        self.nodes.delete(ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nacelle_range_filter() {
        let filter = NacelleFilter {
            min_yaw_direction: Some(90.0),
            space: Some("windmill-instances"),
            ..NacelleFilter::default()
        }
        .build()
        .unwrap();
        let value = serde_json::to_value(&filter).unwrap();
        let conditions = value["and"].as_array().unwrap();
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0]["range"]["gte"], json!(90.0));
        assert!(conditions[0]["range"].get("lte").is_none());
    }

    #[test]
    fn test_nacelle_write() {
        let mut nacelle = NacelleWrite::new("nacelle-1");
        nacelle.yaw_direction = Some(12.5);
        let body = serde_json::to_value(nacelle.to_instances_apply()).unwrap();
        assert_eq!(body[0]["externalId"], "nacelle-1");
        assert_eq!(body[0]["sources"][0]["properties"], json!({"yawDirection": 12.5}));
        assert_eq!(body[0]["sources"][0]["source"]["externalId"], "Nacelle");
    }
}
