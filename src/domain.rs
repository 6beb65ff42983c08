//! typed domain models
//!
//! traits and helpers shared by generated per-view model types. read models
//! deserialize from the flat objects produced by query unpacking; write
//! models turn themselves into apply items.

use crate::error::Result;
use crate::ids::{NodeId, ViewId};
use crate::instances::{Instance, InstanceApply, NodeApply, SourceData};
use crate::query::unpack_instance;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// read side of a generated model
pub trait DomainModel: DeserializeOwned {
    /// the view this model reads through
    fn view_id() -> ViewId;

    fn from_instance(instance: &Instance) -> Result<Self> {
        decode(unpack_instance(instance))
    }
}

/// write side of a generated model
pub trait DomainModelWrite {
    fn view_id() -> ViewId;

    /// node and edge apply items for this object and everything it connects
    fn to_instances_apply(&self) -> Vec<InstanceApply>;
}

/// instance metadata, flattened into every read model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMeta {
    pub space: String,
    pub external_id: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub last_updated_time: i64,
    #[serde(default)]
    pub created_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_time: Option<i64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<NodeId>,
}

impl NodeMeta {
    pub fn id(&self) -> NodeId {
        NodeId::new(&self.space, &self.external_id)
    }
}

/// the value of a relation property: a bare id, or the object it points to
/// when the query fetched it
#[derive(Debug, Clone, PartialEq)]
pub enum Relation<T> {
    Id(NodeId),
    Resolved(Box<T>),
}

impl<T> Relation<T> {
    pub fn as_id(&self) -> Option<&NodeId> {
        match self {
            Relation::Id(id) => Some(id),
            Relation::Resolved(_) => None,
        }
    }

    pub fn resolved(&self) -> Option<&T> {
        match self {
            Relation::Id(_) => None,
            Relation::Resolved(value) => Some(value),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Relation::Resolved(_))
    }
}

impl<T> From<NodeId> for Relation<T> {
    fn from(id: NodeId) -> Self {
        Relation::Id(id)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Relation<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if let Some(id) = bare_id(&value) {
            return Ok(Relation::Id(id));
        }
        serde_json::from_value(value)
            .map(|resolved| Relation::Resolved(Box::new(resolved)))
            .map_err(de::Error::custom)
    }
}

impl<T: Serialize> Serialize for Relation<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Relation::Id(id) => id.serialize(serializer),
            Relation::Resolved(value) => value.serialize(serializer),
        }
    }
}

// an object carrying nothing but `space` and `externalId`
fn bare_id(value: &Value) -> Option<NodeId> {
    let object = value.as_object()?;
    if object.len() != 2 {
        return None;
    }
    NodeId::from_value(value)
}

/// deserialize an unpacked object into a model
pub fn decode<T: DeserializeOwned>(object: Map<String, Value>) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(object))?)
}

/// node apply item writing `properties` through `view`
///
/// `None` values are left out so they do not clear stored properties.
pub fn node_apply(
    id: &NodeId,
    view: &ViewId,
    node_type: Option<NodeId>,
    existing_version: Option<i64>,
    properties: Map<String, Value>,
) -> InstanceApply {
    let properties: Map<String, Value> = properties
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .collect();
    InstanceApply::Node(NodeApply {
        space: id.space.clone(),
        external_id: id.external_id.clone(),
        existing_version,
        node_type,
        sources: vec![SourceData {
            source: view.clone(),
            properties,
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instances::{Node, PropertiesBySource};
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Nacelle {
        #[serde(flatten)]
        meta: NodeMeta,
        #[serde(default)]
        gearbox: Option<String>,
    }

    impl DomainModel for Nacelle {
        fn view_id() -> ViewId {
            ViewId::new("power", "Nacelle", "1")
        }
    }

    #[derive(Debug, Deserialize)]
    struct Turbine {
        #[serde(flatten)]
        meta: NodeMeta,
        #[serde(default)]
        nacelle: Option<Relation<Nacelle>>,
    }

    #[test]
    fn test_relation_bare_id() {
        let turbine: Turbine = serde_json::from_value(json!({
            "space": "power",
            "externalId": "wt-1",
            "nacelle": {"space": "power", "externalId": "nacelle-1"}
        }))
        .unwrap();
        let nacelle = turbine.nacelle.unwrap();
        assert_eq!(nacelle.as_id(), Some(&NodeId::new("power", "nacelle-1")));
        assert!(!nacelle.is_resolved());
        assert_eq!(turbine.meta.id(), NodeId::new("power", "wt-1"));
    }

    #[test]
    fn test_relation_resolved() {
        let turbine: Turbine = serde_json::from_value(json!({
            "space": "power",
            "externalId": "wt-1",
            "version": 2,
            "nacelle": {
                "space": "power",
                "externalId": "nacelle-1",
                "version": 1,
                "gearbox": "planetary"
            }
        }))
        .unwrap();
        let nacelle = turbine.nacelle.unwrap();
        let resolved = nacelle.resolved().unwrap();
        assert_eq!(resolved.gearbox.as_deref(), Some("planetary"));
        assert_eq!(resolved.meta.version, 1);
    }

    #[test]
    fn test_relation_serializes_id() {
        let relation: Relation<Value> = NodeId::new("power", "n").into();
        assert_eq!(
            serde_json::to_value(&relation).unwrap(),
            json!({"space": "power", "externalId": "n"})
        );
    }

    #[test]
    fn test_from_instance() {
        let mut properties = PropertiesBySource::new();
        properties.entry("power".into()).or_default().insert(
            "Nacelle/1".into(),
            json!({"gearbox": "direct"}).as_object().unwrap().clone(),
        );
        let instance = Instance::Node(Node {
            space: "power".into(),
            external_id: "nacelle-1".into(),
            version: 4,
            last_updated_time: 20,
            created_time: 10,
            deleted_time: None,
            node_type: None,
            properties,
        });

        let nacelle = Nacelle::from_instance(&instance).unwrap();
        assert_eq!(nacelle.meta.version, 4);
        assert_eq!(nacelle.meta.created_time, 10);
        assert_eq!(nacelle.gearbox.as_deref(), Some("direct"));
    }

    #[test]
    fn test_node_apply_drops_nulls() {
        let view = ViewId::new("power", "Nacelle", "1");
        let properties = json!({"gearbox": "direct", "power": null});
        let item = node_apply(
            &NodeId::new("power", "n"),
            &view,
            None,
            None,
            properties.as_object().unwrap().clone(),
        );
        let body = serde_json::to_value(&item).unwrap();
        assert_eq!(body["instanceType"], "node");
        assert_eq!(body["sources"][0]["properties"], json!({"gearbox": "direct"}));
        assert_eq!(body["sources"][0]["source"]["type"], "view");
    }
}
