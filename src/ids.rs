//! identifiers
//!
//! views, nodes, data models, and property references as the service spells them.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// reference to a view (space, external id, version)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewId {
    pub space: String,
    pub external_id: String,
    pub version: String,
}

impl ViewId {
    pub fn new(
        space: impl Into<String>,
        external_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            space: space.into(),
            external_id: external_id.into(),
            version: version.into(),
        }
    }

    /// key used for this view inside an instance's `properties` map
    pub fn properties_key(&self) -> String {
        format!("{}/{}", self.external_id, self.version)
    }

    /// reference to one of this view's properties, for filters and sorts
    pub fn as_property_ref(&self, property: impl Into<String>) -> PropertyRef {
        PropertyRef(vec![
            self.space.clone(),
            self.properties_key(),
            property.into(),
        ])
    }

    /// reference to one of this view's properties, for `through` traversals
    pub fn property(&self, identifier: impl Into<String>) -> ViewPropertyRef {
        ViewPropertyRef {
            source: self.clone(),
            identifier: identifier.into(),
        }
    }
}

// the service expects `"type": "view"` on every view reference
impl Serialize for ViewId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Wire<'a> {
            #[serde(rename = "type")]
            kind: &'static str,
            space: &'a str,
            external_id: &'a str,
            version: &'a str,
        }

        Wire {
            kind: "view",
            space: &self.space,
            external_id: &self.external_id,
            version: &self.version,
        }
        .serialize(serializer)
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.space, self.external_id, self.version)
    }
}

/// node or edge identifier (space, external id); also used for edge types
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeId {
    pub space: String,
    pub external_id: String,
}

impl NodeId {
    pub fn new(space: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            space: space.into(),
            external_id: external_id.into(),
        }
    }

    /// read an id out of a `{"space": .., "externalId": ..}` json object
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        let space = object.get("space")?.as_str()?;
        let external_id = object.get("externalId")?.as_str()?;
        Some(Self::new(space, external_id))
    }

    /// the id as the json object the service uses for direct relations
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "space": self.space,
            "externalId": self.external_id,
        })
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.space, self.external_id)
    }
}

/// node or edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceType {
    Node,
    Edge,
}

/// identifier tagged with its instance type, as used by by-ids and delete requests
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRef {
    pub instance_type: InstanceType,
    pub space: String,
    pub external_id: String,
}

impl InstanceRef {
    pub fn node(id: &NodeId) -> Self {
        Self {
            instance_type: InstanceType::Node,
            space: id.space.clone(),
            external_id: id.external_id.clone(),
        }
    }

    pub fn edge(id: &NodeId) -> Self {
        Self {
            instance_type: InstanceType::Edge,
            space: id.space.clone(),
            external_id: id.external_id.clone(),
        }
    }

    pub fn id(&self) -> NodeId {
        NodeId::new(&self.space, &self.external_id)
    }
}

/// reference to a data model (space, external id, version)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataModelId {
    pub space: String,
    pub external_id: String,
    pub version: String,
}

impl DataModelId {
    pub fn new(
        space: impl Into<String>,
        external_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            space: space.into(),
            external_id: external_id.into(),
            version: version.into(),
        }
    }
}

/// property path used by filters and sorts
///
/// instance attributes live under `["node", ..]` / `["edge", ..]`, view
/// properties under `[space, "view/version", property]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyRef(pub Vec<String>);

impl PropertyRef {
    /// node attribute such as `externalId` or `space`
    pub fn node(attribute: impl Into<String>) -> Self {
        Self(vec!["node".to_string(), attribute.into()])
    }

    /// edge attribute such as `type` or `startNode`
    pub fn edge(attribute: impl Into<String>) -> Self {
        Self(vec!["edge".to_string(), attribute.into()])
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

/// a view property, used as the `through` of a direct-relation traversal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewPropertyRef {
    pub source: ViewId,
    pub identifier: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_view_id_serializes_with_type() {
        let view = ViewId::new("power", "WindTurbine", "1");
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(
            value,
            json!({"type": "view", "space": "power", "externalId": "WindTurbine", "version": "1"})
        );

        let back: ViewId = serde_json::from_value(value).unwrap();
        assert_eq!(back, view);
    }

    #[test]
    fn test_view_property_ref() {
        let view = ViewId::new("power", "WindTurbine", "1");
        assert_eq!(
            view.as_property_ref("capacity").segments(),
            ["power", "WindTurbine/1", "capacity"]
        );
        assert_eq!(PropertyRef::node("externalId").segments(), ["node", "externalId"]);
    }

    #[test]
    fn test_node_id_from_value() {
        let id = NodeId::from_value(&json!({"space": "s", "externalId": "x"})).unwrap();
        assert_eq!(id, NodeId::new("s", "x"));
        assert_eq!(id.to_value(), json!({"space": "s", "externalId": "x"}));
        assert!(NodeId::from_value(&json!({"space": "s"})).is_none());
        assert!(NodeId::from_value(&json!("s:x")).is_none());
    }

    #[test]
    fn test_instance_ref_wire_format() {
        let value = serde_json::to_value(InstanceRef::edge(&NodeId::new("s", "e"))).unwrap();
        assert_eq!(
            value,
            json!({"instanceType": "edge", "space": "s", "externalId": "e"})
        );
    }
}
