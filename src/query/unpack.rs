//! unpacking query results
//!
//! flattens instances into json objects and stitches chained steps into a
//! nested object graph.

use crate::error::{Error, Result};
use crate::ids::NodeId;
use crate::instances::Instance;
use crate::query::expression::{Direction, Expression};
use crate::query::step::QueryStep;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// flat object for one instance: metadata plus the properties of every view
///
/// metadata keys win over properties with the same name.
pub fn unpack_instance(instance: &Instance) -> Map<String, Value> {
    let mut object = Map::new();
    match instance {
        Instance::Node(node) => {
            object.insert("instanceType".into(), "node".into());
            object.insert("space".into(), node.space.clone().into());
            object.insert("externalId".into(), node.external_id.clone().into());
            object.insert("version".into(), node.version.into());
            object.insert("lastUpdatedTime".into(), node.last_updated_time.into());
            object.insert("createdTime".into(), node.created_time.into());
            if let Some(deleted) = node.deleted_time {
                object.insert("deletedTime".into(), deleted.into());
            }
            if let Some(node_type) = &node.node_type {
                object.insert("type".into(), node_type.to_value());
            }
        }
        Instance::Edge(edge) => {
            object.insert("instanceType".into(), "edge".into());
            object.insert("space".into(), edge.space.clone().into());
            object.insert("externalId".into(), edge.external_id.clone().into());
            object.insert("version".into(), edge.version.into());
            object.insert("lastUpdatedTime".into(), edge.last_updated_time.into());
            object.insert("createdTime".into(), edge.created_time.into());
            if let Some(deleted) = edge.deleted_time {
                object.insert("deletedTime".into(), deleted.into());
            }
            object.insert("type".into(), edge.edge_type.to_value());
            object.insert("startNode".into(), edge.start_node.to_value());
            object.insert("endNode".into(), edge.end_node.to_value());
        }
    }

    for views in instance.properties().values() {
        for properties in views.values() {
            for (key, value) in properties {
                object.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
    }
    object
}

/// objects of one step, indexed by instance id
struct StepObjects {
    objects: Vec<Map<String, Value>>,
    index: HashMap<NodeId, usize>,
}

impl StepObjects {
    fn from_step(step: &QueryStep) -> Self {
        let mut objects = Vec::with_capacity(step.results().len());
        let mut index = HashMap::with_capacity(step.results().len());
        for instance in step.results() {
            index.insert(instance.id(), objects.len());
            objects.push(unpack_instance(instance));
        }
        Self { objects, index }
    }

    fn get(&self, id: &NodeId) -> Option<&Map<String, Value>> {
        self.index.get(id).map(|&position| &self.objects[position])
    }

    fn ensure_list(&mut self, key: &str) {
        for object in &mut self.objects {
            if !matches!(object.get(key), Some(Value::Array(_))) {
                object.insert(key.to_string(), Value::Array(Vec::new()));
            }
        }
    }

    fn push_to(&mut self, parent: &NodeId, key: &str, value: Value) {
        let Some(&position) = self.index.get(parent) else {
            return;
        };
        if let Some(Value::Array(items)) = self.objects[position].get_mut(key) {
            items.push(value);
        }
    }
}

/// which step's objects a builder returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnStep {
    /// the root step, with every chained step nested inside it
    #[default]
    First,
    /// the last step, as fetched
    Last,
}

/// turn fetched steps into the builder's result objects
pub(crate) fn unpack_steps(
    steps: &[QueryStep],
    return_step: ReturnStep,
) -> Result<Vec<Map<String, Value>>> {
    if steps.is_empty() {
        return Ok(Vec::new());
    }

    let projected: Vec<&QueryStep> = steps.iter().filter(|step| step.has_projection()).collect();
    if let [single] = projected.as_slice() {
        return Ok(StepObjects::from_step(single).objects);
    }
    if return_step == ReturnStep::Last {
        let last = &steps[steps.len() - 1];
        return Ok(StepObjects::from_step(last).objects);
    }

    let mut unpacked: Vec<StepObjects> = steps.iter().map(StepObjects::from_step).collect();
    for child_position in (1..steps.len()).rev() {
        let child_step = &steps[child_position];
        let Some(parent_name) = child_step.from_step() else {
            continue;
        };
        let parent_position = steps[..child_position]
            .iter()
            .position(|step| step.name() == parent_name)
            .ok_or_else(|| {
                Error::Query(format!(
                    "step `{}` chains from unknown step `{parent_name}`",
                    child_step.name()
                ))
            })?;

        let (head, tail) = unpacked.split_at_mut(child_position);
        link(
            &steps[parent_position],
            &mut head[parent_position],
            child_step,
            &tail[0],
        );
    }

    Ok(std::mem::take(&mut unpacked[0].objects))
}

fn link(parent_step: &QueryStep, parent: &mut StepObjects, child_step: &QueryStep, child: &StepObjects) {
    match child_step.expression() {
        Expression::Edges(edges) => {
            let key = child_step
                .connection_property()
                .unwrap_or(child_step.name());
            link_edges(parent, child, edges.direction, key, child_step.has_projection());
        }
        Expression::Nodes(nodes) => match (&nodes.through, parent_step.expression()) {
            (Some(through), _) if nodes.direction == Some(Direction::Inwards) => {
                let key = child_step
                    .connection_property()
                    .unwrap_or(child_step.name());
                link_reverse(parent, child, &through.identifier, key);
            }
            (Some(through), _) => {
                let key = child_step
                    .connection_property()
                    .unwrap_or(&through.identifier);
                link_direct(parent, child, &through.identifier, key);
            }
            (None, Expression::Edges(edges)) => {
                link_edge_targets(parent, child, edges.direction.far_end());
            }
            // rejected when the step is pushed
            (None, Expression::Nodes(_)) => {}
        },
    }
}

/// replace the parent's references with the resolved child nodes
fn link_direct(parent: &mut StepObjects, child: &StepObjects, property: &str, key: &str) {
    for object in &mut parent.objects {
        let Some(reference) = object.get(property) else {
            continue;
        };
        let resolved = resolve_references(reference, child);
        object.insert(key.to_string(), resolved);
    }
}

fn resolve_references(value: &Value, child: &StepObjects) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| resolve_references(item, child))
                .collect(),
        ),
        other => NodeId::from_value(other)
            .and_then(|id| child.get(&id))
            .map(|resolved| Value::Object(resolved.clone()))
            .unwrap_or_else(|| other.clone()),
    }
}

/// append each child to every parent its direct relation points at
fn link_reverse(parent: &mut StepObjects, child: &StepObjects, property: &str, key: &str) {
    parent.ensure_list(key);
    for object in &child.objects {
        let Some(reference) = object.get(property) else {
            continue;
        };
        for parent_id in referenced_ids(reference) {
            parent.push_to(&parent_id, key, Value::Object(object.clone()));
        }
    }
}

fn referenced_ids(value: &Value) -> Vec<NodeId> {
    match value {
        Value::Array(items) => items.iter().filter_map(NodeId::from_value).collect(),
        other => NodeId::from_value(other).into_iter().collect(),
    }
}

/// append each edge (or its far end, when edges carry no projection) to the
/// parent at its near end
fn link_edges(
    parent: &mut StepObjects,
    edges: &StepObjects,
    direction: Direction,
    key: &str,
    projected: bool,
) {
    parent.ensure_list(key);
    for edge in &edges.objects {
        let Some(parent_id) = edge.get(direction.near_end()).and_then(NodeId::from_value) else {
            continue;
        };
        let entry = if projected {
            Value::Object(edge.clone())
        } else {
            edge.get(direction.far_end()).cloned().unwrap_or(Value::Null)
        };
        parent.push_to(&parent_id, key, entry);
    }
}

/// replace each edge's far end with the resolved node
fn link_edge_targets(edges: &mut StepObjects, nodes: &StepObjects, far_end: &str) {
    for edge in &mut edges.objects {
        let Some(target) = edge
            .get(far_end)
            .and_then(NodeId::from_value)
            .and_then(|id| nodes.get(&id))
            .cloned()
        else {
            continue;
        };
        edge.insert(far_end.to_string(), Value::Object(target));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ViewId;
    use crate::instances::{Edge, Node};
    use crate::query::expression::Select;
    use serde_json::json;

    fn view() -> ViewId {
        ViewId::new("power", "WindTurbine", "1")
    }

    fn node(view_key: &str, external_id: &str, properties: Value) -> Instance {
        let mut by_view = std::collections::BTreeMap::new();
        by_view.insert(
            view_key.to_string(),
            properties.as_object().cloned().unwrap_or_default(),
        );
        let mut by_space = std::collections::BTreeMap::new();
        by_space.insert("power".to_string(), by_view);
        Instance::Node(Node {
            space: "power".to_string(),
            external_id: external_id.to_string(),
            version: 1,
            last_updated_time: 2,
            created_time: 1,
            deleted_time: None,
            node_type: None,
            properties: by_space,
        })
    }

    fn edge(external_id: &str, start: &str, end: &str) -> Instance {
        Instance::Edge(Edge {
            space: "power".to_string(),
            external_id: external_id.to_string(),
            version: 1,
            last_updated_time: 2,
            created_time: 1,
            deleted_time: None,
            edge_type: NodeId::new("power", "WindTurbine.blades"),
            start_node: NodeId::new("power", start),
            end_node: NodeId::new("power", end),
            properties: Default::default(),
        })
    }

    fn fetched(mut step: QueryStep, items: Vec<Instance>) -> QueryStep {
        step.merge(items, None);
        step
    }

    #[test]
    fn test_unpack_instance_flattens_properties() {
        let object = unpack_instance(&node(
            "WindTurbine/1",
            "turbine:1",
            json!({"name": "wt-1", "space": "shadowed"}),
        ));
        assert_eq!(object["externalId"], "turbine:1");
        assert_eq!(object["space"], "power");
        assert_eq!(object["name"], "wt-1");
        assert_eq!(object["instanceType"], "node");
        assert_eq!(object["version"], 1);
    }

    #[test]
    fn test_single_projection_returned_directly() {
        let root = fetched(
            QueryStep::nodes("turbines", None).select_view(&view()),
            vec![node("WindTurbine/1", "turbine:1", json!({"name": "a"}))],
        );
        let edges = fetched(
            QueryStep::edges(
                "blade_edges",
                "turbines",
                &NodeId::new("power", "WindTurbine.blades"),
                Direction::Outwards,
            ),
            vec![edge("e1", "turbine:1", "blade:1")],
        );
        let objects = unpack_steps(&[root, edges], ReturnStep::First).unwrap();
        assert_eq!(objects.len(), 1);
        assert!(objects[0].get("blade_edges").is_none());
    }

    #[test]
    fn test_direct_relation_is_resolved() {
        let root = fetched(
            QueryStep::nodes("turbines", None).select_view(&view()),
            vec![
                node(
                    "WindTurbine/1",
                    "turbine:1",
                    json!({"nacelle": {"space": "power", "externalId": "nacelle:1"}}),
                ),
                node("WindTurbine/1", "turbine:2", json!({"nacelle": null})),
            ],
        );
        let nacelles = fetched(
            QueryStep::direct_relation("nacelles", "turbines", view().property("nacelle"))
                .select_view(&ViewId::new("power", "Nacelle", "1")),
            vec![node("Nacelle/1", "nacelle:1", json!({"weight": 12.5}))],
        );

        let objects = unpack_steps(&[root, nacelles], ReturnStep::First).unwrap();
        assert_eq!(objects[0]["nacelle"]["weight"], 12.5);
        assert_eq!(objects[0]["nacelle"]["externalId"], "nacelle:1");
        assert_eq!(objects[1]["nacelle"], Value::Null);
    }

    #[test]
    fn test_reverse_relation_collects_children() {
        let root = fetched(
            QueryStep::nodes("turbines", None).select_view(&view()),
            vec![
                node("WindTurbine/1", "turbine:1", json!({})),
                node("WindTurbine/1", "turbine:2", json!({})),
            ],
        );
        let sensor_view = ViewId::new("power", "Sensor", "1");
        let sensors = fetched(
            QueryStep::reverse_relation("sensors", "turbines", sensor_view.property("turbine"))
                .select_view(&sensor_view),
            vec![
                node("Sensor/1", "s1", json!({"turbine": {"space": "power", "externalId": "turbine:1"}})),
                node("Sensor/1", "s2", json!({"turbine": {"space": "power", "externalId": "turbine:1"}})),
            ],
        );

        let objects = unpack_steps(&[root, sensors], ReturnStep::First).unwrap();
        assert_eq!(objects[0]["sensors"].as_array().unwrap().len(), 2);
        assert_eq!(objects[1]["sensors"], json!([]));
    }

    #[test]
    fn test_edges_and_targets_nest_under_root() {
        let root = fetched(
            QueryStep::nodes("turbines", None).select_view(&view()),
            vec![node("WindTurbine/1", "turbine:1", json!({"name": "a"}))],
        );
        let edges = fetched(
            QueryStep::edges(
                "blade_edges",
                "turbines",
                &NodeId::new("power", "WindTurbine.blades"),
                Direction::Outwards,
            )
            .with_connection_property("blades"),
            vec![
                edge("e1", "turbine:1", "blade:1"),
                edge("e2", "turbine:1", "blade:2"),
                edge("e3", "turbine:9", "blade:3"),
            ],
        );
        let blade_view = ViewId::new("power", "Blade", "1");
        let blades = fetched(
            QueryStep::edge_targets("blades", "blade_edges").select_view(&blade_view),
            vec![node("Blade/1", "blade:1", json!({"isDamaged": true}))],
        );

        let objects = unpack_steps(&[root, edges, blades], ReturnStep::First).unwrap();
        let attached = objects[0]["blades"].as_array().unwrap();
        assert_eq!(attached.len(), 2);
        assert_eq!(attached[0]["isDamaged"], true);
        // unresolved targets stay as identifiers
        assert_eq!(attached[1], json!({"space": "power", "externalId": "blade:2"}));
    }

    #[test]
    fn test_projected_edges_are_kept() {
        let root = fetched(
            QueryStep::nodes("turbines", None).select_view(&view()),
            vec![node("WindTurbine/1", "turbine:1", json!({}))],
        );
        let edges = fetched(
            QueryStep::edges(
                "blades",
                "turbines",
                &NodeId::new("power", "WindTurbine.blades"),
                Direction::Outwards,
            )
            .with_select(Select::view(&ViewId::new("power", "BladeEdge", "1"))),
            vec![edge("e1", "turbine:1", "blade:1")],
        );
        let objects = unpack_steps(&[root, edges], ReturnStep::First).unwrap();
        let attached = &objects[0]["blades"][0];
        assert_eq!(attached["instanceType"], "edge");
        assert_eq!(attached["endNode"]["externalId"], "blade:1");
    }

    #[test]
    fn test_return_last_step() {
        let root = fetched(
            QueryStep::nodes("turbines", None).select_view(&view()),
            vec![node("WindTurbine/1", "turbine:1", json!({}))],
        );
        let nacelles = fetched(
            QueryStep::direct_relation("nacelles", "turbines", view().property("nacelle"))
                .select_view(&ViewId::new("power", "Nacelle", "1")),
            vec![node("Nacelle/1", "nacelle:1", json!({}))],
        );
        let objects = unpack_steps(&[root, nacelles], ReturnStep::Last).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0]["externalId"], "nacelle:1");
    }
}
