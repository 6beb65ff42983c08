//! instance filters
//!
//! the service's filter language, plus [`FilterBuilder`] for the optional-argument
//! filter functions typed apis expose.

use crate::ids::{NodeId, PropertyRef, ViewId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// a filter over nodes or edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Filter {
    Equals {
        property: PropertyRef,
        value: Value,
    },
    In {
        property: PropertyRef,
        values: Vec<Value>,
    },
    Range {
        property: PropertyRef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gt: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gte: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lt: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lte: Option<Value>,
    },
    Prefix {
        property: PropertyRef,
        value: Value,
    },
    Exists {
        property: PropertyRef,
    },
    ContainsAny {
        property: PropertyRef,
        values: Vec<Value>,
    },
    ContainsAll {
        property: PropertyRef,
        values: Vec<Value>,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    HasData(Vec<ViewId>),
    MatchAll {},
}

impl Filter {
    pub fn equals(property: PropertyRef, value: impl Into<Value>) -> Self {
        Filter::Equals {
            property,
            value: value.into(),
        }
    }

    pub fn in_values<V: Into<Value>>(
        property: PropertyRef,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Filter::In {
            property,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn prefix(property: PropertyRef, value: impl Into<Value>) -> Self {
        Filter::Prefix {
            property,
            value: value.into(),
        }
    }

    /// inclusive range; either bound may be open
    pub fn range(property: PropertyRef, gte: Option<Value>, lte: Option<Value>) -> Self {
        Filter::Range {
            property,
            gt: None,
            gte,
            lt: None,
            lte,
        }
    }

    pub fn exists(property: PropertyRef) -> Self {
        Filter::Exists { property }
    }

    pub fn has_data(views: impl IntoIterator<Item = ViewId>) -> Self {
        Filter::HasData(views.into_iter().collect())
    }

    /// edges of the given type
    pub fn edge_type(edge_type: &NodeId) -> Self {
        Filter::equals(PropertyRef::edge("type"), edge_type.to_value())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    /// combine filters with `and`: none yields `None`, one yields itself
    pub fn and_all(filters: impl IntoIterator<Item = Filter>) -> Option<Filter> {
        let mut filters: Vec<Filter> = filters.into_iter().collect();
        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Filter::And(filters)),
        }
    }

    /// combine filters with `or`: none yields `None`, one yields itself
    pub fn or_any(filters: impl IntoIterator<Item = Filter>) -> Option<Filter> {
        let mut filters: Vec<Filter> = filters.into_iter().collect();
        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Filter::Or(filters)),
        }
    }
}

/// collects optional filter arguments for one view
///
/// every method is a no-op when its argument is absent, so typed filter
/// functions can pass their parameters straight through.
///
/// ```
/// use cognite_pygen::{FilterBuilder, ViewId};
///
/// let view = ViewId::new("power", "WindTurbine", "1");
/// let filter = FilterBuilder::new(&view)
///     .prefix("name", Some("wt-"))
///     .range("capacity", Some(5.0), None::<f64>)
///     .space(None)
///     .build();
/// assert!(filter.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct FilterBuilder {
    view: ViewId,
    filters: Vec<Filter>,
}

impl FilterBuilder {
    pub fn new(view: &ViewId) -> Self {
        Self {
            view: view.clone(),
            filters: Vec::new(),
        }
    }

    /// property equals value
    pub fn equals<V: Into<Value>>(mut self, property: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.filters
                .push(Filter::equals(self.view.as_property_ref(property), value));
        }
        self
    }

    /// property is one of the values; an empty list adds nothing
    pub fn one_of<V: Into<Value>>(mut self, property: &str, values: Option<Vec<V>>) -> Self {
        match values {
            Some(values) if !values.is_empty() => {
                self.filters
                    .push(Filter::in_values(self.view.as_property_ref(property), values));
            }
            _ => {}
        }
        self
    }

    pub fn prefix(mut self, property: &str, prefix: Option<&str>) -> Self {
        if let Some(prefix) = prefix {
            self.filters
                .push(Filter::prefix(self.view.as_property_ref(property), prefix));
        }
        self
    }

    /// inclusive range; added when at least one bound is set
    pub fn range<V: Into<Value>>(mut self, property: &str, min: Option<V>, max: Option<V>) -> Self {
        if min.is_some() || max.is_some() {
            self.filters.push(Filter::range(
                self.view.as_property_ref(property),
                min.map(Into::into),
                max.map(Into::into),
            ));
        }
        self
    }

    pub fn boolean(self, property: &str, value: Option<bool>) -> Self {
        self.equals(property, value)
    }

    /// direct relation points at one of the given nodes
    pub fn direct_relation(mut self, property: &str, targets: Option<&[NodeId]>) -> Self {
        match targets {
            Some([single]) => {
                self.filters
                    .push(Filter::equals(self.view.as_property_ref(property), single.to_value()));
            }
            Some(targets) if !targets.is_empty() => {
                self.filters.push(Filter::in_values(
                    self.view.as_property_ref(property),
                    targets.iter().map(NodeId::to_value),
                ));
            }
            _ => {}
        }
        self
    }

    pub fn external_id_prefix(mut self, prefix: Option<&str>) -> Self {
        if let Some(prefix) = prefix {
            self.filters
                .push(Filter::prefix(PropertyRef::node("externalId"), prefix));
        }
        self
    }

    pub fn space(mut self, space: Option<&str>) -> Self {
        if let Some(space) = space {
            self.filters
                .push(Filter::equals(PropertyRef::node("space"), space));
        }
        self
    }

    pub fn spaces(mut self, spaces: &[&str]) -> Self {
        match spaces {
            [] => {}
            [single] => self
                .filters
                .push(Filter::equals(PropertyRef::node("space"), *single)),
            many => self.filters.push(Filter::in_values(
                PropertyRef::node("space"),
                many.iter().copied(),
            )),
        }
        self
    }

    /// an extra, caller-supplied filter
    pub fn filter(mut self, filter: Option<Filter>) -> Self {
        if let Some(filter) = filter {
            self.filters.push(filter);
        }
        self
    }

    pub fn build(self) -> Option<Filter> {
        Filter::and_all(self.filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view() -> ViewId {
        ViewId::new("power", "WindTurbine", "1")
    }

    #[test]
    fn test_filter_wire_format() {
        let filter = Filter::And(vec![
            Filter::equals(PropertyRef::node("space"), "sp"),
            Filter::not(Filter::exists(view().as_property_ref("name"))),
            Filter::MatchAll {},
        ]);
        let value = serde_json::to_value(&filter).unwrap();
        assert_eq!(
            value,
            json!({"and": [
                {"equals": {"property": ["node", "space"], "value": "sp"}},
                {"not": {"exists": {"property": ["power", "WindTurbine/1", "name"]}}},
                {"matchAll": {}}
            ]})
        );
    }

    #[test]
    fn test_range_skips_open_bounds() {
        let filter = Filter::range(view().as_property_ref("capacity"), Some(json!(1.5)), None);
        let value = serde_json::to_value(&filter).unwrap();
        assert_eq!(
            value,
            json!({"range": {"property": ["power", "WindTurbine/1", "capacity"], "gte": 1.5}})
        );
    }

    #[test]
    fn test_has_data_uses_view_references() {
        let value = serde_json::to_value(Filter::has_data([view()])).unwrap();
        assert_eq!(value["hasData"][0]["type"], "view");
    }

    #[test]
    fn test_and_all_collapses() {
        assert!(Filter::and_all(Vec::new()).is_none());
        let single = Filter::exists(PropertyRef::node("externalId"));
        assert_eq!(Filter::and_all(vec![single.clone()]), Some(single.clone()));
        assert!(matches!(
            Filter::and_all(vec![single.clone(), single]),
            Some(Filter::And(items)) if items.len() == 2
        ));
    }

    #[test]
    fn test_builder_empty_is_none() {
        let filter = FilterBuilder::new(&view())
            .equals("name", None::<&str>)
            .one_of("name", Some(Vec::<&str>::new()))
            .range("capacity", None::<f64>, None)
            .external_id_prefix(None)
            .space(None)
            .filter(None)
            .build();
        assert!(filter.is_none());
    }

    #[test]
    fn test_builder_combines_arguments() {
        let filter = FilterBuilder::new(&view())
            .prefix("name", Some("wt"))
            .range("capacity", Some(1), Some(5))
            .external_id_prefix(Some("turbine:"))
            .spaces(&["a", "b"])
            .build()
            .unwrap();

        let value = serde_json::to_value(&filter).unwrap();
        let and = value["and"].as_array().unwrap();
        assert_eq!(and.len(), 4);
        assert_eq!(and[0]["prefix"]["value"], "wt");
        assert_eq!(and[1]["range"]["gte"], 1);
        assert_eq!(and[1]["range"]["lte"], 5);
        assert_eq!(and[2]["prefix"]["property"], json!(["node", "externalId"]));
        assert_eq!(and[3]["in"]["values"], json!(["a", "b"]));
    }

    #[test]
    fn test_builder_direct_relation() {
        let single = [NodeId::new("s", "nacelle:1")];
        let filter = FilterBuilder::new(&view())
            .direct_relation("nacelle", Some(&single))
            .build()
            .unwrap();
        assert_eq!(
            serde_json::to_value(&filter).unwrap()["equals"]["value"],
            json!({"space": "s", "externalId": "nacelle:1"})
        );

        let many = [NodeId::new("s", "a"), NodeId::new("s", "b")];
        let filter = FilterBuilder::new(&view())
            .direct_relation("nacelle", Some(&many))
            .build()
            .unwrap();
        assert!(matches!(filter, Filter::In { ref values, .. } if values.len() == 2));
    }

    #[test]
    fn test_edge_type_filter() {
        let value = serde_json::to_value(Filter::edge_type(&NodeId::new("power", "WindTurbine.blades"))).unwrap();
        assert_eq!(
            value,
            json!({"equals": {"property": ["edge", "type"], "value": {"space": "power", "externalId": "WindTurbine.blades"}}})
        );
    }
}
