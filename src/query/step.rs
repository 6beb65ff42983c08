//! query steps
//!
//! one result set of a multi-step query, with its paging state.

use crate::filters::Filter;
use crate::ids::{NodeId, ViewId, ViewPropertyRef};
use crate::instances::{Instance, InstanceSort};
use crate::query::expression::{
    Direction, EdgeExpression, Expression, NodeExpression, ResultSetExpression, Select,
};
use std::collections::HashSet;

/// max instances the service returns for one result set in one call
pub const INSTANCE_QUERY_LIMIT: u64 = 10_000;

/// the adaptive batch cap never shrinks below this
pub const MIN_BATCH_LIMIT: u64 = 1;

/// cursor and limit one round sent for a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PageRequest {
    pub(crate) cursor: Option<String>,
    pub(crate) limit: u64,
}

/// one stage of a [`crate::QueryBuilder`]
#[derive(Debug, Clone)]
pub struct QueryStep {
    name: String,
    expression: Expression,
    max_retrieve_limit: Option<u64>,
    select: Select,
    sort: Vec<InstanceSort>,
    connection_property: Option<String>,
    cursor: Option<String>,
    /// request that produced the current batch; steps chained from this one
    /// page against it
    last_page: Option<PageRequest>,
    total_retrieved: u64,
    last_batch_count: u64,
    rounds: u64,
    finished: bool,
    initial_batch_limit: u64,
    max_batch_limit: u64,
    results: Vec<Instance>,
    seen: HashSet<NodeId>,
}

impl QueryStep {
    pub fn new(name: impl Into<String>, expression: Expression) -> Self {
        Self {
            name: name.into(),
            expression,
            max_retrieve_limit: None,
            select: Select::none(),
            sort: Vec::new(),
            connection_property: None,
            cursor: None,
            last_page: None,
            total_retrieved: 0,
            last_batch_count: 0,
            rounds: 0,
            finished: false,
            initial_batch_limit: INSTANCE_QUERY_LIMIT,
            max_batch_limit: INSTANCE_QUERY_LIMIT,
            results: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// root step: nodes matching a filter
    pub fn nodes(name: impl Into<String>, filter: Option<Filter>) -> Self {
        Self::new(
            name,
            Expression::Nodes(NodeExpression {
                filter,
                ..NodeExpression::default()
            }),
        )
    }

    /// nodes the parent's direct relation points at
    pub fn direct_relation(
        name: impl Into<String>,
        from: impl Into<String>,
        through: ViewPropertyRef,
    ) -> Self {
        let connection = through.identifier.clone();
        Self::new(
            name,
            Expression::Nodes(NodeExpression {
                from: Some(from.into()),
                through: Some(through),
                direction: Some(Direction::Outwards),
                ..NodeExpression::default()
            }),
        )
        .with_connection_property(connection)
    }

    /// nodes whose direct relation points back at the parent
    pub fn reverse_relation(
        name: impl Into<String>,
        from: impl Into<String>,
        through: ViewPropertyRef,
    ) -> Self {
        Self::new(
            name,
            Expression::Nodes(NodeExpression {
                from: Some(from.into()),
                through: Some(through),
                direction: Some(Direction::Inwards),
                ..NodeExpression::default()
            }),
        )
    }

    /// edges of one type leaving (or entering) the parent's nodes
    pub fn edges(
        name: impl Into<String>,
        from: impl Into<String>,
        edge_type: &NodeId,
        direction: Direction,
    ) -> Self {
        Self::new(
            name,
            Expression::Edges(EdgeExpression {
                from: Some(from.into()),
                filter: Some(Filter::edge_type(edge_type)),
                max_distance: Some(1),
                direction,
                ..EdgeExpression::default()
            }),
        )
    }

    /// nodes at the far end of the parent's edges
    pub fn edge_targets(name: impl Into<String>, from: impl Into<String>) -> Self {
        Self::new(
            name,
            Expression::Nodes(NodeExpression {
                from: Some(from.into()),
                ..NodeExpression::default()
            }),
        )
    }

    /// stop after this many instances
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.max_retrieve_limit = Some(limit);
        self
    }

    pub fn with_select(mut self, select: Select) -> Self {
        self.select = select;
        self
    }

    /// project every property of a view
    pub fn select_view(self, view: &ViewId) -> Self {
        self.with_select(Select::view(view))
    }

    pub fn with_sort(mut self, sort: Vec<InstanceSort>) -> Self {
        self.sort = sort;
        self
    }

    /// key the results are attached under on the parent's objects
    pub fn with_connection_property(mut self, property: impl Into<String>) -> Self {
        self.connection_property = Some(property.into());
        self
    }

    pub fn with_filter(mut self, filter: Option<Filter>) -> Self {
        match &mut self.expression {
            Expression::Nodes(nodes) => nodes.filter = filter,
            Expression::Edges(edges) => edges.filter = filter,
        }
        self
    }

    pub(crate) fn with_batch_limit(mut self, limit: u64) -> Self {
        let limit = limit.clamp(MIN_BATCH_LIMIT, INSTANCE_QUERY_LIMIT);
        self.initial_batch_limit = limit;
        self.max_batch_limit = limit;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// name of the step this one chains from
    pub fn from_step(&self) -> Option<&str> {
        self.expression.from_step()
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn select(&self) -> &Select {
        &self.select
    }

    pub fn has_projection(&self) -> bool {
        self.select.has_projection()
    }

    pub fn connection_property(&self) -> Option<&str> {
        self.connection_property.as_deref()
    }

    pub fn max_retrieve_limit(&self) -> Option<u64> {
        self.max_retrieve_limit
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_retrieve_limit.is_none()
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn total_retrieved(&self) -> u64 {
        self.total_retrieved
    }

    pub fn last_batch_count(&self) -> u64 {
        self.last_batch_count
    }

    pub fn max_batch_limit(&self) -> u64 {
        self.max_batch_limit
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// rounds this step has been part of since the last reset
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// accumulated, de-duplicated results
    pub fn results(&self) -> &[Instance] {
        &self.results
    }

    /// a to-one traversal of a direct relation; bounded by its parent
    pub fn is_single_direct_relation(&self) -> bool {
        match &self.expression {
            Expression::Nodes(nodes) => {
                nodes.from.is_some()
                    && nodes.through.is_some()
                    && nodes.direction != Some(Direction::Inwards)
            }
            Expression::Edges(_) => false,
        }
    }

    /// sent at least once and still has pages left
    pub(crate) fn is_pending(&self) -> bool {
        self.rounds > 0 && !self.finished
    }

    pub(crate) fn limit_reached(&self) -> bool {
        self.max_retrieve_limit
            .is_some_and(|max| self.total_retrieved >= max)
    }

    pub(crate) fn reset(&mut self) {
        self.cursor = None;
        self.last_page = None;
        self.total_retrieved = 0;
        self.last_batch_count = 0;
        self.rounds = 0;
        self.finished = false;
        self.max_batch_limit = self.initial_batch_limit;
        self.results.clear();
        self.seen.clear();
    }

    /// fetch limit for the next round
    pub(crate) fn round_limit(&self) -> u64 {
        match self.max_retrieve_limit {
            None => self.max_batch_limit,
            Some(max) => max
                .saturating_sub(self.total_retrieved)
                .min(self.max_batch_limit)
                .max(MIN_BATCH_LIMIT),
        }
    }

    /// cursor and limit that move this step to its next page
    pub(crate) fn next_page(&self) -> PageRequest {
        PageRequest {
            cursor: self.cursor.clone(),
            limit: self.round_limit(),
        }
    }

    /// cursor and limit that fetch the current page again
    pub(crate) fn held_page(&self) -> PageRequest {
        self.last_page.clone().unwrap_or_else(|| self.next_page())
    }

    pub(crate) fn record_page(&mut self, page: PageRequest) {
        self.last_page = Some(page);
    }

    pub(crate) fn to_result_set(&self, limit: u64) -> ResultSetExpression {
        ResultSetExpression {
            expression: self.expression.clone(),
            limit: Some(limit),
            sort: self.sort.clone(),
        }
    }

    /// halve the batch cap; false when it is already at the minimum
    pub(crate) fn reduce_batch_limit(&mut self) -> bool {
        if self.max_batch_limit <= MIN_BATCH_LIMIT {
            return false;
        }
        self.max_batch_limit = (self.max_batch_limit / 2).max(MIN_BATCH_LIMIT);
        true
    }

    /// merge one round's batch, returning how many new instances were kept
    ///
    /// `finished` follows the latest batch. a chained step finishes once it has
    /// drained its parent's current page and picks up again when the parent
    /// moves on; a to-one direct relation is always done after one batch.
    pub(crate) fn merge(&mut self, batch: Vec<Instance>, next_cursor: Option<String>) -> u64 {
        self.rounds += 1;
        self.last_batch_count = batch.len() as u64;

        let mut added = 0;
        for instance in batch {
            if self.limit_reached() {
                break;
            }
            if self.seen.insert(instance.id()) {
                self.results.push(instance);
                self.total_retrieved += 1;
                added += 1;
            }
        }

        self.finished = self.last_batch_count == 0
            || next_cursor.is_none()
            || self.limit_reached()
            || self.is_single_direct_relation();
        self.cursor = if self.finished { None } else { next_cursor };

        added
    }
}
