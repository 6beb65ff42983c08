//! query builder and executor
//!
//! chains [`QueryStep`]s, pages through them against a [`QueryTransport`],
//! shrinks the batch size when the service rejects a round as too large, and
//! unpacks the result into nested objects.

use crate::error::{Error, Result};
use crate::instances::{AggregateRequest, Aggregation};
use crate::query::expression::{Expression, QueryRequest};
use crate::query::progress::ProgressTracker;
use crate::query::step::{PageRequest, QueryStep};
use crate::query::transport::QueryTransport;
use crate::query::unpack::{unpack_steps, ReturnStep};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// ordered chain of query steps
///
/// ```
/// use cognite_pygen::{Direction, NodeId, QueryBuilder, QueryStep, ViewId};
///
/// let turbine = ViewId::new("power", "WindTurbine", "1");
/// let blade = ViewId::new("power", "Blade", "1");
///
/// let builder = QueryBuilder::new()
///     .with_step(QueryStep::nodes("turbines", None).select_view(&turbine).with_limit(10))?
///     .with_step(
///         QueryStep::edges(
///             "blade_edges",
///             "turbines",
///             &NodeId::new("power", "WindTurbine.blades"),
///             Direction::Outwards,
///         )
///         .with_connection_property("blades"),
///     )?
///     .with_step(QueryStep::edge_targets("blade_nodes", "blade_edges").select_view(&blade))?;
/// assert_eq!(builder.steps().len(), 3);
/// # Ok::<(), cognite_pygen::Error>(())
/// ```
/// what a step does in the next round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Paging {
    /// send the step's next cursor and merge what comes back
    Advance,
    /// repeat the request behind the current page; a step below still pages through it
    Hold,
    /// leave the step out of the request
    Skip,
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    steps: Vec<QueryStep>,
    return_step: ReturnStep,
    batch_limit: Option<u64>,
    progress_interval: Duration,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            return_step: ReturnStep::First,
            batch_limit: None,
            progress_interval: Duration::from_secs(5),
        }
    }

    /// return the last step's objects instead of the root's
    pub fn with_return_step(mut self, return_step: ReturnStep) -> Self {
        self.return_step = return_step;
        self
    }

    /// starting batch cap for every step (default 10 000)
    pub fn with_batch_limit(mut self, limit: u64) -> Self {
        self.batch_limit = Some(limit);
        self.steps = std::mem::take(&mut self.steps)
            .into_iter()
            .map(|step| step.with_batch_limit(limit))
            .collect();
        self
    }

    /// min time between progress lines for large queries
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_step(mut self, step: QueryStep) -> Result<Self> {
        self.push(step)?;
        Ok(self)
    }

    /// append a step, checking that it chains from an earlier one
    pub fn push(&mut self, step: QueryStep) -> Result<()> {
        if self.step(step.name()).is_some() {
            return Err(Error::Query(format!("duplicate step name `{}`", step.name())));
        }

        match (self.steps.is_empty(), step.from_step()) {
            (true, Some(from)) => {
                return Err(Error::Query(format!(
                    "first step `{}` cannot chain from `{from}`",
                    step.name()
                )));
            }
            (true, None) => {}
            (false, None) => {
                return Err(Error::Query(format!(
                    "step `{}` must chain from an earlier step",
                    step.name()
                )));
            }
            (false, Some(from)) => {
                let parent = self.step(from).ok_or_else(|| {
                    Error::Query(format!(
                        "step `{}` chains from unknown step `{from}`",
                        step.name()
                    ))
                })?;
                validate_chain(parent, &step)?;
            }
        }

        let step = match self.batch_limit {
            Some(limit) => step.with_batch_limit(limit),
            None => step,
        };
        self.steps.push(step);
        Ok(())
    }

    pub fn steps(&self) -> &[QueryStep] {
        &self.steps
    }

    pub fn step(&self, name: &str) -> Option<&QueryStep> {
        self.steps.iter().find(|step| step.name() == name)
    }

    pub fn return_step(&self) -> ReturnStep {
        self.return_step
    }

    /// a step name not used yet, derived from `prefix`
    pub fn create_name(&self, prefix: &str) -> String {
        if self.step(prefix).is_none() {
            return prefix.to_string();
        }
        (1..)
            .map(|n| format!("{prefix}_{n}"))
            .find(|name| self.step(name).is_none())
            .unwrap_or_else(|| prefix.to_string())
    }

    /// request for the next round
    ///
    /// a step whose chained steps still have pages left is sent with the
    /// cursor and limit of its last page, so their cursors stay valid.
    /// finished steps nothing depends on are left out.
    pub fn build(&self) -> QueryRequest {
        self.build_round(&self.plan())
    }

    fn build_round(&self, plan: &[Paging]) -> QueryRequest {
        let mut request = QueryRequest::default();
        for (step, paging) in self.steps.iter().zip(plan) {
            let Some(PageRequest { cursor, limit }) = page_for(step, *paging) else {
                continue;
            };
            let name = step.name().to_string();
            request.with.insert(name.clone(), step.to_result_set(limit));
            request.select.insert(name.clone(), step.select().clone());
            if let Some(cursor) = cursor {
                request.cursors.insert(name, cursor);
            }
        }
        request
    }

    fn plan(&self) -> Vec<Paging> {
        let parents: Vec<Option<usize>> = self
            .steps
            .iter()
            .map(|step| {
                step.from_step()
                    .and_then(|from| self.steps.iter().position(|other| other.name() == from))
            })
            .collect();

        // parents come before children, so one backward pass reaches the root
        let mut held = vec![false; self.steps.len()];
        for index in (0..self.steps.len()).rev() {
            if let Some(parent) = parents[index] {
                if held[index] || self.steps[index].is_pending() {
                    held[parent] = true;
                }
            }
        }

        let mut plan: Vec<Paging> = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            let paging = if step.rounds() == 0 {
                Paging::Advance
            } else if held[index] {
                Paging::Hold
            } else {
                match parents[index].map(|parent| plan[parent]) {
                    None | Some(Paging::Hold) if step.is_finished() => Paging::Skip,
                    None | Some(Paging::Hold) => Paging::Advance,
                    Some(Paging::Skip) => Paging::Skip,
                    Some(Paging::Advance) if step.limit_reached() => Paging::Skip,
                    Some(Paging::Advance) => Paging::Advance,
                }
            };
            plan.push(paging);
        }
        plan
    }

    /// true when every step is finished
    pub fn is_finished(&self) -> bool {
        self.steps.iter().all(QueryStep::is_finished)
    }

    /// fetch every step and unpack the result into nested objects
    pub async fn execute<Q>(&mut self, transport: &Q) -> Result<Vec<Map<String, Value>>>
    where
        Q: QueryTransport + ?Sized,
    {
        self.fetch(transport).await?;
        self.unpack()
    }

    /// like [`QueryBuilder::execute`], decoding each object into `T`
    pub async fn execute_as<T, Q>(&mut self, transport: &Q) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        Q: QueryTransport + ?Sized,
    {
        self.execute(transport)
            .await?
            .into_iter()
            .map(|object| serde_json::from_value(Value::Object(object)).map_err(Error::from))
            .collect()
    }

    /// unpack whatever the steps hold right now
    pub fn unpack(&self) -> Result<Vec<Map<String, Value>>> {
        unpack_steps(&self.steps, self.return_step)
    }

    /// page through every step until all are finished
    pub async fn fetch<Q>(&mut self, transport: &Q) -> Result<()>
    where
        Q: QueryTransport + ?Sized,
    {
        if self.steps.is_empty() {
            return Err(Error::Query("query builder has no steps".to_string()));
        }

        for step in &mut self.steps {
            step.reset();
        }

        let estimate = self.estimate_total(transport).await;
        let mut progress = ProgressTracker::new(estimate, self.progress_interval);
        let mut round = 0u64;

        loop {
            let plan = self.plan();
            let request = self.build_round(&plan);
            debug!(round, steps = request.with.len(), "running query round");

            let started = Instant::now();
            let mut response = match transport.query(&request).await {
                Ok(response) => response,
                Err(err) if err.is_request_too_large() => match self.reduce_batch_limit() {
                    Some(limit) => {
                        warn!(
                            batch_limit = limit,
                            "query too large, reducing batch limit and retrying"
                        );
                        continue;
                    }
                    None => return Err(err),
                },
                Err(err) => return Err(err),
            };
            let elapsed = started.elapsed();
            round += 1;

            let mut root_added = 0;
            for (position, (step, paging)) in self.steps.iter_mut().zip(&plan).enumerate() {
                // a held step returns its current page again
                if *paging != Paging::Advance {
                    continue;
                }
                let page = step.next_page();
                let (batch, cursor) = response.take(step.name());
                step.record_page(page);
                let added = step.merge(batch, cursor);
                if position == 0 {
                    root_added = added;
                }
                debug!(
                    step = step.name(),
                    added,
                    total = step.total_retrieved(),
                    finished = step.is_finished(),
                    "merged batch"
                );
            }

            if self.is_finished() {
                break;
            }

            progress.record(root_added, elapsed);
            if progress.should_report(Instant::now()) {
                let retrieved = self.steps[0].total_retrieved();
                info!(
                    retrieved,
                    estimated_total = progress.estimated_total(),
                    remaining_secs = progress.remaining(retrieved).map(|d| d.as_secs()),
                    "query progress"
                );
            }
        }

        debug!(rounds = round, "query finished");
        Ok(())
    }

    /// count the root step's matches; failures only disable progress estimates
    async fn estimate_total<Q>(&self, transport: &Q) -> Option<u64>
    where
        Q: QueryTransport + ?Sized,
    {
        let root = self.steps.first()?;
        let Expression::Nodes(nodes) = root.expression() else {
            return None;
        };
        let view = root.select().first_view()?;
        let request = AggregateRequest::new(view, vec![Aggregation::count()])
            .with_filter(nodes.filter.clone());

        match transport.aggregate(&request).await {
            Ok(response) => {
                let count = response.first_count()?;
                Some(root.max_retrieve_limit().map_or(count, |max| max.min(count)))
            }
            Err(err) => {
                debug!(error = %err, "count estimate failed, progress disabled");
                None
            }
        }
    }

    /// halve every step's batch cap; `None` when none can shrink further
    fn reduce_batch_limit(&mut self) -> Option<u64> {
        let mut shrunk = false;
        for step in &mut self.steps {
            shrunk |= step.reduce_batch_limit();
        }
        if !shrunk {
            return None;
        }
        self.steps.iter().map(QueryStep::max_batch_limit).max()
    }
}

fn page_for(step: &QueryStep, paging: Paging) -> Option<PageRequest> {
    match paging {
        Paging::Advance => Some(step.next_page()),
        Paging::Hold => Some(step.held_page()),
        Paging::Skip => None,
    }
}

fn validate_chain(parent: &QueryStep, step: &QueryStep) -> Result<()> {
    match (parent.expression(), step.expression()) {
        (Expression::Edges(_), Expression::Edges(_)) => Err(Error::Query(format!(
            "edge step `{}` must chain from a node step, not `{}`",
            step.name(),
            parent.name()
        ))),
        (Expression::Nodes(_), Expression::Nodes(nodes)) if nodes.through.is_none() => {
            Err(Error::Query(format!(
                "node step `{}` chained from node step `{}` needs a `through` relation",
                step.name(),
                parent.name()
            )))
        }
        _ => Ok(()),
    }
}
