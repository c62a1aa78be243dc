//! Pregel Runtime - Core execution engine for workflow graphs
//!
//! The runtime walks the graph from its entry vertices and keeps a frontier of
//! vertices whose predecessors have committed. Frontier vertices run
//! concurrently (bounded by `parallelism`); their results are committed one at
//! a time, in the order they arrive, by the single run loop.
//!
//! Every commit receives a sequence number. A scheduled vertex carries the set
//! of commits in its causal past (its *lineage*) and computes against the
//! initial state with exactly those commits applied in commit order. Sibling
//! branches therefore never observe each other, and a join vertex, whose
//! lineage is the union of all of its predecessors' lineages, sees every
//! branch exactly once regardless of completion order.

use futures::FutureExt;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::config::PregelConfig;
use super::error::PregelError;
use super::state::WorkflowState;
use super::trace::{RunTrace, TraceEventKind};
use super::vertex::{BoxedVertex, ComputeContext, StateUpdate, VertexId, VertexState};
use crate::error::{ErrorKind, NodeError};
use crate::workflow::END;

/// Destination of an edge: a vertex or the terminal marker
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    Vertex(VertexId),
    End,
}

impl Target {
    /// Parse a node name, mapping the END sentinel to [`Target::End`]
    pub fn parse(name: &str) -> Self {
        if name == END {
            Target::End
        } else {
            Target::Vertex(VertexId::from(name))
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Vertex(id) => write!(f, "{}", id),
            Target::End => f.write_str(END),
        }
    }
}

/// Routing function for data-dependent edges
///
/// Receives the source vertex's post-commit view and returns the names of the
/// successors to schedule.
pub type RouterFn<S> = Arc<dyn Fn(&S) -> Vec<String> + Send + Sync>;

/// Outgoing edge of a vertex
pub(crate) enum Route<S> {
    Direct(Target),
    Conditional {
        router: RouterFn<S>,
        targets: Vec<Target>,
    },
}

impl<S> Clone for Route<S> {
    fn clone(&self) -> Self {
        match self {
            Route::Direct(target) => Route::Direct(target.clone()),
            Route::Conditional { router, targets } => Route::Conditional {
                router: Arc::clone(router),
                targets: targets.clone(),
            },
        }
    }
}

/// Result of a workflow execution
#[derive(Debug, Clone)]
pub struct WorkflowResult<S: WorkflowState> {
    /// Final workflow state (every commit applied in commit order)
    pub state: S,
    /// Number of vertex invocations
    pub steps: usize,
    /// Whether the terminal marker was reached
    pub completed: bool,
    /// Final status of all vertices
    pub vertex_states: HashMap<VertexId, VertexState>,
    /// Committing vertex of each commit, in commit order
    pub commit_order: Vec<VertexId>,
    /// Scheduling events of the run
    pub trace: RunTrace,
    /// Identifier of this run
    pub workflow_id: String,
}

/// Commit sequence numbers visible to a vertex invocation
type Lineage = BTreeSet<u64>;

struct Activation {
    vertex: VertexId,
    lineage: Lineage,
}

enum TaskFailure {
    Node(NodeError),
    TimedOut,
    Panicked(String),
}

impl TaskFailure {
    fn into_error(self, vertex: &VertexId) -> PregelError {
        match self {
            TaskFailure::Node(err) => PregelError::from_node_error(vertex.clone(), err),
            TaskFailure::TimedOut => PregelError::VertexTimeout(vertex.clone()),
            TaskFailure::Panicked(message) => PregelError::TaskAborted {
                vertex_id: vertex.clone(),
                message,
            },
        }
    }
}

struct TaskOutcome<U> {
    vertex: VertexId,
    lineage: Lineage,
    invoked_at: Instant,
    result: Result<U, TaskFailure>,
}

/// Per-run bookkeeping owned by the run loop
struct RunLedger<S: WorkflowState> {
    base: S,
    state: S,
    commits: Vec<(VertexId, S::Update)>,
    /// join vertex -> (arrived predecessor -> its lineage)
    join_buffers: BTreeMap<VertexId, BTreeMap<VertexId, Lineage>>,
    vertex_states: HashMap<VertexId, VertexState>,
    invocations: HashMap<VertexId, usize>,
    trace: RunTrace,
}

impl<S: WorkflowState> RunLedger<S> {
    fn new<'a>(initial: S, vertices: impl Iterator<Item = &'a VertexId>, tracing: bool) -> Self {
        Self {
            base: initial.clone(),
            state: initial,
            commits: Vec::new(),
            join_buffers: BTreeMap::new(),
            vertex_states: vertices
                .map(|id| (id.clone(), VertexState::Pending))
                .collect(),
            invocations: HashMap::new(),
            trace: RunTrace::new(tracing),
        }
    }

    /// State with exactly the commits in `lineage` applied, in commit order
    fn view(&self, lineage: &Lineage) -> S {
        if lineage.len() == self.commits.len() {
            return self.state.clone();
        }
        let updates = lineage
            .iter()
            .filter_map(|seq| self.commits.get(*seq as usize))
            .map(|(_, update)| update.clone())
            .collect();
        self.base.apply_updates(updates)
    }

    /// Validate and apply an update; returns its sequence number
    fn commit(
        &mut self,
        vertex: &VertexId,
        writes: &[&str],
        update: S::Update,
    ) -> Result<u64, PregelError> {
        let payload = serde_json::to_value(&update).map_err(|e| {
            PregelError::state_error(format!("update from `{}` is not serializable: {}", vertex, e))
        })?;
        self.state
            .schema()
            .validate_update(&payload, writes)
            .map_err(|violation| PregelError::SchemaViolation {
                vertex_id: vertex.clone(),
                violation,
            })?;

        let seq = self.commits.len() as u64;
        let empty = update.is_empty();
        self.state = self.state.apply_update(update.clone());
        self.commits.push((vertex.clone(), update));
        self.mark(vertex, VertexState::Completed);
        self.trace
            .record(vertex, TraceEventKind::Committed { commit: seq });
        debug!(vertex = %vertex, commit = seq, empty, "Update committed");
        Ok(seq)
    }

    fn mark(&mut self, vertex: &VertexId, status: VertexState) {
        self.vertex_states.insert(vertex.clone(), status);
    }

    fn fail(&mut self, vertex: &VertexId, kind: ErrorKind) {
        self.mark(vertex, VertexState::Failed);
        self.trace.record(vertex, TraceEventKind::Failed { kind });
    }

    fn next_invocation(&mut self, vertex: &VertexId) -> usize {
        let count = self.invocations.entry(vertex.clone()).or_insert(0);
        let current = *count;
        *count += 1;
        current
    }

    fn admit(&mut self, frontier: &mut VecDeque<Activation>, activation: Activation) {
        debug!(
            vertex = %activation.vertex,
            visible_commits = activation.lineage.len(),
            "Vertex scheduled"
        );
        self.mark(&activation.vertex, VertexState::Ready);
        self.trace
            .record(&activation.vertex, TraceEventKind::Scheduled);
        frontier.push_back(activation);
    }

    fn into_result(self, steps: usize, completed: bool, workflow_id: String) -> WorkflowResult<S> {
        WorkflowResult {
            state: self.state,
            steps,
            completed,
            vertex_states: self.vertex_states,
            commit_order: self.commits.into_iter().map(|(vertex, _)| vertex).collect(),
            trace: self.trace,
            workflow_id,
        }
    }
}

/// Pregel Runtime for executing workflow graphs
pub struct PregelRuntime<S: WorkflowState> {
    /// Configuration for the runtime
    config: PregelConfig,
    /// Vertices in the workflow graph
    vertices: HashMap<VertexId, BoxedVertex<S>>,
    /// Outgoing edges per vertex
    routes: HashMap<VertexId, Vec<Route<S>>>,
    /// Join vertices and their full predecessor sets
    joins: HashMap<VertexId, BTreeSet<VertexId>>,
    /// Successors of the start marker
    entry: Vec<VertexId>,
    /// Unique identifier of the workflow instance
    workflow_id: String,
    /// Display name used in logs
    name: String,
}

impl<S: WorkflowState> Default for PregelRuntime<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: WorkflowState> PregelRuntime<S> {
    /// Create a new runtime with default configuration
    pub fn new() -> Self {
        Self::with_config(PregelConfig::default())
    }

    /// Create a new runtime with custom configuration
    pub fn with_config(config: PregelConfig) -> Self {
        Self {
            config,
            vertices: HashMap::new(),
            routes: HashMap::new(),
            joins: HashMap::new(),
            entry: Vec::new(),
            workflow_id: uuid::Uuid::new_v4().to_string(),
            name: String::from("workflow"),
        }
    }

    /// Set the workflow ID for this runtime
    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = workflow_id.into();
        self
    }

    /// Set the display name used in logs
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Get the workflow ID
    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// Get the configuration
    pub fn config(&self) -> &PregelConfig {
        &self.config
    }

    /// Add a vertex to the runtime
    pub fn add_vertex(&mut self, vertex: BoxedVertex<S>) -> &mut Self {
        let id = vertex.id().clone();
        self.vertices.insert(id, vertex);
        self
    }

    /// Add an unconditional edge
    pub fn add_edge(&mut self, from: impl Into<VertexId>, to: Target) -> &mut Self {
        self.routes
            .entry(from.into())
            .or_default()
            .push(Route::Direct(to));
        self
    }

    /// Add a data-dependent edge set
    pub fn add_conditional_edges(
        &mut self,
        from: impl Into<VertexId>,
        router: RouterFn<S>,
        targets: Vec<Target>,
    ) -> &mut Self {
        self.routes
            .entry(from.into())
            .or_default()
            .push(Route::Conditional { router, targets });
        self
    }

    /// Declare a join: `target` runs once every predecessor has committed
    pub fn add_join(
        &mut self,
        predecessors: impl IntoIterator<Item = VertexId>,
        target: impl Into<VertexId>,
    ) -> &mut Self {
        let target = target.into();
        let predecessors: BTreeSet<VertexId> = predecessors.into_iter().collect();
        for pred in &predecessors {
            self.add_edge(pred.clone(), Target::Vertex(target.clone()));
        }
        self.joins.insert(target, predecessors);
        self
    }

    /// Add a successor of the start marker
    pub fn add_entry(&mut self, entry: impl Into<VertexId>) -> &mut Self {
        self.entry.push(entry.into());
        self
    }

    /// Check whether a vertex is a declared join
    pub fn is_join(&self, id: &VertexId) -> bool {
        self.joins.contains_key(id)
    }

    /// Run the workflow to completion
    pub async fn run(&self, initial_state: S) -> Result<WorkflowResult<S>, PregelError> {
        self.run_with_cancellation(initial_state, CancellationToken::new())
            .await
    }

    /// Run the workflow, aborting all in-flight vertices when `cancel` fires
    ///
    /// Enforces the configured `workflow_timeout`; on expiry the run's
    /// cancellation token is triggered and `WorkflowTimeout` is returned.
    pub async fn run_with_cancellation(
        &self,
        initial_state: S,
        cancel: CancellationToken,
    ) -> Result<WorkflowResult<S>, PregelError> {
        self.config.validate()?;
        let workflow_timeout = self.config.workflow_timeout;
        let run_token = cancel.child_token();
        let span = info_span!("workflow", workflow_id = %self.workflow_id, name = %self.name);

        match timeout(
            workflow_timeout,
            self.run_inner(initial_state, run_token.clone())
                .instrument(span),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                run_token.cancel();
                warn!(workflow_id = %self.workflow_id, "Workflow timed out");
                Err(PregelError::WorkflowTimeout(workflow_timeout))
            }
        }
    }

    async fn run_inner(
        &self,
        initial_state: S,
        cancel: CancellationToken,
    ) -> Result<WorkflowResult<S>, PregelError> {
        if self.entry.is_empty() {
            return Err(PregelError::config_error("workflow has no entry vertex"));
        }

        let mut ledger = RunLedger::new(
            initial_state,
            self.vertices.keys(),
            self.config.tracing_enabled,
        );
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        // Dropping the JoinSet aborts every branch still in flight
        let mut in_flight: JoinSet<TaskOutcome<S::Update>> = JoinSet::new();
        let mut frontier = VecDeque::new();
        let mut reached_end = false;
        let mut steps = 0usize;

        for entry in &self.entry {
            ledger.admit(
                &mut frontier,
                Activation {
                    vertex: entry.clone(),
                    lineage: Lineage::new(),
                },
            );
        }

        info!(entries = self.entry.len(), vertices = self.vertices.len(), "Workflow started");

        loop {
            while let Some(activation) = frontier.pop_front() {
                if steps >= self.config.max_steps {
                    return Err(PregelError::MaxStepsExceeded(steps));
                }
                self.spawn_vertex(&mut in_flight, &mut ledger, activation, steps, &semaphore, &cancel)?;
                steps += 1;
            }

            if in_flight.is_empty() {
                break;
            }

            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    in_flight.abort_all();
                    warn!("Workflow cancelled");
                    return Err(PregelError::Cancelled);
                }
                joined = in_flight.join_next() => joined,
            };

            let outcome = match joined {
                Some(Ok(outcome)) => outcome,
                Some(Err(join_err)) => {
                    return Err(PregelError::TaskAborted {
                        vertex_id: VertexId::from("unknown"),
                        message: join_err.to_string(),
                    });
                }
                None => break,
            };

            let TaskOutcome {
                vertex,
                lineage,
                invoked_at,
                result,
            } = outcome;
            ledger
                .trace
                .record_at(&vertex, TraceEventKind::Invoked, invoked_at);

            let update = match result {
                Ok(update) => update,
                Err(failure) => {
                    in_flight.abort_all();
                    let err = failure.into_error(&vertex);
                    warn!(vertex = %vertex, kind = %err.kind(), error = %err, "Vertex failed");
                    ledger.fail(&vertex, err.kind());
                    self.report_abandoned_joins(&ledger, &vertex);
                    return Err(err);
                }
            };

            let writes = self
                .vertices
                .get(&vertex)
                .map(|v| v.writes())
                .unwrap_or(&[]);
            let seq = match ledger.commit(&vertex, writes, update) {
                Ok(seq) => seq,
                Err(err) => {
                    ledger.fail(&vertex, err.kind());
                    return Err(err);
                }
            };

            if ledger.state.is_terminal() {
                info!(vertex = %vertex, "Terminal state reached");
                reached_end = true;
                break;
            }

            let mut lineage = lineage;
            lineage.insert(seq);
            if self.route(&vertex, lineage, &mut ledger, &mut frontier)? {
                reached_end = true;
            }
        }

        if let Some((join, arrived)) = ledger.join_buffers.iter().next() {
            let missing = self.missing_predecessors(join, arrived);
            warn!(join = %join, missing = ?missing, "Run drained with an incomplete join");
            return Err(PregelError::JoinIncomplete {
                vertex_id: join.clone(),
                missing,
            });
        }

        if !reached_end {
            return Err(PregelError::state_error(
                "run drained without reaching the terminal marker",
            ));
        }

        info!(steps, commits = ledger.commits.len(), "Workflow completed");
        Ok(ledger.into_result(steps, reached_end, self.workflow_id.clone()))
    }

    fn spawn_vertex(
        &self,
        in_flight: &mut JoinSet<TaskOutcome<S::Update>>,
        ledger: &mut RunLedger<S>,
        activation: Activation,
        step: usize,
        semaphore: &Arc<Semaphore>,
        cancel: &CancellationToken,
    ) -> Result<(), PregelError> {
        let Activation {
            vertex: vertex_id,
            lineage,
        } = activation;
        let vertex = self
            .vertices
            .get(&vertex_id)
            .cloned()
            .ok_or_else(|| PregelError::config_error(format!("unknown vertex `{}`", vertex_id)))?;

        let snapshot = ledger.view(&lineage);
        let invocation = ledger.next_invocation(&vertex_id);
        ledger.mark(&vertex_id, VertexState::Running);

        let semaphore = Arc::clone(semaphore);
        let cancel = cancel.clone();
        let vertex_timeout = self.config.vertex_timeout;

        in_flight.spawn(async move {
            // The semaphore is never closed, so a failed acquire cannot happen
            let _permit = semaphore.acquire_owned().await.ok();
            let invoked_at = Instant::now();
            let ctx = ComputeContext::new(vertex_id.clone(), &snapshot, invocation, step, cancel);

            let computation = AssertUnwindSafe(vertex.compute(&ctx)).catch_unwind();
            let result = match timeout(vertex_timeout, computation).await {
                Ok(Ok(Ok(update))) => Ok(update),
                Ok(Ok(Err(err))) => Err(TaskFailure::Node(err)),
                Ok(Err(panic)) => Err(TaskFailure::Panicked(panic_message(panic.as_ref()))),
                Err(_) => Err(TaskFailure::TimedOut),
            };

            TaskOutcome {
                vertex: vertex_id,
                lineage,
                invoked_at,
                result,
            }
        });

        Ok(())
    }

    /// Schedule the successors of a committed vertex; returns true on END
    fn route(
        &self,
        from: &VertexId,
        lineage: Lineage,
        ledger: &mut RunLedger<S>,
        frontier: &mut VecDeque<Activation>,
    ) -> Result<bool, PregelError> {
        let mut reached_end = false;
        let routes = self.routes.get(from).map(Vec::as_slice).unwrap_or(&[]);

        for route in routes {
            let chosen = match route {
                Route::Direct(target) => vec![target.clone()],
                Route::Conditional { router, targets } => {
                    let view = ledger.view(&lineage);
                    let names = router(&view);
                    if names.is_empty() {
                        return Err(PregelError::routing_error(
                            from.clone(),
                            "router selected no successor",
                        ));
                    }
                    let mut chosen = Vec::with_capacity(names.len());
                    for name in names {
                        let target = Target::parse(&name);
                        if !targets.contains(&target) {
                            return Err(PregelError::routing_error(
                                from.clone(),
                                format!("router selected undeclared target `{}`", name),
                            ));
                        }
                        if !chosen.contains(&target) {
                            chosen.push(target);
                        }
                    }
                    debug!(vertex = %from, chosen = ?chosen, "Conditional route");
                    chosen
                }
            };

            for target in chosen {
                match target {
                    Target::End => reached_end = true,
                    Target::Vertex(id) => self.activate(from, id, &lineage, ledger, frontier)?,
                }
            }
        }

        Ok(reached_end)
    }

    /// Deliver a committed predecessor to `target`, honouring join barriers
    fn activate(
        &self,
        from: &VertexId,
        target: VertexId,
        lineage: &Lineage,
        ledger: &mut RunLedger<S>,
        frontier: &mut VecDeque<Activation>,
    ) -> Result<(), PregelError> {
        if !self.vertices.contains_key(&target) {
            return Err(PregelError::routing_error(
                from.clone(),
                format!("unknown target `{}`", target),
            ));
        }

        let Some(required) = self.joins.get(&target) else {
            ledger.admit(
                frontier,
                Activation {
                    vertex: target,
                    lineage: lineage.clone(),
                },
            );
            return Ok(());
        };

        if !required.contains(from) {
            return Err(PregelError::routing_error(
                from.clone(),
                format!("`{}` is not a declared predecessor of join `{}`", from, target),
            ));
        }

        let arrived = ledger.join_buffers.entry(target.clone()).or_default();
        arrived
            .entry(from.clone())
            .or_default()
            .extend(lineage.iter().copied());
        let missing = self.missing_predecessors(&target, arrived);

        if !missing.is_empty() {
            debug!(join = %target, from = %from, waiting_for = ?missing, "Join blocked");
            ledger.mark(&target, VertexState::BlockedOnJoin);
            ledger.trace.record(
                &target,
                TraceEventKind::BlockedOnJoin {
                    waiting_for: missing,
                },
            );
            return Ok(());
        }

        let arrived = ledger.join_buffers.remove(&target).unwrap_or_default();
        let missing = self.missing_predecessors(&target, &arrived);
        debug_assert!(missing.is_empty(), "join released before every predecessor committed");
        if !missing.is_empty() {
            return Err(PregelError::JoinIncomplete {
                vertex_id: target,
                missing,
            });
        }

        let merged: Lineage = arrived.into_values().flatten().collect();
        debug!(join = %target, visible_commits = merged.len(), "Join satisfied");
        ledger.admit(
            frontier,
            Activation {
                vertex: target,
                lineage: merged,
            },
        );
        Ok(())
    }

    fn missing_predecessors(
        &self,
        join: &VertexId,
        arrived: &BTreeMap<VertexId, Lineage>,
    ) -> Vec<VertexId> {
        self.joins
            .get(join)
            .map(|required| {
                required
                    .iter()
                    .filter(|pred| !arrived.contains_key(*pred))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn report_abandoned_joins(&self, ledger: &RunLedger<S>, failed: &VertexId) {
        for (join, required) in &self.joins {
            if !required.contains(failed) {
                continue;
            }
            let arrived: Vec<&VertexId> = ledger
                .join_buffers
                .get(join)
                .map(|buffer| buffer.keys().collect())
                .unwrap_or_default();
            warn!(
                join = %join,
                missing_branch = %failed,
                arrived = ?arrived,
                "Join will not run: a predecessor branch failed"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("vertex panicked")
    }
}
