//! Council Plan use case (static waves)
//!
//! Builds a [`WavePlan`] from the existing graph: a breadth-first walk from
//! the root along `from → to` connections, one wave per BFS layer. Each
//! discovered node with a configured model becomes a branch. Executing a
//! branch is delegated to a [`NodeExecutor`]; this use case only drives the
//! status transitions and cancellation. No nodes are created and no merge
//! runs.

use crate::ports::graph_store::GraphStore;
use crate::ports::node_executor::NodeExecutor;
use crate::ports::progress::{NoNotifier, Notifier};
use crate::ports::run_logger::{NoRunLogger, RunEvent, RunLogger};
use crate::use_cases::orchestration_error::OrchestrationError;
use crate::use_cases::run_registry::RunRegistry;
use crate::use_cases::shared::{JoinNext, check_cancelled, join_next_or_cancel};
use council_domain::orchestration::clamp_depth;
use council_domain::{CouncilBranch, Graph, RunStatus, Severity, WavePlan};
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Input for one static run
#[derive(Debug, Clone)]
pub struct CouncilPlanInput {
    pub root_node_id: String,
    /// Number of BFS layers to run, clamped to `1..=6`
    pub max_depth: usize,
}

impl CouncilPlanInput {
    pub fn new(root_node_id: impl Into<String>, max_depth: usize) -> Self {
        Self {
            root_node_id: root_node_id.into(),
            max_depth,
        }
    }
}

/// Build the full plan for `root` up front.
///
/// Layers without any model-configured node add no wave.
pub fn build_static_plan(graph: &Graph, root: &str, max_depth: usize) -> WavePlan {
    let max_depth = clamp_depth(max_depth);
    let mut plan = WavePlan::new(max_depth);

    for layer in graph.bfs_layers(root, max_depth) {
        let wave = plan.wave_count;
        let branches: Vec<CouncilBranch> = layer
            .into_iter()
            .filter_map(|(parent, node)| {
                let model = node.model.as_ref()?;
                Some(CouncilBranch::new(
                    wave,
                    model.provider,
                    model.model_id.clone(),
                    parent,
                    node.id.clone(),
                ))
            })
            .collect();

        if branches.is_empty() {
            continue;
        }
        match plan.with_wave(branches) {
            Ok(next) => plan = next,
            Err(_) => break,
        }
    }

    plan
}

/// Use case running static BFS waves over existing nodes
pub struct CouncilPlanUseCase {
    graph: Arc<dyn GraphStore>,
    executor: Arc<dyn NodeExecutor>,
    notifier: Arc<dyn Notifier>,
    logger: Arc<dyn RunLogger>,
    registry: Arc<RunRegistry>,
}

impl CouncilPlanUseCase {
    pub fn new(graph: Arc<dyn GraphStore>, executor: Arc<dyn NodeExecutor>) -> Self {
        Self {
            graph,
            executor,
            notifier: Arc::new(NoNotifier),
            logger: Arc::new(NoRunLogger),
            registry: Arc::new(RunRegistry::new()),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn RunLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_registry(mut self, registry: Arc<RunRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Cancel the active chat's run
    pub fn abort(&self) -> bool {
        self.registry.abort(&self.registry.active_chat())
    }

    pub fn plan(&self) -> Option<WavePlan> {
        self.registry.plan(&self.registry.active_chat())
    }

    /// Build and run the static plan.
    ///
    /// A missing root or an empty plan is reported as a warning and returns
    /// the empty plan; it is not an error.
    pub async fn start(&self, input: CouncilPlanInput) -> Result<WavePlan, OrchestrationError> {
        let chat = self.registry.active_chat();
        let (run_id, token) = self.registry.begin(&chat);

        let graph = self.graph.snapshot();
        let plan = build_static_plan(&graph, &input.root_node_id, input.max_depth);
        self.registry.publish(&chat, run_id, &plan);

        if !graph.contains(&input.root_node_id) {
            self.registry.finish(&chat, run_id);
            let message = OrchestrationError::RootNotFound(input.root_node_id.clone()).to_string();
            warn!("{}", message);
            self.notifier.notify(&message, Severity::Warning);
            return Ok(plan);
        }
        if plan.branches.is_empty() {
            self.registry.finish(&chat, run_id);
            warn!("Static plan for '{}' has no branches", input.root_node_id);
            self.notifier.notify(
                "No branches to run: the root has no connected nodes with a model",
                Severity::Warning,
            );
            return Ok(plan);
        }

        info!(
            "Running static plan from '{}': {} waves, {} branches",
            input.root_node_id,
            plan.wave_count,
            plan.branches.len()
        );

        let result = self.run_waves(plan, &chat, run_id, &token).await;
        self.registry.finish(&chat, run_id);

        match &result {
            Ok(plan) => self.logger.log(RunEvent::new(
                "run_completed",
                json!({
                    "chat": chat,
                    "waves": plan.wave_count,
                    "branches": plan.branches.len(),
                    "errors": plan.error_count(),
                }),
            )),
            Err(e) if e.is_cancelled() => {
                info!("Static run aborted");
                self.logger.log(RunEvent::new("run_aborted", json!({ "chat": chat })));
            }
            Err(e) => self.notifier.notify(&e.to_string(), Severity::Error),
        }

        result
    }

    async fn run_waves(
        &self,
        mut plan: WavePlan,
        chat: &str,
        run_id: u64,
        token: &CancellationToken,
    ) -> Result<WavePlan, OrchestrationError> {
        for wave in 0..plan.wave_count {
            check_cancelled(token)?;
            self.notifier.on_thinking_step(&format!("Running wave {} of {}", wave + 1, plan.wave_count));

            let branches: Vec<CouncilBranch> = plan.branches_in_wave(wave).cloned().collect();
            for branch in &branches {
                plan = plan.with_branch_status(&branch.id, RunStatus::Running, None)?;
            }
            self.registry.publish(chat, run_id, &plan);

            let mut join_set = JoinSet::new();
            for branch in &branches {
                check_cancelled(token)?;
                let executor = Arc::clone(&self.executor);
                let branch_id = branch.id.clone();
                let node_id = branch.node_id.clone();
                let cancel = token.clone();
                join_set.spawn(async move { (branch_id, executor.execute_node(&node_id, &cancel).await) });
            }

            loop {
                let joined = match join_next_or_cancel(&mut join_set, Some(token)).await {
                    JoinNext::Ready(joined) => joined,
                    JoinNext::Exhausted => break,
                    JoinNext::Cancelled => return Err(OrchestrationError::Cancelled),
                };

                let (branch_id, outcome) = match joined {
                    Ok(result) => result,
                    Err(e) => {
                        warn!("Node task join error: {}", e);
                        continue;
                    }
                };

                let (status, error) = match outcome {
                    Ok(()) => (RunStatus::Done, None),
                    Err(e) => {
                        warn!("Branch {} failed: {}", branch_id, e);
                        (RunStatus::Error, Some(e.to_string()))
                    }
                };
                plan = plan.with_branch_status(&branch_id, status, error.clone())?;
                self.registry.publish(chat, run_id, &plan);

                self.logger.log(RunEvent::new(
                    "branch_finished",
                    json!({
                        "wave": wave,
                        "branch_id": branch_id,
                        "status": status.as_str(),
                        "error": error,
                    }),
                ));
            }

            // Entries whose task was lost never settled
            let unsettled: Vec<String> = plan
                .branches_in_wave(wave)
                .filter(|b| !b.status.is_terminal())
                .map(|b| b.id.clone())
                .collect();
            for id in unsettled {
                plan = plan.with_branch_status(&id, RunStatus::Error, Some("node task did not complete".to_string()))?;
            }
            self.registry.publish(chat, run_id, &plan);
            debug!("Wave {} settled", wave + 1);
        }

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::graph_store::GraphUpdate;
    use crate::ports::llm_gateway::{
        GatewayError, LlmGateway, MultiQueryRequest, MultiQueryResponse, QueryRequest, QueryResponse, TokenUsage,
    };
    use crate::ports::node_executor::NodeExecutionError;
    use crate::use_cases::execute_node::NodeQueryExecutor;
    use async_trait::async_trait;
    use council_domain::{Connection, GraphNode, ModelRef, NodeKind, Position, ProviderId};
    use std::sync::Mutex;
    use std::time::Duration;

    // ==================== Test Mocks ====================

    struct MockGraph(Mutex<Graph>);

    impl GraphStore for MockGraph {
        fn snapshot(&self) -> Graph {
            self.0.lock().unwrap().clone()
        }

        fn update(&self, update: GraphUpdate) {
            let mut graph = self.0.lock().unwrap();
            let current = std::mem::take(&mut *graph);
            *graph = update(current);
        }
    }

    #[derive(Default)]
    struct MockExecutor {
        calls: Mutex<Vec<String>>,
        failing: Vec<String>,
        hanging: Vec<String>,
    }

    #[async_trait]
    impl NodeExecutor for MockExecutor {
        async fn execute_node(&self, node_id: &str, _cancel: &CancellationToken) -> Result<(), NodeExecutionError> {
            self.calls.lock().unwrap().push(node_id.to_string());
            if self.hanging.iter().any(|id| id == node_id) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if self.failing.iter().any(|id| id == node_id) {
                return Err(NodeExecutionError::QueryFailed("HTTP 500".to_string()));
            }
            Ok(())
        }
    }

    /// Answers every query after a fixed delay
    struct SlowGateway(Duration);

    #[async_trait]
    impl LlmGateway for SlowGateway {
        async fn query(&self, request: QueryRequest) -> QueryResponse {
            tokio::time::sleep(self.0).await;
            QueryResponse::success(&request.model, "late answer", TokenUsage::default(), 0)
        }

        async fn query_multiple(&self, _request: MultiQueryRequest) -> Result<MultiQueryResponse, GatewayError> {
            Err(GatewayError::Other("unused".to_string()))
        }

        fn is_configured(&self, _provider: ProviderId) -> bool {
            true
        }

        fn available_models(&self) -> Vec<ModelRef> {
            vec![]
        }
    }

    #[derive(Default)]
    struct RecordingNotifier(Mutex<Vec<(String, Severity)>>);

    impl Notifier for RecordingNotifier {
        fn notify(&self, message: &str, severity: Severity) {
            self.0.lock().unwrap().push((message.to_string(), severity));
        }
    }

    fn node(id: &str, with_model: bool) -> GraphNode {
        let mut node = GraphNode::new(NodeKind::Prompt, format!("prompt {}", id), Position::default());
        node.id = id.to_string();
        if with_model {
            node = node.with_model(ModelRef::new(ProviderId::OpenAi, "gpt-4o"));
        }
        node
    }

    /// root → a, b; a → c; b → d (no model)
    fn diamond() -> Graph {
        Graph::new()
            .with_nodes([
                node("root", true),
                node("a", true),
                node("b", true),
                node("c", true),
                node("d", false),
            ])
            .with_connections([
                Connection::new("root", "a"),
                Connection::new("root", "b"),
                Connection::new("a", "c"),
                Connection::new("b", "d"),
            ])
    }

    fn chain(len: usize) -> Graph {
        let nodes: Vec<GraphNode> = (0..len).map(|i| node(&format!("n{}", i), true)).collect();
        let connections: Vec<Connection> = (1..len)
            .map(|i| Connection::new(format!("n{}", i - 1), format!("n{}", i)))
            .collect();
        Graph::new().with_nodes(nodes).with_connections(connections)
    }

    fn use_case(graph: Graph, executor: Arc<MockExecutor>) -> CouncilPlanUseCase {
        CouncilPlanUseCase::new(Arc::new(MockGraph(Mutex::new(graph))), executor)
    }

    // ==================== Plan Construction ====================

    #[test]
    fn test_bfs_layers_become_waves() {
        let plan = build_static_plan(&diamond(), "root", 3);

        assert_eq!(plan.wave_count, 2);
        let first: Vec<&str> = plan.branches_in_wave(0).map(|b| b.node_id.as_str()).collect();
        assert_eq!(first, vec!["a", "b"]);
        let second: Vec<&CouncilBranch> = plan.branches_in_wave(1).collect();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].node_id, "c");
        assert_eq!(second[0].source_node_id, "a");
        assert!(plan.branches.iter().all(|b| b.status == RunStatus::Queued));
    }

    #[test]
    fn test_depth_is_clamped() {
        let plan = build_static_plan(&chain(10), "n0", 10);
        assert_eq!(plan.max_depth, 6);
        assert_eq!(plan.wave_count, 6);
    }

    // ==================== Execution ====================

    #[tokio::test]
    async fn test_runs_every_wave() {
        let executor = Arc::new(MockExecutor {
            failing: vec!["b".to_string()],
            ..Default::default()
        });
        let use_case = use_case(diamond(), executor.clone());

        let plan = use_case.start(CouncilPlanInput::new("root", 3)).await.unwrap();

        assert!(plan.is_settled());
        let failed = plan.branches.iter().find(|b| b.node_id == "b").unwrap();
        assert_eq!(failed.status, RunStatus::Error);
        assert_eq!(failed.error.as_deref(), Some("HTTP 500"));
        let c = plan.branches.iter().find(|b| b.node_id == "c").unwrap();
        assert_eq!(c.status, RunStatus::Done);

        let calls = executor.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls.last().map(String::as_str), Some("c"));
    }

    #[tokio::test]
    async fn test_missing_root_is_a_warning() {
        let notifier = Arc::new(RecordingNotifier::default());
        let use_case = use_case(diamond(), Arc::new(MockExecutor::default())).with_notifier(notifier.clone());

        let plan = use_case.start(CouncilPlanInput::new("ghost", 2)).await.unwrap();

        assert!(plan.branches.is_empty());
        let toasts = notifier.0.lock().unwrap();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].1, Severity::Warning);
    }

    #[tokio::test]
    async fn test_leaf_root_is_a_warning() {
        let notifier = Arc::new(RecordingNotifier::default());
        let executor = Arc::new(MockExecutor::default());
        let use_case = use_case(diamond(), executor.clone()).with_notifier(notifier.clone());

        let plan = use_case.start(CouncilPlanInput::new("c", 2)).await.unwrap();

        assert_eq!(plan.wave_count, 0);
        assert_eq!(notifier.0.lock().unwrap()[0].1, Severity::Warning);
        assert!(executor.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_abort_stops_before_next_wave() {
        let executor = Arc::new(MockExecutor {
            hanging: vec!["a".to_string()],
            ..Default::default()
        });
        let use_case = Arc::new(use_case(diamond(), executor.clone()));

        let runner = Arc::clone(&use_case);
        let handle = tokio::spawn(async move { runner.start(CouncilPlanInput::new("root", 3)).await });

        for _ in 0..200 {
            if executor.calls.lock().unwrap().len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(use_case.abort());

        let err = handle.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());

        let plan = use_case.plan().unwrap();
        let c = plan.branches.iter().find(|b| b.node_id == "c").unwrap();
        assert_eq!(c.status, RunStatus::Queued);
        assert!(!executor.calls.lock().unwrap().iter().any(|id| id == "c"));
    }

    #[tokio::test]
    async fn test_abort_leaves_graph_untouched() {
        let store = Arc::new(MockGraph(Mutex::new(chain(2))));
        let executor = Arc::new(NodeQueryExecutor::new(
            Arc::new(SlowGateway(Duration::from_millis(200))),
            store.clone(),
        ));
        let use_case = Arc::new(CouncilPlanUseCase::new(store.clone(), executor));

        let runner = Arc::clone(&use_case);
        let handle = tokio::spawn(async move { runner.start(CouncilPlanInput::new("n0", 2)).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(use_case.abort());
        let before = store.snapshot();
        assert!(before.node("n1").unwrap().response.is_none());

        assert!(handle.await.unwrap().unwrap_err().is_cancelled());
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(store.snapshot(), before);
    }
}
