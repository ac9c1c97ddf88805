//! Autonomous Council use case
//!
//! Explores a question in waves. Each wave asks a planner model for a set
//! of branches, materializes one graph node per branch around the current
//! source node, runs the branches in parallel and merges their outputs into
//! a new node, which becomes the source of the next wave.
//!
//! Branch and merge failures are recorded on the plan entry and rendered on
//! the node; they never abort the run. Structural failures (missing root,
//! no viable branch) abort with a toast. Cancellation aborts silently.

use crate::config::OrchestratorParams;
use crate::ports::credential_store::CredentialStore;
use crate::ports::graph_store::GraphStore;
use crate::ports::llm_gateway::{LlmGateway, QueryRequest, QueryResponse};
use crate::ports::progress::{NoNotifier, Notifier};
use crate::ports::run_logger::{NoRunLogger, RunEvent, RunLogger};
use crate::use_cases::orchestration_error::OrchestrationError;
use crate::use_cases::run_registry::RunRegistry;
use crate::use_cases::shared::{JoinNext, check_cancelled, join_next_or_cancel};
use council_domain::core::registry;
use council_domain::core::string::clip;
use council_domain::graph::{branch_positions, error_text, merge_position};
use council_domain::orchestration::{clamp_depth, heuristic_plan, parse_planner_output, select_branches};
use council_domain::{
    Connection, CouncilBranch, CouncilMerge, GraphNode, ModelRef, NodeKind, PlannerOutput,
    PlannerPromptTemplate, Position, ProviderId, RunStatus, Severity, WavePlan,
};
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Temperature of the planning round
const PLANNER_TEMPERATURE: f32 = 0.4;

/// Upper bound on the previous-wave summary handed to the planner
const CONTEXT_CHARS: usize = 4000;

/// Input for one autonomous run
#[derive(Debug, Clone)]
pub struct AutonomousInput {
    pub root_node_id: String,
    /// Question to explore; defaults to the root node's prompt
    pub question: Option<String>,
    /// Requested wave count, clamped to `1..=6`
    pub max_depth: usize,
}

impl AutonomousInput {
    pub fn new(root_node_id: impl Into<String>, max_depth: usize) -> Self {
        Self {
            root_node_id: root_node_id.into(),
            question: None,
            max_depth,
        }
    }

    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }
}

/// Result of one branch, in branch order
struct BranchOutcome {
    model: ModelRef,
    node_id: String,
    position: Position,
    result: Result<String, String>,
}

/// Identifies the run a step belongs to
struct RunScope<'a> {
    chat: &'a str,
    run_id: u64,
    token: &'a CancellationToken,
}

/// Use case driving autonomous wave exploration
pub struct AutonomousCouncilUseCase<G: LlmGateway + 'static> {
    gateway: Arc<G>,
    credentials: Arc<dyn CredentialStore>,
    graph: Arc<dyn GraphStore>,
    notifier: Arc<dyn Notifier>,
    logger: Arc<dyn RunLogger>,
    registry: Arc<RunRegistry>,
    params: OrchestratorParams,
}

impl<G: LlmGateway + 'static> AutonomousCouncilUseCase<G> {
    pub fn new(gateway: Arc<G>, credentials: Arc<dyn CredentialStore>, graph: Arc<dyn GraphStore>) -> Self {
        Self {
            gateway,
            credentials,
            graph,
            notifier: Arc::new(NoNotifier),
            logger: Arc::new(NoRunLogger),
            registry: Arc::new(RunRegistry::new()),
            params: OrchestratorParams::default(),
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

    pub fn with_params(mut self, params: OrchestratorParams) -> Self {
        self.params = params;
        self
    }

    /// Cancel the active chat's run. Partial results stay visible.
    pub fn abort(&self) -> bool {
        self.registry.abort(&self.registry.active_chat())
    }

    /// Switch conversations; returns the new chat's last-known plan
    pub fn set_active_chat(&self, chat: &str) -> Option<WavePlan> {
        self.registry.set_active_chat(chat)
    }

    /// The active chat's last-known plan
    pub fn plan(&self) -> Option<WavePlan> {
        self.registry.plan(&self.registry.active_chat())
    }

    /// Run the waves for `input` in the active chat.
    ///
    /// Starting a run cancels any run already in flight for that chat.
    /// Returns the final plan, or `OrchestrationError::Cancelled` when the
    /// run was aborted.
    pub async fn start(&self, input: AutonomousInput) -> Result<WavePlan, OrchestrationError> {
        let chat = self.registry.active_chat();
        let (run_id, token) = self.registry.begin(&chat);
        let scope = RunScope {
            chat: &chat,
            run_id,
            token: &token,
        };

        let result = self.run(&input, &scope).await;
        self.registry.finish(&chat, run_id);

        match &result {
            Ok(plan) => {
                info!(
                    "Autonomous run finished: {} waves, {} errors",
                    plan.wave_count,
                    plan.error_count()
                );
                self.logger.log(RunEvent::new(
                    "run_completed",
                    json!({
                        "chat": chat,
                        "waves": plan.wave_count,
                        "branches": plan.branches.len(),
                        "errors": plan.error_count(),
                    }),
                ));
            }
            Err(e) if e.is_cancelled() => {
                info!("Autonomous run aborted");
                self.logger.log(RunEvent::new("run_aborted", json!({ "chat": chat })));
            }
            Err(e) => {
                warn!("Autonomous run failed: {}", e);
                self.notifier.notify(&e.to_string(), Severity::Error);
            }
        }

        result
    }

    async fn run(&self, input: &AutonomousInput, scope: &RunScope<'_>) -> Result<WavePlan, OrchestrationError> {
        let graph = self.graph.snapshot();
        let root = graph
            .node(&input.root_node_id)
            .ok_or_else(|| OrchestrationError::RootNotFound(input.root_node_id.clone()))?;

        let question = input
            .question
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(root.prompt.trim())
            .to_string();
        if question.is_empty() {
            return Err(OrchestrationError::NoQuestion);
        }

        let max_depth = clamp_depth(input.max_depth);
        let mut plan = WavePlan::new(max_depth);
        self.registry.publish(scope.chat, scope.run_id, &plan);

        let mut source_id = root.id.clone();
        let mut source_position = root.position;
        let mut context: Option<String> = None;

        info!("Starting autonomous run on '{}' (max depth {})", source_id, max_depth);

        while plan.can_start_wave() {
            check_cancelled(scope.token)?;
            let wave = plan.wave_count;

            self.notifier.on_thinking_step(&format!("Planning wave {}", wave + 1));
            let planned = self.plan_wave(&question, context.as_deref(), wave, max_depth, scope).await?;
            check_cancelled(scope.token)?;

            let selected = select_branches(
                &planned.branches,
                |p| self.credentials.is_usable(p),
                self.params.max_branches,
            );
            if selected.is_empty() {
                return Err(OrchestrationError::NoViableBranches);
            }

            // Materialize branch nodes around the source
            let positions = branch_positions(source_position, selected.len(), self.params.branch_radius);
            let nodes: Vec<GraphNode> = selected
                .iter()
                .zip(&positions)
                .map(|((model, prompt), position)| {
                    GraphNode::new(NodeKind::Branch, prompt.clone(), *position).with_model(model.clone())
                })
                .collect();
            let connections: Vec<Connection> = nodes.iter().map(|n| Connection::new(&source_id, &n.id)).collect();
            let branches: Vec<CouncilBranch> = nodes
                .iter()
                .zip(&selected)
                .map(|(node, (model, _))| {
                    CouncilBranch::new(wave, model.provider, model.model_id.clone(), &source_id, &node.id)
                })
                .collect();

            let new_nodes = nodes.clone();
            self.graph
                .update(Box::new(move |g| g.with_nodes(new_nodes).with_connections(connections)));

            plan = plan.with_wave(branches.clone())?;
            for branch in &branches {
                plan = plan.with_branch_status(&branch.id, RunStatus::Running, None)?;
            }
            self.registry.publish(scope.chat, scope.run_id, &plan);

            info!("Wave {}: {} branches", wave + 1, branches.len());
            self.logger.log(RunEvent::new(
                "wave_planned",
                json!({
                    "wave": wave,
                    "branches": selected
                        .iter()
                        .map(|(model, prompt)| json!({ "model": model.to_string(), "prompt": prompt }))
                        .collect::<Vec<_>>(),
                    "merge_model": planned.merge_model,
                    "continue": planned.wants_another_wave(),
                }),
            ));

            self.notifier
                .on_thinking_step(&format!("Running {} branches of wave {}", branches.len(), wave + 1));
            let outcomes = self
                .execute_branches(&mut plan, &branches, &nodes, &selected, &positions, scope)
                .await?;

            self.notifier.on_thinking_step(&format!("Merging wave {}", wave + 1));
            let (merge_node_id, merge_at, merged) =
                self.execute_merge(&mut plan, wave, &question, &planned, &outcomes, scope).await?;

            context = match merged {
                Some(text) => Some(clip(&text, CONTEXT_CHARS)),
                None => {
                    let joined = outcomes
                        .iter()
                        .filter_map(|o| o.result.as_ref().ok())
                        .cloned()
                        .collect::<Vec<_>>()
                        .join("\n\n");
                    (!joined.is_empty()).then(|| clip(&joined, CONTEXT_CHARS))
                }
            };
            source_id = merge_node_id;
            source_position = merge_at;

            if !planned.wants_another_wave() {
                debug!("Planner asked to stop after wave {}", wave + 1);
                break;
            }
        }

        Ok(plan)
    }

    /// Ask the planner for this wave's branches, falling back to the
    /// heuristic plan on any failure
    async fn plan_wave(
        &self,
        question: &str,
        context: Option<&str>,
        wave: usize,
        max_depth: usize,
        scope: &RunScope<'_>,
    ) -> Result<PlannerOutput, OrchestrationError> {
        let usable = self.credentials.usable_providers();

        if let Some(planner) = self.planner_model(&usable) {
            let request = QueryRequest::new(planner.clone())
                .with_system(PlannerPromptTemplate::planner_system(
                    &self.model_sample(&usable),
                    self.params.max_branches,
                ))
                .with_user(PlannerPromptTemplate::planner_prompt(question, context, wave, max_depth))
                .with_temperature(PLANNER_TEMPERATURE);

            let response = self.query_or_cancel(request, scope.token).await?;
            match response.error_message() {
                None => {
                    if let Some(output) = parse_planner_output(&response.content) {
                        debug!("Planner {} proposed {} branches", planner, output.branches.len());
                        return Ok(output);
                    }
                    warn!("Planner {} returned no usable plan, using heuristic", planner);
                }
                Some(error) => warn!("Planner {} failed: {}, using heuristic", planner, error),
            }
        } else {
            debug!("No usable planner model, using heuristic");
        }

        Ok(heuristic_plan(question, &usable, wave))
    }

    /// The configured planner if its provider is usable, else the first
    /// registry model of a usable provider
    fn planner_model(&self, usable: &[ProviderId]) -> Option<ModelRef> {
        if usable.contains(&self.params.planner_model.provider) {
            return Some(self.params.planner_model.clone());
        }
        usable.iter().find_map(|&provider| {
            registry::models_for(provider)
                .next()
                .map(|m| ModelRef::new(provider, m.id))
        })
    }

    /// Usable models listed in the planner prompt
    fn model_sample(&self, usable: &[ProviderId]) -> Vec<String> {
        let mut models: Vec<ModelRef> = self
            .gateway
            .available_models()
            .into_iter()
            .filter(|m| usable.contains(&m.provider))
            .collect();
        if models.is_empty() {
            models = usable
                .iter()
                .flat_map(|&p| registry::models_for(p).map(move |m| ModelRef::new(p, m.id)))
                .collect();
        }
        models
            .iter()
            .take(self.params.model_sample_size)
            .map(ToString::to_string)
            .collect()
    }

    /// Run every branch of the wave in parallel, recording each result on
    /// its node and plan entry as it settles
    async fn execute_branches(
        &self,
        plan: &mut WavePlan,
        branches: &[CouncilBranch],
        nodes: &[GraphNode],
        selected: &[(ModelRef, String)],
        positions: &[Position],
        scope: &RunScope<'_>,
    ) -> Result<Vec<BranchOutcome>, OrchestrationError> {
        let mut join_set = JoinSet::new();

        for (index, (model, prompt)) in selected.iter().enumerate() {
            check_cancelled(scope.token)?;
            let gateway = Arc::clone(&self.gateway);
            let request = QueryRequest::new(model.clone()).with_user(prompt.clone());
            join_set.spawn(async move { (index, gateway.query(request).await) });
        }

        let mut results: Vec<Option<Result<String, String>>> = vec![None; selected.len()];

        loop {
            let joined = match join_next_or_cancel(&mut join_set, Some(scope.token)).await {
                JoinNext::Ready(joined) => joined,
                JoinNext::Exhausted => break,
                JoinNext::Cancelled => return Err(OrchestrationError::Cancelled),
            };

            let (index, result) = match joined {
                Ok((index, response)) => (index, response_result(response)),
                Err(e) => {
                    warn!("Branch task join error: {}", e);
                    continue;
                }
            };

            self.settle_branch(plan, &branches[index], &nodes[index], &selected[index].0, &result, scope)?;
            results[index] = Some(result);
        }

        // Tasks lost to a join error never settled their entry
        for (index, slot) in results.iter_mut().enumerate() {
            if slot.is_none() {
                let result = Err("branch task did not complete".to_string());
                self.settle_branch(plan, &branches[index], &nodes[index], &selected[index].0, &result, scope)?;
                *slot = Some(result);
            }
        }

        Ok(results
            .into_iter()
            .zip(selected)
            .zip(nodes.iter().zip(positions))
            .map(|((result, (model, _)), (node, position))| BranchOutcome {
                model: model.clone(),
                node_id: node.id.clone(),
                position: *position,
                result: result.unwrap_or_else(|| Err("branch task did not complete".to_string())),
            })
            .collect())
    }

    fn settle_branch(
        &self,
        plan: &mut WavePlan,
        branch: &CouncilBranch,
        node: &GraphNode,
        model: &ModelRef,
        result: &Result<String, String>,
        scope: &RunScope<'_>,
    ) -> Result<(), OrchestrationError> {
        let (text, status, error) = match result {
            Ok(content) => {
                debug!("Branch {} ({}) done", branch.id, model);
                (content.clone(), RunStatus::Done, None)
            }
            Err(message) => {
                warn!("Branch {} ({}) failed: {}", branch.id, model, message);
                (error_text(message), RunStatus::Error, Some(message.clone()))
            }
        };

        let node_id = node.id.clone();
        self.graph
            .update(Box::new(move |g| g.with_node_response(&node_id, text)));

        *plan = plan.with_branch_status(&branch.id, status, error.clone())?;
        self.registry.publish(scope.chat, scope.run_id, plan);

        self.logger.log(RunEvent::new(
            "branch_finished",
            json!({
                "wave": branch.wave,
                "branch_id": branch.id,
                "model": model.to_string(),
                "status": status.as_str(),
                "error": error,
            }),
        ));
        Ok(())
    }

    /// Materialize the merge node for the wave and run it.
    ///
    /// Returns the merge node id, its position and the merged text when
    /// the merge succeeded.
    async fn execute_merge(
        &self,
        plan: &mut WavePlan,
        wave: usize,
        question: &str,
        planned: &PlannerOutput,
        outcomes: &[BranchOutcome],
        scope: &RunScope<'_>,
    ) -> Result<(String, Position, Option<String>), OrchestrationError> {
        check_cancelled(scope.token)?;

        let model = self.merge_model(planned, outcomes);
        let sources: Vec<(String, String)> = outcomes
            .iter()
            .map(|o| {
                let text = match &o.result {
                    Ok(content) => content.clone(),
                    Err(message) => error_text(message),
                };
                (o.model.to_string(), text)
            })
            .collect();
        let prompt = PlannerPromptTemplate::merge_prompt(question, &sources);

        let inputs: Vec<Position> = outcomes.iter().map(|o| o.position).collect();
        let position = merge_position(&inputs, self.params.branch_radius);
        let node = GraphNode::new(NodeKind::Merge, prompt.clone(), position).with_model(model.clone());
        let node_id = node.id.clone();
        let input_ids: Vec<String> = outcomes.iter().map(|o| o.node_id.clone()).collect();
        let connections: Vec<Connection> = input_ids.iter().map(|id| Connection::new(id, &node_id)).collect();

        self.graph
            .update(Box::new(move |g| g.with_node(node).with_connections(connections)));

        let merge = CouncilMerge::new(wave, input_ids, &node_id, model.provider, model.model_id.clone());
        let merge_id = merge.id.clone();
        *plan = plan.with_merge(merge);
        *plan = plan.with_merge_status(&merge_id, RunStatus::Running, None)?;
        self.registry.publish(scope.chat, scope.run_id, plan);

        debug!("Merging wave {} with {}", wave + 1, model);
        let request = QueryRequest::new(model.clone()).with_user(prompt);
        let response = self.query_or_cancel(request, scope.token).await?;

        let result = response_result(response);
        let (text, status, error) = match &result {
            Ok(content) => (content.clone(), RunStatus::Done, None),
            Err(message) => {
                warn!("Merge of wave {} ({}) failed: {}", wave + 1, model, message);
                (error_text(message), RunStatus::Error, Some(message.clone()))
            }
        };

        let response_node = node_id.clone();
        self.graph
            .update(Box::new(move |g| g.with_node_response(&response_node, text)));
        *plan = plan.with_merge_status(&merge_id, status, error.clone())?;
        self.registry.publish(scope.chat, scope.run_id, plan);

        self.logger.log(RunEvent::new(
            "merge_finished",
            json!({
                "wave": wave,
                "merge_id": merge_id,
                "model": model.to_string(),
                "status": status.as_str(),
                "error": error,
            }),
        ));

        Ok((node_id, position, result.ok()))
    }

    /// Planner's merge model if usable, else the first successful branch's
    /// model, else the first branch's
    fn merge_model(&self, planned: &PlannerOutput, outcomes: &[BranchOutcome]) -> ModelRef {
        if let Some(model) = planned.merge_model_ref()
            && self.credentials.is_usable(model.provider)
        {
            return model;
        }
        outcomes
            .iter()
            .find(|o| o.result.is_ok())
            .or_else(|| outcomes.first())
            .map(|o| o.model.clone())
            .unwrap_or_else(|| self.params.planner_model.clone())
    }

    /// Run one query as a detached task, returning early on cancellation.
    ///
    /// The request itself is not interrupted; its result is dropped.
    async fn query_or_cancel(
        &self,
        request: QueryRequest,
        token: &CancellationToken,
    ) -> Result<QueryResponse, OrchestrationError> {
        let model = request.model.clone();
        let gateway = Arc::clone(&self.gateway);
        let handle = tokio::spawn(async move { gateway.query(request).await });

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(OrchestrationError::Cancelled),
            joined = handle => Ok(joined.unwrap_or_else(|e| QueryResponse::failure(&model, e, 0))),
        }
    }
}

fn response_result(response: QueryResponse) -> Result<String, String> {
    match response.error_message() {
        Some(error) => Err(error),
        None => Ok(response.content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::graph_store::GraphUpdate;
    use crate::ports::llm_gateway::{GatewayError, MultiQueryRequest, MultiQueryResponse, TokenUsage};
    use async_trait::async_trait;
    use council_domain::{Graph, ProviderCredential};
    use std::sync::Mutex;
    use std::time::Duration;

    // ==================== Test Mocks ====================

    enum Reply {
        Text(String),
        Fail(String),
        Hang,
        /// Answers "late" after the given number of milliseconds
        Late(u64),
    }

    type Script = Box<dyn Fn(&QueryRequest) -> Reply + Send + Sync>;

    struct MockGateway {
        script: Script,
        calls: Mutex<Vec<QueryRequest>>,
    }

    impl MockGateway {
        fn new(script: impl Fn(&QueryRequest) -> Reply + Send + Sync + 'static) -> Self {
            Self {
                script: Box::new(script),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn planner_calls(&self) -> usize {
            self.calls.lock().unwrap().iter().filter(|r| is_planner(r)).count()
        }
    }

    #[async_trait]
    impl LlmGateway for MockGateway {
        async fn query(&self, request: QueryRequest) -> QueryResponse {
            self.calls.lock().unwrap().push(request.clone());
            match (self.script)(&request) {
                Reply::Text(text) => QueryResponse::success(&request.model, text, TokenUsage::default(), 1),
                Reply::Fail(error) => QueryResponse::failure(&request.model, error, 1),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    QueryResponse::success(&request.model, "late", TokenUsage::default(), 60_000)
                }
                Reply::Late(ms) => {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    QueryResponse::success(&request.model, "late", TokenUsage::default(), ms)
                }
            }
        }

        async fn query_multiple(&self, _request: MultiQueryRequest) -> Result<MultiQueryResponse, GatewayError> {
            Err(GatewayError::Other("not scripted".to_string()))
        }

        fn is_configured(&self, _provider: ProviderId) -> bool {
            true
        }

        fn available_models(&self) -> Vec<ModelRef> {
            vec![
                ModelRef::new(ProviderId::OpenAi, "gpt-4o"),
                ModelRef::new(ProviderId::Anthropic, "claude-3-5-sonnet-20241022"),
            ]
        }
    }

    struct MockCredentials(Vec<ProviderCredential>);

    impl CredentialStore for MockCredentials {
        fn credentials(&self) -> Vec<ProviderCredential> {
            self.0.clone()
        }
    }

    fn two_providers() -> Arc<MockCredentials> {
        Arc::new(MockCredentials(vec![
            ProviderCredential::new(ProviderId::OpenAi, "sk-proj-abcdefghijklmnopqrstuvwxyz"),
            ProviderCredential::new(ProviderId::Anthropic, "sk-ant-REDACTED"),
        ]))
    }

    struct MockGraph(Mutex<Graph>);

    impl MockGraph {
        fn with_root(prompt: &str) -> (Arc<Self>, String) {
            let root = GraphNode::new(NodeKind::Prompt, prompt, Position::default());
            let id = root.id.clone();
            (Arc::new(Self(Mutex::new(Graph::new().with_node(root)))), id)
        }
    }

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
    struct RecordingNotifier {
        toasts: Mutex<Vec<(String, Severity)>>,
        steps: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, message: &str, severity: Severity) {
            self.toasts.lock().unwrap().push((message.to_string(), severity));
        }

        fn on_thinking_step(&self, step: &str) {
            self.steps.lock().unwrap().push(step.to_string());
        }
    }

    #[derive(Default)]
    struct RecordingLogger(Mutex<Vec<&'static str>>);

    impl RunLogger for RecordingLogger {
        fn log(&self, event: RunEvent) {
            self.0.lock().unwrap().push(event.event_type);
        }
    }

    fn is_planner(r: &QueryRequest) -> bool {
        r.system_text().is_some_and(|s| s.starts_with("You plan one wave"))
    }

    fn is_merge(r: &QueryRequest) -> bool {
        r.messages.last().is_some_and(|m| m.content.contains("Several models explored"))
    }

    const TWO_BRANCH_PLAN: &str = r#"Plan: {"branches":[
        {"providerId":"openai","modelId":"gpt-4o","prompt":"angle one"},
        {"providerId":"anthropic","modelId":"claude-3-5-sonnet-20241022","prompt":"angle two"}
    ],"mergeModel":"anthropic/claude-3-5-sonnet-20241022","continue":true}"#;

    fn scripted(planner: &'static str) -> impl Fn(&QueryRequest) -> Reply + Send + Sync + 'static {
        move |r| {
            if is_planner(r) {
                Reply::Text(planner.to_string())
            } else if is_merge(r) {
                Reply::Text(format!("merged by {}", r.model.model_id))
            } else {
                Reply::Text(format!("{} says hi", r.model.model_id))
            }
        }
    }

    // ==================== Planning ====================

    #[tokio::test]
    async fn test_single_wave_with_planned_branches() {
        let gateway = Arc::new(MockGateway::new(scripted(
            r#"{"branches":[{"providerId":"openai","modelId":"gpt-4o","prompt":"angle one"}],"continue":false}"#,
        )));
        let (graph, root) = MockGraph::with_root("Is Rust fast?");
        let use_case = AutonomousCouncilUseCase::new(Arc::clone(&gateway), two_providers(), graph.clone());

        let plan = use_case.start(AutonomousInput::new(&root, 3)).await.unwrap();

        assert_eq!(plan.wave_count, 1);
        assert_eq!(plan.branches.len(), 1);
        assert_eq!(plan.branches[0].status, RunStatus::Done);
        assert_eq!(plan.merges.len(), 1);
        assert_eq!(plan.merges[0].status, RunStatus::Done);
        // No merge model planned: first successful branch merges
        assert_eq!(plan.merges[0].model_id, "gpt-4o");

        let snapshot = graph.snapshot();
        assert_eq!(snapshot.nodes.len(), 3);
        assert_eq!(snapshot.connections.len(), 2);
        let branch = snapshot.node(&plan.branches[0].node_id).unwrap();
        assert_eq!(branch.kind, NodeKind::Branch);
        assert_eq!(branch.prompt, "angle one");
        assert_eq!(branch.response.as_deref(), Some("gpt-4o says hi"));
        let merge = snapshot.node(&plan.merges[0].output_node_id).unwrap();
        assert_eq!(merge.response.as_deref(), Some("merged by gpt-4o"));
        assert_eq!(use_case.plan(), Some(plan));
    }

    #[tokio::test]
    async fn test_invalid_planner_json_falls_back_to_heuristic() {
        let gateway = Arc::new(MockGateway::new(scripted("I would explore three angles, roughly.")));
        let (graph, root) = MockGraph::with_root("Should we rewrite it in Rust?");
        let use_case = AutonomousCouncilUseCase::new(Arc::clone(&gateway), two_providers(), graph.clone());

        let plan = use_case.start(AutonomousInput::new(&root, 1)).await.unwrap();

        // One branch per usable provider, the first asks the question verbatim
        assert_eq!(plan.branches.len(), 2);
        let providers: Vec<ProviderId> = plan.branches.iter().map(|b| b.provider_id).collect();
        assert!(providers.contains(&ProviderId::OpenAi));
        assert!(providers.contains(&ProviderId::Anthropic));
        let snapshot = graph.snapshot();
        let first = snapshot.node(&plan.branches[0].node_id).unwrap();
        assert_eq!(first.prompt, "Should we rewrite it in Rust?");
        assert!(plan.is_settled());
    }

    #[tokio::test]
    async fn test_no_usable_provider_toasts_and_leaves_graph_untouched() {
        let gateway = Arc::new(MockGateway::new(scripted("not json")));
        let (graph, root) = MockGraph::with_root("q");
        let before = graph.snapshot();
        let notifier = Arc::new(RecordingNotifier::default());
        let use_case = AutonomousCouncilUseCase::new(
            Arc::clone(&gateway),
            Arc::new(MockCredentials(vec![])),
            graph.clone(),
        )
        .with_notifier(notifier.clone());

        let err = use_case.start(AutonomousInput::new(&root, 2)).await.unwrap_err();

        assert!(matches!(err, OrchestrationError::NoViableBranches));
        assert_eq!(graph.snapshot(), before);
        assert_eq!(gateway.planner_calls(), 0);
        let toasts = notifier.toasts.lock().unwrap();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].1, Severity::Error);
    }

    #[tokio::test]
    async fn test_unusable_planned_branches_are_dropped() {
        let gateway = Arc::new(MockGateway::new(scripted(
            r#"{"branches":[
                {"providerId":"groq","modelId":"llama-3.3-70b-versatile","prompt":"fast take"},
                {"providerId":"openai","modelId":"gpt-4o","prompt":"careful take"}
            ],"continue":false}"#,
        )));
        let (graph, root) = MockGraph::with_root("q");
        let use_case = AutonomousCouncilUseCase::new(gateway, two_providers(), graph);

        let plan = use_case.start(AutonomousInput::new(&root, 1)).await.unwrap();

        assert_eq!(plan.branches.len(), 1);
        assert_eq!(plan.branches[0].model_id, "gpt-4o");
    }

    #[tokio::test]
    async fn test_missing_root_is_reported() {
        let gateway = Arc::new(MockGateway::new(scripted("{}")));
        let (graph, _) = MockGraph::with_root("q");
        let notifier = Arc::new(RecordingNotifier::default());
        let use_case =
            AutonomousCouncilUseCase::new(gateway, two_providers(), graph).with_notifier(notifier.clone());

        let err = use_case.start(AutonomousInput::new("nope", 1)).await.unwrap_err();

        assert!(matches!(err, OrchestrationError::RootNotFound(_)));
        assert_eq!(notifier.toasts.lock().unwrap().len(), 1);
    }

    // ==================== Waves ====================

    #[tokio::test]
    async fn test_depth_is_clamped_to_six_waves() {
        let gateway = Arc::new(MockGateway::new(scripted(TWO_BRANCH_PLAN)));
        let (graph, root) = MockGraph::with_root("q");
        let use_case = AutonomousCouncilUseCase::new(Arc::clone(&gateway), two_providers(), graph.clone());

        let plan = use_case.start(AutonomousInput::new(&root, 10)).await.unwrap();

        assert_eq!(plan.max_depth, 6);
        assert_eq!(plan.wave_count, 6);
        assert_eq!(plan.merges.len(), 6);
        assert_eq!(gateway.planner_calls(), 6);
        // root + 6 * (2 branches + 1 merge)
        assert_eq!(graph.snapshot().nodes.len(), 19);
    }

    #[tokio::test]
    async fn test_merge_node_feeds_next_wave() {
        let gateway = Arc::new(MockGateway::new(scripted(TWO_BRANCH_PLAN)));
        let (graph, root) = MockGraph::with_root("q");
        let use_case = AutonomousCouncilUseCase::new(Arc::clone(&gateway), two_providers(), graph);

        let plan = use_case.start(AutonomousInput::new(&root, 2)).await.unwrap();

        let first_merge = &plan.merges[0];
        assert_eq!(first_merge.model_id, "claude-3-5-sonnet-20241022");
        for branch in plan.branches_in_wave(1) {
            assert_eq!(branch.source_node_id, first_merge.output_node_id);
        }
        // Second planning round sees the first merge as context
        let calls = gateway.calls.lock().unwrap();
        let second_planner = calls.iter().filter(|r| is_planner(r)).nth(1).unwrap();
        assert!(second_planner.messages[1].content.contains("merged by claude-3-5-sonnet-20241022"));
    }

    #[tokio::test]
    async fn test_branch_failure_is_isolated() {
        let gateway = Arc::new(MockGateway::new(|r| {
            if is_planner(r) {
                Reply::Text(
                    r#"{"branches":[
                        {"providerId":"openai","modelId":"gpt-4o","prompt":"a"},
                        {"providerId":"anthropic","modelId":"claude-3-5-sonnet-20241022","prompt":"b"}
                    ],"continue":false}"#
                        .to_string(),
                )
            } else if is_merge(r) {
                Reply::Text("merged".to_string())
            } else if r.model.provider == ProviderId::OpenAi {
                Reply::Fail("HTTP 500: boom".to_string())
            } else {
                Reply::Text("fine".to_string())
            }
        }));
        let (graph, root) = MockGraph::with_root("q");
        let use_case = AutonomousCouncilUseCase::new(gateway, two_providers(), graph.clone());

        let plan = use_case.start(AutonomousInput::new(&root, 1)).await.unwrap();

        let failed = plan.branches.iter().find(|b| b.provider_id == ProviderId::OpenAi).unwrap();
        assert_eq!(failed.status, RunStatus::Error);
        assert_eq!(failed.error.as_deref(), Some("HTTP 500: boom"));
        let node = graph.snapshot().node(&failed.node_id).cloned().unwrap();
        assert!(node.has_error());

        let sibling = plan.branches.iter().find(|b| b.provider_id == ProviderId::Anthropic).unwrap();
        assert_eq!(sibling.status, RunStatus::Done);
        // Merge falls back to the first successful branch's model
        assert_eq!(plan.merges[0].model_id, "claude-3-5-sonnet-20241022");
        assert_eq!(plan.merges[0].status, RunStatus::Done);
        assert_eq!(plan.error_count(), 1);
    }

    #[tokio::test]
    async fn test_statuses_are_terminal_with_timestamps() {
        let gateway = Arc::new(MockGateway::new(scripted(TWO_BRANCH_PLAN)));
        let (graph, root) = MockGraph::with_root("q");
        let logger = Arc::new(RecordingLogger::default());
        let use_case =
            AutonomousCouncilUseCase::new(gateway, two_providers(), graph).with_logger(logger.clone());

        let plan = use_case.start(AutonomousInput::new(&root, 2)).await.unwrap();

        assert!(plan.is_settled());
        for branch in &plan.branches {
            let started = branch.started_at.unwrap();
            let finished = branch.finished_at.unwrap();
            assert!(started <= finished);
        }
        let events = logger.0.lock().unwrap();
        assert_eq!(events.iter().filter(|e| **e == "wave_planned").count(), 2);
        assert_eq!(events.last(), Some(&"run_completed"));
    }

    // ==================== Cancellation ====================

    #[tokio::test]
    async fn test_abort_during_merge_stops_before_next_wave() {
        let gateway = Arc::new(MockGateway::new(|r| {
            if is_planner(r) {
                Reply::Text(TWO_BRANCH_PLAN.to_string())
            } else if is_merge(r) {
                Reply::Late(150)
            } else {
                Reply::Text("branch".to_string())
            }
        }));
        let (graph, root) = MockGraph::with_root("q");
        let notifier = Arc::new(RecordingNotifier::default());
        let logger = Arc::new(RecordingLogger::default());
        let use_case = Arc::new(
            AutonomousCouncilUseCase::new(Arc::clone(&gateway), two_providers(), graph.clone())
                .with_notifier(notifier.clone())
                .with_logger(logger.clone()),
        );

        let runner = Arc::clone(&use_case);
        let handle = tokio::spawn(async move { runner.start(AutonomousInput::new(&root, 3)).await });

        let merge_running = |plan: &Option<WavePlan>| {
            plan.as_ref()
                .is_some_and(|p| p.merges.first().is_some_and(|m| m.status == RunStatus::Running))
        };
        for _ in 0..200 {
            if merge_running(&use_case.plan()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(merge_running(&use_case.plan()));
        assert!(use_case.abort());
        let at_abort = graph.snapshot();

        let err = handle.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());

        let plan = use_case.plan().unwrap();
        assert_eq!(plan.wave_count, 1);
        assert!(plan.branches.iter().all(|b| b.status == RunStatus::Done));
        assert_eq!(plan.merges[0].status, RunStatus::Running);
        assert_eq!(gateway.planner_calls(), 1);
        assert!(notifier.toasts.lock().unwrap().is_empty());
        assert_eq!(logger.0.lock().unwrap().last(), Some(&"run_aborted"));

        // The merge reply lands after the abort and must be dropped
        tokio::time::sleep(Duration::from_millis(300)).await;
        let after = graph.snapshot();
        assert!(after.node(&plan.merges[0].output_node_id).unwrap().response.is_none());
        assert_eq!(after, at_abort);
    }

    #[tokio::test]
    async fn test_switching_chat_cancels_and_isolates_plans() {
        let gateway = Arc::new(MockGateway::new(scripted(
            r#"{"branches":[{"providerId":"openai","modelId":"gpt-4o","prompt":"x"}],"continue":false}"#,
        )));
        let (graph, root) = MockGraph::with_root("q");
        let use_case = AutonomousCouncilUseCase::new(gateway, two_providers(), graph);

        use_case.set_active_chat("chat-a");
        let plan_a = use_case.start(AutonomousInput::new(&root, 1)).await.unwrap();

        assert_eq!(use_case.set_active_chat("chat-b"), None);
        assert_eq!(use_case.plan(), None);
        assert_eq!(use_case.set_active_chat("chat-a"), Some(plan_a));
    }
}
