//! Run Council use case
//!
//! Orchestrates the three-stage council flow: divergence, convergence,
//! synthesis. Stages run strictly in sequence; inside a stage every query
//! is dispatched before any is awaited, and the stage only completes once
//! all of them have settled.

use crate::ports::llm_gateway::{LlmGateway, QueryRequest, QueryResponse};
use crate::ports::progress::{CouncilProgressNotifier, NoProgress};
use crate::ports::run_logger::{NoRunLogger, RunEvent, RunLogger};
use crate::use_cases::shared::{JoinNext, is_cancelled, join_next_or_cancel};
use chrono::Utc;
use council_domain::council::{aggregate, derive_confidence, extract_confidence, parse_evaluation};
use council_domain::{
    CouncilDefinition, CouncilProgress, CouncilResult, CouncilStage, DomainError, EvaluatorResult,
    ModelRef, PromptTemplate, Stage1Response, Stage1Result, Stage2Result, Stage3Result,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Evaluators always run at this temperature
pub const EVALUATION_TEMPERATURE: f32 = 0.3;

/// The chairman always runs at this temperature
pub const SYNTHESIS_TEMPERATURE: f32 = 0.5;

/// Errors that can occur during council execution
#[derive(Error, Debug)]
pub enum RunCouncilError {
    #[error("Invalid council: {0}")]
    InvalidCouncil(#[from] DomainError),

    #[error("Council run cancelled")]
    Cancelled,
}

impl RunCouncilError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunCouncilError::Cancelled)
    }
}

/// Input for the RunCouncil use case
#[derive(Debug, Clone)]
pub struct RunCouncilInput {
    pub council: CouncilDefinition,
    pub prompt: String,
}

impl RunCouncilInput {
    pub fn new(council: CouncilDefinition, prompt: impl Into<String>) -> Self {
        Self {
            council,
            prompt: prompt.into(),
        }
    }
}

/// Use case for running one council deliberation
pub struct RunCouncilUseCase<G: LlmGateway + 'static> {
    gateway: Arc<G>,
    logger: Arc<dyn RunLogger>,
    cancellation_token: Option<CancellationToken>,
}

impl<G: LlmGateway + 'static> RunCouncilUseCase<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            logger: Arc::new(NoRunLogger),
            cancellation_token: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn RunLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Execute the use case with default (no-op) progress
    pub async fn execute(&self, input: RunCouncilInput) -> Result<CouncilResult, RunCouncilError> {
        self.execute_with_progress(input, &NoProgress).await
    }

    /// Execute the use case with progress callbacks
    pub async fn execute_with_progress(
        &self,
        input: RunCouncilInput,
        progress: &dyn CouncilProgressNotifier,
    ) -> Result<CouncilResult, RunCouncilError> {
        input.council.validate()?;
        let council = &input.council;
        let started_at = Utc::now();

        info!(
            "Starting council '{}' with {} members",
            council.id,
            council.members.len()
        );

        self.check_cancelled()?;
        let stage1 = self.stage_divergence(&input, progress).await?;

        self.check_cancelled()?;
        let stage2 = self.stage_convergence(&input, &stage1, progress).await?;

        self.check_cancelled()?;
        let stage3 = self.stage_synthesis(&input, &stage1, &stage2, progress).await;

        let result = CouncilResult::new(
            council.id.clone(),
            input.prompt.clone(),
            stage1,
            stage2,
            stage3,
            started_at,
            Utc::now(),
        );

        info!(
            "Council '{}' finished in {}ms (cost ${:.4})",
            council.id, result.total_latency_ms, result.total_cost
        );
        self.logger.log(RunEvent::new(
            "council_completed",
            json!({
                "id": result.id,
                "council_id": result.council_id,
                "responses": result.stage1.responses.len(),
                "ranking": result.stage2.aggregated_ranking,
                "agreement_score": result.stage2.agreement_score,
                "confidence": result.stage3.confidence,
                "total_cost": result.total_cost,
                "total_latency_ms": result.total_latency_ms,
            }),
        ));

        Ok(result)
    }

    fn check_cancelled(&self) -> Result<(), RunCouncilError> {
        if is_cancelled(self.cancellation_token.as_ref()) {
            return Err(RunCouncilError::Cancelled);
        }
        Ok(())
    }

    /// Fan out `requests` and collect responses in request order.
    ///
    /// Reports progress once per completion. A panicked task becomes an
    /// error response in its own slot.
    async fn fan_out(
        &self,
        stage: CouncilStage,
        requests: Vec<QueryRequest>,
        progress: &dyn CouncilProgressNotifier,
    ) -> Result<Vec<QueryResponse>, RunCouncilError> {
        let total = requests.len();
        progress.on_stage_start(stage, total);

        let models: Vec<ModelRef> = requests.iter().map(|r| r.model.clone()).collect();
        let mut join_set = JoinSet::new();

        for (index, request) in requests.into_iter().enumerate() {
            let gateway = Arc::clone(&self.gateway);
            join_set.spawn(async move { (index, gateway.query(request).await) });
        }

        let mut slots: Vec<Option<QueryResponse>> = vec![None; total];
        let mut completed = 0;

        loop {
            let result = match join_next_or_cancel(&mut join_set, self.cancellation_token.as_ref()).await {
                JoinNext::Ready(result) => result,
                JoinNext::Exhausted => break,
                JoinNext::Cancelled => return Err(RunCouncilError::Cancelled),
            };

            match result {
                Ok((index, response)) => {
                    completed += 1;
                    let message = match response.error_message() {
                        Some(error) => {
                            warn!("Model {} failed: {}", response.model, error);
                            format!("{} failed", response.model)
                        }
                        None => {
                            debug!("Model {} responded in {}ms", response.model, response.latency_ms);
                            format!("{} responded", response.model)
                        }
                    };
                    progress.on_progress(&CouncilProgress::new(stage, completed, total, message));
                    slots[index] = Some(response);
                }
                Err(e) => {
                    warn!("Task join error: {}", e);
                }
            }
        }

        progress.on_stage_complete(stage);

        Ok(slots
            .into_iter()
            .zip(models)
            .map(|(slot, model)| {
                slot.unwrap_or_else(|| QueryResponse::failure(&model, "task did not complete", 0))
            })
            .collect())
    }

    /// Stage 1: every member answers the prompt in parallel
    async fn stage_divergence(
        &self,
        input: &RunCouncilInput,
        progress: &dyn CouncilProgressNotifier,
    ) -> Result<Stage1Result, RunCouncilError> {
        info!("{}", CouncilStage::Divergence);
        let council = &input.council;

        let requests = council
            .members
            .iter()
            .map(|member| {
                QueryRequest::new(member.model.clone())
                    .with_optional_system(PromptTemplate::member_system(member.role.as_deref()))
                    .with_user(input.prompt.clone())
                    .with_optional_temperature(council.temperature)
                    .with_max_tokens(council.max_tokens)
            })
            .collect();

        let started = Instant::now();
        let responses = self.fan_out(CouncilStage::Divergence, requests, progress).await?;
        let elapsed = started.elapsed().as_millis() as u64;

        let responses = responses
            .into_iter()
            .map(|r| Stage1Response {
                error: r.error_message(),
                model_id: r.model,
                provider: r.provider,
                content: r.content,
                latency_ms: r.latency_ms,
                cost: r.usage.cost,
            })
            .collect();

        Ok(Stage1Result::new(responses, elapsed))
    }

    /// Stage 2: evaluators rank the labeled responses, then aggregate
    async fn stage_convergence(
        &self,
        input: &RunCouncilInput,
        stage1: &Stage1Result,
        progress: &dyn CouncilProgressNotifier,
    ) -> Result<Stage2Result, RunCouncilError> {
        info!("{}", CouncilStage::Convergence);
        let council = &input.council;
        let num_responses = stage1.responses.len();

        let prompt = PromptTemplate::evaluation_prompt(
            &input.prompt,
            stage1,
            council.anonymize_responses,
            council.evaluation_strategy,
        );

        let requests = council
            .evaluator_models()
            .into_iter()
            .map(|model| {
                QueryRequest::new(model)
                    .with_system(PromptTemplate::evaluation_system())
                    .with_user(prompt.clone())
                    .with_temperature(EVALUATION_TEMPERATURE)
                    .with_max_tokens(council.max_tokens)
            })
            .collect();

        let started = Instant::now();
        let responses = self.fan_out(CouncilStage::Convergence, requests, progress).await?;
        let elapsed = started.elapsed().as_millis() as u64;

        let evaluations: Vec<EvaluatorResult> = responses
            .into_iter()
            .map(|r| {
                // A failed evaluator parses as empty text: every slot gets the default score
                let text = if r.is_error() { "" } else { r.content.as_str() };
                EvaluatorResult {
                    rankings: parse_evaluation(text, num_responses),
                    error: r.error_message(),
                    evaluator_model_id: r.model,
                    latency_ms: r.latency_ms,
                    cost: r.usage.cost,
                }
            })
            .collect();

        let aggregation = aggregate(&evaluations, num_responses);
        debug!(
            "Aggregated ranking {:?}, agreement {:.1}",
            aggregation.ranking, aggregation.agreement_score
        );

        let total_cost = evaluations.iter().map(|e| e.cost).sum();
        Ok(Stage2Result {
            evaluations,
            aggregated_ranking: aggregation.ranking,
            scores: aggregation.scores,
            agreement_score: aggregation.agreement_score,
            total_latency_ms: elapsed,
            total_cost,
        })
    }

    /// Stage 3: the chairman synthesizes the ranked responses.
    ///
    /// A failed chairman call does not fail the run: the top-ranked
    /// response stands in and the error is recorded.
    async fn stage_synthesis(
        &self,
        input: &RunCouncilInput,
        stage1: &Stage1Result,
        stage2: &Stage2Result,
        progress: &dyn CouncilProgressNotifier,
    ) -> Stage3Result {
        info!("{}", CouncilStage::Synthesis);
        let council = &input.council;
        progress.on_stage_start(CouncilStage::Synthesis, 1);

        let request = QueryRequest::new(council.chairman.model.clone())
            .with_system(PromptTemplate::synthesis_system())
            .with_user(PromptTemplate::synthesis_prompt(
                &input.prompt,
                stage1,
                stage2,
                council.chairman.strategy,
            ))
            .with_temperature(SYNTHESIS_TEMPERATURE)
            .with_max_tokens(council.max_tokens);

        let response = self.gateway.query(request).await;
        let reasoning =
            PromptTemplate::synthesis_reasoning(stage1.responses.len(), stage2.agreement_score);

        let result = match response.error_message() {
            None => Stage3Result {
                confidence: extract_confidence(&response.content)
                    .unwrap_or_else(|| derive_confidence(stage2.agreement_score)),
                final_response: response.content,
                reasoning,
                latency_ms: response.latency_ms,
                cost: response.usage.cost,
                error: None,
            },
            Some(error) => {
                warn!("Chairman {} failed: {}", council.chairman.model, error);
                let fallback = stage2
                    .aggregated_ranking
                    .iter()
                    .filter_map(|&i| stage1.responses.get(i))
                    .find(|r| r.is_success())
                    .map(|r| r.content.clone())
                    .unwrap_or_default();
                Stage3Result {
                    final_response: fallback,
                    confidence: derive_confidence(stage2.agreement_score),
                    reasoning,
                    latency_ms: response.latency_ms,
                    cost: response.usage.cost,
                    error: Some(error),
                }
            }
        };

        let message = if result.error.is_some() {
            format!("{} failed", council.chairman.model.model_id)
        } else {
            format!("{} synthesized", council.chairman.model.model_id)
        };
        progress.on_progress(&CouncilProgress::new(CouncilStage::Synthesis, 1, 1, message));
        progress.on_stage_complete(CouncilStage::Synthesis);

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::llm_gateway::{GatewayError, MultiQueryRequest, MultiQueryResponse, TokenUsage};
    use async_trait::async_trait;
    use council_domain::{CouncilMember, ProviderId};
    use std::sync::Mutex;

    // ==================== Test Mocks ====================

    type Script = Box<dyn Fn(&QueryRequest) -> Result<String, String> + Send + Sync>;

    /// Gateway answering from a script; every call costs 0.01
    struct MockGateway {
        script: Script,
        calls: Mutex<Vec<QueryRequest>>,
    }

    impl MockGateway {
        fn new(script: impl Fn(&QueryRequest) -> Result<String, String> + Send + Sync + 'static) -> Self {
            Self {
                script: Box::new(script),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls_at(&self, temperature: Option<f32>) -> Vec<QueryRequest> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.temperature == temperature)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl LlmGateway for MockGateway {
        async fn query(&self, request: QueryRequest) -> QueryResponse {
            self.calls.lock().unwrap().push(request.clone());
            match (self.script)(&request) {
                Ok(content) => {
                    let usage = TokenUsage {
                        cost: 0.01,
                        ..TokenUsage::default()
                    };
                    QueryResponse::success(&request.model, content, usage, 5)
                }
                Err(error) => QueryResponse::failure(&request.model, error, 5),
            }
        }

        async fn query_multiple(&self, _request: MultiQueryRequest) -> Result<MultiQueryResponse, GatewayError> {
            Err(GatewayError::Other("not scripted".to_string()))
        }

        fn is_configured(&self, _provider: ProviderId) -> bool {
            true
        }

        fn available_models(&self) -> Vec<ModelRef> {
            vec![]
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<(CouncilStage, u8)>>,
    }

    impl CouncilProgressNotifier for RecordingProgress {
        fn on_stage_start(&self, _stage: CouncilStage, _total_tasks: usize) {}

        fn on_progress(&self, progress: &CouncilProgress) {
            self.events.lock().unwrap().push((progress.stage, progress.progress));
        }

        fn on_stage_complete(&self, _stage: CouncilStage) {}
    }

    fn council() -> CouncilDefinition {
        CouncilDefinition::new(
            "test",
            "Test Council",
            vec![
                CouncilMember::new(ModelRef::new(ProviderId::OpenAi, "gpt-4o")),
                CouncilMember::new(ModelRef::new(ProviderId::Anthropic, "claude-3-5-sonnet-20241022")),
                CouncilMember::new(ModelRef::new(ProviderId::Google, "gemini-1.5-pro")),
            ],
            ModelRef::new(ProviderId::Anthropic, "claude-3-5-sonnet-20241022"),
        )
    }

    const CLEAN_RANKING: &str =
        "Thoughts...\nRANKING:\n1. Response A\n2. Response B\n3. Response C\nSCORES:\nA: 90\nB: 70\nC: 50";

    fn is_evaluator(r: &QueryRequest) -> bool {
        r.temperature == Some(EVALUATION_TEMPERATURE)
    }

    fn is_chairman(r: &QueryRequest) -> bool {
        r.temperature == Some(SYNTHESIS_TEMPERATURE)
    }

    // ==================== Full Flow ====================

    #[tokio::test]
    async fn test_unanimous_council() {
        let gateway = Arc::new(MockGateway::new(|r| {
            if is_evaluator(r) {
                Ok(CLEAN_RANKING.to_string())
            } else if is_chairman(r) {
                Ok("Final answer.\nConfidence: 85".to_string())
            } else {
                Ok(format!("answer from {}", r.model.model_id))
            }
        }));
        let use_case = RunCouncilUseCase::new(Arc::clone(&gateway));

        let result = use_case
            .execute(RunCouncilInput::new(council(), "What is Rust?"))
            .await
            .unwrap();

        assert_eq!(result.stage1.responses.len(), 3);
        assert_eq!(result.stage1.responses[1].content, "answer from claude-3-5-sonnet-20241022");
        assert_eq!(result.stage2.evaluations.len(), 3);
        assert_eq!(result.stage2.aggregated_ranking, vec![0, 1, 2]);
        assert_eq!(result.stage2.scores, vec![90.0, 70.0, 50.0]);
        assert_eq!(result.stage2.agreement_score, 100.0);
        assert_eq!(result.stage3.final_response, "Final answer.\nConfidence: 85");
        assert_eq!(result.stage3.confidence, 85);
        assert_eq!(
            result.stage3.reasoning,
            "Synthesized from 3 responses with 100% evaluator agreement."
        );
        assert_eq!(result.winner().unwrap().model_id, "gpt-4o");
    }

    #[tokio::test]
    async fn test_cost_additivity() {
        let gateway = Arc::new(MockGateway::new(|r| {
            if is_evaluator(r) {
                Ok(CLEAN_RANKING.to_string())
            } else {
                Ok("ok".to_string())
            }
        }));
        let result = RunCouncilUseCase::new(gateway)
            .execute(RunCouncilInput::new(council(), "q"))
            .await
            .unwrap();

        let member_sum: f64 = result.stage1.responses.iter().map(|r| r.cost).sum();
        assert_eq!(result.stage1.total_cost, member_sum);
        assert_eq!(
            result.total_cost,
            result.stage1.total_cost + result.stage2.total_cost + result.stage3.cost
        );
        assert!((result.total_cost - 0.07).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_temperatures_and_overrides() {
        let gateway = Arc::new(MockGateway::new(|r| {
            if is_evaluator(r) {
                Ok(CLEAN_RANKING.to_string())
            } else {
                Ok("ok".to_string())
            }
        }));
        let definition = council().with_temperature(1.2).with_max_tokens(256);
        RunCouncilUseCase::new(Arc::clone(&gateway))
            .execute(RunCouncilInput::new(definition, "q"))
            .await
            .unwrap();

        let members = gateway.calls_at(Some(1.2));
        assert_eq!(members.len(), 3);
        assert!(members.iter().all(|r| r.max_tokens == Some(256)));
        assert_eq!(gateway.calls_at(Some(EVALUATION_TEMPERATURE)).len(), 3);
        let chairman = gateway.calls_at(Some(SYNTHESIS_TEMPERATURE));
        assert_eq!(chairman.len(), 1);
        assert_eq!(chairman[0].model.model_id, "claude-3-5-sonnet-20241022");
    }

    // ==================== Partial Failures ====================

    #[tokio::test]
    async fn test_failed_member_keeps_its_slot_and_is_evaluated() {
        let gateway = Arc::new(MockGateway::new(|r| {
            if is_evaluator(r) {
                assert!(r.messages[1].content.contains("[no response: HTTP 500]"));
                Ok("RANKING:\n1. Response B\n2. Response A\n3. Response C".to_string())
            } else if is_chairman(r) {
                Ok("final".to_string())
            } else if r.model.provider == ProviderId::OpenAi {
                Err("HTTP 500".to_string())
            } else {
                Ok("fine".to_string())
            }
        }));
        let result = RunCouncilUseCase::new(gateway)
            .execute(RunCouncilInput::new(council(), "q"))
            .await
            .unwrap();

        let failed = &result.stage1.responses[0];
        assert_eq!(failed.error.as_deref(), Some("HTTP 500"));
        assert_eq!(failed.content, "");
        assert_eq!(result.stage2.aggregated_ranking, vec![1, 0, 2]);
        assert_eq!(result.stage2.scores.len(), 3);
    }

    #[tokio::test]
    async fn test_evaluator_without_ranking_gets_defaults() {
        let gateway = Arc::new(MockGateway::new(|r| {
            if is_evaluator(r) {
                Ok("They are all decent answers.".to_string())
            } else {
                Ok("ok".to_string())
            }
        }));
        let result = RunCouncilUseCase::new(gateway)
            .execute(RunCouncilInput::new(council(), "q"))
            .await
            .unwrap();

        for evaluation in &result.stage2.evaluations {
            assert_eq!(evaluation.ordering(), vec![0, 1, 2]);
            assert!(evaluation.rankings.iter().all(|r| r.score == 50));
            assert!(evaluation.rankings.iter().all(|r| r.critique == "No explicit ranking provided"));
        }
        assert_eq!(result.stage2.aggregated_ranking, vec![0, 1, 2]);
        // No explicit confidence: derived from agreement (100 * 0.9 + 10)
        assert_eq!(result.stage3.confidence, 100);
    }

    #[tokio::test]
    async fn test_failed_evaluator_still_contributes() {
        let gateway = Arc::new(MockGateway::new(|r| {
            if is_evaluator(r) && r.model.provider == ProviderId::Google {
                Err("timeout".to_string())
            } else if is_evaluator(r) {
                Ok(CLEAN_RANKING.to_string())
            } else {
                Ok("ok".to_string())
            }
        }));
        let result = RunCouncilUseCase::new(gateway)
            .execute(RunCouncilInput::new(council(), "q"))
            .await
            .unwrap();

        let failed = &result.stage2.evaluations[2];
        assert_eq!(failed.error.as_deref(), Some("timeout"));
        assert_eq!(failed.rankings.len(), 3);
        // A,B,C from both successes and the default order: full agreement
        assert_eq!(result.stage2.agreement_score, 100.0);
        assert_eq!(result.stage2.scores, vec![(90.0 + 90.0 + 50.0) / 3.0, (70.0 + 70.0 + 50.0) / 3.0, 50.0]);
    }

    #[tokio::test]
    async fn test_chairman_failure_falls_back_to_winner() {
        let gateway = Arc::new(MockGateway::new(|r| {
            if is_evaluator(r) {
                Ok("RANKING:\n1. Response C\n2. Response A\n3. Response B".to_string())
            } else if is_chairman(r) {
                Err("HTTP 529: overloaded".to_string())
            } else {
                Ok(format!("answer from {}", r.model.model_id))
            }
        }));
        let result = RunCouncilUseCase::new(gateway)
            .execute(RunCouncilInput::new(council(), "q"))
            .await
            .unwrap();

        assert_eq!(result.stage3.error.as_deref(), Some("HTTP 529: overloaded"));
        assert_eq!(result.stage3.final_response, "answer from gemini-1.5-pro");
    }

    #[tokio::test]
    async fn test_explicit_evaluators() {
        let gateway = Arc::new(MockGateway::new(|r| {
            if is_evaluator(r) {
                Ok(CLEAN_RANKING.to_string())
            } else {
                Ok("ok".to_string())
            }
        }));
        let definition = council().with_evaluators(vec![ModelRef::new(ProviderId::Groq, "llama-3.3-70b-versatile")]);
        let result = RunCouncilUseCase::new(Arc::clone(&gateway))
            .execute(RunCouncilInput::new(definition, "q"))
            .await
            .unwrap();

        assert_eq!(result.stage2.evaluations.len(), 1);
        assert_eq!(result.stage2.evaluations[0].evaluator_model_id, "llama-3.3-70b-versatile");
        assert_eq!(gateway.calls_at(Some(EVALUATION_TEMPERATURE)).len(), 1);
    }

    #[tokio::test]
    async fn test_named_responses_when_not_anonymized() {
        let gateway = Arc::new(MockGateway::new(|r| {
            if is_evaluator(r) {
                assert!(r.messages[1].content.contains("Response A (gpt-4o)"));
                Ok(CLEAN_RANKING.to_string())
            } else {
                Ok("ok".to_string())
            }
        }));
        RunCouncilUseCase::new(gateway)
            .execute(RunCouncilInput::new(council().without_anonymization(), "q"))
            .await
            .unwrap();
    }

    // ==================== Progress & Control ====================

    #[tokio::test]
    async fn test_progress_is_cumulative_per_stage() {
        let gateway = Arc::new(MockGateway::new(|r| {
            if is_evaluator(r) {
                Ok(CLEAN_RANKING.to_string())
            } else {
                Ok("ok".to_string())
            }
        }));
        let progress = RecordingProgress::default();
        RunCouncilUseCase::new(gateway)
            .execute_with_progress(RunCouncilInput::new(council(), "q"), &progress)
            .await
            .unwrap();

        let events = progress.events.lock().unwrap().clone();
        let stage1: Vec<u8> = events
            .iter()
            .filter(|(s, _)| *s == CouncilStage::Divergence)
            .map(|(_, p)| *p)
            .collect();
        assert_eq!(stage1, vec![33, 67, 100]);
        assert_eq!(events.last(), Some(&(CouncilStage::Synthesis, 100)));
    }

    #[tokio::test]
    async fn test_invalid_council_is_rejected() {
        let gateway = Arc::new(MockGateway::new(|_| Ok("ok".to_string())));
        let empty = CouncilDefinition::new("e", "Empty", vec![], ModelRef::from_model_id("gpt-4o"));
        let err = RunCouncilUseCase::new(Arc::clone(&gateway))
            .execute(RunCouncilInput::new(empty, "q"))
            .await
            .unwrap_err();

        assert!(matches!(err, RunCouncilError::InvalidCouncil(DomainError::NoMembers)));
        assert!(gateway.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let gateway = Arc::new(MockGateway::new(|_| Ok("ok".to_string())));
        let token = CancellationToken::new();
        token.cancel();

        let err = RunCouncilUseCase::new(Arc::clone(&gateway))
            .with_cancellation(token)
            .execute(RunCouncilInput::new(council(), "q"))
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(gateway.calls.lock().unwrap().is_empty());
    }
}
