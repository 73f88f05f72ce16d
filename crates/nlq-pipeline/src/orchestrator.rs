//! Pipeline orchestrator
//!
//! Drives one natural-language question through classification, SQL
//! generation (per strategy), validation, execution and formatting. Each
//! stage's failure mode is contained here: the caller always receives a
//! structurally complete [`PipelineResponse`], with `success == false` and
//! an `error_message` when anything went wrong, never a raw error.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use uuid::Uuid;

use nlq_agentic::LlmSqlGenerator;
use nlq_core::{
    ClassificationResult, FormattedResult, IntentClassifier, ResultFormatter,
    RuleBasedSqlGenerator, SqlGenerationResult, SqlValidationReport, SqlValidator,
};

use crate::error::PipelineError;
use crate::events::{EventSender, PipelineEvent, PipelineStage, PipelineStream, EVENT_CHANNEL_CAPACITY};
use crate::executor::{Row, SqlExecutor};
use crate::metrics::{MetricsEmitter, PipelineMetrics};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::strategy::GenerationStrategy;

/// Rows requested from the execution collaborator.
const ROW_LIMIT: usize = 100;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_PAGE_SIZE: usize = 20;

/// One pipeline invocation.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub query: String,
    pub strategy: GenerationStrategy,
    pub retry: RetryPolicy,
    /// Deadline for the generate-and-validate unit.
    pub timeout: Duration,
    pub page: usize,
    pub page_size: usize,
}

impl PipelineRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            strategy: GenerationStrategy::default(),
            retry: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_strategy(mut self, strategy: GenerationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }
}

/// Complete outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineResponse {
    pub request_id: Uuid,
    pub success: bool,
    pub classification: Option<ClassificationResult>,
    pub sql_result: SqlGenerationResult,
    pub validation: Option<SqlValidationReport>,
    pub rows: Vec<Row>,
    pub formatted: Option<FormattedResult>,
    pub error_message: Option<String>,
    pub metrics: PipelineMetrics,
}

/// The assembled pipeline service.
pub struct NlqPipeline {
    classifier: IntentClassifier,
    rule_generator: RuleBasedSqlGenerator,
    llm_generator: Option<Arc<LlmSqlGenerator>>,
    validator: SqlValidator,
    formatter: ResultFormatter,
    executor: Option<Arc<dyn SqlExecutor>>,
    metrics: Option<MetricsEmitter>,
}

impl NlqPipeline {
    /// Minimal pipeline: rule-based generation, no execution, no metrics.
    pub fn new() -> Self {
        Self {
            classifier: IntentClassifier::new(),
            rule_generator: RuleBasedSqlGenerator::new(),
            llm_generator: None,
            validator: SqlValidator::new(),
            formatter: ResultFormatter::new(),
            executor: None,
            metrics: None,
        }
    }

    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_llm_generator(mut self, generator: Arc<LlmSqlGenerator>) -> Self {
        self.llm_generator = Some(generator);
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn SqlExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_metrics(mut self, emitter: MetricsEmitter) -> Self {
        self.metrics = Some(emitter);
        self
    }

    /// Run a request to completion.
    pub async fn run(&self, request: PipelineRequest) -> PipelineResponse {
        self.run_with_events(request, EventSender::disabled()).await
    }

    /// Run a request in the background, returning a stream of progress
    /// events. Dropping the stream cancels the run.
    pub fn run_streaming(self: &Arc<Self>, request: PipelineRequest) -> PipelineStream {
        let (tx, rx) = tokio::sync::mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let pipeline = Arc::clone(self);
        let handle = tokio::spawn(async move {
            pipeline
                .run_with_events(request, EventSender::new(tx))
                .await
        });
        PipelineStream::new(rx, handle)
    }

    async fn run_with_events(
        &self,
        request: PipelineRequest,
        events: EventSender,
    ) -> PipelineResponse {
        let request_id = Uuid::new_v4();
        let started = Instant::now();
        tracing::info!(%request_id, strategy = %request.strategy, "pipeline run started");

        events.emit(PipelineEvent::StageStart {
            stage: PipelineStage::InputValidation,
        });
        let query = request.query.trim().to_string();
        if query.is_empty() {
            return self.fail(
                request_id,
                &request,
                started,
                0,
                None,
                None,
                "질문이 비어 있습니다".to_string(),
                &events,
            );
        }
        events.emit(PipelineEvent::StageEnd {
            stage: PipelineStage::InputValidation,
            duration_ms: started.elapsed().as_millis() as u64,
        });

        events.emit(PipelineEvent::StageStart {
            stage: PipelineStage::IntentParsing,
        });
        let stage_started = Instant::now();
        let classification = self.classifier.classify(&query);
        tracing::debug!(
            %request_id,
            query_type = %classification.query_type,
            confidence = classification.confidence,
            "query classified"
        );
        events.emit(PipelineEvent::StageEnd {
            stage: PipelineStage::IntentParsing,
            duration_ms: stage_started.elapsed().as_millis() as u64,
        });

        let work = self.generate_and_validate(&query, &classification, &request, &events);
        let (sql_result, validation, retry_count) =
            match tokio::time::timeout(request.timeout, work).await {
                Ok((Ok((sql_result, validation)), retry_count)) => {
                    (sql_result, validation, retry_count)
                }
                Ok((Err(e), retry_count)) => {
                    return self.fail(
                        request_id,
                        &request,
                        started,
                        retry_count,
                        Some(classification),
                        None,
                        e.to_string(),
                        &events,
                    );
                }
                Err(_) => {
                    let e = PipelineError::Timeout(request.timeout.as_millis() as u64);
                    return self.fail(
                        request_id,
                        &request,
                        started,
                        0,
                        Some(classification),
                        None,
                        e.to_string(),
                        &events,
                    );
                }
            };

        let rows = if validation.execution_allowed {
            match &self.executor {
                Some(executor) => {
                    events.emit(PipelineEvent::StageStart {
                        stage: PipelineStage::SqlExecution,
                    });
                    let stage_started = Instant::now();
                    let executed = executor
                        .execute(&sql_result.sql, &sql_result.parameters, ROW_LIMIT)
                        .await;
                    events.emit(PipelineEvent::StageEnd {
                        stage: PipelineStage::SqlExecution,
                        duration_ms: stage_started.elapsed().as_millis() as u64,
                    });
                    match executed {
                        Ok(rows) => rows,
                        Err(e) => {
                            let e = PipelineError::Execution(format!("{:#}", e));
                            return self.fail(
                                request_id,
                                &request,
                                started,
                                retry_count,
                                Some(classification),
                                Some((sql_result, validation)),
                                e.to_string(),
                                &events,
                            );
                        }
                    }
                }
                None => Vec::new(),
            }
        } else {
            Vec::new()
        };

        events.emit(PipelineEvent::StageStart {
            stage: PipelineStage::ResultFormatting,
        });
        let stage_started = Instant::now();
        let formatted = self
            .formatter
            .format(&rows, &query, request.page, request.page_size);
        events.emit(PipelineEvent::StageEnd {
            stage: PipelineStage::ResultFormatting,
            duration_ms: stage_started.elapsed().as_millis() as u64,
        });

        let metrics = self.record_metrics(
            request_id,
            &request,
            started,
            true,
            sql_result.generation_method,
            retry_count,
        );
        events.emit(PipelineEvent::Completed { success: true });
        tracing::info!(
            %request_id,
            duration_ms = metrics.duration_ms,
            method = %sql_result.generation_method,
            "pipeline run completed"
        );

        PipelineResponse {
            request_id,
            success: true,
            classification: Some(classification),
            sql_result,
            validation: Some(validation),
            rows,
            formatted: Some(formatted),
            error_message: None,
            metrics,
        }
    }

    /// Generate a SQL candidate per the request strategy, then validate it.
    ///
    /// Disallowed candidates are neutralized here so everything downstream
    /// only ever sees executable-or-placeholder SQL. The attempt count is
    /// reported alongside the result so even a failed run records how many
    /// retries it spent.
    async fn generate_and_validate(
        &self,
        query: &str,
        classification: &ClassificationResult,
        request: &PipelineRequest,
        events: &EventSender,
    ) -> (
        Result<(SqlGenerationResult, SqlValidationReport), PipelineError>,
        u32,
    ) {
        events.emit(PipelineEvent::StageStart {
            stage: PipelineStage::SqlGeneration,
        });
        let stage_started = Instant::now();
        let (generated, retry_count) = self
            .generate(query, classification, request, events)
            .await;
        let mut sql_result = match generated {
            Ok(result) => result,
            Err(e) => return (Err(e), retry_count),
        };
        events.emit(PipelineEvent::StageEnd {
            stage: PipelineStage::SqlGeneration,
            duration_ms: stage_started.elapsed().as_millis() as u64,
        });

        events.emit(PipelineEvent::StageStart {
            stage: PipelineStage::SqlValidation,
        });
        let stage_started = Instant::now();
        let validation = self
            .validator
            .validate(&sql_result.sql, Some(&sql_result.parameters));
        if !validation.execution_allowed {
            tracing::warn!(
                verdict = ?validation.verdict,
                "generated SQL failed validation, substituting placeholder"
            );
            sql_result.neutralize(&validation.digest());
        }
        events.emit(PipelineEvent::StageEnd {
            stage: PipelineStage::SqlValidation,
            duration_ms: stage_started.elapsed().as_millis() as u64,
        });

        (Ok((sql_result, validation)), retry_count)
    }

    async fn generate(
        &self,
        query: &str,
        classification: &ClassificationResult,
        request: &PipelineRequest,
        events: &EventSender,
    ) -> (Result<SqlGenerationResult, PipelineError>, u32) {
        match request.strategy {
            GenerationStrategy::RuleOnly => {
                let result = self
                    .rule_generator
                    .generate(classification)
                    .map_err(|e| PipelineError::Generation(e.to_string()));
                (result, 0)
            }
            GenerationStrategy::LlmOnly => {
                let generator = match self.require_llm(request.strategy) {
                    Ok(generator) => generator,
                    Err(e) => return (Err(e), 0),
                };
                let (result, attempts) = self
                    .llm_generate(generator, query, classification, &request.retry, events)
                    .await;
                let result =
                    result.map_err(|e| PipelineError::Generation(format!("{:#}", e)));
                (result, attempts.saturating_sub(1))
            }
            GenerationStrategy::LlmFirst => {
                let attempted = match &self.llm_generator {
                    Some(generator) => {
                        Some(
                            self.llm_generate(
                                generator,
                                query,
                                classification,
                                &request.retry,
                                events,
                            )
                            .await,
                        )
                    }
                    None => None,
                };
                match attempted {
                    Some((Ok(result), attempts)) => (Ok(result), attempts.saturating_sub(1)),
                    Some((Err(e), attempts)) => {
                        tracing::warn!(
                            error = %format!("{:#}", e),
                            attempts,
                            "LLM generation exhausted, falling back to rules"
                        );
                        let result = self
                            .rule_generator
                            .generate(classification)
                            .map_err(|e| PipelineError::Generation(e.to_string()));
                        (result, attempts.saturating_sub(1))
                    }
                    None => {
                        let result = self
                            .rule_generator
                            .generate(classification)
                            .map_err(|e| PipelineError::Generation(e.to_string()));
                        (result, 0)
                    }
                }
            }
            GenerationStrategy::Hybrid => {
                let generator = match self.require_llm(request.strategy) {
                    Ok(generator) => generator,
                    Err(e) => return (Err(e), 0),
                };
                let llm_branch =
                    self.llm_generate(generator, query, classification, &request.retry, events);
                let rule_branch = async {
                    self.rule_generator
                        .generate(classification)
                        .map_err(|e| PipelineError::Generation(e.to_string()))
                };
                let ((llm_result, attempts), rule_result) =
                    tokio::join!(llm_branch, rule_branch);
                let retry_count = attempts.saturating_sub(1);
                let rule_result = match rule_result {
                    Ok(result) => result,
                    Err(e) => return (Err(e), retry_count),
                };
                let mut chosen = match llm_result {
                    Ok(llm) if llm.confidence >= rule_result.confidence => llm,
                    Ok(_) => rule_result,
                    Err(e) => {
                        tracing::warn!(
                            error = %format!("{:#}", e),
                            "LLM branch failed, keeping rule-based candidate"
                        );
                        rule_result
                    }
                };
                chosen.generation_method = nlq_core::GenerationMethod::Hybrid;
                (Ok(chosen), retry_count)
            }
        }
    }

    async fn llm_generate(
        &self,
        generator: &Arc<LlmSqlGenerator>,
        query: &str,
        classification: &ClassificationResult,
        retry: &RetryPolicy,
        events: &EventSender,
    ) -> (Result<SqlGenerationResult, anyhow::Error>, u32) {
        retry_with_backoff(retry, || async {
            match events.token_channel() {
                Some((tx, forwarder)) => {
                    let result = generator
                        .generate_streaming(query, classification, tx)
                        .await;
                    // The sender was consumed above; join the forwarder so
                    // every token is published before later stage events.
                    let _ = forwarder.await;
                    result
                }
                None => generator.generate(query, classification).await,
            }
        })
        .await
    }

    fn require_llm(
        &self,
        strategy: GenerationStrategy,
    ) -> Result<&Arc<LlmSqlGenerator>, PipelineError> {
        self.llm_generator
            .as_ref()
            .ok_or_else(|| PipelineError::MissingGenerator(strategy.to_string()))
    }

    #[allow(clippy::too_many_arguments)]
    fn fail(
        &self,
        request_id: Uuid,
        request: &PipelineRequest,
        started: Instant,
        retry_count: u32,
        classification: Option<ClassificationResult>,
        generated: Option<(SqlGenerationResult, SqlValidationReport)>,
        message: String,
        events: &EventSender,
    ) -> PipelineResponse {
        events.emit(PipelineEvent::StageStart {
            stage: PipelineStage::ErrorHandling,
        });
        tracing::warn!(%request_id, error = %message, "pipeline run failed");
        let (sql_result, validation) = match generated {
            Some((sql_result, validation)) => (sql_result, Some(validation)),
            None => (SqlGenerationResult::placeholder(&message), None),
        };
        let metrics = self.record_metrics(
            request_id,
            request,
            started,
            false,
            sql_result.generation_method,
            retry_count,
        );
        events.emit(PipelineEvent::Failed {
            message: message.clone(),
        });
        PipelineResponse {
            request_id,
            success: false,
            classification,
            sql_result,
            validation,
            rows: Vec::new(),
            formatted: None,
            error_message: Some(message),
            metrics,
        }
    }

    fn record_metrics(
        &self,
        request_id: Uuid,
        request: &PipelineRequest,
        started: Instant,
        success: bool,
        generation_method: nlq_core::GenerationMethod,
        retry_count: u32,
    ) -> PipelineMetrics {
        let metrics = PipelineMetrics {
            request_id,
            strategy_used: request.strategy,
            duration_ms: started.elapsed().as_millis() as u64,
            success,
            generation_method,
            retry_count,
            timestamp: Utc::now(),
        };
        if let Some(emitter) = &self.metrics {
            emitter.emit(metrics.clone());
        }
        metrics
    }
}

impl Default for NlqPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience for tests and embedding callers that already hold rows.
impl PipelineResponse {
    /// Bind parameters of the final SQL candidate.
    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.sql_result.parameters
    }
}
