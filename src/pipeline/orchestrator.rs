use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use super::rag::KnowledgeRetriever;
use super::stages::{
    analyze_omissions, detect_risks, extract_entities, resolve_temporal, summarize_handoff,
    StageEnv,
};
use super::structuring::LlmClient;
use super::PipelineError;
use crate::config::PipelineSettings;
use crate::models::{AggregateResult, ExtractedRecord, HandoffContext, RiskRecord, TemporalRecord};

/// Drives the five stages for one transcript:
/// extract → temporal → (risk ∥ omissions) → summarize.
///
/// Cheap to clone; clones share the generator, retriever and settings.
#[derive(Clone)]
pub struct HandoffPipeline {
    env: Arc<StageEnv>,
    timeout: Duration,
}

/// A spawned stage. Dropping it aborts the task, so a timed-out run leaves
/// nothing running behind it.
struct StageTask<T> {
    stage: &'static str,
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> StageTask<T> {
    fn spawn<F>(stage: &'static str, future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            stage,
            handle: tokio::spawn(future.in_current_span()),
        }
    }

    /// A stage never returns an error, so a join failure is a defect.
    async fn join(mut self) -> Result<T, PipelineError> {
        match (&mut self.handle).await {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!(stage = self.stage, panic = e.is_panic(), error = %e, "Stage task failed");
                Err(PipelineError::Processing(format!("{} stage failed: {e}", self.stage)))
            }
        }
    }
}

impl<T> Drop for StageTask<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn validate_transcript(transcript: &str) -> Result<Arc<str>, PipelineError> {
    let trimmed = transcript.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::InvalidInput(
            "Transcript is empty".into(),
        ));
    }
    Ok(Arc::from(trimmed))
}

impl HandoffPipeline {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        retriever: Arc<KnowledgeRetriever>,
        settings: &PipelineSettings,
    ) -> Self {
        Self {
            env: Arc::new(StageEnv {
                llm,
                retriever,
                structured: settings.structured_knobs(),
                narrative: settings.narrative_knobs(),
                retry: settings.retry,
                retrieval_top_k: settings.retrieval_top_k,
            }),
            timeout: settings.pipeline_timeout,
        }
    }

    /// Run all five stages and assemble the aggregate.
    ///
    /// Returns either a complete result or one error; never a partial result.
    pub async fn process(
        &self,
        transcript: &str,
        ctx: &HandoffContext,
    ) -> Result<AggregateResult, PipelineError> {
        let transcript = validate_transcript(transcript)?;
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("handoff", %run_id);

        tracing::info!(
            parent: &span,
            handoff_time = %ctx.handoff_time,
            transcript_len = transcript.len(),
            has_context = ctx.patient_context.is_some(),
            "Handoff pipeline started"
        );

        let run = self.run_all(transcript, Arc::new(ctx.clone()));
        self.bounded(run).instrument(span).await
    }

    /// Extract → temporal → risk only. No omissions, no summary.
    pub async fn quick_risk(
        &self,
        transcript: &str,
        ctx: &HandoffContext,
    ) -> Result<RiskRecord, PipelineError> {
        let transcript = validate_transcript(transcript)?;
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("quick_risk", %run_id);

        let run = self.run_risk_only(transcript, Arc::new(ctx.clone()));
        self.bounded(run).instrument(span).await
    }

    async fn bounded<T>(
        &self,
        run: impl Future<Output = Result<T, PipelineError>>,
    ) -> Result<T, PipelineError> {
        match tokio::time::timeout(self.timeout, run).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(timeout_ms = self.timeout.as_millis() as u64, "Pipeline timed out");
                Err(PipelineError::Timeout(self.timeout))
            }
        }
    }

    async fn run_all(
        &self,
        transcript: Arc<str>,
        ctx: Arc<HandoffContext>,
    ) -> Result<AggregateResult, PipelineError> {
        let start = Instant::now();

        let (extracted, temporal) = self.phase_one(&transcript, &ctx).await?;

        tracing::info!(phase = 2, "Risk and omissions running in parallel");
        let risk_task = self.spawn_risk(&extracted, &temporal, &ctx);
        let omission_task = {
            let env = Arc::clone(&self.env);
            let transcript = Arc::clone(&transcript);
            let extracted = extracted.clone();
            let ctx = Arc::clone(&ctx);
            StageTask::spawn("omissions", async move {
                analyze_omissions(&env, &transcript, &extracted, &ctx).await
            })
        };
        let (risks, omissions) = tokio::join!(risk_task.join(), omission_task.join());
        let mut risks = risks?;
        let omissions = omissions?;
        risks.recompute_overall();

        tracing::info!(phase = 3, "Summarizing");
        let handoff_summary = {
            let env = Arc::clone(&self.env);
            let (e, t, r, o) = (extracted.clone(), temporal.clone(), risks.clone(), omissions.clone());
            StageTask::spawn("summarize", async move {
                summarize_handoff(&env, &e, &t, &r, &o).await
            })
            .join()
            .await?
        };

        let processing_time_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            overall_risk = %risks.overall_risk,
            risk_score = risks.risk_score,
            omissions = omissions.omissions.len(),
            ms = processing_time_ms,
            "Handoff pipeline complete"
        );

        Ok(AggregateResult {
            extracted,
            temporal,
            risks,
            omissions,
            handoff_summary,
            processing_time_ms,
        })
    }

    async fn run_risk_only(
        &self,
        transcript: Arc<str>,
        ctx: Arc<HandoffContext>,
    ) -> Result<RiskRecord, PipelineError> {
        let (extracted, temporal) = self.phase_one(&transcript, &ctx).await?;

        let mut risks = self.spawn_risk(&extracted, &temporal, &ctx).join().await?;
        risks.recompute_overall();

        tracing::info!(
            overall_risk = %risks.overall_risk,
            risk_score = risks.risk_score,
            "Quick risk check complete"
        );
        Ok(risks)
    }

    async fn phase_one(
        &self,
        transcript: &Arc<str>,
        ctx: &Arc<HandoffContext>,
    ) -> Result<(ExtractedRecord, TemporalRecord), PipelineError> {
        tracing::info!(phase = 1, "Extracting entities");
        let extracted = {
            let env = Arc::clone(&self.env);
            let transcript = Arc::clone(transcript);
            StageTask::spawn("extract", async move { extract_entities(&env, &transcript).await })
                .join()
                .await?
        };

        tracing::info!(phase = 1, "Resolving time references");
        let temporal = {
            let env = Arc::clone(&self.env);
            let transcript = Arc::clone(transcript);
            let extracted = extracted.clone();
            let ctx = Arc::clone(ctx);
            StageTask::spawn("temporal", async move {
                resolve_temporal(&env, &transcript, &extracted, &ctx).await
            })
            .join()
            .await?
        };

        Ok((extracted, temporal))
    }

    fn spawn_risk(
        &self,
        extracted: &ExtractedRecord,
        temporal: &TemporalRecord,
        ctx: &Arc<HandoffContext>,
    ) -> StageTask<RiskRecord> {
        let env = Arc::clone(&self.env);
        let (extracted, temporal) = (extracted.clone(), temporal.clone());
        let ctx = Arc::clone(ctx);
        StageTask::spawn("risk", async move {
            detect_risks(&env, &extracted, &temporal, &ctx).await
        })
    }
}
