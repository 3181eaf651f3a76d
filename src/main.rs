use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use nurse_handoff::config::{self, PipelineSettings};
use nurse_handoff::models::{HandoffContext, DEFAULT_HANDOFF_TIME};
use nurse_handoff::pipeline::rag::{JsonFileLoader, KnowledgeRetriever};
use nurse_handoff::pipeline::structuring::{LlmClient, OllamaClient};
use nurse_handoff::HandoffPipeline;

#[derive(Parser)]
#[command(name = "nurse-handoff")]
#[command(about = "Turn a spoken nurse handoff transcript into a structured clinical handoff", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and print the aggregate as JSON
    Run {
        /// Transcript file, or `-` for stdin
        #[arg(long)]
        transcript: PathBuf,
        #[arg(long, default_value = DEFAULT_HANDOFF_TIME)]
        handoff_time: String,
        /// File holding previous-shift context
        #[arg(long)]
        context: Option<PathBuf>,
    },
    /// Run extract, temporal and risk only and print the risk record as JSON
    Risk {
        /// Transcript file, or `-` for stdin
        #[arg(long)]
        transcript: PathBuf,
        #[arg(long, default_value = DEFAULT_HANDOFF_TIME)]
        handoff_time: String,
    },
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read transcript from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Warn, without failing, when the configured models are not pulled.
async fn preflight(llm: &OllamaClient, settings: &PipelineSettings) {
    for model in [&settings.structured_model, &settings.narrative_model] {
        match llm.is_model_available(model).await {
            Ok(true) => tracing::debug!(model = %model, "Model available"),
            Ok(false) => tracing::warn!(
                model = %model,
                url = llm.base_url(),
                "Model not found on Ollama; run `ollama pull` first"
            ),
            Err(e) => tracing::warn!(error = %e, "Could not list Ollama models"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    nurse_handoff::init_tracing();

    let cli = Cli::parse();
    let settings = PipelineSettings::from_env();
    tracing::info!(
        version = config::APP_VERSION,
        ollama = %settings.ollama_url,
        knowledge = %settings.knowledge_path.display(),
        "{} starting",
        config::APP_NAME
    );

    let llm = Arc::new(
        OllamaClient::new(&settings.ollama_url, settings.request_timeout.as_secs())
            .context("failed to build Ollama client")?,
    );
    preflight(&llm, &settings).await;

    let retriever = Arc::new(KnowledgeRetriever::new(Arc::new(JsonFileLoader::new(
        settings.knowledge_path.clone(),
    ))));
    let pipeline = HandoffPipeline::new(llm, retriever, &settings);

    match cli.command {
        Commands::Run {
            transcript,
            handoff_time,
            context,
        } => {
            let transcript = read_input(&transcript)?;
            let patient_context = context.as_deref().map(read_input).transpose()?;
            let ctx = HandoffContext::new(&handoff_time, patient_context)?;

            let result = pipeline.process(&transcript, &ctx).await?;
            println!("{}", serde_json::to_string_pretty(&result.to_document()?)?);
        }
        Commands::Risk {
            transcript,
            handoff_time,
        } => {
            let transcript = read_input(&transcript)?;
            let ctx = HandoffContext::new(&handoff_time, None)?;

            let risks = pipeline.quick_risk(&transcript, &ctx).await?;
            println!("{}", serde_json::to_string_pretty(&risks)?);
        }
    }

    Ok(())
}
