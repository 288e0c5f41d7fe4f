use anyhow::Result;
use brand_intel::config::AppConfig;
use brand_intel::logging;
use brand_intel::pipeline::QueryPipeline;
use clap::Parser;
use std::path::PathBuf;
use tracing::error;

#[derive(Parser)]
#[command(name = "brand-intel")]
#[command(about = "Ask the brand-voting analytics database a question in plain language")]
struct Args {
    /// The business question in natural language
    question: String,

    /// Analytics database URL (or set DATABASE_URL env var)
    #[arg(long)]
    database_url: Option<String>,

    /// OpenAI API key (or set OPENAI_API_KEY env var)
    #[arg(long)]
    api_key: Option<String>,

    /// Completion model (or set OPENAI_MODEL env var)
    #[arg(long)]
    model: Option<String>,

    /// Schema description file overriding the built-in one
    #[arg(long)]
    schema: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init();

    let args = Args::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(url) = args.database_url {
        config.database_url = Some(url);
    }
    if let Some(key) = args.api_key {
        config.openai_api_key = key;
    }
    if let Some(model) = args.model {
        config.openai_model = model;
    }
    if args.schema.is_some() {
        config.schema_path = args.schema;
    }

    let pipeline = QueryPipeline::from_config(&config).await?;

    match pipeline.answer(&args.question).await {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(failure) => {
            error!(status = failure.status_code(), "Question could not be answered");
            eprintln!("{}", serde_json::to_string_pretty(&failure.body())?);
            std::process::exit(1);
        }
    }
}
