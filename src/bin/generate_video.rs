// Submit one generation job and wait for it from the terminal.
//
//   generate_video <model> [--duration N] [--resolution R] [--aspect-ratio A] [--audio] <prompt...>
//
// Stores the finished video in Postgres when DATABASE_URL is set, otherwise
// keeps it in memory for the lifetime of the run.

use std::env;
use std::sync::Arc;

use video_studio::config::AppConfig;
use video_studio::db;
use video_studio::fal_client::FalClient;
use video_studio::generation::{
    poll_until_settled, Correlation, GenerationRequest, PollPolicy, Reconciler, StatusOutcome,
    Submitter,
};
use video_studio::services::{InMemoryVideoStore, PgVideoStore, VideoStore};

const USAGE: &str =
    "usage: generate_video <model> [--duration N] [--resolution R] [--aspect-ratio A] [--audio] <prompt...>";

fn parse_args(args: &[String]) -> Result<GenerationRequest, String> {
    let mut iter = args.iter();
    let model = iter.next().ok_or_else(|| USAGE.to_string())?.clone();
    let mut request = GenerationRequest {
        model,
        ..Default::default()
    };
    let mut prompt = Vec::new();

    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{} needs a value", flag))
        };
        match arg.as_str() {
            "--duration" => {
                let raw = value("--duration")?;
                request.duration = Some(raw.parse().map_err(|_| format!("invalid duration: {}", raw))?);
            }
            "--resolution" => request.resolution = Some(value("--resolution")?),
            "--aspect-ratio" => request.aspect_ratio = Some(value("--aspect-ratio")?),
            "--audio" => request.include_audio = true,
            _ => prompt.push(arg.as_str()),
        }
    }

    request.prompt = prompt.join(" ");
    Ok(request)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let request = parse_args(&args)?;
    let config = AppConfig::from_env()?;

    let store: Arc<dyn VideoStore> = match config.database_url.as_deref() {
        Some(url) => Arc::new(PgVideoStore::new(db::create_pool(url, config.db_max_connections).await?)),
        None => {
            println!("DATABASE_URL not set, results will not be persisted");
            Arc::new(InMemoryVideoStore::new())
        }
    };
    let provider = Arc::new(FalClient::with_base_url(config.fal_key, config.fal_queue_url));
    let submitter = Submitter::new(provider.clone());
    let reconciler = Reconciler::new(provider, store);

    let submission = submitter.submit(request).await?;
    let params = &submission.params;
    println!(
        "🚀 Queued {} ({} on {}, {}s, estimated ${})",
        submission.request_id, params.prompt, params.model, params.duration, submission.estimated_cost
    );

    let correlation = Correlation {
        prompt: Some(params.prompt.clone()),
        model: Some(params.model),
        duration: Some(params.duration),
        resolution: Some(params.resolution.to_string()),
        aspect_ratio: Some(params.aspect_ratio.as_str().to_string()),
        include_audio: params.include_audio,
        generation_session: None,
    };

    match poll_until_settled(&reconciler, &submission.request_id, &correlation, PollPolicy::default()).await? {
        StatusOutcome::Completed { asset_url, video, .. } => {
            println!("✅ Video ready: {}", asset_url);
            if let Some(video) = video {
                println!("   stored as {} ({})", video.video_id, video.id);
            }
        }
        StatusOutcome::Failed { message } => {
            return Err(format!("generation failed: {}", message).into());
        }
        StatusOutcome::MissingAsset { raw } => {
            return Err(format!("job completed without a video url: {}", raw).into());
        }
        StatusOutcome::Pending { status } => {
            return Err(format!("job still {}", status).into());
        }
    }

    Ok(())
}
