//! Story video worker binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_clients::{GeminiClient, PiperConfig, PiperSynthesizer, TopicCatalog, YouTubePublisher};
use reel_media::{
    AssemblyRequest, FfmpegTool, StartPolicy, VideoAssembler, WhisperConfig, WhisperCppTranscriber,
};
use reel_worker::{StoryRunner, WorkerConfig, WorkerError, WorkerResult};

#[derive(Debug, Parser)]
#[command(name = "reel-worker", version, about = "Generate, narrate, assemble and publish story videos")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the full pipeline once
    Run(RunArgs),
    /// Assemble a video from existing background and narration files
    Assemble(AssembleArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Assemble only, do not publish
    #[arg(long)]
    no_upload: bool,

    /// Topic name from the catalog, random when omitted
    #[arg(long, env = "REEL_TOPIC")]
    topic: Option<String>,

    /// Final video path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct AssembleArgs {
    #[arg(long)]
    background: PathBuf,

    #[arg(long)]
    narration: PathBuf,

    /// Title card text
    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    output: PathBuf,

    /// Background start offset in seconds
    #[arg(long, conflicts_with = "random_start")]
    start: Option<f64>,

    /// Start the background at a random offset
    #[arg(long)]
    random_start: bool,

    /// Also write <output>.srt
    #[arg(long)]
    subtitles: bool,
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,reel_worker=info,reel_media=info,reel_clients=info")
    });

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

fn media_stack(config: &WorkerConfig) -> VideoAssembler<FfmpegTool, WhisperCppTranscriber> {
    let assembly = config.assembly.clone();
    let tool = FfmpegTool::new(assembly.encoding.clone()).with_timeout(assembly.tool_timeout_secs);
    let transcriber =
        WhisperCppTranscriber::new(WhisperConfig::from_env().with_timeout(assembly.tool_timeout_secs));
    VideoAssembler::new(tool, transcriber, assembly)
}

async fn run(args: RunArgs) -> WorkerResult<()> {
    let mut config = WorkerConfig::from_env()?;
    if args.no_upload {
        config.upload = false;
    }
    if let Some(output) = args.output {
        config.output = output;
    }

    let gemini = GeminiClient::from_env()?;
    let prompt_template = gemini.config().prompt_template.clone();
    let catalog = TopicCatalog::from_env()?;
    let synthesizer = PiperSynthesizer::new(PiperConfig::from_env());
    let upload = config.upload;

    let mut runner = StoryRunner::new(
        Box::new(gemini),
        Box::new(synthesizer),
        media_stack(&config),
        catalog,
        prompt_template,
        config,
    );
    if upload {
        runner = runner.with_publisher(Box::new(YouTubePublisher::from_env()?));
    }

    let report = runner.run(args.topic.as_deref()).await?;
    info!(
        run_id = %report.run_id,
        topic = %report.topic,
        output = %report.outcome.output.display(),
        video_id = report.video_id.as_deref().unwrap_or("-"),
        "Run finished in {:.1}s",
        report.elapsed.as_secs_f64()
    );
    Ok(())
}

async fn assemble(args: AssembleArgs) -> WorkerResult<()> {
    let mut config = WorkerConfig::from_env()?;
    if args.subtitles {
        config.assembly.export_subtitles = true;
    }

    let start = match (args.start, args.random_start) {
        (Some(secs), _) => StartPolicy::At(secs),
        (None, true) => StartPolicy::Random,
        (None, false) => StartPolicy::Beginning,
    };

    let outcome = media_stack(&config)
        .assemble(&AssemblyRequest {
            background: args.background,
            narration: args.narration,
            title: args.title,
            output: args.output,
            start,
        })
        .await?;

    info!(
        run_id = %outcome.run_id,
        output = %outcome.output.display(),
        duration = outcome.duration,
        cues = outcome.cues.len(),
        "Assembly finished"
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider was already installed");
    }

    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    info!("Starting reel-worker");

    let result: Result<(), WorkerError> = match cli.command {
        Command::Run(args) => run(args).await,
        Command::Assemble(args) => assemble(args).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}
