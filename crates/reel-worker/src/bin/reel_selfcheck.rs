use std::path::Path;

use reel_clients::{PiperConfig, VoiceConfig, YouTubeConfig};
use reel_media::command::resolve_tool;
use reel_media::{check_ffmpeg, check_ffprobe, WhisperConfig};
use reel_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env()?;

    println!(
        "reel-selfcheck: starting with work_dir={}",
        config.assembly.work_root.display()
    );
    ensure_workdir(&config.assembly.work_root).await?;

    check_ffmpeg()?;
    check_ffprobe()?;

    let whisper = WhisperConfig::from_env();
    resolve_tool(&whisper.binary)?;
    ensure_file("whisper model", &whisper.model)?;

    let piper = PiperConfig::from_env();
    resolve_tool(&piper.binary)?;
    ensure_file("piper voice", &VoiceConfig::from_env().model)?;

    if let Some(template) = &config.assembly.title_template {
        ensure_file("title template", template)?;
    }
    config.choose_background()?;

    ensure_env_present(&["GEMINI_API_KEY"])?;
    if !YouTubeConfig::from_env()?.has_credentials() {
        println!("reel-selfcheck: no YouTube credentials, only `run --no-upload` will work");
    }

    println!("reel-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(path.as_ref()).await?;
    Ok(())
}

fn ensure_file(what: &str, path: &Path) -> anyhow::Result<()> {
    if !path.is_file() {
        return Err(anyhow::anyhow!("{} not found at {}", what, path.display()));
    }
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).is_err() {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}
