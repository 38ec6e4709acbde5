use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::audio_api::{DEFAULT_SAMPLE_LIBRARY, EngineConfig};

pub const LOG_FILTER_ENV: &str = "SEKER_LOG";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Describe lanes in plain words and audition the mix live")]
pub struct Cli {
    /// Shared link, `#s=` fragment or bare token to start from
    #[arg(long, env = "SEKER_SESSION")]
    pub session: Option<String>,

    /// Command that answers generation requests (request JSON on stdin, completion on stdout)
    #[arg(long, env = "SEKER_GENERATOR", default_value = "seker-llm")]
    pub generator: String,

    /// Extra argument for the generator command (repeatable)
    #[arg(long = "generator-arg", allow_hyphen_values = true)]
    pub generator_args: Vec<String>,

    /// File the live pattern program is written to
    #[arg(long, env = "SEKER_PROGRAM_FILE", default_value = "seker.strudel")]
    pub program_file: PathBuf,

    /// Sample library registered when the engine starts
    #[arg(long, env = "SEKER_SAMPLES", default_value = DEFAULT_SAMPLE_LIBRARY)]
    pub samples: String,

    /// Prefix for share links
    #[arg(long, env = "SEKER_BASE_URL", default_value = "https://seker.local/")]
    pub base_url: String,

    /// File rewritten with the current share link after every change
    #[arg(long, env = "SEKER_SHARE_FILE")]
    pub share_file: Option<PathBuf>,

    /// Playback debounce window in milliseconds
    #[arg(long, default_value_t = 80)]
    pub debounce_ms: u64,

    /// Where log output goes (the terminal belongs to the UI)
    #[arg(long, env = "SEKER_LOG_FILE", default_value = "seker.log")]
    pub log_file: PathBuf,
}

impl Cli {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            sample_library: self.samples.clone(),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Installs the file logger. Filter comes from `SEKER_LOG`, default `info`.
pub fn init_logging(path: &Path) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .ok(); // already installed (tests, embedding) is fine
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_table() {
        let cli = Cli::try_parse_from(["seker"]).unwrap();
        assert_eq!(cli.generator, "seker-llm");
        assert_eq!(cli.program_file, PathBuf::from("seker.strudel"));
        assert_eq!(cli.base_url, "https://seker.local/");
        assert_eq!(cli.debounce(), Duration::from_millis(80));
        assert_eq!(cli.engine_config(), EngineConfig::default());
        assert!(cli.generator_args.is_empty());
    }

    #[test]
    fn generator_args_repeat() {
        let cli = Cli::try_parse_from([
            "seker",
            "--generator",
            "llm",
            "--generator-arg",
            "-m",
            "--generator-arg",
            "claude",
            "--debounce-ms",
            "120",
        ])
        .unwrap();
        assert_eq!(cli.generator, "llm");
        assert_eq!(cli.generator_args, vec!["-m", "claude"]);
        assert_eq!(cli.debounce_ms, 120);
    }
}
