//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// How the stream is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Stream the thinking trace and the answer as they arrive
    Live,
    /// Print the final snapshot as JSON
    Json,
}

/// Response body format (mirrors the transport setting)
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BodyFormat {
    /// Plain text body
    Raw,
    /// Newline-delimited JSON chunks (Ollama)
    Ndjson,
}

impl BodyFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyFormat::Raw => "raw",
            BodyFormat::Ndjson => "ndjson",
        }
    }
}

/// CLI arguments for thinkstream
#[derive(Parser, Debug)]
#[command(name = "thinkstream")]
#[command(
    author,
    version,
    about = "Stream an LLM completion and split its thinking trace from the answer"
)]
#[command(long_about = r#"
thinkstream sends a prompt to a streaming completion endpoint and separates
the model's thinking trace (between <think> and </think>) from its final
answer while the response is still arriving.

Output without any markers is shown as the answer once it grows past the
heuristic threshold.

Configuration files are loaded from (in priority order):
1. THINKSTREAM_<SECTION>__<KEY>              Environment variables
2. --config <path>                           Explicit config file
3. ./thinkstream.toml                        Project-level config
4. ~/.config/thinkstream/config.toml         Global config

Example:
  thinkstream "Why is the sky blue?"
  thinkstream --model deepseek-r1 --output json "Summarize RFC 9110"
  thinkstream --format raw --url http://localhost:8080/stream --payload '{"q":"hi"}'
"#)]
pub struct Cli {
    /// Prompt to send (ignored when --payload is given)
    pub prompt: Option<String>,

    /// Streaming completion endpoint
    #[arg(short, long, value_name = "URL")]
    pub url: Option<String>,

    /// Model name placed in the request body
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Raw JSON request body ("stream": true is added)
    #[arg(long, value_name = "JSON")]
    pub payload: Option<String>,

    /// Response body format
    #[arg(short, long, value_enum)]
    pub format: Option<BodyFormat>,

    /// Characters of unmarked output before it is shown as the answer
    #[arg(long, value_name = "CHARS")]
    pub threshold: Option<usize>,

    /// Re-check the heuristic on every fragment instead of committing once
    #[arg(long)]
    pub reevaluate: bool,

    /// Output mode
    #[arg(short, long, value_enum, default_value = "live")]
    pub output: OutputMode,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}
