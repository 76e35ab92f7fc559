use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use parlance_core::config::Config;
use parlance_core::types::{Conversation, Message};
use parlance_gateway::GatewayState;
use parlance_planner::Planner;
use parlance_ports::{
    Completion, ElevenLabsSynthesizer, KnowledgeQuery, OpenAiCompletion, SearchKnowledge,
    Synthesizer, Transcriber, WhisperTranscriber,
};

#[derive(Parser)]
#[command(
    name = "parlance",
    about = "Voice-driven conversational assistant — planner loop, STT and TTS in a single Rust binary",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Port to listen on (default: 3100)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run a single conversational turn from the terminal
    Chat {
        /// User message to respond to
        message: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show version, config path, and configuration health
    Status,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Get a specific config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
}

fn init_logging(config: &Config, verbose: bool) {
    let default_level = if verbose {
        "debug".to_string()
    } else {
        config
            .logging
            .as_ref()
            .and_then(|l| l.level.clone())
            .unwrap_or_else(|| "info".to_string())
    };

    let mut directives = vec![default_level];
    if let Some(logging) = &config.logging {
        directives.extend(logging.filters.iter().cloned());
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directives.join(",")));

    let format = config
        .logging
        .as_ref()
        .map(|l| l.format.as_str())
        .unwrap_or("plain");
    let to_stdout = config
        .logging
        .as_ref()
        .map(|l| l.output == "stdout")
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match (format, to_stdout) {
        ("json", true) => builder.json().init(),
        ("json", false) => builder.json().with_writer(std::io::stderr).init(),
        (_, true) => builder.init(),
        (_, false) => builder.with_writer(std::io::stderr).init(),
    }
}

/// Build the completion port from config. Every planner invocation needs this,
/// so a missing API key is a hard error here rather than a mid-turn surprise.
fn build_completion(config: &Config) -> anyhow::Result<Arc<dyn Completion>> {
    let completion = config
        .completion
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("No completion section in config"))?;
    let api_key = completion
        .resolve_api_key()
        .ok_or_else(|| anyhow::anyhow!("No completion API key configured (completion.api_key or completion.api_key_env)"))?;

    Ok(Arc::new(OpenAiCompletion::new(
        completion.base_url.as_deref(),
        config.completion_model(),
        api_key,
    )))
}

fn build_knowledge(config: &Config) -> Option<Arc<dyn KnowledgeQuery>> {
    let knowledge = config.knowledge.as_ref()?;
    let url = knowledge.search_api_url.as_ref()?;
    Some(Arc::new(SearchKnowledge::new(
        url.clone(),
        knowledge.search_api_key.clone(),
    )))
}

fn build_planner(config: &Config) -> anyhow::Result<Planner> {
    let completion = build_completion(config)?;
    let registry = parlance_actions::builtin(completion.clone(), build_knowledge(config));

    Ok(Planner::new(
        registry,
        completion,
        config.max_iterations(),
        Duration::from_secs(config.timeout_secs()),
    ))
}

fn build_transcriber(config: &Config) -> anyhow::Result<Arc<dyn Transcriber>> {
    let transcription = config
        .transcription
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("No transcription section in config"))?;
    let api_key = transcription
        .resolve_api_key()
        .ok_or_else(|| anyhow::anyhow!("No transcription API key configured"))?;

    Ok(Arc::new(WhisperTranscriber::new(
        &transcription.provider,
        transcription.model.as_deref(),
        transcription.language.as_deref(),
        api_key,
    )))
}

fn build_synthesizer(config: &Config) -> anyhow::Result<Arc<dyn Synthesizer>> {
    let tts = config
        .tts
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("No tts section in config"))?;
    let api_key = tts
        .resolve_api_key()
        .ok_or_else(|| anyhow::anyhow!("No TTS API key configured"))?;

    Ok(Arc::new(ElevenLabsSynthesizer::new(
        tts.voice_id.as_deref(),
        tts.model_id.as_deref(),
        tts.output_format.as_deref(),
        api_key,
    )))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_ref()
        .map(std::path::PathBuf::from)
        .unwrap_or_else(Config::config_path);

    let config = Config::load(&config_path)?;

    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Serve { port } => {
            let (warnings, errors) = config.validate();
            for warning in &warnings {
                tracing::warn!("{warning}");
            }
            if !errors.is_empty() {
                for error in &errors {
                    tracing::error!("{error}");
                }
                anyhow::bail!("Invalid configuration ({} error(s))", errors.len());
            }

            let port = port.unwrap_or_else(|| config.gateway_port());
            let state = Arc::new(GatewayState {
                planner: Arc::new(build_planner(&config)?),
                transcriber: build_transcriber(&config)?,
                synthesizer: build_synthesizer(&config)?,
                config: Arc::new(config),
            });

            tracing::info!("Starting Parlance gateway on port {port}");
            parlance_gateway::start_gateway(state, port).await?;
        }
        Commands::Chat { message } => {
            let planner = build_planner(&config)?;
            let conversation = Conversation::default().with_message(Message::user(message));
            let response = planner.respond(conversation).await;
            println!("{}", response.text);
        }
        Commands::Status => {
            println!("Parlance v{}", env!("CARGO_PKG_VERSION"));
            println!("Config: {}", config_path.display());
            println!("Gateway port: {}", config.gateway_port());
            println!("Completion model: {}", config.completion_model());
            println!("Max iterations: {}", config.max_iterations());

            let (warnings, errors) = config.validate();
            for warning in &warnings {
                println!("Warning: {warning}");
            }
            for error in &errors {
                println!("Error: {error}");
            }
            if warnings.is_empty() && errors.is_empty() {
                println!("Configuration OK");
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&config)?;
                println!("{json}");
            }
            ConfigAction::Get { key } => match config.get_path(&key) {
                Some(value) => println!("{value}"),
                None => anyhow::bail!("Unknown config key: {key}"),
            },
            ConfigAction::Set { key, value } => {
                let mut config = config;
                let parsed = serde_json::from_str(&value)
                    .unwrap_or_else(|_| serde_json::Value::String(value));
                config.set_path(&key, parsed)?;
                config.save(&config_path)?;
                println!("Updated {key}");
            }
        },
    }

    Ok(())
}
