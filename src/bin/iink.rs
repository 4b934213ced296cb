//! iink Protocol CLI binary.
//!
//! # Commands
//!
//! - `hmac` - Answer an HMAC challenge offline
//! - `config` - Print the effective configuration
//! - `recognize` - Send strokes to a recognition server and print the model

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use iink::{
    compute_hmac, Config, ContentType, Model, ProtocolVersion, Recognizer, Stroke,
    WebSocketTransport, VERSION,
};

#[derive(Parser)]
#[command(name = "iink")]
#[command(version = VERSION)]
#[command(about = "iink Protocol - ink recognition client", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/iink/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the answer to an HMAC challenge
    Hmac {
        /// Challenge value sent by the server
        challenge: String,

        /// Application key (default: from config)
        #[arg(long)]
        application_key: Option<String>,

        /// HMAC key (default: from config)
        #[arg(long)]
        hmac_key: Option<String>,
    },

    /// Print the effective configuration
    Config {
        /// Print as JSON instead of TOML
        #[arg(long)]
        json: bool,
    },

    /// Recognize strokes read from a JSON file
    Recognize {
        /// JSON array of strokes
        strokes: PathBuf,

        /// Protocol version (v3, v4)
        #[arg(long)]
        protocol: Option<String>,

        /// Content type (MATH, TEXT, DIAGRAM, "Raw Content")
        #[arg(long = "type")]
        content_type: Option<String>,

        /// Open this content part instead of creating one (v4)
        #[arg(long)]
        part_id: Option<String>,

        /// Request exports after sending the strokes (v4)
        #[arg(long)]
        export: bool,

        /// Output as pretty-printed JSON
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Hmac {
            challenge,
            application_key,
            hmac_key,
        } => {
            let application_key = application_key.unwrap_or(config.server.application_key);
            let hmac_key = hmac_key.unwrap_or(config.server.hmac_key);
            println!("{}", compute_hmac(&challenge, &application_key, &hmac_key)?);
        },
        Commands::Config { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        },
        Commands::Recognize {
            strokes,
            protocol,
            content_type,
            part_id,
            export,
            pretty,
        } => {
            let config = apply_overrides(config, protocol.as_deref(), content_type.as_deref())?;
            let strokes: Vec<Stroke> = serde_json::from_str(&std::fs::read_to_string(strokes)?)?;
            let runtime = tokio::runtime::Runtime::new()?;
            let model = runtime.block_on(cmd_recognize(config, strokes, part_id, export))?;
            let output = if pretty {
                serde_json::to_string_pretty(&model)?
            } else {
                serde_json::to_string(&model)?
            };
            println!("{}", output);
        },
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::load_default()?,
    };
    Ok(config.with_env())
}

fn apply_overrides(
    mut config: Config,
    protocol: Option<&str>,
    content_type: Option<&str>,
) -> anyhow::Result<Config> {
    if let Some(protocol) = protocol {
        config.recognition.version = match protocol.to_lowercase().as_str() {
            "v3" | "3" => ProtocolVersion::V3,
            "v4" | "4" => ProtocolVersion::V4,
            other => anyhow::bail!("Invalid protocol: {}. Use: v3, v4", other),
        };
    }
    if let Some(content_type) = content_type {
        config.recognition.content_type = match content_type.to_uppercase().as_str() {
            "MATH" => ContentType::Math,
            "TEXT" => ContentType::Text,
            "DIAGRAM" => ContentType::Diagram,
            "RAW CONTENT" | "RAW" => ContentType::RawContent,
            other => anyhow::bail!("Invalid content type: {}", other),
        };
    }
    Ok(config)
}

async fn cmd_recognize(
    config: Config,
    strokes: Vec<Stroke>,
    part_id: Option<String>,
    export: bool,
) -> anyhow::Result<Model> {
    let version = config.recognition.version;
    let recognizer = Recognizer::spawn(config, WebSocketTransport::new())?;

    let mut model = Model::new();
    for stroke in strokes {
        model.add_stroke(stroke);
    }
    let model = model.into_handle();

    let ready = recognizer.init(&model).await?;
    tracing::info!("{}", ready);

    if version == ProtocolVersion::V4 {
        match part_id {
            Some(part_id) => recognizer.open_content_part(&model, part_id).await?,
            None => recognizer.new_content_part(&model).await?,
        };
    }

    let outcome = recognizer.add_strokes(&model).await?;
    tracing::info!(
        "Strokes recognized ({})",
        outcome
            .event
            .map_or_else(|| "unclassified".to_string(), |e| e.to_string())
    );

    if version == ProtocolVersion::V4 {
        if export {
            recognizer.export_content(&model).await?;
        } else {
            recognizer.wait_for_idle(&model).await?;
        }
    }

    recognizer.close().await?;

    let snapshot = model
        .lock()
        .map_err(|_| anyhow::anyhow!("model lock poisoned"))?
        .clone();
    Ok(snapshot)
}
