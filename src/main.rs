use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use llm_relay::proxy::{self, ProxyDecision, ProxyEnv};
use llm_relay::{config, doctor, server};
use reqwest::Url;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "llm-relay")]
#[command(about = "Relay chat requests to Gemini or OpenAI through environment-configured proxies")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay HTTP server
    Serve {
        /// Address to listen on (overrides configuration)
        #[arg(short, long)]
        listen: Option<String>,
    },
    /// Show which proxy a request to URL would use
    Resolve {
        /// Target URL, e.g. https://api.openai.com/v1/models
        url: String,
    },
    /// Run diagnostics or inspect configuration state
    Doctor {
        #[command(subcommand)]
        action: Option<DoctorCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum DoctorCommands {
    /// Run diagnostics for configuration and proxy environment
    Run,
    /// Display the effective configuration values
    Config,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "llm_relay=info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config_file = match cli.config {
        Some(path) => path,
        None => {
            config::initialize_config()?;
            config::get_config_file_path()?
        }
    };

    match cli.command {
        Commands::Serve { listen } => {
            let mut app_config = config::load_config_from(&config_file)?;
            if let Some(addr) = listen {
                app_config.listen_addr = addr;
            }

            let listener = tokio::net::TcpListener::bind(&app_config.listen_addr)
                .await
                .with_context(|| format!("binding {}", app_config.listen_addr))?;
            server::serve(listener, server::AppState::from_config(&app_config)).await?;
        }
        Commands::Resolve { url } => {
            let target = Url::parse(&url).with_context(|| format!("invalid URL '{url}'"))?;
            let host = proxy::target_host(&target)
                .with_context(|| format!("URL '{url}' has no host"))?;
            let decision = proxy::resolve(&ProxyEnv::from_process(), host);
            let rendered = doctor::describe(&decision);
            let rendered = match decision {
                ProxyDecision::Proxy(_) => rendered.yellow(),
                ProxyDecision::Direct => rendered.green(),
                ProxyDecision::PlatformDefault => rendered.bright_black(),
            };
            println!("{host}: {rendered}");
        }
        Commands::Doctor { action } => match action.unwrap_or(DoctorCommands::Run) {
            DoctorCommands::Run => {
                doctor::run(&config_file)?;
            }
            DoctorCommands::Config => {
                doctor::print_config(&config_file)?;
            }
        },
    }

    Ok(())
}
