mod subcommands;


use crate::agent::tools::McpToolHost;
use crate::agent::{AgentLoop, AgentLoopConfig};
use crate::config::{Config, load_config};
use crate::gateway::AppState;
use crate::gateway::auth::JwtAuth;
use crate::providers::base::LLMProvider;
use crate::providers::openai::OpenAIProvider;
use crate::store::Database;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "taskpilot")]
#[command(about = "Personal task manager with a conversational assistant")]
#[command(version)]
pub struct Cli {
    /// Use this config file instead of ~/.taskpilot/config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Run the REST gateway
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long, short = 'p')]
        port: Option<u16>,
    },
    /// Talk to the assistant (one-shot with -m, interactive otherwise)
    Chat {
        #[arg(long, short = 'u')]
        user: String,
        #[arg(short, long)]
        message: Option<String>,
        /// Continue an existing conversation
        #[arg(short = 'c', long)]
        conversation: Option<i64>,
    },
    /// Manage tasks directly, without the assistant
    Tasks {
        #[arg(long, short = 'u')]
        user: String,
        #[command(subcommand)]
        cmd: TaskCommands,
    },
    /// Browse stored conversations
    Conversations {
        #[arg(long, short = 'u')]
        user: String,
        #[command(subcommand)]
        cmd: ConversationCommands,
    },
    /// Mint a bearer token for the REST gateway
    Token {
        #[arg(long, short = 'u')]
        user: String,
    },
    /// Show taskpilot status
    Status,
    /// Serve the task tools over MCP stdio (spawned by the assistant)
    #[command(hide = true)]
    ToolHost,
}

#[derive(Subcommand)]
enum TaskCommands {
    /// List tasks
    List {
        /// Only show PENDING or COMPLETED tasks
        #[arg(long, short = 's')]
        status: Option<String>,
    },
    /// Add a task
    Add {
        title: String,
        #[arg(long, short = 'd')]
        description: Option<String>,
    },
    /// Show one task
    Get { id: i64 },
    /// Change a task's title or description
    Update {
        id: i64,
        #[arg(long, short = 't')]
        title: Option<String>,
        #[arg(long, short = 'd')]
        description: Option<String>,
    },
    /// Toggle a task between PENDING and COMPLETED
    Complete { id: i64 },
    /// Delete a task
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum ConversationCommands {
    /// List conversations, most recent first
    List,
    /// Print a conversation's messages
    Show { id: i64 },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init => {
            init(config_path)?;
        }
        Commands::Serve { host, port } => {
            serve(config_path, host, port).await?;
        }
        Commands::Chat {
            user,
            message,
            conversation,
        } => {
            subcommands::chat(config_path, &user, message, conversation).await?;
        }
        Commands::Tasks { user, cmd } => {
            subcommands::tasks_command(config_path, &user, cmd)?;
        }
        Commands::Conversations { user, cmd } => {
            subcommands::conversations_command(config_path, &user, cmd).await?;
        }
        Commands::Token { user } => {
            subcommands::token_command(config_path, &user)?;
        }
        Commands::Status => {
            subcommands::status_command(config_path)?;
        }
        Commands::ToolHost => {
            let config = load_config(config_path)?;
            crate::tool_host::serve_stdio(&config).await?;
        }
    }

    Ok(())
}

fn init(config_path: Option<&Path>) -> Result<()> {
    println!("\u{1f4cb} Initializing taskpilot...");

    let config_path = match config_path {
        Some(path) => path.to_path_buf(),
        None => crate::config::get_config_path()?,
    };
    if config_path.exists() {
        println!(
            "\u{26a0}\u{fe0f}  Config already exists at {}",
            config_path.display()
        );
        println!("Overwrite? (y/N): ");
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            return Ok(());
        }
    }

    let config = Config::default();
    crate::config::save_config(&config, Some(config_path.as_path()))?;
    println!("\u{2713} Created config at {}", config_path.display());

    let db = open_database(&config)?;
    println!("\u{2713} Created task database at {}", db.path());

    println!("\n\u{1f4cb} taskpilot is ready!");
    println!("\nNext steps:");
    println!(
        "  1. Add your OpenAI API key to {} (or set TASKPILOT_OPENAI_API_KEY)",
        config_path.display()
    );
    println!("  2. Chat: taskpilot chat --user me -m \"Add a task to buy milk\"");

    Ok(())
}

async fn serve(config_path: Option<&Path>, host: Option<String>, port: Option<u16>) -> Result<()> {
    info!("Loading configuration...");
    let config = load_config(config_path)?;
    let host = host.unwrap_or_else(|| config.gateway.host.clone());
    let port = port.unwrap_or(config.gateway.port);

    let auth = JwtAuth::new(&config.gateway.auth_secret, config.gateway.token_ttl_hours)?;
    let db = open_database(&config)?;
    let agent = setup_agent(&config, db.clone())?;
    info!("Configuration loaded. Using model: {}", agent.model());

    let state = AppState {
        agent: Arc::new(agent),
        db,
        auth: Arc::new(auth),
    };
    let http_task = crate::gateway::start(&host, port, state).await?;

    println!("Starting taskpilot gateway...");
    println!("HTTP API listening on {}:{}", host, port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
        _ = http_task => {}
    }

    Ok(())
}

pub(crate) fn open_database(config: &Config) -> Result<Arc<Database>> {
    let path = config.database_path();
    debug!("opening task database at {}", path.display());
    let db = Database::open(&path)
        .with_context(|| format!("Failed to open task database at {}", path.display()))?;
    Ok(Arc::new(db))
}

fn setup_provider(config: &Config) -> Result<Arc<dyn LLMProvider>> {
    let openai = &config.providers.openai;
    if openai.api_key.is_empty() {
        anyhow::bail!(
            "No OpenAI API key configured. Set providers.openai.apiKey in the config \
             or TASKPILOT_OPENAI_API_KEY."
        );
    }
    let provider = OpenAIProvider::from_config(openai, &config.agent.model);
    info!(
        "Provider created successfully. Endpoint: {}",
        provider.endpoint()
    );
    Ok(Arc::new(provider))
}

pub(crate) fn setup_agent(config: &Config, db: Arc<Database>) -> Result<AgentLoop> {
    let provider = setup_provider(config)?;
    let tool_host = McpToolHost::from_config(config)?;
    Ok(AgentLoop::new(AgentLoopConfig::from_config(
        config,
        provider,
        db,
        Arc::new(tool_host),
    )))
}
