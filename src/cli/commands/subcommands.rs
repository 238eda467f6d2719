use super::{ConversationCommands, TaskCommands, open_database, setup_agent};
use crate::agent::AgentLoop;
use crate::config::load_config;
use crate::gateway::auth::JwtAuth;
use crate::store::tasks::normalize_title;
use crate::store::{ConversationStore, StoredMessage, Task, TaskStatus, TaskUpdate};
use anyhow::Result;
use std::path::Path;

pub(super) async fn chat(
    config_path: Option<&Path>,
    user: &str,
    message: Option<String>,
    conversation: Option<i64>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let db = open_database(&config)?;
    let agent = setup_agent(&config, db)?;

    if let Some(msg) = message {
        let reply = agent.process_exchange(user, &msg, conversation).await?;
        println!("\u{1f916} {}", reply.content);
        println!("(conversation {})", reply.conversation_id);
    } else {
        interactive_repl(&agent, user, conversation).await?;
    }

    Ok(())
}

async fn interactive_repl(agent: &AgentLoop, user: &str, mut conversation: Option<i64>) -> Result<()> {
    use std::io::{self, BufRead, Write};

    println!("\u{1f916} Interactive mode (Ctrl+C to exit)\n");
    loop {
        print!("You: ");
        io::stdout().flush()?;

        let stdin = io::stdin();
        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            return Ok(());
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        let reply = agent.process_exchange(user, input, conversation).await?;
        conversation = Some(reply.conversation_id);
        println!("\n\u{1f916} {}\n", reply.content);
    }
}

pub(super) fn tasks_command(config_path: Option<&Path>, user: &str, cmd: TaskCommands) -> Result<()> {
    let config = load_config(config_path)?;
    let db = open_database(&config)?;

    match cmd {
        TaskCommands::List { status } => {
            let status = status
                .as_deref()
                .map(str::parse::<TaskStatus>)
                .transpose()
                .map_err(anyhow::Error::msg)?;
            let tasks = db.list_tasks(user, status)?;
            if tasks.is_empty() {
                println!("No tasks.");
            }
            for task in &tasks {
                println!("{}", format_task(task));
            }
        }
        TaskCommands::Add { title, description } => {
            normalize_title(&title).map_err(anyhow::Error::msg)?;
            let task = db.create_task(user, &title, description.as_deref().unwrap_or(""))?;
            println!("\u{2713} Added {}", format_task(&task));
        }
        TaskCommands::Get { id } => {
            let task = db
                .get_task(user, id)?
                .ok_or_else(|| anyhow::anyhow!("Task with ID {} not found.", id))?;
            println!("{}", format_task(&task));
            println!("    created {}", task.created_at.format("%Y-%m-%d %H:%M"));
            println!("    updated {}", task.updated_at.format("%Y-%m-%d %H:%M"));
        }
        TaskCommands::Update {
            id,
            title,
            description,
        } => {
            if title.is_none() && description.is_none() {
                anyhow::bail!("Nothing to update: pass --title and/or --description");
            }
            if let Some(title) = &title {
                normalize_title(title).map_err(anyhow::Error::msg)?;
            }
            let update = TaskUpdate {
                title,
                description,
                status: None,
            };
            let task = db
                .update_task(user, id, &update)?
                .ok_or_else(|| anyhow::anyhow!("Task with ID {} not found.", id))?;
            println!("\u{2713} Updated {}", format_task(&task));
        }
        TaskCommands::Complete { id } => {
            let task = db
                .toggle_task(user, id)?
                .ok_or_else(|| anyhow::anyhow!("Task with ID {} not found.", id))?;
            println!("\u{2713} {}", format_task(&task));
        }
        TaskCommands::Delete { id } => {
            if !db.delete_task(user, id)? {
                anyhow::bail!("Task with ID {} not found.", id);
            }
            println!("\u{2713} Task {} deleted successfully.", id);
        }
    }

    Ok(())
}

pub(super) async fn conversations_command(
    config_path: Option<&Path>,
    user: &str,
    cmd: ConversationCommands,
) -> Result<()> {
    let config = load_config(config_path)?;
    let db = open_database(&config)?;

    match cmd {
        ConversationCommands::List => {
            let conversations = db.list_conversations(user).await?;
            if conversations.is_empty() {
                println!("No conversations.");
            }
            for conv in conversations {
                println!(
                    "#{} {} (updated {})",
                    conv.id,
                    conv.title,
                    conv.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        ConversationCommands::Show { id } => {
            // Same ownership rule as the assistant: foreign and missing both fail
            let conv = db
                .get_conversation(id)?
                .filter(|c| c.owner_id == user)
                .ok_or_else(|| anyhow::anyhow!("Conversation {} not found or access denied", id))?;
            println!("#{} {}\n", conv.id, conv.title);
            for msg in db.load_history(id).await? {
                println!("{}", format_message(&msg));
            }
        }
    }

    Ok(())
}

pub(super) fn token_command(config_path: Option<&Path>, user: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let auth = JwtAuth::new(&config.gateway.auth_secret, config.gateway.token_ttl_hours)?;
    println!("{}", auth.issue_token(user)?);
    Ok(())
}

pub(super) fn status_command(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let config_path = match config_path {
        Some(path) => path.to_path_buf(),
        None => crate::config::get_config_path()?,
    };
    let db_path = config.database_path();

    println!("\u{1f4cb} taskpilot Status\n");
    println!("Config: {} {}", config_path.display(), check_mark(config_path.exists()));
    println!("Database: {} {}", db_path.display(), check_mark(db_path.exists()));
    println!("Model: {}", config.agent.model);
    println!(
        "Gateway: {}:{}",
        config.gateway.host, config.gateway.port
    );
    println!(
        "Tool host: {}",
        config
            .tool_host
            .command
            .as_deref()
            .unwrap_or("(this binary) tool-host")
    );
    for (name, set) in crate::config::credentials::credential_status(&config) {
        println!("{}: {}", name, if set { "\u{2713}" } else { "not set" });
    }

    Ok(())
}

fn check_mark(ok: bool) -> &'static str {
    if ok { "\u{2713}" } else { "\u{2717}" }
}

pub(super) fn format_task(task: &Task) -> String {
    let mark = match task.status {
        TaskStatus::Completed => 'x',
        TaskStatus::Pending => ' ',
    };
    let mut line = format!("#{} [{}] {}", task.id, mark, task.title);
    if !task.description.is_empty() {
        line.push_str("\n    ");
        line.push_str(&task.description);
    }
    line
}

pub(super) fn format_message(msg: &StoredMessage) -> String {
    let speaker = match msg.role.as_str() {
        "user" => "You",
        "assistant" => "\u{1f916}",
        other => other,
    };
    format!("{}: {}", speaker, msg.content)
}
