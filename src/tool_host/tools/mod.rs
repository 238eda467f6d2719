//! The five task tools: their catalog entries and the code behind them.

use crate::agent::tools::base::ToolResult;
use crate::store::tasks::normalize_title;
use crate::store::{Database, TaskStatus, TaskUpdate};
use anyhow::Result;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

pub fn definitions() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "add_task",
            description: "Create a new task in the user's todo list.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "The title of the task. Must not be empty."},
                    "description": {"type": "string", "description": "Detailed description of the task."}
                },
                "required": ["title"]
            }),
        },
        ToolSpec {
            name: "list_tasks",
            description: "Get all tasks or filter by status (PENDING/COMPLETED).",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "status": {"type": "string", "description": "Filter tasks by status. If omitted, returns all tasks."}
                }
            }),
        },
        ToolSpec {
            name: "complete_task",
            description: "Mark a specific task as COMPLETED. If the task is already completed, \
                          this makes it PENDING again (toggles).",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "task_id": {"type": "integer", "description": "The unique ID of the task to complete."}
                },
                "required": ["task_id"]
            }),
        },
        ToolSpec {
            name: "delete_task",
            description: "Delete a task by its ID.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "task_id": {"type": "integer", "description": "The unique ID of the task to delete."}
                },
                "required": ["task_id"]
            }),
        },
        ToolSpec {
            name: "update_task",
            description: "Update the title and/or description of a task.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "task_id": {"type": "integer", "description": "The unique ID of the task to update."},
                    "title": {"type": "string", "description": "New title for the task."},
                    "description": {"type": "string", "description": "New description for the task."}
                },
                "required": ["task_id"]
            }),
        },
    ]
}

#[derive(Deserialize)]
struct AddTaskArgs {
    title: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct ListTasksArgs {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
struct TaskIdArgs {
    task_id: i64,
}

#[derive(Deserialize)]
struct UpdateTaskArgs {
    task_id: i64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Run one tool call for `owner_id`.
///
/// Domain failures come back as error payloads; `Err` is left for storage
/// failures the caller cannot recover from.
pub fn dispatch(
    db: &Database,
    owner_id: &str,
    name: &str,
    arguments: Map<String, Value>,
) -> Result<ToolResult> {
    debug!("tool host: {} for {}", name, owner_id);
    match name {
        "add_task" => {
            let args: AddTaskArgs = match parse_args(name, arguments) {
                Ok(args) => args,
                Err(rejected) => return Ok(rejected),
            };
            if let Err(message) = normalize_title(&args.title) {
                return Ok(ToolResult::error_payload("VALIDATION_ERROR", message));
            }
            let task = db.create_task(
                owner_id,
                &args.title,
                args.description.as_deref().unwrap_or(""),
            )?;
            Ok(ToolResult::new(serde_json::to_string(&task)?))
        }
        "list_tasks" => {
            let args: ListTasksArgs = match parse_args(name, arguments) {
                Ok(args) => args,
                Err(rejected) => return Ok(rejected),
            };
            let status = match args.status.as_deref().filter(|s| !s.trim().is_empty()) {
                Some(raw) => match raw.parse::<TaskStatus>() {
                    Ok(status) => Some(status),
                    Err(message) => {
                        return Ok(ToolResult::error_payload("VALIDATION_ERROR", message));
                    }
                },
                None => None,
            };
            let tasks = db.list_tasks(owner_id, status)?;
            Ok(ToolResult::new(serde_json::to_string(&tasks)?))
        }
        "complete_task" => {
            let args: TaskIdArgs = match parse_args(name, arguments) {
                Ok(args) => args,
                Err(rejected) => return Ok(rejected),
            };
            match db.toggle_task(owner_id, args.task_id)? {
                Some(task) => Ok(ToolResult::new(serde_json::to_string(&task)?)),
                None => Ok(task_not_found(args.task_id)),
            }
        }
        "delete_task" => {
            let args: TaskIdArgs = match parse_args(name, arguments) {
                Ok(args) => args,
                Err(rejected) => return Ok(rejected),
            };
            if db.delete_task(owner_id, args.task_id)? {
                Ok(ToolResult::new(
                    json!({
                        "success": true,
                        "message": format!("Task {} deleted successfully.", args.task_id)
                    })
                    .to_string(),
                ))
            } else {
                Ok(task_not_found(args.task_id))
            }
        }
        "update_task" => {
            let args: UpdateTaskArgs = match parse_args(name, arguments) {
                Ok(args) => args,
                Err(rejected) => return Ok(rejected),
            };
            if let Some(title) = &args.title
                && let Err(message) = normalize_title(title)
            {
                return Ok(ToolResult::error_payload("VALIDATION_ERROR", message));
            }
            let update = TaskUpdate {
                title: args.title,
                description: args.description,
                status: None,
            };
            match db.update_task(owner_id, args.task_id, &update)? {
                Some(task) => Ok(ToolResult::new(serde_json::to_string(&task)?)),
                None => Ok(task_not_found(args.task_id)),
            }
        }
        other => {
            warn!("tool host: unknown tool '{}'", other);
            Ok(ToolResult::error_payload(
                "UNKNOWN_TOOL",
                format!("Unknown tool: {}", other),
            ))
        }
    }
}

fn parse_args<T: DeserializeOwned>(
    tool: &str,
    arguments: Map<String, Value>,
) -> Result<T, ToolResult> {
    serde_json::from_value(Value::Object(arguments)).map_err(|e| {
        ToolResult::error_payload(
            "INVALID_ARGUMENTS",
            format!("Invalid arguments for {}: {}", tool, e),
        )
    })
}

fn task_not_found(task_id: i64) -> ToolResult {
    ToolResult::error_payload("NOT_FOUND", format!("Task with ID {} not found.", task_id))
}
