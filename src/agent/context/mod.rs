use crate::providers::base::{Message, ToolCallRequest};
use crate::store::{MessageRole, StoredMessage};
use chrono::{DateTime, Local, TimeZone};
use tracing::debug;

/// Assembles the transcript sent to the completion service.
///
/// The transcript is always one system message, then persisted history in
/// creation order, then whatever tool exchange happens in-loop.
pub struct ContextBuilder;

impl ContextBuilder {
    pub fn system_prompt<Tz: TimeZone>(now: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        format!(
            "You are a helpful task assistant. Today is {}. \
             You can manage the user's tasks using the available tools: \
             add, list, complete, update and delete them. \
             When a tool reports an error, explain it plainly to the user.",
            now.format("%A, %B %d, %Y")
        )
    }

    pub fn build_messages(history: &[StoredMessage]) -> Vec<Message> {
        Self::build_messages_at(history, &Local::now())
    }

    pub fn build_messages_at<Tz: TimeZone>(
        history: &[StoredMessage],
        now: &DateTime<Tz>,
    ) -> Vec<Message>
    where
        Tz::Offset: std::fmt::Display,
    {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(Self::system_prompt(now)));
        for stored in history {
            let msg = match stored.role {
                MessageRole::User => Message::user(&stored.content),
                MessageRole::Assistant => Message::assistant(&stored.content, None),
                // A tool message needs the assistant tool_calls entry it answers,
                // which is not persisted; replay the output as assistant context.
                MessageRole::Tool => {
                    debug!(
                        "replaying stored tool message {} as assistant context",
                        stored.id
                    );
                    Message::assistant(&stored.content, None)
                }
            };
            messages.push(msg);
        }
        messages
    }

    pub fn add_assistant_message(
        messages: &mut Vec<Message>,
        content: Option<&str>,
        tool_calls: Option<Vec<ToolCallRequest>>,
    ) {
        messages.push(Message::assistant(content.unwrap_or(""), tool_calls));
    }

    pub fn add_tool_result(
        messages: &mut Vec<Message>,
        tool_call_id: &str,
        result: &str,
        is_error: bool,
    ) {
        messages.push(Message::tool_result(tool_call_id, result, is_error));
    }
}

#[cfg(test)]
mod tests;
