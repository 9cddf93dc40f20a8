use serde::Deserialize;
use serde_json::Value;

use crate::util::compact_snippet;

/// One decoded line of a session log.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

impl LogEntry {
    #[must_use]
    pub fn event_kind(&self) -> EventKind {
        EventKind::from_tag(self.kind.as_deref().unwrap_or_default())
    }
}

/// Top-level record discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    SessionMeta,
    ResponseItem,
    EventMsg,
    Unrecognized,
}

impl EventKind {
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "session_meta" => Self::SessionMeta,
            "response_item" => Self::ResponseItem,
            "event_msg" => Self::EventMsg,
            _ => Self::Unrecognized,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionMeta {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ResponseItem {
    #[serde(rename = "type")]
    kind: Option<String>,
    role: Option<String>,
    content: Option<Vec<MessageContent>>,
    name: Option<String>,
    arguments: Option<String>,
    output: Option<String>,
    summary: Option<Vec<MessageContent>>,
    error: Option<ResponseError>,
    title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ResponseError {
    message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct MessageContent {
    text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct EventMsg {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ShellArguments {
    command: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FunctionOutput {
    output: Option<String>,
    metadata: Option<OutputMetadata>,
    exit_code: Option<i64>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OutputMetadata {
    exit_code: Option<i64>,
}

/// Produce a short synopsis for an event, or `None` when it is not describable.
///
/// Payloads that do not match the shape expected for their kind are treated as
/// not describable.
#[must_use]
pub fn describe(kind: EventKind, payload: &Value) -> Option<String> {
    let description = match kind {
        EventKind::ResponseItem => ResponseItem::deserialize(payload)
            .ok()
            .and_then(|item| describe_response_item(&item)),
        EventKind::EventMsg => EventMsg::deserialize(payload)
            .ok()
            .and_then(|msg| describe_event_msg(&msg)),
        EventKind::SessionMeta | EventKind::Unrecognized => None,
    };
    description.filter(|text| !text.is_empty())
}

fn describe_response_item(item: &ResponseItem) -> Option<String> {
    match item.kind.as_deref().unwrap_or_default() {
        "message" => {
            let text = first_non_empty_text(item.content.as_deref())
                .or_else(|| first_non_empty_text(item.summary.as_deref()))
                .or_else(|| non_blank(item.title.as_deref()))?;
            let role = item.role.as_deref().unwrap_or_default().trim();
            if role.is_empty() {
                Some(compact_snippet(text))
            } else {
                Some(format!("{role}: {}", compact_snippet(text)))
            }
        }
        "reasoning" => {
            let text = first_non_empty_text(item.summary.as_deref())
                .or_else(|| first_non_empty_text(item.content.as_deref()))?;
            Some(format!("reasoning: {}", compact_snippet(text)))
        }
        "function_call" => {
            let name = item.name.as_deref().unwrap_or_default();
            let mut desc = format!("call {name}");
            if let Some(args) = describe_arguments(name, item.arguments.as_deref()) {
                desc.push(' ');
                desc.push_str(&args);
            }
            Some(desc)
        }
        "function_call_output" => Some(describe_function_output(item)),
        _ => non_blank(item.title.as_deref()).map(compact_snippet),
    }
}

fn describe_arguments(name: &str, raw: Option<&str>) -> Option<String> {
    let raw = raw.filter(|raw| !raw.is_empty())?;
    match name {
        "shell" => {
            let call: ShellArguments = serde_json::from_str(raw).ok()?;
            if call.command.is_empty() {
                return None;
            }
            let snippet = compact_snippet(&call.command.join(" "));
            (!snippet.is_empty()).then_some(snippet)
        }
        _ => None,
    }
}

fn describe_function_output(item: &ResponseItem) -> String {
    let name = item.name.as_deref().unwrap_or_default();
    let Some(raw) = item.output.as_deref().filter(|raw| !raw.is_empty()) else {
        if let Some(message) = item
            .error
            .as_ref()
            .and_then(|error| non_blank(error.message.as_deref()))
        {
            return format!("call {name} error: {}", compact_snippet(message));
        }
        return format!("call {name} completed");
    };

    let Ok(out) = serde_json::from_str::<FunctionOutput>(raw) else {
        return format!("call {name} output");
    };

    if let Some(error) = out.error.as_deref().filter(|error| !error.is_empty()) {
        return format!("call {name} error: {}", compact_snippet(error));
    }

    let exit_code = out
        .metadata
        .as_ref()
        .and_then(|metadata| metadata.exit_code)
        .or(out.exit_code);
    let snippet = compact_snippet(out.output.as_deref().unwrap_or_default());
    match exit_code {
        Some(code) if snippet.is_empty() => format!("call {name} exit {code}"),
        Some(code) => format!("call {name} exit {code}: {snippet}"),
        None if snippet.is_empty() => format!("call {name} completed"),
        None => format!("call {name}: {snippet}"),
    }
}

fn describe_event_msg(msg: &EventMsg) -> Option<String> {
    let kind = msg.kind.as_deref().unwrap_or_default();
    let message = msg.message.as_deref().filter(|text| !text.is_empty());
    match kind {
        "user_message" | "assistant_message" | "system_message" => {
            let text = message.or_else(|| msg.text.as_deref().filter(|text| !text.is_empty()))?;
            return Some(format!("{kind}: {}", compact_snippet(text)));
        }
        "tool_progress" => {
            if let Some(message) = message {
                return Some(format!("tool progress: {}", compact_snippet(message)));
            }
        }
        "token_count" => return Some("token usage updated".to_string()),
        "command_output" => {
            if let Some(message) = message {
                return Some(format!("command output: {}", compact_snippet(message)));
            }
        }
        _ => {}
    }

    match message {
        Some(message) => Some(format!("{kind}: {}", compact_snippet(message))),
        None => Some(kind.to_string()),
    }
}

fn first_non_empty_text(items: Option<&[MessageContent]>) -> Option<&str> {
    items?
        .iter()
        .filter_map(|item| item.text.as_deref())
        .find(|text| !text.trim().is_empty())
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|text| !text.trim().is_empty())
}
