use serde::Deserialize;

// ─── Typed events ─────────────────────────────────────────────────────────

/// A parsed event from the agent's stream-json output.
///
/// One stdout line maps to zero or more events: blank lines, undecodable
/// lines, and lines with an unrecognised `type` map to none, and an
/// assistant message line maps to one event per content block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// `type = "system"`, `subtype = "init"` — the session has started.
    SessionInit,
    /// Assistant text output.
    Text(String),
    /// The assistant invoked a tool.
    ToolUse(ToolUse),
    /// Output of a tool execution, fed back to the assistant.
    ToolResult(ToolResult),
    /// `type = "result"` — the session is complete.
    SessionResult,
}

/// A tool invocation by the assistant. Which fields are populated depends on
/// the tool: shell tools carry `command`, file tools carry `file_path`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolUse {
    pub name: String,
    pub description: Option<String>,
    pub command: Option<String>,
    pub file_path: Option<String>,
}

/// The result of a tool execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolResult {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub interrupted: bool,
}

// ─── Wire format ──────────────────────────────────────────────────────────

/// One raw stream-json line, discriminated by the `type` field.
///
/// Only the fields this crate consumes are modelled; everything else in the
/// line is ignored by serde.
#[derive(Debug, Deserialize)]
pub(crate) struct RawEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub message: Option<RawMessage>,
    #[serde(default)]
    pub tool_use_result: Option<RawToolResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawMessage {
    #[serde(default)]
    pub content: Vec<RawBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum RawBlock {
    Text {
        text: String,
    },
    ToolUse {
        name: String,
        #[serde(default)]
        input: Option<RawToolInput>,
    },
    /// Any block type we don't render (thinking, images, …).
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawToolInput {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawToolResult {
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub interrupted: bool,
}

impl RawEvent {
    /// Project a raw line into typed events, in block order.
    ///
    /// Unknown `type` values produce an empty vec: they are tolerated, not
    /// errors, because the CLI grows new message types over time.
    pub(crate) fn into_events(self) -> Vec<AgentEvent> {
        match self.kind.as_str() {
            "system" => {
                if self.subtype.as_deref() == Some("init") {
                    vec![AgentEvent::SessionInit]
                } else {
                    Vec::new()
                }
            }
            "assistant" => {
                let Some(message) = self.message else {
                    return Vec::new();
                };
                message
                    .content
                    .into_iter()
                    .filter_map(|block| match block {
                        RawBlock::Text { text } if !text.is_empty() => {
                            Some(AgentEvent::Text(text))
                        }
                        RawBlock::ToolUse { name, input } => {
                            let input = input.unwrap_or(RawToolInput {
                                description: None,
                                command: None,
                                file_path: None,
                            });
                            Some(AgentEvent::ToolUse(ToolUse {
                                name,
                                description: input.description,
                                command: input.command,
                                file_path: input.file_path,
                            }))
                        }
                        _ => None,
                    })
                    .collect()
            }
            "user" => match self.tool_use_result {
                Some(r) => vec![AgentEvent::ToolResult(ToolResult {
                    stdout: r.stdout,
                    stderr: r.stderr,
                    interrupted: r.interrupted,
                })],
                None => Vec::new(),
            },
            "result" => vec![AgentEvent::SessionResult],
            _ => Vec::new(),
        }
    }
}

impl AgentEvent {
    /// True for assistant text events. Used by callers that accumulate the
    /// agent's prose (e.g. the status-fallback resolver).
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AgentEvent::Text(t) => Some(t),
            _ => None,
        }
    }
}
