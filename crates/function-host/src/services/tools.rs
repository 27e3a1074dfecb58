//! Tool dispatch for `POST /api/tools/{tool_name}`.
//!
//! Tools always answer with text. Tool-level problems (missing arguments,
//! unknown snippet) are reported inside that text, like an MCP tool would;
//! only an unknown tool name is an HTTP-level error.

use crate::services::clock;
use crate::services::snippets::SnippetStore;
use crate::services::weather;
use serde_json::{json, Map, Value};

pub const SNIPPET_NAME_ARGUMENT: &str = "snippetname";
pub const SNIPPET_CONTENT_ARGUMENT: &str = "snippet";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    HelloMcp,
    GetSnippet,
    SaveSnippet,
    GetCurrentTime,
    GetWeatherInfo,
}

impl Tool {
    pub const ALL: [Tool; 5] = [
        Tool::HelloMcp,
        Tool::GetSnippet,
        Tool::SaveSnippet,
        Tool::GetCurrentTime,
        Tool::GetWeatherInfo,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Tool::HelloMcp => "hello_mcp",
            Tool::GetSnippet => "get_snippet",
            Tool::SaveSnippet => "save_snippet",
            Tool::GetCurrentTime => "get_current_time",
            Tool::GetWeatherInfo => "get_weather_info",
        }
    }
}

/// Run `tool` with `arguments` and return its text result.
pub async fn invoke(tool: Tool, arguments: &Map<String, Value>, snippets: &dyn SnippetStore) -> String {
    tracing::debug!(target: "fh.services.tools", tool = tool.name(), "Invoking tool");

    match tool {
        Tool::HelloMcp => "Hello I am MCPTool!".to_string(),
        Tool::GetSnippet => get_snippet(arguments, snippets).await,
        Tool::SaveSnippet => save_snippet(arguments, snippets).await,
        Tool::GetCurrentTime => {
            let timezone = string_argument(arguments, "timezone").unwrap_or("UTC");
            let format = string_argument(arguments, "format").unwrap_or("iso");
            to_pretty_json(&clock::current_time(timezone, format), "Failed to get current time")
        }
        Tool::GetWeatherInfo => {
            let location =
                string_argument(arguments, "location").unwrap_or(weather::DEFAULT_LOCATION);
            let date = string_argument(arguments, "date");
            to_pretty_json(
                &weather::weather_info(location, date),
                "Failed to get weather information",
            )
        }
    }
}

async fn get_snippet(arguments: &Map<String, Value>, snippets: &dyn SnippetStore) -> String {
    let Some(name) = non_empty_argument(arguments, SNIPPET_NAME_ARGUMENT) else {
        return error_text("No snippet name provided");
    };

    match snippets.get(name).await {
        Ok(Some(content)) => {
            tracing::info!(target: "fh.services.tools", snippet = %name, "Retrieved snippet");
            content
        }
        Ok(None) => error_text(&format!("Snippet '{name}' not found")),
        Err(e) => {
            tracing::warn!(target: "fh.services.tools", error = %e, "Failed to read snippet");
            error_text(&e.to_string())
        }
    }
}

async fn save_snippet(arguments: &Map<String, Value>, snippets: &dyn SnippetStore) -> String {
    let Some(name) = non_empty_argument(arguments, SNIPPET_NAME_ARGUMENT) else {
        return "No snippet name provided".to_string();
    };
    let Some(content) = non_empty_argument(arguments, SNIPPET_CONTENT_ARGUMENT) else {
        return "No snippet content provided".to_string();
    };

    match snippets.save(name, content).await {
        Ok(()) => {
            tracing::info!(target: "fh.services.tools", snippet = %name, "Saved snippet");
            format!("Snippet '{name}' saved successfully")
        }
        Err(e) => {
            tracing::warn!(target: "fh.services.tools", error = %e, "Failed to save snippet");
            error_text(&e.to_string())
        }
    }
}

fn string_argument<'a>(arguments: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    arguments.get(key).and_then(Value::as_str)
}

fn non_empty_argument<'a>(arguments: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    string_argument(arguments, key).filter(|value| !value.is_empty())
}

fn error_text(message: &str) -> String {
    json!({ "error": message }).to_string()
}

fn to_pretty_json<T: serde::Serialize>(value: &T, failure: &str) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        tracing::error!(target: "fh.services.tools", error = %e, "{}", failure);
        serde_json::to_string_pretty(&json!({"error": failure, "details": e.to_string()}))
            .unwrap_or_else(|_| error_text(failure))
    })
}
