//! Message dispatch between extension contexts
//!
//! Every request the popup, options page or content scripts can send is a
//! variant of [`Request`]. [`Dispatcher::handle`] is the single place they are
//! routed, and it always answers with a JSON value.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::browser::page::truncate_chars;
use crate::browser::{ElementInfo, PageAction, PageOutcome, ScrollBehavior, TabId};
use crate::cloud::prompts::{self, MAX_SUMMARY_INPUT};
use crate::commands::classifier::classify_github;
use crate::commands::{
    ClassifiedAction, CommandExecutor, ExecutionContext, ExecutionResult, ScrollDirection, NOT_RECOGNIZED,
};
use crate::error::JarvisError;

/// Keys returned by `getSettings` when none are named
const DEFAULT_SETTING_KEYS: [&str; 2] = ["enabled", "language"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    /// Log a command that was handled elsewhere
    ExecuteCommand { command: String },
    GetSettings { keys: Option<Vec<String>> },
    UpdateSettings { settings: Map<String, Value> },
    Chat { message: String },
    Summarize { content: String },
    GenerateEmail {
        prompt: String,
        recipient: Option<String>,
        subject: Option<String>,
    },
    ExplainElement {
        element_info: ElementInfo,
        page_url: Option<String>,
        page_title: Option<String>,
    },
    Scroll { direction: ScrollDirection },
    Click { selector: String },
    Type { selector: String, text: String },
    GetPageInfo,
    GithubCommand { command: String },
    /// Classify and execute a command
    ProcessCommand { command: String },
    QueryGemini { prompt: String },
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::ExecuteCommand { .. } => "executeCommand",
            Request::GetSettings { .. } => "getSettings",
            Request::UpdateSettings { .. } => "updateSettings",
            Request::Chat { .. } => "chat",
            Request::Summarize { .. } => "summarize",
            Request::GenerateEmail { .. } => "generateEmail",
            Request::ExplainElement { .. } => "explainElement",
            Request::Scroll { .. } => "scroll",
            Request::Click { .. } => "click",
            Request::Type { .. } => "type",
            Request::GetPageInfo => "getPageInfo",
            Request::GithubCommand { .. } => "githubCommand",
            Request::ProcessCommand { .. } => "processCommand",
            Request::QueryGemini { .. } => "queryGemini",
        }
    }
}

/// The tab a message came from, if any
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageSender {
    pub tab_id: Option<TabId>,
    pub url: Option<String>,
    pub title: Option<String>,
}

impl MessageSender {
    pub fn tab(tab_id: TabId, url: impl Into<String>) -> Self {
        Self {
            tab_id: Some(tab_id),
            url: Some(url.into()),
            title: None,
        }
    }
}

pub struct Dispatcher {
    executor: Arc<CommandExecutor>,
}

impl Dispatcher {
    pub fn new(executor: Arc<CommandExecutor>) -> Self {
        Self { executor }
    }

    /// Decode and handle a raw message. Unknown or malformed requests are answered
    /// with an error instead of being ignored.
    pub async fn handle_json(&self, message: Value, sender: &MessageSender) -> Value {
        match serde_json::from_value::<Request>(message) {
            Ok(request) => self.handle(request, sender).await,
            Err(e) => {
                log::warn!("Rejected message: {}", e);
                json!({ "success": false, "error": format!("Invalid request: {}", e) })
            }
        }
    }

    pub async fn handle(&self, request: Request, sender: &MessageSender) -> Value {
        log::debug!("Handling {} message", request.name());

        match request {
            Request::ExecuteCommand { command } => {
                self.executor.record(command.trim(), sender.url.as_deref());
                json!({ "success": true })
            }

            Request::GetSettings { keys } => {
                let keys = keys.unwrap_or_else(|| DEFAULT_SETTING_KEYS.iter().map(|k| k.to_string()).collect());
                match self.executor.settings().get_keys(&keys) {
                    Ok(values) => Value::Object(values),
                    Err(e) => error_response(e),
                }
            }

            Request::UpdateSettings { settings } => match self.executor.settings().update(settings) {
                Ok(_) => json!({ "success": true }),
                Err(e) => error_response(e),
            },

            Request::Chat { message } => self.generate("response", &message).await,

            Request::QueryGemini { prompt } => self.generate("response", &prompt).await,

            Request::Summarize { content } => {
                let content = truncate_chars(&content, MAX_SUMMARY_INPUT);
                self.generate("summary", &prompts::summarize(&content)).await
            }

            Request::GenerateEmail {
                prompt,
                recipient,
                subject,
            } => {
                let prompt = prompts::email_body(&prompt, recipient.as_deref(), subject.as_deref());
                self.generate("email", &prompt).await
            }

            Request::ExplainElement {
                element_info,
                page_url,
                page_title,
            } => {
                let url = page_url.or_else(|| sender.url.clone()).unwrap_or_default();
                let title = page_title.or_else(|| sender.title.clone()).unwrap_or_default();
                let prompt = prompts::explain_element(&element_info, &url, &title);
                self.generate("explanation", &prompt).await
            }

            Request::Scroll { direction } => {
                let action = PageAction::ScrollBy {
                    top: direction.offset(),
                    behavior: ScrollBehavior::Smooth,
                };
                self.run_in_sender(action, sender).await
            }

            Request::Click { selector } => self.run_in_sender(PageAction::Click { selector }, sender).await,

            Request::Type { selector, text } => {
                self.run_in_sender(PageAction::Type { selector, text }, sender).await
            }

            Request::GetPageInfo => self.run_in_sender(PageAction::GetPageInfo, sender).await,

            Request::GithubCommand { command } => self.github_command(&command, sender).await,

            Request::ProcessCommand { command } => {
                let Some(tab_id) = sender.tab_id else {
                    return result_response(ExecutionResult::failure("No target tab"));
                };
                match self.executor.process(&command, tab_id, sender.url.as_deref()).await {
                    Ok(outcome) => {
                        let mut response = result_response(outcome.result);
                        response["action"] = json!(outcome.action);
                        response
                    }
                    Err(rejected) => result_response(rejected),
                }
            }
        }
    }

    /// Prompt Gemini and answer `{<field>: text}` or `{error}`
    async fn generate(&self, field: &str, prompt: &str) -> Value {
        let result = match self.executor.settings().load() {
            Ok(settings) => self.executor.ask(&settings, prompt).await,
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(text) => json!({ field: text }),
            Err(e) => error_response(e),
        }
    }

    async fn run_in_sender(&self, action: PageAction, sender: &MessageSender) -> Value {
        let Some(tab_id) = sender.tab_id else {
            return result_response(ExecutionResult::failure("No target tab"));
        };

        match self.executor.services().browser.execute_in_page(tab_id, action).await {
            Ok(PageOutcome::PageInfo(info)) => json!(info),
            Ok(_) => json!({ "success": true }),
            Err(e) => {
                log::warn!("Page action failed: {}", e);
                result_response(ExecutionResult::failure(e.to_string()))
            }
        }
    }

    async fn github_command(&self, command: &str, sender: &MessageSender) -> Value {
        let Some(tab_id) = sender.tab_id else {
            return result_response(ExecutionResult::failure("No target tab"));
        };

        let normalized = command.trim().to_lowercase();
        let Some(kind) = classify_github(&normalized) else {
            return result_response(ExecutionResult::failure(NOT_RECOGNIZED));
        };

        let settings = match self.executor.settings().load() {
            Ok(settings) => settings,
            Err(e) => return error_response(e),
        };

        let ctx = ExecutionContext {
            tab_id,
            page_url: sender.url.clone(),
            settings,
            command_text: command.trim().to_string(),
        };

        let result = self
            .executor
            .execute(&ClassifiedAction::GithubAction { kind }, &ctx)
            .await;
        result_response(result)
    }
}

fn result_response(result: ExecutionResult) -> Value {
    serde_json::to_value(&result).unwrap_or_else(|_| json!({ "success": result.success }))
}

fn error_response(err: impl Into<JarvisError>) -> Value {
    let err = err.into();
    json!({ "success": false, "error": err.to_string() })
}
