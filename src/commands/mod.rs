//! Command execution for Jarvis
//!
//! A finalized utterance becomes a [`Command`], is classified into a
//! [`ClassifiedAction`] and executed against the browser and provider clients.
//! Every path ends in an [`ExecutionResult`]; errors never escape `execute`.

pub mod classifier;

pub use classifier::{
    classify, extract_url, search_url, ClassifiedAction, GithubActionKind, PageContext, ScrollDirection,
    TabControlKind,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::browser::{Browser, BrowserError, OpenEmail, PageAction, PageOutcome, ScrollBehavior, TabId};
use crate::cloud::prompts::{self, MAX_SUMMARY_INPUT};
use crate::cloud::TextGenerator;
use crate::config::{Settings, SettingsStore};
use crate::error::JarvisError;
use crate::history::HistoryEntry;
use crate::integrations::{IssueTracker, MailSender, OutgoingEmail, RepoRef};

pub const NOT_RECOGNIZED: &str = "Command not recognized";
pub const NOT_ON_REPOSITORY: &str = "Not on a recognized repository page";
pub const BUSY_MESSAGE: &str = "Another command is still running";

/// A finalized utterance or typed command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: Uuid,
    pub raw_text: String,
    pub normalized_text: String,
    pub timestamp: DateTime<Utc>,
    pub source_tab_id: TabId,
}

impl Command {
    pub fn new(raw_text: impl Into<String>, source_tab_id: TabId) -> Self {
        let raw_text = raw_text.into();
        Self {
            id: Uuid::new_v4(),
            normalized_text: raw_text.trim().to_lowercase(),
            raw_text,
            timestamp: Utc::now(),
            source_tab_id,
        }
    }
}

/// Command result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ExecutionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            payload: None,
        }
    }

    pub fn ok_with(message: impl Into<String>, payload: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            payload: Some(payload),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            payload: None,
        }
    }
}

/// Collaborators the executor talks to
#[derive(Clone)]
pub struct Services {
    pub browser: Arc<dyn Browser>,
    pub gemini: Arc<dyn TextGenerator>,
    pub mail: Arc<dyn MailSender>,
    pub github: Arc<dyn IssueTracker>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutorOptions {
    /// Record unrecognized commands in the history log too
    pub log_unrecognized: bool,
}

/// Where a command runs and with which settings
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub tab_id: TabId,
    pub page_url: Option<String>,
    pub settings: Settings,
    /// Text recorded in the history log
    pub command_text: String,
}

/// Everything produced by one command cycle
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    pub command: Command,
    pub action: ClassifiedAction,
    pub result: ExecutionResult,
}

pub struct CommandExecutor {
    services: Services,
    settings: SettingsStore,
    options: ExecutorOptions,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when the command finishes
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CommandExecutor {
    pub fn new(services: Services, settings: SettingsStore) -> Self {
        Self::with_options(services, settings, ExecutorOptions::default())
    }

    pub fn with_options(services: Services, settings: SettingsStore, options: ExecutorOptions) -> Self {
        Self {
            services,
            settings,
            options,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// True while a command is running
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn begin(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(&self.in_flight))
    }

    /// Classify and execute raw command text issued from a tab. Rejected while
    /// another command is still running.
    pub async fn process(
        &self,
        raw_text: &str,
        tab_id: TabId,
        page_url: Option<&str>,
    ) -> Result<CommandOutcome, ExecutionResult> {
        let Some(_in_flight) = self.begin() else {
            log::warn!("Dropping '{}': {}", raw_text.trim(), BUSY_MESSAGE);
            return Err(ExecutionResult::failure(BUSY_MESSAGE));
        };

        let command = Command::new(raw_text, tab_id);
        let page = PageContext::from_url(page_url);
        let action = classify(&command.normalized_text, &page, tab_id);

        log::info!("Command '{}' classified as {}", command.normalized_text, action.name());

        let settings = match self.settings.load() {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("Failed to load settings: {}", e);
                return Ok(CommandOutcome {
                    command,
                    action,
                    result: ExecutionResult::failure(format!("Failed to load settings: {}", e)),
                });
            }
        };

        let ctx = ExecutionContext {
            tab_id,
            page_url: page_url.map(str::to_string),
            settings,
            command_text: command.raw_text.trim().to_string(),
        };

        let result = self.run(&action, &ctx).await;
        Ok(CommandOutcome { command, action, result })
    }

    /// Execute one classified action. Never fails; errors become failure results.
    pub async fn execute(&self, action: &ClassifiedAction, ctx: &ExecutionContext) -> ExecutionResult {
        let Some(_in_flight) = self.begin() else {
            log::warn!("Dropping {}: {}", action.name(), BUSY_MESSAGE);
            return ExecutionResult::failure(BUSY_MESSAGE);
        };

        self.run(action, ctx).await
    }

    async fn run(&self, action: &ClassifiedAction, ctx: &ExecutionContext) -> ExecutionResult {
        if action.is_recognized() || self.options.log_unrecognized {
            self.record(&ctx.command_text, ctx.page_url.as_deref());
        }

        match self.execute_action_internal(action, ctx).await {
            Ok(result) => {
                if result.success {
                    log::info!("{}: {}", action.name(), result.message);
                } else {
                    log::warn!("{} failed: {}", action.name(), result.message);
                }
                result
            }
            Err(e) => {
                log::warn!("{} failed: {}", action.name(), e);
                ExecutionResult::failure(e.to_string())
            }
        }
    }

    /// Add a command to the history log. Failures are logged, not surfaced.
    pub fn record(&self, command_text: &str, page_url: Option<&str>) {
        let entry = HistoryEntry::new(command_text, page_url.map(str::to_string));
        if let Err(e) = self.settings.append_history(entry) {
            log::warn!("Failed to record command history: {}", e);
        }
    }

    /// Run a prompt through Gemini with the configured key
    pub async fn ask(&self, settings: &Settings, prompt: &str) -> Result<String, JarvisError> {
        let key = require_gemini(settings)?;
        Ok(self.services.gemini.generate(key, prompt).await?)
    }

    async fn execute_action_internal(
        &self,
        action: &ClassifiedAction,
        ctx: &ExecutionContext,
    ) -> Result<ExecutionResult, JarvisError> {
        let browser = &self.services.browser;

        match action {
            ClassifiedAction::Scroll { direction } => {
                browser
                    .execute_in_page(
                        ctx.tab_id,
                        PageAction::ScrollBy {
                            top: direction.offset(),
                            behavior: ScrollBehavior::Smooth,
                        },
                    )
                    .await?;
                let label = match direction {
                    ScrollDirection::Up => "up",
                    ScrollDirection::Down => "down",
                };
                Ok(ExecutionResult::ok(format!("Scrolling {}", label)))
            }

            ClassifiedAction::Navigate { url } => {
                browser.navigate(ctx.tab_id, url).await?;
                Ok(ExecutionResult::ok_with(format!("Opening {}", url), json!({ "url": url })))
            }

            ClassifiedAction::TabControl { kind } => self.execute_tab_control(*kind, ctx.tab_id).await,

            ClassifiedAction::Search { query, url } => {
                let tab = browser.create_tab(Some(url)).await?;
                Ok(ExecutionResult::ok_with(
                    format!("Searching for {}", query),
                    json!({ "url": url, "tabId": tab }),
                ))
            }

            ClassifiedAction::AiChat { prompt } => {
                let response = self.ask(&ctx.settings, prompt).await?;
                Ok(ExecutionResult::ok_with(response.clone(), json!({ "response": response })))
            }

            ClassifiedAction::Summarize { target_tab } => {
                let key = require_gemini(&ctx.settings)?;
                let text = self.read_page_text(*target_tab).await?;
                if text.trim().is_empty() {
                    return Ok(ExecutionResult::failure("No readable text on this page"));
                }

                let summary = self.services.gemini.generate(key, &prompts::summarize(&text)).await?;
                Ok(ExecutionResult::ok_with(summary.clone(), json!({ "summary": summary })))
            }

            ClassifiedAction::SendEmail {
                recipient,
                subject,
                prompt,
            } => {
                let token = require_gmail(&ctx.settings)?;
                let key = require_gemini(&ctx.settings)?;

                let body = self
                    .services
                    .gemini
                    .generate(key, &prompts::email_body(prompt, Some(recipient), Some(subject)))
                    .await?;

                let email = OutgoingEmail::new(recipient.clone(), subject.clone(), body);
                self.services.mail.send(token, &email).await?;

                Ok(ExecutionResult::ok_with(
                    format!("Email sent to {}", email.to),
                    json!({ "email": email }),
                ))
            }

            ClassifiedAction::ReplyToEmail { target_tab } => {
                let token = require_gmail(&ctx.settings)?;
                let key = require_gemini(&ctx.settings)?;

                let original = self.read_open_email(*target_tab).await?;
                let body = self.services.gemini.generate(key, &prompts::reply(&original)).await?;

                let email = OutgoingEmail::new(original.sender.clone(), reply_subject(&original.subject), body);
                self.services.mail.send(token, &email).await?;

                Ok(ExecutionResult::ok_with(
                    format!("Reply sent to {}", email.to),
                    json!({ "email": email }),
                ))
            }

            ClassifiedAction::GithubAction { kind } => self.execute_github(kind, ctx).await,

            ClassifiedAction::Unrecognized { .. } => Ok(ExecutionResult::failure(NOT_RECOGNIZED)),
        }
    }

    async fn execute_tab_control(&self, kind: TabControlKind, tab: TabId) -> Result<ExecutionResult, JarvisError> {
        let browser = &self.services.browser;

        let message = match kind {
            TabControlKind::GoBack => {
                browser.go_back(tab).await?;
                "Going back"
            }
            TabControlKind::GoForward => {
                browser.go_forward(tab).await?;
                "Going forward"
            }
            TabControlKind::Reload => {
                browser.reload(tab).await?;
                "Reloading page"
            }
            TabControlKind::NewTab => {
                let new_tab = browser.create_tab(None).await?;
                return Ok(ExecutionResult::ok_with("Opened new tab", json!({ "tabId": new_tab })));
            }
            TabControlKind::CloseTab => {
                browser.close_tab(tab).await?;
                "Closed tab"
            }
        };

        Ok(ExecutionResult::ok(message))
    }

    // ============ GitHub ============

    async fn execute_github(
        &self,
        kind: &GithubActionKind,
        ctx: &ExecutionContext,
    ) -> Result<ExecutionResult, JarvisError> {
        let Some(repo) = ctx.page_url.as_deref().and_then(RepoRef::from_page_url) else {
            return Ok(ExecutionResult::failure(NOT_ON_REPOSITORY));
        };

        let browser = &self.services.browser;
        let github = &self.services.github;

        match kind {
            GithubActionKind::CreateIssue { title: None } => {
                let url = format!("{}/issues/new", repo.web_url());
                browser.create_tab(Some(&url)).await?;
                Ok(ExecutionResult::ok_with("Opening issue creation page", json!({ "url": url })))
            }

            GithubActionKind::ShowIssues => {
                let url = format!("{}/issues", repo.web_url());
                browser.navigate(ctx.tab_id, &url).await?;
                Ok(ExecutionResult::ok_with("Navigating to issues", json!({ "url": url })))
            }

            GithubActionKind::CreateIssue { title: Some(title) } => {
                let token = require_github(&ctx.settings)?;
                let issue = github.create_issue(token, &repo, title, "", &[]).await?;
                Ok(ExecutionResult::ok_with(
                    format!("Created issue #{}", issue.number),
                    json!({ "issue": issue }),
                ))
            }

            GithubActionKind::Star => {
                let token = require_github(&ctx.settings)?;
                github.star(token, &repo).await?;
                Ok(ExecutionResult::ok("Repository starred!"))
            }

            GithubActionKind::Fork => {
                let token = require_github(&ctx.settings)?;
                let fork = github.fork(token, &repo).await?;
                Ok(ExecutionResult::ok_with("Repository forked!", json!({ "repository": fork })))
            }

            GithubActionKind::ListIssues => {
                let token = require_github(&ctx.settings)?;
                let issues = github.list_issues(token, &repo, "open").await?;
                Ok(ExecutionResult::ok_with(
                    format!("{} open issues in {}/{}", issues.len(), repo.owner, repo.repo),
                    json!({ "issues": issues }),
                ))
            }

            GithubActionKind::Comment { issue_number, body } => {
                let token = require_github(&ctx.settings)?;
                let comment = github.comment(token, &repo, *issue_number, body).await?;
                Ok(ExecutionResult::ok_with(
                    format!("Commented on issue #{}", issue_number),
                    json!({ "comment": comment }),
                ))
            }
        }
    }

    // ============ Page reads ============

    async fn read_page_text(&self, tab: TabId) -> Result<String, JarvisError> {
        let outcome = self
            .services
            .browser
            .execute_in_page(tab, PageAction::ReadText { max_chars: MAX_SUMMARY_INPUT })
            .await?;

        match outcome {
            PageOutcome::Text(text) => Ok(text),
            _ => Err(BrowserError::UnexpectedOutcome("readText").into()),
        }
    }

    async fn read_open_email(&self, tab: TabId) -> Result<OpenEmail, JarvisError> {
        match self.services.browser.execute_in_page(tab, PageAction::ReadEmail).await? {
            PageOutcome::Email(email) => Ok(email),
            _ => Err(BrowserError::UnexpectedOutcome("readEmail").into()),
        }
    }
}

fn require_gemini(settings: &Settings) -> Result<&str, JarvisError> {
    settings.gemini_key().ok_or(JarvisError::Configuration("Gemini"))
}

fn require_gmail(settings: &Settings) -> Result<&str, JarvisError> {
    settings.gmail_token().ok_or(JarvisError::Configuration("Gmail"))
}

fn require_github(settings: &Settings) -> Result<&str, JarvisError> {
    settings.github_token().ok_or(JarvisError::Configuration("GitHub"))
}

fn reply_subject(subject: &str) -> String {
    if subject.to_lowercase().starts_with("re:") {
        subject.to_string()
    } else {
        format!("Re: {}", subject)
    }
}
