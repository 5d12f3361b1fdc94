//! Hand-written collaborators for unit tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::browser::page::truncate_chars;
use crate::browser::{
    Browser, BrowserError, Dom, ElementSnapshot, OpenEmail, PageAction, PageInfo, PageOutcome,
    ScrollBehavior, TabId,
};
use crate::cloud::{ApiError, TextGenerator};
use crate::commands::Services;
use crate::integrations::{Issue, IssueComment, IssueTracker, MailSender, OutgoingEmail, RepoRef, Repository, SentMessage};

// ============ Page side ============

pub struct FakeDom {
    info: PageInfo,
    elements: HashMap<String, ElementSnapshot>,
    pub body: String,
    pub scrolls: Vec<(i32, ScrollBehavior)>,
    pub clicks: Vec<String>,
    pub values: HashMap<String, String>,
    pub events: Vec<(String, String)>,
}

impl FakeDom {
    pub fn new(url: &str, title: &str) -> Self {
        let domain = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();

        Self {
            info: PageInfo {
                title: title.to_string(),
                url: url.to_string(),
                domain,
            },
            elements: HashMap::new(),
            body: String::new(),
            scrolls: Vec::new(),
            clicks: Vec::new(),
            values: HashMap::new(),
            events: Vec::new(),
        }
    }

    pub fn add_element(&mut self, selector: &str, element: ElementSnapshot) {
        self.elements.insert(selector.to_string(), element);
    }
}

impl Dom for FakeDom {
    fn scroll_by(&mut self, top: i32, behavior: ScrollBehavior) {
        self.scrolls.push((top, behavior));
    }

    fn page_info(&self) -> PageInfo {
        self.info.clone()
    }

    fn body_text(&self) -> String {
        self.body.clone()
    }

    fn element(&self, selector: &str) -> Option<ElementSnapshot> {
        self.elements.get(selector).cloned()
    }

    fn click(&mut self, selector: &str) -> bool {
        if !self.elements.contains_key(selector) {
            return false;
        }
        self.clicks.push(selector.to_string());
        true
    }

    fn set_value(&mut self, selector: &str, value: &str) -> bool {
        if !self.elements.contains_key(selector) {
            return false;
        }
        self.values.insert(selector.to_string(), value.to_string());
        true
    }

    fn dispatch_event(&mut self, selector: &str, event: &str) {
        self.events.push((selector.to_string(), event.to_string()));
    }
}

// ============ Browser ============

#[derive(Debug, Clone, PartialEq)]
pub enum BrowserCall {
    Page(TabId, PageAction),
    Navigate(TabId, String),
    GoBack(TabId),
    GoForward(TabId),
    Reload(TabId),
    CreateTab(Option<String>),
    CloseTab(TabId),
}

#[derive(Default)]
pub struct MockBrowser {
    pub calls: Mutex<Vec<BrowserCall>>,
    pub page_text: String,
    pub page_info: Option<PageInfo>,
    pub open_email: Option<OpenEmail>,
    pub fail_with: Option<BrowserError>,
    /// Simulated latency of every call
    pub delay: Option<Duration>,
}

impl MockBrowser {
    pub fn calls(&self) -> Vec<BrowserCall> {
        self.calls.lock().unwrap().clone()
    }

    async fn record(&self, call: BrowserCall) -> Result<(), BrowserError> {
        self.calls.lock().unwrap().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Browser for MockBrowser {
    async fn execute_in_page(&self, tab: TabId, action: PageAction) -> Result<PageOutcome, BrowserError> {
        self.record(BrowserCall::Page(tab, action.clone())).await?;

        match action {
            PageAction::ReadText { max_chars } => Ok(PageOutcome::Text(truncate_chars(&self.page_text, max_chars))),
            PageAction::ReadEmail => self
                .open_email
                .clone()
                .map(PageOutcome::Email)
                .ok_or_else(|| BrowserError::ElementNotFound("span.gD".to_string())),
            PageAction::GetPageInfo => self
                .page_info
                .clone()
                .map(PageOutcome::PageInfo)
                .ok_or(BrowserError::TabNotFound(tab)),
            PageAction::InspectElement { selector } => Err(BrowserError::ElementNotFound(selector)),
            _ => Ok(PageOutcome::Done),
        }
    }

    async fn navigate(&self, tab: TabId, url: &str) -> Result<(), BrowserError> {
        self.record(BrowserCall::Navigate(tab, url.to_string())).await
    }

    async fn go_back(&self, tab: TabId) -> Result<(), BrowserError> {
        self.record(BrowserCall::GoBack(tab)).await
    }

    async fn go_forward(&self, tab: TabId) -> Result<(), BrowserError> {
        self.record(BrowserCall::GoForward(tab)).await
    }

    async fn reload(&self, tab: TabId) -> Result<(), BrowserError> {
        self.record(BrowserCall::Reload(tab)).await
    }

    async fn create_tab(&self, url: Option<&str>) -> Result<TabId, BrowserError> {
        self.record(BrowserCall::CreateTab(url.map(str::to_string))).await?;
        Ok(99)
    }

    async fn close_tab(&self, tab: TabId) -> Result<(), BrowserError> {
        self.record(BrowserCall::CloseTab(tab)).await
    }
}

// ============ Providers ============

pub struct MockGemini {
    pub prompts: Mutex<Vec<String>>,
    pub reply: Result<String, ApiError>,
}

impl MockGemini {
    pub fn replying(text: &str) -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            reply: Ok(text.to_string()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for MockGemini {
    async fn generate(&self, _api_key: &str, prompt: &str) -> Result<String, ApiError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone()
    }
}

#[derive(Default)]
pub struct MockMail {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    pub fail_with: Option<ApiError>,
}

impl MockMail {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailSender for MockMail {
    async fn send(&self, _auth_token: &str, email: &OutgoingEmail) -> Result<SentMessage, ApiError> {
        self.sent.lock().unwrap().push(email.clone());
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        Ok(SentMessage {
            id: "msg-1".to_string(),
            thread_id: None,
        })
    }
}

#[derive(Default)]
pub struct MockGithub {
    pub calls: Mutex<Vec<String>>,
    pub fail_with: Option<ApiError>,
}

impl MockGithub {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(call);
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn issue(repo: &RepoRef, number: u64, title: &str) -> Issue {
    Issue {
        number,
        title: title.to_string(),
        html_url: format!("{}/issues/{}", repo.web_url(), number),
        state: "open".to_string(),
    }
}

#[async_trait]
impl IssueTracker for MockGithub {
    async fn create_issue(
        &self,
        _token: &str,
        repo: &RepoRef,
        title: &str,
        _body: &str,
        _labels: &[String],
    ) -> Result<Issue, ApiError> {
        self.record(format!("create_issue {}/{} {}", repo.owner, repo.repo, title))?;
        Ok(issue(repo, 42, title))
    }

    async fn list_issues(&self, _token: &str, repo: &RepoRef, state: &str) -> Result<Vec<Issue>, ApiError> {
        self.record(format!("list_issues {}/{} {}", repo.owner, repo.repo, state))?;
        Ok(vec![issue(repo, 1, "First"), issue(repo, 2, "Second")])
    }

    async fn comment(
        &self,
        _token: &str,
        repo: &RepoRef,
        issue_number: u64,
        body: &str,
    ) -> Result<IssueComment, ApiError> {
        self.record(format!("comment {}/{}#{} {}", repo.owner, repo.repo, issue_number, body))?;
        Ok(IssueComment {
            id: 500,
            html_url: format!("{}/issues/{}#issuecomment-500", repo.web_url(), issue_number),
        })
    }

    async fn star(&self, _token: &str, repo: &RepoRef) -> Result<(), ApiError> {
        self.record(format!("star {}/{}", repo.owner, repo.repo))
    }

    async fn fork(&self, _token: &str, repo: &RepoRef) -> Result<Repository, ApiError> {
        self.record(format!("fork {}/{}", repo.owner, repo.repo))?;
        Ok(Repository {
            full_name: format!("me/{}", repo.repo),
            html_url: format!("https://github.com/me/{}", repo.repo),
        })
    }
}

/// Mock collaborators plus the `Services` bundle that shares them
pub struct Harness {
    pub browser: Arc<MockBrowser>,
    pub gemini: Arc<MockGemini>,
    pub mail: Arc<MockMail>,
    pub github: Arc<MockGithub>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(MockBrowser::default(), MockGemini::replying("generated text"))
    }

    pub fn with(browser: MockBrowser, gemini: MockGemini) -> Self {
        Self {
            browser: Arc::new(browser),
            gemini: Arc::new(gemini),
            mail: Arc::new(MockMail::default()),
            github: Arc::new(MockGithub::default()),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            browser: self.browser.clone(),
            gemini: self.gemini.clone(),
            mail: self.mail.clone(),
            github: self.github.clone(),
        }
    }

    /// Calls that would have gone out over HTTP
    pub fn provider_calls(&self) -> usize {
        self.gemini.prompts().len() + self.mail.sent().len() + self.github.calls().len()
    }
}
