//! Rule-based command classification
//!
//! Maps a normalized utterance to exactly one action. Predicates are checked in
//! a fixed order and the first match wins; there is no scoring.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::browser::{TabId, SCROLL_STEP_PX};
use crate::integrations::github::is_github_host;

pub const DEFAULT_EMAIL_SUBJECT: &str = "Email from Jarvis";
pub const DEFAULT_EMAIL_PROMPT: &str = "Write a brief email";

const SEARCH_ENGINE_URL: &str = "https://www.google.com/search";

lazy_static! {
    static ref SEND_EMAIL: Regex =
        Regex::new(r"send email to (\S+@\S+)(?: with subject (.+?))?(?: and message (.+))?$").unwrap();
    static ref NAVIGATE: Regex = Regex::new(r"(?:open|go to|navigate)(?:\s+to)?\s+(\S+)").unwrap();
    static ref URL_TARGET: Regex = Regex::new(r"^([\w.-]+\.\w+|\w+)").unwrap();
    static ref CREATE_ISSUE_TITLED: Regex = Regex::new(r"create issue titled (.+)$").unwrap();
    static ref COMMENT_ON_ISSUE: Regex = Regex::new(r"comment on issue #?(\d+)\s+(.+)$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    /// Vertical offset in pixels
    pub fn offset(&self) -> i32 {
        match self {
            ScrollDirection::Up => -SCROLL_STEP_PX,
            ScrollDirection::Down => SCROLL_STEP_PX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TabControlKind {
    GoBack,
    GoForward,
    Reload,
    NewTab,
    CloseTab,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GithubActionKind {
    /// Without a title, the issue form is opened instead of calling the API
    CreateIssue { title: Option<String> },
    Star,
    Fork,
    ShowIssues,
    ListIssues,
    Comment { issue_number: u64, body: String },
}

/// What a command resolved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClassifiedAction {
    Scroll { direction: ScrollDirection },
    Navigate { url: String },
    TabControl { kind: TabControlKind },
    Search { query: String, url: String },
    AiChat { prompt: String },
    Summarize { target_tab: TabId },
    SendEmail { recipient: String, subject: String, prompt: String },
    ReplyToEmail { target_tab: TabId },
    GithubAction { kind: GithubActionKind },
    Unrecognized { raw_text: String },
}

impl ClassifiedAction {
    pub fn name(&self) -> &'static str {
        match self {
            ClassifiedAction::Scroll { .. } => "scroll",
            ClassifiedAction::Navigate { .. } => "navigate",
            ClassifiedAction::TabControl { .. } => "tab_control",
            ClassifiedAction::Search { .. } => "search",
            ClassifiedAction::AiChat { .. } => "ai_chat",
            ClassifiedAction::Summarize { .. } => "summarize",
            ClassifiedAction::SendEmail { .. } => "send_email",
            ClassifiedAction::ReplyToEmail { .. } => "reply_to_email",
            ClassifiedAction::GithubAction { .. } => "github_action",
            ClassifiedAction::Unrecognized { .. } => "unrecognized",
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, ClassifiedAction::Unrecognized { .. })
    }
}

/// The page a command was issued from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
    pub url: Option<String>,
    pub host: Option<String>,
    pub is_gmail: bool,
}

impl PageContext {
    pub fn from_url(url: Option<&str>) -> Self {
        let host = url
            .and_then(|u| url::Url::parse(u).ok())
            .and_then(|u| u.host_str().map(str::to_lowercase));

        Self {
            url: url.map(str::to_string),
            is_gmail: host.as_deref() == Some("mail.google.com"),
            host,
        }
    }

    pub fn is_github(&self) -> bool {
        self.host.as_deref().map(is_github_host).unwrap_or(false)
    }
}

/// Classify a normalized (trimmed, lower-cased) command.
pub fn classify(text: &str, page: &PageContext, source_tab: TabId) -> ClassifiedAction {
    if let Some(action) = classify_structured(text, page, source_tab) {
        return action;
    }

    if let Some(url) = extract_url(text) {
        return ClassifiedAction::Navigate { url };
    }

    if let Some(action) = classify_browser_control(text) {
        return action;
    }

    if let Some(query) = extract_search_query(text) {
        return ClassifiedAction::Search {
            url: search_url(&query),
            query,
        };
    }

    if text.contains("summarize") || text.contains("what is") || text.contains("explain") {
        return ClassifiedAction::AiChat {
            prompt: text.to_string(),
        };
    }

    if page.is_github() {
        if let Some(kind) = classify_github(text) {
            return ClassifiedAction::GithubAction { kind };
        }
    }

    ClassifiedAction::Unrecognized {
        raw_text: text.to_string(),
    }
}

fn classify_structured(text: &str, page: &PageContext, source_tab: TabId) -> Option<ClassifiedAction> {
    if let Some(caps) = SEND_EMAIL.captures(text) {
        let field = |i: usize, default: &str| {
            caps.get(i)
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        return Some(ClassifiedAction::SendEmail {
            recipient: caps[1].to_string(),
            subject: field(2, DEFAULT_EMAIL_SUBJECT),
            prompt: field(3, DEFAULT_EMAIL_PROMPT),
        });
    }

    if page.is_gmail && text.contains("reply to this email") {
        return Some(ClassifiedAction::ReplyToEmail { target_tab: source_tab });
    }

    if text.contains("summarize this page") {
        return Some(ClassifiedAction::Summarize { target_tab: source_tab });
    }

    None
}

fn classify_browser_control(text: &str) -> Option<ClassifiedAction> {
    let action = if text.contains("scroll down") {
        ClassifiedAction::Scroll { direction: ScrollDirection::Down }
    } else if text.contains("scroll up") {
        ClassifiedAction::Scroll { direction: ScrollDirection::Up }
    } else if text.contains("go back") {
        ClassifiedAction::TabControl { kind: TabControlKind::GoBack }
    } else if text.contains("go forward") {
        ClassifiedAction::TabControl { kind: TabControlKind::GoForward }
    } else if text.contains("refresh") || text.contains("reload") {
        ClassifiedAction::TabControl { kind: TabControlKind::Reload }
    } else if text.contains("new tab") {
        ClassifiedAction::TabControl { kind: TabControlKind::NewTab }
    } else if text.contains("close tab") {
        ClassifiedAction::TabControl { kind: TabControlKind::CloseTab }
    } else {
        return None;
    };

    Some(action)
}

/// GitHub phrases only, for commands already known to target a repository
pub fn classify_github(text: &str) -> Option<GithubActionKind> {
    if let Some(caps) = COMMENT_ON_ISSUE.captures(text) {
        if let Ok(issue_number) = caps[1].parse() {
            return Some(GithubActionKind::Comment {
                issue_number,
                body: caps[2].trim().to_string(),
            });
        }
    }

    if text.contains("create issue") {
        let title = CREATE_ISSUE_TITLED
            .captures(text)
            .map(|caps| caps[1].trim().to_string())
            .filter(|t| !t.is_empty());
        return Some(GithubActionKind::CreateIssue { title });
    }

    if text.contains("star this repo") || text.contains("star repository") {
        return Some(GithubActionKind::Star);
    }

    if text.contains("fork this repo") || text.contains("fork repository") {
        return Some(GithubActionKind::Fork);
    }

    if text.contains("show issues") {
        return Some(GithubActionKind::ShowIssues);
    }

    if text.contains("list issues") {
        return Some(GithubActionKind::ListIssues);
    }

    None
}

/// Navigation target of an `open` / `go to` / `navigate` command.
///
/// A target with a scheme is kept as-is; anything else gets `https://`.
pub fn extract_url(text: &str) -> Option<String> {
    let target = NAVIGATE.captures(text)?.get(1)?.as_str();

    if target.contains("://") {
        return Some(target.to_string());
    }

    URL_TARGET
        .captures(target)
        .map(|caps| format!("https://{}", &caps[1]))
}

fn extract_search_query(text: &str) -> Option<String> {
    let (_, rest) = text.split_once("search for")?;
    let query = rest.trim();
    (!query.is_empty()).then(|| query.to_string())
}

/// Search-engine URL for a query
pub fn search_url(query: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!("{}?q={}", SEARCH_ENGINE_URL, encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAB: TabId = 7;

    fn classify_on(text: &str, url: &str) -> ClassifiedAction {
        classify(text, &PageContext::from_url(Some(url)), TAB)
    }

    fn classify_plain(text: &str) -> ClassifiedAction {
        classify_on(text, "https://example.com/")
    }

    #[test]
    fn test_extract_url() {
        assert_eq!(extract_url("open example.com").as_deref(), Some("https://example.com"));
        assert_eq!(extract_url("go to https://x.org").as_deref(), Some("https://x.org"));
        assert_eq!(extract_url("navigate to docs.rs/regex").as_deref(), Some("https://docs.rs"));
        assert_eq!(extract_url("open youtube").as_deref(), Some("https://youtube"));
        assert_eq!(extract_url("open"), None);
        // Not anchored to a word start
        assert_eq!(extract_url("reopen docs.rs").as_deref(), Some("https://docs.rs"));
        assert_eq!(extract_url("scroll down"), None);
    }

    #[test]
    fn test_scroll() {
        assert_eq!(
            classify_plain("scroll down"),
            ClassifiedAction::Scroll { direction: ScrollDirection::Down }
        );
        assert_eq!(ScrollDirection::Down.offset(), 500);
        assert_eq!(ScrollDirection::Up.offset(), -500);
    }

    #[test]
    fn test_tab_control() {
        let cases = [
            ("go back", TabControlKind::GoBack),
            ("go forward please", TabControlKind::GoForward),
            ("refresh", TabControlKind::Reload),
            ("reload the page", TabControlKind::Reload),
            ("new tab", TabControlKind::NewTab),
            ("close tab", TabControlKind::CloseTab),
        ];
        for (text, kind) in cases {
            assert_eq!(classify_plain(text), ClassifiedAction::TabControl { kind }, "{}", text);
        }
    }

    #[test]
    fn test_navigation_keyword_wins_over_tab_control() {
        assert_eq!(
            classify_plain("open new tab"),
            ClassifiedAction::Navigate { url: "https://new".to_string() }
        );
    }

    #[test]
    fn test_search_encodes_query() {
        match classify_plain("search for rust & cats") {
            ClassifiedAction::Search { query, url } => {
                assert_eq!(query, "rust & cats");
                assert_eq!(url, "https://www.google.com/search?q=rust+%26+cats");
            }
            other => panic!("unexpected action: {:?}", other),
        }
        assert!(search_url("cats").contains("q=cats"));
    }

    #[test]
    fn test_empty_search_falls_through() {
        assert_eq!(
            classify_plain("search for"),
            ClassifiedAction::Unrecognized { raw_text: "search for".to_string() }
        );
    }

    #[test]
    fn test_send_email_full_and_defaults() {
        assert_eq!(
            classify_plain("send email to a@b.com with subject hi and message say hello"),
            ClassifiedAction::SendEmail {
                recipient: "a@b.com".to_string(),
                subject: "hi".to_string(),
                prompt: "say hello".to_string(),
            }
        );

        assert_eq!(
            classify_plain("send email to bob@example.org"),
            ClassifiedAction::SendEmail {
                recipient: "bob@example.org".to_string(),
                subject: DEFAULT_EMAIL_SUBJECT.to_string(),
                prompt: DEFAULT_EMAIL_PROMPT.to_string(),
            }
        );

        assert_eq!(
            classify_plain("send email to bob@example.org and message running late"),
            ClassifiedAction::SendEmail {
                recipient: "bob@example.org".to_string(),
                subject: DEFAULT_EMAIL_SUBJECT.to_string(),
                prompt: "running late".to_string(),
            }
        );
    }

    #[test]
    fn test_reply_only_on_gmail() {
        assert_eq!(
            classify_on("reply to this email", "https://mail.google.com/mail/u/0/#inbox/1"),
            ClassifiedAction::ReplyToEmail { target_tab: TAB }
        );
        assert_eq!(
            classify_plain("reply to this email"),
            ClassifiedAction::Unrecognized { raw_text: "reply to this email".to_string() }
        );
    }

    #[test]
    fn test_summarize_page_vs_generic_ai() {
        assert_eq!(classify_plain("summarize this page"), ClassifiedAction::Summarize { target_tab: TAB });
        assert_eq!(
            classify_plain("what is a monad"),
            ClassifiedAction::AiChat { prompt: "what is a monad".to_string() }
        );
        assert_eq!(
            classify_plain("explain quantum computing"),
            ClassifiedAction::AiChat { prompt: "explain quantum computing".to_string() }
        );
    }

    #[test]
    fn test_github_phrases_only_on_github() {
        let repo = "https://github.com/octo/hello";
        assert_eq!(
            classify_on("star this repo", repo),
            ClassifiedAction::GithubAction { kind: GithubActionKind::Star }
        );
        assert_eq!(
            classify_on("fork repository", repo),
            ClassifiedAction::GithubAction { kind: GithubActionKind::Fork }
        );
        assert_eq!(
            classify_on("show issues", repo),
            ClassifiedAction::GithubAction { kind: GithubActionKind::ShowIssues }
        );
        assert_eq!(
            classify_on("list issues", repo),
            ClassifiedAction::GithubAction { kind: GithubActionKind::ListIssues }
        );
        assert_eq!(
            classify_plain("star this repo"),
            ClassifiedAction::Unrecognized { raw_text: "star this repo".to_string() }
        );
    }

    #[test]
    fn test_github_issue_phrases() {
        let repo = "https://github.com/octo/hello/pulls";
        assert_eq!(
            classify_on("create issue", repo),
            ClassifiedAction::GithubAction { kind: GithubActionKind::CreateIssue { title: None } }
        );
        assert_eq!(
            classify_on("create issue titled login button broken", repo),
            ClassifiedAction::GithubAction {
                kind: GithubActionKind::CreateIssue {
                    title: Some("login button broken".to_string())
                }
            }
        );
        assert_eq!(
            classify_on("comment on issue #12 works for me", repo),
            ClassifiedAction::GithubAction {
                kind: GithubActionKind::Comment {
                    issue_number: 12,
                    body: "works for me".to_string()
                }
            }
        );
    }

    #[test]
    fn test_unrecognized() {
        let action = classify_plain("asdkjasd random text");
        assert_eq!(
            action,
            ClassifiedAction::Unrecognized { raw_text: "asdkjasd random text".to_string() }
        );
        assert!(!action.is_recognized());
    }

    #[test]
    fn test_classify_is_deterministic() {
        let page = PageContext::from_url(Some("https://github.com/octo/hello"));
        for text in ["scroll up", "create issue", "open rust-lang.org", "hmm"] {
            assert_eq!(classify(text, &page, TAB), classify(text, &page, TAB));
        }
    }

    #[test]
    fn test_page_context() {
        let gmail = PageContext::from_url(Some("https://mail.google.com/mail/u/0/"));
        assert!(gmail.is_gmail);
        assert!(!gmail.is_github());

        let github = PageContext::from_url(Some("https://www.github.com/a/b"));
        assert!(github.is_github());

        let none = PageContext::from_url(None);
        assert!(!none.is_gmail && !none.is_github());
    }

    #[test]
    fn test_action_serializes_tagged() {
        let value = serde_json::to_value(ClassifiedAction::SendEmail {
            recipient: "a@b.com".to_string(),
            subject: "s".to_string(),
            prompt: "p".to_string(),
        })
        .unwrap();
        assert_eq!(value["type"], "sendEmail");
        assert_eq!(value["recipient"], "a@b.com");
    }
}
