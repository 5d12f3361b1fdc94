//! Page-context action runner
//!
//! Runs inside the target page against a [`Dom`] and returns structured results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{BrowserError, PageAction, PageOutcome, ScrollBehavior};

const MAX_TEXT_CONTENT: usize = 500;
const MAX_INNER_HTML: usize = 1000;

/// Attributes worth sending to the AI
const RELEVANT_ATTRIBUTES: [&str; 8] = ["type", "name", "placeholder", "value", "href", "src", "alt", "title"];

/// Computed style properties worth sending to the AI
const RELEVANT_STYLES: [&str; 6] = ["display", "position", "width", "height", "backgroundColor", "color"];

// Gmail reading pane selectors
const GMAIL_SUBJECT: &str = "h2.hP";
const GMAIL_SENDER: &str = "span.gD";
const GMAIL_BODY: &str = "div.a3s";

/// Basic page metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub title: String,
    pub url: String,
    pub domain: String,
}

/// Raw view of a DOM element as the page sees it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementSnapshot {
    pub tag_name: String,
    pub text_content: String,
    pub attributes: BTreeMap<String, String>,
    pub inner_html: String,
    pub computed_style: BTreeMap<String, String>,
}

/// Element description sent to the AI for explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    pub tag_name: String,
    pub text_content: String,
    pub attributes: BTreeMap<String, String>,
    pub class_name: String,
    pub id: String,
    pub role: Option<String>,
    pub aria_label: Option<String>,
    #[serde(rename = "innerHTML")]
    pub inner_html: String,
    pub computed_style: BTreeMap<String, String>,
}

impl ElementInfo {
    pub fn from_snapshot(snapshot: &ElementSnapshot) -> Self {
        let attr = |name: &str| snapshot.attributes.get(name).cloned();

        let attributes = RELEVANT_ATTRIBUTES
            .iter()
            .filter_map(|name| attr(name).map(|v| (name.to_string(), v)))
            .collect();

        let computed_style = RELEVANT_STYLES
            .iter()
            .filter_map(|name| {
                snapshot
                    .computed_style
                    .get(*name)
                    .map(|v| (name.to_string(), v.clone()))
            })
            .collect();

        Self {
            tag_name: snapshot.tag_name.to_lowercase(),
            text_content: truncate_chars(snapshot.text_content.trim(), MAX_TEXT_CONTENT),
            attributes,
            class_name: attr("class").unwrap_or_default(),
            id: attr("id").unwrap_or_default(),
            role: attr("role"),
            aria_label: attr("aria-label"),
            inner_html: truncate_chars(&snapshot.inner_html, MAX_INNER_HTML),
            computed_style,
        }
    }
}

/// Email open in the Gmail reading pane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenEmail {
    pub sender: String,
    pub subject: String,
    pub body: String,
}

/// The page's document, as seen from a content script.
pub trait Dom {
    fn scroll_by(&mut self, top: i32, behavior: ScrollBehavior);

    fn page_info(&self) -> PageInfo;

    fn body_text(&self) -> String;

    /// First element matching a CSS selector
    fn element(&self, selector: &str) -> Option<ElementSnapshot>;

    /// Click the first matching element; false when nothing matched
    fn click(&mut self, selector: &str) -> bool;

    /// Set the value of the first matching element; false when nothing matched
    fn set_value(&mut self, selector: &str, value: &str) -> bool;

    /// Fire a bubbling DOM event on the first matching element
    fn dispatch_event(&mut self, selector: &str, event: &str);
}

pub struct PageActionRunner<D: Dom> {
    dom: D,
}

impl<D: Dom> PageActionRunner<D> {
    pub fn new(dom: D) -> Self {
        Self { dom }
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn run(&mut self, action: PageAction) -> Result<PageOutcome, BrowserError> {
        match action {
            PageAction::ScrollBy { top, behavior } => {
                self.dom.scroll_by(top, behavior);
                Ok(PageOutcome::Done)
            }

            PageAction::Click { selector } => {
                if self.dom.click(&selector) {
                    log::info!("Clicked element: {}", selector);
                    Ok(PageOutcome::Done)
                } else {
                    log::warn!("Element not found: {}", selector);
                    Err(BrowserError::ElementNotFound(selector))
                }
            }

            PageAction::Type { selector, text } => {
                if !self.dom.set_value(&selector, &text) {
                    log::warn!("Element not found: {}", selector);
                    return Err(BrowserError::ElementNotFound(selector));
                }
                // Frameworks listen for these rather than the value itself
                self.dom.dispatch_event(&selector, "input");
                self.dom.dispatch_event(&selector, "change");
                log::info!("Typed into element: {}", selector);
                Ok(PageOutcome::Done)
            }

            PageAction::GetPageInfo => Ok(PageOutcome::PageInfo(self.dom.page_info())),

            PageAction::ReadText { max_chars } => {
                let text = collapse_whitespace(&self.dom.body_text());
                Ok(PageOutcome::Text(truncate_chars(&text, max_chars)))
            }

            PageAction::InspectElement { selector } => self
                .dom
                .element(&selector)
                .map(|snapshot| PageOutcome::Element(ElementInfo::from_snapshot(&snapshot)))
                .ok_or(BrowserError::ElementNotFound(selector)),

            PageAction::ReadEmail => self.read_open_email().map(PageOutcome::Email),
        }
    }

    fn read_open_email(&self) -> Result<OpenEmail, BrowserError> {
        let sender = self
            .dom
            .element(GMAIL_SENDER)
            .and_then(|el| {
                el.attributes
                    .get("email")
                    .cloned()
                    .or_else(|| Some(el.text_content.trim().to_string()))
            })
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BrowserError::ElementNotFound(GMAIL_SENDER.to_string()))?;

        let body = self
            .dom
            .element(GMAIL_BODY)
            .map(|el| el.text_content.trim().to_string())
            .ok_or_else(|| BrowserError::ElementNotFound(GMAIL_BODY.to_string()))?;

        let subject = self
            .dom
            .element(GMAIL_SUBJECT)
            .map(|el| el.text_content.trim().to_string())
            .unwrap_or_default();

        Ok(OpenEmail { sender, subject, body })
    }
}

/// Truncate to at most `max` characters without splitting a code point
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
