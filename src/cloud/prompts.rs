//! Prompt templates sent to Gemini

use crate::browser::{ElementInfo, OpenEmail};

/// Maximum page text sent for summarization
pub const MAX_SUMMARY_INPUT: usize = 10_000;

pub fn summarize(content: &str) -> String {
    format!(
        "Summarize the following web page content in a few concise bullet points. \
         Only output the summary, nothing else:\n\n{}",
        content
    )
}

pub fn email_body(prompt: &str, recipient: Option<&str>, subject: Option<&str>) -> String {
    let mut text = String::from(
        "Write the body of an email based on the instructions below. \
         Only output the email body, no subject line and no placeholders.\n\n",
    );

    if let Some(to) = recipient {
        text.push_str(&format!("Recipient: {}\n", to));
    }
    if let Some(subject) = subject {
        text.push_str(&format!("Subject: {}\n", subject));
    }

    text.push_str(&format!("Instructions: {}", prompt));
    text
}

pub fn reply(email: &OpenEmail) -> String {
    format!(
        "Write a short, polite reply to the following email. \
         Only output the reply body, nothing else.\n\n\
         From: {}\nSubject: {}\n\n{}",
        email.sender, email.subject, email.body
    )
}

pub fn explain_element(info: &ElementInfo, page_url: &str, page_title: &str) -> String {
    let mut text = format!(
        "Explain what this element on a web page is and what it does, in plain language \
         for a non-technical user. Keep it under 150 words.\n\n\
         Page: {} ({})\nElement: <{}>\n",
        page_title, page_url, info.tag_name
    );

    if !info.text_content.is_empty() {
        text.push_str(&format!("Text: {}\n", info.text_content));
    }
    if !info.id.is_empty() {
        text.push_str(&format!("Id: {}\n", info.id));
    }
    if !info.class_name.is_empty() {
        text.push_str(&format!("Classes: {}\n", info.class_name));
    }
    if let Some(ref role) = info.role {
        text.push_str(&format!("Role: {}\n", role));
    }
    if let Some(ref label) = info.aria_label {
        text.push_str(&format!("Aria label: {}\n", label));
    }
    for (name, value) in &info.attributes {
        text.push_str(&format!("Attribute {}: {}\n", name, value));
    }
    if !info.inner_html.is_empty() {
        text.push_str(&format!("HTML snippet: {}\n", info.inner_html));
    }

    text
}
