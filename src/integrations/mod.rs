//! Third-party integrations for Jarvis
//!
//! Gmail for sending mail and GitHub for repository actions. Each client does
//! one HTTP call per operation with no retry.

pub mod github;
pub mod gmail;

pub use github::{GitHubClient, Issue, IssueComment, IssueTracker, RepoRef, Repository};
pub use gmail::{GmailClient, MailSender, OutgoingEmail, SentMessage};
