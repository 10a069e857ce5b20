//! The subset of GitHub notification payloads the tools read.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub unread: bool,
    pub reason: String,
    pub updated_at: String,
    #[serde(default)]
    pub last_read_at: Option<String>,
    pub subject: Subject,
    pub repository: NotificationRepository,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub subscription_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub title: String,
    /// API URL of the issue, pull request, or release. Null for some
    /// subject types such as discussions.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub latest_comment_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRepository {
    pub full_name: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub private: bool,
}

/// Thread or repository subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub subscribed: bool,
    pub ignored: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub thread_url: Option<String>,
    #[serde(default)]
    pub repository_url: Option<String>,
}

/// Body of a 202 from the mark-as-read endpoints; 205 decodes to the default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkReadResponse {
    #[serde(default)]
    pub message: Option<String>,
}
