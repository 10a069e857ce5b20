//! Human-readable rendering of notifications and subscriptions.

use std::sync::LazyLock;

use chrono::{DateTime, Local};
use regex::Regex;

use crate::models::{Notification, Subscription};

static PULLS_PATH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/pulls/([0-9]+)(/?.*)").expect("pulls regex should compile"));

/// Map an API URL to the page a person would open in a browser.
pub fn api_url_to_html_url(api_url: &str) -> String {
    let html_url = api_url.replace("api.github.com/repos", "github.com");
    PULLS_PATH_REGEX
        .replace_all(&html_url, "/pull/${1}${2}")
        .into_owned()
}

pub fn describe_reason(reason: &str) -> &'static str {
    match reason {
        "approval_requested" => "You were requested to review and approve a deployment",
        "assign" => "You were assigned to the issue",
        "author" => "You created the thread",
        "comment" => "You commented on the thread",
        "ci_activity" => "A GitHub Actions workflow run that you triggered was completed",
        "invitation" => "You accepted an invitation to contribute to the repository",
        "manual" => "You subscribed to the thread",
        "member_feature_requested" => "Organization members have requested to enable a feature",
        "mention" => "You were @mentioned in the content",
        "review_requested" => "You were requested to review a pull request",
        "security_alert" => "GitHub discovered a security vulnerability in your repository",
        "security_advisory_credit" => "You were credited for contributing to a security advisory",
        "state_change" => "You changed the thread state",
        "subscribed" => "You're watching the repository",
        "team_mention" => "You were on a team that was mentioned",
        _ => "Unknown reason",
    }
}

/// Render an RFC 3339 timestamp in local time, or return it untouched.
pub fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

pub fn format_notification(notification: &Notification) -> String {
    let url = match notification.subject.url.as_deref() {
        Some(api_url) => api_url_to_html_url(api_url),
        None => notification.repository.html_url.clone().unwrap_or_default(),
    };

    format!(
        "ID: {}\nTitle: {}\nRepository: {}\nType: {}\nReason: {} ({})\nStatus: {}\nUpdated: {}\nURL: {}",
        notification.id,
        notification.subject.title,
        notification.repository.full_name,
        notification.subject.kind,
        notification.reason,
        describe_reason(&notification.reason),
        if notification.unread { "Unread" } else { "Read" },
        format_timestamp(&notification.updated_at),
        url,
    )
}

pub fn format_subscription(subscription: &Subscription) -> String {
    let mut lines = vec![
        format!(
            "Subscription Status: {}",
            if subscription.subscribed {
                "Subscribed"
            } else {
                "Not Subscribed"
            }
        ),
        format!(
            "Ignored: {}",
            if subscription.ignored { "Yes" } else { "No" }
        ),
    ];
    if let Some(reason) = subscription.reason.as_deref().filter(|r| !r.is_empty()) {
        lines.push(format!("Reason: {}", reason));
    }
    if let Some(created_at) = subscription.created_at.as_deref() {
        lines.push(format!("Created: {}", format_timestamp(created_at)));
    }
    lines.join("\n")
}
