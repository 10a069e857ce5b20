use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{schemars, tool, tool_handler, tool_router, ServerHandler};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::GithubClient;
use crate::error::{GithubError, McpNotificationsError};
use crate::format::{format_notification, format_subscription, format_timestamp};
use crate::models::{MarkReadResponse, Notification, Subscription};
use crate::request::QueryParams;
use crate::validation::{
    NotificationFilter, RepoIdentifier, RepoNotificationsQuery, ThreadId, Timestamp,
    ValidationErrors,
};

/// Page size when listing notifications across all repositories.
const GLOBAL_PER_PAGE: u32 = 50;
/// Page size when listing notifications of a single repository.
const REPO_PER_PAGE: u32 = 30;

#[derive(Clone)]
pub struct McpNotificationsServer {
    github: Arc<GithubClient>,
    tool_router: ToolRouter<Self>,
}

// -- Tool parameter types --

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct ListNotificationsParams {
    #[schemars(description = "If true, show notifications marked as read")]
    #[serde(default)]
    pub all: Option<bool>,

    #[schemars(
        description = "If true, only shows notifications where user is directly participating"
    )]
    #[serde(default)]
    pub participating: Option<bool>,

    #[schemars(description = "ISO 8601 timestamp - only show notifications updated after this time")]
    #[serde(default)]
    pub since: Option<String>,

    #[schemars(
        description = "ISO 8601 timestamp - only show notifications updated before this time"
    )]
    #[serde(default)]
    pub before: Option<String>,

    #[schemars(description = "Page number for pagination (1-100, default: 1)")]
    #[serde(default)]
    pub page: Option<i64>,

    #[schemars(description = "Number of results per page (1-100, default: 50)")]
    #[serde(default)]
    pub per_page: Option<i64>,
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct MarkNotificationsReadParams {
    #[schemars(
        description = "ISO 8601 timestamp - marks notifications updated at or before this time as read. Default is current time."
    )]
    #[serde(default)]
    pub last_read_at: Option<String>,

    #[schemars(description = "Whether to mark notifications as read or unread (default: true)")]
    #[serde(default)]
    pub read: Option<bool>,
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct ThreadParams {
    #[schemars(description = "The numeric ID of the notification thread")]
    pub thread_id: String,
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct SetThreadSubscriptionParams {
    #[schemars(description = "The numeric ID of the notification thread")]
    pub thread_id: String,

    #[schemars(description = "If true, notifications will be ignored (default: false)")]
    #[serde(default)]
    pub ignored: Option<bool>,
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct ListRepoNotificationsParams {
    #[schemars(description = "Repository owner (user or org)")]
    pub owner: String,

    #[schemars(description = "Repository name")]
    pub repo: String,

    #[schemars(description = "If true, show notifications marked as read")]
    #[serde(default)]
    pub all: Option<bool>,

    #[schemars(
        description = "If true, only shows notifications where user is directly participating"
    )]
    #[serde(default)]
    pub participating: Option<bool>,

    #[schemars(description = "ISO 8601 timestamp - only show notifications updated after this time")]
    #[serde(default)]
    pub since: Option<String>,

    #[schemars(
        description = "ISO 8601 timestamp - only show notifications updated before this time"
    )]
    #[serde(default)]
    pub before: Option<String>,

    #[schemars(description = "Page number for pagination (1-100, default: 1)")]
    #[serde(default)]
    pub page: Option<i64>,

    #[schemars(description = "Number of results per page (1-100, default: 30)")]
    #[serde(default)]
    pub per_page: Option<i64>,
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct MarkRepoNotificationsReadParams {
    #[schemars(description = "Repository owner (user or org)")]
    pub owner: String,

    #[schemars(description = "Repository name")]
    pub repo: String,

    #[schemars(
        description = "ISO 8601 timestamp - marks notifications updated at or before this time as read. Default is current time."
    )]
    #[serde(default)]
    pub last_read_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RepoSubscriptionAction {
    /// Watch all activity.
    AllActivity,
    /// Participating and @mentions only.
    Default,
    /// Mute all notifications.
    Ignore,
    /// View the current settings.
    Get,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ManageRepoSubscriptionParams {
    #[schemars(description = "Repository owner (user or org)")]
    pub owner: String,

    #[schemars(description = "Repository name")]
    pub repo: String,

    #[schemars(
        description = "The action to perform: all_activity (watch all), default (participating and @mentions only), ignore (mute notifications), or get (view current settings)"
    )]
    pub action: RepoSubscriptionAction,
}

impl McpNotificationsServer {
    pub fn new(github: GithubClient) -> Self {
        Self {
            github: Arc::new(github),
            tool_router: Self::tool_router(),
        }
    }

    fn err(&self, e: McpNotificationsError) -> ErrorData {
        e.to_mcp_error()
    }

    fn invalid(&self, errors: ValidationErrors) -> ErrorData {
        self.err(McpNotificationsError::InvalidParams(errors))
    }

    fn thread_id(&self, raw: &str) -> Result<ThreadId, ErrorData> {
        ThreadId::validate(raw).map_err(|v| self.invalid(ValidationErrors::single("thread_id", v)))
    }

    fn timestamp(&self, field: &str, raw: Option<&str>) -> Result<Option<Timestamp>, ErrorData> {
        raw.map(Timestamp::validate)
            .transpose()
            .map_err(|v| self.invalid(ValidationErrors::single(field, v)))
    }
}

fn success(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

/// An upstream failure rendered as a tool result the model can read.
fn failure(context: &str, e: &GithubError) -> CallToolResult {
    tracing::warn!(error = %e, status = ?e.status(), "{}", context);
    CallToolResult::error(vec![Content::text(format!("{}: {}", context, e))])
}

/// Query for the notification list endpoints, with defaults applied.
/// Returns the effective page and page size alongside.
fn filter_query(filter: &NotificationFilter, default_per_page: u32) -> (QueryParams, u32, u32) {
    let page = filter.pagination.page.map(|p| p.get()).unwrap_or(1);
    let per_page = filter
        .pagination
        .per_page
        .map(|p| p.get())
        .unwrap_or(default_per_page);

    let query = QueryParams::new()
        .with("all", filter.all)
        .with("participating", filter.participating)
        .with("since", filter.since.as_ref().map(Timestamp::as_str))
        .with("before", filter.before.as_ref().map(Timestamp::as_str))
        .with("page", Some(page))
        .with("per_page", Some(per_page));

    (query, page, per_page)
}

fn pagination_hint(count: usize, page: u32, per_page: u32) -> String {
    if count == per_page as usize {
        format!(
            "\n\nMore notifications may be available. You can view the next page by specifying 'page: {}' in the request.",
            page + 1
        )
    } else {
        String::new()
    }
}

fn render_notifications(
    notifications: &[Notification],
    repo: Option<&RepoIdentifier>,
    page: u32,
    per_page: u32,
) -> String {
    let scope = repo
        .map(|r| format!(" for repository {}", r))
        .unwrap_or_default();

    if notifications.is_empty() {
        return format!("No notifications found{} with the given criteria.", scope);
    }

    let formatted: Vec<String> = notifications.iter().map(format_notification).collect();
    format!(
        "{} notifications found{}:\n\n{}{}",
        notifications.len(),
        scope,
        formatted.join("\n\n"),
        pagination_hint(notifications.len(), page, per_page)
    )
}

fn thread_path(thread_id: &ThreadId) -> String {
    format!("/notifications/threads/{}", thread_id)
}

fn thread_subscription_path(thread_id: &ThreadId) -> String {
    format!("/notifications/threads/{}/subscription", thread_id)
}

fn repo_path(repo: &RepoIdentifier, resource: &str) -> String {
    format!("/repos/{}/{}/{}", repo.owner, repo.repo, resource)
}

// -- MCP tool handlers --

#[tool_router]
impl McpNotificationsServer {
    #[tool(
        name = "list-notifications",
        description = "List GitHub notifications for the authenticated user"
    )]
    async fn list_notifications(
        &self,
        Parameters(params): Parameters<ListNotificationsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let filter = NotificationFilter::validate(
            params.all,
            params.participating,
            params.since.as_deref(),
            params.before.as_deref(),
            params.page,
            params.per_page,
        )
        .map_err(|e| self.invalid(e))?;

        let (query, page, per_page) = filter_query(&filter, GLOBAL_PER_PAGE);
        match self
            .github
            .get::<Vec<Notification>>("/notifications", query)
            .await
        {
            Ok(notifications) => Ok(success(render_notifications(
                &notifications,
                None,
                page,
                per_page,
            ))),
            Err(e) => Ok(failure("Failed to fetch notifications", &e)),
        }
    }

    #[tool(
        name = "mark-notifications-read",
        description = "Mark GitHub notifications as read"
    )]
    async fn mark_notifications_read(
        &self,
        Parameters(params): Parameters<MarkNotificationsReadParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let last_read_at = self.timestamp("last_read_at", params.last_read_at.as_deref())?;
        let read = params.read.unwrap_or(true);

        let mut body = json!({ "read": read });
        if let Some(ts) = &last_read_at {
            body["last_read_at"] = Value::from(ts.as_str());
        }

        match self
            .github
            .put::<MarkReadResponse>("/notifications", Some(body))
            .await
        {
            Ok(MarkReadResponse {
                message: Some(message),
            }) => Ok(success(message)),
            Ok(_) => {
                let affected = last_read_at
                    .map(|ts| {
                        format!(
                            " Notifications updated on or before {} were affected.",
                            format_timestamp(ts.as_str())
                        )
                    })
                    .unwrap_or_default();
                Ok(success(format!(
                    "Successfully marked notifications as {}.{}",
                    if read { "read" } else { "unread" },
                    affected
                )))
            }
            Err(e) => Ok(failure("Failed to mark notifications as read", &e)),
        }
    }

    #[tool(
        name = "get-thread",
        description = "Get information about a GitHub notification thread"
    )]
    async fn get_thread(
        &self,
        Parameters(params): Parameters<ThreadParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let thread_id = self.thread_id(&params.thread_id)?;

        match self
            .github
            .get::<Notification>(&thread_path(&thread_id), QueryParams::new())
            .await
        {
            Ok(thread) => Ok(success(format!(
                "Thread details:\n\n{}",
                format_notification(&thread)
            ))),
            Err(e) => Ok(failure(&format!("Failed to fetch thread {}", thread_id), &e)),
        }
    }

    #[tool(
        name = "mark-thread-read",
        description = "Mark a GitHub notification thread as read"
    )]
    async fn mark_thread_read(
        &self,
        Parameters(params): Parameters<ThreadParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let thread_id = self.thread_id(&params.thread_id)?;

        match self
            .github
            .patch::<Value>(&thread_path(&thread_id), None)
            .await
        {
            Ok(_) => Ok(success(format!(
                "Successfully marked thread {} as read.",
                thread_id
            ))),
            Err(e) => Ok(failure(
                &format!("Failed to mark thread {} as read", thread_id),
                &e,
            )),
        }
    }

    #[tool(
        name = "mark-thread-done",
        description = "Mark a GitHub notification thread as done"
    )]
    async fn mark_thread_done(
        &self,
        Parameters(params): Parameters<ThreadParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let thread_id = self.thread_id(&params.thread_id)?;

        match self.github.delete::<Value>(&thread_path(&thread_id)).await {
            Ok(_) => Ok(success(format!(
                "Successfully marked thread {} as done.",
                thread_id
            ))),
            Err(e) => Ok(failure(
                &format!("Failed to mark thread {} as done", thread_id),
                &e,
            )),
        }
    }

    #[tool(
        name = "get-thread-subscription",
        description = "Get subscription status for a GitHub notification thread"
    )]
    async fn get_thread_subscription(
        &self,
        Parameters(params): Parameters<ThreadParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let thread_id = self.thread_id(&params.thread_id)?;

        match self
            .github
            .get::<Subscription>(&thread_subscription_path(&thread_id), QueryParams::new())
            .await
        {
            Ok(subscription) => Ok(success(format!(
                "Subscription status for thread {}:\n\n{}",
                thread_id,
                format_subscription(&subscription)
            ))),
            Err(e) if e.is_not_found() => Ok(success(format!(
                "You are not subscribed to thread {}.",
                thread_id
            ))),
            Err(e) => Ok(failure(
                &format!("Failed to fetch subscription for thread {}", thread_id),
                &e,
            )),
        }
    }

    #[tool(
        name = "set-thread-subscription",
        description = "Subscribe to or ignore a GitHub notification thread"
    )]
    async fn set_thread_subscription(
        &self,
        Parameters(params): Parameters<SetThreadSubscriptionParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let thread_id = self.thread_id(&params.thread_id)?;
        let ignored = params.ignored.unwrap_or(false);

        match self
            .github
            .put::<Subscription>(
                &thread_subscription_path(&thread_id),
                Some(json!({ "ignored": ignored })),
            )
            .await
        {
            Ok(subscription) => Ok(success(format!(
                "Successfully updated subscription by {} thread {}:\n\n{}",
                if ignored { "ignoring" } else { "subscribing to" },
                thread_id,
                format_subscription(&subscription)
            ))),
            Err(e) => Ok(failure(
                &format!("Failed to update subscription for thread {}", thread_id),
                &e,
            )),
        }
    }

    #[tool(
        name = "delete-thread-subscription",
        description = "Unsubscribe from a GitHub notification thread"
    )]
    async fn delete_thread_subscription(
        &self,
        Parameters(params): Parameters<ThreadParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let thread_id = self.thread_id(&params.thread_id)?;

        match self
            .github
            .delete::<Value>(&thread_subscription_path(&thread_id))
            .await
        {
            Ok(_) => Ok(success(format!(
                "Successfully unsubscribed from thread {}.",
                thread_id
            ))),
            Err(e) if e.is_not_found() => Ok(success(format!(
                "You were not subscribed to thread {}.",
                thread_id
            ))),
            Err(e) => Ok(failure(
                &format!("Failed to unsubscribe from thread {}", thread_id),
                &e,
            )),
        }
    }

    #[tool(
        name = "list-repo-notifications",
        description = "List GitHub notifications for a specific repository"
    )]
    async fn list_repo_notifications(
        &self,
        Parameters(params): Parameters<ListRepoNotificationsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let filter = NotificationFilter::validate(
            params.all,
            params.participating,
            params.since.as_deref(),
            params.before.as_deref(),
            params.page,
            params.per_page,
        );
        let RepoNotificationsQuery { repo, filter } =
            RepoNotificationsQuery::validate(&params.owner, &params.repo, filter)
                .map_err(|e| self.invalid(e))?;

        let (query, page, per_page) = filter_query(&filter, REPO_PER_PAGE);
        match self
            .github
            .get::<Vec<Notification>>(&repo_path(&repo, "notifications"), query)
            .await
        {
            Ok(notifications) => Ok(success(render_notifications(
                &notifications,
                Some(&repo),
                page,
                per_page,
            ))),
            Err(e) => Ok(failure(
                &format!("Failed to fetch notifications for repository {}", repo),
                &e,
            )),
        }
    }

    #[tool(
        name = "mark-repo-notifications-read",
        description = "Mark all GitHub notifications in a repository as read"
    )]
    async fn mark_repo_notifications_read(
        &self,
        Parameters(params): Parameters<MarkRepoNotificationsReadParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut errors = ValidationErrors::default();
        let repo = errors.absorb(RepoIdentifier::validate(&params.owner, &params.repo));
        let last_read_at = errors.check(
            "last_read_at",
            params
                .last_read_at
                .as_deref()
                .map(Timestamp::validate)
                .transpose(),
        );
        let (repo, last_read_at) = match (repo, last_read_at) {
            (Some(repo), Some(last_read_at)) => (repo, last_read_at),
            _ => return Err(self.invalid(errors)),
        };

        let mut body = json!({});
        if let Some(ts) = &last_read_at {
            body["last_read_at"] = Value::from(ts.as_str());
        }

        match self
            .github
            .put::<MarkReadResponse>(&repo_path(&repo, "notifications"), Some(body))
            .await
        {
            Ok(MarkReadResponse {
                message: Some(message),
            }) => Ok(success(message)),
            Ok(_) => Ok(success(format!(
                "Successfully marked notifications in {} as read.",
                repo
            ))),
            Err(e) => Ok(failure(
                &format!("Failed to mark notifications as read for repository {}", repo),
                &e,
            )),
        }
    }

    #[tool(
        name = "manage-repo-subscription",
        description = "Manage repository subscription settings: watch all activity, default (participating and @mentions), ignore, or view current settings"
    )]
    async fn manage_repo_subscription(
        &self,
        Parameters(params): Parameters<ManageRepoSubscriptionParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let repo =
            RepoIdentifier::validate(&params.owner, &params.repo).map_err(|e| self.invalid(e))?;
        let path = repo_path(&repo, "subscription");

        let outcome = match params.action {
            RepoSubscriptionAction::Get => {
                match self
                    .github
                    .get::<Subscription>(&path, QueryParams::new())
                    .await
                {
                    Ok(subscription) => Ok(describe_repo_subscription(&repo, &subscription)),
                    Err(e) if e.is_not_found() => Ok(format!(
                        "Subscription status for {repo}:\n\
                         • Default settings (participating and @mentions only)\n\
                         • or Custom through the GitHub web interface at:\n  \
                         https://github.com/{repo}"
                    )),
                    Err(e) => Err(e),
                }
            }
            RepoSubscriptionAction::AllActivity => self
                .github
                .put::<Value>(&path, Some(json!({ "subscribed": true, "ignored": false })))
                .await
                .map(|_| format!("Successfully set {} to watch all activity", repo)),
            RepoSubscriptionAction::Default => self
                .github
                .delete::<Value>(&path)
                .await
                .map(|_| {
                    format!(
                        "Successfully set {} to default settings (participating and @mentions only)",
                        repo
                    )
                }),
            RepoSubscriptionAction::Ignore => self
                .github
                .put::<Value>(&path, Some(json!({ "subscribed": false, "ignored": true })))
                .await
                .map(|_| format!("Successfully set {} to ignore all notifications", repo)),
        };

        match outcome {
            Ok(text) => Ok(success(text)),
            Err(e) => Ok(failure(
                &format!("Failed to manage repository subscription for {}", repo),
                &e,
            )),
        }
    }
}

fn describe_repo_subscription(repo: &RepoIdentifier, subscription: &Subscription) -> String {
    let created_at = subscription
        .created_at
        .as_deref()
        .map(format_timestamp)
        .unwrap_or_else(|| "unknown".to_string());

    format!(
        "Subscription status for {repo}:\n\
         • API Subscription: {}\n\
         • Notifications: {}\n\
         • Created at: {}\n\
         • Web Interface: https://github.com/{repo}",
        if subscription.subscribed {
            "Watching all activity"
        } else {
            "Not watching"
        },
        if subscription.ignored { "Ignored" } else { "Active" },
        created_at,
    )
}

#[tool_handler]
impl ServerHandler for McpNotificationsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "github-notifications".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "GitHub notifications server. Use list-notifications or list-repo-notifications \
                 to see notifications, get-thread for a single thread, mark-thread-read, \
                 mark-thread-done, mark-notifications-read and mark-repo-notifications-read \
                 to clear them, get-thread-subscription, set-thread-subscription and \
                 delete-thread-subscription for thread subscriptions, and \
                 manage-repo-subscription to watch, ignore, or reset a repository."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rmcp::model::ErrorCode;
    use url::Url;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_server(mock: &MockServer) -> McpNotificationsServer {
        let config = Config::new(Some("test_token".into()), Url::parse(&mock.uri()).unwrap());
        McpNotificationsServer::new(GithubClient::new(&config).unwrap())
    }

    fn result_text(result: &CallToolResult) -> String {
        let value = serde_json::to_value(result).unwrap();
        value["content"][0]["text"].as_str().unwrap().to_string()
    }

    fn is_error(result: &CallToolResult) -> bool {
        serde_json::to_value(result).unwrap()["isError"] == json!(true)
    }

    fn notification_json(id: &str) -> Value {
        json!({
            "id": id,
            "unread": true,
            "reason": "mention",
            "updated_at": "2024-01-15T10:30:00Z",
            "subject": {
                "title": format!("Issue {}", id),
                "url": format!("https://api.github.com/repos/octocat/hello/issues/{}", id),
                "type": "Issue"
            },
            "repository": {
                "full_name": "octocat/hello",
                "html_url": "https://github.com/octocat/hello"
            }
        })
    }

    fn repo_subscription_params(action: RepoSubscriptionAction) -> ManageRepoSubscriptionParams {
        ManageRepoSubscriptionParams {
            owner: "octocat".into(),
            repo: "hello".into(),
            action,
        }
    }

    #[test]
    fn test_pagination_hint_only_on_full_page() {
        assert!(pagination_hint(10, 1, 50).is_empty());
        assert!(pagination_hint(50, 2, 50).contains("'page: 3'"));
    }

    #[test]
    fn test_filter_query_defaults() {
        let (query, page, per_page) = filter_query(&NotificationFilter::default(), GLOBAL_PER_PAGE);
        assert_eq!((page, per_page), (1, 50));
        let keys: Vec<&str> = query.present().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["page", "per_page"]);
    }

    #[test]
    fn test_action_deserializes_snake_case() {
        let action: RepoSubscriptionAction = serde_json::from_value(json!("all_activity")).unwrap();
        assert_eq!(action, RepoSubscriptionAction::AllActivity);
        assert!(serde_json::from_value::<RepoSubscriptionAction>(json!("watch")).is_err());
    }

    #[tokio::test]
    async fn test_list_notifications_applies_defaults() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notifications"))
            .and(query_param("page", "1"))
            .and(query_param("per_page", "50"))
            .and(query_param("participating", "true"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([notification_json("1"), notification_json("2")])),
            )
            .expect(1)
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .list_notifications(Parameters(ListNotificationsParams {
                participating: Some(true),
                ..Default::default()
            }))
            .await
            .unwrap();

        let text = result_text(&result);
        assert!(text.starts_with("2 notifications found:\n\nID: 1\n"));
        assert!(text.contains("URL: https://github.com/octocat/hello/issues/2"));
        assert!(!text.contains("More notifications"));

        let requests = mock.received_requests().await.unwrap();
        let query = requests[0].url.query().unwrap_or_default();
        assert!(!query.contains("all="));
        assert!(!query.contains("since="));
    }

    #[tokio::test]
    async fn test_list_notifications_empty() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notifications"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .list_notifications(Parameters(ListNotificationsParams::default()))
            .await
            .unwrap();
        assert_eq!(
            result_text(&result),
            "No notifications found with the given criteria."
        );
    }

    #[tokio::test]
    async fn test_list_notifications_full_page_hints_next() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notifications"))
            .and(query_param("page", "3"))
            .and(query_param("per_page", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([notification_json("1"), notification_json("2")])),
            )
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .list_notifications(Parameters(ListNotificationsParams {
                page: Some(3),
                per_page: Some(2),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert!(result_text(&result).ends_with(
            "More notifications may be available. You can view the next page by specifying 'page: 4' in the request."
        ));
    }

    #[tokio::test]
    async fn test_list_notifications_rejects_invalid_input_without_request() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let err = server
            .list_notifications(Parameters(ListNotificationsParams {
                since: Some("Mon, 15 Jan 2024 10:30:00 GMT".into()),
                page: Some(101),
                ..Default::default()
            }))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        let data = err.data.unwrap();
        assert_eq!(data["fields"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_notifications_rate_limited_is_tool_error() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notifications"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-ratelimit-remaining", "0")
                    .insert_header("x-ratelimit-reset", "1700000000")
                    .set_body_json(json!({"message": "API rate limit exceeded"})),
            )
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .list_notifications(Parameters(ListNotificationsParams::default()))
            .await
            .unwrap();
        assert!(is_error(&result));
        assert!(result_text(&result)
            .starts_with("Failed to fetch notifications: GitHub API rate limit exceeded. Resets at "));
    }

    #[tokio::test]
    async fn test_mark_notifications_read_body() {
        let mock = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/notifications"))
            .and(body_json(json!({"read": true})))
            .respond_with(ResponseTemplate::new(205))
            .expect(1)
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .mark_notifications_read(Parameters(MarkNotificationsReadParams::default()))
            .await
            .unwrap();
        assert_eq!(
            result_text(&result),
            "Successfully marked notifications as read."
        );
    }

    #[tokio::test]
    async fn test_mark_notifications_read_async_message() {
        let mock = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/notifications"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "message": "Unread notifications couldn't be marked in a single request. Notifications are being marked as read in the background."
            })))
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .mark_notifications_read(Parameters(MarkNotificationsReadParams {
                last_read_at: Some("2024-01-15T10:30:00Z".into()),
                read: Some(true),
            }))
            .await
            .unwrap();
        assert!(result_text(&result).contains("in the background"));

        let requests = mock.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["last_read_at"], "2024-01-15T10:30:00Z");
        assert_eq!(body["read"], true);
    }

    #[tokio::test]
    async fn test_mark_notifications_unread_mentions_cutoff() {
        let mock = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/notifications"))
            .respond_with(ResponseTemplate::new(205))
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .mark_notifications_read(Parameters(MarkNotificationsReadParams {
                last_read_at: Some("2024-01-15T10:30:00Z".into()),
                read: Some(false),
            }))
            .await
            .unwrap();
        let text = result_text(&result);
        assert!(text.starts_with("Successfully marked notifications as unread. "));
        assert!(text.ends_with("were affected."));
    }

    #[tokio::test]
    async fn test_get_thread() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notifications/threads/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(notification_json("42")))
            .expect(1)
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .get_thread(Parameters(ThreadParams {
                thread_id: "42".into(),
            }))
            .await
            .unwrap();
        assert!(result_text(&result).starts_with("Thread details:\n\nID: 42\n"));
    }

    #[tokio::test]
    async fn test_get_thread_not_found_is_tool_error() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notifications/threads/42"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .get_thread(Parameters(ThreadParams {
                thread_id: "42".into(),
            }))
            .await
            .unwrap();
        assert!(is_error(&result));
        assert_eq!(
            result_text(&result),
            "Failed to fetch thread 42: Resource not found: Not Found"
        );
    }

    #[tokio::test]
    async fn test_thread_id_is_validated_before_request() {
        let mock = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let err = server
            .mark_thread_done(Parameters(ThreadParams {
                thread_id: "../../user".into(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("thread_id"));
    }

    #[tokio::test]
    async fn test_mark_thread_read() {
        let mock = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/notifications/threads/42"))
            .respond_with(ResponseTemplate::new(205))
            .expect(1)
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .mark_thread_read(Parameters(ThreadParams {
                thread_id: "42".into(),
            }))
            .await
            .unwrap();
        assert_eq!(result_text(&result), "Successfully marked thread 42 as read.");
    }

    #[tokio::test]
    async fn test_mark_thread_done() {
        let mock = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/notifications/threads/42"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .mark_thread_done(Parameters(ThreadParams {
                thread_id: "42".into(),
            }))
            .await
            .unwrap();
        assert_eq!(result_text(&result), "Successfully marked thread 42 as done.");
    }

    #[tokio::test]
    async fn test_get_thread_subscription_not_found_is_benign() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notifications/threads/42/subscription"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .get_thread_subscription(Parameters(ThreadParams {
                thread_id: "42".into(),
            }))
            .await
            .unwrap();
        assert!(!is_error(&result));
        assert_eq!(result_text(&result), "You are not subscribed to thread 42.");
    }

    #[tokio::test]
    async fn test_get_thread_subscription() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notifications/threads/42/subscription"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"subscribed": true, "ignored": false})),
            )
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .get_thread_subscription(Parameters(ThreadParams {
                thread_id: "42".into(),
            }))
            .await
            .unwrap();
        assert_eq!(
            result_text(&result),
            "Subscription status for thread 42:\n\nSubscription Status: Subscribed\nIgnored: No"
        );
    }

    #[tokio::test]
    async fn test_set_thread_subscription_ignores() {
        let mock = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/notifications/threads/42/subscription"))
            .and(body_json(json!({"ignored": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"subscribed": false, "ignored": true})),
            )
            .expect(1)
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .set_thread_subscription(Parameters(SetThreadSubscriptionParams {
                thread_id: "42".into(),
                ignored: Some(true),
            }))
            .await
            .unwrap();
        assert!(result_text(&result)
            .starts_with("Successfully updated subscription by ignoring thread 42:\n\n"));
    }

    #[tokio::test]
    async fn test_delete_thread_subscription_not_found_is_benign() {
        let mock = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/notifications/threads/42/subscription"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .delete_thread_subscription(Parameters(ThreadParams {
                thread_id: "42".into(),
            }))
            .await
            .unwrap();
        assert!(!is_error(&result));
        assert_eq!(result_text(&result), "You were not subscribed to thread 42.");
    }

    #[tokio::test]
    async fn test_delete_thread_subscription_other_errors_surface() {
        let mock = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/notifications/threads/42/subscription"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})))
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .delete_thread_subscription(Parameters(ThreadParams {
                thread_id: "42".into(),
            }))
            .await
            .unwrap();
        assert!(is_error(&result));
        assert!(result_text(&result).contains("Authentication failed"));
    }

    #[tokio::test]
    async fn test_list_repo_notifications_defaults_to_30() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/hello/notifications"))
            .and(query_param("page", "1"))
            .and(query_param("per_page", "30"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .list_repo_notifications(Parameters(ListRepoNotificationsParams {
                owner: "octocat".into(),
                repo: "hello".into(),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(
            result_text(&result),
            "No notifications found for repository octocat/hello with the given criteria."
        );
    }

    #[tokio::test]
    async fn test_list_repo_notifications_reports_every_bad_field() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let err = server
            .list_repo_notifications(Parameters(ListRepoNotificationsParams {
                owner: "../etc".into(),
                repo: "%2e%2e%2fpasswd".into(),
                per_page: Some(0),
                ..Default::default()
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        let fields: Vec<String> = err.data.unwrap()["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(fields, vec!["owner", "repo", "per_page"]);
    }

    #[tokio::test]
    async fn test_mark_repo_notifications_read() {
        let mock = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/repos/octocat/hello/notifications"))
            .and(body_json(json!({})))
            .respond_with(ResponseTemplate::new(205))
            .expect(1)
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .mark_repo_notifications_read(Parameters(MarkRepoNotificationsReadParams {
                owner: "octocat".into(),
                repo: "hello".into(),
                last_read_at: None,
            }))
            .await
            .unwrap();
        assert_eq!(
            result_text(&result),
            "Successfully marked notifications in octocat/hello as read."
        );
    }

    #[tokio::test]
    async fn test_mark_repo_notifications_read_bad_timestamp() {
        let mock = MockServer::start().await;
        let server = make_server(&mock);
        let err = server
            .mark_repo_notifications_read(Parameters(MarkRepoNotificationsReadParams {
                owner: "octocat".into(),
                repo: "hello".into(),
                last_read_at: Some("yesterday".into()),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("last_read_at"));
        assert!(mock.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_manage_repo_subscription_ignore() {
        let mock = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/repos/octocat/hello/subscription"))
            .and(body_json(json!({"subscribed": false, "ignored": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"subscribed": false, "ignored": true})),
            )
            .expect(1)
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .manage_repo_subscription(Parameters(repo_subscription_params(
                RepoSubscriptionAction::Ignore,
            )))
            .await
            .unwrap();
        assert_eq!(
            result_text(&result),
            "Successfully set octocat/hello to ignore all notifications"
        );
    }

    #[tokio::test]
    async fn test_manage_repo_subscription_default_deletes() {
        let mock = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/repos/octocat/hello/subscription"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .manage_repo_subscription(Parameters(repo_subscription_params(
                RepoSubscriptionAction::Default,
            )))
            .await
            .unwrap();
        assert!(result_text(&result).contains("default settings"));
    }

    #[tokio::test]
    async fn test_manage_repo_subscription_get() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/hello/subscription"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "subscribed": true,
                "ignored": false,
                "created_at": "2024-01-15T10:30:00Z"
            })))
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .manage_repo_subscription(Parameters(repo_subscription_params(
                RepoSubscriptionAction::Get,
            )))
            .await
            .unwrap();
        let text = result_text(&result);
        assert!(text.starts_with("Subscription status for octocat/hello:\n"));
        assert!(text.contains("• API Subscription: Watching all activity"));
        assert!(text.contains("• Notifications: Active"));
        assert!(text.ends_with("• Web Interface: https://github.com/octocat/hello"));
    }

    #[tokio::test]
    async fn test_manage_repo_subscription_get_not_found_explains_defaults() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/hello/subscription"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .manage_repo_subscription(Parameters(repo_subscription_params(
                RepoSubscriptionAction::Get,
            )))
            .await
            .unwrap();
        assert!(!is_error(&result));
        assert!(result_text(&result)
            .contains("• Default settings (participating and @mentions only)"));
    }

    #[tokio::test]
    async fn test_manage_repo_subscription_not_found_on_write_is_error() {
        let mock = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/repos/octocat/hello/subscription"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&mock)
            .await;

        let server = make_server(&mock);
        let result = server
            .manage_repo_subscription(Parameters(repo_subscription_params(
                RepoSubscriptionAction::AllActivity,
            )))
            .await
            .unwrap();
        assert!(is_error(&result));
        assert_eq!(
            result_text(&result),
            "Failed to manage repository subscription for octocat/hello: Resource not found: Not Found"
        );
    }
}
