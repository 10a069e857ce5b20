//! Input validation for tool parameters.
//!
//! Every value that ends up in a request path or query string is parsed into
//! one of the types below before any request is built. A value that
//! constructs successfully is safe to interpolate into a GitHub API route and
//! is never mutated afterwards.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static OWNER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?$").expect("owner regex should compile")
});

static REPO_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("repo regex should compile"));

static THREAD_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("thread id regex should compile"));

// ASCII classes on purpose: `\d` would also accept non-ASCII digits.
static TIMESTAMP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}(\.[0-9]+)?(Z|[+-][0-9]{2}:[0-9]{2})$",
    )
    .expect("timestamp regex should compile")
});

/// The rule a raw value broke.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("must not be empty")]
    Empty,

    #[error("must be at most {max} characters")]
    TooLong { max: usize },

    #[error("{0}")]
    Pattern(&'static str),

    #[error("must be between {min} and {max}")]
    OutOfRange { min: i64, max: i64 },

    #[error("contains invalid characters or path traversal attempts")]
    Traversal,
}

/// A violation attached to the parameter it was found in.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {violation}")]
pub struct FieldError {
    pub field: String,
    pub violation: Violation,
}

/// Every field failure found while validating one set of parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn single(field: &str, violation: Violation) -> Self {
        Self {
            errors: vec![FieldError {
                field: field.to_string(),
                violation,
            }],
        }
    }

    /// Record the outcome of validating `field`, returning the value on success.
    pub fn check<T>(&mut self, field: &str, result: Result<T, Violation>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(violation) => {
                self.errors.push(FieldError {
                    field: field.to_string(),
                    violation,
                });
                None
            }
        }
    }

    /// Merge the failures of a nested record into this one.
    pub fn absorb<T>(&mut self, result: Result<T, ValidationErrors>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(nested) => {
                self.errors.extend(nested.errors);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

fn check_length(raw: &str, max: usize) -> Result<(), Violation> {
    let len = raw.chars().count();
    if len == 0 {
        Err(Violation::Empty)
    } else if len > max {
        Err(Violation::TooLong { max })
    } else {
        Ok(())
    }
}

/// Percent-decode `raw` and look for anything that could escape the
/// `/repos/{owner}/{repo}` segment. Undecodable input counts as hostile.
fn is_traversal(raw: &str) -> bool {
    match urlencoding::decode(raw) {
        Ok(decoded) => {
            decoded.contains("..")
                || decoded.contains('\0')
                || decoded.contains('/')
                || decoded.contains('\\')
                || decoded.starts_with('.')
        }
        Err(_) => true,
    }
}

macro_rules! string_value {
    ($name:ident) => {
        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

/// GitHub user or organization login.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoOwner(String);

impl RepoOwner {
    pub const MAX_LEN: usize = 39;

    pub fn validate(raw: &str) -> Result<Self, Violation> {
        check_length(raw, Self::MAX_LEN)?;
        if !OWNER_REGEX.is_match(raw) {
            return Err(Violation::Pattern(
                "must start and end with an alphanumeric character and may contain hyphens",
            ));
        }
        Ok(Self(raw.to_string()))
    }
}

string_value!(RepoOwner);

/// Repository name.
///
/// The character class alone would let `a..b` through, and a decoder further
/// down the line could turn `%2e%2e%2f` into `../`, so the name is also
/// percent-decoded and checked for traversal sequences.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoName(String);

impl RepoName {
    pub const MAX_LEN: usize = 100;

    pub fn validate(raw: &str) -> Result<Self, Violation> {
        check_length(raw, Self::MAX_LEN)?;
        if !REPO_REGEX.is_match(raw) {
            return Err(Violation::Pattern(
                "may only contain alphanumeric characters, dots, underscores, and hyphens",
            ));
        }
        if is_traversal(raw) {
            return Err(Violation::Traversal);
        }
        Ok(Self(raw.to_string()))
    }
}

string_value!(RepoName);

/// Numeric notification thread id, kept as a string because GitHub does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadId(String);

impl ThreadId {
    pub const MAX_LEN: usize = 20;

    pub fn validate(raw: &str) -> Result<Self, Violation> {
        check_length(raw, Self::MAX_LEN)?;
        if !THREAD_ID_REGEX.is_match(raw) {
            return Err(Violation::Pattern("must be numeric"));
        }
        Ok(Self(raw.to_string()))
    }
}

string_value!(ThreadId);

/// ISO 8601 timestamp such as `2024-01-15T10:30:00Z` or
/// `2024-01-15T10:30:00.123+05:30`.
///
/// Only the shape is checked; GitHub is the authority on calendar validity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Timestamp(String);

impl Timestamp {
    pub const MAX_LEN: usize = 64;

    pub fn validate(raw: &str) -> Result<Self, Violation> {
        check_length(raw, Self::MAX_LEN)?;
        if !TIMESTAMP_REGEX.is_match(raw) {
            return Err(Violation::Pattern(
                "must be a valid ISO 8601 timestamp (e.g., 2024-01-15T10:30:00Z)",
            ));
        }
        Ok(Self(raw.to_string()))
    }
}

string_value!(Timestamp);

const PAGE_MIN: i64 = 1;
const PAGE_MAX: i64 = 100;

fn check_page_bounds(raw: i64) -> Result<u32, Violation> {
    if (PAGE_MIN..=PAGE_MAX).contains(&raw) {
        // Bounded to 1..=100 above.
        Ok(raw as u32)
    } else {
        Err(Violation::OutOfRange {
            min: PAGE_MIN,
            max: PAGE_MAX,
        })
    }
}

/// Page number for list endpoints, 1 through 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageNumber(u32);

impl PageNumber {
    pub fn validate(raw: i64) -> Result<Self, Violation> {
        check_page_bounds(raw).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// Results per page for list endpoints, 1 through 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PerPage(u32);

impl PerPage {
    pub fn validate(raw: i64) -> Result<Self, Violation> {
        check_page_bounds(raw).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// Optional pagination. Defaults are left to the endpoint being called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub page: Option<PageNumber>,
    pub per_page: Option<PerPage>,
}

impl Pagination {
    pub fn validate(page: Option<i64>, per_page: Option<i64>) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let page = errors.check("page", page.map(PageNumber::validate).transpose());
        let per_page = errors.check("per_page", per_page.map(PerPage::validate).transpose());

        match (page, per_page) {
            (Some(page), Some(per_page)) => Ok(Self { page, per_page }),
            _ => Err(errors),
        }
    }
}

/// `owner/repo` pair used in repository-scoped routes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoIdentifier {
    pub owner: RepoOwner,
    pub repo: RepoName,
}

impl RepoIdentifier {
    pub fn validate(owner: &str, repo: &str) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let owner = errors.check("owner", RepoOwner::validate(owner));
        let repo = errors.check("repo", RepoName::validate(repo));

        match (owner, repo) {
            (Some(owner), Some(repo)) => Ok(Self { owner, repo }),
            _ => Err(errors),
        }
    }
}

impl fmt::Display for RepoIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Filters accepted by both notification list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFilter {
    pub all: Option<bool>,
    pub participating: Option<bool>,
    pub since: Option<Timestamp>,
    pub before: Option<Timestamp>,
    pub pagination: Pagination,
}

impl NotificationFilter {
    pub fn validate(
        all: Option<bool>,
        participating: Option<bool>,
        since: Option<&str>,
        before: Option<&str>,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let since = errors.check("since", since.map(Timestamp::validate).transpose());
        let before = errors.check("before", before.map(Timestamp::validate).transpose());
        let pagination = errors.absorb(Pagination::validate(page, per_page));

        match (since, before, pagination) {
            (Some(since), Some(before), Some(pagination)) => Ok(Self {
                all,
                participating,
                since,
                before,
                pagination,
            }),
            _ => Err(errors),
        }
    }
}

/// A repository identifier combined with notification filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoNotificationsQuery {
    pub repo: RepoIdentifier,
    pub filter: NotificationFilter,
}

impl RepoNotificationsQuery {
    pub fn validate(
        owner: &str,
        repo: &str,
        filter: Result<NotificationFilter, ValidationErrors>,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let repo = errors.absorb(RepoIdentifier::validate(owner, repo));
        let filter = errors.absorb(filter);

        match (repo, filter) {
            (Some(repo), Some(filter)) => Ok(Self { repo, filter }),
            _ => Err(errors),
        }
    }
}
