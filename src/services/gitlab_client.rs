//! GitLab API client.
//!
//! Provides an HTTP client for GitLab API v4 with token authentication,
//! restricted to the two calls a reminder run needs: listing open merge
//! requests and reading a merge request's approvals.

use crate::error::AppError;
use crate::models::{Approval, MergeRequest, TimestampField};
use chrono::{DateTime, Utc};
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Default number of merge requests requested in the single listing call.
pub const DEFAULT_PER_PAGE: u32 = 1000;

/// GitLab API client configuration.
#[derive(Debug, Clone)]
pub struct GitLabClientConfig {
    /// Base URL of the GitLab instance (e.g., `https://gitlab.com`).
    pub base_url: String,

    /// Personal access token for authentication.
    pub token: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Page size of the merge request listing.
    pub per_page: u32,
}

impl Default for GitLabClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            timeout_secs: 30,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// GitLab API client.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    client: Client,
    config: GitLabClientConfig,
}

/// Pagination information from GitLab API response headers.
#[derive(Debug, Clone, Default)]
pub struct PaginationInfo {
    /// Current page number.
    pub page: u32,

    /// Number of items per page.
    pub per_page: u32,

    /// Total number of items, when GitLab reports it.
    pub total: Option<u32>,

    /// Next page number (if any).
    pub next_page: Option<u32>,
}

/// Paginated response from GitLab API.
#[derive(Debug)]
pub struct PaginatedResponse<T> {
    /// The response data.
    pub data: Vec<T>,

    /// Pagination information.
    pub pagination: PaginationInfo,
}

/// Query parameters for listing merge requests.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeRequestsQuery {
    /// Filter by state: `opened`, `merged`, `closed`, `all`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Filter by scope: `created_by_me`, `assigned_to_me`, `all`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Order by `created_at` or `updated_at`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,

    /// `asc` or `desc`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,

    /// Page number for pagination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Number of items per page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,

    /// Filter WIP/Draft MRs: `yes` or `no`.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "wip")]
    pub draft: Option<String>,
}

impl MergeRequestsQuery {
    /// Open, non-draft merge requests across everything the token can see.
    pub fn open_non_draft(order: TimestampField, per_page: u32) -> Self {
        Self {
            state: Some("opened".to_string()),
            scope: Some("all".to_string()),
            order_by: Some(order.order_by().to_string()),
            sort: Some("desc".to_string()),
            page: Some(1),
            per_page: Some(per_page),
            draft: Some("no".to_string()),
        }
    }
}

/// GitLab merge request from API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabMergeRequest {
    pub id: i64,
    pub iid: i64,
    pub project_id: i64,
    pub title: String,
    pub web_url: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub author: GitLabUser,
    pub reviewers: Option<Vec<GitLabUser>>,
    pub draft: Option<bool>,
    pub work_in_progress: Option<bool>,
}

/// GitLab user from API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabUser {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub name: String,
}

/// Response from the MR approvals endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeRequestApprovals {
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub approvals_left: Option<i64>,
    #[serde(default)]
    pub approved_by: Vec<ApprovedBy>,
}

/// User who approved an MR.
#[derive(Debug, Clone, Deserialize)]
pub struct ApprovedBy {
    pub user: GitLabUser,
}

impl From<GitLabMergeRequest> for MergeRequest {
    fn from(mr: GitLabMergeRequest) -> Self {
        Self {
            id: mr.id,
            iid: mr.iid,
            project_id: mr.project_id,
            title: mr.title,
            web_url: mr.web_url,
            author_username: mr.author.username,
            created_at: mr.created_at.as_deref().and_then(parse_iso_timestamp),
            updated_at: mr.updated_at.as_deref().and_then(parse_iso_timestamp),
            reviewers: mr
                .reviewers
                .unwrap_or_default()
                .into_iter()
                .map(|u| u.username)
                .collect(),
            draft: mr.draft.or(mr.work_in_progress).unwrap_or(false),
        }
    }
}

impl MergeRequestApprovals {
    /// Convert into the domain approval record for `mr_id`.
    pub fn into_approval(self, mr_id: i64) -> Approval {
        Approval::new(mr_id, self.approved_by.into_iter().map(|a| a.user.username))
    }
}

/// Where a reminder run reads merge requests and approvals from.
#[allow(async_fn_in_trait)]
pub trait MergeRequestSource {
    /// Open, non-draft merge requests ordered by `order` (newest first).
    async fn open_merge_requests(&self, order: TimestampField)
        -> Result<Vec<MergeRequest>, AppError>;

    /// Approval record of `mr`, or `None` when GitLab has none.
    async fn approvals(&self, mr: &MergeRequest) -> Result<Option<Approval>, AppError>;
}

impl GitLabClient {
    /// Create a new GitLab client.
    pub fn new(config: GitLabClientConfig) -> Result<Self, AppError> {
        let mut headers = header::HeaderMap::new();

        // Add the private token header for authentication
        let token_value = header::HeaderValue::from_str(&config.token)
            .map_err(|_| AppError::authentication("Invalid token format"))?;
        headers.insert("PRIVATE-TOKEN", token_value);

        // Build the HTTP client
        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Get the base URL for API requests.
    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v4{}", normalize_base_url(&self.config.base_url), path)
    }

    /// Parse pagination headers from response.
    fn parse_pagination(response: &Response) -> PaginationInfo {
        let headers = response.headers();

        let get_header = |name: &str| -> Option<u32> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
        };

        PaginationInfo {
            page: get_header("x-page").unwrap_or(1),
            per_page: get_header("x-per-page").unwrap_or(20),
            total: get_header("x-total"),
            next_page: get_header("x-next-page"),
        }
    }

    /// Handle API response errors.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
        endpoint: &str,
    ) -> Result<T, AppError> {
        let status = response.status();

        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| AppError::internal(format!("Failed to parse response: {}", e)))
        } else if status == StatusCode::UNAUTHORIZED {
            Err(AppError::authentication("GitLab token is invalid, expired or revoked"))
        } else {
            let status_code = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            let body_message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    // GitLab returns errors as {"message": "..."} or {"error": "..."}
                    v.get("message").or_else(|| v.get("error")).map(|m| match m.as_str() {
                        Some(s) => s.to_string(),
                        // Sometimes "message" is an object like {"base":["msg"]}
                        None => m.to_string(),
                    })
                });

            let message = match (status, &body_message) {
                (StatusCode::FORBIDDEN, _) => "Access denied".to_string(),
                (StatusCode::NOT_FOUND, _) => "Resource not found".to_string(),
                (StatusCode::TOO_MANY_REQUESTS, _) => "Rate limit exceeded".to_string(),
                (_, Some(msg)) => msg.clone(),
                _ => format!("Request failed ({}): {}", status_code, body),
            };

            Err(AppError::gitlab_api_full(message, status_code, endpoint))
        }
    }

    /// Make a GET request for a single page.
    async fn get_paginated<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: Option<&impl Serialize>,
    ) -> Result<PaginatedResponse<T>, AppError> {
        let url = self.api_url(endpoint);

        let mut request = self.client.get(&url);
        if let Some(q) = query {
            request = request.query(q);
        }

        let response = request.send().await?;
        let pagination = Self::parse_pagination(&response);
        let data = self.handle_response::<Vec<T>>(response, endpoint).await?;

        Ok(PaginatedResponse { data, pagination })
    }

    /// List merge requests.
    pub async fn list_merge_requests(
        &self,
        query: &MergeRequestsQuery,
    ) -> Result<PaginatedResponse<GitLabMergeRequest>, AppError> {
        self.get_paginated("/merge_requests", Some(query)).await
    }

    /// Get approval status for a merge request.
    ///
    /// A 404 or a `null` body yields `Ok(None)`.
    pub async fn get_mr_approvals(
        &self,
        project_id: i64,
        mr_iid: i64,
    ) -> Result<Option<MergeRequestApprovals>, AppError> {
        let endpoint = format!(
            "/projects/{}/merge_requests/{}/approvals",
            project_id, mr_iid
        );
        let url = self.api_url(&endpoint);
        let response = self.client.get(&url).send().await?;
        match self
            .handle_response::<Option<MergeRequestApprovals>>(response, &endpoint)
            .await
        {
            Ok(approvals) => Ok(approvals),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl MergeRequestSource for GitLabClient {
    async fn open_merge_requests(
        &self,
        order: TimestampField,
    ) -> Result<Vec<MergeRequest>, AppError> {
        let query = MergeRequestsQuery::open_non_draft(order, self.config.per_page);
        let response = self.list_merge_requests(&query).await?;

        if let Some(next) = response.pagination.next_page {
            log::warn!(
                "GitLab reports more merge requests (next page {}, total {}); only the first {} are processed",
                next,
                response
                    .pagination
                    .total
                    .map_or_else(|| "unknown".to_string(), |t| t.to_string()),
                response.data.len()
            );
        }

        let total = response.data.len();
        let requests: Vec<MergeRequest> = response
            .data
            .into_iter()
            .map(MergeRequest::from)
            .filter(|mr| !mr.draft)
            .collect();
        log::debug!(
            "Fetched {} open merge requests ({} drafts dropped)",
            requests.len(),
            total - requests.len()
        );

        Ok(requests)
    }

    async fn approvals(&self, mr: &MergeRequest) -> Result<Option<Approval>, AppError> {
        let approvals = self.get_mr_approvals(mr.project_id, mr.iid).await?;
        Ok(approvals.map(|a| a.into_approval(mr.id)))
    }
}

/// Strip trailing slashes and an explicit `/api/v4` suffix.
fn normalize_base_url(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    trimmed
        .strip_suffix("/api/v4")
        .unwrap_or(trimmed)
        .trim_end_matches('/')
}

/// Parse an ISO 8601 timestamp.
fn parse_iso_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_construction() {
        let client = GitLabClient::new(GitLabClientConfig {
            base_url: "https://gitlab.com/".to_string(),
            token: "test-token".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.api_url("/user"), "https://gitlab.com/api/v4/user");
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("https://gitlab.com"), "https://gitlab.com");
        assert_eq!(normalize_base_url("https://gitlab.com///"), "https://gitlab.com");
        assert_eq!(normalize_base_url("https://gitlab.com/api/v4"), "https://gitlab.com");
        assert_eq!(
            normalize_base_url("https://git.example.com/api/v4/"),
            "https://git.example.com"
        );
    }

    #[test]
    fn test_invalid_token_header_rejected() {
        let result = GitLabClient::new(GitLabClientConfig {
            base_url: "https://gitlab.com".to_string(),
            token: "bad\ntoken".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(AppError::Authentication { .. })));
    }

    #[test]
    fn test_merge_requests_query_serialization() {
        let query = MergeRequestsQuery::open_non_draft(TimestampField::Created, 500);

        let json = serde_json::to_string(&query).unwrap();
        assert!(json.contains("\"state\":\"opened\""));
        assert!(json.contains("\"scope\":\"all\""));
        assert!(json.contains("\"order_by\":\"created_at\""));
        assert!(json.contains("\"per_page\":500"));
        assert!(json.contains("\"wip\":\"no\""));
    }

    #[test]
    fn test_optional_query_fields_not_serialized() {
        let query = MergeRequestsQuery {
            state: Some("opened".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&query).unwrap();
        assert!(!json.contains("order_by"));
        assert!(!json.contains("wip"));
    }

    #[test]
    fn test_parse_iso_timestamp() {
        let ts = parse_iso_timestamp("2024-01-15T10:30:00Z").unwrap();
        let ts2 = parse_iso_timestamp("2024-01-15T12:30:00+02:00").unwrap();
        assert_eq!(ts, ts2);

        let ts3 = parse_iso_timestamp("2024-01-15T10:30:00.123Z").unwrap();
        assert_eq!(ts3.timestamp(), ts.timestamp());

        assert!(parse_iso_timestamp("invalid").is_none());
    }

    #[test]
    fn test_merge_request_conversion() {
        let json = r#"{
            "id": 101,
            "iid": 7,
            "project_id": 42,
            "title": "Add feature",
            "web_url": "https://gitlab.com/group/project/-/merge_requests/7",
            "created_at": "2024-01-10T08:00:00.000Z",
            "updated_at": "not a date",
            "author": {"id": 1, "username": "carol", "name": "Carol"},
            "reviewers": [
                {"id": 2, "username": "alice", "name": "Alice"},
                {"id": 3, "username": "bob", "name": "Bob"}
            ],
            "draft": false
        }"#;
        let api: GitLabMergeRequest = serde_json::from_str(json).unwrap();
        let mr = MergeRequest::from(api);

        assert_eq!(mr.id, 101);
        assert_eq!(mr.iid, 7);
        assert_eq!(mr.project_id, 42);
        assert_eq!(mr.author_username, "carol");
        assert_eq!(mr.reviewers, vec!["alice", "bob"]);
        assert!(mr.created_at.is_some());
        assert!(mr.updated_at.is_none());
        assert!(!mr.draft);
    }

    #[test]
    fn test_merge_request_conversion_defaults() {
        let json = r#"{
            "id": 1,
            "iid": 2,
            "project_id": 3,
            "title": "WIP: thing",
            "web_url": "https://gitlab.com/g/p/-/merge_requests/2",
            "author": {"id": 1, "username": "dave"},
            "reviewers": null,
            "work_in_progress": true
        }"#;
        let api: GitLabMergeRequest = serde_json::from_str(json).unwrap();
        let mr = MergeRequest::from(api);

        assert!(mr.reviewers.is_empty());
        assert!(mr.created_at.is_none());
        assert!(mr.draft);
    }

    #[test]
    fn test_approvals_into_approval() {
        let json = r#"{
            "approved": false,
            "approvals_left": 1,
            "approved_by": [{"user": {"id": 2, "username": "alice", "name": "Alice"}}]
        }"#;
        let approvals: MergeRequestApprovals = serde_json::from_str(json).unwrap();
        let approval = approvals.into_approval(101);

        assert_eq!(approval.mr_id, 101);
        assert!(approval.has_approved("alice"));
        assert_eq!(approval.approved_by.len(), 1);
    }
}
