//! REST collaborator.
//!
//! The view managers only see the [`WorkspaceApi`] trait; [`HttpApi`] is the
//! bearer-token HTTP implementation. Response bodies are decoded leniently:
//! a body that does not match the expected shape becomes an empty value.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use syncspace_core::{
    BoardState, ChatMessage, DocumentRecord, DocumentSummary, NewTask, NotificationFeed,
    ProjectList, ProjectSummary, Task, WorkspaceList, WorkspaceSummary,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Toast text: the server's own error text when it sent one, else
    /// `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Status { message, .. } if !message.is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

#[async_trait]
pub trait WorkspaceApi: Send + Sync {
    async fn workspaces(&self) -> Result<Vec<WorkspaceSummary>, ApiError>;
    /// Projects across every workspace the user belongs to.
    async fn projects(&self) -> Result<Vec<ProjectSummary>, ApiError>;
    async fn documents(&self, workspace_id: &str) -> Result<Vec<DocumentSummary>, ApiError>;

    async fn chat_history(&self, workspace_id: &str) -> Result<Vec<ChatMessage>, ApiError>;

    async fn load_document(&self, document_id: &str) -> Result<DocumentRecord, ApiError>;
    async fn save_document(&self, document_id: &str, content: &str) -> Result<(), ApiError>;

    async fn load_board(&self, workspace_id: &str) -> Result<BoardState, ApiError>;
    async fn create_task(&self, task: &NewTask) -> Result<Task, ApiError>;
    async fn move_task(&self, task_id: &str, status: &str) -> Result<(), ApiError>;
    async fn delete_task(&self, task_id: &str) -> Result<(), ApiError>;

    async fn notifications(&self) -> Result<NotificationFeed, ApiError>;
    async fn mark_notifications_read(&self) -> Result<(), ApiError>;
    async fn clear_notifications(&self) -> Result<(), ApiError>;
}

pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
        }
        let client = reqwest::Client::builder().default_headers(headers).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        let request = self.client.request(method.clone(), self.url(path));
        let request = match body {
            Some(json) => request.json(&json),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let value = response.json::<Value>().await.unwrap_or(Value::Null);

        if !status.is_success() {
            log::warn!("{method} {path} -> {status}");
            return Err(status_error(status, &value));
        }
        Ok(value)
    }

    async fn fetch<T: DeserializeOwned + Default>(&self, path: &str) -> Result<T, ApiError> {
        let value = self.request(Method::GET, path, None).await?;
        Ok(lenient(path, value))
    }
}

fn status_error(status: StatusCode, body: &Value) -> ApiError {
    let message = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}

fn lenient<T: DeserializeOwned + Default>(path: &str, value: Value) -> T {
    if value.is_null() {
        return T::default();
    }
    serde_json::from_value(value).unwrap_or_else(|e| {
        log::warn!("Unexpected body from {path}: {e}");
        T::default()
    })
}

#[async_trait]
impl WorkspaceApi for HttpApi {
    async fn workspaces(&self) -> Result<Vec<WorkspaceSummary>, ApiError> {
        let list: WorkspaceList = self.fetch("/api/workspace/list").await?;
        Ok(list.workspaces)
    }

    async fn projects(&self) -> Result<Vec<ProjectSummary>, ApiError> {
        let list: ProjectList = self.fetch("/api/project/list").await?;
        Ok(list.projects)
    }

    async fn documents(&self, workspace_id: &str) -> Result<Vec<DocumentSummary>, ApiError> {
        self.fetch(&format!("/api/document/workspace/{workspace_id}")).await
    }

    async fn chat_history(&self, workspace_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        self.fetch(&format!("/api/chat/{workspace_id}/messages")).await
    }

    async fn load_document(&self, document_id: &str) -> Result<DocumentRecord, ApiError> {
        self.fetch(&format!("/api/document/{document_id}")).await
    }

    async fn save_document(&self, document_id: &str, content: &str) -> Result<(), ApiError> {
        let path = format!("/api/document/{document_id}");
        self.request(Method::PUT, &path, Some(json!({ "content": content })))
            .await
            .map(drop)
    }

    async fn load_board(&self, workspace_id: &str) -> Result<BoardState, ApiError> {
        self.fetch(&format!("/api/kanban/{workspace_id}")).await
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        let body = serde_json::to_value(task).map_err(|e| ApiError::Decode(e.to_string()))?;
        let value = self.request(Method::POST, "/api/kanban/task", Some(body)).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn move_task(&self, task_id: &str, status: &str) -> Result<(), ApiError> {
        let path = format!("/api/kanban/task/{task_id}/move");
        self.request(Method::PUT, &path, Some(json!({ "status": status })))
            .await
            .map(drop)
    }

    async fn delete_task(&self, task_id: &str) -> Result<(), ApiError> {
        let path = format!("/api/kanban/task/{task_id}");
        self.request(Method::DELETE, &path, None).await.map(drop)
    }

    async fn notifications(&self) -> Result<NotificationFeed, ApiError> {
        self.fetch("/api/notifications/").await
    }

    async fn mark_notifications_read(&self) -> Result<(), ApiError> {
        self.request(Method::PUT, "/api/notifications/read", None)
            .await
            .map(drop)
    }

    async fn clear_notifications(&self) -> Result<(), ApiError> {
        self.request(Method::DELETE, "/api/notifications/", None)
            .await
            .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_reads_server_message() {
        let err = status_error(StatusCode::BAD_REQUEST, &json!({"error": "Status is required"}));
        assert!(matches!(err, ApiError::Status { status: 400, .. }));
        assert_eq!(err.user_message("Failed to move task"), "Status is required");

        let err = status_error(StatusCode::INTERNAL_SERVER_ERROR, &Value::Null);
        assert_eq!(err.user_message("Failed to move task"), "Failed to move task");

        let err = ApiError::Decode("not json".into());
        assert_eq!(err.user_message("Failed to load"), "Failed to load");
    }

    #[test]
    fn test_lenient_decoding_defaults() {
        let feed: NotificationFeed = lenient("/api/notifications/", Value::Null);
        assert_eq!(feed, NotificationFeed::default());

        let history: Vec<ChatMessage> = lenient("/x", json!({"unexpected": true}));
        assert!(history.is_empty());

        let board: BoardState = lenient("/x", json!({"tasks": [{"_id": "t1", "title": "A"}]}));
        assert!(board.boards.is_empty());
        assert_eq!(board.tasks[0].status, "todo");
    }

    #[test]
    fn test_listing_bodies() {
        let list: WorkspaceList = lenient(
            "/api/workspace/list",
            json!({"workspaces": [{"_id": "w1", "name": "Core"}]}),
        );
        assert_eq!(list.workspaces[0].name, "Core");

        // The document listing is a bare array.
        let docs: Vec<DocumentSummary> = lenient(
            "/api/document/workspace/w1",
            json!([{"_id": "d1", "title": "Plan", "workspace_id": "w1"}]),
        );
        assert_eq!(docs[0].display_title(), "Plan");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let api = HttpApi::new("http://localhost:5000/", Some("tok")).unwrap();
        assert_eq!(api.base_url(), "http://localhost:5000");
        assert_eq!(api.url("/api/kanban/w1"), "http://localhost:5000/api/kanban/w1");
    }

    #[test]
    fn test_invalid_token_header() {
        assert!(matches!(
            HttpApi::new("http://h", Some("bad\ntoken")),
            Err(ApiError::InvalidHeader(_))
        ));
    }
}
