//! Stateless HTTP request builder and response parser for the todo API.
//!
//! # Design
//! `TodoClient` holds the base URL and optional API key and carries no
//! mutable state between calls. Each operation is split into a `build_*`
//! method that produces an `HttpRequest` and a `parse_*` method that
//! consumes an `HttpResponse`. Request shapes are validated in `build_*`,
//! so an invalid request never reaches the network.
//!
//! Every `parse_*` goes through `check_status`, the one place status codes
//! are mapped to `ApiError`.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::debug;
use uuid::Uuid;

use crate::config::Settings;
use crate::error::{parse_validation_body, ApiError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{parse_todo, parse_todos, HealthStatus, NewTodo, QueryFilter, TodoItem, TodoPatch};

pub const API_KEY_HEADER: &str = "x-api-key";

/// RFC 3986 unreserved characters pass through, everything else is escaped.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Synchronous, stateless client for the todo API.
#[derive(Debug, Clone)]
pub struct TodoClient {
    base_url: String,
    api_key: Option<String>,
}

impl TodoClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let client = Self::new(&settings.base_url);
        match &settings.api_key {
            Some(key) => client.with_api_key(key),
            None => client,
        }
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_health(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/health".to_string(), None)
    }

    pub fn build_list_todos(&self, filter: &QueryFilter) -> Result<HttpRequest, ApiError> {
        filter.validate()?;
        let query = filter
            .pairs()
            .into_iter()
            .map(|(key, value)| format!("{key}={}", utf8_percent_encode(&value, QUERY_VALUE)))
            .collect::<Vec<_>>()
            .join("&");
        let path = if query.is_empty() {
            "/todos".to_string()
        } else {
            format!("/todos?{query}")
        };
        Ok(self.request(HttpMethod::Get, path, None))
    }

    pub fn build_get_todo(&self, id: Uuid) -> HttpRequest {
        self.request(HttpMethod::Get, format!("/todos/{id}"), None)
    }

    pub fn build_create_todo(&self, input: &NewTodo) -> Result<HttpRequest, ApiError> {
        input.validate()?;
        let body = serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self.request(HttpMethod::Post, "/todos".to_string(), Some(body)))
    }

    pub fn build_update_todo(&self, id: Uuid, patch: &TodoPatch) -> Result<HttpRequest, ApiError> {
        patch.validate()?;
        let body = serde_json::to_string(patch).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self.request(HttpMethod::Patch, format!("/todos/{id}"), Some(body)))
    }

    pub fn build_delete_todo(&self, id: Uuid) -> HttpRequest {
        self.request(HttpMethod::Delete, format!("/todos/{id}"), None)
    }

    pub fn parse_health(&self, response: HttpResponse) -> Result<HealthStatus, ApiError> {
        check_status(&response, "/health")?;
        serde_json::from_str(&response.body).map_err(|e| ApiError::ResponseParse(e.to_string()))
    }

    pub fn parse_list_todos(&self, response: HttpResponse) -> Result<Vec<TodoItem>, ApiError> {
        check_status(&response, "/todos")?;
        parse_todos(&response.body)
    }

    pub fn parse_get_todo(&self, id: Uuid, response: HttpResponse) -> Result<TodoItem, ApiError> {
        check_status(&response, &id.to_string())?;
        parse_todo(&response.body)
    }

    pub fn parse_create_todo(&self, response: HttpResponse) -> Result<TodoItem, ApiError> {
        check_status(&response, "/todos")?;
        parse_todo(&response.body)
    }

    pub fn parse_update_todo(&self, id: Uuid, response: HttpResponse) -> Result<TodoItem, ApiError> {
        check_status(&response, &id.to_string())?;
        parse_todo(&response.body)
    }

    /// Any 2xx is success; the body, if any, is ignored.
    pub fn parse_delete_todo(&self, id: Uuid, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, &id.to_string())
    }

    fn request(&self, method: HttpMethod, path: String, body: Option<String>) -> HttpRequest {
        let mut headers = vec![("accept".to_string(), "application/json".to_string())];
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        if let Some(key) = &self.api_key {
            headers.push((API_KEY_HEADER.to_string(), key.clone()));
        }
        let url = format!("{}{path}", self.base_url);
        debug!(method = method.as_str(), %url, authenticated = self.api_key.is_some(), "built request");
        HttpRequest {
            method,
            url,
            headers,
            body,
        }
    }
}

/// Map a response status to success or the matching `ApiError` variant.
///
/// `resource` names what was requested and ends up in `NotFound`.
pub fn check_status(response: &HttpResponse, resource: &str) -> Result<(), ApiError> {
    match response.status {
        200..=299 => Ok(()),
        401 => Err(ApiError::Auth("missing or invalid API key".to_string())),
        403 => Err(ApiError::Auth("forbidden".to_string())),
        404 => Err(ApiError::NotFound(resource.to_string())),
        422 => Err(ApiError::Validation(parse_validation_body(&response.body))),
        500..=599 => Err(ApiError::Transport(format!(
            "server error {}: {}",
            response.status,
            response.body.trim()
        ))),
        status => Err(ApiError::UnexpectedStatus {
            status,
            body: response.body.clone(),
        }),
    }
}
