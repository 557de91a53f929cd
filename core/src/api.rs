//! `TodoApi` pairs a `TodoClient` with a `Transport`.
//!
//! Each method is exactly one build, one round-trip, one parse. Nothing is
//! retried; the first error is returned to the caller.

use tracing::debug;
use uuid::Uuid;

use crate::client::TodoClient;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::types::{HealthStatus, NewTodo, QueryFilter, TodoItem, TodoPatch};

#[derive(Debug, Clone)]
pub struct TodoApi<T> {
    client: TodoClient,
    transport: T,
}

impl<T: Transport> TodoApi<T> {
    pub fn new(client: TodoClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &TodoClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn health(&self) -> Result<HealthStatus, ApiError> {
        let response = self.send(self.client.build_health())?;
        self.client.parse_health(response)
    }

    pub fn create(&self, input: &NewTodo) -> Result<TodoItem, ApiError> {
        let response = self.send(self.client.build_create_todo(input)?)?;
        self.client.parse_create_todo(response)
    }

    pub fn list(&self, filter: &QueryFilter) -> Result<Vec<TodoItem>, ApiError> {
        let response = self.send(self.client.build_list_todos(filter)?)?;
        self.client.parse_list_todos(response)
    }

    pub fn get(&self, id: Uuid) -> Result<TodoItem, ApiError> {
        let response = self.send(self.client.build_get_todo(id))?;
        self.client.parse_get_todo(id, response)
    }

    pub fn update(&self, id: Uuid, patch: &TodoPatch) -> Result<TodoItem, ApiError> {
        let response = self.send(self.client.build_update_todo(id, patch)?)?;
        self.client.parse_update_todo(id, response)
    }

    pub fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let response = self.send(self.client.build_delete_todo(id))?;
        self.client.parse_delete_todo(id, response)
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let response = self.transport.execute(&request)?;
        debug!(
            method = request.method.as_str(),
            url = %request.url,
            status = response.status,
            "received response"
        );
        Ok(response)
    }
}
