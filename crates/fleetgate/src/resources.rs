//! Pass-through access to the fleet resources.
//!
//! The session layer doesn't interpret buses or routes; bodies and results
//! are plain JSON values. What it guarantees is that every call goes
//! through the authenticated pipeline, so a rejected session is handled
//! the same way no matter which screen made the call.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use fleetgate_pipeline::{ApiClient, ApiError};
use fleetgate_transport::{HttpRequest, HttpTransport};

/// A backend resource collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Buses,
    Routes,
}

impl Resource {
    /// The collection path, with its trailing slash.
    pub fn collection_path(self) -> &'static str {
        match self {
            Self::Buses => "/buses/",
            Self::Routes => "/routes/",
        }
    }

    /// The path of one item.
    pub fn item_path(self, id: i64) -> String {
        format!("{}{id}", self.collection_path())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Buses => "buses",
            Self::Routes => "routes",
        })
    }
}

/// Pagination for list calls. Unset fields use the backend's defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl Page {
    pub fn new(skip: u32, limit: u32) -> Self {
        Self {
            skip: Some(skip),
            limit: Some(limit),
        }
    }

    fn apply(self, mut request: HttpRequest) -> HttpRequest {
        if let Some(skip) = self.skip {
            request = request.with_query("skip", skip.to_string());
        }
        if let Some(limit) = self.limit {
            request = request.with_query("limit", limit.to_string());
        }
        request
    }
}

/// CRUD calls for [`Resource`] collections.
pub struct Resources<T> {
    api: Arc<ApiClient<T>>,
}

impl<T: HttpTransport> Resources<T> {
    pub fn new(api: Arc<ApiClient<T>>) -> Self {
        Self { api }
    }

    pub async fn list(
        &self,
        resource: Resource,
        page: Page,
    ) -> Result<Vec<Value>, ApiError> {
        let request = page.apply(HttpRequest::get(resource.collection_path()));
        self.api
            .request(request, &format!("Could not load {resource}"))
            .await
    }

    pub async fn get(&self, resource: Resource, id: i64) -> Result<Value, ApiError> {
        self.api
            .request(HttpRequest::get(resource.item_path(id)), &format!("Could not load {resource}"))
            .await
    }

    pub async fn create(
        &self,
        resource: Resource,
        body: &Value,
    ) -> Result<Value, ApiError> {
        let request = self
            .api
            .json_body(HttpRequest::post(resource.collection_path()), body)?;
        self.api
            .request(request, &format!("Could not create {resource}"))
            .await
    }

    pub async fn update(
        &self,
        resource: Resource,
        id: i64,
        body: &Value,
    ) -> Result<Value, ApiError> {
        let request = self
            .api
            .json_body(HttpRequest::put(resource.item_path(id)), body)?;
        self.api
            .request(request, &format!("Could not update {resource}"))
            .await
    }

    /// Deletes one item. Any 2xx, including `204 No Content`, is success.
    pub async fn delete(&self, resource: Resource, id: i64) -> Result<(), ApiError> {
        self.api
            .request_empty(
                HttpRequest::delete(resource.item_path(id)),
                &format!("Could not delete {resource}"),
            )
            .await?;
        tracing::info!(%resource, id, "deleted");
        Ok(())
    }
}

impl<T> Clone for Resources<T> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
        }
    }
}

impl<T> fmt::Debug for Resources<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resources").finish_non_exhaustive()
    }
}
