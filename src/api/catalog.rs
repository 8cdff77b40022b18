// ============================================================================
// File: packages/rerobots/src/api/catalog.rs
// ----------------------------------------------------------------------------
// Deployment catalog queries:
// - Search deployments by text and workspace type
// - Deployment detail
// - Workspace type listing
// ============================================================================

use serde_json::Value;

use crate::error::{RerobotsError, RerobotsResult};
use crate::transport::ApiRequest;

use super::types::{Deployment, DeploymentEntry};
use super::{ApiClient, field};

/// Deployment search filter
///
/// The empty filter matches every deployment the service knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentFilter {
    /// Free-text query, matched by the service
    pub query: Option<String>,

    /// Restrict to these workspace types
    pub types: Vec<String>,
}

impl DeploymentFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_query<Q: Into<String>>(mut self, query: Q) -> Self {
        let query = query.into();
        self.query = if query.trim().is_empty() {
            None
        } else {
            Some(query)
        };
        self
    }

    pub fn with_types<I, T>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_none() && self.types.is_empty()
    }

    fn to_request(&self) -> ApiRequest {
        let mut request = ApiRequest::get("/deployments");
        if let Some(query) = &self.query {
            request = request.with_query("q", query.as_str());
        }
        if !self.types.is_empty() {
            request = request.with_query("types", self.types.join(","));
        }
        request
    }
}

impl From<&str> for DeploymentFilter {
    fn from(query: &str) -> Self {
        Self::all().with_query(query)
    }
}

impl ApiClient {
    /// Search deployments
    ///
    /// Results keep the order returned by the service.
    pub fn search<F: Into<DeploymentFilter>>(&self, filter: F) -> RerobotsResult<Vec<Deployment>> {
        let filter = filter.into();
        let body = self.execute(&filter.to_request(), "deployment listing")?;
        let entries = field(&body, "workspace_deployments", "deployment listing")?;

        let entries: Vec<DeploymentEntry> = serde_json::from_value(entries.clone())
            .map_err(|e| RerobotsError::decode(format!("deployment listing: {e}")))?;
        Ok(entries.into_iter().map(Deployment::from).collect())
    }

    /// Fetch full detail for one deployment
    pub fn describe(&self, deployment_id: &str) -> RerobotsResult<Deployment> {
        let request = ApiRequest::get(format!("/deployment/{deployment_id}"));
        let body = self.execute(&request, &format!("deployment {deployment_id}"))?;
        serde_json::from_value(body)
            .map_err(|e| RerobotsError::decode(format!("deployment {deployment_id}: {e}")))
    }

    /// List workspace type names offered by the service
    pub fn workspace_types(&self) -> RerobotsResult<Vec<String>> {
        let body = self.execute(&ApiRequest::get("/workspaces"), "workspace types")?;
        let types = field(&body, "workspace_types", "workspace types")?;
        Ok(types
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }
}
