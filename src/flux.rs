use std::fmt;

use reqwest::Method;

use crate::{
    auth::{AnonymousAuth, AuthStrategy, SimpleAuth},
    decode::{decode_list, decode_one},
    paths::flux as paths,
    refs::require_id,
    ClientOptions, ListQuery, RequestOptions, Resource, ResourceRef, Result, RetryPolicy,
    Transport,
};

/// Read-only client for the flux delivery API.
#[derive(Clone)]
pub struct FluxClient {
    transport: Transport,
}

impl fmt::Debug for FluxClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FluxClient")
            .field("transport", &self.transport)
            .finish()
    }
}

impl FluxClient {
    pub fn new(options: ClientOptions, auth: impl AuthStrategy + 'static) -> Self {
        Self::from_transport(Transport::new(options, auth))
    }

    /// Client for public content, no credentials.
    pub fn anonymous(options: ClientOptions) -> Self {
        Self::new(options, AnonymousAuth)
    }

    pub fn from_transport(transport: Transport) -> Self {
        Self { transport }
    }

    /// Creates a client from environment variables.
    ///
    /// Uses simple auth when `FLUXMGMT_PUBLIC_KEY` and `FLUXMGMT_SECRET_KEY`
    /// are both set, anonymous access otherwise.
    pub fn from_env() -> Result<Self> {
        let options = ClientOptions::from_env()?;
        let public = std::env::var("FLUXMGMT_PUBLIC_KEY").unwrap_or_default();
        let secret = std::env::var("FLUXMGMT_SECRET_KEY").unwrap_or_default();
        if public.is_empty() || secret.is_empty() {
            return Ok(Self::anonymous(options));
        }
        Ok(Self::new(options, SimpleAuth::new(public, secret)?))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.transport = self.transport.with_retry_policy(retry);
        self
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub async fn get_resource(
        &self,
        project_id: &str,
        resource: impl Into<ResourceRef>,
        locale: Option<&str>,
    ) -> Result<Resource> {
        let project_id = require_id("project id", project_id)?;
        let resource = resource.into();
        let key = resource.resolve()?;
        let options = RequestOptions::new().query_opt("locale", locale);
        let payload = self
            .transport
            .request(Method::GET, &paths::resource(project_id, key), options)
            .await?;
        decode_one(payload, "resource")
    }

    pub async fn list_resources(&self, project_id: &str, query: &ListQuery) -> Result<Vec<Resource>> {
        let project_id = require_id("project id", project_id)?;
        let options = query.apply(RequestOptions::new());
        let payload = self
            .transport
            .request(Method::GET, &paths::resources(project_id), options)
            .await?;
        decode_list(payload, "resource")
    }

    /// Full-text search over published resources.
    pub async fn search(
        &self,
        project_id: &str,
        text: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Resource>> {
        let project_id = require_id("project id", project_id)?;
        let options = RequestOptions::new()
            .query("q", text)
            .query_opt("limit", limit);
        let payload = self
            .transport
            .request(Method::GET, &paths::search(project_id), options)
            .await?;
        decode_list(payload, "resource")
    }
}
