use std::fmt;
use std::sync::Arc;

use reqwest::Method;

use crate::{
    auth::{AuthStrategy, BearerAuth, SimpleAuth},
    batch::{run_windowed, BatchOptions, BatchResult},
    decode::{decode_list, decode_one},
    paths,
    refs::require_id,
    ClientError, ClientOptions, ListQuery, NewProject, Payload, Project, ProjectUpdate,
    RequestOptions, Resource, ResourceRef, ResourceSummary, ResourceType, ResourceUpsert, Result,
    RetryPolicy, Transport,
};

/// Client for the management (control-plane) API.
#[derive(Clone)]
pub struct ManagementClient {
    transport: Transport,
}

impl fmt::Debug for ManagementClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagementClient")
            .field("transport", &self.transport)
            .finish()
    }
}

impl ManagementClient {
    pub fn new(options: ClientOptions, auth: impl AuthStrategy + 'static) -> Self {
        Self::from_transport(Transport::new(options, auth))
    }

    /// Creates a client with a fixed bearer token.
    pub fn with_token(base_url: impl AsRef<str>, token: impl Into<String>) -> Result<Self> {
        Ok(Self::new(
            ClientOptions::new(base_url)?,
            BearerAuth::from_token(token),
        ))
    }

    pub fn from_transport(transport: Transport) -> Self {
        Self { transport }
    }

    /// Creates a client from environment variables.
    ///
    /// Reads [`ClientOptions::from_env`] plus credentials:
    /// - `FLUXMGMT_TOKEN`: bearer token, or
    /// - `FLUXMGMT_PUBLIC_KEY` and `FLUXMGMT_SECRET_KEY`: simple auth
    pub fn from_env() -> Result<Self> {
        let options = ClientOptions::from_env()?;
        let auth: Arc<dyn AuthStrategy> = match std::env::var("FLUXMGMT_TOKEN") {
            Ok(token) if !token.trim().is_empty() => Arc::new(BearerAuth::from_token(token)),
            _ => {
                let public = std::env::var("FLUXMGMT_PUBLIC_KEY").unwrap_or_default();
                let secret = std::env::var("FLUXMGMT_SECRET_KEY").unwrap_or_default();
                if public.is_empty() && secret.is_empty() {
                    return Err(ClientError::Auth(
                        "missing FLUXMGMT_TOKEN or FLUXMGMT_PUBLIC_KEY/FLUXMGMT_SECRET_KEY"
                            .to_owned(),
                    ));
                }
                Arc::new(SimpleAuth::new(public, secret)?)
            }
        };
        Ok(Self::from_transport(Transport::with_shared_auth(
            options, auth,
        )))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.transport = self.transport.with_retry_policy(retry);
        self
    }

    /// Underlying transport, for endpoints without a typed method.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    async fn send(&self, method: Method, path: &str, options: RequestOptions) -> Result<Payload> {
        self.transport.request(method, path, options).await
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let payload = self
            .send(Method::GET, &paths::projects(), RequestOptions::new())
            .await?;
        decode_list(payload, "project")
    }

    pub async fn get_project(&self, project_id: &str) -> Result<Project> {
        let project_id = require_id("project id", project_id)?;
        let payload = self
            .send(Method::GET, &paths::project(project_id), RequestOptions::new())
            .await?;
        decode_one(payload, "project")
    }

    pub async fn create_project(&self, project: &NewProject) -> Result<Project> {
        require_id("project name", &project.name)?;
        let options = RequestOptions::new().json_from(project)?;
        let payload = self.send(Method::POST, &paths::projects(), options).await?;
        decode_one(payload, "project")
    }

    pub async fn update_project(&self, project_id: &str, update: &ProjectUpdate) -> Result<Project> {
        let project_id = require_id("project id", project_id)?;
        let options = RequestOptions::new().json_from(update)?;
        let payload = self
            .send(Method::PATCH, &paths::project(project_id), options)
            .await?;
        decode_one(payload, "project")
    }

    pub async fn delete_project(&self, project_id: &str) -> Result<()> {
        let project_id = require_id("project id", project_id)?;
        self.send(Method::DELETE, &paths::project(project_id), RequestOptions::new())
            .await?;
        Ok(())
    }

    pub async fn list_resource_types(&self, project_id: &str) -> Result<Vec<ResourceType>> {
        let project_id = require_id("project id", project_id)?;
        let payload = self
            .send(
                Method::GET,
                &paths::resource_types(project_id),
                RequestOptions::new(),
            )
            .await?;
        decode_list(payload, "resource type")
    }

    pub async fn get_resource_type(&self, project_id: &str, key: &str) -> Result<ResourceType> {
        let project_id = require_id("project id", project_id)?;
        let key = require_id("resource type key", key)?;
        let payload = self
            .send(
                Method::GET,
                &paths::resource_type(project_id, key),
                RequestOptions::new(),
            )
            .await?;
        decode_one(payload, "resource type")
    }

    pub async fn list_resources(
        &self,
        project_id: &str,
        query: &ListQuery,
    ) -> Result<Vec<ResourceSummary>> {
        let project_id = require_id("project id", project_id)?;
        let options = query.apply(RequestOptions::new());
        let payload = self
            .send(Method::GET, &paths::resources(project_id), options)
            .await?;
        decode_list(payload, "resource")
    }

    pub async fn get_resource(
        &self,
        project_id: &str,
        resource: impl Into<ResourceRef>,
    ) -> Result<Resource> {
        let project_id = require_id("project id", project_id)?;
        let resource = resource.into();
        let key = resource.resolve()?;
        let payload = self
            .send(
                Method::GET,
                &paths::resource(project_id, key),
                RequestOptions::new(),
            )
            .await?;
        decode_one(payload, "resource")
    }

    /// Creates a resource; fails if the key already exists.
    pub async fn create_resource(
        &self,
        project_id: &str,
        resource: &ResourceUpsert,
    ) -> Result<Resource> {
        let project_id = require_id("project id", project_id)?;
        require_id("resource key", &resource.key)?;
        let options = RequestOptions::new().json_from(resource)?;
        let payload = self
            .send(Method::POST, &paths::resources(project_id), options)
            .await?;
        decode_one(payload, "resource")
    }

    /// Creates or replaces the resource with `resource.key`.
    pub async fn upsert_resource(
        &self,
        project_id: &str,
        resource: &ResourceUpsert,
    ) -> Result<Resource> {
        let project_id = require_id("project id", project_id)?;
        let key = require_id("resource key", &resource.key)?;
        let options = RequestOptions::new().json_from(resource)?;
        let payload = self
            .send(Method::PUT, &paths::resource(project_id, key), options)
            .await?;
        decode_one(payload, "resource")
    }

    pub async fn delete_resource(
        &self,
        project_id: &str,
        resource: impl Into<ResourceRef>,
    ) -> Result<()> {
        let project_id = require_id("project id", project_id)?;
        let resource = resource.into();
        let key = resource.resolve()?;
        self.send(
            Method::DELETE,
            &paths::resource(project_id, key),
            RequestOptions::new(),
        )
        .await?;
        Ok(())
    }

    /// Upserts many resources, `options.concurrency` at a time.
    ///
    /// Item failures are collected in [`BatchResult::failed`] unless
    /// `options.fail_fast` is set.
    pub async fn batch_upsert_resources(
        &self,
        project_id: &str,
        resources: Vec<ResourceUpsert>,
        options: BatchOptions,
    ) -> Result<BatchResult<Resource>> {
        let project_id = require_id("project id", project_id)?;
        run_windowed(
            resources,
            &options,
            |resource| resource.key.clone(),
            move |resource| async move { self.upsert_resource(project_id, &resource).await },
        )
        .await
    }
}
