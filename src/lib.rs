//! `fluxmgmt-http` is an async HTTP client for the management and flux
//! delivery APIs.
//!
//! All endpoint methods route through one [`Transport`], which builds the
//! request, injects headers from an [`auth::AuthStrategy`], retries
//! according to a [`RetryPolicy`] and normalizes failures into
//! [`ClientError`]:
//! - [`ManagementClient`] for projects, resource types and resources
//! - [`FluxClient`] for read-only delivery
//! - [`Transport::request`] for anything without a typed method

pub mod auth;
mod batch;
mod decode;
mod error;
mod flux;
mod management;
mod options;
pub mod paths;
mod refs;
mod retry;
mod transport;
mod types;

pub use auth::{AnonymousAuth, BearerAuth, SecureAuth, SimpleAuth};
pub use batch::{BatchFailure, BatchOptions, BatchProgress, BatchResult};
pub use error::{ApiError, ClientError};
pub use flux::FluxClient;
pub use management::ManagementClient;
pub use options::{ClientOptions, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
pub use refs::ResourceRef;
pub use retry::RetryPolicy;
pub use transport::{Payload, RequestOptions, Transport};
pub use types::{
    ListQuery, NewProject, Project, ProjectUpdate, Resource, ResourceSummary, ResourceType,
    ResourceUpsert,
};

pub type Result<T> = std::result::Result<T, ClientError>;
