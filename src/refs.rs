use crate::{ClientError, Resource, ResourceSummary, Result};

/// Reference to a resource, either by key or by a previously fetched record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceRef {
    ByKey(String),
    ByValue(ResourceSummary),
}

impl ResourceRef {
    /// Extracts the resource key; an empty key is rejected.
    pub fn resolve(&self) -> Result<&str> {
        let key = match self {
            Self::ByKey(key) => key.as_str(),
            Self::ByValue(summary) => summary.key.as_str(),
        };
        if key.trim().is_empty() {
            return Err(ClientError::Auth(
                "resource reference has an empty key".to_owned(),
            ));
        }
        Ok(key)
    }
}

impl From<&str> for ResourceRef {
    fn from(key: &str) -> Self {
        Self::ByKey(key.to_owned())
    }
}

impl From<String> for ResourceRef {
    fn from(key: String) -> Self {
        Self::ByKey(key)
    }
}

impl From<&String> for ResourceRef {
    fn from(key: &String) -> Self {
        Self::ByKey(key.clone())
    }
}

impl From<ResourceSummary> for ResourceRef {
    fn from(summary: ResourceSummary) -> Self {
        Self::ByValue(summary)
    }
}

impl From<&ResourceSummary> for ResourceRef {
    fn from(summary: &ResourceSummary) -> Self {
        Self::ByValue(summary.clone())
    }
}

impl From<&Resource> for ResourceRef {
    fn from(resource: &Resource) -> Self {
        Self::ByValue(resource.summary())
    }
}

/// Rejects an empty required identifier such as a project id.
pub(crate) fn require_id<'a>(what: &str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(ClientError::Auth(format!("{what} is required")));
    }
    Ok(value)
}
