//! URL path builders. Every dynamic segment is percent-encoded.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left as-is in a path segment (RFC 3986 unreserved).
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

pub fn projects() -> String {
    "/projects".to_owned()
}

pub fn project(project_id: &str) -> String {
    format!("/projects/{}", segment(project_id))
}

pub fn resource_types(project_id: &str) -> String {
    format!("{}/resource-types", project(project_id))
}

pub fn resource_type(project_id: &str, key: &str) -> String {
    format!("{}/{}", resource_types(project_id), segment(key))
}

pub fn resources(project_id: &str) -> String {
    format!("{}/resources", project(project_id))
}

pub fn resource(project_id: &str, key: &str) -> String {
    format!("{}/{}", resources(project_id), segment(key))
}

/// Paths on the flux delivery API.
pub mod flux {
    use super::segment;

    pub fn resources(project_id: &str) -> String {
        format!("/{}/resources", segment(project_id))
    }

    pub fn resource(project_id: &str, key: &str) -> String {
        format!("{}/{}", resources(project_id), segment(key))
    }

    pub fn search(project_id: &str) -> String {
        format!("/{}/search", segment(project_id))
    }
}

#[cfg(test)]
mod tests {
    use super::{flux, project, resource, resource_type, resources};

    #[test]
    fn management_paths() {
        assert_eq!(project("p1"), "/projects/p1");
        assert_eq!(resources("p1"), "/projects/p1/resources");
        assert_eq!(resource("p1", "home"), "/projects/p1/resources/home");
        assert_eq!(
            resource_type("p1", "blog-post"),
            "/projects/p1/resource-types/blog-post"
        );
    }

    #[test]
    fn segments_are_encoded() {
        assert_eq!(
            resource("p 1", "a/b?c"),
            "/projects/p%201/resources/a%2Fb%3Fc"
        );
        assert_eq!(flux::resource("p1", "ü~x"), "/p1/resources/%C3%BC~x");
    }

    #[test]
    fn flux_paths() {
        assert_eq!(flux::resources("p1"), "/p1/resources");
        assert_eq!(flux::search("p1"), "/p1/search");
    }
}
