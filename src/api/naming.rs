//! Operation name derivation.
//!
//! Names are derived purely from the endpoint descriptors, so the same schema
//! document always synthesizes the same set of names. Collisions after verb
//! and version qualification get numeric suffixes in document order; the
//! first occurrence keeps the bare name.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::schema::{ApiFamily, Endpoint};

static CAMEL_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());
static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());
static VERSION_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^v\d+$").unwrap());

/// Lower-cased identifier-safe slug: camelCase boundaries become underscores,
/// runs of anything non-alphanumeric collapse to a single underscore.
pub fn slugify(tag: &str) -> String {
    let snake = CAMEL_BOUNDARY.replace_all(tag, "${1}_${2}");
    NON_ALNUM
        .replace_all(&snake.to_lowercase(), "_")
        .trim_matches('_')
        .to_string()
}

/// The API-version segment of a pro path, if any (`/v1/scripts/{id}` → `v1`).
pub fn version_suffix(path: &str) -> Option<&str> {
    path.split('/').find(|segment| VERSION_SEGMENT.is_match(segment))
}

/// Derive one unique name per endpoint, in endpoint order.
pub fn resolve_names(endpoints: &[Endpoint], family: ApiFamily) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(endpoints.len());

    for endpoint in endpoints {
        let mut slug = slugify(&endpoint.tag);
        if slug.is_empty() {
            slug = slugify(&endpoint.path);
        }
        let verb = endpoint.method.verb();
        let mut name = if slug == verb || slug.starts_with(&format!("{verb}_")) {
            slug
        } else {
            format!("{verb}_{slug}")
        };
        if family == ApiFamily::Pro {
            if let Some(version) = version_suffix(&endpoint.path) {
                name = format!("{name}_{version}");
            }
        }

        let mut candidate = name.clone();
        let mut counter = 2;
        while !taken.insert(candidate.clone()) {
            candidate = format!("{name}_{counter}");
            counter += 1;
        }
        names.push(candidate);
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::schema::HttpMethod;

    fn endpoint(method: HttpMethod, path: &str, tag: &str) -> Endpoint {
        Endpoint {
            method,
            path: path.to_string(),
            tag: tag.to_string(),
            params: Vec::new(),
        }
    }

    #[test]
    fn slugify_handles_camel_case_and_specials() {
        assert_eq!(slugify("findComputersById"), "find_computers_by_id");
        assert_eq!(slugify("find computers by id"), "find_computers_by_id");
        assert_eq!(slugify("Mobile-Device  Groups!"), "mobile_device_groups");
        assert_eq!(slugify("___"), "");
    }

    #[test]
    fn verb_prefix_is_not_doubled() {
        let endpoints = vec![endpoint(HttpMethod::Get, "/computers", "getComputers")];
        let names = resolve_names(&endpoints, ApiFamily::Classic);
        assert_eq!(names, vec!["get_computers"]);
    }

    #[test]
    fn verb_qualifies_same_tag_across_methods() {
        let endpoints = vec![
            endpoint(HttpMethod::Get, "/computers/id/{id}", "computersById"),
            endpoint(HttpMethod::Put, "/computers/id/{id}", "computersById"),
            endpoint(HttpMethod::Delete, "/computers/id/{id}", "computersById"),
        ];
        let names = resolve_names(&endpoints, ApiFamily::Classic);
        assert_eq!(
            names,
            vec![
                "get_computers_by_id",
                "put_computers_by_id",
                "delete_computers_by_id"
            ]
        );
    }

    #[test]
    fn version_segment_disambiguates_pro_paths() {
        let endpoints = vec![
            endpoint(HttpMethod::Get, "/v1/scripts/{id}", "scriptById"),
            endpoint(HttpMethod::Get, "/v2/scripts/{id}", "scriptById"),
        ];
        let names = resolve_names(&endpoints, ApiFamily::Pro);
        assert_eq!(names, vec!["get_script_by_id_v1", "get_script_by_id_v2"]);
    }

    #[test]
    fn residual_collisions_get_numeric_suffixes_in_order() {
        let endpoints = vec![
            endpoint(HttpMethod::Get, "/a", "widget"),
            endpoint(HttpMethod::Get, "/b", "widget"),
            endpoint(HttpMethod::Get, "/c", "widget"),
        ];
        let names = resolve_names(&endpoints, ApiFamily::Classic);
        assert_eq!(names, vec!["get_widget", "get_widget_2", "get_widget_3"]);
    }

    #[test]
    fn resolution_is_deterministic() {
        let endpoints = vec![
            endpoint(HttpMethod::Get, "/v1/scripts", "scripts"),
            endpoint(HttpMethod::Post, "/v1/scripts", "scripts"),
            endpoint(HttpMethod::Get, "/v2/scripts", "scripts"),
        ];
        let first = resolve_names(&endpoints, ApiFamily::Pro);
        let second = resolve_names(&endpoints, ApiFamily::Pro);
        assert_eq!(first, second);
    }
}
