//! Navigation link discovery in text and in FROST entity documents

use crate::envelope::has_identifier;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::OnceLock;

pub const NAVIGATION_LINK_SUFFIX: &str = "@iot.navigationLink";

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"https?://[^\s>\]"'`]+"#).unwrap())
}

/// Extract unique URLs from text content, in order of first appearance
///
/// FROST paths carry parentheses (`Things(1)/Locations`), so only a
/// trailing `)` without a matching `(` is trimmed.
pub fn extract_urls(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for mat in url_regex().find_iter(content) {
        let url = trim_url(mat.as_str());
        if seen.insert(url.to_string()) {
            urls.push(url.to_string());
        }
    }

    urls
}

fn trim_url(mut url: &str) -> &str {
    loop {
        let trimmed = url.trim_end_matches(['.', ',', ';', ':', ']']);
        let unbalanced = trimmed.matches('(').count() < trimmed.matches(')').count();
        let trimmed = match trimmed.strip_suffix(')') {
            Some(rest) if unbalanced => rest,
            _ => trimmed,
        };
        if trimmed.len() == url.len() {
            return url;
        }
        url = trimmed;
    }
}

/// A `<Relation>@iot.navigationLink` field found in an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationField {
    /// Relation name, e.g. `Locations` or `Datastream`
    pub relation: String,
    pub link: Option<String>,
}

/// Navigation link fields of one entity object, ordered by key
///
/// A link whose value is not a string is reported with `link: None`.
pub fn navigation_fields(entity: &Map<String, Value>) -> Vec<NavigationField> {
    entity
        .iter()
        .filter_map(|(key, value)| {
            let relation = key.strip_suffix(NAVIGATION_LINK_SUFFIX)?;
            if relation.is_empty() {
                return None;
            }
            Some(NavigationField {
                relation: relation.to_string(),
                link: value.as_str().map(str::to_string),
            })
        })
        .collect()
}

/// The entity objects of a document: the members of `value` for a
/// collection response, the document itself otherwise
pub fn entities(document: &Value) -> Vec<&Map<String, Value>> {
    let Some(object) = document.as_object() else {
        return Vec::new();
    };

    match object.get("value").and_then(Value::as_array) {
        Some(members) if !has_identifier(object) => {
            members.iter().filter_map(Value::as_object).collect()
        }
        _ => vec![object],
    }
}

/// Whether a document is a collection response, using the same rule as
/// the resolver: a non-null `@iot.id` makes it a single entity.
pub fn is_collection(document: &Value) -> bool {
    document.as_object().is_some_and(|object| {
        !has_identifier(object) && object.get("value").is_some_and(Value::is_array)
    })
}
