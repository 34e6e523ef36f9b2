//! Path matcher
//!
//! A linear scan over the flattened table: the first entry with the same method,
//! the same number of segments and matching literals wins. Overlapping templates
//! are resolved purely by declaration order, so declare the more specific route
//! first when two templates can match the same path.
//!
//! Inbound segments are percent-decoded before they are compared with literals
//! or bound to parameters, so hosts that hand over the raw URI path and hosts
//! that decode it themselves yield the same values.

use serde_json::{Map, Value};
use std::borrow::Cow;

use crate::flatten::{FlatRouteEntry, RouteTable, Segment};
use crate::method::Method;

/// Split a path on `/`, dropping the empty segment produced by the leading slash
pub fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('/').collect()
}

/// Percent-decode one path segment. A segment that does not decode to UTF-8 is
/// kept as received. `+` is not a space in a path.
pub fn decode_segment(segment: &str) -> Cow<'_, str> {
    urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment))
}

/// A matched entry with its raw, uncoerced path parameters
#[derive(Debug)]
pub struct RouteMatch<'a, C> {
    pub index: usize,
    pub entry: &'a FlatRouteEntry<C>,
    pub params: Map<String, Value>,
}

impl<C> RouteTable<C> {
    /// Find the first entry matching `method` and the inbound `segments`
    ///
    /// `segments` are raw URI segments as produced by [`split_path`].
    pub fn find(&self, method: Method, segments: &[&str]) -> Option<RouteMatch<'_, C>> {
        let decoded: Vec<Cow<'_, str>> = segments.iter().map(|s| decode_segment(s)).collect();

        self.entries()
            .iter()
            .enumerate()
            .find(|(_, entry)| matches_entry(entry, method, &decoded))
            .map(|(index, entry)| RouteMatch {
                index,
                entry,
                params: extract_params(entry.segments(), &decoded),
            })
    }
}

fn matches_entry<C>(entry: &FlatRouteEntry<C>, method: Method, segments: &[Cow<'_, str>]) -> bool {
    entry.method() == method
        && entry.segments().len() == segments.len()
        && entry
            .segments()
            .iter()
            .zip(segments)
            .all(|(template, inbound)| template.matches(inbound))
}

fn extract_params(template: &[Segment], segments: &[Cow<'_, str>]) -> Map<String, Value> {
    template
        .iter()
        .zip(segments)
        .filter_map(|(segment, inbound)| match segment {
            Segment::Param(name) => Some((name.clone(), Value::String(inbound.to_string()))),
            Segment::Literal(_) => None,
        })
        .collect()
}
