//! # Request Routing
//!
//! Declarative route table and the single matching routine used by the
//! dispatcher.
//!
//! ## Routing Strategy
//!
//! - Routes are checked in table order and the first hit wins, so an exact
//!   literal route placed earlier takes priority over a templated one
//! - Matching is anchored and segment based: a capture matches exactly one
//!   non-empty segment
//! - `OPTIONS` matches any path and sits first, so preflight never reaches a
//!   handler
//!
//! ## Supported Routes
//!
//! ```text
//! OPTIONS *                                              - CORS preflight
//! GET     /api/version                                   - Current version
//! GET     /template/{version}/{category}/{filename}      - Stored template asset
//! POST    /v1/wo/file/{fileId}/script/{taskId}/sync_task - Upstream proxy
//! GET     /items                                         - List items
//! GET     /items/{id}                                    - Get item (digits only)
//! POST    /items                                         - Create item
//! PUT     /items/{id}                                    - Partial update
//! DELETE  /items/{id}                                    - Delete item
//! ```

use std::collections::HashMap;

use http::Method;

/// Handler family a route dispatches to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerKind {
    Cors,
    Version,
    TemplateAsset,
    SyncTask,
    ResourceList,
    ResourceItem,
}

/// One path segment of a route pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment {
    Literal(&'static str),
    /// Any non-empty segment.
    Param(&'static str),
    /// A non-empty segment of ASCII digits.
    Digits(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pattern {
    /// Matches every path.
    Any,
    Segments(&'static [Segment]),
}

#[derive(Debug)]
pub struct Route {
    pub method: Method,
    pub pattern: Pattern,
    pub handler: HandlerKind,
}

/// Outcome of a successful match.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: HashMap<&'static str, String>,
}

impl RouteMatch<'_> {
    pub fn handler(&self) -> HandlerKind {
        self.route.handler
    }

    /// Returns a captured parameter. Patterns guarantee presence for their own
    /// capture names, so a missing name yields an empty string.
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).map(String::as_str).unwrap_or_default()
    }
}

/// Fixed route table, in priority order.
pub static ROUTES: [Route; 9] = [
    Route {
        method: Method::OPTIONS,
        pattern: Pattern::Any,
        handler: HandlerKind::Cors,
    },
    Route {
        method: Method::GET,
        pattern: Pattern::Segments(&[Segment::Literal("api"), Segment::Literal("version")]),
        handler: HandlerKind::Version,
    },
    Route {
        method: Method::GET,
        pattern: Pattern::Segments(&[
            Segment::Literal("template"),
            Segment::Param("version"),
            Segment::Param("category"),
            Segment::Param("filename"),
        ]),
        handler: HandlerKind::TemplateAsset,
    },
    Route {
        method: Method::POST,
        pattern: Pattern::Segments(&[
            Segment::Literal("v1"),
            Segment::Literal("wo"),
            Segment::Literal("file"),
            Segment::Param("fileId"),
            Segment::Literal("script"),
            Segment::Param("taskId"),
            Segment::Literal("sync_task"),
        ]),
        handler: HandlerKind::SyncTask,
    },
    Route {
        method: Method::GET,
        pattern: Pattern::Segments(&[Segment::Literal("items")]),
        handler: HandlerKind::ResourceList,
    },
    Route {
        method: Method::GET,
        pattern: Pattern::Segments(&[Segment::Literal("items"), Segment::Digits("id")]),
        handler: HandlerKind::ResourceItem,
    },
    Route {
        method: Method::POST,
        pattern: Pattern::Segments(&[Segment::Literal("items")]),
        handler: HandlerKind::ResourceList,
    },
    Route {
        method: Method::PUT,
        pattern: Pattern::Segments(&[Segment::Literal("items"), Segment::Param("id")]),
        handler: HandlerKind::ResourceItem,
    },
    Route {
        method: Method::DELETE,
        pattern: Pattern::Segments(&[Segment::Literal("items"), Segment::Param("id")]),
        handler: HandlerKind::ResourceItem,
    },
];

/// Finds the first route whose method and full path match.
pub fn match_route<'a>(routes: &'a [Route], method: &Method, path: &str) -> Option<RouteMatch<'a>> {
    routes.iter().find_map(|route| {
        if route.method != *method {
            return None;
        }
        match_pattern(route.pattern, path).map(|params| RouteMatch { route, params })
    })
}

fn match_pattern(pattern: Pattern, path: &str) -> Option<HashMap<&'static str, String>> {
    let segments = match pattern {
        Pattern::Any => return Some(HashMap::new()),
        Pattern::Segments(segments) => segments,
    };

    let parts: Vec<&str> = path.strip_prefix('/')?.split('/').collect();
    if parts.len() != segments.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (segment, part) in segments.iter().zip(parts) {
        match *segment {
            Segment::Literal(literal) if literal == part => {}
            Segment::Param(name) if !part.is_empty() => {
                params.insert(name, part.to_string());
            }
            Segment::Digits(name) if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) => {
                params.insert(name, part.to_string());
            }
            _ => return None,
        }
    }
    Some(params)
}
