//! The per-method route tree.
//!
//! Each [`Node`] has any number of literal children keyed by their exact segment, and at most
//! one parameter child reached through a `:name` segment. Literal children always win over the
//! parameter child during lookup and there is no backtracking: once a literal child matched a
//! segment, the parameter child of that node is never tried for the same segment.

use crate::error::RouteError;
use crate::handler::Chain;
use crate::path;
use http::Method;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Prefix marking a parameter segment in a route pattern, as in `/users/:id`.
pub const PARAM_SIGIL: char = ':';

/// Route tree for one HTTP method.
pub(crate) struct Tree {
    method: Method,
    root: Node,
}

#[derive(Default)]
struct Node {
    literal_children: HashMap<Box<str>, Node>,
    param_child: Option<Box<ParamEdge>>,
    // present iff a route ends exactly here
    endpoint: Option<Endpoint>,
}

struct ParamEdge {
    name: Box<str>,
    // the first pattern that created this edge, kept for conflict reports
    route: Box<str>,
    node: Node,
}

struct Endpoint {
    pattern: Box<str>,
    handlers: Chain,
}

/// A successful lookup: the route's handler chain and the raw parameter values taken from the path.
pub struct RouteMatch<'router, 'req> {
    pattern: &'router str,
    handlers: &'router Chain,
    params: SmallVec<[(&'router str, &'req str); 4]>,
}

impl Tree {
    pub(crate) fn new(method: Method) -> Self {
        Self { method, root: Node::default() }
    }

    /// Registers `handlers` under `path`, replacing any chain previously registered at the same pattern.
    pub(crate) fn insert(&mut self, path: &str, handlers: Chain) -> Result<(), RouteError> {
        let pattern = path::normalize(path);

        let mut node = &mut self.root;
        for segment in path::segments(&pattern) {
            node = match segment.strip_prefix(PARAM_SIGIL) {
                Some("") => return Err(RouteError::empty_param_name(&self.method, pattern.as_str())),
                Some(name) => {
                    let edge = node.param_child.get_or_insert_with(|| {
                        Box::new(ParamEdge { name: name.into(), route: pattern.as_str().into(), node: Node::default() })
                    });
                    if &*edge.name != name {
                        return Err(RouteError::param_conflict(
                            &self.method,
                            pattern.as_str(),
                            &*edge.name,
                            &*edge.route,
                            name,
                        ));
                    }
                    &mut edge.node
                }
                None => node.literal_children.entry(segment.into()).or_default(),
            };
        }

        let endpoint = Endpoint { pattern: pattern.as_str().into(), handlers };
        if node.endpoint.replace(endpoint).is_some() {
            debug!(method = %self.method, path = %pattern, "route registered again, previous handlers replaced");
        }
        Ok(())
    }

    /// Looks `path` up, preferring literal children over the parameter child at every node.
    pub(crate) fn search<'router, 'req>(&'router self, path: &'req str) -> Option<RouteMatch<'router, 'req>> {
        let mut node = &self.root;
        let mut params = SmallVec::new();

        // the root path yields no segments, so "/" is just the terminal check on the root node
        for segment in path::segments(path) {
            if let Some(child) = node.literal_children.get(segment) {
                node = child;
                continue;
            }

            let edge = node.param_child.as_deref()?;
            params.push((&*edge.name, segment));
            node = &edge.node;
        }

        node.endpoint.as_ref().map(|endpoint| RouteMatch {
            pattern: &*endpoint.pattern,
            handlers: &endpoint.handlers,
            params,
        })
    }

    pub(crate) fn method(&self) -> &Method {
        &self.method
    }

    /// Registered patterns of this tree, in no particular order.
    pub(crate) fn patterns(&self) -> Vec<&str> {
        let mut patterns = Vec::new();
        let mut pending = vec![&self.root];
        while let Some(node) = pending.pop() {
            if let Some(endpoint) = &node.endpoint {
                patterns.push(&*endpoint.pattern);
            }
            pending.extend(node.literal_children.values());
            if let Some(edge) = &node.param_child {
                pending.push(&edge.node);
            }
        }
        patterns
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree").field("method", &self.method).field("routes", &self.patterns()).finish()
    }
}

impl<'router, 'req> RouteMatch<'router, 'req> {
    /// The registered pattern that matched, such as `/users/:id`.
    pub fn pattern(&self) -> &'router str {
        self.pattern
    }

    pub fn handlers(&self) -> &'router Chain {
        self.handlers
    }

    /// Gets a raw parameter value by name
    pub fn param(&self, name: &str) -> Option<&'req str> {
        self.params.iter().find(|(key, _)| *key == name).map(|(_, value)| *value)
    }

    /// Iterates `(name, value)` pairs in path order
    pub fn params(&self) -> impl Iterator<Item = (&'router str, &'req str)> + '_ {
        self.params.iter().copied()
    }
}

impl fmt::Debug for RouteMatch<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("pattern", &self.pattern)
            .field("handlers", &self.handlers.len())
            .field("params", &self.params)
            .finish()
    }
}
