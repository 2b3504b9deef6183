use super::RouterBuilder;
use crate::handler::{Handler, IntoHandlers};
use crate::path;
use http::Method;
use std::fmt;
use std::sync::Arc;

/// A registration-time view over a [`RouterBuilder`] with a path prefix and scoped middleware.
///
/// A group holds no routing state: every route goes straight into the builder with the prefix
/// joined to its path and the group's middleware placed between the global middleware and the
/// route's own handlers. Nested groups extend both without touching their parent.
pub struct Group<'r> {
    builder: &'r mut RouterBuilder,
    prefix: String,
    middleware: Vec<Arc<dyn Handler>>,
}

impl<'r> Group<'r> {
    pub(super) fn new(builder: &'r mut RouterBuilder, prefix: String, middleware: Vec<Arc<dyn Handler>>) -> Self {
        Self { builder, prefix, middleware }
    }

    /// The normalized path prefix shared by the routes of this group.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Appends middleware for routes registered through this group from now on.
    pub fn wrap(&mut self, handlers: impl IntoHandlers) -> &mut Self {
        self.middleware.extend(handlers.into_handlers());
        self
    }

    /// Opens a child group. Its prefix is joined to this group's prefix and its middleware runs
    /// after this group's middleware.
    pub fn group(&mut self, prefix: &str, handlers: impl IntoHandlers) -> Group<'_> {
        let middleware = self.middleware.iter().map(Arc::clone).chain(handlers.into_handlers()).collect();
        Group { builder: &mut *self.builder, prefix: path::join(&self.prefix, prefix), middleware }
    }

    /// Registers `handlers` for `method` at `relative_path` below this group's prefix.
    pub fn route(&mut self, method: Method, relative_path: &str, handlers: impl IntoHandlers) -> &mut Self {
        let full_path = path::join(&self.prefix, relative_path);
        self.builder.add(method, &full_path, &self.middleware, handlers.into_handlers());
        self
    }

    method_routes! {
        get => GET,
        post => POST,
        put => PUT,
        delete => DELETE,
        patch => PATCH,
        head => HEAD,
        options => OPTIONS,
        connect => CONNECT,
        trace => TRACE,
    }
}

impl fmt::Debug for Group<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group").field("prefix", &self.prefix).field("middleware", &self.middleware.len()).finish()
    }
}
