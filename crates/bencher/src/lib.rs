/// A named route table benchmarked as one input.
#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    table: RouteTable,
}

impl TestCase {
    pub fn new(name: &'static str, table: RouteTable) -> Self {
        Self { name, table }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }
}

#[derive(Debug, Copy, Clone)]
pub struct RouteTable {
    patterns: &'static [&'static str],
    requests: &'static [&'static str],
}

impl RouteTable {
    pub const fn new(patterns: &'static [&'static str], requests: &'static [&'static str]) -> Self {
        Self { patterns, requests }
    }

    /// Route patterns to register, all for `GET`.
    pub fn patterns(&self) -> &'static [&'static str] {
        self.patterns
    }

    /// Request paths, each matching one of the patterns.
    pub fn requests(&self) -> &'static [&'static str] {
        self.requests
    }
}

pub static STATIC_ROUTES: RouteTable = RouteTable::new(
    &["/", "/health", "/about", "/contact", "/docs/guide", "/docs/api", "/blog", "/blog/archive"],
    &["/", "/health", "/docs/api", "/blog/archive"],
);

pub static API_ROUTES: RouteTable = RouteTable::new(
    &[
        "/api/v1/users",
        "/api/v1/users/me",
        "/api/v1/users/:id",
        "/api/v1/users/:id/orders",
        "/api/v1/users/:id/orders/:order_id",
        "/api/v1/users/:id/orders/:order_id/items/:item_id",
        "/api/v1/products",
        "/api/v1/products/:sku",
        "/api/v1/products/:sku/reviews",
        "/api/v1/search",
    ],
    &[
        "/api/v1/users/me",
        "/api/v1/users/42",
        "/api/v1/users/42/orders/1001",
        "/api/v1/users/42/orders/1001/items/7",
        "/api/v1/products/abc-123/reviews",
    ],
);

pub static UNNORMALIZED_ROUTES: RouteTable = RouteTable::new(
    &["/api/v1/users/:id/orders/:order_id"],
    &["//api//v1/users///42/orders/1001/", "/api/v1/users/42/orders/1001///"],
);
