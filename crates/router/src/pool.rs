//! A concurrency-safe pool of per-request context state.
//!
//! The pool keeps a free list of [`Locals`], the allocation-bearing part of a [`Context`]
//! (parameter storage and the key/value bag). [`ContextPool::acquire`] takes one from the free
//! list, or creates one when the list is empty, clears it and binds it to the request.
//!
//! The bound context is handed out inside a [`PooledContext`] guard. Dropping the guard clears
//! the state and puts it back, whether the chain finished, the request future was dropped
//! midway or a handler panicked. [`PooledContext::release`] does the same and also hands back
//! the response.
//!
//! A context is moved into the chain executor by value, so two in-flight requests can never hold
//! the same state; the free list is only touched under its lock.

use crate::context::{Context, Locals};
use crate::handler::Chain;
use crate::request::Request;
use crate::response::ResponseWriter;
use parking_lot::Mutex;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::debug;

/// Sizing of a [`ContextPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Upper bound of released contexts kept for reuse; extra ones are dropped.
    pub max_idle: usize,
    /// Number of contexts created up front.
    pub prewarm: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { max_idle: 1024, prewarm: 0 }
    }
}

/// Snapshot of a pool's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Contexts allocated since the pool was created, including prewarmed ones.
    pub created: u64,
    /// Acquisitions served from the free list.
    pub reused: u64,
    /// Contexts currently bound to a request.
    pub in_flight: usize,
    /// Contexts waiting in the free list.
    pub idle: usize,
}

pub struct ContextPool {
    free_list: Mutex<Vec<Locals>>,
    config: PoolConfig,
    metrics: PoolMetrics,
}

#[derive(Default)]
struct PoolMetrics {
    created: AtomicU64,
    reused: AtomicU64,
    in_flight: AtomicUsize,
}

impl ContextPool {
    pub fn new(config: PoolConfig) -> Self {
        let prewarm = config.prewarm.min(config.max_idle);
        let free_list = (0..prewarm).map(|_| Locals::default()).collect::<Vec<_>>();

        let metrics = PoolMetrics::default();
        metrics.created.store(free_list.len() as u64, Ordering::Relaxed);

        Self { free_list: Mutex::new(free_list), config, metrics }
    }

    /// Binds a clean context to `request`, `writer` and `handlers`.
    ///
    /// The returned context has no path parameters, an empty key/value bag, its cursor before the
    /// first handler and the abort flag cleared.
    pub fn acquire(&self, request: Request, writer: ResponseWriter, handlers: Chain) -> PooledContext<'_> {
        let locals = self.checkout();
        self.bind(request, writer, handlers, locals)
    }

    /// Takes cleared locals from the free list, or allocates new ones.
    pub(crate) fn checkout(&self) -> Locals {
        let reused = self.free_list.lock().pop();

        let mut locals = match reused {
            Some(locals) => {
                self.metrics.reused.fetch_add(1, Ordering::Relaxed);
                locals
            }
            None => {
                let created = self.metrics.created.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(created, "context pool is empty, allocating a new context");
                Locals::default()
            }
        };
        locals.clear();
        locals
    }

    /// Binds `locals` taken with [`checkout`](ContextPool::checkout) to a request.
    pub(crate) fn bind(
        &self,
        request: Request,
        writer: ResponseWriter,
        handlers: Chain,
        locals: Locals,
    ) -> PooledContext<'_> {
        self.metrics.in_flight.fetch_add(1, Ordering::Relaxed);
        PooledContext { pool: self, ctx: Context::bind(request, writer, handlers, locals) }
    }

    fn recycle(&self, mut locals: Locals) {
        locals.clear();

        self.metrics.in_flight.fetch_sub(1, Ordering::Relaxed);

        let mut free_list = self.free_list.lock();
        if free_list.len() < self.config.max_idle {
            free_list.push(locals);
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.metrics.created.load(Ordering::Relaxed),
            reused: self.metrics.reused.load(Ordering::Relaxed),
            in_flight: self.metrics.in_flight.load(Ordering::Relaxed),
            idle: self.free_list.lock().len(),
        }
    }
}

impl Default for ContextPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl fmt::Debug for ContextPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextPool").field("config", &self.config).field("stats", &self.stats()).finish()
    }
}

/// A [`Context`] on loan from a [`ContextPool`], returned to it on drop.
pub struct PooledContext<'pool> {
    pool: &'pool ContextPool,
    ctx: Context,
}

impl PooledContext<'_> {
    /// Returns the context to its pool and hands back the response it produced.
    pub fn release(mut self) -> ResponseWriter {
        self.ctx.take_writer()
    }
}

impl Deref for PooledContext<'_> {
    type Target = Context;

    fn deref(&self) -> &Self::Target {
        &self.ctx
    }
}

impl DerefMut for PooledContext<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ctx
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        self.pool.recycle(self.ctx.take_locals());
    }
}

impl fmt::Debug for PooledContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PooledContext").field(&self.ctx).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{ContextPool, PoolConfig, PoolStats};
    use crate::Context;
    use crate::handler::Chain;
    use crate::request::Request;
    use crate::response::ResponseWriter;
    use bytes::Bytes;
    use http::StatusCode;
    use std::sync::Arc;

    fn request(path: &str) -> Request {
        Request::new(http::Request::get(path).body(Bytes::new()).unwrap())
    }

    fn empty_chain() -> Chain {
        Arc::new([])
    }

    #[test]
    fn test_release_clears_state() {
        let pool = ContextPool::default();

        let mut ctx = pool.acquire(request("/users/1"), ResponseWriter::new(), empty_chain());
        ctx.params_mut().insert("id", "1");
        ctx.set("user", String::from("alice"));
        ctx.abort();
        ctx.status(StatusCode::NO_CONTENT);

        let writer = ctx.release();
        assert_eq!(writer.status(), StatusCode::NO_CONTENT);

        let ctx = pool.acquire(request("/other"), ResponseWriter::new(), empty_chain());
        assert!(ctx.params().is_empty());
        assert!(ctx.get::<String>("user").is_none());
        assert!(ctx.keys().is_empty());
        assert!(!ctx.is_aborted());
        assert!(!ctx.writer().is_written());
        assert_eq!(ctx.path(), "/other");
        ctx.release();

        assert_eq!(pool.stats(), PoolStats { created: 1, reused: 1, in_flight: 0, idle: 1 });
    }

    #[test]
    fn test_max_idle() {
        let pool = ContextPool::new(PoolConfig { max_idle: 1, prewarm: 4 });
        assert_eq!(pool.stats().idle, 1);
        assert_eq!(pool.stats().created, 1);

        let first = pool.acquire(request("/"), ResponseWriter::new(), empty_chain());
        let second = pool.acquire(request("/"), ResponseWriter::new(), empty_chain());
        assert_eq!(pool.stats().in_flight, 2);

        first.release();
        second.release();

        assert_eq!(pool.stats(), PoolStats { created: 2, reused: 1, in_flight: 0, idle: 1 });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acquire_never_shares_state() {
        let pool = Arc::new(ContextPool::new(PoolConfig { max_idle: 8, prewarm: 2 }));

        let tasks = (0..64_i32)
            .map(|i| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move {
                    let mut ctx = pool.acquire(request(&format!("/req/{i}")), ResponseWriter::new(), empty_chain());
                    assert!(ctx.keys().is_empty());
                    assert!(ctx.params().is_empty());

                    ctx.set("owner", i);
                    ctx.params_mut().insert("owner", &i.to_string());
                    tokio::task::yield_now().await;

                    // nobody else wrote into this context while we held it
                    assert_eq!(ctx.get::<i32>("owner").as_deref(), Some(&i));
                    assert_eq!(ctx.param("owner"), Some(i.to_string().as_str()));
                    assert_eq!(ctx.params().len(), 1);
                    assert_eq!(ctx.path(), format!("/req/{i}"));
                    ctx.release();
                })
            })
            .collect::<Vec<_>>();

        for task in tasks {
            task.await.unwrap();
        }

        let stats = pool.stats();
        assert_eq!(stats.in_flight, 0);
        assert!(stats.idle <= 8);
        // every acquisition either reused a context or created one, on top of the prewarmed two
        assert_eq!(stats.created + stats.reused, 64 + 2);
    }

    #[test]
    fn test_drop_returns_context() {
        let pool = ContextPool::default();

        {
            let ctx = pool.acquire(request("/dropped"), ResponseWriter::new(), empty_chain());
            ctx.set("leftover", 1_u8);
            assert_eq!(pool.stats().in_flight, 1);
        }
        assert_eq!(pool.stats(), PoolStats { created: 1, reused: 0, in_flight: 0, idle: 1 });

        let ctx = pool.acquire(request("/"), ResponseWriter::new(), empty_chain());
        assert!(!ctx.contains_key("leftover"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_abandoned_chain_returns_context() {
        async fn stuck(_ctx: &mut Context) {
            std::future::pending::<()>().await;
        }

        let pool = ContextPool::default();
        let chain: Chain = Arc::new([Arc::new(crate::handler_fn(stuck)) as Arc<dyn crate::Handler>]);

        let run = async {
            let mut ctx = pool.acquire(request("/stuck"), ResponseWriter::new(), chain);
            ctx.next().await;
            ctx.release()
        };
        let result = tokio::time::timeout(std::time::Duration::from_millis(10), run).await;

        assert!(result.is_err());
        assert_eq!(pool.stats(), PoolStats { created: 1, reused: 0, in_flight: 0, idle: 1 });
    }
}
