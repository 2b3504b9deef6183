//! The single handler capability and the adapters that produce handlers.
//!
//! Route handlers and middleware are the same thing: a [`Handler`] is invoked with the request's
//! [`Context`] and decides for itself whether to run the rest of the chain through
//! [`Context::next`], to stop it with [`Context::abort`], or simply to return.

use crate::Context;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// An ordered, immutable handler chain shared by every request that matches one route.
pub type Chain = Arc<[Arc<dyn Handler>]>;

#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, ctx: &mut Context);
}

/// Represents an async function taking the request context, for one context borrow `'ctx`.
///
/// Used with a higher-ranked bound (`for<'ctx> HandlerFn<'ctx>`) so that plain
/// `async fn(&mut Context)` items can serve as handlers.
pub trait HandlerFn<'ctx>: Send + Sync {
    type Fut: Future<Output = ()> + Send + 'ctx;

    fn call(&self, ctx: &'ctx mut Context) -> Self::Fut;
}

impl<'ctx, F, Fut> HandlerFn<'ctx> for F
where
    F: Fn(&'ctx mut Context) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'ctx,
{
    type Fut = Fut;

    #[inline]
    fn call(&self, ctx: &'ctx mut Context) -> Self::Fut {
        (self)(ctx)
    }
}

/// a [`HandlerFn`] holder which turns an async fn into a [`Handler`]
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: for<'ctx> HandlerFn<'ctx>,
{
    FnHandler { f }
}

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: for<'ctx> HandlerFn<'ctx>,
{
    async fn call(&self, ctx: &mut Context) {
        HandlerFn::call(&self.f, ctx).await;
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("f", &std::any::type_name::<F>()).finish()
    }
}

/// Converts one handler, a tuple of handlers or a prepared list into an ordered handler list.
pub trait IntoHandlers {
    fn into_handlers(self) -> Vec<Arc<dyn Handler>>;
}

impl<H: Handler + 'static> IntoHandlers for H {
    fn into_handlers(self) -> Vec<Arc<dyn Handler>> {
        vec![Arc::new(self)]
    }
}

impl IntoHandlers for () {
    #[inline]
    fn into_handlers(self) -> Vec<Arc<dyn Handler>> {
        Vec::new()
    }
}

impl IntoHandlers for Vec<Arc<dyn Handler>> {
    #[inline]
    fn into_handlers(self) -> Vec<Arc<dyn Handler>> {
        self
    }
}

/// impl `IntoHandlers` for tuples, from 1 handler to 12 handlers, keeping the tuple order
///
/// for example, it will impl (A, B) like this:
///```text
/// impl<A, B> IntoHandlers for (A, B)
///    where
///        A: Handler + 'static,
///        B: Handler + 'static,
/// {
///    fn into_handlers(self) -> Vec<Arc<dyn Handler>> {
///        let (A, B) = self;
///        vec![Arc::new(A), Arc::new(B)]
///    }
/// }
///```
macro_rules! impl_into_handlers_for_tuple ({ $($param:ident)* } => {
    impl<$($param,)*> IntoHandlers for ($($param,)*)
    where
        $($param: Handler + 'static,)*
    {
        #[allow(non_snake_case, reason = "tuple members reuse the generic parameter names")]
        fn into_handlers(self) -> Vec<Arc<dyn Handler>> {
            let ($($param,)*) = self;
            vec![$(Arc::new($param) as Arc<dyn Handler>,)*]
        }
    }
});

impl_into_handlers_for_tuple! { A }
impl_into_handlers_for_tuple! { A B }
impl_into_handlers_for_tuple! { A B C }
impl_into_handlers_for_tuple! { A B C D }
impl_into_handlers_for_tuple! { A B C D E }
impl_into_handlers_for_tuple! { A B C D E F }
impl_into_handlers_for_tuple! { A B C D E F G }
impl_into_handlers_for_tuple! { A B C D E F G H }
impl_into_handlers_for_tuple! { A B C D E F G H I }
impl_into_handlers_for_tuple! { A B C D E F G H I J }
impl_into_handlers_for_tuple! { A B C D E F G H I J K }
impl_into_handlers_for_tuple! { A B C D E F G H I J K L }
