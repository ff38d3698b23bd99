pub mod handler;
pub mod router;

pub use handler::{adapt, BoxFuture, HandlerAdapter, RouteHandler};
pub use router::{normalize_pattern, RouteMatch, Router};

/// Turn an `async fn(&mut Context) -> Result<()>` into a registrable handler
///
/// ```rust,ignore
/// async fn list_items(ctx: &mut Context) -> Result<()> {
///     ctx.write_json(StatusCode::OK, &items)
/// }
///
/// app.get("/items", handler!(list_items), vec![])?;
/// ```
#[macro_export]
macro_rules! handler {
    ($h:path) => {{
        fn boxed_handler<'a>(
            ctx: &'a mut $crate::Context,
        ) -> $crate::BoxFuture<'a, $crate::Result<()>> {
            ::std::boxed::Box::pin($h(ctx))
        }
        boxed_handler
    }};
}
