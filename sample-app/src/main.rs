use misugo::cli::CliArgs;
use misugo::middleware::builtin::{LoggingMiddleware, SecurityHeadersMiddleware};
use misugo::{handler, Middleware, Misugo};

mod auth;
mod items;

#[tokio::main]
async fn main() -> misugo::Result<()> {
    let args = CliArgs::parse()?;
    if args.is_help() {
        CliArgs::print_help();
        return Ok(());
    }
    let mut app = Misugo::from_args(&args)?;

    // RUST_LOG wins over the configured level
    env_logger::Builder::new()
        .parse_filters(&app.config.logging.level)
        .parse_default_env()
        .init();

    let store = items::ItemStore::shared();

    app.middleware(LoggingMiddleware::new().boxed())?
        .middleware(SecurityHeadersMiddleware::new().boxed())?;

    app.get("/items", store.list_handler(), vec![])?
        .post("/items", store.create_handler(), vec![auth::RequireToken::from_env().boxed()])?
        .get("/health", handler!(items::health), vec![])?;

    log::info!("Serving {} routes", app.route_count());
    app.start().await
}
