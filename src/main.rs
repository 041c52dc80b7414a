mod config;
mod github;
mod hooks;
mod http;
mod review;
mod signature;

use actix_web::{middleware::Logger, HttpServer};
use color_eyre::eyre::{self, WrapErr as _};

#[actix_web::main]
async fn main() -> eyre::Result<()> {
    dotenv::dotenv().ok();
    color_eyre::install()?;
    tracing_log::LogTracer::init()?;
    tracing::subscriber::set_global_default(tracing_subscriber::fmt().finish())?;

    let config: config::Config = envy::prefixed("TAPPER_").from_env().wrap_err(
        "Set TAPPER_USERNAME, TAPPER_PASSWORD, and TAPPER_REVIEWBOARD_URL in the environment or .env",
    )?;
    let matcher = review::ReviewMatcher::new(&config.reviewboard_url)
        .wrap_err("Failed to build review reference pattern")?;

    let bind = config.bind.clone();
    tracing::info!(
        reviewboard_url = config.reviewboard_url.as_str(),
        branch_filter = config.branch_filter,
        include_description = config.include_description,
        secret_key = config.secret_key.is_some(),
        webhook_secret = config.webhook_secret.is_some(),
        "Listening on {}",
        bind
    );

    HttpServer::new(move || hooks::app(&config, matcher.clone()).wrap(Logger::default()))
        .bind(bind.as_str())?
        .run()
        .await
        .map_err(Into::into)
}
