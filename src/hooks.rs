use std::io::Write;

use actix_web::{
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    web, App,
};
use tracing::Instrument as _;

use crate::{
    config::Config,
    github::{Commit, PushEvent},
    http::{Webhook, WebhookConfig},
    review::{self, ReviewBoard, ReviewMatcher, ReviewRequestUpdate},
};

#[derive(Debug, Clone, thiserror::Error)]
pub enum PushHookError {
    #[error("payload must contain a non-empty `commits` list")]
    NoCommits,
    #[error("only pushes to master branch are processed")]
    NotMaster,
}

impl actix_web::ResponseError for PushHookError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        match self {
            PushHookError::NoCommits => actix_web::http::StatusCode::BAD_REQUEST,
            PushHookError::NotMaster => actix_web::http::StatusCode::OK,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HookConfig {
    pub branch_filter: bool,
    pub include_description: bool,
    pub matcher: ReviewMatcher,
}

/// Builds the application for one worker. `matcher` is compiled once by the
/// caller and shared between workers.
pub fn app(
    config: &Config,
    matcher: ReviewMatcher,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(ReviewBoard::new(
            awc::Client::default(),
            config,
        )))
        .app_data(web::Data::new(HookConfig {
            branch_filter: config.branch_filter,
            include_description: config.include_description,
            matcher,
        }))
        .app_data(WebhookConfig {
            secret_key: config.secret_key.clone(),
            signing_key: config.webhook_secret.clone(),
        })
        .app_data(web::PayloadConfig::new(config.payload_limit))
        .route("/", web::get().to(index))
        .route("/commits", web::post().to(commits_hook))
}

pub async fn index() -> &'static str {
    "OK"
}

pub async fn commits_hook(
    Webhook(hook): Webhook<PushEvent>,
    config: web::Data<HookConfig>,
    review_board: web::Data<ReviewBoard>,
) -> Result<&'static str, PushHookError> {
    let on_master = hook.is_master();
    let PushEvent { reference, commits } = hook;

    let commits = match commits {
        Some(commits) if !commits.is_empty() => commits,
        _ => return Err(PushHookError::NoCommits),
    };

    if config.branch_filter && !on_master {
        tracing::info!(
            "Ignoring push to {}",
            reference.as_deref().unwrap_or("<no ref>")
        );
        return Err(PushHookError::NotMaster);
    }

    let span = tracing::info_span!(
        "push",
        reference = reference.as_deref().unwrap_or_default(),
        commits = commits.len(),
    );
    async {
        let mut stdout = std::io::stdout();
        for commit in &commits {
            close_referenced(commit, &config, &review_board, &mut stdout).await;
        }
    }
    .instrument(span)
    .await;

    Ok("OK")
}

/// Closes the review request referenced by `commit`, if any. The description
/// of a successfully closed request is written to `out`.
async fn close_referenced(
    commit: &Commit,
    config: &HookConfig,
    review_board: &ReviewBoard,
    out: &mut impl Write,
) {
    let id = match config.matcher.review_id(&commit.message) {
        Some(id) => id,
        None => return,
    };

    let description = if config.include_description {
        match review::describe(commit) {
            Ok(description) => Some(description),
            Err(err) => {
                tracing::error!(
                    commit = commit.id.as_str(),
                    "Failed to render description: {}",
                    err
                );
                return;
            }
        }
    } else {
        None
    };

    let update = ReviewRequestUpdate::submitted(description);
    match review_board.close(id, &update).await {
        Ok(()) => {
            tracing::info!(
                review_request = id,
                commit = commit.id.as_str(),
                "Closed review request {}",
                id
            );
            if let Some(description) = &update.description {
                if let Err(err) = writeln!(out, "{}", description) {
                    tracing::warn!("Failed to print description: {}", err);
                }
            }
        }
        Err(err) => {
            tracing::error!(
                review_request = id,
                commit = commit.id.as_str(),
                "Failed to close review request {}: {:#}",
                id,
                err
            );
        }
    }
}
