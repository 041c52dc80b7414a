use askama::Template;
use color_eyre::eyre::{self, WrapErr as _};
use regex::Regex;
use secstr::SecUtf8;

use crate::{config::Config, github::Commit};

/// Finds `Review: <base url>r/<id>` references in commit messages.
#[derive(Debug, Clone)]
pub struct ReviewMatcher(Regex);

impl ReviewMatcher {
    pub fn new(base_url: &str) -> Result<Self, regex::Error> {
        Regex::new(&format!(r"Review: {}r/([0-9]+)", regex::escape(base_url))).map(Self)
    }

    /// First usable referenced review request. References whose ID does not
    /// fit into `u64` are logged and skipped.
    pub fn review_id(&self, message: &str) -> Option<u64> {
        self.0.captures_iter(message).find_map(|captures| {
            let digits = captures.get(1)?.as_str();
            match digits.parse() {
                Ok(id) => Some(id),
                Err(err) => {
                    tracing::warn!("Ignoring review reference `{}`: {}", digits, err);
                    None
                }
            }
        })
    }
}

// Keep unused variants for documentation
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Discarded,
    Submitted,
}

/// Body of `PUT api/review-requests/<id>/`.
#[derive(Debug, serde::Serialize)]
pub struct ReviewRequestUpdate {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ReviewRequestUpdate {
    pub fn submitted(description: Option<String>) -> Self {
        Self {
            status: Status::Submitted,
            description,
        }
    }
}

#[derive(Debug, Template)]
#[template(
    source = "Closed by {{ commit.committer.name }} <{{ commit.committer.email }}> via Tapper with commit {{ commit.id }}[1].\n\n[1] {{ commit.url }}",
    ext = "txt"
)]
struct DescriptionTemplate<'a> {
    commit: &'a Commit,
}

/// Closing note attached to the review request.
pub fn describe(commit: &Commit) -> askama::Result<String> {
    DescriptionTemplate { commit }.render()
}

pub struct ReviewBoard {
    http: awc::Client,
    base_url: String,
    username: String,
    password: SecUtf8,
}

impl ReviewBoard {
    pub fn new(http: awc::Client, config: &Config) -> Self {
        Self {
            http,
            base_url: config.reviewboard_url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }

    pub fn request_url(&self, id: u64) -> String {
        format!("{}api/review-requests/{}/", self.base_url, id)
    }

    pub async fn close(&self, id: u64, update: &ReviewRequestUpdate) -> eyre::Result<()> {
        let url = self.request_url(id);
        let mut resp = self
            .http
            .put(url.as_str())
            .basic_auth(&self.username, self.password.unsecure())
            .send_json(update)
            .await
            .map_err(|err| eyre::eyre!("Failed to send request to Review Board: {}", err))?;

        if !resp.status().is_success() {
            let body = resp
                .body()
                .await
                .wrap_err("Failed to fetch Review Board response body")?;
            eyre::bail!(
                "Review Board returned error: {}\n{}",
                resp.status(),
                String::from_utf8_lossy(body.as_ref())
            );
        }

        Ok(())
    }
}
