//! # GitHub Inventory
//!
//! Lists the repositories and gists to mirror through the GitHub REST API.
//! Each `Source` is one listing endpoint; `GitHubLister` pages through it by
//! following the `Link: <...>; rel="next"` response header.
//!
//! The client is blocking: listing happens on worker threads that block on
//! clones and fetches anyway.

use std::sync::LazyLock;
use std::time::Duration;

use log::info;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use url::Url;

use crate::error::{Error, Result};
use crate::item::{GistRecord, RemoteRecord, RepoRecord};
use crate::lister::{Page, PagedLister};

pub const DEFAULT_API_URL: &str = "https://api.github.com/";

/// Media type that makes repository listings include topics.
const TOPICS_MEDIA_TYPE: &str = "application/vnd.github.mercy-preview+json";

static LINK_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<([^>]+)>\s*;\s*rel="([^"]*)""#).expect("link header pattern is valid")
});

/// A listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Repositories starred by the configured user.
    StarredRepos,
    /// Repositories of the authenticated user.
    UserRepos,
    /// Gists of the configured user.
    UserGists,
    /// Gists starred by the authenticated user.
    StarredGists,
}

impl Source {
    pub fn label(&self) -> &'static str {
        match self {
            Source::StarredRepos => "starred-repos",
            Source::UserRepos => "user-repos",
            Source::UserGists => "user-gists",
            Source::StarredGists => "starred-gists",
        }
    }

    pub fn is_gist(&self) -> bool {
        matches!(self, Source::UserGists | Source::StarredGists)
    }

    /// API path of the first page, relative to the API root.
    pub fn path(&self, username: &str) -> String {
        match self {
            Source::StarredRepos => format!("users/{}/starred", username),
            Source::UserRepos => "user/repos".to_string(),
            Source::UserGists => format!("users/{}/gists", username),
            Source::StarredGists => "gists/starred".to_string(),
        }
    }
}

/// Returns the `rel="next"` target of a `Link` header, if any.
pub fn parse_next_link(header: &str) -> Option<String> {
    LINK_ENTRY
        .captures_iter(header)
        .find(|caps| caps[2].split_whitespace().any(|rel| rel == "next"))
        .map(|caps| caps[1].to_string())
}

/// Authenticated API client.
#[derive(Clone)]
pub struct GitHubClient {
    http: Client,
    api_url: Url,
    username: String,
}

impl GitHubClient {
    pub fn new(api_url: &str, username: &str, token: &str) -> Result<Self> {
        let mut api_url = Url::parse(api_url)?;
        // Url::join drops the last segment unless the base ends in '/'
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(TOPICS_MEDIA_TYPE));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("repo-mirror/", env!("CARGO_PKG_VERSION"))),
        );
        let mut auth = HeaderValue::from_str(&format!("token {}", token)).map_err(|_| {
            Error::Config {
                message: "API token contains characters not allowed in a header".to_string(),
                hint: None,
            }
        })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            api_url,
            username: username.to_string(),
        })
    }

    pub fn first_page_url(&self, source: Source) -> Result<Url> {
        Ok(self.api_url.join(&source.path(&self.username))?)
    }

    /// GET `url`, returning the body text and the next-page link.
    fn get(&self, url: &Url) -> Result<(String, Option<String>)> {
        info!(target: "github", "calling {}", url);
        let response = self.http.get(url.clone()).send()?;

        let status = response.status();
        let next = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_next_link);
        let body = response.text()?;

        if !status.is_success() {
            return Err(Error::Http {
                url: url.to_string(),
                status: status.as_u16(),
                message: api_message(&body),
            });
        }
        Ok((body, next))
    }
}

/// The `message` field GitHub puts in error bodies, or the raw body.
fn api_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Decodes one page body according to the kind of records `source` lists.
pub fn parse_page(source: Source, body: &str) -> Result<Vec<RemoteRecord>> {
    let records = if source.is_gist() {
        serde_json::from_str::<Vec<GistRecord>>(body)?
            .into_iter()
            .map(RemoteRecord::Gist)
            .collect()
    } else {
        serde_json::from_str::<Vec<RepoRecord>>(body)?
            .into_iter()
            .map(RemoteRecord::Repo)
            .collect()
    };
    Ok(records)
}

/// Pages through one `Source`.
pub struct GitHubLister<'a> {
    client: &'a GitHubClient,
    source: Source,
}

impl<'a> GitHubLister<'a> {
    pub fn new(client: &'a GitHubClient, source: Source) -> Self {
        Self { client, source }
    }
}

impl PagedLister for GitHubLister<'_> {
    type Record = RemoteRecord;

    fn list(&self, cursor: Option<&str>) -> Result<Page<RemoteRecord>> {
        let url = match cursor {
            Some(next) => Url::parse(next)?,
            None => self.client.first_page_url(self.source)?,
        };
        let (body, next) = self.client.get(&url)?;
        Ok(Page {
            items: parse_page(self.source, &body)?,
            next,
        })
    }
}
