//! REST adapter for the webmail server
//!
//! Requests go through a blocking ureq agent on a short-lived worker thread;
//! the async methods await the worker's reply over a oneshot channel, so the
//! caller's executor keeps running while a request is on the wire. Dropping
//! a future abandons its response; the worker finishes on its own.

use anyhow::{Context, Result, bail};
use futures::channel::oneshot;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::{Cursor, MailBackend, OverviewPage, PageQuery};
use crate::models::{AccountDirectory, Flag, MessageDetail, MessageKey, OverviewRecord};

/// Envelope of `GET /api/emails/overview`
#[derive(Debug, Deserialize)]
struct OverviewResponse {
    #[serde(default)]
    data: Vec<OverviewRecord>,
    #[serde(default)]
    meta: OverviewMeta,
}

#[derive(Debug, Default, Deserialize)]
struct OverviewMeta {
    #[serde(default)]
    next_cursor: Option<String>,
    #[serde(default)]
    total_count: Option<u64>,
}

impl From<OverviewResponse> for OverviewPage {
    fn from(response: OverviewResponse) -> Self {
        OverviewPage {
            records: response.data,
            next_cursor: response
                .meta
                .next_cursor
                .filter(|c| !c.is_empty())
                .map(Cursor),
            total_count: response.meta.total_count,
        }
    }
}

/// Client for the webmail REST API
pub struct HttpBackend {
    base: Url,
    agent: ureq::Agent,
    /// `Authorization` header value
    auth: Option<String>,
}

impl HttpBackend {
    /// Create a client rooted at `base_url` (e.g. `http://localhost:8000/`)
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url).with_context(|| format!("Invalid base URL: {base_url}"))?;
        if base.cannot_be_a_base() {
            bail!("Base URL cannot carry paths: {base_url}");
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            base,
            agent: ureq::Agent::new_with_defaults(),
            auth: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(format!("Bearer {}", token.into()));
        self
    }

    fn join(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("Failed to build URL for {path}"))
    }

    pub(crate) fn mailbox_url(&self) -> Result<Url> {
        self.join("api/emails/mailbox")
    }

    pub(crate) fn overview_url(&self, query: &PageQuery) -> Result<Url> {
        let mut url = self.join("api/emails/overview")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("mailbox", &query.mailbox);
            pairs.append_pair("limit", &query.page_size.to_string());
            if let Some(accounts) = &query.accounts {
                for account in accounts {
                    pairs.append_pair("accounts", account);
                }
            }
            if let Some(search) = &query.search {
                pairs.append_pair("search_query", search);
            }
            if let Some(cursor) = &query.cursor {
                pairs.append_pair("cursor", cursor.as_str());
            }
        }
        Ok(url)
    }

    pub(crate) fn message_url(&self, key: &MessageKey, suffix: &str) -> Result<Url> {
        let path = format!(
            "api/accounts/{}/mailboxes/{}/emails/{}{}",
            urlencoding::encode(&key.account),
            urlencoding::encode(&key.mailbox),
            key.uid,
            suffix
        );
        self.join(&path)
    }

    pub(crate) fn mailboxes_url(&self, account: &str) -> Result<Url> {
        self.join(&format!("api/accounts/{}/mailboxes", urlencoding::encode(account)))
    }

    async fn get_json<T>(&self, url: Url, what: String) -> Result<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        log::debug!("GET {url}");
        let agent = self.agent.clone();
        let auth = self.auth.clone();
        offload(move || {
            let mut response = authorize(agent.get(url.as_str()), auth.as_deref())
                .call()
                .with_context(|| format!("Failed to {what}"))?;
            response
                .body_mut()
                .read_json()
                .with_context(|| format!("Failed to parse response to {what}"))
        })
        .await
    }

    async fn get_bytes(&self, url: Url, what: String) -> Result<Vec<u8>> {
        log::debug!("GET {url}");
        let agent = self.agent.clone();
        let auth = self.auth.clone();
        offload(move || {
            let mut response = authorize(agent.get(url.as_str()), auth.as_deref())
                .call()
                .with_context(|| format!("Failed to {what}"))?;
            response
                .body_mut()
                .read_to_vec()
                .with_context(|| format!("Failed to read body of {what}"))
        })
        .await
    }

    /// POST `body` as JSON, or an empty body for `None`
    async fn post(&self, url: Url, body: Option<serde_json::Value>, what: String) -> Result<()> {
        log::debug!("POST {url}");
        let agent = self.agent.clone();
        let auth = self.auth.clone();
        offload(move || {
            let request = authorize(agent.post(url.as_str()), auth.as_deref());
            let sent = match body {
                Some(body) => request.send_json(body),
                None => request.send_empty(),
            };
            sent.with_context(|| format!("Failed to {what}"))?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, url: Url, what: String) -> Result<()> {
        log::debug!("DELETE {url}");
        let agent = self.agent.clone();
        let auth = self.auth.clone();
        offload(move || {
            authorize(agent.delete(url.as_str()), auth.as_deref())
                .call()
                .with_context(|| format!("Failed to {what}"))?;
            Ok(())
        })
        .await
    }
}

fn authorize<B>(request: ureq::RequestBuilder<B>, auth: Option<&str>) -> ureq::RequestBuilder<B> {
    match auth {
        Some(value) => request.header("Authorization", value),
        None => request,
    }
}

/// Run a blocking call on a worker thread and await its result
async fn offload<T, F>(call: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    std::thread::Builder::new()
        .name("mailview-http".into())
        .spawn(move || {
            if tx.send(call()).is_err() {
                log::debug!("HTTP response dropped; request was abandoned");
            }
        })
        .context("Failed to start HTTP worker")?;
    rx.await.context("HTTP worker exited without a response")?
}

impl MailBackend for HttpBackend {
    async fn list_accounts(&self) -> Result<AccountDirectory> {
        let url = self.mailbox_url()?;
        self.get_json(url, "list mailboxes".into()).await
    }

    async fn fetch_overview_page(&self, query: &PageQuery) -> Result<OverviewPage> {
        let url = self.overview_url(query)?;
        let overview: OverviewResponse = self
            .get_json(url, format!("fetch {} overview", query.mailbox))
            .await?;
        Ok(overview.into())
    }

    async fn fetch_message_detail(&self, key: &MessageKey) -> Result<MessageDetail> {
        let url = self.message_url(key, "")?;
        let mut detail: MessageDetail = self.get_json(url, format!("fetch message {key}")).await?;

        // The server omits the account from message refs
        if detail.reference.account.is_none() {
            detail.reference.account = Some(key.account.clone());
        }
        Ok(detail)
    }

    async fn fetch_attachment_bytes(&self, key: &MessageKey, part: &str) -> Result<Vec<u8>> {
        let url = self.message_url(key, &format!("/attachments/{}", urlencoding::encode(part)))?;
        self.get_bytes(url, format!("download part {part} of {key}")).await
    }

    async fn set_flag(&self, key: &MessageKey, flag: Flag, value: bool) -> Result<()> {
        let url = self.message_url(key, "/flags")?;
        let body = serde_json::json!({ "flag": flag.name(), "value": value });
        self.post(url, Some(body), format!("set {flag}={value} on {key}"))
            .await
    }

    async fn create_mailbox(&self, account: &str, name: &str) -> Result<()> {
        let url = self.mailboxes_url(account)?;
        let body = serde_json::json!({ "name": name });
        self.post(url, Some(body), format!("create mailbox {name} for {account}"))
            .await
    }

    async fn move_message(&self, key: &MessageKey, destination: &str) -> Result<()> {
        // The server's archive route is the only move it exposes
        if destination != crate::actions::ARCHIVE_MAILBOX {
            bail!("Server only supports moving to {}", crate::actions::ARCHIVE_MAILBOX);
        }
        let url = self.message_url(key, "/archive")?;
        self.post(url, None, format!("archive {key}")).await
    }

    async fn delete_message(&self, key: &MessageKey) -> Result<()> {
        let url = self.message_url(key, "")?;
        self.delete(url, format!("delete {key}")).await
    }
}
