//! vSphere Automation REST tag catalog.
//!
//! # Purpose
//! Implements [`TagCatalog`] against the vCenter tagging API
//! (`/api/cis/tagging/...`) using `reqwest`.
//!
//! # Key invariants
//! - Only the session token is cached. Tag and association lookups always hit
//!   vCenter so a retagged VM is seen on its next migration.
//! - A `401` triggers exactly one re-login and replay of the request.
//! - Association order from vCenter is preserved for first-match resolution.
//!
//! # Security considerations
//! - Credentials are read from a mounted secret directory and never logged.
//! - `VCENTER_INSECURE` disables certificate verification; it exists for lab
//!   vCenters with self-signed certificates.
use crate::config::VsphereConfig;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tagdrift_core::{CatalogError, CatalogResult, ObjectRef, Tag, TagCatalog};
use tokio::sync::RwLock;

pub const SESSION_HEADER: &str = "vmware-api-session-id";

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read `username` and `password` files from a secret mount.
    pub fn from_secret_dir(dir: &Path) -> Result<Self> {
        let read = |name: &str| -> Result<String> {
            let path = dir.join(name);
            let value = std::fs::read_to_string(&path)
                .with_context(|| format!("read vsphere secret {}", path.display()))?;
            let value = value.trim_end_matches(['\r', '\n']).to_string();
            if value.is_empty() {
                bail!("vsphere secret {} is empty", path.display());
            }
            Ok(value)
        };
        Ok(Self {
            username: read("username")?,
            password: read("password")?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CategoryModel {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    id: String,
    name: String,
    category_id: String,
}

pub struct VsphereCatalog {
    client: Client,
    base_url: Url,
    credentials: Credentials,
    session: Arc<RwLock<Option<String>>>,
}

impl VsphereCatalog {
    pub fn new(config: &VsphereConfig, credentials: Credentials) -> Result<Self> {
        let raw = if config.url.contains("://") {
            config.url.clone()
        } else {
            format!("https://{}", config.url)
        };
        let base_url = Url::parse(&raw).with_context(|| "parse VCENTER_URL")?;
        if base_url.cannot_be_a_base() {
            bail!("VCENTER_URL {raw:?} cannot be used as a base URL");
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .with_context(|| "build vsphere http client")?;
        Ok(Self {
            client,
            base_url,
            credentials,
            session: Arc::new(RwLock::new(None)),
        })
    }

    fn endpoint(&self, segments: &[&str], action: Option<&str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("vcenter url cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        if let Some(action) = action {
            url.query_pairs_mut().append_pair("action", action);
        }
        Ok(url)
    }

    async fn login(&self) -> Result<String> {
        let url = self.endpoint(&["api", "session"], None)?;
        let response = self
            .client
            .post(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await
            .with_context(|| "vcenter login request")?;
        let status = response.status();
        if !status.is_success() {
            bail!("vcenter login failed with status {status}");
        }
        let token: String = response
            .json()
            .await
            .with_context(|| "decode vcenter session token")?;
        tracing::debug!(url = %self.base_url, "vcenter session established");
        *self.session.write().await = Some(token.clone());
        Ok(token)
    }

    async fn session_token(&self) -> Result<String> {
        if let Some(token) = self.session.read().await.clone() {
            return Ok(token);
        }
        self.login().await
    }

    /// Send with the session header, re-authenticating once on `401`.
    async fn send<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let token = self.session_token().await?;
        let response = build(&self.client)
            .header(SESSION_HEADER, &token)
            .send()
            .await
            .with_context(|| "vcenter request")?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!("vcenter session expired, logging in again");
        self.session.write().await.take();
        let token = self.login().await?;
        build(&self.client)
            .header(SESSION_HEADER, &token)
            .send()
            .await
            .with_context(|| "vcenter request")
    }

    async fn fetch_json<T, F>(&self, what: &str, build: F) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = self.send(build).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("{what} failed with status {status}: {body}");
        }
        response
            .json()
            .await
            .with_context(|| format!("decode {what} response"))
    }

    /// Resolve `category` (an id or a name) to its id.
    async fn category_id(&self, category: &str) -> CatalogResult<String> {
        let url = self.endpoint(&["api", "cis", "tagging", "category", category], None)?;
        let response = self.send(|client| client.get(url.clone())).await?;
        let status = response.status();
        if status.is_success() {
            let model: CategoryModel = response
                .json()
                .await
                .with_context(|| "decode tag category")?;
            return Ok(model.id);
        }
        if !status.is_client_error() {
            return Err(anyhow::anyhow!("get tag category failed with status {status}").into());
        }

        let list_url = self.endpoint(&["api", "cis", "tagging", "category"], None)?;
        let ids: Vec<String> = self
            .fetch_json("list tag categories", |client| client.get(list_url.clone()))
            .await?;
        for id in ids {
            let url = self.endpoint(&["api", "cis", "tagging", "category", &id], None)?;
            let model: CategoryModel = self
                .fetch_json("get tag category", |client| client.get(url.clone()))
                .await?;
            if model.name == category {
                return Ok(model.id);
            }
        }
        Err(CatalogError::CategoryNotFound(category.to_string()))
    }
}

#[async_trait]
impl TagCatalog for VsphereCatalog {
    async fn tags_for_category(&self, category: &str) -> CatalogResult<Vec<Tag>> {
        let category_id = self.category_id(category).await?;
        let url = self.endpoint(
            &["api", "cis", "tagging", "tag"],
            Some("list-tags-for-category"),
        )?;
        let body = json!({ "category_id": category_id });
        let ids: Vec<String> = self
            .fetch_json("list tags for category", |client| {
                client.post(url.clone()).json(&body)
            })
            .await?;

        let mut tags = Vec::with_capacity(ids.len());
        for id in ids {
            let url = self.endpoint(&["api", "cis", "tagging", "tag", &id], None)?;
            let model: TagModel = self
                .fetch_json("get tag", |client| client.get(url.clone()))
                .await?;
            tags.push(Tag::new(model.id, model.name, model.category_id));
        }
        Ok(tags)
    }

    async fn attached_tags(&self, object: &ObjectRef) -> CatalogResult<Vec<String>> {
        let url = self.endpoint(
            &["api", "cis", "tagging", "tag-association"],
            Some("list-attached-tags"),
        )?;
        let body = json!({ "object_id": { "type": object.kind, "id": object.value } });
        let ids = self
            .fetch_json("list attached tags", |client| {
                client.post(url.clone()).json(&body)
            })
            .await?;
        Ok(ids)
    }

    fn backend_name(&self) -> &'static str {
        "vsphere"
    }
}
