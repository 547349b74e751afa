//! HTTP client for the CMS REST API.
//!
//! Every request carries the bearer token, goes through
//! [`retry_with_backoff`] for transport failures, and returns the raw status
//! so each operation decides which codes count as success.

use std::time::Duration;

use medcat_core::{MappingTable, Product};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::CmsError;
use crate::retry::retry_with_backoff;
use crate::types::{Entry, ListEnvelope, SingleEnvelope};

/// Client for one CMS collection, plus read access to any other collection
/// for lookups.
pub struct CmsClient {
    client: Client,
    base_url: Url,
    token: String,
    collection: String,
    max_retries: u32,
    backoff_ms: u64,
}

impl CmsClient {
    /// # Errors
    ///
    /// Returns [`CmsError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed, or [`CmsError::InvalidBaseUrl`] if `base_url` does not
    /// parse as an absolute http(s) URL.
    pub fn new(
        base_url: &str,
        token: &str,
        collection: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_ms: u64,
    ) -> Result<Self, CmsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("medcat/0.1 (catalog-upload)")
            .build()?;

        // Exactly one trailing slash so path segments append below any
        // prefix the CMS is mounted under.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let parsed = Url::parse(&normalised).map_err(|e| CmsError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(CmsError::InvalidBaseUrl {
                url: base_url.to_owned(),
                reason: "expected an http(s) URL".to_owned(),
            });
        }

        Ok(Self {
            client,
            base_url: parsed,
            token: token.to_owned(),
            collection: collection.to_owned(),
            max_retries,
            backoff_ms,
        })
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// First record whose `name` equals `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CmsError`] on transport failure, a non-2xx status, or a
    /// malformed body.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Entry>, CmsError> {
        self.find_by_field("name", name).await
    }

    /// First record whose `referenceString` equals `reference`.
    ///
    /// # Errors
    ///
    /// Same as [`CmsClient::find_by_name`].
    pub async fn find_by_reference(&self, reference: &str) -> Result<Option<Entry>, CmsError> {
        self.find_by_field("referenceString", reference).await
    }

    async fn find_by_field(&self, field: &str, value: &str) -> Result<Option<Entry>, CmsError> {
        let filter = format!("filters[{field}][$eq]");
        let url = self.build_url(&[self.collection.as_str()], &[(filter.as_str(), value)])?;
        let (status, body) = self.execute(Method::GET, url, None).await?;
        let body = expect_status(status, body, is_success)?;
        let list: ListEnvelope = decode(&body, &format!("find {field}={value}"))?;
        Ok(list.data.into_iter().next())
    }

    /// POST a new record. Not idempotent: each call creates a new record.
    ///
    /// # Errors
    ///
    /// Returns [`CmsError::Status`] for anything but 200/201.
    pub async fn create(&self, product: &Product) -> Result<Entry, CmsError> {
        let url = self.build_url(&[self.collection.as_str()], &[])?;
        let payload = serde_json::json!({ "data": product });
        let (status, body) = self.execute(Method::POST, url, Some(&payload)).await?;
        let body = expect_status(status, body, created_or_ok)?;
        let envelope: SingleEnvelope = decode(&body, "create")?;
        tracing::info!(id = envelope.data.id, name = %product.name, "created record");
        Ok(envelope.data)
    }

    /// PUT a full record over an existing id.
    ///
    /// # Errors
    ///
    /// Returns [`CmsError::Status`] for anything but 200/201.
    pub async fn update(&self, id: i64, product: &Product) -> Result<Entry, CmsError> {
        let id = id.to_string();
        let url = self.build_url(&[self.collection.as_str(), id.as_str()], &[])?;
        let payload = serde_json::json!({ "data": product });
        let (status, body) = self.execute(Method::PUT, url, Some(&payload)).await?;
        let body = expect_status(status, body, created_or_ok)?;
        let envelope: SingleEnvelope = decode(&body, &format!("update {id}"))?;
        tracing::info!(id = envelope.data.id, name = %product.name, "updated record");
        Ok(envelope.data)
    }

    /// Update the record with the same reference if one exists, else create.
    ///
    /// # Errors
    ///
    /// Propagates errors from the lookup, create or update.
    pub async fn upsert(&self, product: &Product) -> Result<Entry, CmsError> {
        match self.find_by_reference(&product.reference_string).await? {
            Some(existing) => self.update(existing.id, product).await,
            None => self.create(product).await,
        }
    }

    /// # Errors
    ///
    /// Returns [`CmsError::Status`] for anything but 200/204.
    pub async fn delete(&self, id: i64) -> Result<(), CmsError> {
        let id_text = id.to_string();
        let url = self.build_url(&[self.collection.as_str(), id_text.as_str()], &[])?;
        let (status, body) = self.execute(Method::DELETE, url, None).await?;
        expect_status(status, body, |s| {
            s == StatusCode::OK || s == StatusCode::NO_CONTENT
        })?;
        tracing::info!(id, "deleted record");
        Ok(())
    }

    /// Every record of `collection`, following pagination until the reported
    /// page count is reached.
    ///
    /// # Errors
    ///
    /// Returns [`CmsError`] from the first failing page.
    pub async fn list_collection(
        &self,
        collection: &str,
        page_size: u32,
    ) -> Result<Vec<Entry>, CmsError> {
        let page_size_text = page_size.max(1).to_string();
        let mut entries = Vec::new();
        let mut page = 1u32;
        loop {
            let page_text = page.to_string();
            let url = self.build_url(
                &[collection],
                &[
                    ("pagination[page]", page_text.as_str()),
                    ("pagination[pageSize]", page_size_text.as_str()),
                ],
            )?;
            let (status, body) = self.execute(Method::GET, url, None).await?;
            let body = expect_status(status, body, is_success)?;
            let list: ListEnvelope = decode(&body, &format!("list {collection} page {page}"))?;
            let received = list.data.len();
            entries.extend(list.data);

            let page_count = list.meta.pagination.map_or(1, |p| p.page_count);
            tracing::debug!(collection, page, page_count, received, "fetched page");
            if page >= page_count || received == 0 {
                break;
            }
            page += 1;
        }
        Ok(entries)
    }

    /// `id → name` table for a lookup collection. Records without a name are
    /// left out.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`CmsClient::list_collection`].
    pub async fn fetch_mapping(
        &self,
        collection: &str,
        page_size: u32,
    ) -> Result<MappingTable, CmsError> {
        let entries = self.list_collection(collection, page_size).await?;
        let table: MappingTable = entries
            .iter()
            .filter_map(|e| {
                e.text("name")
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(|n| (e.id, n.to_owned()))
            })
            .collect();
        tracing::info!(collection, entries = table.len(), "fetched mapping");
        Ok(table)
    }

    /// Cheap authenticated request against the product collection.
    ///
    /// # Errors
    ///
    /// Returns [`CmsError`] if the CMS is unreachable or rejects the token.
    pub async fn ping(&self) -> Result<(), CmsError> {
        let url = self.build_url(
            &[self.collection.as_str()],
            &[("pagination[page]", "1"), ("pagination[pageSize]", "1")],
        )?;
        let (status, body) = self.execute(Method::GET, url, None).await?;
        expect_status(status, body, is_success)?;
        Ok(())
    }

    /// `<base>/api/<segments...>?<query>` with every part percent-encoded.
    fn build_url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, CmsError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| CmsError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "cannot be a base".to_owned(),
            })?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Send one request and return its status and body text. Only transport
    /// failures are retried.
    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> Result<(StatusCode, String), CmsError> {
        retry_with_backoff(self.max_retries, self.backoff_ms, || {
            let mut request = self
                .client
                .request(method.clone(), url.clone())
                .bearer_auth(&self.token);
            if let Some(payload) = body {
                request = request.json(payload);
            }
            async move {
                let response = request.send().await?;
                let status = response.status();
                let text = response.text().await?;
                Ok((status, text))
            }
        })
        .await
    }
}

fn is_success(status: StatusCode) -> bool {
    status.is_success()
}

fn created_or_ok(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::CREATED
}

fn expect_status(
    status: StatusCode,
    body: String,
    accept: impl Fn(StatusCode) -> bool,
) -> Result<String, CmsError> {
    if accept(status) {
        Ok(body)
    } else {
        Err(CmsError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

fn decode<T: DeserializeOwned>(body: &str, context: &str) -> Result<T, CmsError> {
    serde_json::from_str(body).map_err(|e| CmsError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
