//! Navigation link resolution
//!
//! Fetches a FROST `@iot.navigationLink` and turns the answer into the
//! `@iot.id`s it references. Resolution is best effort: every transport or
//! parse problem is logged as a warning and yields no identifiers.

use crate::config::ResolverConfig;
use crate::envelope::{EntityEnvelope, IdentifierList, Resolution};
use crate::error::ResolveError;
use reqwest::{Client, StatusCode};
use url::Url;

/// Resolves navigation links over HTTP
#[derive(Debug, Clone)]
pub struct LinkResolver {
    client: Client,
}

impl LinkResolver {
    pub fn new(config: &ResolverConfig) -> reqwest::Result<Self> {
        Ok(Self {
            client: config.build_client()?,
        })
    }

    /// Use an existing client, sharing its connection pool and settings
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Resolve a link to its identifiers.
    ///
    /// Returns `None` without any request when the link is absent or blank,
    /// and `None` after logging a warning when the link cannot be fetched or
    /// parsed. A response with neither `@iot.id` nor `value` is `None` too.
    pub async fn resolve_identifiers(&self, link: Option<&str>) -> Option<IdentifierList> {
        self.resolve(link).await.into_identifiers()
    }

    /// Same as [`resolve_identifiers`](Self::resolve_identifiers), comma-joined
    pub async fn resolve_iot_ids(&self, link: Option<&str>) -> Option<String> {
        self.resolve_identifiers(link)
            .await
            .map(|ids| ids.joined())
    }

    pub async fn resolve(&self, link: Option<&str>) -> Resolution {
        let Some(link) = present(link) else {
            return Resolution::Absent;
        };

        match self.fetch_envelope(link).await {
            Ok(envelope) => envelope.detect(),
            Err(e) => {
                log_failure(&e);
                Resolution::Absent
            }
        }
    }

    /// Resolve a link that must point at a single entity.
    ///
    /// Unlike [`resolve_identifiers`](Self::resolve_identifiers) nothing is
    /// swallowed: fetch failures and a missing `@iot.id` are logged and come
    /// back as errors.
    #[deprecated(note = "use `resolve_iot_ids`, which detects single and multiple ids")]
    pub async fn single_iot_id(&self, link: Option<&str>) -> Result<Option<String>, ResolveError> {
        let Some(link) = present(link) else {
            return Ok(None);
        };
        self.fetch_envelope(link)
            .await
            .and_then(|envelope| envelope.single_id())
            .map(Some)
            .map_err(logged)
    }

    /// Resolve a link that must point at an entity collection.
    ///
    /// Fetch failures, a missing `value` or a member without `@iot.id` are
    /// logged and come back as errors.
    #[deprecated(note = "use `resolve_iot_ids`, which detects single and multiple ids")]
    pub async fn multiple_iot_ids(
        &self,
        link: Option<&str>,
    ) -> Result<Option<String>, ResolveError> {
        let Some(link) = present(link) else {
            return Ok(None);
        };
        self.fetch_envelope(link)
            .await
            .and_then(|envelope| envelope.collection_ids())
            .map(|ids| Some(ids.join(",")))
            .map_err(logged)
    }

    async fn fetch_envelope(&self, link: &str) -> Result<EntityEnvelope, ResolveError> {
        let url = Url::parse(link).map_err(|source| ResolveError::InvalidLink {
            link: link.to_string(),
            source,
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ResolveError::UnsupportedScheme {
                link: link.to_string(),
                scheme: url.scheme().to_string(),
            });
        }

        tracing::debug!(%url, "fetching navigation link");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ResolveError::Connection {
                link: link.to_string(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            // Drain so the connection goes back to the pool.
            let _ = response.bytes().await;
            return Err(ResolveError::Status {
                link: link.to_string(),
                status,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| ResolveError::Body {
                link: link.to_string(),
                source,
            })?;

        EntityEnvelope::from_slice(link, &body)
    }
}

fn present(link: Option<&str>) -> Option<&str> {
    link.map(str::trim).filter(|l| !l.is_empty())
}

fn logged(err: ResolveError) -> ResolveError {
    log_failure(&err);
    err
}

fn log_failure(err: &ResolveError) {
    let link = err.link();
    match err {
        ResolveError::InvalidLink { .. } | ResolveError::UnsupportedScheme { .. } => {
            tracing::warn!(%link, error = %err, "invalid @iot.navigationLink")
        }
        ResolveError::Connection { .. } => {
            tracing::warn!(%link, error = %err, "could not establish connection")
        }
        ResolveError::Status { status, .. } => {
            tracing::warn!(%link, status = status.as_u16(), "unexpected HTTP status")
        }
        ResolveError::Body { .. }
        | ResolveError::Parse { .. }
        | ResolveError::NotAnObject { .. } => {
            tracing::warn!(%link, error = %err, "could not parse response as JSON object")
        }
        ResolveError::MissingField { .. } | ResolveError::InvalidValue { .. } => {
            tracing::warn!(%link, error = %err, "unexpected response shape")
        }
    }
}
