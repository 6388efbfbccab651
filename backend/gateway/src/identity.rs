//! Caller identity resolution.
//!
//! The owner of an ingested event is whoever sent it. Deployments behind an
//! authenticating proxy trust a header it injects; otherwise the peer address
//! stands in for the caller.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap, HeaderName},
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("caller address unavailable")]
    UnknownPeer,

    #[error("header {0} is not valid UTF-8")]
    InvalidHeader(String),
}

/// What a resolver gets to look at.
pub struct Caller<'a> {
    pub peer: Option<SocketAddr>,
    pub headers: &'a HeaderMap,
}

/// Maps a request to the owner recorded on its events.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, caller: &Caller<'_>) -> Result<String, IdentityError>;
}

/// Uses the caller's IP address as its identity.
pub struct PeerAddressIdentity;

#[async_trait]
impl IdentityResolver for PeerAddressIdentity {
    async fn resolve(&self, caller: &Caller<'_>) -> Result<String, IdentityError> {
        caller
            .peer
            .map(|addr| addr.ip().to_string())
            .ok_or(IdentityError::UnknownPeer)
    }
}

/// Trusts a header set by a fronting proxy (e.g. `Tailscale-User-Login`),
/// falling back to the peer address when the header is missing or empty.
pub struct HeaderIdentity {
    header: HeaderName,
}

impl HeaderIdentity {
    pub fn new(header: HeaderName) -> Self {
        Self { header }
    }
}

#[async_trait]
impl IdentityResolver for HeaderIdentity {
    async fn resolve(&self, caller: &Caller<'_>) -> Result<String, IdentityError> {
        if let Some(value) = caller.headers.get(&self.header) {
            let value = value
                .to_str()
                .map_err(|_| IdentityError::InvalidHeader(self.header.to_string()))?
                .trim();
            if !value.is_empty() {
                return Ok(value.to_string());
            }
        }

        debug!(header = %self.header, "Identity header absent, using peer address");
        PeerAddressIdentity.resolve(caller).await
    }
}

/// Extractor yielding the resolved owner of the request.
pub struct Owner(pub String);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Owner {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let caller = Caller {
            peer: parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0),
            headers: &parts.headers,
        };

        match state.identity.resolve(&caller).await {
            Ok(owner) => Ok(Owner(owner)),
            Err(e) => {
                warn!(error = %e, "Could not resolve caller identity");
                Err(e.into())
            }
        }
    }
}
