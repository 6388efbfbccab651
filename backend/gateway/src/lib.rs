//! heartlog HTTP gateway
//!
//! Ingestion triggers, dashboards, the live event feed and health reporting.

pub mod dashboard;
pub mod error;
pub mod health_api;
pub mod identity;
pub mod ingest;
pub mod live_feed;
pub mod render;
pub mod server;

pub use error::ApiError;
pub use identity::{HeaderIdentity, IdentityResolver, PeerAddressIdentity};
pub use server::{build_router, serve, AppState, GatewayConfig};
