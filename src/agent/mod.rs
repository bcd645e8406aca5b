//! The streaming protocol adapter layer.
//!
//! A chat client talks to one [`ProviderAdapter`], chosen at start-up. Each
//! adapter authenticates against its vendor, opens the vendor stream and
//! re-encodes it into the canonical event protocol:
//!
//! ```text
//! route -> ProviderAdapter -> (CredentialCache) -> vendor HTTPS
//!                          -> StreamTranscoder -> canonical SSE -> route
//! ```

pub mod continuity;
pub mod credential;
mod enterprise;
mod errors;
mod rag;
pub mod telemetry;
mod traits;
pub mod transcoder;
pub mod types;

#[cfg(test)]
mod mock_vendor;

pub use enterprise::{token_source, EnterpriseAgentAdapter};
pub use errors::{AgentError, AgentResult};
pub use rag::{new_session_id, RagServiceAdapter};
pub use traits::ProviderAdapter;
pub use transcoder::{malformed_fragment_count, CanonicalByteStream};

use std::sync::Arc;
use std::time::Instant;

use crate::config::{EnterpriseConfig, ProviderKind, RagConfig};

/// Builds the adapter serving every route for the process lifetime.
pub fn build_adapter(
    provider: ProviderKind,
    client: reqwest::Client,
    enterprise: EnterpriseConfig,
    rag: RagConfig,
) -> Arc<dyn ProviderAdapter> {
    match provider {
        ProviderKind::Enterprise => {
            if !enterprise.is_configured() {
                log::warn!("{} not configured", enterprise.missing());
            }
            Arc::new(EnterpriseAgentAdapter::new(client, enterprise))
        }
        ProviderKind::Rag => {
            if !rag.is_configured() {
                log::warn!("{} not configured", rag.missing());
            }
            Arc::new(RagServiceAdapter::new(client, rag))
        }
    }
}

/// Milliseconds since `started`, with sub-millisecond precision.
pub(crate) fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
