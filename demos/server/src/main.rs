//! Development server: in-memory store, built-in landmark photos, and an
//! authenticator that accepts any numeric token as a player id.
//!
//! Run with `RUST_LOG=debug` for per-connection logs:
//!
//! ```sh
//! cargo run -p pinpoint-demo-server -- 0.0.0.0:9000
//! ```

use std::sync::Arc;

use pinpoint::prelude::*;
use tracing_subscriber::EnvFilter;

/// Accepts any numeric token as a PlayerId. Development only.
struct TokenAuth;

impl Authenticator for TokenAuth {
    async fn verify(&self, token: &str) -> Result<PlayerId, SessionError> {
        let id: u64 = token
            .parse()
            .map_err(|_| SessionError::AuthFailed("token must be a number".into()))?;
        Ok(PlayerId(id))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "0.0.0.0:8080".to_string());

    let server = PinpointServerBuilder::new()
        .bind(&addr)
        .build(
            Arc::new(MemoryStore::new()),
            Arc::new(builtin_fallback()),
            TokenAuth,
        )
        .await?;

    tracing::info!(%addr, "pinpoint demo server listening");
    server.run().await?;
    Ok(())
}
