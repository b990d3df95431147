//! WebSocket connection management: handles, pool, credentials, gateway.

pub mod authenticator;
pub mod gateway;
pub mod handle;
pub mod pool;

pub use authenticator::{Claims, CredentialVerifier, JwtVerifier};
pub use gateway::{ConnectionGateway, InboundOutcome};
pub use handle::ConnectionHandle;
pub use pool::ConnectionPool;
