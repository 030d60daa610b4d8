//! Credential pair, redacted secrets, and the auth endpoints' wire payloads.

pub mod credentials;
pub mod secret;
pub mod wire;

pub use credentials::*;
pub use secret::*;
pub use wire::*;
