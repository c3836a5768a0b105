//! Production wiring for tutorhub: configuration, the CAS identity verifier,
//! and the webhook notifier used by the `server` binary.

pub mod cas;
pub mod settings;
pub mod webhook;

pub use settings::ServerConfig;
