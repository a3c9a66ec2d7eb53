//! # GPU Core
//!
//! Crate compartilhada que define o registro de telemetria de GPU, a
//! codificação JSON Lines e a configuração TOML do poller.
//!
//! ## Módulos
//! - [`types`] – Struct de registro por GPU ([`GpuRecord`])
//! - [`record`] – Encode/decode de um objeto JSON por linha
//! - [`config`] – Configuração unificada via TOML

pub mod types;
pub mod record;
pub mod config;

// Re-exports convenientes
pub use types::GpuRecord;
pub use record::{encode_record, decode_record, FORMAT_VERSION};
pub use config::{AppConfig, PollerConfig};
