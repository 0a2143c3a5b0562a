//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions, defaults and loading
//! - [`validation`]: Startup checks that report every problem at once

mod types;
mod validation;

pub use types::{
    Config, ConfigError, DeliveryConfig, DeliveryMode, EventLoopConfig, HandshakeSettings,
    IdentityConfig, OutputFormat, PASSWORD_ENV, ReconnectConfig, ResponderConfig, ServerConfig,
};
pub use validation::{ValidationError, validate};
