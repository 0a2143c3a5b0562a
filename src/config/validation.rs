//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::{Config, DeliveryMode};
use thiserror::Error;
use zbus::names::WellKnownName;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("identity.user is required")]
    MissingUser,
    #[error("identity.password is required (or set TMI_RELAY_PASSWORD)")]
    MissingPassword,
    #[error("identity.channel is required")]
    MissingChannel,
    #[error("identity.channel must not contain whitespace, got '{0}'")]
    InvalidChannel(String),
    #[error("server.host is required")]
    MissingHost,
    #[error("server.port must be non-zero")]
    InvalidPort,
    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
    #[error("handshake.welcome_codes must list at least one numeric")]
    NoWelcomeCodes,
    #[error("delivery.{0} is required in pipe mode")]
    MissingPipePath(&'static str),
    #[error("delivery.bus_name '{0}' is not a valid well-known bus name")]
    InvalidBusName(String),
    #[error("responders[{0}].trigger is empty")]
    EmptyTrigger(usize),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Identity
    if config.identity.user.is_empty() {
        errors.push(ValidationError::MissingUser);
    }
    if config.identity.password.is_empty() {
        errors.push(ValidationError::MissingPassword);
    }
    let channel = config.identity.channel.trim_start_matches('#');
    if channel.is_empty() {
        errors.push(ValidationError::MissingChannel);
    } else if channel.chars().any(char::is_whitespace) {
        errors.push(ValidationError::InvalidChannel(
            config.identity.channel.clone(),
        ));
    }

    // Server
    if config.server.host.is_empty() {
        errors.push(ValidationError::MissingHost);
    }
    if config.server.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }

    // Timings
    let durations = [
        ("handshake.timeout_secs", config.handshake.timeout_secs),
        (
            "handshake.receive_timeout_secs",
            config.handshake.receive_timeout_secs,
        ),
        ("event_loop.tick_secs", config.event_loop.tick_secs),
        ("reconnect.initial_delay_ms", config.reconnect.initial_delay_ms),
        ("reconnect.max_delay_secs", config.reconnect.max_delay_secs),
        ("reconnect.stable_secs", config.reconnect.stable_secs),
    ];
    for (name, value) in durations {
        if value == 0 {
            errors.push(ValidationError::ZeroValue(name));
        }
    }
    if config.reconnect.max_attempts == 0 {
        errors.push(ValidationError::ZeroValue("reconnect.max_attempts"));
    }
    if config.handshake.welcome_codes.is_empty() {
        errors.push(ValidationError::NoWelcomeCodes);
    }

    // Delivery
    match config.delivery.mode {
        DeliveryMode::Pipe => {
            if config.delivery.input_pipe.is_none() {
                errors.push(ValidationError::MissingPipePath("input_pipe"));
            }
            if config.delivery.output_pipe.is_none() {
                errors.push(ValidationError::MissingPipePath("output_pipe"));
            }
        }
        DeliveryMode::Bus => {
            if WellKnownName::try_from(config.delivery.bus_name.as_str()).is_err() {
                errors.push(ValidationError::InvalidBusName(
                    config.delivery.bus_name.clone(),
                ));
            }
        }
        DeliveryMode::Stdio => {}
    }

    // Responders
    for (index, responder) in config.responders.iter().enumerate() {
        if responder.trigger.is_empty() {
            errors.push(ValidationError::EmptyTrigger(index));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
