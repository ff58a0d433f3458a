//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, attempts > 0)
//! - Check endpoint URL schemes and the contract address checksum
//! - Check the configured messages against the contract interface
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use serde_json::Value;

use crate::chain::types::AccountId;
use crate::config::schema::{ClientConfig, ContractConfig};
use crate::contract::ContractMetadata;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_ws_url(&mut errors, "node.endpoint", &config.node.endpoint);
    if config.node.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("node.connect_timeout_secs", "must be greater than 0"));
    }
    if config.node.request_timeout_secs == 0 {
        errors.push(ValidationError::new("node.request_timeout_secs", "must be greater than 0"));
    }
    if config.node.connect_attempts == 0 {
        errors.push(ValidationError::new("node.connect_attempts", "must be at least 1"));
    }
    if config.node.backoff_base_ms > config.node.backoff_max_ms {
        errors.push(ValidationError::new(
            "node.backoff_base_ms",
            "must not exceed node.backoff_max_ms",
        ));
    }

    if config.chain.ss58_prefix >= 16384 {
        errors.push(ValidationError::new("chain.ss58_prefix", "must be below 16384"));
    }

    if config.wallet.app_name.trim().is_empty() {
        errors.push(ValidationError::new("wallet.app_name", "must not be empty"));
    }
    for (i, ext) in config.wallet.extensions.iter().enumerate() {
        check_ws_url(&mut errors, &format!("wallet.extensions[{}].endpoint", i), &ext.endpoint);
    }
    if let Some(account) = &config.wallet.account {
        if let Err(e) = account.parse::<AccountId>() {
            errors.push(ValidationError::new("wallet.account", e.to_string()));
        }
    }

    if let Err(e) = config.contract.address.parse::<AccountId>() {
        errors.push(ValidationError::new("contract.address", e.to_string()));
    }
    if config.contract.query_message.is_empty() {
        errors.push(ValidationError::new("contract.query_message", "must not be empty"));
    }
    if config.contract.tx_message.is_empty() {
        errors.push(ValidationError::new("contract.tx_message", "must not be empty"));
    }
    // An external interface file is checked once it is loaded.
    if config.contract.metadata_path.is_none() {
        match ContractMetadata::embedded() {
            Ok(metadata) => {
                if let Err(found) = validate_messages(&config.contract, &metadata) {
                    errors.extend(found);
                }
            }
            Err(e) => errors.push(ValidationError::new("contract.metadata_path", e.to_string())),
        }
    }

    if config.flow.finalization_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "flow.finalization_timeout_secs",
            "must be greater than 0",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<std::net::SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check that the configured messages exist and get the right number of
/// arguments.
pub fn validate_messages(
    contract: &ContractConfig,
    metadata: &ContractMetadata,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_message(
        &mut errors,
        metadata,
        ("contract.query_message", contract.query_message.as_str()),
        ("contract.query_args", contract.query_args.as_slice()),
    );
    check_message(
        &mut errors,
        metadata,
        ("contract.tx_message", contract.tx_message.as_str()),
        ("contract.tx_args", contract.tx_args.as_slice()),
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_message(
    errors: &mut Vec<ValidationError>,
    metadata: &ContractMetadata,
    (message_field, label): (&str, &str),
    (args_field, args): (&str, &[Value]),
) {
    if label.is_empty() {
        return;
    }
    match metadata.message(label) {
        Ok(spec) if spec.args.len() != args.len() => errors.push(ValidationError::new(
            args_field,
            format!(
                "'{}' takes {} argument(s), {} configured",
                label,
                spec.args.len(),
                args.len()
            ),
        )),
        Ok(_) => {}
        Err(_) => errors.push(ValidationError::new(
            message_field,
            format!("'{}' is not a message of {}", label, metadata.name),
        )),
    }
}

fn check_ws_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    match url::Url::parse(value) {
        Ok(url) if url.scheme() == "ws" || url.scheme() == "wss" => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}', expected ws or wss", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL: {}", e))),
    }
}
