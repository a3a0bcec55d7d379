//! Config validation
//!
//! Rules:
//! - field ranges declared on the config types (retries/interval >= 0, max_passes >= 1, non-empty lists)
//! - group names unique
//! - source entries non-empty
//! - every effective retry policy convertible to `DispatchOptions`

use std::collections::HashSet;

use ::validator::{Validate, ValidationErrors};
use contracts::{DispatchConfig, DispatchError};

/// Validate a parsed config
///
/// Returns the first error encountered.
pub fn validate(config: &DispatchConfig) -> Result<(), DispatchError> {
    validate_fields(config)?;
    validate_group_names(config)?;
    validate_sources(config)?;
    validate_options(config)?;
    Ok(())
}

/// Non-fatal observations about a valid config
pub fn warnings(config: &DispatchConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    for group in &config.groups {
        let distinct: HashSet<_> = group.sources.iter().collect();
        if distinct.len() < group.sources.len() {
            warnings.push(format!(
                "Group '{}' lists a source more than once",
                group.name
            ));
        }

        let options = group.options.unwrap_or(config.options);
        if options.fail_retries > 0 && options.fail_retry_interval_ms == 0 {
            warnings.push(format!(
                "Group '{}' retries without delay (fail_retry_interval_ms = 0)",
                group.name
            ));
        }
        if group.continuous && group.max_passes.is_none() {
            warnings.push(format!(
                "Group '{}' is continuous without max_passes - a healthy source is polled until the process stops",
                group.name
            ));
        }
    }

    warnings
}

fn validate_fields(config: &DispatchConfig) -> Result<(), DispatchError> {
    config
        .validate()
        .map_err(|e| to_contract_error("", &e))?;
    for (idx, group) in config.groups.iter().enumerate() {
        group
            .validate()
            .map_err(|e| to_contract_error(&format!("groups[{idx}]"), &e))?;
    }
    Ok(())
}

/// Group names must be unique
fn validate_group_names(config: &DispatchConfig) -> Result<(), DispatchError> {
    let mut seen = HashSet::new();
    for group in &config.groups {
        if !seen.insert(group.name.as_str()) {
            return Err(DispatchError::config_validation(
                format!("groups[name={}]", group.name),
                "duplicate group name",
            ));
        }
    }
    Ok(())
}

fn validate_sources(config: &DispatchConfig) -> Result<(), DispatchError> {
    for group in &config.groups {
        for (idx, source) in group.sources.iter().enumerate() {
            if source.trim().is_empty() {
                return Err(DispatchError::config_validation(
                    format!("groups[{}].sources[{}]", group.name, idx),
                    "source cannot be empty",
                ));
            }
        }
    }
    Ok(())
}

fn validate_options(config: &DispatchConfig) -> Result<(), DispatchError> {
    for group in &config.groups {
        config.options_for(group).map_err(|e| match e {
            DispatchError::InvalidOptions { field, message } => DispatchError::config_validation(
                format!("groups[{}].options.{}", group.name, field),
                message,
            ),
            other => other,
        })?;
    }
    Ok(())
}

/// Flatten derive errors into the first `field: message` pair, nested paths joined with '.'
fn to_contract_error(prefix: &str, errors: &ValidationErrors) -> DispatchError {
    let (field, message) = first_error(errors).unwrap_or_else(|| (String::new(), errors.to_string()));
    let field = match (prefix.is_empty(), field.is_empty()) {
        (true, _) => field,
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}.{field}"),
    };
    DispatchError::config_validation(field, message)
}

fn first_error(errors: &ValidationErrors) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    if let Some((field, errs)) = fields.into_iter().next() {
        let message = errs
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect::<Vec<_>>()
            .join(", ");
        return Some((field.to_string(), message));
    }

    // nested struct (e.g. `options`)
    let mut nested: Vec<_> = errors.errors().iter().collect();
    nested.sort_by(|a, b| a.0.cmp(b.0));
    for (field, kind) in nested {
        if let ::validator::ValidationErrorsKind::Struct(inner) = kind {
            if let Some((inner_field, message)) = first_error(inner) {
                return Some((format!("{field}.{inner_field}"), message));
            }
        }
    }
    None
}
