// Error handling utilities for consistent error messages and exit codes

use std::process;

/// Exit with a user error (exit code 1)
/// User errors are for invalid input, missing resources, rejected requests, etc.
pub fn user_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Validate that a record ID is valid (positive integer)
pub fn validate_id(id_str: &str, kind: &str) -> Result<i64, String> {
    id_str.trim().parse::<i64>()
        .map_err(|_| format!("Invalid {} ID: '{}'. {} ID must be a number.", kind, id_str, capitalize(kind)))
        .and_then(|id| {
            if id > 0 {
                Ok(id)
            } else {
                Err(format!("Invalid {} ID: {}. {} ID must be positive.", kind, id, capitalize(kind)))
            }
        })
}

/// Split a `key=value` entry assignment. Keys are field ids ("3", "3.2")
/// or entry meta names; values may be empty.
pub fn parse_value_assignment(arg: &str) -> Result<(String, String), String> {
    let Some((key, value)) = arg.split_once('=') else {
        return Err(format!("Invalid value '{}'. Expected key=value.", arg));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("Invalid value '{}'. Key cannot be empty.", arg));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '.' || c == '_' || c == '-') {
        return Err(format!("Invalid key '{}'. Keys can only contain letters, numbers, dots, underscores, and hyphens.", key));
    }
    Ok((key.to_string(), value.to_string()))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
