//! Stdout rendering shared by the commands.

use ragline_core::{AppError, AppResult};
use serde::Serialize;

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// JSON body for a failed command.
pub fn error_json(err: &AppError) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "kind": err.kind(),
            "message": err.to_string(),
            "retryable": err.is_retryable(),
        }
    })
}

/// Print the JSON error body on stdout.
pub fn print_error(err: &AppError) {
    println!("{}", error_json(err));
}
