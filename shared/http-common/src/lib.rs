//! Shared HTTP utilities for the course administration workspace.
//!
//! Provides common response builders and calendar-date helpers used by the
//! api-server.

use chrono::NaiveDate;

// ============================================================================
// JSON Response Helpers (framework-agnostic)
// ============================================================================

/// Create a structured error JSON with a default message based on the code.
///
/// Returns: `{"error": {"code": "<code>", "message": "<default message>"}}`
pub fn json_err(code: &str) -> serde_json::Value {
    let message = match code {
        "not_found" => "Resource not found",
        "bad_request" | "invalid_request" => "Bad request",
        "error" | "internal" => "Internal server error",
        _ => code, // Fallback to code as message for unknown codes
    };
    serde_json::json!({"error": {"code": code, "message": message}})
}

/// Create a structured error JSON with a custom message.
///
/// Returns: `{"error": {"code": "<code>", "message": "<message>"}}`
pub fn json_error_with_message(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({"error": {"code": code, "message": message}})
}

// ============================================================================
// Date Utilities
// ============================================================================

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format a calendar date as `YYYY-MM-DD` for the wire.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD` string into a calendar date.
///
/// Returns an error if the string does not match the wire format.
pub fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
}
