use crate::errors::ServiceError;
use axum::http::HeaderMap;
use uuid::Uuid;
use validator::Validate;

/// Header a client may use instead of a body field to make a post retry-safe.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::ValidationError(format!("Validation failed: {}", e)))
}

/// Reads the idempotency key header. A present but malformed key is an error
/// rather than silently ignored.
pub fn idempotency_key(headers: &HeaderMap) -> Result<Option<Uuid>, ServiceError> {
    let Some(raw) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };
    raw.to_str()
        .ok()
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .map(Some)
        .ok_or_else(|| {
            ServiceError::InvalidInput(format!("{} must be a UUID", IDEMPOTENCY_KEY_HEADER))
        })
}

/// Trims an optional actor name, falling back to `default` when blank.
pub fn actor_or_default(actor: Option<&str>, default: &str) -> String {
    actor
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(default)
        .to_string()
}
