//! Per-call cancellation state.
//!
//! The transport enforces deadlines on its own, but a handler that is busy streaming only learns
//! about it when it next touches the stream. [`CallContext`] lets the handler check cooperatively
//! between chunks whether the caller's deadline, as sent in the `grpc-timeout` header, has passed.

use std::time::{Duration, Instant};
use tonic::metadata::MetadataMap;

/// Header carrying the caller's remaining time budget.
pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// Deadline information captured when a call arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallContext {
    deadline: Option<Instant>,
}

impl CallContext {
    /// Reads the deadline from request metadata. Calls without a valid `grpc-timeout` header
    /// never report cancellation through the context.
    pub fn from_metadata(metadata: &MetadataMap) -> Self {
        let deadline = metadata
            .get(GRPC_TIMEOUT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_grpc_timeout)
            .and_then(|timeout| Instant::now().checked_add(timeout));
        Self { deadline }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Parses a `grpc-timeout` value: up to eight ASCII digits followed by one unit character
/// (`H`, `M`, `S`, `m`, `u` or `n`).
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if value.len() < 2 || value.len() > 9 || !value.is_ascii() {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    let timeout = match unit {
        "H" => Duration::from_secs(amount * 60 * 60),
        "M" => Duration::from_secs(amount * 60),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    };
    Some(timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grpc_timeout_units() {
        assert_eq!(parse_grpc_timeout("2H"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_grpc_timeout("3M"), Some(Duration::from_secs(180)));
        assert_eq!(parse_grpc_timeout("10S"), Some(Duration::from_secs(10)));
        assert_eq!(parse_grpc_timeout("250m"), Some(Duration::from_millis(250)));
        assert_eq!(parse_grpc_timeout("7u"), Some(Duration::from_micros(7)));
        assert_eq!(parse_grpc_timeout("99999999n"), Some(Duration::from_nanos(99_999_999)));
    }

    #[test]
    fn test_parse_grpc_timeout_rejects_malformed_values() {
        for value in ["", "S", "10", "10s", "123456789S", "-1S", "1.5S", "十S"] {
            assert_eq!(parse_grpc_timeout(value), None, "{value:?}");
        }
    }

    #[test]
    fn test_context_without_header_is_never_cancelled() {
        let ctx = CallContext::from_metadata(&MetadataMap::new());
        assert_eq!(ctx.deadline(), None);
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_context_reads_header() {
        let mut metadata = MetadataMap::new();
        metadata.insert(GRPC_TIMEOUT_HEADER, "60S".parse().unwrap());

        let ctx = CallContext::from_metadata(&metadata);

        assert!(ctx.deadline().is_some());
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_context_past_deadline_is_cancelled() {
        let ctx = CallContext::with_deadline(Instant::now());
        assert!(ctx.is_cancelled());
    }
}
