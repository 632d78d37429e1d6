//! Client-visible status taxonomy.

use std::fmt;

/// Outcome of a client operation as reported to callers.
///
/// This is deliberately smaller than the transport's status space: every remote failure that is
/// neither a deadline expiry nor a not-found collapses into [`TransferCode::Cancelled`], and
/// [`TransferCode::Internal`] is only produced by local open failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferCode {
    Ok,
    DeadlineExceeded,
    NotFound,
    Cancelled,
    Internal,
}

impl TransferCode {
    pub fn as_str(self) -> &'static str {
        match self {
            TransferCode::Ok => "OK",
            TransferCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            TransferCode::NotFound => "NOT_FOUND",
            TransferCode::Cancelled => "CANCELLED",
            TransferCode::Internal => "INTERNAL",
        }
    }

    /// Process exit status for command line front ends.
    pub fn exit_code(self) -> u8 {
        match self {
            TransferCode::Ok => 0,
            TransferCode::Cancelled => 1,
            TransferCode::DeadlineExceeded => 2,
            TransferCode::NotFound => 3,
            TransferCode::Internal => 4,
        }
    }
}

impl fmt::Display for TransferCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_upper_snake_names() {
        assert_eq!(TransferCode::DeadlineExceeded.to_string(), "DEADLINE_EXCEEDED");
        assert_eq!(TransferCode::NotFound.to_string(), "NOT_FOUND");
    }

    #[test]
    fn test_exit_codes_are_distinct_and_ok_is_zero() {
        let codes = [
            TransferCode::Ok,
            TransferCode::DeadlineExceeded,
            TransferCode::NotFound,
            TransferCode::Cancelled,
            TransferCode::Internal,
        ];
        let mut seen: Vec<u8> = codes.iter().map(|c| c.exit_code()).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), codes.len());
        assert_eq!(TransferCode::Ok.exit_code(), 0);
    }
}
