//! Translation between transport statuses and the [`TransferCode`] taxonomy.
//!
//! Two directions live here:
//! - server side, [`cancellation_status`] is the only place that decides how a cooperatively
//!   detected cancellation is reported on the wire;
//! - client side, [`classify`] maps a remote terminal status to the code a given operation is
//!   allowed to report.

use crate::TransferCode;
use tonic::{Code, Status};

/// The five operations of the file service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Store,
    Fetch,
    Delete,
    List,
    Stat,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Store => "store",
            Operation::Fetch => "fetch",
            Operation::Delete => "delete",
            Operation::List => "list",
            Operation::Stat => "stat",
        }
    }

    /// Whether a remote not-found is surfaced as [`TransferCode::NotFound`].
    ///
    /// Store never asks the server for an existing file and an empty directory is a valid
    /// listing, so neither reports it.
    pub fn reports_not_found(self) -> bool {
        matches!(self, Operation::Fetch | Operation::Delete | Operation::Stat)
    }
}

/// Status sent when the server notices that the caller has gone away or its deadline passed.
///
/// Cancellation is reported as a deadline expiry. Keeping the decision in one function lets a
/// later protocol revision give cancellation its own code.
pub fn cancellation_status(detail: impl Into<String>) -> Status {
    Status::deadline_exceeded(detail)
}

/// Map a remote terminal status to the client taxonomy for `op`.
pub fn classify(op: Operation, status: &Status) -> TransferCode {
    match status.code() {
        Code::Ok => TransferCode::Ok,
        Code::DeadlineExceeded => TransferCode::DeadlineExceeded,
        Code::NotFound if op.reports_not_found() => TransferCode::NotFound,
        _ => TransferCode::Cancelled,
    }
}
