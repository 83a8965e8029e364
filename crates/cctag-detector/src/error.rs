use cctag_core::ImageError;

use crate::bank::BankError;

/// Errors returned by the marker detector.
#[derive(thiserror::Error, Debug)]
pub enum DetectorError {
    #[error("invalid detector parameter `{name}`: {reason}")]
    InvalidParams {
        name: &'static str,
        reason: &'static str,
    },
    #[error("bank has {bank} crowns but detector expects {params}")]
    BankMismatch { params: usize, bank: usize },
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    Image(#[from] ImageError),
}
