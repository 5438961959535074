use crate::crypto::CryptoError;
use crate::encodings::EncodingError;
use crate::storage::StorageError;
use thiserror::Error;

/// Crate-wide error taxonomy. Lookup paths distinguish "the entry is not
/// there or you may not read it" from "the entry should be there but the
/// commit is inconsistent"; integrity failures always surface.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("label does not exist or read access was not granted")]
    NotFoundOrUnauthorized,
    #[error("claim entry is missing although read access exists")]
    ClaimMissing,
    #[error("VRF value does not verify against the claim label")]
    WrongVrfValue,
    #[error("block signature does not verify")]
    InvalidSignature,
    #[error("chain head does not carry a claim map")]
    NoClaimMap,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}
