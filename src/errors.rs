//! Failure conditions surfaced by the ledger and the encryption engine
use thiserror::Error;

/// Every precondition violation maps to its own variant; the caller never
/// receives a generic failure. No variant is retried internally.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteError {
    /// A privileged operation was invoked by someone other than the
    /// session administrator.
    #[error("caller is not the session administrator")]
    Unauthorized,

    /// A ballot was cast, or close was called, after voting already ended.
    #[error("voting has already ended")]
    VotingClosed,

    /// The caller has an accepted ballot on record.
    #[error("caller has already voted")]
    DuplicateVoter,

    /// An externally supplied ciphertext failed validation against its proof.
    #[error("ballot validity proof rejected")]
    InvalidProof,

    /// A ciphertext handle is unknown to the engine or lacks compute access.
    #[error("no compute access to ciphertext handle")]
    AccessDenied,

    /// The decryption oracle could not recover a plaintext.
    #[error("tally decryption failed")]
    DecryptionError,
}
