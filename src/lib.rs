//! A confidential voting ledger for a single yes/no proposal.
//!
//! Ballots are encrypted under the Benaloh cryptosystem, which is additively
//! homomorphic: the product of two ciphertexts encrypts the sum of their
//! plaintexts. The ledger keeps one encrypted counter per choice and folds
//! each accepted ballot into it without ever seeing a running total. Only the
//! administrator can close the vote, and only the close transition decrypts
//! the counters and publishes the outcome.
use crypto_bigint::Uint;

/// Use the same big integer type everywhere
pub const LIMBS: usize = 512 / 64; // 8 words each 64 bits, a total of 512 bits
pub type BigInt = Uint<LIMBS>;

/// Default security parameters, sized for tests and demos. A real deployment
/// wants a much larger modulus; the ring only has to exceed the voter count.
pub const RING_BITS: usize = 16;
pub const MODULUS_BITS: usize = 64;

pub mod arithmetics;
pub mod ballot;
pub mod engine;
pub mod errors;
pub mod keys;
pub mod proofs;
pub mod session;

pub use ballot::{Choice, SealedBallot};
pub use engine::{BenalohEngine, CiphertextHandle, HomomorphicEngine};
pub use errors::VoteError;
pub use session::{Event, LifecycleState, RevealedTally, VoterId, VotingSession};
