//! Client-side ballot construction.
//!
//! Sealing happens wherever the voter is, away from the ledger: the voter
//! encrypts a single unit under the session public key and attaches the proof
//! that the ciphertext is admissible. The ledger only ever sees the opaque
//! value and the proof.
use crate::{
    arithmetics::ClearResidue,
    keys::PublicKey,
    proofs::BallotProof,
    BigInt,
};
use crypto_bigint::modular::runtime_mod::DynResidue;
use serde::{Deserialize, Serialize};

/// The two admissible answers to the proposal. The choice routes the ballot
/// to one of the two encrypted counters; it is not part of the ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Choice {
    Yes,
    No,
}

/// A unit contribution encrypted under the session public key, together with
/// the non-interactive proof that it is admissible
#[derive(Debug, Clone)]
pub struct SealedBallot {
    ciphertext: BigInt,
    proof: BallotProof,
}

impl SealedBallot {
    /// Encrypt one unit and prove its validity. Each call draws a fresh
    /// witness, so two ballots from the same voter are unlinkable by value.
    pub fn seal(pk: &PublicKey) -> Self {
        let one = DynResidue::new(&BigInt::ONE, pk.ring_params());
        let clear = ClearResidue::random(Some(one), pk);
        let proof = BallotProof::from_statement(&clear);
        return Self {
            ciphertext: clear.get_val().retrieve(),
            proof,
        };
    }

    /// Reassemble a ballot received over the wire. No validation happens
    /// here; the ledger's engine rejects mismatched parts at submission.
    pub fn from_parts(ciphertext: BigInt, proof: BallotProof) -> Self {
        return Self { ciphertext, proof };
    }

    pub fn get_ciphertext(&self) -> &BigInt {
        return &self.ciphertext;
    }

    pub fn get_proof(&self) -> &BallotProof {
        return &self.proof;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{keys::KeyPair, MODULUS_BITS, RING_BITS};

    /// A freshly sealed ballot carries a proof for its own ciphertext
    #[test]
    fn test_sealed_ballot_is_self_consistent() {
        let keypair = KeyPair::keygen(RING_BITS, MODULUS_BITS, false);
        let pk = keypair.get_pk();
        let ballot = SealedBallot::seal(pk);
        assert_eq!(ballot.get_proof().get_statement(), ballot.get_ciphertext());
        assert!(ballot.get_proof().verify(pk));
    }
}
