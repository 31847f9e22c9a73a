//! The encryption engine boundary.
//!
//! The ledger never touches ciphertext bytes directly; it holds opaque
//! handles and asks the engine to mint, combine, and reveal them. Handles are
//! entries in an arena registry. A freshly minted handle is transient: it can
//! be contributed to one homomorphic addition, but it cannot serve as the
//! accumulating operand or be decrypted until the owner explicitly grants it
//! compute access. The ledger therefore re-grants its counters after every
//! mutation.
use crate::{
    arithmetics::ClearResidue,
    errors::VoteError,
    keys::{KeyPair, PublicKey},
    proofs::BallotProof,
    BigInt,
};
use crypto_bigint::modular::runtime_mod::DynResidue;
use std::collections::HashSet;

/// An opaque token naming a ciphertext owned by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CiphertextHandle(u64);

/// The operations the ledger consumes from its encryption collaborator
pub trait HomomorphicEngine {
    /// The public key voters seal their ballots under
    fn public_key(&self) -> &PublicKey;

    /// An encrypted representation of 0, used to initialize the counters
    fn encrypt_zero(&mut self) -> Result<CiphertextHandle, VoteError>;

    /// An encrypted representation of a known plaintext constant, used for
    /// the implicit one-unit ballot
    fn encrypt_constant(&mut self, value: u64) -> Result<CiphertextHandle, VoteError>;

    /// Verify the proof accompanying an externally supplied ciphertext and
    /// return a handle usable as a contribution in homomorphic addition
    fn validate_and_import(
        &mut self,
        ciphertext: &BigInt,
        proof: &BallotProof,
    ) -> Result<CiphertextHandle, VoteError>;

    /// A new handle representing the encrypted sum. The accumulator operand
    /// must have been granted compute access; the contribution may be any
    /// live handle. Neither operand is revealed or mutated.
    fn homomorphic_add(
        &mut self,
        accumulator: CiphertextHandle,
        contribution: CiphertextHandle,
    ) -> Result<CiphertextHandle, VoteError>;

    /// Authorize continued homomorphic operations on a handle. Required after
    /// each mutation for the result to stay usable as an accumulator.
    fn grant_compute_access(&mut self, handle: CiphertextHandle);

    /// Privileged oracle call revealing the plaintext behind a granted handle
    fn decrypt(&self, handle: CiphertextHandle) -> Result<u64, VoteError>;
}

/// The default engine: Benaloh ciphertexts in an in-memory arena, with the
/// decryption oracle co-located (single trusted tallier)
pub struct BenalohEngine {
    keypair: KeyPair,
    slots: Vec<BigInt>,
    granted: HashSet<u64>,
}

impl BenalohEngine {
    pub fn new(keypair: KeyPair) -> Self {
        Self {
            keypair,
            slots: Vec::new(),
            granted: HashSet::new(),
        }
    }

    /// Generate a fresh keypair of the given sizes and wrap it in an engine
    pub fn generate(ring_bits: usize, modulus_bits: usize) -> Self {
        Self::new(KeyPair::keygen(ring_bits, modulus_bits, false))
    }

    fn mint(&mut self, val: BigInt) -> CiphertextHandle {
        let handle = CiphertextHandle(self.slots.len() as u64);
        self.slots.push(val);
        handle
    }

    fn fetch(&self, handle: CiphertextHandle) -> Result<&BigInt, VoteError> {
        self.slots
            .get(handle.0 as usize)
            .ok_or(VoteError::AccessDenied)
    }

    fn fetch_granted(&self, handle: CiphertextHandle) -> Result<&BigInt, VoteError> {
        if !self.granted.contains(&handle.0) {
            return Err(VoteError::AccessDenied);
        }
        self.fetch(handle)
    }
}

impl HomomorphicEngine for BenalohEngine {
    fn public_key(&self) -> &PublicKey {
        self.keypair.get_pk()
    }

    fn encrypt_zero(&mut self) -> Result<CiphertextHandle, VoteError> {
        self.encrypt_constant(0)
    }

    fn encrypt_constant(&mut self, value: u64) -> Result<CiphertextHandle, VoteError> {
        let pk = *self.keypair.get_pk();
        let class = DynResidue::new(&BigInt::from_u64(value), pk.ring_params());
        let clear = ClearResidue::random(Some(class), &pk);
        Ok(self.mint(clear.get_val().retrieve()))
    }

    fn validate_and_import(
        &mut self,
        ciphertext: &BigInt,
        proof: &BallotProof,
    ) -> Result<CiphertextHandle, VoteError> {
        if proof.get_statement() != ciphertext {
            return Err(VoteError::InvalidProof);
        }
        if !proof.verify(self.keypair.get_pk()) {
            return Err(VoteError::InvalidProof);
        }
        Ok(self.mint(*ciphertext))
    }

    fn homomorphic_add(
        &mut self,
        accumulator: CiphertextHandle,
        contribution: CiphertextHandle,
    ) -> Result<CiphertextHandle, VoteError> {
        let params = self.keypair.get_pk().modulus_params();
        let acc = DynResidue::new(self.fetch_granted(accumulator)?, params);
        let contrib = DynResidue::new(self.fetch(contribution)?, params);
        // ciphertext multiplication adds the underlying residue classes
        let sum = acc.mul(&contrib).retrieve();
        Ok(self.mint(sum))
    }

    fn grant_compute_access(&mut self, handle: CiphertextHandle) {
        self.granted.insert(handle.0);
    }

    fn decrypt(&self, handle: CiphertextHandle) -> Result<u64, VoteError> {
        let params = self.keypair.get_pk().modulus_params();
        let val = DynResidue::new(self.fetch_granted(handle)?, params);
        let clear =
            ClearResidue::decompose(val, &self.keypair).ok_or(VoteError::DecryptionError)?;
        // the residue class is bounded by r, which fits comfortably in one word
        Ok(clear.get_rc().retrieve().as_words()[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ballot::SealedBallot, MODULUS_BITS, RING_BITS};

    fn engine() -> BenalohEngine {
        BenalohEngine::generate(RING_BITS, MODULUS_BITS)
    }

    #[test]
    fn test_accumulate_and_decrypt() {
        let mut engine = engine();
        let mut acc = engine.encrypt_zero().unwrap();
        engine.grant_compute_access(acc);

        for _ in 0..3 {
            let unit = engine.encrypt_constant(1).unwrap();
            acc = engine.homomorphic_add(acc, unit).unwrap();
            engine.grant_compute_access(acc);
        }
        assert_eq!(engine.decrypt(acc).unwrap(), 3);
    }

    #[test]
    fn test_add_requires_granted_accumulator() {
        let mut engine = engine();
        let acc = engine.encrypt_zero().unwrap();
        let unit = engine.encrypt_constant(1).unwrap();
        // no grant on the accumulator
        assert_eq!(
            engine.homomorphic_add(acc, unit),
            Err(VoteError::AccessDenied)
        );
    }

    #[test]
    fn test_decrypt_requires_grant() {
        let mut engine = engine();
        let handle = engine.encrypt_constant(2).unwrap();
        assert_eq!(engine.decrypt(handle), Err(VoteError::AccessDenied));
        engine.grant_compute_access(handle);
        assert_eq!(engine.decrypt(handle).unwrap(), 2);
    }

    #[test]
    fn test_unknown_handle_is_rejected() {
        let mut engine = engine();
        let bogus = CiphertextHandle(42);
        engine.grant_compute_access(bogus);
        assert_eq!(engine.decrypt(bogus), Err(VoteError::AccessDenied));
    }

    #[test]
    fn test_import_accepts_sealed_ballot() {
        let mut engine = engine();
        let ballot = SealedBallot::seal(engine.public_key());
        let handle = engine
            .validate_and_import(ballot.get_ciphertext(), ballot.get_proof())
            .unwrap();

        let mut acc = engine.encrypt_zero().unwrap();
        engine.grant_compute_access(acc);
        acc = engine.homomorphic_add(acc, handle).unwrap();
        engine.grant_compute_access(acc);
        assert_eq!(engine.decrypt(acc).unwrap(), 1);
    }

    #[test]
    fn test_import_rejects_mismatched_ciphertext() {
        let mut engine = engine();
        let ballot = SealedBallot::seal(engine.public_key());
        let other = SealedBallot::seal(engine.public_key());
        assert_eq!(
            engine.validate_and_import(other.get_ciphertext(), ballot.get_proof()),
            Err(VoteError::InvalidProof)
        );
    }
}
