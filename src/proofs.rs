//! Non-interactive proof that a ballot encrypts 0 or 1.
//!
//! The statement is a single higher residue. The prover convinces the
//! verifier that the statement belongs to one of the admissible residue
//! classes without revealing which one.
//!
//! The commitment is a list of "capsules". Each capsule contains one element
//! from every admissible residue class, in shuffled order, so which element
//! belongs to which class is obscured. The challenge selects a subset of the
//! capsules: a selected capsule is opened (both decompositions revealed), an
//! unselected capsule is consumed (the prover exhibits the r-th residue
//! quotient between the statement and the capsule element of matching class,
//! demonstrating the class without naming it).
//!
//! The challenge bits are derived from a SHA3-256 digest of the statement and
//! the commitment, which makes the protocol non-interactive.
use crate::{
    arithmetics::ClearResidue,
    keys::PublicKey,
    BigInt,
};
use crypto_bigint::{modular::runtime_mod::DynResidue, rand_core::OsRng, Encoding};
use digest::Digest;
use rand::seq::SliceRandom;
use sha3::Sha3_256;

/// The choice of SHA3-256 for challenge derivation fixes the number of
/// rounds, and therefore the soundness error, at 2^-256
pub const CONFIDENCE: usize = 256;

/// One capsule of the commitment: the opaque values of one element per
/// admissible class, shuffled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capsule {
    elements: [BigInt; 2],
}

impl Capsule {
    pub fn get_elements(&self) -> &[BigInt; 2] {
        return &self.elements;
    }
}

/// Per-round response, depending on the challenge bit: either open the
/// capsule and reveal which element belongs to which residue class, or
/// consume the capsule and show the decomposition of (element / statement)
#[derive(Debug, Clone)]
enum Response {
    /// (residue class, witness) of each element, in capsule order
    Open([(BigInt, BigInt); 2]),

    /// The witness of the r-th residue quotient element * statement^(-1)
    Consume(BigInt),
}

/// Proof that the ballot belongs to RC[0] or RC[1] without revealing which.
/// There is nothing special about 0 and 1 mathematically; they are simply the
/// two admissible ballot values of a yes/no election.
#[derive(Debug, Clone)]
pub struct BallotProof {
    statement: BigInt,
    commitment: Vec<Capsule>,
    responses: Vec<Response>,
}

impl BallotProof {
    /// The ciphertext this proof speaks about
    pub fn get_statement(&self) -> &BigInt {
        return &self.statement;
    }

    /// Produce a proof that the statement is in RC[0] or RC[1]. The caller
    /// must supply the clear decomposition of the ballot; the class of the
    /// ballot must itself be 0 or 1 or the proof cannot be constructed.
    pub fn from_statement(ballot: &ClearResidue) -> Self {
        let pk = ballot.get_ambience();
        let answers = (0..CONFIDENCE)
            .map(|_| generate_clear_capsule(pk))
            .collect::<Vec<[ClearResidue; 2]>>();
        let commitment = answers
            .iter()
            .map(|clear| Capsule {
                elements: [
                    clear[0].get_val().retrieve(),
                    clear[1].get_val().retrieve(),
                ],
            })
            .collect::<Vec<Capsule>>();

        let statement = ballot.get_val().retrieve();
        let challenge = derive_challenge(&statement, &commitment);

        let responses = answers
            .iter()
            .zip(challenge.iter())
            .map(|(clear, open)| {
                if *open {
                    Response::Open([
                        (clear[0].get_rc().retrieve(), clear[0].get_witness().retrieve()),
                        (clear[1].get_rc().retrieve(), clear[1].get_witness().retrieve()),
                    ])
                } else {
                    Response::Consume(consume_capsule(clear, ballot))
                }
            })
            .collect::<Vec<Response>>();

        return Self {
            statement,
            commitment,
            responses,
        };
    }

    /// Verify the proof. The challenge is re-derived from the commitment, so
    /// a proof whose responses were not forced by its own commitment fails.
    pub fn verify(&self, pk: &PublicKey) -> bool {
        if self.commitment.len() != CONFIDENCE || self.responses.len() != CONFIDENCE {
            return false;
        }
        let challenge = derive_challenge(&self.statement, &self.commitment);
        return self
            .commitment
            .iter()
            .zip(self.responses.iter())
            .zip(challenge.iter())
            .all(|((capsule, response), open)| {
                verify_response(&self.statement, capsule, response, *open, pk)
            });
    }
}

/// One random element from each of RC[0] and RC[1], in shuffled order
fn generate_clear_capsule(pk: &PublicKey) -> [ClearResidue; 2] {
    let zero = DynResidue::new(&BigInt::ZERO, pk.ring_params());
    let one = DynResidue::new(&BigInt::ONE, pk.ring_params());
    let mut elements = [
        ClearResidue::random(Some(zero), pk),
        ClearResidue::random(Some(one), pk),
    ];
    elements.shuffle(&mut OsRng);
    return elements;
}

/// If two elements w, w' have the same residue class, then w' * w^(-1) is an
/// r-th residue. Return the witness of that quotient for the capsule element
/// matching the ballot's class.
fn consume_capsule(capsule: &[ClearResidue; 2], ballot: &ClearResidue) -> BigInt {
    for element in capsule.iter() {
        if element.get_rc() == ballot.get_rc() {
            let (ballot_witness_inv, invertible) = ballot.get_witness().invert();
            let invertible: bool = invertible.into();
            if !invertible {
                panic!("ballot witness is not invertible");
            }
            return element.get_witness().mul(&ballot_witness_inv).retrieve();
        }
    }
    panic!("capsule does not have an element matching the ballot class");
}

/// Derive the challenge bits by hashing the statement and every commitment
/// element with SHA3-256
fn derive_challenge(statement: &BigInt, commitment: &[Capsule]) -> Vec<bool> {
    let mut hasher = Sha3_256::new();
    hasher.update(statement.to_be_bytes());
    for capsule in commitment {
        for element in capsule.get_elements() {
            hasher.update(element.to_be_bytes());
        }
    }
    let hash = hasher.finalize();

    let mut challenge = Vec::with_capacity(CONFIDENCE);
    for byte in hash {
        for j in (0..u8::BITS).rev() {
            challenge.push((byte >> j) & 1 == 1);
        }
    }
    return challenge;
}

/// Check a single round of the proof.
///
/// For an opened capsule, recompose every revealed (class, witness) pair and
/// check it matches the committed value, and check that the revealed classes
/// are exactly {0, 1}. For a consumed capsule, rebuild the r-th residue from
/// the quotient witness and check that statement * quotient reproduces one of
/// the committed elements.
fn verify_response(
    statement: &BigInt,
    capsule: &Capsule,
    response: &Response,
    open: bool,
    pk: &PublicKey,
) -> bool {
    match response {
        Response::Open(decompositions) => {
            if !open {
                return false;
            }
            let classes_valid = {
                let (c0, c1) = (&decompositions[0].0, &decompositions[1].0);
                (*c0 == BigInt::ZERO && *c1 == BigInt::ONE)
                    || (*c0 == BigInt::ONE && *c1 == BigInt::ZERO)
            };
            if !classes_valid {
                return false;
            }
            return capsule
                .get_elements()
                .iter()
                .zip(decompositions.iter())
                .all(|(committed, (rc, witness))| {
                    let rc = DynResidue::new(rc, pk.ring_params());
                    let witness = DynResidue::new(witness, pk.modulus_params());
                    ClearResidue::compose(rc, witness, pk).get_val().retrieve() == *committed
                });
        }
        Response::Consume(quotient_witness) => {
            if open {
                return false;
            }
            let witness = DynResidue::new(quotient_witness, pk.modulus_params());
            let quotient = witness.pow(pk.get_r());
            let reconstructed = DynResidue::new(statement, pk.modulus_params())
                .mul(&quotient)
                .retrieve();
            return capsule
                .get_elements()
                .iter()
                .any(|element| *element == reconstructed);
        }
    }
}
