//! Higher residue arithmetic.
//!
//! A ciphertext is an invertible element w = (y^c)(x^r) (mod n). The residue
//! class c is the plaintext, unique up to (mod r); x is the witness. The
//! product of two ciphertexts lands in the residue class of the sum of their
//! classes, which is what makes the accumulating tally possible.
use crate::{
    keys::{KeyPair, PublicKey},
    BigInt, LIMBS,
};
use crypto_bigint::{
    modular::runtime_mod::{DynResidue, DynResidueParams},
    rand_core::OsRng,
    CheckedAdd, NonZero, RandomMod,
};

/// A clear residue contains the value and its decomposition into the residue
/// class and witness
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct ClearResidue {
    /// The value itself, as an invertible number (mod n)
    val: DynResidue<LIMBS>,

    /// The residue class that this value belongs to, unique up to (mod r)
    rc: DynResidue<LIMBS>,

    /// The r-th root of val * (y ** -rc); the "x" in w = (y ** c) * (x ** r)
    witness: DynResidue<LIMBS>,

    /// A copy of the ambient primes (r, n, y)
    ambience: PublicKey,
}

impl ClearResidue {
    pub fn new(
        val: DynResidue<LIMBS>,
        rc: DynResidue<LIMBS>,
        witness: DynResidue<LIMBS>,
        ambience: &PublicKey,
    ) -> Self {
        return Self {
            val,
            rc,
            witness,
            ambience: *ambience,
        };
    }

    /// Construct a higher residue from its decomposition
    pub fn compose(
        rc: DynResidue<LIMBS>,
        witness: DynResidue<LIMBS>,
        ambience: &PublicKey,
    ) -> Self {
        let z = witness.pow(ambience.get_r()); // z is (x ** r)
        let y = DynResidue::new(ambience.get_y(), ambience.modulus_params());
        let val = y.pow(&rc.retrieve()).mul(&z);
        return Self::new(val, rc, witness, ambience);
    }

    /// Decompose an opaque value into its residual representation (c, x).
    /// Such decomposition is equivalent to decrypting a ciphertext, hence the
    /// requirement for a complete keypair instead of just the public key.
    ///
    /// Raising an r-th residue to the power of (phi/r) gives 1 (mod n) by
    /// Euler's theorem, so val^(phi/r) = (y^(phi/r))^c, and a brute-force
    /// discrete log over the small ring recovers c. Once the class is known
    /// the witness is the r-th root of val * y^(-c). Returns None if the
    /// value is not a well-formed ciphertext under this keypair.
    pub fn decompose(val: DynResidue<LIMBS>, keypair: &KeyPair) -> Option<Self> {
        let pk = keypair.get_pk();
        let phi_over_r = keypair
            .get_sk()
            .get_phi()
            .checked_div(pk.get_r())
            .unwrap();
        let y_to_phi_over_r = DynResidue::new(pk.get_y(), pk.modulus_params())
            .pow(&phi_over_r)
            .retrieve();
        let val_to_phi_over_r = val.pow(&phi_over_r).retrieve();
        let rc = discrete_log(&y_to_phi_over_r, &val_to_phi_over_r, pk.get_r(), pk.get_n())?;
        let rc = DynResidue::new(&rc, pk.ring_params());

        let y_inv = DynResidue::new(&pk.invert_y(), pk.modulus_params());
        let witness = val.mul(&y_inv.pow(&rc.retrieve()));
        let witness = rth_root(witness, pk.get_r(), keypair.get_sk().get_phi())?;

        return Some(Self::new(val, rc, witness, pk));
    }

    /// Generate a random member of Z_n in the given residue class, including
    /// its decomposition. A random class is drawn when none is given.
    pub fn random(class: Option<DynResidue<LIMBS>>, ambience: &PublicKey) -> Self {
        let c = match class {
            Some(class) => class,
            None => {
                let c = BigInt::random_mod(&mut OsRng, &NonZero::new(*ambience.get_r()).unwrap());
                DynResidue::new(&c, ambience.ring_params())
            }
        };
        let x = DynResidue::new(&ambience.sample_invertible(), ambience.modulus_params());
        return Self::compose(c, x, ambience);
    }

    /// Return a reference to the element itself
    pub fn get_val(&self) -> &DynResidue<LIMBS> {
        return &self.val;
    }

    /// Return a reference to the residue class
    pub fn get_rc(&self) -> &DynResidue<LIMBS> {
        return &self.rc;
    }

    /// Return a reference to the witness
    pub fn get_witness(&self) -> &DynResidue<LIMBS> {
        return &self.witness;
    }

    /// Return a reference to the ambience public key
    pub fn get_ambience(&self) -> &PublicKey {
        return &self.ambience;
    }
}

/// Find the r-th root of z under (mod n). If the root exists, return a root,
/// else return None. The root is found using the relation:
///
/// Ar + B(phi/r) = 1
///
/// Note that this relationship only holds if the public key is perfectly
/// consonant. This doubles as the check that z is an r-th residue at all.
pub fn rth_root(z: DynResidue<LIMBS>, r: &BigInt, phi: &BigInt) -> Option<DynResidue<LIMBS>> {
    let phi_over_r = phi.checked_div(r).unwrap();
    let (root_exp, r_invertible) = r.inv_mod(&phi_over_r);
    let r_invertible: bool = r_invertible.into();
    if !r_invertible {
        panic!("r and phi/r not relatively prime");
    }
    let root = z.pow(&root_exp);
    if root.pow(r) == z {
        return Some(root);
    }
    return None;
}

/// Brute-force discrete log given that the base has small order under the
/// modulus. If no discrete log can be found, return None. Walks the powers of
/// the base incrementally instead of re-exponentiating at every step.
pub fn discrete_log(
    base: &BigInt,
    target: &BigInt,
    order: &BigInt,
    modulus: &BigInt,
) -> Option<BigInt> {
    let params = DynResidueParams::new(modulus);
    let base = DynResidue::new(base, params);
    let target = DynResidue::new(target, params);
    let mut acc = DynResidue::new(&BigInt::ONE, params);

    let mut exp = BigInt::ZERO;
    while exp < *order {
        if acc == target {
            return Some(exp);
        }
        acc = acc.mul(&base);
        exp = exp.checked_add(&BigInt::ONE).unwrap();
    }
    return None;
}
