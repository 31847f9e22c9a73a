//! The key pairs of the Benaloh cryptosystem.
//!
//! A public key is a triple (r, n, y) where r is a small prime, n = pq is a
//! hard-to-factor modulus with r | phi(n), and y is a non-residue used as the
//! generator of the plaintext ring. The secret key is phi(n). The triple must
//! be perfectly consonant: r divides phi, and r is coprime to phi/r.
use crate::{BigInt, LIMBS};
use crypto_bigint::{
    modular::runtime_mod::{DynResidue, DynResidueParams},
    rand_core::OsRng,
    CheckedAdd, CheckedMul, CheckedSub, NonZero, RandomMod,
};

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct PublicKey {
    r: BigInt,
    n: BigInt,
    y: BigInt,
}

impl PublicKey {
    /// Instantiate an instance with no check
    pub fn new(r: BigInt, n: BigInt, y: BigInt) -> Self {
        return Self { r, n, y };
    }

    pub fn get_r(&self) -> &BigInt {
        &self.r
    }

    pub fn get_n(&self) -> &BigInt {
        &self.n
    }

    pub fn get_y(&self) -> &BigInt {
        &self.y
    }

    /// Montgomery parameters for arithmetic modulo n
    pub fn modulus_params(&self) -> DynResidueParams<LIMBS> {
        DynResidueParams::new(&self.n)
    }

    /// Montgomery parameters for arithmetic in the plaintext ring Z/r
    pub fn ring_params(&self) -> DynResidueParams<LIMBS> {
        DynResidueParams::new(&self.r)
    }

    /// Return the multiplicative inverse of y.
    /// y is invertible by construction, so failure here means the key
    /// material is corrupt.
    pub fn invert_y(&self) -> BigInt {
        let (y_inv, invertible) = self.y.inv_mod(&self.n);
        if invertible.into() {
            return y_inv;
        }
        panic!("y is not invertible");
    }

    /// Sample a random element from the multiplicative group Z/n
    pub fn sample_invertible(&self) -> BigInt {
        return KeyPair::sample_invertible(self.n);
    }
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct SecretKey {
    phi: BigInt,
}

impl SecretKey {
    pub fn new(phi: BigInt) -> Self {
        Self { phi }
    }

    pub fn get_phi(&self) -> &BigInt {
        &self.phi
    }
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct KeyPair {
    pk: PublicKey,
    sk: SecretKey,
}

impl KeyPair {
    pub fn new(pk: PublicKey, sk: SecretKey) -> Self {
        Self { pk, sk }
    }

    pub fn get_pk(&self) -> &PublicKey {
        &self.pk
    }

    pub fn get_sk(&self) -> &SecretKey {
        &self.sk
    }

    /// Generate a prime along the arithmetic sequence f(x) for random x below
    /// xbound. The sequences are chosen so that r^2 | p - 1 and r | q - b for
    /// a fixed non-zero remainder b, which yields r | phi(n) but not
    /// r^2 | phi(n) once p and q are combined.
    fn prime_in_sequence<F>(f: F, xbound: &BigInt, safe: bool) -> BigInt
    where
        F: Fn(&BigInt) -> BigInt,
    {
        loop {
            let x = BigInt::random_mod(&mut OsRng, &NonZero::new(*xbound).unwrap());
            let candidate = f(&x);
            let ready = if safe {
                crypto_primes::is_safe_prime(&candidate)
            } else {
                crypto_primes::is_prime(&candidate)
            };
            if ready {
                return candidate;
            }
        }
    }

    /// Sample from the multiplicative group (mod n)
    fn sample_invertible(modulus: BigInt) -> BigInt {
        loop {
            let y = BigInt::random_mod(&mut OsRng, &NonZero::new(modulus).unwrap());
            let (_, invertible) = y.inv_mod(&modulus);
            if invertible.into() {
                return y;
            }
        }
    }

    /// Sample a non-residue. A non-residue is an invertible element such that
    /// y^{phi/r} != 1 (mod n)
    fn sample_nonresidue(modulus: BigInt, r: BigInt, phi: BigInt) -> BigInt {
        let quotient = phi.checked_div(&r).unwrap();

        loop {
            let y = Self::sample_invertible(modulus);
            if DynResidue::new(&y, DynResidueParams::new(&modulus))
                .pow(&quotient)
                .retrieve()
                != BigInt::ONE
            {
                return y;
            }
        }
    }

    /// Assuming that (r, n, y) is prime consonance, check that it is also
    /// perfect consonance:
    /// 1. r divides phi
    /// 2. r and phi/r are relatively prime
    pub fn check_perfect_consonance(&self) -> bool {
        let r = *self.get_pk().get_r();
        let phi = self.get_sk().get_phi();
        let divisible = phi % NonZero::new(r).unwrap() == BigInt::ZERO;
        let indivisible = (phi.checked_div(&r).unwrap()) % NonZero::new(r).unwrap() != BigInt::ZERO;
        return divisible && indivisible;
    }

    /// Generate a valid set of parameters such that (r, n, y) is perfectly
    /// consonant. First generate r, then use arithmetic sequences to generate
    /// p and q:
    /// q = r * x + b
    /// p = (r ** 2) * x + br + 1
    ///
    /// The ring size is mostly dependent on the application (the ring must be
    /// no smaller than the number of voters), while the modulus size is the
    /// main security parameter. Both are measured in bits.
    pub fn keygen(ring_size: usize, modulus_size: usize, safe: bool) -> Self {
        let r: BigInt = crypto_primes::generate_prime(Some(ring_size));
        // x is the dominant term in the arithmetic sequence
        let xbound = BigInt::ONE.shl_vartime(modulus_size);
        // Generate the non-zero remainder in the arithmetic sequence
        let mut b: BigInt = BigInt::random_mod(&mut OsRng, &NonZero::new(r).unwrap());
        while b == BigInt::ZERO {
            b = BigInt::random_mod(&mut OsRng, &NonZero::new(r).unwrap());
        }

        let q = Self::prime_in_sequence(
            |x| r.checked_mul(x).unwrap().checked_add(&b).unwrap(),
            &xbound,
            safe,
        );
        let rr = r.checked_mul(&r).unwrap();
        let rb = r.checked_mul(&b).unwrap();
        let p = Self::prime_in_sequence(
            |x| {
                rr.checked_mul(x)
                    .unwrap()
                    .checked_add(&rb)
                    .unwrap()
                    .checked_add(&BigInt::ONE)
                    .unwrap()
            },
            &xbound,
            safe,
        );

        let n = p.checked_mul(&q).unwrap();
        let phi = p
            .checked_sub(&BigInt::ONE)
            .unwrap()
            .checked_mul(&q.checked_sub(&BigInt::ONE).unwrap())
            .unwrap();
        let y = Self::sample_nonresidue(n, r, phi);

        return Self::new(PublicKey::new(r, n, y), SecretKey::new(phi));
    }
}
