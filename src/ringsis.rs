//! Ring-SIS hashing over `F[X]/(X^d + 1)`
//!
//! A [`Key`] holds a fixed list of polynomials `A_0, …, A_{k-1}` of degree
//! `< d`. Hashing a vector of field elements:
//!
//! 1. splits every element into `log_two_bound`-bit limbs (least significant
//!    limb first, one limb per coefficient);
//! 2. packs the limbs into `k` message polynomials `m_i` of `d` coefficients
//!    (zero padded);
//! 3. returns the `d` coefficients of `Σ_i A_i · m_i mod (X^d + 1)`.
//!
//! The negacyclic product is evaluated on the coset `ψ·<ω_d>` where `ψ` is a
//! primitive `2d`-th root of unity: those points are exactly the roots of
//! `X^d + 1`, so the product is pointwise there. The key is stored both in
//! coefficient form and as bit-reversed coset evaluations pre-multiplied by
//! `1/d`, which lets one unscaled inverse transform finish each hash.
//!
//! [`Key::hash_mod_xn_minus_1`] computes the same linear map modulo `X^d − 1`
//! instead. It is not collision resistant and only serves to re-derive a batch
//! of hashes cheaply inside another proof.

#![forbid(unsafe_code)]

use std::sync::{Mutex, PoisonError};

use ark_ff::{FftField, PrimeField, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use blake3::Hasher;
use serde::{Deserialize, Serialize};

use crate::arena::ArenaError;
use crate::config::Tuning;
use crate::domain::{Domain, DomainError};
use crate::F;

/// Shape of the lattice: limb width and ring degree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, CanonicalSerialize, CanonicalDeserialize,
)]
pub struct SisParams {
    /// Limb width in bits. Every limb is `< 2^log_two_bound`.
    pub log_two_bound: usize,
    /// `log2(d)`.
    pub log_two_degree: usize,
}

impl SisParams {
    /// 16-bit limbs, degree 64.
    pub const STD: SisParams = SisParams { log_two_bound: 16, log_two_degree: 6 };
}

impl Default for SisParams {
    fn default() -> Self {
        Self::STD
    }
}

/// Static description of a ring-SIS instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct KeyGen {
    pub params: SisParams,
    /// Largest number of field elements a single hash accepts.
    pub max_num_field_to_hash: usize,
}

/// Errors from key generation and hashing.
#[derive(Debug, thiserror::Error)]
pub enum SisError {
    #[error("log_two_bound must be in 1..64 (got {0})")]
    InvalidBound(usize),
    #[error("max_num_field_to_hash must be positive")]
    ZeroCapacity,
    #[error("ring degree 2^{0} is not supported by the field")]
    DegreeTooLarge(usize),
    #[error("too many field elements to hash: {got} > {max}")]
    TooManyElements { got: usize, max: usize },
    #[error("too many limbs: {got} > {max}")]
    TooManyLimbs { got: usize, max: usize },
    #[error("transversal hash needs at least one row")]
    NoRows,
    #[error("transversal hash needs at least one column")]
    NoColumns,
    #[error("row {row} has length {len}, expected {expected}")]
    RaggedRows { row: usize, len: usize, expected: usize },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Arena(#[from] ArenaError),
}

impl KeyGen {
    pub fn new(params: SisParams, max_num_field_to_hash: usize) -> Self {
        Self { params, max_num_field_to_hash }
    }

    /// Reject shapes that cannot be instantiated.
    pub fn validate_r(&self) -> Result<(), SisError> {
        let b = self.params.log_two_bound;
        if b == 0 || b >= 64 {
            return Err(SisError::InvalidBound(b));
        }
        if self.max_num_field_to_hash == 0 {
            return Err(SisError::ZeroCapacity);
        }
        // The coset needs a 2d-th root of unity.
        if self.params.log_two_degree + 1 > F::TWO_ADICITY as usize {
            return Err(SisError::DegreeTooLarge(self.params.log_two_degree));
        }
        Ok(())
    }

    /// Limbs per field element: `ceil(MODULUS_BIT_SIZE / log_two_bound)`.
    #[inline]
    pub fn num_limbs(&self) -> usize {
        let bits = F::MODULUS_BIT_SIZE as usize;
        (bits + self.params.log_two_bound - 1) / self.params.log_two_bound
    }

    /// Ring degree `d`, also the digest length in field elements.
    #[inline]
    pub fn output_size(&self) -> usize {
        1 << self.params.log_two_degree
    }

    /// Whole field elements that fit in one message polynomial.
    #[inline]
    pub fn num_field_per_poly(&self) -> usize {
        self.output_size() / self.num_limbs()
    }

    /// Number of key polynomials.
    #[inline]
    pub fn num_polys(&self) -> usize {
        let limbs = self.max_num_field_to_hash * self.num_limbs();
        (limbs + self.output_size() - 1) / self.output_size()
    }

    /// Build the key.
    pub fn generate_r(&self) -> Result<Key, SisError> {
        Key::generate_with_r(*self, &Tuning::from_env())
    }

    /// Panicking wrapper around [`KeyGen::generate_r`].
    pub fn generate(&self) -> Key {
        self.generate_r().expect("invalid ring-SIS key shape")
    }
}

pub(crate) struct HashScratch {
    pub(crate) limbs: Vec<F>,
    pub(crate) poly: Vec<F>,
    pub(crate) acc: Vec<F>,
}

impl HashScratch {
    pub(crate) fn new(gen: &KeyGen) -> Self {
        let d = gen.output_size();
        Self {
            limbs: vec![F::zero(); gen.num_polys() * d],
            poly: vec![F::zero(); d],
            acc: vec![F::zero(); d],
        }
    }
}

/// Instantiated ring-SIS hash function.
pub struct Key {
    pub gen: KeyGen,
    /// Size-`d` domain shifted by `ψ`.
    pub(crate) domain: Domain,
    /// Plain size-`d` subgroup, for the `X^d − 1` variant.
    cyclic: Domain,
    /// Key polynomials, coefficient form.
    a: Vec<Vec<F>>,
    /// Key polynomials, bit-reversed coset evaluations times `1/d`.
    pub(crate) ag: Vec<Vec<F>>,
    scratch: Mutex<HashScratch>,
    pub(crate) transversal_chunk: usize,
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Key")
            .field("gen", &self.gen)
            .field("num_polys", &self.a.len())
            .field("transversal_chunk", &self.transversal_chunk)
            .finish()
    }
}

impl Key {
    /// Build the key for `gen`, with explicit tuning knobs.
    pub fn generate_with_r(gen: KeyGen, tuning: &Tuning) -> Result<Self, SisError> {
        gen.validate_r()?;
        let d = gen.output_size();
        let psi = F::get_root_of_unity(2 * d as u64)
            .ok_or(SisError::DegreeTooLarge(gen.params.log_two_degree))?;
        let domain = Domain::new_coset_r(d, psi)?;
        let cyclic = Domain::new_r(d)?;

        let a = derive_key_polys(&gen);
        let ag = a
            .iter()
            .map(|p| {
                let mut e = p.clone();
                domain.fft_coset_dif(&mut e);
                let d_inv = domain.n_inv();
                e.iter_mut().for_each(|x| *x *= d_inv);
                e
            })
            .collect();

        tracing::debug!(
            log_two_bound = gen.params.log_two_bound,
            degree = d,
            num_polys = gen.num_polys(),
            "ring-SIS key generated"
        );

        Ok(Self {
            gen,
            domain,
            cyclic,
            a,
            ag,
            scratch: Mutex::new(HashScratch::new(&gen)),
            transversal_chunk: tuning.transversal_chunk.max(1),
        })
    }

    #[inline]
    pub fn num_limbs(&self) -> usize {
        self.gen.num_limbs()
    }

    #[inline]
    pub fn output_size(&self) -> usize {
        self.gen.output_size()
    }

    #[inline]
    pub fn num_field_per_poly(&self) -> usize {
        self.gen.num_field_per_poly()
    }

    #[inline]
    pub fn max_num_field_to_hash(&self) -> usize {
        self.gen.max_num_field_to_hash
    }

    /// Limb decomposition of `v`, `v.len() * num_limbs()` entries.
    pub fn limb_split(&self, v: &[F]) -> Vec<F> {
        let nl = self.num_limbs();
        let mut out = vec![F::zero(); v.len() * nl];
        for (x, dst) in v.iter().zip(out.chunks_exact_mut(nl)) {
            write_limbs(x, self.gen.params.log_two_bound, dst);
        }
        out
    }

    /// Hash `v` (`v.len() <= max_num_field_to_hash`). Shorter inputs are zero
    /// padded. Calls on the same key are serialized on the internal scratch.
    pub fn hash_r(&self, v: &[F]) -> Result<Vec<F>, SisError> {
        let max = self.gen.max_num_field_to_hash;
        if v.len() > max {
            return Err(SisError::TooManyElements { got: v.len(), max });
        }
        // The scratch is overwritten on every call, so a poisoned guard is safe.
        let mut guard = self.scratch.lock().unwrap_or_else(PoisonError::into_inner);
        let HashScratch { limbs, poly, acc } = &mut *guard;

        limbs.iter_mut().for_each(|l| *l = F::zero());
        let nl = self.num_limbs();
        for (x, dst) in v.iter().zip(limbs.chunks_exact_mut(nl)) {
            write_limbs(x, self.gen.params.log_two_bound, dst);
        }
        self.hash_limbs_into(limbs, poly, acc);
        Ok(acc.clone())
    }

    /// Panicking wrapper around [`Key::hash_r`].
    pub fn hash(&self, v: &[F]) -> Vec<F> {
        self.hash_r(v).expect("ring-SIS hash input exceeds key capacity")
    }

    /// `Σ_i A_i · m_i mod (X^d + 1)` for limbs already laid out as
    /// `num_polys · d` coefficients. Result lands in `out` (length `d`).
    pub(crate) fn hash_limbs_into(&self, limbs: &[F], poly: &mut [F], out: &mut [F]) {
        let d = self.output_size();
        debug_assert_eq!(limbs.len(), self.ag.len() * d);
        out.iter_mut().for_each(|x| *x = F::zero());
        for (chunk, ag) in limbs.chunks_exact(d).zip(self.ag.iter()) {
            if chunk.iter().all(|x| x.is_zero()) {
                continue;
            }
            poly.copy_from_slice(chunk);
            self.domain.fft_coset_dif(poly);
            for ((o, p), k) in out.iter_mut().zip(poly.iter()).zip(ag.iter()) {
                *o += *p * k;
            }
        }
        self.domain.ifft_coset_dit_prescaled(out);
    }

    /// Same linear map as [`Key::hash`] on raw limbs, modulo `X^d − 1`.
    ///
    /// Each key/limb polynomial pair is transformed forward, products are
    /// accumulated in evaluation form, and a single inverse transform runs at
    /// the end.
    pub fn hash_mod_xn_minus_1_r(&self, limbs: &[F]) -> Result<Vec<F>, SisError> {
        let d = self.output_size();
        let max = d * self.a.len();
        if limbs.len() > max {
            return Err(SisError::TooManyLimbs { got: limbs.len(), max });
        }
        let mut acc = vec![F::zero(); d];
        let mut kf = vec![F::zero(); d];
        let mut mf = vec![F::zero(); d];
        for (chunk, a) in limbs.chunks(d).zip(self.a.iter()) {
            kf.copy_from_slice(a);
            self.cyclic.fft_dif(&mut kf);
            mf[..chunk.len()].copy_from_slice(chunk);
            mf[chunk.len()..].iter_mut().for_each(|x| *x = F::zero());
            self.cyclic.fft_dif(&mut mf);
            for ((o, k), m) in acc.iter_mut().zip(kf.iter()).zip(mf.iter()) {
                *o += *k * m;
            }
        }
        self.cyclic.ifft_dit(&mut acc);
        Ok(acc)
    }

    /// Panicking wrapper around [`Key::hash_mod_xn_minus_1_r`].
    pub fn hash_mod_xn_minus_1(&self, limbs: &[F]) -> Vec<F> {
        self.hash_mod_xn_minus_1_r(limbs).expect("too many limbs for ring-SIS key")
    }

    /// Key polynomials concatenated, coefficient form.
    pub fn flattened_key(&self) -> Vec<F> {
        self.a.concat()
    }

    /// 32-byte fingerprint of the key shape and matrix.
    pub fn digest(&self) -> [u8; 32] {
        let mut h = Hasher::new();
        h.update(b"VORTEX.ringsis.key.digest.v1");
        let mut bytes = Vec::new();
        self.gen
            .serialize_compressed(&mut bytes)
            .expect("serialize key shape");
        for p in &self.a {
            for c in p {
                c.serialize_compressed(&mut bytes).expect("serialize key coefficient");
            }
        }
        h.update(&bytes);
        *h.finalize().as_bytes()
    }
}

/// Split `x` into `out.len()` limbs of `bound` bits, least significant first.
pub(crate) fn write_limbs(x: &F, bound: usize, out: &mut [F]) {
    let big = x.into_bigint();
    let words: &[u64] = big.as_ref();
    let mask = (1u64 << bound) - 1;
    for (k, limb) in out.iter_mut().enumerate() {
        let pos = k * bound;
        let w = pos / 64;
        let off = pos % 64;
        if w >= words.len() {
            *limb = F::zero();
            continue;
        }
        let mut v = words[w] >> off;
        if off + bound > 64 && w + 1 < words.len() {
            v |= words[w + 1] << (64 - off);
        }
        *limb = F::from(v & mask);
    }
}

// Key polynomials expanded from a BLAKE3 XOF keyed by the shape, so every
// party rebuilds the same matrix without shipping it.
fn derive_key_polys(gen: &KeyGen) -> Vec<Vec<F>> {
    let mut h = Hasher::new();
    h.update(b"VORTEX.ringsis.key.v1");
    h.update(&(gen.params.log_two_bound as u64).to_be_bytes());
    h.update(&(gen.params.log_two_degree as u64).to_be_bytes());
    h.update(&(gen.max_num_field_to_hash as u64).to_be_bytes());
    let mut xof = h.finalize_xof();

    let d = gen.output_size();
    let mut buf = [0u8; 64];
    (0..gen.num_polys())
        .map(|_| {
            (0..d)
                .map(|_| {
                    xof.fill(&mut buf);
                    F::from_le_bytes_mod_order(&buf)
                })
                .collect()
        })
        .collect()
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::{Field, One, UniformRand};
    use rand::{rngs::StdRng, SeedableRng};

    fn small_key() -> Key {
        KeyGen::new(SisParams::STD, 8).generate()
    }

    // Schoolbook product mod X^d + 1 (negacyclic) or X^d - 1 (cyclic).
    fn naive_mul_acc(acc: &mut [F], a: &[F], m: &[F], negacyclic: bool) {
        let d = acc.len();
        for i in 0..d {
            for j in 0..d {
                let t = a[i] * m[j];
                let k = i + j;
                if k < d {
                    acc[k] += t;
                } else if negacyclic {
                    acc[k - d] -= t;
                } else {
                    acc[k - d] += t;
                }
            }
        }
    }

    fn padded_limbs(key: &Key, v: &[F]) -> Vec<F> {
        let mut limbs = key.limb_split(v);
        limbs.resize(key.a.len() * key.output_size(), F::zero());
        limbs
    }

    #[test]
    fn shape_for_standard_params() {
        let gen = KeyGen::new(SisParams::STD, 8);
        assert_eq!(gen.num_limbs(), 16);
        assert_eq!(gen.output_size(), 64);
        assert_eq!(gen.num_field_per_poly(), 4);
        assert_eq!(gen.num_polys(), 2);
    }

    #[test]
    fn validation_rejects_bad_shapes() {
        assert!(matches!(
            KeyGen::new(SisParams { log_two_bound: 64, log_two_degree: 6 }, 4).generate_r(),
            Err(SisError::InvalidBound(64))
        ));
        assert!(matches!(
            KeyGen::new(SisParams { log_two_bound: 0, log_two_degree: 6 }, 4).generate_r(),
            Err(SisError::InvalidBound(0))
        ));
        assert!(matches!(
            KeyGen::new(SisParams::STD, 0).generate_r(),
            Err(SisError::ZeroCapacity)
        ));
        assert!(matches!(
            KeyGen::new(SisParams { log_two_bound: 16, log_two_degree: 40 }, 4).generate_r(),
            Err(SisError::DegreeTooLarge(40))
        ));
    }

    #[test]
    fn limbs_recompose_to_the_element() {
        let mut rng = StdRng::seed_from_u64(11);
        for bound in [10usize, 16, 63] {
            let key = KeyGen::new(SisParams { log_two_bound: bound, log_two_degree: 6 }, 2).generate();
            let x = F::rand(&mut rng);
            let limbs = key.limb_split(&[x]);
            let base = F::from(2u64).pow([bound as u64]);
            let mut acc = F::zero();
            let mut scale = F::one();
            for l in &limbs {
                assert!(l.into_bigint().as_ref()[0] < (1u64 << bound));
                acc += *l * scale;
                scale *= base;
            }
            assert_eq!(acc, x, "bound {bound}");
        }
    }

    #[test]
    fn hash_matches_schoolbook_negacyclic_product() {
        let mut rng = StdRng::seed_from_u64(12);
        let key = small_key();
        let v: Vec<F> = (0..7).map(|_| F::rand(&mut rng)).collect();

        let d = key.output_size();
        let limbs = padded_limbs(&key, &v);
        let mut want = vec![F::zero(); d];
        for (a, m) in key.a.iter().zip(limbs.chunks(d)) {
            naive_mul_acc(&mut want, a, m, true);
        }
        assert_eq!(key.hash(&v), want);
    }

    #[test]
    fn mod_xn_minus_1_matches_schoolbook_cyclic_product() {
        let mut rng = StdRng::seed_from_u64(13);
        let key = small_key();
        let d = key.output_size();
        // Deliberately not a multiple of d.
        let limbs: Vec<F> = (0..d + 5).map(|_| F::rand(&mut rng)).collect();

        let mut padded = limbs.clone();
        padded.resize(key.a.len() * d, F::zero());
        let mut want = vec![F::zero(); d];
        for (a, m) in key.a.iter().zip(padded.chunks(d)) {
            naive_mul_acc(&mut want, a, m, false);
        }
        assert_eq!(key.hash_mod_xn_minus_1(&limbs), want);
    }

    #[test]
    fn mod_xn_minus_1_rejects_oversized_input() {
        let key = small_key();
        let too_many = vec![F::one(); key.a.len() * key.output_size() + 1];
        assert!(matches!(
            key.hash_mod_xn_minus_1_r(&too_many),
            Err(SisError::TooManyLimbs { .. })
        ));
    }

    #[test]
    fn hash_is_deterministic_and_sensitive() {
        let mut rng = StdRng::seed_from_u64(14);
        let key = small_key();
        let v: Vec<F> = (0..8).map(|_| F::rand(&mut rng)).collect();
        let h1 = key.hash(&v);
        assert_eq!(h1, key.hash(&v));
        assert_eq!(h1, KeyGen::new(SisParams::STD, 8).generate().hash(&v));

        let mut w = v.clone();
        w[3] += F::one();
        assert_ne!(h1, key.hash(&w));
    }

    #[test]
    fn hash_rejects_oversized_input() {
        let key = small_key();
        assert!(matches!(
            key.hash_r(&vec![F::one(); 9]),
            Err(SisError::TooManyElements { got: 9, max: 8 })
        ));
    }

    #[test]
    fn concurrent_hashes_agree_with_sequential() {
        let key = small_key();
        let inputs: Vec<Vec<F>> = (0..8u64).map(|i| (0..8).map(|j| F::from(i * 31 + j)).collect()).collect();
        let want: Vec<Vec<F>> = inputs.iter().map(|v| key.hash(v)).collect();
        let shared = &key;
        let got: Vec<Vec<F>> = std::thread::scope(|s| {
            let handles: Vec<_> = inputs.iter().map(|v| s.spawn(move || shared.hash(v))).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(got, want);
    }

    #[test]
    fn flattened_key_has_expected_length() {
        let key = small_key();
        assert_eq!(key.flattened_key().len(), key.a.len() * key.output_size());
        assert_ne!(key.digest(), KeyGen::new(SisParams::STD, 16).generate().digest());
    }
}
