//! Domain & Transform Primitives
//!
//! Radix-2 multiplicative subgroups `H = <ω>` (optionally shifted to a coset
//! `s·H`) together with the in-place transforms the commitment scheme is built
//! on:
//!
//! - `fft_dif` / `ifft_dif`: natural-order input, **bit-reversed** output
//!   (Gentleman–Sande butterflies).
//! - `fft_dit` / `ifft_dit`: **bit-reversed** input, natural-order output
//!   (Cooley–Tukey butterflies).
//! - coset variants evaluating on `s·H`, used by the ring-SIS negacyclic
//!   product and by the rate-1/2 Reed–Solomon fast path.
//!
//! Pairing a DIF forward transform with a DIT inverse transform lets callers
//! multiply pointwise in bit-reversed order and never pay for the permutation.
//!
//! Per-shape coset tables are cached in an explicit [`CosetTableCache`] that
//! callers thread through parameter construction.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::Arc;

use ark_ff::{batch_inversion, FftField, Field, One, Zero};
use ark_serialize::CanonicalSerialize;
use blake3::Hasher;

use crate::F;

/// Radix-2 evaluation domain `s·<ω>` of size `n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    /// Domain size `n` (a power of two).
    pub n: usize,
    /// Generator `ω` of the size-`n` subgroup.
    pub omega: F,
    /// Coset shift `s`. For a plain subgroup, `s = 1`.
    pub coset_shift: F,
    omega_inv: F,
    shift_inv: F,
    n_inv: F,
}

/// Errors produced by domain checks / transforms.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("domain size must be a positive power of two (got {0})")]
    BadSize(usize),
    #[error("the field has no subgroup of order {0}")]
    NoRootOfUnity(usize),
    #[error("coset shift must be non-zero")]
    ShiftZero,
    #[error("omega^N != 1")]
    OmegaNPowNotOne,
    #[error("omega is not primitive: omega^(N/2) == 1")]
    OmegaNotPrimitive,
    #[error("vector length must be a positive power of two (got {0})")]
    BadLen(usize),
}

impl Domain {
    /// Subgroup of size `n` generated by the field's canonical `n`-th root of unity.
    pub fn new_r(n: usize) -> Result<Self, DomainError> {
        Self::new_coset_r(n, F::one())
    }

    /// Panicking wrapper around [`Domain::new_r`].
    pub fn new(n: usize) -> Self {
        Self::new_r(n).expect("invalid domain")
    }

    /// Coset `shift·H` with `|H| = n`.
    pub fn new_coset_r(n: usize, coset_shift: F) -> Result<Self, DomainError> {
        if n == 0 || !n.is_power_of_two() {
            return Err(DomainError::BadSize(n));
        }
        let omega = F::get_root_of_unity(n as u64).ok_or(DomainError::NoRootOfUnity(n))?;
        Self::from_parts_r(n, omega, coset_shift)
    }

    /// Panicking wrapper around [`Domain::new_coset_r`].
    pub fn new_coset(n: usize, coset_shift: F) -> Self {
        Self::new_coset_r(n, coset_shift).expect("invalid domain")
    }

    /// Build a domain from an explicit generator, validating it.
    pub fn from_parts_r(n: usize, omega: F, coset_shift: F) -> Result<Self, DomainError> {
        if n == 0 || !n.is_power_of_two() {
            return Err(DomainError::BadSize(n));
        }
        let shift_inv = coset_shift.inverse().ok_or(DomainError::ShiftZero)?;
        validate_generator_r(n, omega)?;
        // omega^n = 1 so omega is a unit.
        let omega_inv = pow_u64(omega, (n as u64) - 1);
        let n_inv = F::from(n as u64)
            .inverse()
            .ok_or(DomainError::BadSize(n))?;
        Ok(Self { n, omega, coset_shift, omega_inv, shift_inv, n_inv })
    }

    /// `ω^{-1}`.
    #[inline]
    pub fn omega_inv(&self) -> F {
        self.omega_inv
    }

    /// `1/n` in the field.
    #[inline]
    pub fn n_inv(&self) -> F {
        self.n_inv
    }

    // ------------------------- Forward transforms -------------------------

    /// Forward transform, natural input, bit-reversed output.
    pub fn fft_dif(&self, a: &mut [F]) {
        assert_eq!(a.len(), self.n, "fft_dif: length mismatch");
        dif_in_place(a, self.omega);
    }

    /// Forward transform, bit-reversed input, natural output.
    pub fn fft_dit(&self, a: &mut [F]) {
        assert_eq!(a.len(), self.n, "fft_dit: length mismatch");
        dit_in_place(a, self.omega);
    }

    /// Evaluate coefficients (natural order) on the coset `s·H`; output is
    /// bit-reversed.
    pub fn fft_coset_dif(&self, a: &mut [F]) {
        assert_eq!(a.len(), self.n, "fft_coset_dif: length mismatch");
        scale_by_powers(a, self.coset_shift);
        dif_in_place(a, self.omega);
    }

    /// Natural-order coefficients -> natural-order evaluations on `H`.
    pub fn ntt(&self, a: &mut [F]) {
        assert_eq!(a.len(), self.n, "ntt: length mismatch");
        bit_reverse(a);
        dit_in_place(a, self.omega);
    }

    // ------------------------- Inverse transforms -------------------------

    /// Inverse transform, natural input, bit-reversed output.
    pub fn ifft_dif(&self, a: &mut [F]) {
        assert_eq!(a.len(), self.n, "ifft_dif: length mismatch");
        dif_in_place(a, self.omega_inv);
        scale(a, self.n_inv);
    }

    /// Inverse transform, bit-reversed input, natural output.
    pub fn ifft_dit(&self, a: &mut [F]) {
        assert_eq!(a.len(), self.n, "ifft_dit: length mismatch");
        dit_in_place(a, self.omega_inv);
        scale(a, self.n_inv);
    }

    /// Inverse of [`Domain::fft_coset_dif`]: bit-reversed evaluations on
    /// `s·H` -> natural-order coefficients.
    pub fn ifft_coset_dit(&self, a: &mut [F]) {
        assert_eq!(a.len(), self.n, "ifft_coset_dit: length mismatch");
        dit_in_place(a, self.omega_inv);
        scale(a, self.n_inv);
        scale_by_powers(a, self.shift_inv);
    }

    /// Same as [`Domain::ifft_coset_dit`] without the final `1/n` factor.
    /// Callers must have folded `1/n` into their inputs already.
    pub fn ifft_coset_dit_prescaled(&self, a: &mut [F]) {
        assert_eq!(a.len(), self.n, "ifft_coset_dit_prescaled: length mismatch");
        dit_in_place(a, self.omega_inv);
        scale_by_powers(a, self.shift_inv);
    }

    /// Natural-order evaluations on `H` -> natural-order coefficients.
    pub fn intt(&self, a: &mut [F]) {
        assert_eq!(a.len(), self.n, "intt: length mismatch");
        self.ifft_dif(a);
        bit_reverse(a);
    }
}

#[inline]
pub(crate) fn pow_u64(mut base: F, mut exp: u64) -> F {
    let mut acc = F::one();
    while exp > 0 {
        if (exp & 1) == 1 {
            acc *= base;
        }
        base.square_in_place();
        exp >>= 1;
    }
    acc
}

// ------------------------- Hygiene / Validation -------------------------

fn validate_generator_r(n: usize, omega: F) -> Result<(), DomainError> {
    if !pow_u64(omega, n as u64).is_one() {
        return Err(DomainError::OmegaNPowNotOne);
    }
    // For a power-of-two order, 2 is the only prime divisor.
    if n > 1 && pow_u64(omega, (n / 2) as u64).is_one() {
        return Err(DomainError::OmegaNotPrimitive);
    }
    Ok(())
}

/// Stable 32-byte digest of a `Domain`, bound into transcripts.
pub fn domain_digest(d: &Domain) -> [u8; 32] {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(d.n as u64).to_be_bytes());
    d.omega
        .serialize_compressed(&mut bytes)
        .expect("serialize omega");
    d.coset_shift
        .serialize_compressed(&mut bytes)
        .expect("serialize coset shift");
    let mut h = Hasher::new();
    h.update(b"VORTEX.domain.v1");
    h.update(&bytes);
    *h.finalize().as_bytes()
}

// ------------------------- Butterflies -------------------------

/// In-place bit-reversal permutation.
pub fn bit_reverse<T>(a: &mut [T]) {
    let n = a.len();
    if n <= 2 {
        return;
    }
    debug_assert!(n.is_power_of_two());
    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;
        if i < j {
            a.swap(i, j);
        }
    }
}

/// Index `i` with its lowest `log_n` bits reversed.
#[inline]
pub fn bit_reverse_index(i: usize, log_n: u32) -> usize {
    if log_n == 0 {
        return 0;
    }
    i.reverse_bits() >> (usize::BITS - log_n)
}

// Gentleman–Sande: natural in, bit-reversed out.
fn dif_in_place(a: &mut [F], root: F) {
    let n = a.len();
    debug_assert!(n.is_power_of_two());
    let mut len = n;
    while len >= 2 {
        let half = len / 2;
        let w_len = pow_u64(root, (n / len) as u64);
        for start in (0..n).step_by(len) {
            let mut w = F::one();
            for i in 0..half {
                let u = a[start + i];
                let v = a[start + i + half];
                a[start + i] = u + v;
                a[start + i + half] = (u - v) * w;
                w *= w_len;
            }
        }
        len >>= 1;
    }
}

// Cooley–Tukey: bit-reversed in, natural out.
fn dit_in_place(a: &mut [F], root: F) {
    let n = a.len();
    debug_assert!(n.is_power_of_two());
    let mut len = 2;
    while len <= n {
        let w_len = pow_u64(root, (n / len) as u64);
        let half = len / 2;
        for start in (0..n).step_by(len) {
            let mut w = F::one();
            for i in 0..half {
                let u = a[start + i];
                let v = a[start + i + half] * w;
                a[start + i] = u + v;
                a[start + i + half] = u - v;
                w *= w_len;
            }
        }
        len <<= 1;
    }
}

#[inline]
fn scale(a: &mut [F], c: F) {
    for x in a.iter_mut() {
        *x *= c;
    }
}

#[inline]
fn scale_by_powers(a: &mut [F], c: F) {
    if c.is_one() {
        return;
    }
    let mut p = F::one();
    for x in a.iter_mut() {
        *x *= p;
        p *= c;
    }
}

// ------------------------- Evaluation helpers -------------------------

/// Horner evaluation of `Σ coeffs[i]·x^i`.
pub fn eval_canonical(coeffs: &[F], x: F) -> F {
    let mut acc = F::zero();
    for &c in coeffs.iter().rev() {
        acc = acc * x + c;
    }
    acc
}

/// Evaluate, at `x`, the unique polynomial of degree `< len` taking the
/// values `evals[i]` on `ω^i` where `ω` generates the subgroup of size
/// `evals.len()`.
///
/// Barycentric form: `P(x) = (x^n − 1)/n · Σ_i evals[i]·ω^i / (x − ω^i)`.
pub fn interpolate_r(evals: &[F], x: F) -> Result<F, DomainError> {
    let n = evals.len();
    if n == 0 || !n.is_power_of_two() {
        return Err(DomainError::BadLen(n));
    }
    let d = Domain::new_r(n)?;

    let mut denoms = Vec::with_capacity(n);
    let mut omega_i = F::one();
    for &v in evals.iter() {
        let den = x - omega_i;
        if den.is_zero() {
            return Ok(v);
        }
        denoms.push(den);
        omega_i *= d.omega;
    }
    batch_inversion(&mut denoms);

    let mut acc = F::zero();
    let mut omega_i = F::one();
    for (v, inv) in evals.iter().zip(denoms.iter()) {
        acc += *v * omega_i * inv;
        omega_i *= d.omega;
    }
    let vanishing = pow_u64(x, n as u64) - F::one();
    Ok(acc * vanishing * d.n_inv)
}

/// Panicking wrapper around [`interpolate_r`].
pub fn interpolate(evals: &[F], x: F) -> F {
    interpolate_r(evals, x).expect("interpolation over an invalid domain")
}

// ------------------------- Coset tables -------------------------

/// Cache of bit-reversed coset tables `[w^i]_{i<n}` where `w` is a primitive
/// `(n·ratio)`-th root of unity. Built once per shape and shared through
/// `Arc`.
#[derive(Debug, Default)]
pub struct CosetTableCache {
    tables: HashMap<(usize, usize), Arc<Vec<F>>>,
}

impl CosetTableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct shapes held.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Fetch (or build) the bit-reversed table for `(n, ratio)`.
    pub fn get_or_build_r(&mut self, n: usize, ratio: usize) -> Result<Arc<Vec<F>>, DomainError> {
        if let Some(t) = self.tables.get(&(n, ratio)) {
            return Ok(Arc::clone(t));
        }
        if n == 0 || !n.is_power_of_two() {
            return Err(DomainError::BadSize(n));
        }
        if ratio == 0 || !ratio.is_power_of_two() {
            return Err(DomainError::BadSize(ratio));
        }
        let big = n * ratio;
        let w = F::get_root_of_unity(big as u64).ok_or(DomainError::NoRootOfUnity(big))?;
        let mut table = Vec::with_capacity(n);
        let mut acc = F::one();
        for _ in 0..n {
            table.push(acc);
            acc *= w;
        }
        bit_reverse(&mut table);
        let table = Arc::new(table);
        self.tables.insert((n, ratio), Arc::clone(&table));
        Ok(table)
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
