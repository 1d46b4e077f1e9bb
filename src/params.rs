//! Public parameters of one commitment instance
//!
//! `Params` is built once and then shared read-only (it is `Clone` and all
//! heavy members sit behind `Arc`). It owns:
//!
//! - the small domain (size `nb_columns`) and the large domain
//!   (size `nb_columns · blow_up_factor`, carrying the multiplicative
//!   generator as coset shift);
//! - the bit-reversed coset table driving the rate-1/2 encoder;
//! - the ring-SIS key sized for `max_nb_rows` elements per column;
//! - the byte hash used for Merkle leaves and nodes.

#![forbid(unsafe_code)]

use std::sync::Arc;

use ark_ff::FftField;
use ark_serialize::CanonicalSerialize;
use blake3::Hasher;

use crate::config::Tuning;
use crate::domain::{domain_digest, CosetTableCache, Domain, DomainError};
use crate::merkle::HashFunc;
use crate::ringsis::{Key, KeyGen, SisError, SisParams};
use crate::F;

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("blow-up factor must be a power of two greater than one (got {0})")]
    BadBlowUp(usize),
    #[error("number of columns must be a positive power of two (got {0})")]
    BadNbColumns(usize),
    #[error("max_nb_rows must be at least 1")]
    NoRows,
    #[error(transparent)]
    Sis(#[from] SisError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Immutable shape of one commitment instance.
#[derive(Debug, Clone)]
pub struct Params {
    pub key: Arc<Key>,
    pub blow_up_factor: usize,
    /// `[small, large]`.
    pub domains: [Domain; 2],
    pub nb_columns: usize,
    pub max_nb_rows: usize,
    /// `[w^i]_{i < nb_columns}` in bit-reversed order, `w` a primitive
    /// `nb_columns · blow_up_factor`-th root of unity.
    pub coset_table_bit_reverse: Arc<Vec<F>>,
    pub leaf_hash: HashFunc,
}

impl Params {
    pub fn new_r(
        blow_up_factor: usize,
        nb_columns: usize,
        max_nb_rows: usize,
        sis: SisParams,
        leaf_hash: HashFunc,
    ) -> Result<Self, ParamsError> {
        let mut cache = CosetTableCache::new();
        Self::new_with_cache_r(
            blow_up_factor,
            nb_columns,
            max_nb_rows,
            sis,
            leaf_hash,
            &mut cache,
            &Tuning::from_env(),
        )
    }

    /// Panicking wrapper around [`Params::new_r`]. Bad shapes are a
    /// configuration bug.
    pub fn new(
        blow_up_factor: usize,
        nb_columns: usize,
        max_nb_rows: usize,
        sis: SisParams,
        leaf_hash: HashFunc,
    ) -> Self {
        Self::new_r(blow_up_factor, nb_columns, max_nb_rows, sis, leaf_hash)
            .expect("invalid vortex parameters")
    }

    /// Same as [`Params::new_r`], sharing coset tables through `cache`.
    pub fn new_with_cache_r(
        blow_up_factor: usize,
        nb_columns: usize,
        max_nb_rows: usize,
        sis: SisParams,
        leaf_hash: HashFunc,
        cache: &mut CosetTableCache,
        tuning: &Tuning,
    ) -> Result<Self, ParamsError> {
        if blow_up_factor < 2 || !blow_up_factor.is_power_of_two() {
            return Err(ParamsError::BadBlowUp(blow_up_factor));
        }
        if nb_columns == 0 || !nb_columns.is_power_of_two() {
            return Err(ParamsError::BadNbColumns(nb_columns));
        }
        if max_nb_rows < 1 {
            return Err(ParamsError::NoRows);
        }

        let small = Domain::new_r(nb_columns)?;
        let large = Domain::new_coset_r(nb_columns * blow_up_factor, F::GENERATOR)?;
        let coset_table_bit_reverse = cache.get_or_build_r(nb_columns, blow_up_factor)?;
        let key = Key::generate_with_r(KeyGen::new(sis, max_nb_rows), tuning)?;

        tracing::debug!(
            blow_up_factor,
            nb_columns,
            max_nb_rows,
            ?leaf_hash,
            "vortex params ready"
        );

        Ok(Self {
            key: Arc::new(key),
            blow_up_factor,
            domains: [small, large],
            nb_columns,
            max_nb_rows,
            coset_table_bit_reverse,
            leaf_hash,
        })
    }

    /// Width of the committed matrix after encoding; also the Merkle leaf count.
    #[inline]
    pub fn num_encoded_cols(&self) -> usize {
        self.nb_columns.next_power_of_two() * self.blow_up_factor
    }

    /// Depth of the column tree.
    #[inline]
    pub fn merkle_depth(&self) -> usize {
        self.num_encoded_cols().trailing_zeros() as usize
    }

    /// Stable 32-byte fingerprint, bound into transcripts.
    pub fn digest(&self) -> [u8; 32] {
        let mut h = Hasher::new();
        h.update(b"VORTEX.params.v1");
        h.update(&(self.blow_up_factor as u64).to_be_bytes());
        h.update(&(self.nb_columns as u64).to_be_bytes());
        h.update(&(self.max_nb_rows as u64).to_be_bytes());
        h.update(&domain_digest(&self.domains[0]));
        h.update(&domain_digest(&self.domains[1]));
        h.update(&self.key.digest());
        let mut tag = Vec::with_capacity(1);
        self.leaf_hash
            .serialize_compressed(&mut tag)
            .expect("serialize leaf hash");
        h.update(&tag);
        *h.finalize().as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_shapes() {
        let sis = SisParams::STD;
        let h = HashFunc::Blake3;
        assert!(matches!(Params::new_r(3, 16, 4, sis, h), Err(ParamsError::BadBlowUp(3))));
        assert!(matches!(Params::new_r(1, 16, 4, sis, h), Err(ParamsError::BadBlowUp(1))));
        assert!(matches!(Params::new_r(2, 12, 4, sis, h), Err(ParamsError::BadNbColumns(12))));
        assert!(matches!(Params::new_r(2, 16, 0, sis, h), Err(ParamsError::NoRows)));
        assert!(matches!(
            Params::new_r(2, 16, 4, SisParams { log_two_bound: 64, log_two_degree: 6 }, h),
            Err(ParamsError::Sis(SisError::InvalidBound(64)))
        ));
    }

    #[test]
    fn shapes_follow_the_inputs() {
        let p = Params::new(4, 8, 3, SisParams::STD, HashFunc::Sha256);
        assert_eq!(p.num_encoded_cols(), 32);
        assert_eq!(p.merkle_depth(), 5);
        assert_eq!(p.domains[0].n, 8);
        assert_eq!(p.domains[1].n, 32);
        assert_eq!(p.domains[1].coset_shift, F::GENERATOR);
        assert_eq!(p.coset_table_bit_reverse.len(), 8);
        assert_eq!(p.key.max_num_field_to_hash(), 3);
    }

    #[test]
    fn cache_is_shared_between_instances() {
        let mut cache = CosetTableCache::new();
        let t = Tuning::default();
        let a = Params::new_with_cache_r(2, 16, 4, SisParams::STD, HashFunc::Blake3, &mut cache, &t)
            .unwrap();
        let b = Params::new_with_cache_r(2, 16, 8, SisParams::STD, HashFunc::Blake3, &mut cache, &t)
            .unwrap();
        assert!(Arc::ptr_eq(&a.coset_table_bit_reverse, &b.coset_table_bit_reverse));
        assert_eq!(cache.len(), 1);
        assert_ne!(a.digest(), b.digest());
    }
}
