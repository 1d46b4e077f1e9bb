//! Commitment and opening (prover side)
//!
//! Flow for one round:
//! 1. `commit_merkle_with_sis` / `commit_merkle_without_sis` per matrix:
//!    encode every row, hash every encoded column into a Merkle leaf, build
//!    the tree. The root is the commitment.
//! 2. `open` over the rows of all matrices joined together: the random
//!    linear combination of the rows, encoded once (encoding is linear).
//! 3. `OpeningProof::complete` once the column indices are known: attach the
//!    opened sub-columns of every matrix and their Merkle proofs.

#![forbid(unsafe_code)]

use rayon::prelude::*;

use crate::merkle::{Digest, MerkleError, MerkleTree};
use crate::params::Params;
use crate::reedsolomon::CodewordError;
use crate::ringsis::SisError;
use crate::smartvectors::SmartVector;
use crate::verifier::OpeningProof;
use crate::F;

/// Encoded rows of one committed matrix, each of length `num_encoded_cols`.
pub type EncodedMatrix = Vec<SmartVector>;

#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("cannot commit to a matrix with no rows")]
    NoRows,
    #[error("too many rows: {got} > {max}")]
    TooManyRows { got: usize, max: usize },
    #[error("row {row} has length {got}, expected {expected}")]
    RowLength { row: usize, got: usize, expected: usize },
    #[error("opening needs at least one column index")]
    EmptyEntryList,
    #[error(transparent)]
    Codeword(#[from] CodewordError),
    #[error(transparent)]
    Sis(#[from] SisError),
    #[error(transparent)]
    Merkle(#[from] MerkleError),
}

/// Prover-side state of one commitment.
#[derive(Debug, Clone)]
pub struct Committed {
    pub encoded: EncodedMatrix,
    pub tree: MerkleTree,
    /// Column SIS digests, concatenated. Empty when SIS was skipped.
    pub sis_hashes: Vec<F>,
}

impl Committed {
    #[inline]
    pub fn root(&self) -> Digest {
        self.tree.root()
    }

    /// Whether leaves were computed from raw columns.
    #[inline]
    pub fn is_sis_replaced(&self) -> bool {
        self.sis_hashes.is_empty()
    }
}

impl Params {
    fn check_rows_r(&self, rows: &[SmartVector]) -> Result<(), CommitError> {
        if rows.is_empty() {
            return Err(CommitError::NoRows);
        }
        if rows.len() > self.max_nb_rows {
            return Err(CommitError::TooManyRows { got: rows.len(), max: self.max_nb_rows });
        }
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != self.nb_columns) {
            return Err(CommitError::RowLength { row, got: r.len(), expected: self.nb_columns });
        }
        Ok(())
    }

    /// Encode every row of a matrix (rows run in parallel).
    pub fn encode_rows_r(&self, rows: &[SmartVector]) -> Result<EncodedMatrix, CommitError> {
        self.check_rows_r(rows)?;
        let encoded = rows
            .par_iter()
            .map(|r| self.rs_encode_r(r))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(encoded)
    }

    /// Commit with leaves `H(SIS(column))`.
    pub fn commit_merkle_with_sis(&self, rows: &[SmartVector]) -> Result<Committed, CommitError> {
        let encoded = self.encode_rows_r(rows)?;
        let sis_hashes = self.key.transversal_hash_r(&encoded)?;
        let d = self.key.output_size();
        let leaves: Vec<Digest> = sis_hashes
            .par_chunks(d)
            .map(|h| self.leaf_hash.hash_field_leaf(h))
            .collect();
        let tree = MerkleTree::build_r(leaves, self.leaf_hash)?;
        tracing::debug!(nb_rows = rows.len(), root = %tree.root(), "committed with SIS");
        Ok(Committed { encoded, tree, sis_hashes })
    }

    /// Commit with leaves `H(column)`.
    pub fn commit_merkle_without_sis(
        &self,
        rows: &[SmartVector],
    ) -> Result<Committed, CommitError> {
        let encoded = self.encode_rows_r(rows)?;
        let leaves: Vec<Digest> = (0..self.num_encoded_cols())
            .into_par_iter()
            .map(|c| {
                let column: Vec<F> = encoded.iter().map(|r| r.get(c)).collect();
                self.leaf_hash.hash_field_leaf(&column)
            })
            .collect();
        let tree = MerkleTree::build_r(leaves, self.leaf_hash)?;
        tracing::debug!(nb_rows = rows.len(), root = %tree.root(), "committed without SIS");
        Ok(Committed { encoded, tree, sis_hashes: Vec::new() })
    }

    /// Linear combination `Σ coin^k · rows[k]` over the rows of every
    /// committed matrix (in commitment order), encoded.
    pub fn open_r(&self, rows: &[SmartVector], random_coin: F) -> Result<OpeningProof, CommitError> {
        if rows.is_empty() {
            return Err(CommitError::NoRows);
        }
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != self.nb_columns) {
            return Err(CommitError::RowLength { row, got: r.len(), expected: self.nb_columns });
        }
        let lc = SmartVector::linear_combination(rows, random_coin);
        Ok(OpeningProof {
            columns: Vec::new(),
            merkle_proofs: Vec::new(),
            linear_combination: self.rs_encode_r(&lc)?,
        })
    }

    /// Panicking wrapper around [`Params::open_r`].
    pub fn open(&self, rows: &[SmartVector], random_coin: F) -> OpeningProof {
        self.open_r(rows, random_coin).expect("invalid rows for opening")
    }
}

impl OpeningProof {
    /// Attach, for every commitment and every entry, the opened sub-column
    /// and its Merkle proof.
    pub fn complete_r(
        &mut self,
        entry_list: &[usize],
        committed: &[Committed],
    ) -> Result<(), CommitError> {
        if entry_list.is_empty() {
            return Err(CommitError::EmptyEntryList);
        }
        let mut columns = Vec::with_capacity(committed.len());
        let mut proofs = Vec::with_capacity(committed.len());
        for c in committed {
            let mut cols = Vec::with_capacity(entry_list.len());
            let mut ps = Vec::with_capacity(entry_list.len());
            for &entry in entry_list {
                ps.push(c.tree.prove_r(entry)?);
                cols.push(c.encoded.iter().map(|r| r.get(entry)).collect());
            }
            columns.push(cols);
            proofs.push(ps);
        }
        self.columns = columns;
        self.merkle_proofs = proofs;
        Ok(())
    }

    /// Panicking wrapper around [`OpeningProof::complete_r`].
    pub fn complete(&mut self, entry_list: &[usize], committed: &[Committed]) {
        self.complete_r(entry_list, committed).expect("cannot complete opening proof")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::HashFunc;
    use crate::ringsis::SisParams;
    use ark_ff::UniformRand;
    use rand::{rngs::StdRng, SeedableRng};

    fn params() -> Params {
        Params::new(2, 16, 8, SisParams::STD, HashFunc::Blake3)
    }

    fn rows(seed: u64, n: usize) -> Vec<SmartVector> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| SmartVector::Regular((0..16).map(|_| F::rand(&mut rng)).collect()))
            .collect()
    }

    #[test]
    fn commit_validates_rows() {
        let p = params();
        assert!(matches!(p.commit_merkle_with_sis(&[]), Err(CommitError::NoRows)));
        assert!(matches!(
            p.commit_merkle_with_sis(&rows(1, 9)),
            Err(CommitError::TooManyRows { got: 9, max: 8 })
        ));
        let mut bad = rows(1, 2);
        bad.push(SmartVector::Regular(vec![F::from(1u64); 8]));
        assert!(matches!(
            p.commit_merkle_without_sis(&bad),
            Err(CommitError::RowLength { row: 2, got: 8, expected: 16 })
        ));
    }

    #[test]
    fn sis_leaves_hash_column_digests() {
        let p = params();
        let c = p.commit_merkle_with_sis(&rows(2, 3)).unwrap();
        let d = p.key.output_size();
        assert_eq!(c.sis_hashes.len(), p.num_encoded_cols() * d);
        assert!(!c.is_sis_replaced());

        let col: Vec<F> = c.encoded.iter().map(|r| r.get(5)).collect();
        let digest = p.key.hash(&col);
        assert_eq!(&c.sis_hashes[5 * d..6 * d], &digest[..]);
        assert_eq!(c.tree.leaf(5), Some(p.leaf_hash.hash_field_leaf(&digest)));
    }

    #[test]
    fn plain_leaves_hash_raw_columns() {
        let p = params();
        let c = p.commit_merkle_without_sis(&rows(3, 2)).unwrap();
        assert!(c.is_sis_replaced());
        let col: Vec<F> = c.encoded.iter().map(|r| r.get(9)).collect();
        assert_eq!(c.tree.leaf(9), Some(p.leaf_hash.hash_field_leaf(&col)));
    }

    #[test]
    fn complete_fills_every_commitment() {
        let p = params();
        let (a, b) = (rows(4, 2), rows(5, 3));
        let committed = vec![
            p.commit_merkle_with_sis(&a).unwrap(),
            p.commit_merkle_without_sis(&b).unwrap(),
        ];
        let joined: Vec<SmartVector> = a.iter().chain(b.iter()).cloned().collect();
        let mut proof = p.open(&joined, F::from(3u64));
        assert_eq!(proof.linear_combination.len(), p.num_encoded_cols());

        let entries = [1usize, 30, 1];
        proof.complete(&entries, &committed);
        assert_eq!(proof.columns.len(), 2);
        assert_eq!(proof.columns[1].len(), 3);
        assert_eq!(proof.columns[1][1].len(), 3);
        assert_eq!(proof.merkle_proofs[0][1].path, 30);

        assert!(matches!(
            proof.complete_r(&[], &committed),
            Err(CommitError::EmptyEntryList)
        ));
        assert!(matches!(
            proof.complete_r(&[32], &committed),
            Err(CommitError::Merkle(MerkleError::IndexOutOfRange { index: 32, len: 32 }))
        ));
    }
}
