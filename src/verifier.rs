//! Opening verification
//!
//! `verify_opening` runs a fixed pipeline over one proof and stops at the
//! first failing stage:
//!
//! 1. structural checks on every length and index (cheap, no hashing);
//! 2. the claimed linear combination is a codeword;
//! 3. every opened column, read as coefficients, evaluates at the random
//!    coin to the matching entry of the linear combination;
//! 4. the linear combination, interpolated at `X`, equals the claimed
//!    evaluations `Ys` combined with the random coin;
//! 5. every opened sub-column hashes to a leaf that the matching Merkle
//!    proof authenticates, at the position that was asked for.
//!
//! All proof data is treated as adversarial: every failure is a `VerifyError`,
//! never a panic.

#![forbid(unsafe_code)]

use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

use crate::domain::{eval_canonical, interpolate_r};
use crate::merkle::{self, Digest, MerkleConfig, MerkleProof};
use crate::params::Params;
use crate::reedsolomon::CodewordError;
use crate::smartvectors::SmartVector;
use crate::F;

/// Prover message of the opening protocol.
#[derive(Debug, Clone, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct OpeningProof {
    /// `columns[i][j]`: column `entry_list[j]` of commitment `i`, one value per row.
    pub columns: Vec<Vec<Vec<F>>>,
    /// `merkle_proofs[i][j]`: inclusion proof for `columns[i][j]`.
    pub merkle_proofs: Vec<Vec<MerkleProof>>,
    /// Encoded linear combination of all committed rows.
    pub linear_combination: SmartVector,
}

/// Statement and proof handed to [`verify_opening`].
#[derive(Debug, Clone)]
pub struct VerifierInputs<'a> {
    pub params: &'a Params,
    pub merkle_roots: Vec<Digest>,
    pub x: F,
    /// `ys[i][k]`: claimed evaluation at `x` of row `k` of commitment `i`.
    pub ys: Vec<Vec<F>>,
    pub opening_proof: OpeningProof,
    pub random_coin: F,
    pub entry_list: Vec<usize>,
    /// Per commitment, whether leaves hash raw columns. Empty means all false.
    pub is_sis_replaced: Vec<bool>,
}

/// Shape problems found before any cryptographic check runs.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputsError {
    #[error("no commitment to check")]
    NoCommitments,
    #[error("{what}: got {got} entries for {expected} merkle roots")]
    CommitmentCount { what: &'static str, got: usize, expected: usize },
    #[error("linear combination has length {got}, expected {expected}")]
    LinearCombinationLength { got: usize, expected: usize },
    #[error("entry list is empty")]
    EmptyEntryList,
    #[error("entry {position} opens column {entry}, out of range for {bound} columns")]
    EntryOutOfRange { position: usize, entry: usize, bound: usize },
    #[error("commitment {commitment}: {what} has {got} entries, expected {expected}")]
    EntryCount { commitment: usize, what: &'static str, got: usize, expected: usize },
    #[error("commitment {commitment}: {got} claimed evaluations, expected 1..={max}")]
    YsLength { commitment: usize, got: usize, max: usize },
    #[error("commitment {commitment}, entry {entry}: sub-column has length {got}, expected {expected}")]
    SubColumnLength { commitment: usize, entry: usize, got: usize, expected: usize },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("invalid inputs: {0}")]
    InvalidInputs(#[from] InputsError),
    #[error("linear combination is not a codeword: {0}")]
    NotACodeword(#[from] CodewordError),
    #[error("opened column {column} (entry {entry}) is inconsistent with the linear combination")]
    LinearCombination { entry: usize, column: usize },
    #[error("claimed evaluations are inconsistent with the linear combination")]
    Statement,
    #[error("merkle proof of commitment {commitment}, entry {entry} does not verify")]
    MerkleInclusion { commitment: usize, entry: usize },
    #[error("merkle proof of commitment {commitment}, entry {entry} authenticates position {got}, expected {expected}")]
    MerklePosition { commitment: usize, entry: usize, expected: usize, got: usize },
}

/// Accept or reject one opening.
pub fn verify_opening(inputs: &VerifierInputs<'_>) -> Result<(), VerifyError> {
    check_structure(inputs)?;
    inputs.params.is_codeword(&inputs.opening_proof.linear_combination)?;
    check_column_linear_combination(inputs)?;
    check_statement(inputs)?;
    check_column_inclusion(inputs)?;
    Ok(())
}

fn check_structure(v: &VerifierInputs<'_>) -> Result<(), InputsError> {
    let p = v.params;
    let proof = &v.opening_proof;
    let nb = v.merkle_roots.len();
    if nb == 0 {
        return Err(InputsError::NoCommitments);
    }
    for (what, got) in [
        ("ys", v.ys.len()),
        ("columns", proof.columns.len()),
        ("merkle proofs", proof.merkle_proofs.len()),
    ] {
        if got != nb {
            return Err(InputsError::CommitmentCount { what, got, expected: nb });
        }
    }
    if !v.is_sis_replaced.is_empty() && v.is_sis_replaced.len() != nb {
        return Err(InputsError::CommitmentCount {
            what: "sis flags",
            got: v.is_sis_replaced.len(),
            expected: nb,
        });
    }

    let width = p.num_encoded_cols();
    let lc_len = proof.linear_combination.len();
    if lc_len != width {
        return Err(InputsError::LinearCombinationLength { got: lc_len, expected: width });
    }

    let nb_entries = v.entry_list.len();
    if nb_entries == 0 {
        return Err(InputsError::EmptyEntryList);
    }
    if let Some((position, &entry)) = v.entry_list.iter().enumerate().find(|(_, &e)| e >= width) {
        return Err(InputsError::EntryOutOfRange { position, entry, bound: width });
    }

    for i in 0..nb {
        if proof.columns[i].len() != nb_entries {
            return Err(InputsError::EntryCount {
                commitment: i,
                what: "columns",
                got: proof.columns[i].len(),
                expected: nb_entries,
            });
        }
        if proof.merkle_proofs[i].len() != nb_entries {
            return Err(InputsError::EntryCount {
                commitment: i,
                what: "merkle proofs",
                got: proof.merkle_proofs[i].len(),
                expected: nb_entries,
            });
        }
        let nb_rows = v.ys[i].len();
        if nb_rows == 0 || nb_rows > p.max_nb_rows {
            return Err(InputsError::YsLength { commitment: i, got: nb_rows, max: p.max_nb_rows });
        }
        if let Some((entry, col)) = proof.columns[i].iter().enumerate().find(|(_, c)| c.len() != nb_rows) {
            return Err(InputsError::SubColumnLength {
                commitment: i,
                entry,
                got: col.len(),
                expected: nb_rows,
            });
        }
    }
    Ok(())
}

fn check_column_linear_combination(v: &VerifierInputs<'_>) -> Result<(), VerifyError> {
    let proof = &v.opening_proof;
    let mut full_col = Vec::new();
    for (j, &column) in v.entry_list.iter().enumerate() {
        full_col.clear();
        for cols in &proof.columns {
            full_col.extend_from_slice(&cols[j]);
        }
        if eval_canonical(&full_col, v.random_coin) != proof.linear_combination.get(column) {
            return Err(VerifyError::LinearCombination { entry: j, column });
        }
    }
    Ok(())
}

fn check_statement(v: &VerifierInputs<'_>) -> Result<(), VerifyError> {
    let lc = v.opening_proof.linear_combination.to_dense();
    let lhs = interpolate_r(&lc, v.x).map_err(|_| InputsError::LinearCombinationLength {
        got: lc.len(),
        expected: v.params.num_encoded_cols(),
    })?;
    let joined: Vec<F> = v.ys.iter().flatten().copied().collect();
    if lhs != eval_canonical(&joined, v.random_coin) {
        return Err(VerifyError::Statement);
    }
    Ok(())
}

fn check_column_inclusion(v: &VerifierInputs<'_>) -> Result<(), VerifyError> {
    let p = v.params;
    let cfg = MerkleConfig { hash_func: p.leaf_hash, depth: p.merkle_depth() };
    let proof = &v.opening_proof;

    for (i, root) in v.merkle_roots.iter().enumerate() {
        let sis_replaced = v.is_sis_replaced.get(i).copied().unwrap_or(false);
        for (j, &entry) in v.entry_list.iter().enumerate() {
            let column = &proof.columns[i][j];
            let leaf = if sis_replaced {
                p.leaf_hash.hash_field_leaf(column)
            } else {
                // Column height was bounded by max_nb_rows above.
                let digest = p.key.hash_r(column).map_err(|_| InputsError::YsLength {
                    commitment: i,
                    got: column.len(),
                    max: p.max_nb_rows,
                })?;
                p.leaf_hash.hash_field_leaf(&digest)
            };

            let mp = &proof.merkle_proofs[i][j];
            if !merkle::verify(&cfg, &leaf, root, mp) {
                return Err(VerifyError::MerkleInclusion { commitment: i, entry: j });
            }
            if mp.path != entry {
                return Err(VerifyError::MerklePosition {
                    commitment: i,
                    entry: j,
                    expected: entry,
                    got: mp.path,
                });
            }
        }
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
