//! One-shot driver and proof files
//!
//! This module wraps the commitment core with a small, ergonomic surface:
//! - `prove` / `prove_with`: commit to a list of matrices, derive `X`, the
//!   random coin and the opened columns from a Fiat–Shamir transcript, and
//!   return a self-contained [`VortexProof`];
//! - `verify` / `verify_with`: replay the transcript with the verifier's own
//!   column count and leaf modes, then run [`verify_opening`];
//! - `io::write_proof` / `io::read_proof`: versioned proof files;
//! - `random_rows`: deterministic demo witnesses for the CLIs.

#![forbid(unsafe_code)]

use std::path::Path;

use ark_ff::UniformRand;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    domain::interpolate_r,
    merkle::Digest,
    params::Params,
    smartvectors::SmartVector,
    transcript::{FsLabel, Transcript},
    verifier::{verify_opening, OpeningProof, VerifierInputs},
    F,
};

/// Version of the [`VortexProof`] layout.
pub const PROOF_VERSION: u16 = 1;

const TRANSCRIPT_LABEL: &str = "vortex.opening";

/// Self-contained statement + opening for a list of committed matrices.
#[derive(Debug, Clone, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct VortexProof {
    pub version: u16,
    /// Fingerprint of the parameters the proof was made with.
    pub params_digest: Digest,
    pub merkle_roots: Vec<Digest>,
    pub is_sis_replaced: Vec<bool>,
    pub x: F,
    pub ys: Vec<Vec<F>>,
    pub opening_proof: OpeningProof,
}

fn absorb_commitments(t: &mut Transcript, params: &Params, roots: &[Digest], flags: &[bool]) {
    t.absorb_params(params);
    t.absorb_digests_l(FsLabel::MerkleRoots, roots);
    let flag_bytes: Vec<u8> = flags.iter().map(|&b| b as u8).collect();
    t.absorb_bytes_l(FsLabel::MerkleRoots, &flag_bytes);
}

/// Evaluate a row given in evaluation form on the small domain at `x`.
fn eval_row(row: &SmartVector, x: F) -> anyhow::Result<F> {
    match row.as_constant() {
        Some(c) => Ok(c),
        None => interpolate_r(&row.to_dense(), x)
            .map_err(|e| anyhow::anyhow!("evaluate row: {e}")),
    }
}

/// [`prove_with`] with SIS hashing for every matrix.
pub fn prove(
    params: &Params,
    matrices: &[Vec<SmartVector>],
    num_opened_columns: usize,
) -> anyhow::Result<VortexProof> {
    prove_with(params, matrices, &vec![false; matrices.len()], num_opened_columns)
}

/// Commit to `matrices` and open every row at a transcript-derived point.
///
/// `is_sis_replaced[i]` selects raw-column leaves for matrix `i`.
pub fn prove_with(
    params: &Params,
    matrices: &[Vec<SmartVector>],
    is_sis_replaced: &[bool],
    num_opened_columns: usize,
) -> anyhow::Result<VortexProof> {
    if matrices.is_empty() {
        anyhow::bail!("nothing to commit to");
    }
    if is_sis_replaced.len() != matrices.len() {
        anyhow::bail!(
            "got {} sis flags for {} matrices",
            is_sis_replaced.len(),
            matrices.len()
        );
    }
    if num_opened_columns == 0 {
        anyhow::bail!("at least one column must be opened");
    }

    let committed = matrices
        .iter()
        .zip(is_sis_replaced)
        .enumerate()
        .map(|(i, (rows, &plain))| {
            let c = if plain {
                params.commit_merkle_without_sis(rows)
            } else {
                params.commit_merkle_with_sis(rows)
            };
            c.map_err(|e| anyhow::anyhow!("commit matrix {i}: {e}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let merkle_roots: Vec<Digest> = committed.iter().map(|c| c.root()).collect();

    let mut t = Transcript::new(TRANSCRIPT_LABEL);
    absorb_commitments(&mut t, params, &merkle_roots, is_sis_replaced);
    let x = t.challenge_f_l(FsLabel::EvalPoint);

    let ys = matrices
        .iter()
        .map(|rows| rows.iter().map(|r| eval_row(r, x)).collect::<anyhow::Result<Vec<_>>>())
        .collect::<anyhow::Result<Vec<_>>>()?;
    t.absorb_ys(&ys);
    let coin = t.challenge_f_l(FsLabel::RandomCoin);

    let joined: Vec<SmartVector> = matrices.iter().flatten().cloned().collect();
    let mut opening_proof = params
        .open_r(&joined, coin)
        .map_err(|e| anyhow::anyhow!("open: {e}"))?;
    t.absorb_smart_vector_l(FsLabel::LinearCombination, &opening_proof.linear_combination);
    let entry_list =
        t.challenge_indices_l(FsLabel::EntryList, num_opened_columns, params.num_encoded_cols());
    opening_proof
        .complete_r(&entry_list, &committed)
        .map_err(|e| anyhow::anyhow!("complete opening: {e}"))?;

    tracing::debug!(
        commitments = merkle_roots.len(),
        rows = joined.len(),
        opened = num_opened_columns,
        "vortex proof ready"
    );

    Ok(VortexProof {
        version: PROOF_VERSION,
        params_digest: Digest(params.digest()),
        merkle_roots,
        is_sis_replaced: is_sis_replaced.to_vec(),
        x,
        ys,
        opening_proof,
    })
}

/// [`verify_with`] expecting SIS leaves for every commitment of the proof.
pub fn verify(params: &Params, proof: &VortexProof, num_opened_columns: usize) -> anyhow::Result<()> {
    verify_with(params, proof, &vec![false; proof.merkle_roots.len()], num_opened_columns)
}

/// Replay the transcript and check the opening.
///
/// The number of opened columns and the per-commitment leaf mode are the
/// verifier's choice; a proof disagreeing with either is rejected.
pub fn verify_with(
    params: &Params,
    proof: &VortexProof,
    is_sis_replaced: &[bool],
    num_opened_columns: usize,
) -> anyhow::Result<()> {
    if proof.version != PROOF_VERSION {
        anyhow::bail!("unsupported proof version: {}", proof.version);
    }
    if proof.params_digest.0 != params.digest() {
        anyhow::bail!("proof was produced for different parameters");
    }
    if num_opened_columns == 0 {
        anyhow::bail!("at least one column must be opened");
    }
    if proof.merkle_roots.len() != is_sis_replaced.len() {
        anyhow::bail!(
            "expected {} commitments, proof has {}",
            is_sis_replaced.len(),
            proof.merkle_roots.len()
        );
    }
    if proof.is_sis_replaced != is_sis_replaced {
        anyhow::bail!("proof leaf modes do not match the expected ones");
    }
    let opening = &proof.opening_proof;
    for (i, (cols, proofs)) in opening.columns.iter().zip(&opening.merkle_proofs).enumerate() {
        if cols.len() != num_opened_columns || proofs.len() != num_opened_columns {
            anyhow::bail!(
                "commitment {i}: opened {} columns and {} merkle proofs, expected {num_opened_columns}",
                cols.len(),
                proofs.len()
            );
        }
    }

    let mut t = Transcript::new(TRANSCRIPT_LABEL);
    absorb_commitments(&mut t, params, &proof.merkle_roots, is_sis_replaced);
    let x = t.challenge_f_l(FsLabel::EvalPoint);
    if x != proof.x {
        anyhow::bail!("evaluation point does not match the transcript");
    }
    t.absorb_ys(&proof.ys);
    let random_coin = t.challenge_f_l(FsLabel::RandomCoin);
    t.absorb_smart_vector_l(FsLabel::LinearCombination, &opening.linear_combination);
    let entry_list =
        t.challenge_indices_l(FsLabel::EntryList, num_opened_columns, params.num_encoded_cols());

    let inputs = VerifierInputs {
        params,
        merkle_roots: proof.merkle_roots.clone(),
        x,
        ys: proof.ys.clone(),
        opening_proof: opening.clone(),
        random_coin,
        entry_list,
        is_sis_replaced: is_sis_replaced.to_vec(),
    };
    verify_opening(&inputs).map_err(|e| {
        tracing::warn!(error = %e, "vortex proof rejected");
        anyhow::anyhow!("verification failed: {e}")
    })
}

/// Deterministic random witness: `nb_rows` rows of `nb_columns` elements.
pub fn random_rows(seed: u64, nb_rows: usize, nb_columns: usize) -> Vec<SmartVector> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..nb_rows)
        .map(|_| SmartVector::Regular((0..nb_columns).map(|_| F::rand(&mut rng)).collect()))
        .collect()
}

// ===============================================================================================
/* Proof I/O (magic + version + ark-compressed) */
// ===============================================================================================

pub mod io {
    use super::*;
    use std::fs;

    /// 8-byte magic used by the `prover` / `verifier` CLIs.
    pub const FILE_MAGIC: &[u8; 8] = b"VORTEXv1";
    pub const FILE_VERSION: u16 = 1;

    /// Write a proof file at `path`.
    pub fn write_proof(path: &Path, proof: &VortexProof) -> anyhow::Result<()> {
        let mut payload = Vec::new();
        proof
            .serialize_compressed(&mut payload)
            .map_err(|e| anyhow::anyhow!("serialize proof: {e}"))?;
        let mut f = fs::File::create(path)
            .map_err(|e| anyhow::anyhow!("create {}: {e}", path.display()))?;
        use std::io::Write;
        f.write_all(FILE_MAGIC)?;
        f.write_all(&FILE_VERSION.to_be_bytes())?;
        f.write_all(&payload)?;
        f.flush()?;
        Ok(())
    }

    /// Read a proof file from `path`.
    pub fn read_proof(path: &Path) -> anyhow::Result<VortexProof> {
        let mut f = fs::File::open(path)
            .map_err(|e| anyhow::anyhow!("open {}: {e}", path.display()))?;
        use std::io::Read;
        let mut magic = [0u8; 8];
        f.read_exact(&mut magic)?;
        if &magic != FILE_MAGIC {
            anyhow::bail!("bad proof file magic");
        }
        let mut ver = [0u8; 2];
        f.read_exact(&mut ver)?;
        let file_ver = u16::from_be_bytes(ver);
        if file_ver != FILE_VERSION {
            anyhow::bail!("unsupported proof file version: {file_ver}");
        }
        let mut payload = Vec::new();
        f.read_to_end(&mut payload)?;
        let proof = VortexProof::deserialize_compressed(payload.as_slice())
            .map_err(|e| anyhow::anyhow!("deserialize proof: {e}"))?;
        Ok(proof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::HashFunc;
    use crate::ringsis::SisParams;
    use ark_ff::One;

    fn params() -> Params {
        Params::new(2, 16, 8, SisParams::STD, HashFunc::Blake3)
    }

    fn matrices() -> Vec<Vec<SmartVector>> {
        let mut second = random_rows(2, 3, 16);
        second.push(SmartVector::constant(F::from(7u64), 16));
        vec![random_rows(1, 2, 16), second]
    }

    #[test]
    fn prove_then_verify() {
        let p = params();
        let proof = prove(&p, &matrices(), 6).unwrap();
        assert_eq!(proof.opening_proof.columns[0].len(), 6);
        verify(&p, &proof, 6).unwrap();

        let mixed = prove_with(&p, &matrices(), &[true, false], 4).unwrap();
        verify_with(&p, &mixed, &[true, false], 4).unwrap();
    }

    #[test]
    fn tampering_is_detected() {
        let p = params();
        let proof = prove(&p, &matrices(), 4).unwrap();

        let mut bad = proof.clone();
        bad.ys[1][0] += F::one();
        assert!(verify(&p, &bad, 4).is_err());

        let mut bad = proof.clone();
        bad.x += F::one();
        assert!(verify(&p, &bad, 4).is_err());

        let other = Params::new(2, 16, 16, SisParams::STD, HashFunc::Blake3);
        assert!(verify(&other, &proof, 4).is_err());
    }

    #[test]
    fn truncated_opening_is_rejected() {
        let p = params();
        let mut proof = prove(&p, &matrices(), 8).unwrap();
        for (cols, proofs) in proof
            .opening_proof
            .columns
            .iter_mut()
            .zip(proof.opening_proof.merkle_proofs.iter_mut())
        {
            cols.truncate(1);
            proofs.truncate(1);
        }
        assert!(verify(&p, &proof, 8).is_err());

        // An honest opening of 8 columns does not pass for another count.
        let honest = prove(&p, &matrices(), 8).unwrap();
        assert!(verify(&p, &honest, 1).is_err());
        assert!(verify(&p, &honest, 0).is_err());
    }

    #[test]
    fn leaf_modes_come_from_the_verifier() {
        let p = params();
        let plain = prove_with(&p, &matrices(), &[true, true], 4).unwrap();
        assert!(verify(&p, &plain, 4).is_err());
        assert!(verify_with(&p, &plain, &[true, false], 4).is_err());
        assert!(verify_with(&p, &plain, &[true], 4).is_err());
        verify_with(&p, &plain, &[true, true], 4).unwrap();

        // Relabelling the flags inside the proof does not help either.
        let mut relabelled = plain.clone();
        relabelled.is_sis_replaced = vec![false, false];
        assert!(verify(&p, &relabelled, 4).is_err());
    }

    #[test]
    fn rejects_degenerate_requests() {
        let p = params();
        assert!(prove(&p, &[], 4).is_err());
        assert!(prove(&p, &matrices(), 0).is_err());
        assert!(prove_with(&p, &matrices(), &[false], 4).is_err());
        assert!(prove(&p, &[random_rows(3, 9, 16)], 4).is_err());
    }

    #[test]
    fn proof_file_round_trip() {
        let p = params();
        let proof = prove(&p, &matrices(), 3).unwrap();
        let mut path = std::env::temp_dir();
        path.push(format!("vortex-proof-{}.bin", std::process::id()));

        io::write_proof(&path, &proof).unwrap();
        let back = io::read_proof(&path).unwrap();
        assert_eq!(back, proof);
        verify(&p, &back, 3).unwrap();

        std::fs::write(&path, b"NOTVORTEX").unwrap();
        assert!(io::read_proof(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
