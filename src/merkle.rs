//! Binary Merkle tree over 32-byte digests
//!
//! Leaves and internal nodes are hashed under distinct one-byte tags
//! (`0x00` leaf, `0x01` node) so a node can never be replayed as a leaf.
//! The tree only accepts a power-of-two number of leaves; proofs carry the
//! authenticated leaf position (`path`) next to the sibling list so callers
//! can check it against the index they asked for.

#![forbid(unsafe_code)]

use std::fmt;

use ark_serialize::{
    CanonicalDeserialize, CanonicalSerialize, Compress, Read, SerializationError, Valid, Validate,
    Write,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::F;

const LEAF_TAG: u8 = 0x00;
const NODE_TAG: u8 = 0x01;

/// 32-byte hash output; also the commitment root.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Digest(pub [u8; 32]);

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", hex::encode(self.0))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl TryFrom<&[u8]> for Digest {
    type Error = MerkleError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| MerkleError::BadDigestLength(bytes.len()))?;
        Ok(Digest(arr))
    }
}

impl CanonicalSerialize for Digest {
    fn serialize_with_mode<W: Write>(
        &self,
        mut w: W,
        _cm: Compress,
    ) -> Result<(), SerializationError> {
        w.write_all(&self.0)?;
        Ok(())
    }
    fn serialized_size(&self, _cm: Compress) -> usize {
        32
    }
}
impl CanonicalDeserialize for Digest {
    fn deserialize_with_mode<R: Read>(
        mut r: R,
        _cm: Compress,
        _validate: Validate,
    ) -> Result<Self, SerializationError> {
        let mut b = [0u8; 32];
        r.read_exact(&mut b)?;
        Ok(Digest(b))
    }
}
impl Valid for Digest {
    fn check(&self) -> Result<(), SerializationError> {
        Ok(())
    }
}

/// Byte-oriented hash used for leaves and nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashFunc {
    #[default]
    Blake3,
    Sha256,
}

impl HashFunc {
    fn hash_tagged(&self, tag: u8, parts: &[&[u8]]) -> Digest {
        match self {
            HashFunc::Blake3 => {
                let mut h = blake3::Hasher::new();
                h.update(&[tag]);
                for p in parts {
                    h.update(p);
                }
                Digest(*h.finalize().as_bytes())
            }
            HashFunc::Sha256 => {
                let mut h = Sha256::new();
                h.update([tag]);
                for p in parts {
                    h.update(p);
                }
                Digest(h.finalize().into())
            }
        }
    }

    /// Leaf digest of raw bytes.
    pub fn hash_leaf(&self, data: &[u8]) -> Digest {
        self.hash_tagged(LEAF_TAG, &[data])
    }

    /// Leaf digest of field elements (compressed canonical encoding).
    pub fn hash_field_leaf(&self, elems: &[F]) -> Digest {
        let mut bytes = Vec::with_capacity(elems.len() * 32);
        for e in elems {
            e.serialize_compressed(&mut bytes).expect("serialize field");
        }
        self.hash_leaf(&bytes)
    }

    /// Parent digest of two children.
    pub fn hash_node(&self, left: &Digest, right: &Digest) -> Digest {
        self.hash_tagged(NODE_TAG, &[&left.0, &right.0])
    }
}

impl CanonicalSerialize for HashFunc {
    fn serialize_with_mode<W: Write>(
        &self,
        mut w: W,
        _cm: Compress,
    ) -> Result<(), SerializationError> {
        let byte = match self {
            HashFunc::Blake3 => 0u8,
            HashFunc::Sha256 => 1u8,
        };
        w.write_all(&[byte])?;
        Ok(())
    }
    fn serialized_size(&self, _cm: Compress) -> usize {
        1
    }
}
impl CanonicalDeserialize for HashFunc {
    fn deserialize_with_mode<R: Read>(
        mut r: R,
        _cm: Compress,
        _validate: Validate,
    ) -> Result<Self, SerializationError> {
        let mut b = [0u8; 1];
        r.read_exact(&mut b)?;
        match b[0] {
            0 => Ok(HashFunc::Blake3),
            1 => Ok(HashFunc::Sha256),
            _ => Err(SerializationError::InvalidData),
        }
    }
}
impl Valid for HashFunc {
    fn check(&self) -> Result<(), SerializationError> {
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("merkle tree needs at least one leaf")]
    Empty,
    #[error("leaf count must be a power of two (got {0})")]
    NotPowerOfTwo(usize),
    #[error("leaf index {index} out of range ({len} leaves)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("digest must be 32 bytes (got {0})")]
    BadDigestLength(usize),
}

/// Authentication path for one leaf.
#[derive(Debug, Clone, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct MerkleProof {
    /// Authenticated leaf position.
    pub path: usize,
    /// Siblings from the leaf level upwards.
    pub siblings: Vec<Digest>,
}

/// What a verifier needs to know about the tree shape.
#[derive(Debug, Clone, Copy)]
pub struct MerkleConfig {
    pub hash_func: HashFunc,
    pub depth: usize,
}

/// Fully materialized tree. `levels[0]` holds the leaves, the last level the root.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    hash_func: HashFunc,
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    pub fn build_r(leaves: Vec<Digest>, hash_func: HashFunc) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::Empty);
        }
        if !leaves.len().is_power_of_two() {
            return Err(MerkleError::NotPowerOfTwo(leaves.len()));
        }
        let mut levels = vec![leaves];
        while levels.last().map_or(0, Vec::len) > 1 {
            let prev = &levels[levels.len() - 1];
            let next = prev
                .chunks_exact(2)
                .map(|p| hash_func.hash_node(&p[0], &p[1]))
                .collect();
            levels.push(next);
        }
        Ok(Self { hash_func, levels })
    }

    pub fn root(&self) -> Digest {
        self.levels[self.levels.len() - 1][0]
    }

    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn num_leaves(&self) -> usize {
        self.levels[0].len()
    }

    pub fn hash_func(&self) -> HashFunc {
        self.hash_func
    }

    pub fn leaf(&self, pos: usize) -> Option<Digest> {
        self.levels[0].get(pos).copied()
    }

    pub fn prove_r(&self, pos: usize) -> Result<MerkleProof, MerkleError> {
        let len = self.num_leaves();
        if pos >= len {
            return Err(MerkleError::IndexOutOfRange { index: pos, len });
        }
        let mut idx = pos;
        let siblings = self.levels[..self.depth()]
            .iter()
            .map(|level| {
                let sib = level[idx ^ 1];
                idx >>= 1;
                sib
            })
            .collect();
        Ok(MerkleProof { path: pos, siblings })
    }
}

/// Check `proof` authenticates `leaf` under `root` in a tree of `cfg.depth`.
pub fn verify(cfg: &MerkleConfig, leaf: &Digest, root: &Digest, proof: &MerkleProof) -> bool {
    if proof.siblings.len() != cfg.depth {
        return false;
    }
    if cfg.depth < usize::BITS as usize && proof.path >> cfg.depth != 0 {
        return false;
    }
    let mut idx = proof.path;
    let mut cur = *leaf;
    for sib in &proof.siblings {
        cur = if idx & 1 == 0 {
            cfg.hash_func.hash_node(&cur, sib)
        } else {
            cfg.hash_func.hash_node(sib, &cur)
        };
        idx >>= 1;
    }
    cur == *root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: usize, h: HashFunc) -> Vec<Digest> {
        (0..n as u64).map(|i| h.hash_leaf(&i.to_le_bytes())).collect()
    }

    #[test]
    fn every_leaf_verifies() {
        for h in [HashFunc::Blake3, HashFunc::Sha256] {
            let ls = leaves(16, h);
            let tree = MerkleTree::build_r(ls.clone(), h).unwrap();
            let cfg = MerkleConfig { hash_func: h, depth: 4 };
            for (i, l) in ls.iter().enumerate() {
                let p = tree.prove_r(i).unwrap();
                assert_eq!(p.path, i);
                assert!(verify(&cfg, l, &tree.root(), &p));
            }
        }
    }

    #[test]
    fn rejects_wrong_leaf_position_or_depth() {
        let h = HashFunc::Blake3;
        let ls = leaves(8, h);
        let tree = MerkleTree::build_r(ls.clone(), h).unwrap();
        let cfg = MerkleConfig { hash_func: h, depth: 3 };
        let mut p = tree.prove_r(2).unwrap();

        assert!(!verify(&cfg, &ls[3], &tree.root(), &p));
        assert!(!verify(&MerkleConfig { depth: 4, ..cfg }, &ls[2], &tree.root(), &p));
        p.path = 3;
        assert!(!verify(&cfg, &ls[2], &tree.root(), &p));
        p.path = 10;
        assert!(!verify(&cfg, &ls[2], &tree.root(), &p));
    }

    #[test]
    fn single_leaf_tree() {
        let h = HashFunc::Sha256;
        let ls = leaves(1, h);
        let tree = MerkleTree::build_r(ls.clone(), h).unwrap();
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.root(), ls[0]);
        let p = tree.prove_r(0).unwrap();
        assert!(verify(&MerkleConfig { hash_func: h, depth: 0 }, &ls[0], &tree.root(), &p));
    }

    #[test]
    fn build_rejects_bad_leaf_counts() {
        assert_eq!(MerkleTree::build_r(vec![], HashFunc::Blake3).unwrap_err(), MerkleError::Empty);
        assert_eq!(
            MerkleTree::build_r(leaves(6, HashFunc::Blake3), HashFunc::Blake3).unwrap_err(),
            MerkleError::NotPowerOfTwo(6)
        );
    }

    #[test]
    fn leaf_and_node_domains_differ() {
        let h = HashFunc::Blake3;
        let a = h.hash_leaf(b"a");
        let mut joined = Vec::new();
        joined.extend_from_slice(&a.0);
        joined.extend_from_slice(&a.0);
        assert_ne!(h.hash_node(&a, &a), h.hash_leaf(&joined));
    }

    #[test]
    fn digest_from_slice_checks_length() {
        assert!(Digest::try_from(&[0u8; 31][..]).is_err());
        assert_eq!(Digest::try_from(&[7u8; 32][..]).unwrap(), Digest([7u8; 32]));
    }
}
