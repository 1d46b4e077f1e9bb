//! Fiat–Shamir transcript with domain separation
//!
//! A deterministic, label-stable Fiat–Shamir transform on BLAKE3. Every
//! absorb is prefixed by a fixed tag, a label and a byte length; challenges
//! are drawn from the XOF of a *clone* of the running state, so deriving a
//! challenge never consumes the absorb history.
//!
//! The opening protocol uses it in a fixed order:
//! parameters → Merkle roots → `X` → `Ys` → random coin → linear combination
//! → entry list.
//!
//! ```
//! use vortex::transcript::{FsLabel, Transcript};
//!
//! let mut t1 = Transcript::new("example");
//! t1.absorb_bytes_l(FsLabel::ProtocolHeader, b"hdr");
//! let a = t1.challenge_f_l(FsLabel::EvalPoint);
//!
//! let mut t2 = Transcript::new("example");
//! // Same data under a different label gives a different challenge.
//! t2.absorb_bytes_l(FsLabel::MerkleRoots, b"hdr");
//! let b = t2.challenge_f_l(FsLabel::EvalPoint);
//!
//! assert_ne!(a, b);
//! ```

#![forbid(unsafe_code)]

use ark_ff::PrimeField;
use ark_serialize::CanonicalSerialize;
use blake3::Hasher;

use crate::merkle::Digest;
use crate::params::Params;
use crate::smartvectors::SmartVector;
use crate::F;

/// Canonical labels shared by prover and verifier.
///
/// The strings are part of the transcript encoding: adding variants is fine,
/// renaming existing ones changes every challenge.
#[derive(Clone, Copy, Debug)]
pub enum FsLabel {
    ProtocolHeader,
    MerkleRoots,
    EvalPoint,
    Ys,
    RandomCoin,
    LinearCombination,
    EntryList,
}

impl FsLabel {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            FsLabel::ProtocolHeader => "protocol_header",
            FsLabel::MerkleRoots => "merkle_roots",
            FsLabel::EvalPoint => "eval_point",
            FsLabel::Ys => "ys",
            FsLabel::RandomCoin => "random_coin",
            FsLabel::LinearCombination => "linear_combination",
            FsLabel::EntryList => "entry_list",
        }
    }
}

/// BLAKE3 Fiat–Shamir transcript.
pub struct Transcript {
    label: &'static str,
    hasher: Hasher,
    /// Challenge derivation counter.
    ctr: u64,
}

impl Transcript {
    /// New transcript for the protocol instance named `label`.
    pub fn new(label: &'static str) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(b"VORTEX.transcript.v1");
        hasher.update(label.as_bytes());
        Self { label, hasher, ctr: 0 }
    }

    // ---------------------------- Absorb -----------------------------

    #[inline]
    pub fn absorb_bytes_l(&mut self, label: FsLabel, bytes: &[u8]) {
        self.absorb_bytes(label.as_str(), bytes)
    }

    /// Absorb a byte slice as one length-delimited item.
    pub fn absorb_bytes(&mut self, label: &'static str, bytes: &[u8]) {
        self.hasher.update(b"item:");
        self.hasher.update(label.as_bytes());
        self.hasher.update(b":len:");
        self.hasher.update(&(bytes.len() as u64).to_be_bytes());
        self.hasher.update(b":data:");
        self.hasher.update(bytes);
    }

    /// Absorb one field element (compressed canonical encoding).
    pub fn absorb_scalar_l(&mut self, label: FsLabel, f: &F) {
        let mut bytes = Vec::with_capacity(32);
        f.serialize_compressed(&mut bytes).expect("serialize field");
        self.absorb_bytes_l(label, &bytes);
    }

    /// Absorb a sequence of field elements as a single item:
    /// `u64(len) || Σ compressed(f_i)`.
    pub fn absorb_scalars_l(&mut self, label: FsLabel, fs: &[F]) {
        let mut bytes = Vec::with_capacity(8 + 32 * fs.len());
        bytes.extend_from_slice(&(fs.len() as u64).to_be_bytes());
        for f in fs {
            f.serialize_compressed(&mut bytes).expect("serialize field");
        }
        self.absorb_bytes_l(label, &bytes);
    }

    /// Absorb nested claims, keeping the per-commitment split.
    pub fn absorb_ys(&mut self, ys: &[Vec<F>]) {
        self.absorb_counter_l(FsLabel::Ys, ys.len() as u64);
        for y in ys {
            self.absorb_scalars_l(FsLabel::Ys, y);
        }
    }

    /// Absorb a list of 32-byte digests as a single item.
    pub fn absorb_digests_l(&mut self, label: FsLabel, ds: &[Digest]) {
        let mut bytes = Vec::with_capacity(8 + 32 * ds.len());
        bytes.extend_from_slice(&(ds.len() as u64).to_be_bytes());
        for d in ds {
            bytes.extend_from_slice(&d.0);
        }
        self.absorb_bytes_l(label, &bytes);
    }

    /// Absorb an encoded vector (layout tag included).
    pub fn absorb_smart_vector_l(&mut self, label: FsLabel, v: &SmartVector) {
        let mut bytes = Vec::with_capacity(v.compressed_size());
        v.serialize_compressed(&mut bytes).expect("serialize smart vector");
        self.absorb_bytes_l(label, &bytes);
    }

    #[inline]
    pub fn absorb_counter_l(&mut self, label: FsLabel, ctr: u64) {
        self.absorb_bytes_l(label, &ctr.to_be_bytes());
    }

    /// Bind the parameter fingerprint.
    pub fn absorb_params(&mut self, params: &Params) {
        self.absorb_bytes_l(FsLabel::ProtocolHeader, &params.digest());
    }

    // ---------------------------- Challenge -----------------------------

    #[inline]
    pub fn challenge_f_l(&mut self, label: FsLabel) -> F {
        self.challenge_f(label.as_str())
    }

    /// Derive one field challenge.
    pub fn challenge_f(&mut self, label: &'static str) -> F {
        let out = hash_to_field(&self.hasher, self.label, label, self.ctr, 1);
        self.ctr = self.ctr.wrapping_add(1);
        out[0]
    }

    /// Derive `k` field challenges.
    pub fn challenge_points_l(&mut self, label: FsLabel, k: usize) -> Vec<F> {
        let out = hash_to_field(&self.hasher, self.label, label.as_str(), self.ctr, k);
        self.ctr = self.ctr.wrapping_add(1);
        out
    }

    /// Derive `k` indices in `0..bound` (`bound` a power of two, so the
    /// reduction is unbiased). Repetitions are allowed.
    pub fn challenge_indices_l(&mut self, label: FsLabel, k: usize, bound: usize) -> Vec<usize> {
        assert!(bound.is_power_of_two(), "index bound must be a power of two");
        let mut h = challenge_state(&self.hasher, self.label, label.as_str(), self.ctr);
        h.update(b":indices");
        self.ctr = self.ctr.wrapping_add(1);

        let mut xof = h.finalize_xof();
        let mut buf = [0u8; 8];
        (0..k)
            .map(|_| {
                xof.fill(&mut buf);
                (u64::from_le_bytes(buf) as usize) & (bound - 1)
            })
            .collect()
    }
}

// ------------------------ Internals ------------------------

fn challenge_state(base: &Hasher, tlabel: &'static str, label: &'static str, ctr: u64) -> Hasher {
    let mut h = base.clone();
    h.update(b"challenge:");
    h.update(b"VORTEX.v1");
    h.update(b":tlabel:");
    h.update(tlabel.as_bytes());
    h.update(b":label:");
    h.update(label.as_bytes());
    h.update(b":ctr:");
    h.update(&ctr.to_be_bytes());
    h
}

/// `k` field elements from 64-byte XOF blocks reduced mod p.
fn hash_to_field(
    base: &Hasher,
    tlabel: &'static str,
    label: &'static str,
    ctr: u64,
    k: usize,
) -> Vec<F> {
    let mut xof = challenge_state(base, tlabel, label, ctr).finalize_xof();
    let mut buf = [0u8; 64];
    (0..k)
        .map(|_| {
            xof.fill(&mut buf);
            F::from_le_bytes_mod_order(&buf)
        })
        .collect()
}
