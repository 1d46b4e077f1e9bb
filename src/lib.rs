//! Crate root: public surface and core aliases
//!
//! Vortex is a list-polynomial commitment built from a Reed–Solomon code, a
//! ring-SIS column hash and a Merkle tree over column digests. The prover
//! commits to matrices of evaluations, claims the evaluations of every row at
//! a point `X`, and opens a few random columns together with the encoded
//! random linear combination of the rows.
//!
//! ## Layout
//!
//! - `domain`: radix-2 transforms, cosets, barycentric interpolation.
//! - `smartvectors`: constant / regular / rotated row representations.
//! - `ringsis`, `transversal`, `arena`: the SIS column hash and its batched
//!   form over an encoded matrix.
//! - `params`, `reedsolomon`: the shared parameter set and the code.
//! - `merkle`: the vector commitment over column digests.
//! - `prover`, `verifier`: commitment, opening and the opening check.
//! - `transcript`, `api`: the Fiat–Shamir driver and proof files.
//! - `config`: JSON parameter sets and environment tuning.
//!
//! The scalar field is `ark_bn254::Fr` throughout. All failures surface as
//! typed errors from the `*_r` entry points; the unsuffixed forms panic.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod domain;
pub mod smartvectors;
pub mod arena;
pub mod ringsis;
pub mod transversal;
pub mod params;
pub mod reedsolomon;
pub mod merkle;
pub mod prover;
pub mod verifier;
pub mod transcript;
pub mod config;
pub mod api;

/// Scalar field used across the crate.
pub type F = ark_bn254::Fr;

pub use crate::api::{prove, prove_with, verify, verify_with, VortexProof};
pub use crate::config::{Tuning, VortexConfig};
pub use crate::domain::{Domain, DomainError};
pub use crate::merkle::{Digest, HashFunc, MerkleProof, MerkleTree};
pub use crate::params::{Params, ParamsError};
pub use crate::prover::{CommitError, Committed};
pub use crate::ringsis::{Key, KeyGen, SisError, SisParams};
pub use crate::smartvectors::SmartVector;
pub use crate::verifier::{verify_opening, OpeningProof, VerifierInputs, VerifyError};
