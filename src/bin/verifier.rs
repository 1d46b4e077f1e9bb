//! Minimal CLI verifier
//!
//! Reads a proof file written by `prover` and checks it against the
//! parameter set given by `--config` (defaults when absent).
//!
//! The number of opened columns and the leaf mode are taken from the config
//! (or the flags below), never from the proof.
//!
//! Flags:
//!   --config <path>   JSON parameter set
//!   --open <k>        number of opened columns (overrides the config)
//!   --no-sis <bool>   expect raw-column leaves (overrides the config)
//!   --proof <path>    proof file (default "proof.bin")

#![forbid(unsafe_code)]

use std::{env, path::Path};

use vortex::{api, VortexConfig};

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}
fn parse_bool(s: &str) -> bool {
    matches!(s, "1" | "true" | "True" | "TRUE" | "yes" | "y")
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "vortex=info".into()))
        .with_target(false)
        .compact()
        .init();
    let args: Vec<String> = env::args().collect();

    let cfg = match parse_flag(&args, "--config") {
        Some(p) => VortexConfig::load(Path::new(&p))
            .map_err(|e| anyhow::anyhow!("load config {p}: {e}"))?,
        None => VortexConfig::default(),
    };
    let k: usize = parse_flag(&args, "--open")
        .and_then(|s| s.parse().ok())
        .unwrap_or(cfg.num_opened_columns);
    let no_sis = parse_flag(&args, "--no-sis").map(|s| parse_bool(&s)).unwrap_or(cfg.sis_replaced);
    let path = parse_flag(&args, "--proof").unwrap_or_else(|| "proof.bin".into());

    let params = cfg.to_params_r()?;
    let proof = api::io::read_proof(Path::new(&path))?;
    eprintln!("Checking {} commitment(s), {k} opened column(s)", proof.merkle_roots.len());

    let flags = vec![no_sis; proof.merkle_roots.len()];
    api::verify_with(&params, &proof, &flags, k)?;
    println!("OK");
    Ok(())
}
