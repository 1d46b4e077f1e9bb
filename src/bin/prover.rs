//! Minimal CLI prover
//!
//! Commits to deterministic random matrices, opens them at a Fiat–Shamir
//! point and writes a versioned proof file:
//!   magic: b"VORTEXv1" (8 bytes) + u16 version + ark-compressed `VortexProof`
//!
//! Flags:
//!   --config <path>   JSON parameter set (defaults when absent)
//!   --rows <a,b,..>   rows per committed matrix (default "4")
//!   --open <k>        number of opened columns (overrides the config)
//!   --seed <u64>      witness seed (default 42)
//!   --no-sis <bool>   commit with raw-column leaves (overrides the config)
//!   --proof <path>    output file (default "proof.bin")
//!
//! The verifier must be run with the same column count and leaf mode.

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
fn parse_row_counts(s: &str) -> anyhow::Result<Vec<usize>> {
    s.split(',')
        .map(|t| {
            t.trim()
                .parse::<usize>()
                .map_err(|_| anyhow::anyhow!("--rows expects a comma list of integers (got `{t}`)"))
        })
        .collect()
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "vortex=info".into()))
        .with_target(false)
        .compact()
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Vec<String> = env::args().collect();

    let cfg = match parse_flag(&args, "--config") {
        Some(p) => VortexConfig::load(Path::new(&p))
            .map_err(|e| anyhow::anyhow!("load config {p}: {e}"))?,
        None => VortexConfig::default(),
    };
    let row_counts = parse_row_counts(&parse_flag(&args, "--rows").unwrap_or_else(|| "4".into()))?;
    let k: usize = parse_flag(&args, "--open")
        .and_then(|s| s.parse().ok())
        .unwrap_or(cfg.num_opened_columns);
    let seed: u64 = parse_flag(&args, "--seed").and_then(|s| s.parse().ok()).unwrap_or(42);
    let no_sis = parse_flag(&args, "--no-sis").map(|s| parse_bool(&s)).unwrap_or(cfg.sis_replaced);
    let out = parse_flag(&args, "--proof").unwrap_or_else(|| "proof.bin".into());

    let params = cfg.to_params_r()?;
    eprintln!("Parameters:");
    eprintln!("  blow-up factor   : {}", params.blow_up_factor);
    eprintln!("  columns          : {} -> {}", params.nb_columns, params.num_encoded_cols());
    eprintln!("  max rows         : {}", params.max_nb_rows);
    eprintln!("  SIS (log bound, log degree): ({}, {})", cfg.sis.log_two_bound, cfg.sis.log_two_degree);
    eprintln!("  digest           : {}", hex::encode(params.digest()));

    let matrices: Vec<_> = row_counts
        .iter()
        .enumerate()
        .map(|(i, &n)| api::random_rows(seed.wrapping_add(i as u64), n, params.nb_columns))
        .collect();
    let flags = vec![no_sis; matrices.len()];

    let proof = api::prove_with(&params, &matrices, &flags, k)?;
    api::io::write_proof(Path::new(&out), &proof)?;

    eprintln!("Wrote proof to {out}");
    for (i, root) in proof.merkle_roots.iter().enumerate() {
        eprintln!("  root[{i}] = {root}");
    }
    Ok(())
}
