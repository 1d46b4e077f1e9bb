//! Column-batched ring-SIS hashing
//!
//! `transversal_hash` hashes every column of a row-major matrix. Columns are
//! split into chunks that run on the rayon pool; each worker owns an
//! [`Arena`] for its transpose window plus limb and polynomial scratch, so
//! workers never share mutable state and each writes a disjoint slice of the
//! output.

#![forbid(unsafe_code)]

use ark_ff::Zero;
use rayon::prelude::*;

use crate::arena::Arena;
use crate::ringsis::{write_limbs, Key, SisError};
use crate::smartvectors::SmartVector;
use crate::F;

/// Widest transpose window.
pub const MAX_WINDOW: usize = 16;

/// Transpose window for a chunk: the largest power of two dividing `chunk`,
/// capped at [`MAX_WINDOW`].
#[inline]
pub fn window_for_chunk(chunk: usize) -> usize {
    if chunk == 0 {
        return 1;
    }
    (1usize << chunk.trailing_zeros()).min(MAX_WINDOW)
}

struct Worker {
    arena: Arena<F>,
    limbs: Vec<F>,
    poly: Vec<F>,
}

impl Worker {
    fn new(key: &Key, nb_rows: usize, window: usize) -> Self {
        let d = key.output_size();
        Self {
            // transposed window + one row slice
            arena: Arena::new(window * nb_rows + window),
            limbs: vec![F::zero(); key.ag.len() * d],
            poly: vec![F::zero(); d],
        }
    }
}

impl Key {
    /// Hash every column of `rows`; digests are concatenated column by column
    /// (`nb_cols · output_size()` elements).
    pub fn transversal_hash_r(&self, rows: &[SmartVector]) -> Result<Vec<F>, SisError> {
        self.transversal_hash_chunked_r(rows, self.transversal_chunk)
    }

    /// Panicking wrapper around [`Key::transversal_hash_r`].
    pub fn transversal_hash(&self, rows: &[SmartVector]) -> Vec<F> {
        self.transversal_hash_r(rows).expect("invalid transversal hash input")
    }

    /// [`Key::transversal_hash_r`] with an explicit column chunk size.
    pub fn transversal_hash_chunked_r(
        &self,
        rows: &[SmartVector],
        chunk: usize,
    ) -> Result<Vec<F>, SisError> {
        let nb_rows = rows.len();
        if nb_rows == 0 {
            return Err(SisError::NoRows);
        }
        let max = self.max_num_field_to_hash();
        if nb_rows > max {
            return Err(SisError::TooManyElements { got: nb_rows, max });
        }
        let nb_cols = rows[0].len();
        if nb_cols == 0 {
            return Err(SisError::NoColumns);
        }
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != nb_cols) {
            return Err(SisError::RaggedRows { row, len: r.len(), expected: nb_cols });
        }

        // A chunk never spans more than the whole matrix.
        let chunk = chunk.clamp(1, nb_cols);
        let window = window_for_chunk(chunk);
        let d = self.output_size();
        let nl = self.num_limbs();
        let bound = self.gen.params.log_two_bound;

        tracing::debug!(nb_rows, nb_cols, chunk, window, "transversal hash");

        let mut out = vec![F::zero(); nb_cols * d];
        out.par_chunks_mut(chunk * d).enumerate().try_for_each_init(
            || Worker::new(self, nb_rows, window),
            |w, (ci, out_chunk)| -> Result<(), SisError> {
                let chunk_start = ci * chunk;
                let chunk_cols = out_chunk.len() / d;
                let mut c = 0;
                while c < chunk_cols {
                    let width = window.min(chunk_cols - c);
                    let mut scope = w.arena.reset();
                    let transposed = scope.get(width * nb_rows)?;
                    let row_buf = scope.get(width)?;

                    for (r, row) in rows.iter().enumerate() {
                        row.write_range(chunk_start + c, row_buf);
                        for (j, x) in row_buf.iter().enumerate() {
                            transposed[j * nb_rows + r] = *x;
                        }
                    }

                    for (j, column) in transposed.chunks_exact(nb_rows).enumerate() {
                        w.limbs.iter_mut().for_each(|l| *l = F::zero());
                        for (x, dst) in column.iter().zip(w.limbs.chunks_exact_mut(nl)) {
                            write_limbs(x, bound, dst);
                        }
                        let dst = &mut out_chunk[(c + j) * d..(c + j + 1) * d];
                        self.hash_limbs_into(&w.limbs, &mut w.poly, dst);
                    }
                    c += width;
                }
                Ok(())
            },
        )?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ringsis::{KeyGen, SisParams};
    use ark_ff::UniformRand;
    use rand::{rngs::StdRng, SeedableRng};

    fn random_rows(rng: &mut StdRng, nb_rows: usize, nb_cols: usize) -> Vec<SmartVector> {
        (0..nb_rows)
            .map(|_| SmartVector::Regular((0..nb_cols).map(|_| F::rand(rng)).collect()))
            .collect()
    }

    fn per_column(key: &Key, rows: &[SmartVector]) -> Vec<F> {
        let nb_cols = rows[0].len();
        (0..nb_cols)
            .flat_map(|c| {
                let col: Vec<F> = rows.iter().map(|r| r.get(c)).collect();
                key.hash(&col)
            })
            .collect()
    }

    #[test]
    fn window_is_capped_power_of_two_divisor() {
        assert_eq!(window_for_chunk(64), 16);
        assert_eq!(window_for_chunk(12), 4);
        assert_eq!(window_for_chunk(7), 1);
        assert_eq!(window_for_chunk(8), 8);
    }

    #[test]
    fn agrees_with_per_column_hash() {
        let mut rng = StdRng::seed_from_u64(21);
        let key = KeyGen::new(SisParams::STD, 6).generate();
        let mut rows = random_rows(&mut rng, 4, 37);
        rows.push(SmartVector::constant(F::from(5u64), 37));
        rows.push(SmartVector::rotated((0..37u64).map(F::from).collect(), 11));
        let want = per_column(&key, &rows);

        for chunk in [1usize, 3, 12, 64] {
            let got = key.transversal_hash_chunked_r(&rows, chunk).unwrap();
            assert_eq!(got, want, "chunk {chunk}");
        }
        assert_eq!(key.transversal_hash(&rows), want);
    }

    #[test]
    fn oversized_chunks_cover_the_whole_matrix() {
        let mut rng = StdRng::seed_from_u64(22);
        let key = KeyGen::new(SisParams::STD, 3).generate();
        let rows = random_rows(&mut rng, 3, 20);
        let want = per_column(&key, &rows);

        for chunk in [0usize, 20, 21, usize::MAX / 2, usize::MAX] {
            let got = key.transversal_hash_chunked_r(&rows, chunk).unwrap();
            assert_eq!(got, want, "chunk {chunk}");
        }
    }

    #[test]
    fn rejects_malformed_matrices() {
        let key = KeyGen::new(SisParams::STD, 2).generate();
        let row = SmartVector::Regular(vec![F::from(1u64); 4]);

        assert!(matches!(key.transversal_hash_r(&[]), Err(SisError::NoRows)));
        assert!(matches!(
            key.transversal_hash_r(&[row.clone(), row.clone(), row.clone()]),
            Err(SisError::TooManyElements { got: 3, max: 2 })
        ));
        assert!(matches!(
            key.transversal_hash_r(&[SmartVector::Regular(vec![])]),
            Err(SisError::NoColumns)
        ));
        assert!(matches!(
            key.transversal_hash_r(&[row, SmartVector::Regular(vec![F::from(1u64); 3])]),
            Err(SisError::RaggedRows { row: 1, len: 3, expected: 4 })
        ));
    }
}
