//! Compact row representations
//!
//! Committed rows are frequently constant (padding columns, selectors) or a
//! rotation of another row. `SmartVector` keeps those forms symbolic and only
//! densifies on demand, so the encoder can short-circuit constants and the
//! hashers can read columns without a full copy.

#![forbid(unsafe_code)]

use ark_ff::{One, Zero};
use ark_serialize::{
    CanonicalDeserialize, CanonicalSerialize, Compress, Read, SerializationError, Valid, Validate,
    Write,
};

use crate::F;

/// A length-`n` vector of field elements in one of three layouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmartVector {
    /// `len` copies of `value`.
    Constant { value: F, len: usize },
    /// Plain dense storage.
    Regular(Vec<F>),
    /// `get(i) = values[(i + offset) mod len]`.
    Rotated { values: Vec<F>, offset: usize },
}

impl SmartVector {
    /// Constant vector.
    pub fn constant(value: F, len: usize) -> Self {
        SmartVector::Constant { value, len }
    }

    /// Rotation of `values` by `offset` positions to the left.
    pub fn rotated(values: Vec<F>, offset: usize) -> Self {
        let offset = if values.is_empty() { 0 } else { offset % values.len() };
        SmartVector::Rotated { values, offset }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        match self {
            SmartVector::Constant { len, .. } => *len,
            SmartVector::Regular(v) => v.len(),
            SmartVector::Rotated { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry `i`, or `None` when out of range.
    pub fn try_get(&self, i: usize) -> Option<F> {
        match self {
            SmartVector::Constant { value, len } => (i < *len).then_some(*value),
            SmartVector::Regular(v) => v.get(i).copied(),
            SmartVector::Rotated { values, offset } => {
                if i >= values.len() {
                    return None;
                }
                Some(values[(i + offset) % values.len()])
            }
        }
    }

    /// Entry `i`. Panics when out of range, like slice indexing.
    pub fn get(&self, i: usize) -> F {
        match self.try_get(i) {
            Some(x) => x,
            None => panic!("smart vector index {i} out of range (len {})", self.len()),
        }
    }

    /// `Some(c)` if every entry is known to equal `c` without scanning.
    pub fn as_constant(&self) -> Option<F> {
        match self {
            SmartVector::Constant { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Copy the whole vector into `out` (`out.len()` must equal `self.len()`).
    pub fn write_into(&self, out: &mut [F]) {
        assert_eq!(out.len(), self.len(), "write_into: length mismatch");
        self.write_range(0, out);
    }

    /// Copy entries `start .. start + out.len()` into `out`.
    pub fn write_range(&self, start: usize, out: &mut [F]) {
        let end = start + out.len();
        assert!(end <= self.len(), "write_range: {start}..{end} exceeds len {}", self.len());
        match self {
            SmartVector::Constant { value, .. } => out.fill(*value),
            SmartVector::Regular(v) => out.copy_from_slice(&v[start..end]),
            SmartVector::Rotated { values, offset } => {
                let n = values.len();
                // Two contiguous runs at most.
                let first = (start + offset) % n;
                let run = (n - first).min(out.len());
                out[..run].copy_from_slice(&values[first..first + run]);
                if run < out.len() {
                    let rest = out.len() - run;
                    out[run..].copy_from_slice(&values[..rest]);
                }
            }
        }
    }

    /// Dense copy.
    pub fn to_dense(&self) -> Vec<F> {
        let mut out = vec![F::zero(); self.len()];
        self.write_into(&mut out);
        out
    }

    /// `Σ_k coin^k · rows[k]`. Stays constant if every row is constant.
    ///
    /// Panics on an empty list or on rows of different lengths.
    pub fn linear_combination(rows: &[SmartVector], coin: F) -> SmartVector {
        assert!(!rows.is_empty(), "linear_combination: no rows");
        let n = rows[0].len();
        assert!(
            rows.iter().all(|r| r.len() == n),
            "linear_combination: rows have different lengths"
        );

        if rows.iter().all(|r| r.as_constant().is_some()) {
            let mut acc = F::zero();
            let mut pow = F::one();
            for r in rows {
                acc += pow * r.as_constant().unwrap_or_default();
                pow *= coin;
            }
            return SmartVector::constant(acc, n);
        }

        let mut acc = vec![F::zero(); n];
        let mut scratch = vec![F::zero(); n];
        let mut pow = F::one();
        for r in rows {
            match r.as_constant() {
                Some(c) => {
                    let t = pow * c;
                    acc.iter_mut().for_each(|a| *a += t);
                }
                None => {
                    r.write_into(&mut scratch);
                    for (a, x) in acc.iter_mut().zip(scratch.iter()) {
                        *a += pow * x;
                    }
                }
            }
            pow *= coin;
        }
        SmartVector::Regular(acc)
    }
}

impl From<Vec<F>> for SmartVector {
    fn from(v: Vec<F>) -> Self {
        SmartVector::Regular(v)
    }
}

// ------------------------- Serialization -------------------------

const TAG_CONSTANT: u8 = 0;
const TAG_REGULAR: u8 = 1;
const TAG_ROTATED: u8 = 2;

impl CanonicalSerialize for SmartVector {
    fn serialize_with_mode<W: Write>(
        &self,
        mut w: W,
        cm: Compress,
    ) -> Result<(), SerializationError> {
        match self {
            SmartVector::Constant { value, len } => {
                w.write_all(&[TAG_CONSTANT])?;
                value.serialize_with_mode(&mut w, cm)?;
                (*len as u64).serialize_with_mode(&mut w, cm)?;
            }
            SmartVector::Regular(v) => {
                w.write_all(&[TAG_REGULAR])?;
                v.serialize_with_mode(&mut w, cm)?;
            }
            SmartVector::Rotated { values, offset } => {
                w.write_all(&[TAG_ROTATED])?;
                values.serialize_with_mode(&mut w, cm)?;
                (*offset as u64).serialize_with_mode(&mut w, cm)?;
            }
        }
        Ok(())
    }

    fn serialized_size(&self, cm: Compress) -> usize {
        1 + match self {
            SmartVector::Constant { value, .. } => value.serialized_size(cm) + 8,
            SmartVector::Regular(v) => v.serialized_size(cm),
            SmartVector::Rotated { values, .. } => values.serialized_size(cm) + 8,
        }
    }
}

impl CanonicalDeserialize for SmartVector {
    fn deserialize_with_mode<R: Read>(
        mut r: R,
        cm: Compress,
        validate: Validate,
    ) -> Result<Self, SerializationError> {
        let mut tag = [0u8; 1];
        r.read_exact(&mut tag)?;
        let out = match tag[0] {
            TAG_CONSTANT => {
                let value = F::deserialize_with_mode(&mut r, cm, validate)?;
                let len = u64::deserialize_with_mode(&mut r, cm, validate)?;
                SmartVector::Constant { value, len: len as usize }
            }
            TAG_REGULAR => SmartVector::Regular(Vec::<F>::deserialize_with_mode(&mut r, cm, validate)?),
            TAG_ROTATED => {
                let values = Vec::<F>::deserialize_with_mode(&mut r, cm, validate)?;
                let offset = u64::deserialize_with_mode(&mut r, cm, validate)? as usize;
                if !values.is_empty() && offset >= values.len() {
                    return Err(SerializationError::InvalidData);
                }
                SmartVector::Rotated { values, offset }
            }
            _ => return Err(SerializationError::InvalidData),
        };
        Ok(out)
    }
}

impl Valid for SmartVector {
    fn check(&self) -> Result<(), SerializationError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(x: u64) -> F {
        F::from(x)
    }

    #[test]
    fn rotated_reads_wrap_around() {
        let v = SmartVector::rotated((0..5).map(f).collect(), 3);
        assert_eq!(v.to_dense(), vec![f(3), f(4), f(0), f(1), f(2)]);

        let mut out = vec![F::zero(); 3];
        v.write_range(1, &mut out);
        assert_eq!(out, vec![f(4), f(0), f(1)]);
        assert_eq!(v.try_get(5), None);
    }

    #[test]
    #[should_panic]
    fn get_out_of_range_panics() {
        SmartVector::constant(f(1), 4).get(4);
    }

    #[test]
    fn linear_combination_of_constants_stays_constant() {
        let rows = vec![SmartVector::constant(f(2), 8), SmartVector::constant(f(5), 8)];
        let lc = SmartVector::linear_combination(&rows, f(3));
        assert_eq!(lc, SmartVector::constant(f(2 + 15), 8));
    }

    #[test]
    fn linear_combination_mixed_rows() {
        let rows = vec![
            SmartVector::Regular(vec![f(1), f(2)]),
            SmartVector::constant(f(10), 2),
            SmartVector::rotated(vec![f(7), f(9)], 1),
        ];
        let lc = SmartVector::linear_combination(&rows, f(2));
        // [1 + 20 + 4*9, 2 + 20 + 4*7]
        assert_eq!(lc.to_dense(), vec![f(57), f(50)]);
    }

    #[test]
    fn serialization_round_trip_keeps_layout() {
        let cases = vec![
            SmartVector::constant(f(9), 16),
            SmartVector::Regular(vec![f(1), f(2), f(3)]),
            SmartVector::rotated(vec![f(1), f(2), f(3), f(4)], 2),
        ];
        for v in cases {
            let mut bytes = Vec::new();
            v.serialize_compressed(&mut bytes).unwrap();
            assert_eq!(bytes.len(), v.compressed_size());
            let back = SmartVector::deserialize_compressed(&bytes[..]).unwrap();
            assert_eq!(back, v);
        }
    }

    #[test]
    fn rejects_unknown_tag() {
        assert!(SmartVector::deserialize_compressed(&[7u8][..]).is_err());
    }
}
