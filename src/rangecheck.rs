//! Lookup-backed range checks.
//!
//! `check(v, nb_bits)` decomposes `v` into 8-bit chunks, proves each chunk is
//! a member of a precomputed `[0, 256)` table, and binds the weighted sum
//! back to `v`. The fixed 8-bit width keeps the table small whatever the
//! checked widths are; a partial top chunk is additionally checked shifted so
//! it cannot exceed its remainder width.

use ark_ff::PrimeField;

use crate::builder::{Builder, Variable};
use crate::error::Result;
use crate::hints::RANGE_DECOMPOSE_HINT;
use crate::limbs::pow2;
use crate::lookup::LookupTable;

/// Width of the membership table, in bits.
const CHUNK_BITS: usize = 8;

pub struct RangeChecker {
    table: LookupTable,
}

impl RangeChecker {
    /// Builds the `[0, 2^8)` table once; all checks share it.
    pub fn new<F: PrimeField>(b: &mut Builder<F>) -> Self {
        let table = LookupTable::new(b);
        for i in 0..(1u64 << CHUNK_BITS) {
            table.insert(b, Variable::Constant(F::from(i)));
        }
        RangeChecker { table }
    }

    /// Asserts that `v` holds at most `nb_bits` bits.
    pub fn check<F: PrimeField>(
        &self,
        b: &mut Builder<F>,
        v: &Variable<F>,
        nb_bits: usize,
    ) -> Result<()> {
        if nb_bits == 0 {
            return b.assert_is_equal(v, &Variable::zero());
        }
        let nb_chunks = nb_bits.div_ceil(CHUNK_BITS);
        let rem = nb_bits % CHUNK_BITS;

        let inputs = [
            v.clone(),
            Variable::Constant(F::from(nb_bits as u64)),
            Variable::Constant(F::from(CHUNK_BITS as u64)),
        ];
        let chunks = b.new_hint(RANGE_DECOMPOSE_HINT, nb_chunks, &inputs)?;

        // Σ 2^(8i)·chunkᵢ = v
        let mut acc = Variable::zero();
        for (i, chunk) in chunks.iter().enumerate() {
            let scaled = b.scale(chunk, pow2::<F>(i * CHUNK_BITS));
            acc = b.add(&acc, &scaled);
        }
        b.assert_is_equal(&acc, v)?;

        // membership of every chunk; the top chunk is also checked shifted
        // into the full width so it fits its remainder bits
        let mut queries = chunks.clone();
        if rem != 0 {
            let top = &chunks[nb_chunks - 1];
            queries.push(b.scale(top, pow2::<F>(CHUNK_BITS - rem)));
        }
        self.table.lookup(b, &queries)?;
        Ok(())
    }
}
