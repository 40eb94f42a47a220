//! Keccak-f[1600] over lookup-backed limbs.
//!
//! Each 64-bit lane is held as `64/k` limbs of `k` bits, bit-reversed
//! relative to the standard u64 lane value: the first limb covers the lane's
//! least-significant bits, most significant within the limb first. Under
//! that layout a standard `rotl(x, n)` becomes `lrot(x, 64 − n)`, and the
//! round constants are bit-reversed per word before being split.
//!
//! Bitwise operations reduce to per-position merge-then-lookup against two
//! constant tables: `xor[i·2ᵏ + j] = i ⊕ j` and
//! `chi[a·2²ᵏ + b·2ᵏ + c] = ((¬a) ∧ b) ⊕ c`.

use ark_ff::PrimeField;

use crate::builder::{Builder, Variable};
use crate::error::{Error, Result};
use crate::limbs::{self, Limb, Limbs};
use crate::lookup::LookupTable;

pub const ROUNDS: usize = 24;
pub const LANE_BITS: usize = 64;

/// The 25 lanes of the permutation state.
pub type KeccakState<F> = [Limbs<F>; 25];

/// Standard rotation offsets, in ρ-π traversal order.
const ROTC: [usize; 24] = [
    1, 3, 6, 10, 15, 21, 28, 36, 45, 55, 2, 14, 27, 41, 56, 8, 25, 43, 62, 18, 39, 61, 20, 44,
];

/// Standard lane permutation, in ρ-π traversal order.
const PILN: [usize; 24] = [
    10, 7, 11, 17, 18, 3, 5, 16, 8, 21, 24, 4, 15, 23, 19, 13, 12, 2, 20, 14, 22, 9, 6, 1,
];

/// The 24 standard round constants.
pub(crate) const RC: [u64; 24] = [
    0x0000000000000001,
    0x0000000000008082,
    0x800000000000808a,
    0x8000000080008000,
    0x000000000000808b,
    0x0000000080000001,
    0x8000000080008081,
    0x8000000000008009,
    0x000000000000008a,
    0x0000000000000088,
    0x0000000080008009,
    0x000000008000000a,
    0x000000008000808b,
    0x800000000000008b,
    0x8000000000008089,
    0x8000000000008003,
    0x8000000000008002,
    0x8000000000000080,
    0x000000000000800a,
    0x800000008000000a,
    0x8000000080008081,
    0x8000000000008080,
    0x0000000080000001,
    0x8000000080008008,
];

/// The Keccak-f permutation gadget. `k` is the limb width and sizes the two
/// lookup tables: `2^(2k)` xor rows and `2^(3k)` chi rows.
pub struct Keccakf<F: PrimeField> {
    k: usize,
    rc: [Limbs<F>; ROUNDS],
    xor_table: LookupTable,
    chi_table: LookupTable,
}

impl<F: PrimeField> Keccakf<F> {
    pub fn new(b: &mut Builder<F>, k: usize) -> Result<Self> {
        if !matches!(k, 2 | 4 | 8) {
            return Err(Error::InvalidBitSize(format!(
                "limb width {k} not supported, expected 2, 4 or 8"
            )));
        }
        let rc = std::array::from_fn(|round| const_lane::<F>(RC[round], k));
        Ok(Keccakf {
            k,
            rc,
            xor_table: build_xor_table(b, k),
            chi_table: build_chi_table(b, k),
        })
    }

    pub fn limb_width(&self) -> usize {
        self.k
    }

    /// Runs the 24 rounds on the given state.
    pub fn permute(&self, b: &mut Builder<F>, mut st: KeccakState<F>) -> Result<KeccakState<F>> {
        for round in 0..ROUNDS {
            // theta
            let mut bc: Vec<Limbs<F>> = Vec::with_capacity(5);
            for i in 0..5 {
                bc.push(self.xor(
                    b,
                    &[&st[i], &st[i + 5], &st[i + 10], &st[i + 15], &st[i + 20]],
                )?);
            }
            for i in 0..5 {
                let rotated = limbs::lrot(b, &bc[(i + 1) % 5], LANE_BITS - 1, self.k)?;
                let t = self.xor(b, &[&bc[(i + 4) % 5], &rotated])?;
                for j in (0..25).step_by(5) {
                    st[j + i] = self.xor2(b, &st[j + i], &t)?;
                }
            }

            // rho pi
            let mut t = st[1].clone();
            for i in 0..24 {
                let j = PILN[i];
                let displaced = st[j].clone();
                st[j] = limbs::lrot(b, &t, LANE_BITS - ROTC[i], self.k)?;
                t = displaced;
            }

            // chi
            for j in (0..25).step_by(5) {
                let row: Vec<Limbs<F>> = (0..5).map(|i| st[j + i].clone()).collect();
                for i in 0..5 {
                    st[j + i] = self.chi(b, &row[(i + 1) % 5], &row[(i + 2) % 5], &st[j + i])?;
                }
            }

            // iota
            let rc = self.rc[round].clone();
            st[0] = self.xor2(b, &st[0], &rc)?;
        }
        Ok(st)
    }

    /// Lane-wise XOR of two or more equally-shaped limb sequences.
    pub fn xor(&self, b: &mut Builder<F>, ins: &[&Limbs<F>]) -> Result<Limbs<F>> {
        if ins.len() < 2 {
            return Err(Error::InvalidBitSize("xor needs at least 2 inputs".to_string()));
        }
        let mut acc = ins[0].clone();
        for &other in &ins[1..] {
            acc = self.xor2(b, &acc, other)?;
        }
        Ok(acc)
    }

    /// Per-position XOR: merge each limb pair into `a·2ᵏ + b` and look the
    /// results up, one batched query list per lane.
    pub fn xor2(&self, b: &mut Builder<F>, x: &Limbs<F>, y: &Limbs<F>) -> Result<Limbs<F>> {
        if x.len() != y.len() {
            return Err(Error::InvalidBitSize(format!(
                "xor shape mismatch: {} vs {} limbs",
                x.len(),
                y.len()
            )));
        }
        let mut queries = Vec::with_capacity(x.len());
        for (a, bb) in x.iter().zip(y) {
            if a.size != bb.size {
                return Err(Error::InvalidBitSize(format!(
                    "xor limb size mismatch: {} vs {}",
                    a.size, bb.size
                )));
            }
            queries.push(limbs::merge(b, &[a.clone(), bb.clone()])?.val);
        }
        let looked_up = self.xor_table.lookup(b, &queries)?;
        Ok(looked_up
            .into_iter()
            .zip(x)
            .map(|(v, a)| Limb::new(v, a.size))
            .collect())
    }

    /// Per-position χ: `((¬a) ∧ b) ⊕ c` through the chi table, with the
    /// three limbs merged into `a·2²ᵏ + b·2ᵏ + c`, one batched query list per
    /// lane.
    fn chi(
        &self,
        b: &mut Builder<F>,
        x: &Limbs<F>,
        y: &Limbs<F>,
        z: &Limbs<F>,
    ) -> Result<Limbs<F>> {
        if x.len() != y.len() || x.len() != z.len() {
            return Err(Error::InvalidBitSize(format!(
                "chi shape mismatch: {} / {} / {} limbs",
                x.len(),
                y.len(),
                z.len()
            )));
        }
        let mut queries = Vec::with_capacity(x.len());
        for ((a, bb), c) in x.iter().zip(y).zip(z) {
            queries.push(limbs::merge(b, &[a.clone(), bb.clone(), c.clone()])?.val);
        }
        let looked_up = self.chi_table.lookup(b, &queries)?;
        Ok(looked_up
            .into_iter()
            .zip(x)
            .map(|(v, a)| Limb::new(v, a.size))
            .collect())
    }
}

/// A round constant as a constant lane: bit-reversed, then split into `k`-bit
/// limbs, most significant chunk first.
pub(crate) fn const_lane<F: PrimeField>(word: u64, k: usize) -> Limbs<F> {
    let reversed = word.reverse_bits();
    let mask = (1u64 << k) - 1;
    (0..LANE_BITS / k)
        .map(|i| {
            let shift = LANE_BITS - (i + 1) * k;
            Limb::constant((reversed >> shift) & mask, k)
        })
        .collect()
}

fn build_xor_table<F: PrimeField>(b: &mut Builder<F>, k: usize) -> LookupTable {
    let table = LookupTable::new(b);
    let count = 1usize << k;
    for i in 0..count {
        for j in 0..count {
            table.insert(b, Variable::Constant(F::from((i ^ j) as u64)));
        }
    }
    log::debug!("inserted {} entries into the xor table", count * count);
    table
}

fn build_chi_table<F: PrimeField>(b: &mut Builder<F>, k: usize) -> LookupTable {
    let table = LookupTable::new(b);
    let count = 1usize << k;
    for a in 0..count {
        for bb in 0..count {
            for c in 0..count {
                table.insert(
                    b,
                    Variable::Constant(F::from((((!a) & bb) ^ c) as u64)),
                );
            }
        }
    }
    log::debug!("inserted {} entries into the chi table", count * count * count);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::Fr;

    #[test]
    fn const_lane_reverses_and_chunks() {
        // RC[0] = 1: bit 0 set -> reversed has bit 63 set -> first 4-bit limb
        // is 0b1000
        let lane = const_lane::<Fr>(0x0000000000000001, 4);
        assert_eq!(lane.len(), 16);
        assert_eq!(lane[0].val.as_constant(), Some(Fr::from(0b1000u64)));
        for limb in &lane[1..] {
            assert_eq!(limb.val.as_constant(), Some(Fr::from(0u64)));
            assert_eq!(limb.size, 4);
        }
    }

    #[test]
    fn rotation_tables_are_the_standard_ones() {
        // rho offsets sum to 300 and pi is a permutation of 1..=24
        assert_eq!(ROTC.iter().sum::<usize>(), 300);
        let mut seen = [false; 25];
        for &p in &PILN {
            assert!(!seen[p]);
            seen[p] = true;
        }
        assert_eq!(seen.iter().filter(|&&s| s).count(), 24);
    }
}
