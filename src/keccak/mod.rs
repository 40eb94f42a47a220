//! Keccak-256 over lookup-backed limbs: rate-1088 absorption, multi-round
//! unrolling with a multiplexed output, and the byte/bit helpers callers use
//! to prepare padded inputs.
//!
//! Inputs arrive as field variables each holding `in_bit_size` bits of the
//! pad10*1-padded message, little-endian within each byte; outputs leave the
//! same way. Range checking the inputs is the caller's business.

pub mod keccakf;

use ark_ff::PrimeField;

use crate::builder::{Builder, Variable};
use crate::error::{Error, Result};
use crate::limbs::{self, Limb, Limbs};
use crate::mux::multiplex;

pub use keccakf::{KeccakState, Keccakf};

/// Keccak-256 absorbs 1088 bits per permutation.
pub const RATE_BITS: usize = 1088;
pub const RATE_BYTES: usize = RATE_BITS / 8;
pub const DIGEST_BITS: usize = 256;

const LANE_BITS: usize = keccakf::LANE_BITS;
/// Lanes XORed with input during absorption.
const RATE_LANES: usize = RATE_BITS / LANE_BITS;
/// Lanes forming the 256-bit digest.
const DIGEST_LANES: usize = DIGEST_BITS / LANE_BITS;

/// The Keccak-256 gadget; wraps a [`Keccakf`] instance and its two lookup
/// tables, built once per circuit.
pub struct Keccak256<F: PrimeField> {
    f: Keccakf<F>,
    k: usize,
}

impl<F: PrimeField> Keccak256<F> {
    pub fn new(b: &mut Builder<F>, k: usize) -> Result<Self> {
        Ok(Keccak256 {
            f: Keccakf::new(b, k)?,
            k,
        })
    }

    pub fn permutation(&self) -> &Keccakf<F> {
        &self.f
    }

    /// Hashes `data`, a pad10*1-padded message presented as
    /// `max_rounds · (1088/in_bit_size)` variables of `in_bit_size` bits
    /// each. The circuit unrolls `max_rounds` absorb+permute steps;
    /// `round_index` (zero-based) selects which round's output is the
    /// digest, returned as `256/out_bit_size` variables.
    pub fn hash(
        &self,
        b: &mut Builder<F>,
        max_rounds: usize,
        in_bit_size: usize,
        out_bit_size: usize,
        round_index: &Variable<F>,
        data: &[Variable<F>],
    ) -> Result<Vec<Variable<F>>> {
        if max_rounds == 0 {
            return Err(Error::InvalidBitSize("max_rounds must be positive".to_string()));
        }
        for (what, size) in [("input", in_bit_size), ("output", out_bit_size)] {
            if size == 0 || RATE_BITS % size != 0 {
                return Err(Error::InvalidBitSize(format!(
                    "{what} variable size {size} must divide {RATE_BITS}"
                )));
            }
            if size > self.k || self.k % size != 0 {
                return Err(Error::InvalidBitSize(format!(
                    "{what} variable size {size} must divide the limb width {}",
                    self.k
                )));
            }
        }
        if DIGEST_BITS % out_bit_size != 0 {
            return Err(Error::InvalidBitSize(format!(
                "output variable size {out_bit_size} must divide {DIGEST_BITS}"
            )));
        }
        let round_size = RATE_BITS / in_bit_size;
        if data.len() != max_rounds * round_size {
            return Err(Error::InvalidBitSize(format!(
                "expected {} data variables for {max_rounds} rounds, got {}",
                max_rounds * round_size,
                data.len()
            )));
        }

        let mut states: Vec<KeccakState<F>> = vec![self.empty_state()];
        for round in 0..max_rounds {
            let block = &data[round * round_size..(round + 1) * round_size];
            let lanes = self.vars_to_lanes(b, block, in_bit_size)?;
            let next = self.absorb(b, &states[round], lanes)?;
            states.push(next);
        }

        if max_rounds == 1 {
            return self.lanes_to_vars(b, &states[1][..DIGEST_LANES], out_bit_size);
        }

        // one mux row per digest limb position, one column per round
        let nb_rows = DIGEST_LANES * (LANE_BITS / self.k);
        let mut matrix = vec![Vec::with_capacity(max_rounds); nb_rows];
        for state in &states[1..] {
            let mut row = 0;
            for lane in state.iter().take(DIGEST_LANES) {
                for limb in lane {
                    matrix[row].push(limb.val.clone());
                    row += 1;
                }
            }
        }
        let selected = multiplex(b, round_index, &matrix)?;

        let mut out = Vec::with_capacity(DIGEST_BITS / out_bit_size);
        for value in selected {
            let pieces = limbs::split(b, &Limb::new(value, self.k), out_bit_size, None)?;
            out.extend(limbs::values(&pieces));
        }
        Ok(out)
    }

    /// XORs a 17-lane block into the state and permutes.
    fn absorb(
        &self,
        b: &mut Builder<F>,
        state: &KeccakState<F>,
        block: [Limbs<F>; RATE_LANES],
    ) -> Result<KeccakState<F>> {
        let mut next = state.clone();
        for (lane, input) in next.iter_mut().take(RATE_LANES).zip(block) {
            *lane = self.f.xor2(b, lane, &input)?;
        }
        self.f.permute(b, next)
    }

    fn vars_to_lanes(
        &self,
        b: &mut Builder<F>,
        vars: &[Variable<F>],
        size: usize,
    ) -> Result<[Limbs<F>; RATE_LANES]> {
        let per_lane = LANE_BITS / size;
        let mut lanes = Vec::with_capacity(RATE_LANES);
        for i in 0..RATE_LANES {
            lanes.push(self.vars_to_lane(b, &vars[i * per_lane..(i + 1) * per_lane], size)?);
        }
        lanes
            .try_into()
            .map_err(|_| Error::InvalidBitSize("block does not fill 17 lanes".to_string()))
    }

    /// Packs `64/size` small variables into a lane of `64/k` limbs; the
    /// first variable lands in the most significant position of its limb.
    fn vars_to_lane(
        &self,
        b: &mut Builder<F>,
        vars: &[Variable<F>],
        size: usize,
    ) -> Result<Limbs<F>> {
        let per_limb = self.k / size;
        let mut lane = Limbs::with_capacity(LANE_BITS / self.k);
        for chunk in vars.chunks(per_limb) {
            let pieces: Limbs<F> = chunk
                .iter()
                .map(|v| Limb::new(v.clone(), size))
                .collect();
            lane.push(limbs::merge(b, &pieces)?);
        }
        Ok(lane)
    }

    fn lanes_to_vars(
        &self,
        b: &mut Builder<F>,
        lanes: &[Limbs<F>],
        size: usize,
    ) -> Result<Vec<Variable<F>>> {
        let mut out = Vec::new();
        for lane in lanes {
            for limb in lane {
                if limb.size != self.k {
                    return Err(Error::InvalidBitSize(format!(
                        "lane limb holds {} bits, expected {}",
                        limb.size, self.k
                    )));
                }
                let pieces = limbs::split(b, limb, size, None)?;
                out.extend(limbs::values(&pieces));
            }
        }
        Ok(out)
    }

    fn empty_state(&self) -> KeccakState<F> {
        std::array::from_fn(|_| {
            (0..LANE_BITS / self.k)
                .map(|_| Limb::constant(0, self.k))
                .collect()
        })
    }
}

/// Keccak pad10*1 at rate 136: append 0x01, zero-fill, XOR 0x80 into the last
/// byte of the block.
pub fn pad101_bytes(data: &[u8]) -> Vec<u8> {
    let mut missing = RATE_BYTES - data.len() % RATE_BYTES;
    if data.len() % RATE_BYTES == 0 {
        missing = RATE_BYTES;
    }
    let mut padded = data.to_vec();
    padded.push(1);
    padded.resize(data.len() + missing, 0);
    let last = padded.len() - 1;
    padded[last] ^= 0x80;
    padded
}

/// Bits of each byte, least significant first.
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for byte in bytes {
        for i in 0..8 {
            bits.push((byte >> i) & 1);
        }
    }
    bits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad101_pads_to_the_rate() {
        let padded = pad101_bytes(&[0xffu8; 33]);
        assert_eq!(padded.len(), RATE_BYTES);
        assert_eq!(padded[33], 1);
        assert_eq!(padded[RATE_BYTES - 1], 0x80);

        // a full block grows by a whole extra block
        let padded = pad101_bytes(&[0u8; RATE_BYTES]);
        assert_eq!(padded.len(), 2 * RATE_BYTES);
        assert_eq!(padded[RATE_BYTES], 1);
        assert_eq!(padded[2 * RATE_BYTES - 1], 0x80);
    }

    #[test]
    fn bits_are_little_endian_per_byte() {
        assert_eq!(bytes_to_bits(&[0b1000_0001]), vec![1, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(bytes_to_bits(&[0x02]), vec![0, 1, 0, 0, 0, 0, 0, 0]);
    }
}
