//! The persisted layout of a constraint system:
//!
//! ```text
//! header: {version, field_id, n_public, n_secret, n_internal,
//!          n_instructions, calldata_len, n_coeffs}          8 × u32 LE
//! coeffs: n_coeffs × (length:u32, big-endian bytes)
//! calldata: calldata_len × u32 LE
//! instructions: n_instructions × (blueprint_id, start, c_off, w_off)
//! hints: one (wire_id:u32, hint_id:u64) per hint instruction
//! debug: optional (count:u32, count × (constraint_index, debug_id))
//! ```
//!
//! The four reserved coefficients and the constant-ONE wire are implicit and
//! never written, so an empty system is exactly the header. The hint section
//! has no count of its own: its length is the number of `GenericHint`
//! instructions in the stream.

use std::io::{Read, Write};

use ark_ff::PrimeField;
use num_bigint::BigUint;

use super::blueprint::BLUEPRINT_HINT;
use super::system::ConstraintSystem;
use super::Instruction;
use crate::error::{Error, Result};

/// Current wire-format version.
pub const FORMAT_VERSION: u32 = 1;

/// Number of coefficient ids that are implicit (never serialized).
const RESERVED_COEFFS: usize = 4;

/// Identifies the field by its modulus: FNV-1a over the big-endian modulus
/// bytes, truncated to 32 bits.
pub fn field_id(modulus: &BigUint) -> u32 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in modulus.to_bytes_be() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash as u32
}

impl<F: PrimeField> ConstraintSystem<F> {
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        let header = [
            FORMAT_VERSION,
            field_id(self.coeffs.modulus()),
            self.nb_public,
            self.nb_secret,
            self.nb_internal,
            self.instructions.len() as u32,
            self.calldata.len() as u32,
            (self.coeffs.len() - RESERVED_COEFFS) as u32,
        ];
        for word in header {
            write_u32(w, word)?;
        }

        for coeff in &self.coeffs.values()[RESERVED_COEFFS..] {
            let bytes = coeff.to_bytes_be();
            write_u32(w, bytes.len() as u32)?;
            w.write_all(&bytes).map_err(io_err)?;
        }

        for word in &self.calldata {
            write_u32(w, *word)?;
        }

        for instruction in &self.instructions {
            write_u32(w, instruction.blueprint_id)?;
            write_u32(w, instruction.start)?;
            write_u32(w, instruction.constraint_offset)?;
            write_u32(w, instruction.wire_offset)?;
        }

        for (wire_id, hint_id) in &self.hint_ids {
            write_u32(w, *wire_id)?;
            w.write_all(&hint_id.to_le_bytes()).map_err(io_err)?;
        }

        if !self.debug_map.is_empty() {
            write_u32(w, self.debug_map.len() as u32)?;
            for (constraint_index, debug_id) in &self.debug_map {
                write_u32(w, *constraint_index)?;
                write_u32(w, *debug_id)?;
            }
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let version = read_u32(r)?;
        if version != FORMAT_VERSION {
            return Err(Error::Message(format!(
                "unsupported format version {version}"
            )));
        }
        let mut cs = ConstraintSystem::<F>::new();
        let file_field = read_u32(r)?;
        let expected_field = field_id(cs.coeffs.modulus());
        if file_field != expected_field {
            return Err(Error::Message(format!(
                "field mismatch: file has {file_field:#010x}, expected {expected_field:#010x}"
            )));
        }
        cs.nb_public = read_u32(r)?;
        cs.nb_secret = read_u32(r)?;
        cs.nb_internal = read_u32(r)?;
        let nb_instructions = read_u32(r)? as usize;
        let calldata_len = read_u32(r)? as usize;
        let nb_coeffs = read_u32(r)? as usize;

        for _ in 0..nb_coeffs {
            let len = read_u32(r)? as usize;
            let mut bytes = vec![0u8; len];
            r.read_exact(&mut bytes).map_err(io_err)?;
            cs.coeffs.restore(BigUint::from_bytes_be(&bytes));
        }

        cs.calldata.reserve(calldata_len);
        for _ in 0..calldata_len {
            cs.calldata.push(read_u32(r)?);
        }

        let mut nb_hints = 0usize;
        for _ in 0..nb_instructions {
            let blueprint_id = read_u32(r)?;
            if blueprint_id as usize >= cs.blueprints.len() {
                return Err(Error::InvalidEncoding {
                    blueprint_id,
                    reason: "instruction references an unregistered blueprint".to_string(),
                });
            }
            if blueprint_id == BLUEPRINT_HINT {
                nb_hints += 1;
            }
            let instruction = Instruction {
                blueprint_id,
                start: read_u32(r)?,
                constraint_offset: read_u32(r)?,
                wire_offset: read_u32(r)?,
            };
            cs.nb_constraints = instruction.constraint_offset
                + cs.blueprints.get(blueprint_id)?.nb_constraints();
            cs.instructions.push(instruction);
        }

        for _ in 0..nb_hints {
            let wire_id = read_u32(r)?;
            let mut bytes = [0u8; 8];
            r.read_exact(&mut bytes).map_err(io_err)?;
            cs.hint_ids.push((wire_id, u64::from_le_bytes(bytes)));
        }

        // trailing optional debug map
        match try_read_u32(r)? {
            None => {}
            Some(count) => {
                for _ in 0..count {
                    let constraint_index = read_u32(r)?;
                    let debug_id = read_u32(r)?;
                    cs.debug_map.push((constraint_index, debug_id));
                }
            }
        }
        Ok(cs)
    }
}

fn io_err(e: std::io::Error) -> Error {
    Error::Message(format!("io: {e}"))
}

fn write_u32<W: Write>(w: &mut W, v: u32) -> Result<()> {
    w.write_all(&v.to_le_bytes()).map_err(io_err)
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut bytes = [0u8; 4];
    r.read_exact(&mut bytes).map_err(io_err)?;
    Ok(u32::from_le_bytes(bytes))
}

/// `None` on a clean EOF (the optional trailing section is absent).
fn try_read_u32<R: Read>(r: &mut R) -> Result<Option<u32>> {
    let mut bytes = [0u8; 4];
    let mut filled = 0;
    while filled < 4 {
        let n = r.read(&mut bytes[filled..]).map_err(io_err)?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(Error::Message("truncated debug section".to_string()));
        }
        filled += n;
    }
    Ok(Some(u32::from_le_bytes(bytes)))
}
