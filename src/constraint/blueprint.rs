//! Blueprints: the strategies that compress structured constraints into flat
//! `u32` calldata and back.
//!
//! The four reserved blueprints form a closed set, dispatched by tag through
//! the [`Blueprint`] enum. User modules can extend the set through
//! [`ExtensionBlueprint`]; registration order fixes ids, and ids are a
//! serialization contract.

use ark_ff::PrimeField;

use super::{
    CommitmentStatus, HintMapping, LinearExpression, R1C, SparseR1C, Term, COEFF_MINUS_ONE,
    COEFF_ONE,
};
use crate::error::{Error, Result};

/// Reserved id of [`GenericR1C`].
pub const BLUEPRINT_R1C: u32 = 0;
/// Reserved id of [`GenericSparseR1C`].
pub const BLUEPRINT_SPARSE_R1C: u32 = 1;
/// Reserved id of [`SparseR1CMul`].
pub const BLUEPRINT_SPARSE_R1C_MUL: u32 = 2;
/// Reserved id of [`GenericHint`].
pub const BLUEPRINT_HINT: u32 = 3;

/// Why a blueprint refused an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// The blueprint does not implement this capability.
    Unsupported,
    /// The calldata or structured form is malformed.
    Malformed(String),
}

pub type CapResult = std::result::Result<(), CapabilityError>;

impl CapabilityError {
    /// Attaches the blueprint id, producing the crate-level error.
    pub fn into_error(self, blueprint_id: u32) -> Error {
        let reason = match self {
            CapabilityError::Unsupported => "capability not implemented".to_string(),
            CapabilityError::Malformed(m) => m,
        };
        Error::InvalidEncoding {
            blueprint_id,
            reason,
        }
    }
}

/// The value-resolution interface handed to solvable blueprints. Field
/// arithmetic comes with `F` itself.
pub trait Solver<F: PrimeField> {
    /// Value of `coeff(cid) · wire(vid)`. Errors if the wire is still
    /// unassigned.
    fn get_value(&self, cid: u32, vid: u32) -> Result<F>;

    /// Value of a pooled coefficient.
    fn get_coeff(&self, cid: u32) -> F;

    /// Assigns a wire. Write-once: a second write with a different value is
    /// fatal.
    fn set_value(&mut self, vid: u32, value: F) -> Result<()>;
}

/// Open extension point for module-registered blueprints.
pub trait ExtensionBlueprint<F: PrimeField>: Send + Sync {
    /// Constant calldata word count, or −1 when the region is
    /// length-prefixed by its first word.
    fn nb_inputs(&self) -> i32;

    /// Number of constraints this blueprint contributes per instruction.
    fn nb_constraints(&self) -> u32;

    fn compress_sparse_r1c(&self, _c: &SparseR1C, _calldata: &mut Vec<u32>) -> CapResult {
        Err(CapabilityError::Unsupported)
    }

    fn decompress_sparse_r1c(&self, _calldata: &[u32], _into: &mut SparseR1C) -> CapResult {
        Err(CapabilityError::Unsupported)
    }

    /// Directly evaluates the instruction, reading only declared inputs and
    /// writing only declared outputs. `None` when not solvable.
    fn solve(&self, _solver: &mut dyn Solver<F>, _calldata: &[u32]) -> Option<Result<()>> {
        None
    }
}

/// The closed set of constraint shapes, plus the open extension escape hatch.
pub enum Blueprint<F: PrimeField> {
    GenericR1C(GenericR1C),
    GenericSparseR1C(GenericSparseR1C),
    SparseR1CMul(SparseR1CMul),
    GenericHint(GenericHint),
    Extension(Box<dyn ExtensionBlueprint<F>>),
}

impl<F: PrimeField> Blueprint<F> {
    pub fn nb_inputs(&self) -> i32 {
        match self {
            Blueprint::GenericR1C(_) => -1,
            Blueprint::GenericSparseR1C(_) => 10,
            Blueprint::SparseR1CMul(_) => 4,
            Blueprint::GenericHint(_) => -1,
            Blueprint::Extension(b) => b.nb_inputs(),
        }
    }

    pub fn nb_constraints(&self) -> u32 {
        match self {
            Blueprint::GenericR1C(_) => 1,
            Blueprint::GenericSparseR1C(_) => 1,
            Blueprint::SparseR1CMul(_) => 1,
            Blueprint::GenericHint(_) => 0,
            Blueprint::Extension(b) => b.nb_constraints(),
        }
    }

    /// Word count of the calldata region starting at `start`.
    pub fn calldata_len(&self, calldata: &[u32], start: usize) -> Result<usize> {
        let n = self.nb_inputs();
        let len = if n >= 0 {
            n as usize
        } else {
            *calldata.get(start).ok_or_else(|| Error::InvalidEncoding {
                blueprint_id: u32::MAX,
                reason: "length prefix out of bounds".to_string(),
            })? as usize
        };
        if start + len > calldata.len() {
            return Err(Error::InvalidEncoding {
                blueprint_id: u32::MAX,
                reason: format!("region {start}+{len} exceeds calldata"),
            });
        }
        Ok(len)
    }

    pub fn compress_r1c(&self, c: &R1C, calldata: &mut Vec<u32>) -> CapResult {
        match self {
            Blueprint::GenericR1C(b) => b.compress(c, calldata),
            _ => Err(CapabilityError::Unsupported),
        }
    }

    pub fn decompress_r1c(&self, calldata: &[u32], into: &mut R1C) -> CapResult {
        match self {
            Blueprint::GenericR1C(b) => b.decompress(calldata, into),
            _ => Err(CapabilityError::Unsupported),
        }
    }

    pub fn compress_sparse_r1c(&self, c: &SparseR1C, calldata: &mut Vec<u32>) -> CapResult {
        match self {
            Blueprint::GenericSparseR1C(b) => b.compress(c, calldata),
            Blueprint::SparseR1CMul(b) => b.compress(c, calldata),
            Blueprint::Extension(b) => b.compress_sparse_r1c(c, calldata),
            _ => Err(CapabilityError::Unsupported),
        }
    }

    pub fn decompress_sparse_r1c(&self, calldata: &[u32], into: &mut SparseR1C) -> CapResult {
        match self {
            Blueprint::GenericSparseR1C(b) => b.decompress(calldata, into),
            Blueprint::SparseR1CMul(b) => b.decompress(calldata, into),
            Blueprint::Extension(b) => b.decompress_sparse_r1c(calldata, into),
            _ => Err(CapabilityError::Unsupported),
        }
    }

    pub fn compress_hint(&self, h: &HintMapping, calldata: &mut Vec<u32>) -> CapResult {
        match self {
            Blueprint::GenericHint(b) => b.compress(h, calldata),
            _ => Err(CapabilityError::Unsupported),
        }
    }

    pub fn decompress_hint(&self, calldata: &[u32], into: &mut HintMapping) -> CapResult {
        match self {
            Blueprint::GenericHint(b) => b.decompress(calldata, into),
            _ => Err(CapabilityError::Unsupported),
        }
    }

    /// `None` when the blueprint is not directly evaluable.
    pub fn try_solve(&self, solver: &mut dyn Solver<F>, calldata: &[u32]) -> Option<Result<()>> {
        match self {
            Blueprint::SparseR1CMul(b) => Some(b.solve(solver, calldata)),
            Blueprint::Extension(b) => b.solve(solver, calldata),
            _ => None,
        }
    }

    pub fn is_hint(&self) -> bool {
        matches!(self, Blueprint::GenericHint(_))
    }
}

/// Registered blueprints, reserved ids first.
pub struct BlueprintRegistry<F: PrimeField> {
    items: Vec<Blueprint<F>>,
}

impl<F: PrimeField> Default for BlueprintRegistry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: PrimeField> BlueprintRegistry<F> {
    pub fn new() -> Self {
        BlueprintRegistry {
            items: vec![
                Blueprint::GenericR1C(GenericR1C),
                Blueprint::GenericSparseR1C(GenericSparseR1C),
                Blueprint::SparseR1CMul(SparseR1CMul),
                Blueprint::GenericHint(GenericHint),
            ],
        }
    }

    /// Registers a blueprint under the next id.
    pub fn register(&mut self, blueprint: Blueprint<F>) -> u32 {
        let id = self.items.len() as u32;
        self.items.push(blueprint);
        id
    }

    pub fn get(&self, id: u32) -> Result<&Blueprint<F>> {
        self.items.get(id as usize).ok_or(Error::InvalidEncoding {
            blueprint_id: id,
            reason: "unknown blueprint id".to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        false // the four reserved blueprints are always present
    }
}

/// Variable-arity rank-1 constraint.
///
/// Encoding: `[total, |L|, |R|, (cid,vid)…L, (cid,vid)…R, (cid,vid)…O]`.
/// `|O|` is recovered as `(total − 3)/2 − |L| − |R|`. The three term
/// sequences sit consecutively, so decoding can hand out views straight into
/// calldata; [`Term`]'s layout is pinned to a `(u32, u32)` pair for that.
pub struct GenericR1C;

impl GenericR1C {
    pub fn compress(&self, c: &R1C, calldata: &mut Vec<u32>) -> CapResult {
        let total = 3 + 2 * (c.l.len() + c.r.len() + c.o.len());
        calldata.reserve(total);
        calldata.push(total as u32);
        calldata.push(c.l.len() as u32);
        calldata.push(c.r.len() as u32);
        for t in c.l.iter().chain(&c.r).chain(&c.o) {
            calldata.push(t.cid);
            calldata.push(t.vid);
        }
        Ok(())
    }

    pub fn decompress(&self, calldata: &[u32], into: &mut R1C) -> CapResult {
        let (l, r, o) = Self::terms_view(calldata)?;
        into.l = l.to_vec();
        into.r = r.to_vec();
        into.o = o.to_vec();
        Ok(())
    }

    /// Reinterprets the three term sequences in place. Sound because `Term`
    /// is `#[repr(C)] (u32, u32)` with `u32` alignment (asserted at compile
    /// time next to its definition).
    pub fn terms_view(calldata: &[u32]) -> std::result::Result<(&[Term], &[Term], &[Term]), CapabilityError> {
        if calldata.len() < 3 {
            return Err(CapabilityError::Malformed("region shorter than header".into()));
        }
        let total = calldata[0] as usize;
        let nb_l = calldata[1] as usize;
        let nb_r = calldata[2] as usize;
        if total < 3 || total > calldata.len() || (total - 3) % 2 != 0 {
            return Err(CapabilityError::Malformed(format!("bad total word count {total}")));
        }
        let nb_terms = (total - 3) / 2;
        let nb_o = nb_terms
            .checked_sub(nb_l + nb_r)
            .ok_or_else(|| CapabilityError::Malformed("|L| + |R| exceeds term count".into()))?;
        let words = &calldata[3..total];
        let cast = |w: &[u32]| -> &[Term] {
            // Layout pinned by the const assertions on Term.
            unsafe { std::slice::from_raw_parts(w.as_ptr().cast::<Term>(), w.len() / 2) }
        };
        let l = cast(&words[..2 * nb_l]);
        let r = cast(&words[2 * nb_l..2 * (nb_l + nb_r)]);
        let o = cast(&words[2 * (nb_l + nb_r)..2 * (nb_l + nb_r + nb_o)]);
        Ok((l, r, o))
    }
}

/// The 10-word generic PLONK gate.
///
/// Encoding: `[L.vid, R.vid, O.vid, L.cid, R.cid, O.cid, M0.cid, M1.cid, K,
/// Commitment]`; the M wires are implicit (`M0 ↦ L`, `M1 ↦ R`).
pub struct GenericSparseR1C;

impl GenericSparseR1C {
    pub fn compress(&self, c: &SparseR1C, calldata: &mut Vec<u32>) -> CapResult {
        calldata.extend_from_slice(&[
            c.l.vid,
            c.r.vid,
            c.o.vid,
            c.l.cid,
            c.r.cid,
            c.o.cid,
            c.m[0].cid,
            c.m[1].cid,
            c.k,
            c.commitment as u32,
        ]);
        Ok(())
    }

    pub fn decompress(&self, calldata: &[u32], into: &mut SparseR1C) -> CapResult {
        if calldata.len() < 10 {
            return Err(CapabilityError::Malformed("expected 10 words".into()));
        }
        into.clear();
        into.l.vid = calldata[0];
        into.r.vid = calldata[1];
        into.o.vid = calldata[2];
        into.l.cid = calldata[3];
        into.r.cid = calldata[4];
        into.o.cid = calldata[5];
        into.m[0].cid = calldata[6];
        into.m[1].cid = calldata[7];
        into.m[0].vid = into.l.vid;
        into.m[1].vid = into.r.vid;
        into.k = calldata[8];
        into.commitment = CommitmentStatus::from_repr(calldata[9])
            .ok_or_else(|| CapabilityError::Malformed(format!("bad commitment tag {}", calldata[9])))?;
        Ok(())
    }
}

/// Fused multiplication gate, directly evaluable.
///
/// Encoding: `[M0.cid, M0.vid, M1.vid, O.vid]`; the output coefficient is
/// implicitly MINUS_ONE and `M1`'s coefficient implicitly ONE.
pub struct SparseR1CMul;

impl SparseR1CMul {
    pub fn compress(&self, c: &SparseR1C, calldata: &mut Vec<u32>) -> CapResult {
        calldata.extend_from_slice(&[c.m[0].cid, c.m[0].vid, c.m[1].vid, c.o.vid]);
        Ok(())
    }

    pub fn decompress(&self, calldata: &[u32], into: &mut SparseR1C) -> CapResult {
        if calldata.len() < 4 {
            return Err(CapabilityError::Malformed("expected 4 words".into()));
        }
        into.clear();
        into.m[0].cid = calldata[0];
        into.m[0].vid = calldata[1];
        into.m[1].cid = COEFF_ONE;
        into.m[1].vid = calldata[2];
        into.o.cid = COEFF_MINUS_ONE;
        into.o.vid = calldata[3];
        into.l.vid = into.m[0].vid;
        into.r.vid = into.m[1].vid;
        Ok(())
    }

    /// Sets the output wire to `qM·m0·m1 / (−qO)`. The division by the
    /// output coefficient is part of the gate semantics; under this encoding
    /// `qO` is pinned to MINUS_ONE so the quotient is exact.
    pub fn solve<F: PrimeField>(&self, s: &mut dyn Solver<F>, calldata: &[u32]) -> Result<()> {
        let m0 = s.get_value(calldata[0], calldata[1])?;
        let m1 = s.get_value(COEFF_ONE, calldata[2])?;
        let q_o = s.get_coeff(COEFF_MINUS_ONE);
        let res = m0 * m1 / -q_o;
        s.set_value(calldata[3], res)
    }
}

/// Variable-arity hint instruction, contributing no constraints.
///
/// Encoding: `[total, id_lo, id_hi, |inputs|, (|L_i|, (cid,vid)…)…,
/// output_vid…]`. The 64-bit hint id spans two words so the mapping
/// round-trips exactly; outputs fill whatever suffix remains.
pub struct GenericHint;

impl GenericHint {
    pub fn compress(&self, h: &HintMapping, calldata: &mut Vec<u32>) -> CapResult {
        let mut total = 4;
        for input in &h.inputs {
            total += 1 + 2 * input.len();
        }
        total += h.outputs.len();

        calldata.reserve(total);
        calldata.push(total as u32);
        calldata.push(h.hint_id as u32);
        calldata.push((h.hint_id >> 32) as u32);
        calldata.push(h.inputs.len() as u32);
        for input in &h.inputs {
            calldata.push(input.len() as u32);
            for t in input {
                calldata.push(t.cid);
                calldata.push(t.vid);
            }
        }
        calldata.extend_from_slice(&h.outputs);
        Ok(())
    }

    pub fn decompress(&self, calldata: &[u32], into: &mut HintMapping) -> CapResult {
        if calldata.len() < 4 {
            return Err(CapabilityError::Malformed("region shorter than header".into()));
        }
        let total = calldata[0] as usize;
        if total > calldata.len() {
            return Err(CapabilityError::Malformed("length prefix exceeds region".into()));
        }
        into.hint_id = calldata[1] as u64 | ((calldata[2] as u64) << 32);
        let nb_inputs = calldata[3] as usize;
        into.inputs.clear();
        into.outputs.clear();
        let mut j = 4;
        for _ in 0..nb_inputs {
            if j >= total {
                return Err(CapabilityError::Malformed("truncated input list".into()));
            }
            let n = calldata[j] as usize;
            j += 1;
            if j + 2 * n > total {
                return Err(CapabilityError::Malformed("truncated linear expression".into()));
            }
            let mut expr = LinearExpression::with_capacity(n);
            for _ in 0..n {
                expr.push(Term::new(calldata[j], calldata[j + 1]));
                j += 2;
            }
            into.inputs.push(expr);
        }
        while j < total {
            into.outputs.push(calldata[j]);
            j += 1;
        }
        Ok(())
    }
}
