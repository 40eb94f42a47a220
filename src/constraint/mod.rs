//! The constraint-system intermediate representation.
//!
//! Constraints are packed into a shared `u32` calldata buffer and dispatched
//! through a small set of [blueprints](blueprint). The structured forms in
//! this module ([`R1C`], [`SparseR1C`], [`HintMapping`]) only exist at the
//! edges: the builder compresses them on emission and the solver decompresses
//! them (or reinterprets calldata in place) while walking the stream.

pub mod blueprint;
pub mod coeff;
pub mod serialize;
pub mod system;

use strum_macros::FromRepr;

/// Reserved coefficient id for zero.
pub const COEFF_ZERO: u32 = 0;
/// Reserved coefficient id for one.
pub const COEFF_ONE: u32 = 1;
/// Reserved coefficient id for two.
pub const COEFF_TWO: u32 = 2;
/// Reserved coefficient id for minus one.
pub const COEFF_MINUS_ONE: u32 = 3;

/// Number of bits of a wire id reserved for the visibility tag.
const VISIBILITY_BITS: u32 = 2;
/// Shift applied to the visibility tag inside a wire id.
const VISIBILITY_SHIFT: u32 = 32 - VISIBILITY_BITS;
/// Mask extracting the index part of a wire id.
const WIRE_INDEX_MASK: u32 = (1 << VISIBILITY_SHIFT) - 1;

/// Sentinel wire id marking a constant input in a hint mapping: the term
/// carries only its coefficient. Lives at the top of the Virtual space so it
/// can never collide with an allocated wire.
pub const CONSTANT_WIRE: u32 = u32::MAX;

/// Wire id of the reserved constant-ONE public wire.
pub const ONE_WIRE: u32 = 0;

/// Who supplies a wire's value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromRepr)]
#[repr(u32)]
pub enum Visibility {
    /// Supplied by the verifier (part of the statement).
    Public = 0,
    /// Supplied by the prover (part of the witness).
    Secret = 1,
    /// Assigned by the solver while walking the instruction stream.
    Internal = 2,
    /// Not part of the witness vector; reserved ids such as [`CONSTANT_WIRE`].
    Virtual = 3,
}

/// Packs a visibility tag and an index into a wire id.
pub fn pack_wire(visibility: Visibility, index: u32) -> u32 {
    debug_assert!(index <= WIRE_INDEX_MASK);
    ((visibility as u32) << VISIBILITY_SHIFT) | index
}

/// A `(coefficient id, wire id)` pair. The layout is pinned so that a pair of
/// consecutive calldata words can be reinterpreted as a `Term` without
/// copying; see [`blueprint::GenericR1C`].
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Term {
    pub cid: u32,
    pub vid: u32,
}

// Layout contract behind the zero-copy calldata views.
const _: () = assert!(core::mem::size_of::<Term>() == 2 * core::mem::size_of::<u32>());
const _: () = assert!(core::mem::align_of::<Term>() == core::mem::align_of::<u32>());

impl Term {
    pub fn new(cid: u32, vid: u32) -> Self {
        Term { cid, vid }
    }

    /// A term holding a bare constant (no wire).
    pub fn constant(cid: u32) -> Self {
        Term {
            cid,
            vid: CONSTANT_WIRE,
        }
    }

    /// Index part of the wire id.
    pub fn wire_index(&self) -> u32 {
        self.vid & WIRE_INDEX_MASK
    }

    /// Visibility tag of the wire id.
    pub fn visibility(&self) -> Visibility {
        Visibility::from_repr(self.vid >> VISIBILITY_SHIFT).expect("2-bit tag")
    }

    pub fn is_constant(&self) -> bool {
        self.vid == CONSTANT_WIRE
    }
}

/// An ordered sequence of terms, interpreted as `Σ cᵢ·wᵢ`. Insertion order is
/// preserved and is part of the canonical encoding.
pub type LinearExpression = Vec<Term>;

/// A rank-1 constraint `(Σ L)·(Σ R) = (Σ O)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct R1C {
    pub l: LinearExpression,
    pub r: LinearExpression,
    pub o: LinearExpression,
}

/// Whether a PLONK gate's output participates in a polynomial commitment.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromRepr)]
#[repr(u32)]
pub enum CommitmentStatus {
    #[default]
    NotCommitted = 0,
    Committed = 1,
    HasCommitment = 2,
}

/// A PLONK constraint `qL·L + qR·R + qO·O + qM·(M0·M1) + qK = 0`.
///
/// `M[0]` and `M[1]` always point at the L and R wires; only their
/// coefficients are free.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SparseR1C {
    pub l: Term,
    pub r: Term,
    pub o: Term,
    pub m: [Term; 2],
    /// Coefficient id of the constant term.
    pub k: u32,
    pub commitment: CommitmentStatus,
}

impl SparseR1C {
    /// Resets every field; decompression starts from a clean slate.
    pub fn clear(&mut self) {
        *self = SparseR1C::default();
    }
}

/// A non-deterministic advice mapping: the solver evaluates `inputs`, passes
/// them to the registered hint function, and writes the function's results
/// into `outputs`. The circuit constrains the results separately.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HintMapping {
    pub hint_id: u64,
    pub inputs: Vec<LinearExpression>,
    pub outputs: Vec<u32>,
}

/// A pointer into the instruction stream: which blueprint to dispatch to and
/// where its calldata region starts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub blueprint_id: u32,
    /// First calldata word of this instruction's region.
    pub start: u32,
    /// Number of constraints emitted by earlier instructions.
    pub constraint_offset: u32,
    /// Number of internal wires allocated before this instruction.
    pub wire_offset: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_packing_roundtrips() {
        for vis in [
            Visibility::Public,
            Visibility::Secret,
            Visibility::Internal,
            Visibility::Virtual,
        ] {
            let t = Term::new(COEFF_ONE, pack_wire(vis, 1234));
            assert_eq!(t.visibility(), vis);
            assert_eq!(t.wire_index(), 1234);
        }
    }

    #[test]
    fn constant_sentinel_is_virtual() {
        let t = Term::constant(COEFF_TWO);
        assert!(t.is_constant());
        assert_eq!(t.visibility(), Visibility::Virtual);
    }
}
