//! The constraint system: a coefficient pool, a blueprint registry, and an
//! instruction stream over a single monotonically-growing calldata buffer.
//!
//! Instructions are appended in construction order and never mutated. Wires
//! are defined by the first instruction that assigns them; any earlier
//! mention is a forward reference the solver resolves in stream order.

use ark_ff::PrimeField;
use num_bigint::BigUint;

use super::{
    blueprint::{Blueprint, BlueprintRegistry, BLUEPRINT_HINT, BLUEPRINT_R1C},
    coeff::CoeffPool,
    HintMapping, Instruction, R1C, SparseR1C,
};
use crate::error::{Error, Result};

pub struct ConstraintSystem<F: PrimeField> {
    pub coeffs: CoeffPool,
    pub blueprints: BlueprintRegistry<F>,
    pub instructions: Vec<Instruction>,
    pub calldata: Vec<u32>,
    /// User-declared public wires; the reserved constant-ONE wire is not
    /// counted.
    pub nb_public: u32,
    pub nb_secret: u32,
    pub nb_internal: u32,
    /// Running number of constraints across the stream.
    pub nb_constraints: u32,
    /// `(first output wire, hint id)` per hint instruction, in stream order.
    /// Lets deserialization validate the registry without re-decoding
    /// calldata.
    pub hint_ids: Vec<(u32, u64)>,
    /// Optional `constraint index → debug id` map.
    pub debug_map: Vec<(u32, u32)>,
    /// Messages referenced by the debug map.
    pub debug_messages: Vec<String>,
    pub public_names: Vec<String>,
    pub secret_names: Vec<String>,
}

impl<F: PrimeField> ConstraintSystem<F> {
    pub fn new() -> Self {
        let modulus: BigUint = F::MODULUS.into();
        ConstraintSystem {
            coeffs: CoeffPool::new(modulus),
            blueprints: BlueprintRegistry::new(),
            instructions: Vec::new(),
            calldata: Vec::new(),
            nb_public: 0,
            nb_secret: 0,
            nb_internal: 0,
            nb_constraints: 0,
            hint_ids: Vec::new(),
            debug_map: Vec::new(),
            debug_messages: Vec::new(),
            public_names: Vec::new(),
            secret_names: Vec::new(),
        }
    }

    /// Total number of witness slots: the ONE wire, then public, secret and
    /// internal wires.
    pub fn nb_wires(&self) -> usize {
        1 + (self.nb_public + self.nb_secret + self.nb_internal) as usize
    }

    /// Appends an instruction whose calldata `words` have already been
    /// compressed by `blueprint_id`.
    pub fn push_instruction(&mut self, blueprint_id: u32, words: &[u32]) -> u32 {
        let index = self.instructions.len() as u32;
        let start = self.calldata.len() as u32;
        self.calldata.extend_from_slice(words);
        let nb = self
            .blueprints
            .get(blueprint_id)
            .map(Blueprint::nb_constraints)
            .unwrap_or(0);
        self.instructions.push(Instruction {
            blueprint_id,
            start,
            constraint_offset: self.nb_constraints,
            wire_offset: self.nb_internal,
        });
        self.nb_constraints += nb;
        index
    }

    /// Compresses and appends a rank-1 constraint.
    pub fn add_r1c(&mut self, c: &R1C) -> Result<u32> {
        let mut words = Vec::new();
        self.blueprints
            .get(BLUEPRINT_R1C)?
            .compress_r1c(c, &mut words)
            .map_err(|e| e.into_error(BLUEPRINT_R1C))?;
        Ok(self.push_instruction(BLUEPRINT_R1C, &words))
    }

    /// Compresses and appends a PLONK constraint under the given blueprint
    /// (GenericSparseR1C, SparseR1CMul, or a registered extension).
    pub fn add_sparse_r1c(&mut self, c: &SparseR1C, blueprint_id: u32) -> Result<u32> {
        let mut words = Vec::new();
        self.blueprints
            .get(blueprint_id)?
            .compress_sparse_r1c(c, &mut words)
            .map_err(|e| e.into_error(blueprint_id))?;
        Ok(self.push_instruction(blueprint_id, &words))
    }

    /// Compresses and appends a hint mapping.
    pub fn add_hint(&mut self, h: &HintMapping) -> Result<u32> {
        let mut words = Vec::new();
        self.blueprints
            .get(BLUEPRINT_HINT)?
            .compress_hint(h, &mut words)
            .map_err(|e| e.into_error(BLUEPRINT_HINT))?;
        let first_output = h.outputs.first().copied().unwrap_or(u32::MAX);
        self.hint_ids.push((first_output, h.hint_id));
        Ok(self.push_instruction(BLUEPRINT_HINT, &words))
    }

    /// The calldata region of an instruction.
    pub fn region(&self, instruction: &Instruction) -> Result<&[u32]> {
        let bp = self.blueprints.get(instruction.blueprint_id)?;
        let start = instruction.start as usize;
        let len = bp.calldata_len(&self.calldata, start).map_err(|e| match e {
            Error::InvalidEncoding { reason, .. } => Error::InvalidEncoding {
                blueprint_id: instruction.blueprint_id,
                reason,
            },
            other => other,
        })?;
        Ok(&self.calldata[start..start + len])
    }

    /// Records a debug message and attaches it to the given constraint index.
    pub fn attach_debug(&mut self, constraint_index: u32, message: String) {
        let debug_id = self.debug_messages.len() as u32;
        self.debug_messages.push(message);
        self.debug_map.push((constraint_index, debug_id));
    }

    /// The debug message attached to a constraint, if any.
    pub fn debug_message(&self, constraint_index: u32) -> Option<&str> {
        self.debug_map
            .iter()
            .find(|(c, _)| *c == constraint_index)
            .map(|(_, id)| self.debug_messages[*id as usize].as_str())
    }
}

impl<F: PrimeField> Default for ConstraintSystem<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{pack_wire, Term, Visibility, COEFF_ONE};
    use ark_bn254::Fr;

    #[test]
    fn instruction_offsets_accumulate() {
        let mut cs = ConstraintSystem::<Fr>::new();
        let c = R1C {
            l: vec![Term::new(COEFF_ONE, pack_wire(Visibility::Internal, 0))],
            r: vec![Term::new(COEFF_ONE, pack_wire(Visibility::Internal, 1))],
            o: vec![Term::new(COEFF_ONE, pack_wire(Visibility::Internal, 2))],
        };
        cs.nb_internal = 3;
        cs.add_r1c(&c).unwrap();
        cs.add_r1c(&c).unwrap();
        let h = HintMapping {
            hint_id: 42,
            inputs: vec![vec![Term::new(COEFF_ONE, pack_wire(Visibility::Internal, 0))]],
            outputs: vec![pack_wire(Visibility::Internal, 3)],
        };
        cs.add_hint(&h).unwrap();

        assert_eq!(cs.instructions.len(), 3);
        assert_eq!(cs.instructions[0].constraint_offset, 0);
        assert_eq!(cs.instructions[1].constraint_offset, 1);
        assert_eq!(cs.instructions[2].constraint_offset, 2);
        assert_eq!(cs.nb_constraints, 2);
        assert_eq!(cs.hint_ids, vec![(pack_wire(Visibility::Internal, 3), 42)]);

        // regions point back at the exact words that were compressed
        let r0 = cs.region(&cs.instructions[0]).unwrap();
        assert_eq!(r0[0] as usize, r0.len());
        let r2 = cs.region(&cs.instructions[2]).unwrap();
        assert_eq!(r2[0] as usize, r2.len());
    }
}
