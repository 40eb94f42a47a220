//! Witness resolution: walks the instruction stream in emission order,
//! executing hints, directly-solvable blueprints, and single-unknown
//! constraint solving, then verifies every fully-determined constraint.
//!
//! Wire assignment is write-once. Instructions whose inputs are forward
//! references are skipped and retried in later passes; a pass without
//! progress reports the first wire nobody can determine.
//!
//! The parallel mode levels instructions by their read/write sets at compile
//! time and runs each level on the rayon pool with a barrier in between; the
//! observable final state is identical to the sequential run.

use std::collections::HashMap;

use ark_ff::PrimeField;
use num_bigint::BigUint;
use rayon::prelude::*;

use crate::builder::Variable;
use crate::constraint::{
    blueprint::{Blueprint, GenericR1C, Solver},
    system::ConstraintSystem,
    HintMapping, SparseR1C, Term, Visibility, COEFF_ZERO, ONE_WIRE,
};
use crate::error::{Error, Result};
use crate::hints::HintRegistry;

/// The resolved wire assignment.
#[derive(Debug)]
pub struct Witness<F: PrimeField> {
    values: Vec<F>,
    coeffs: Vec<F>,
    nb_public: u32,
    nb_secret: u32,
}

impl<F: PrimeField> Witness<F> {
    /// Value of a single wire.
    pub fn wire(&self, vid: u32) -> F {
        let t = Term::new(0, vid);
        self.values[slot(t, self.nb_public, self.nb_secret).expect("witness wire")]
    }

    /// Evaluates a builder variable against the assignment.
    pub fn eval(&self, v: &Variable<F>) -> F {
        match v {
            Variable::Constant(c) => *c,
            Variable::Linear(terms) => terms.iter().fold(F::zero(), |acc, t| {
                if t.is_constant() {
                    acc + self.coeffs[t.cid as usize]
                } else {
                    acc + self.coeffs[t.cid as usize] * self.wire(t.vid)
                }
            }),
        }
    }

    pub fn values(&self) -> &[F] {
        &self.values
    }
}

/// Sequential solve.
pub fn solve<F: PrimeField>(
    cs: &ConstraintSystem<F>,
    hints: &HintRegistry,
    public: &[F],
    secret: &[F],
) -> Result<Witness<F>> {
    Engine::new(cs, hints, public, secret)?.run_sequential()
}

/// Parallel solve over statically-leveled instruction groups.
pub fn solve_parallel<F: PrimeField>(
    cs: &ConstraintSystem<F>,
    hints: &HintRegistry,
    public: &[F],
    secret: &[F],
) -> Result<Witness<F>> {
    Engine::new(cs, hints, public, secret)?.run_parallel()
}

/// Maps a wire id to its slot in the value vector:
/// `[ONE | public… | secret… | internal…]`.
fn slot(t: Term, nb_public: u32, nb_secret: u32) -> Result<usize> {
    let idx = t.wire_index();
    match t.visibility() {
        Visibility::Public => Ok(idx as usize),
        Visibility::Secret => Ok((1 + nb_public + idx) as usize),
        Visibility::Internal => Ok((1 + nb_public + nb_secret + idx) as usize),
        Visibility::Virtual => Err(Error::Message(format!(
            "virtual wire {} has no witness slot",
            t.vid
        ))),
    }
}

/// What executing one instruction produced.
enum Outcome<F> {
    /// Wire writes to apply at the barrier.
    Done(Vec<(u32, F)>),
    /// Not enough known wires yet; retry in a later pass.
    Skip,
}

struct Engine<'a, F: PrimeField> {
    cs: &'a ConstraintSystem<F>,
    hints: &'a HintRegistry,
    coeffs: Vec<F>,
    values: Vec<Option<F>>,
    modulus: BigUint,
}

impl<'a, F: PrimeField> Engine<'a, F> {
    fn new(
        cs: &'a ConstraintSystem<F>,
        hints: &'a HintRegistry,
        public: &[F],
        secret: &[F],
    ) -> Result<Self> {
        if public.len() != cs.nb_public as usize {
            return Err(Error::Message(format!(
                "expected {} public inputs, got {}",
                cs.nb_public,
                public.len()
            )));
        }
        if secret.len() != cs.nb_secret as usize {
            return Err(Error::Message(format!(
                "expected {} secret inputs, got {}",
                cs.nb_secret,
                secret.len()
            )));
        }
        let mut values = vec![None; cs.nb_wires()];
        values[0] = Some(F::one());
        for (i, v) in public.iter().enumerate() {
            values[1 + i] = Some(*v);
        }
        for (i, v) in secret.iter().enumerate() {
            values[1 + public.len() + i] = Some(*v);
        }
        let coeffs = cs
            .coeffs
            .values()
            .iter()
            .map(|b| F::from(b.clone()))
            .collect();
        Ok(Engine {
            cs,
            hints,
            coeffs,
            values,
            modulus: cs.coeffs.modulus().clone(),
        })
    }

    fn wire(&self, vid: u32) -> Result<Option<F>> {
        if vid == ONE_WIRE {
            return Ok(Some(F::one()));
        }
        let s = slot(Term::new(0, vid), self.cs.nb_public, self.cs.nb_secret)?;
        Ok(self.values.get(s).copied().flatten())
    }

    /// `coeff · wire`, or the bare coefficient for constant terms. `None`
    /// while the wire is unassigned.
    fn eval_term(&self, t: &Term) -> Result<Option<F>> {
        if t.is_constant() {
            return Ok(Some(self.coeffs[t.cid as usize]));
        }
        Ok(self
            .wire(t.vid)?
            .map(|v| self.coeffs[t.cid as usize] * v))
    }

    fn eval_linexp(&self, terms: &[Term]) -> Result<Option<F>> {
        let mut acc = F::zero();
        for t in terms {
            match self.eval_term(t)? {
                Some(v) => acc += v,
                None => return Ok(None),
            }
        }
        Ok(Some(acc))
    }

    fn apply(&mut self, writes: Vec<(u32, F)>) -> Result<()> {
        for (vid, value) in writes {
            let s = slot(Term::new(0, vid), self.cs.nb_public, self.cs.nb_secret)?;
            match self.values[s] {
                None => self.values[s] = Some(value),
                Some(existing) if existing == value => {}
                Some(_) => return Err(Error::DoubleAssignment { wire_id: vid }),
            }
        }
        Ok(())
    }

    //
    // per-instruction execution (read-only; writes go through Outcome)
    //

    fn run_instruction(&self, index: usize) -> Result<Outcome<F>> {
        let instruction = &self.cs.instructions[index];
        let blueprint = self.cs.blueprints.get(instruction.blueprint_id)?;
        let calldata = self.cs.region(instruction)?;

        if blueprint.is_hint() {
            let mut mapping = HintMapping::default();
            blueprint
                .decompress_hint(calldata, &mut mapping)
                .map_err(|e| e.into_error(instruction.blueprint_id))?;
            return self.run_hint(&mapping);
        }

        if let Some(result) = {
            let mut scratch = Scratch {
                engine: self,
                writes: Vec::new(),
            };
            match blueprint.try_solve(&mut scratch, calldata) {
                Some(Ok(())) => Some(Ok(Outcome::Done(scratch.writes))),
                Some(Err(Error::UnderdeterminedWire { .. })) => Some(Ok(Outcome::Skip)),
                Some(Err(e)) => Some(Err(e)),
                None => None,
            }
        } {
            return result;
        }

        match blueprint {
            Blueprint::GenericR1C(_) => {
                let (l, r, o) = GenericR1C::terms_view(calldata)
                    .map_err(|e| e.into_error(instruction.blueprint_id))?;
                self.solve_r1c(l, r, o, instruction.constraint_offset)
            }
            _ => {
                let mut c = SparseR1C::default();
                blueprint
                    .decompress_sparse_r1c(calldata, &mut c)
                    .map_err(|e| e.into_error(instruction.blueprint_id))?;
                self.solve_sparse_r1c(&c, instruction.constraint_offset)
            }
        }
    }

    fn run_hint(&self, mapping: &HintMapping) -> Result<Outcome<F>> {
        let mut inputs = Vec::with_capacity(mapping.inputs.len());
        for expr in &mapping.inputs {
            match self.eval_linexp(expr)? {
                Some(v) => {
                    let big: BigUint = v.into_bigint().into();
                    inputs.push(big);
                }
                None => return Ok(Outcome::Skip),
            }
        }
        let f = self.hints.get(mapping.hint_id)?;
        let mut outputs = vec![BigUint::from(0u32); mapping.outputs.len()];
        f(&self.modulus, &inputs, &mut outputs)
            .map_err(|cause| Error::hint(mapping.hint_id, cause))?;
        let writes = mapping
            .outputs
            .iter()
            .zip(outputs)
            .map(|(&vid, v)| (vid, F::from(v % &self.modulus)))
            .collect();
        Ok(Outcome::Done(writes))
    }

    /// Solves `(Σ L)·(Σ R) = (Σ O)` for its single unknown wire, or verifies
    /// it when fully determined. Terms with a zero coefficient are inert.
    fn solve_r1c(
        &self,
        l: &[Term],
        r: &[Term],
        o: &[Term],
        constraint_index: u32,
    ) -> Result<Outcome<F>> {
        let mut unknown: Option<u32> = None;
        for t in l.iter().chain(r).chain(o) {
            if t.cid == COEFF_ZERO || t.is_constant() {
                continue;
            }
            if self.wire(t.vid)?.is_none() {
                match unknown {
                    None => unknown = Some(t.vid),
                    Some(w) if w == t.vid => {}
                    // several distinct unknowns: a later pass may narrow them
                    Some(_) => return Ok(Outcome::Skip),
                }
            }
        }

        let Some(w) = unknown else {
            let lhs = self.eval_linexp(l)?.expect("all wires known")
                * self.eval_linexp(r)?.expect("all wires known");
            let rhs = self.eval_linexp(o)?.expect("all wires known");
            if lhs != rhs {
                return Err(self.unsatisfied(constraint_index, lhs, rhs));
            }
            return Ok(Outcome::Done(vec![]));
        };

        // split each side into (known part, coefficient of w)
        let part = |terms: &[Term]| -> Result<(F, F)> {
            let mut known = F::zero();
            let mut coeff = F::zero();
            for t in terms {
                if t.cid == COEFF_ZERO {
                    continue;
                }
                if !t.is_constant() && t.vid == w {
                    coeff += self.coeffs[t.cid as usize];
                } else {
                    known += self.eval_term(t)?.expect("known wire");
                }
            }
            Ok((known, coeff))
        };
        let (l_known, l_coeff) = part(l)?;
        let (r_known, r_coeff) = part(r)?;
        let (o_known, o_coeff) = part(o)?;

        let value = match (l_coeff.is_zero(), r_coeff.is_zero(), o_coeff.is_zero()) {
            // only in O: w = (Σl·Σr − o_known) / c
            (true, true, false) => (l_known * r_known - o_known) / o_coeff,
            // only in L: (l_known + c·w)·Σr = Σo
            (false, true, true) => {
                if r_known.is_zero() {
                    if o_known.is_zero() {
                        return Ok(Outcome::Skip);
                    }
                    return Err(self.unsatisfied(constraint_index, F::zero(), o_known));
                }
                (o_known / r_known - l_known) / l_coeff
            }
            // only in R, symmetric
            (true, false, true) => {
                if l_known.is_zero() {
                    if o_known.is_zero() {
                        return Ok(Outcome::Skip);
                    }
                    return Err(self.unsatisfied(constraint_index, F::zero(), o_known));
                }
                (o_known / l_known - r_known) / r_coeff
            }
            // quadratic in w, or degenerate: leave for another instruction
            _ => return Ok(Outcome::Skip),
        };
        Ok(Outcome::Done(vec![(w, value)]))
    }

    /// Solves `qL·l + qR·r + qO·o + (qM1·l)·(qM2·r) + qK = 0` for its single
    /// unknown, or verifies it.
    fn solve_sparse_r1c(&self, c: &SparseR1C, constraint_index: u32) -> Result<Outcome<F>> {
        let product_active = c.m[0].cid != COEFF_ZERO && c.m[1].cid != COEFF_ZERO;
        let mut needed: Vec<u32> = Vec::with_capacity(4);
        let mut record = |t: &Term, active: bool| {
            if active && !needed.contains(&t.vid) {
                needed.push(t.vid);
            }
        };
        record(&c.l, c.l.cid != COEFF_ZERO);
        record(&c.r, c.r.cid != COEFF_ZERO);
        record(&c.o, c.o.cid != COEFF_ZERO);
        record(&c.m[0], product_active);
        record(&c.m[1], product_active);

        let mut unknown = None;
        for &vid in &needed {
            if self.wire(vid)?.is_none() {
                if unknown.is_some() && unknown != Some(vid) {
                    return Ok(Outcome::Skip);
                }
                unknown = Some(vid);
            }
        }

        let coeff = |cid: u32| self.coeffs[cid as usize];
        let term_val = |t: &Term, active: bool| -> Result<F> {
            if !active {
                return Ok(F::zero());
            }
            Ok(coeff(t.cid) * self.wire(t.vid)?.expect("known wire"))
        };

        let Some(w) = unknown else {
            let sum = term_val(&c.l, c.l.cid != COEFF_ZERO)?
                + term_val(&c.r, c.r.cid != COEFF_ZERO)?
                + term_val(&c.o, c.o.cid != COEFF_ZERO)?
                + term_val(&c.m[0], product_active)? * term_val(&c.m[1], product_active)?
                + coeff(c.k);
            if !sum.is_zero() {
                return Err(self.unsatisfied(constraint_index, sum, F::zero()));
            }
            return Ok(Outcome::Done(vec![]));
        };

        // gather the linear coefficient of w and the known remainder
        let mut w_coeff = F::zero();
        let mut known = coeff(c.k);
        for t in [&c.l, &c.r, &c.o] {
            if t.cid == COEFF_ZERO {
                continue;
            }
            if t.vid == w {
                w_coeff += coeff(t.cid);
            } else {
                known += coeff(t.cid) * self.wire(t.vid)?.expect("known wire");
            }
        }
        if product_active {
            match (c.m[0].vid == w, c.m[1].vid == w) {
                (true, true) => return Ok(Outcome::Skip), // quadratic in w
                (true, false) => {
                    let other = coeff(c.m[1].cid) * self.wire(c.m[1].vid)?.expect("known wire");
                    w_coeff += coeff(c.m[0].cid) * other;
                }
                (false, true) => {
                    let other = coeff(c.m[0].cid) * self.wire(c.m[0].vid)?.expect("known wire");
                    w_coeff += coeff(c.m[1].cid) * other;
                }
                (false, false) => {
                    known += coeff(c.m[0].cid)
                        * self.wire(c.m[0].vid)?.expect("known wire")
                        * coeff(c.m[1].cid)
                        * self.wire(c.m[1].vid)?.expect("known wire");
                }
            }
        }
        if w_coeff.is_zero() {
            if known.is_zero() {
                return Ok(Outcome::Skip);
            }
            return Err(self.unsatisfied(constraint_index, known, F::zero()));
        }
        Ok(Outcome::Done(vec![(w, -known / w_coeff)]))
    }

    fn unsatisfied(&self, index: u32, lhs: F, rhs: F) -> Error {
        let mut lhs = lhs.to_string();
        if let Some(message) = self.cs.debug_message(index) {
            lhs = format!("{lhs} ({message})");
        }
        Error::UnsatisfiedConstraint {
            index,
            lhs,
            rhs: rhs.to_string(),
        }
    }

    /// A wire the stuck instruction cannot resolve, for error reporting.
    fn first_unknown(&self, index: usize) -> u32 {
        let candidates = (|| -> Result<Vec<u32>> {
            let instruction = &self.cs.instructions[index];
            let blueprint = self.cs.blueprints.get(instruction.blueprint_id)?;
            let calldata = self.cs.region(instruction)?;
            if blueprint.is_hint() {
                let mut mapping = HintMapping::default();
                blueprint
                    .decompress_hint(calldata, &mut mapping)
                    .map_err(|e| e.into_error(instruction.blueprint_id))?;
                return Ok(mapping
                    .inputs
                    .iter()
                    .flatten()
                    .filter(|t| !t.is_constant())
                    .map(|t| t.vid)
                    .collect());
            }
            let mut c = SparseR1C::default();
            if blueprint.decompress_sparse_r1c(calldata, &mut c).is_ok() {
                return Ok(vec![c.l.vid, c.r.vid, c.o.vid]);
            }
            let (l, r, o) = GenericR1C::terms_view(calldata)
                .map_err(|e| e.into_error(instruction.blueprint_id))?;
            Ok(l.iter()
                .chain(r)
                .chain(o)
                .filter(|t| !t.is_constant())
                .map(|t| t.vid)
                .collect())
        })()
        .unwrap_or_default();
        for vid in candidates {
            if let Ok(None) = self.wire(vid) {
                return vid;
            }
        }
        u32::MAX
    }

    //
    // drivers
    //

    fn run_sequential(mut self) -> Result<Witness<F>> {
        let mut pending: Vec<usize> = (0..self.cs.instructions.len()).collect();
        while !pending.is_empty() {
            let mut progressed = false;
            let mut still = Vec::new();
            for index in pending {
                match self.run_instruction(index)? {
                    Outcome::Done(writes) => {
                        self.apply(writes)?;
                        progressed = true;
                    }
                    Outcome::Skip => still.push(index),
                }
            }
            if !still.is_empty() && !progressed {
                let wire_id = self.first_unknown(still[0]);
                return Err(Error::UnderdeterminedWire { wire_id });
            }
            pending = still;
        }
        self.into_witness()
    }

    fn run_parallel(mut self) -> Result<Witness<F>> {
        let levels = schedule(self.cs)?;
        log::debug!(
            "parallel solve: {} instructions in {} levels",
            self.cs.instructions.len(),
            levels.len()
        );
        let mut stragglers = Vec::new();
        for level in levels {
            let results: Vec<(usize, Result<Outcome<F>>)> = level
                .par_iter()
                .map(|&index| (index, self.run_instruction(index)))
                .collect();
            // apply in emission order so the final state matches the
            // sequential run exactly
            for (index, result) in results {
                match result? {
                    Outcome::Done(writes) => self.apply(writes)?,
                    Outcome::Skip => stragglers.push(index),
                }
            }
        }
        // forward references the static leveling could not order
        let mut pending = stragglers;
        pending.sort_unstable();
        while !pending.is_empty() {
            let mut progressed = false;
            let mut still = Vec::new();
            for index in pending {
                match self.run_instruction(index)? {
                    Outcome::Done(writes) => {
                        self.apply(writes)?;
                        progressed = true;
                    }
                    Outcome::Skip => still.push(index),
                }
            }
            if !still.is_empty() && !progressed {
                let wire_id = self.first_unknown(still[0]);
                return Err(Error::UnderdeterminedWire { wire_id });
            }
            pending = still;
        }
        self.into_witness()
    }

    fn into_witness(self) -> Result<Witness<F>> {
        let mut values = Vec::with_capacity(self.values.len());
        for (s, v) in self.values.iter().enumerate() {
            match v {
                Some(v) => values.push(*v),
                None => {
                    return Err(Error::UnderdeterminedWire {
                        wire_id: unslot(s, self.cs.nb_public, self.cs.nb_secret),
                    })
                }
            }
        }
        Ok(Witness {
            values,
            coeffs: self.coeffs,
            nb_public: self.cs.nb_public,
            nb_secret: self.cs.nb_secret,
        })
    }
}

/// Inverse of [`slot`], for error reporting.
fn unslot(s: usize, nb_public: u32, nb_secret: u32) -> u32 {
    let s = s as u32;
    if s <= nb_public {
        crate::constraint::pack_wire(Visibility::Public, s)
    } else if s <= nb_public + nb_secret {
        crate::constraint::pack_wire(Visibility::Secret, s - 1 - nb_public)
    } else {
        crate::constraint::pack_wire(Visibility::Internal, s - 1 - nb_public - nb_secret)
    }
}

/// Value-resolution view handed to solvable blueprints; writes are buffered
/// so the engine can apply them with the write-once check.
struct Scratch<'e, 'a, F: PrimeField> {
    engine: &'e Engine<'a, F>,
    writes: Vec<(u32, F)>,
}

impl<F: PrimeField> Solver<F> for Scratch<'_, '_, F> {
    fn get_value(&self, cid: u32, vid: u32) -> Result<F> {
        if let Some((_, v)) = self.writes.iter().find(|(w, _)| *w == vid) {
            return Ok(self.engine.coeffs[cid as usize] * *v);
        }
        match self.engine.wire(vid)? {
            Some(v) => Ok(self.engine.coeffs[cid as usize] * v),
            None => Err(Error::UnderdeterminedWire { wire_id: vid }),
        }
    }

    fn get_coeff(&self, cid: u32) -> F {
        self.engine.coeffs[cid as usize]
    }

    fn set_value(&mut self, vid: u32, value: F) -> Result<()> {
        self.writes.push((vid, value));
        Ok(())
    }
}

/// Groups instructions into levels with disjoint read/write sets, determined
/// statically: a wire is written by the first instruction that mentions it
/// without a prior definition, and read everywhere else.
///
/// An instruction with several not-yet-defined wires cannot be placed
/// precisely; it becomes a barrier (a level of its own after everything
/// before it).
pub fn schedule<F: PrimeField>(cs: &ConstraintSystem<F>) -> Result<Vec<Vec<usize>>> {
    let mut wire_level: HashMap<u32, usize> = HashMap::new();
    let mut levels: Vec<Vec<usize>> = Vec::new();
    let mut max_level = 0usize;

    for (index, instruction) in cs.instructions.iter().enumerate() {
        let blueprint = cs.blueprints.get(instruction.blueprint_id)?;
        let calldata = cs.region(instruction)?;

        let is_hint = blueprint.is_hint();
        let mentioned: Option<Vec<u32>> = if is_hint {
            None
        } else if let Ok((l, r, o)) = GenericR1C::terms_view(calldata) {
            Some(
                l.iter()
                    .chain(r)
                    .chain(o)
                    .filter(|t| !t.is_constant() && t.vid != ONE_WIRE && t.cid != COEFF_ZERO)
                    .map(|t| t.vid)
                    .collect(),
            )
        } else {
            let mut c = SparseR1C::default();
            match blueprint.decompress_sparse_r1c(calldata, &mut c) {
                Ok(()) => Some(
                    [c.l, c.r, c.o]
                        .iter()
                        .filter(|t| !t.is_constant() && t.vid != ONE_WIRE)
                        .map(|t| t.vid)
                        .collect(),
                ),
                // unknown shape: serialize it against everything before it
                Err(_) => Some(Vec::new()),
            }
        };

        let (reads, writes) = if is_hint {
            let mut mapping = HintMapping::default();
            blueprint
                .decompress_hint(calldata, &mut mapping)
                .map_err(|e| e.into_error(instruction.blueprint_id))?;
            let reads = mapping
                .inputs
                .iter()
                .flatten()
                .filter(|t| !t.is_constant())
                .map(|t| t.vid)
                .collect::<Vec<_>>();
            (reads, mapping.outputs)
        } else {
            // undefined mentioned wires are this instruction's writes
            let (defined, undefined): (Vec<u32>, Vec<u32>) = mentioned
                .unwrap_or_default()
                .into_iter()
                .partition(|vid| is_input(*vid) || wire_level.contains_key(vid));
            (defined, undefined)
        };

        let level = if writes.len() > 1 && !blueprint.is_hint() {
            // ambiguous writer: serialize against everything before it
            max_level + 1
        } else {
            1 + reads
                .iter()
                .map(|vid| wire_level.get(vid).copied().unwrap_or(0))
                .max()
                .unwrap_or(0)
        };
        for vid in writes {
            wire_level.entry(vid).or_insert(level);
        }
        max_level = max_level.max(level);
        if levels.len() < level {
            levels.resize(level, Vec::new());
        }
        levels[level - 1].push(index);
    }
    Ok(levels)
}

fn is_input(vid: u32) -> bool {
    let t = Term::new(0, vid);
    matches!(t.visibility(), Visibility::Public | Visibility::Secret)
}
