//! The circuit builder: wire allocation, coefficient interning, instruction
//! emission, hint recording.
//!
//! The builder lowers through one of two flavors. In [`LoweringMode::R1cs`]
//! additions stay symbolic (a [`Variable`] is a whole linear expression) and
//! multiplications emit `GenericR1C` instructions. In [`LoweringMode::Plonk`]
//! every operation seals its result into a fresh wire through a PLONK gate,
//! so a variable is always a single term.
//!
//! Ids are assigned in call order and never renumbered.

use ark_ff::PrimeField;
use num_bigint::BigUint;

use crate::constraint::{
    blueprint::{BLUEPRINT_SPARSE_R1C, BLUEPRINT_SPARSE_R1C_MUL},
    pack_wire,
    system::ConstraintSystem,
    CommitmentStatus, HintMapping, LinearExpression, R1C, SparseR1C, Term, Visibility, COEFF_ONE,
    COEFF_ZERO, ONE_WIRE,
};
use crate::error::{Error, Result};
use crate::hints::{
    HintFn, HintRegistry, COMMITMENT_HINT, INVERSE_HINT, IS_ZERO_HINT, TO_BINARY_HINT,
};
use crate::lookup::LookupState;

/// Which constraint flavor the builder compiles to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoweringMode {
    R1cs,
    Plonk,
}

/// A circuit value: either a compile-time constant or a linear combination of
/// wires. In Plonk mode the linear form always holds exactly one term.
#[derive(Clone, Debug)]
pub enum Variable<F: PrimeField> {
    Constant(F),
    Linear(LinearExpression),
}

impl<F: PrimeField> Variable<F> {
    pub fn as_constant(&self) -> Option<F> {
        match self {
            Variable::Constant(c) => Some(*c),
            Variable::Linear(_) => None,
        }
    }

    /// The single term of a sealed variable.
    pub(crate) fn as_term(&self) -> Option<Term> {
        match self {
            Variable::Linear(terms) if terms.len() == 1 => Some(terms[0]),
            _ => None,
        }
    }

    pub fn zero() -> Self {
        Variable::Constant(F::zero())
    }

    pub fn one() -> Self {
        Variable::Constant(F::one())
    }
}

impl<F: PrimeField> From<u64> for Variable<F> {
    fn from(v: u64) -> Self {
        Variable::Constant(F::from(v))
    }
}

pub struct Builder<F: PrimeField> {
    mode: LoweringMode,
    pub(crate) cs: ConstraintSystem<F>,
    hints: HintRegistry,
    pub(crate) lookups: Vec<LookupState<F>>,
    finalized: bool,
}

impl<F: PrimeField> Builder<F> {
    pub fn new(mode: LoweringMode) -> Self {
        Builder {
            mode,
            cs: ConstraintSystem::new(),
            hints: crate::hints::global_registry(),
            lookups: Vec::new(),
            finalized: false,
        }
    }

    /// A builder compiling to rank-1 constraints.
    pub fn r1cs() -> Self {
        Self::new(LoweringMode::R1cs)
    }

    /// A builder compiling to PLONK gates.
    pub fn plonk() -> Self {
        Self::new(LoweringMode::Plonk)
    }

    pub fn mode(&self) -> LoweringMode {
        self.mode
    }

    /// Registers a hint with this builder's registry and returns its id.
    pub fn register_hint(&mut self, name: &str, f: HintFn) -> Result<u64> {
        self.hints.register(name, f)
    }

    //
    // wires
    //

    pub fn new_public(&mut self, name: &str) -> Variable<F> {
        // index 0 is the reserved constant-ONE wire
        let idx = self.cs.nb_public + 1;
        self.cs.nb_public += 1;
        self.cs.public_names.push(name.to_string());
        Variable::Linear(vec![Term::new(COEFF_ONE, pack_wire(Visibility::Public, idx))])
    }

    pub fn new_secret(&mut self, name: &str) -> Variable<F> {
        let idx = self.cs.nb_secret;
        self.cs.nb_secret += 1;
        self.cs.secret_names.push(name.to_string());
        Variable::Linear(vec![Term::new(COEFF_ONE, pack_wire(Visibility::Secret, idx))])
    }

    pub fn new_internal(&mut self) -> Variable<F> {
        let vid = self.alloc_internal();
        Variable::Linear(vec![Term::new(COEFF_ONE, vid)])
    }

    pub(crate) fn alloc_internal(&mut self) -> u32 {
        let idx = self.cs.nb_internal;
        self.cs.nb_internal += 1;
        pack_wire(Visibility::Internal, idx)
    }

    //
    // coefficients
    //

    /// Interns a constant (already reduced or not; reduction mod p is
    /// applied). Reserved values return the reserved ids.
    pub fn coeff_id(&mut self, v: &BigUint) -> u32 {
        let reduced = v % self.cs.coeffs.modulus();
        self.cs.coeffs.intern(&reduced)
    }

    pub fn coeff_id_i64(&mut self, v: i64) -> u32 {
        self.cs.coeffs.intern_i64(v)
    }

    pub(crate) fn coeff_of(&mut self, v: F) -> u32 {
        let big: BigUint = v.into_bigint().into();
        self.cs.coeffs.intern(&big)
    }

    pub(crate) fn field_of(&self, cid: u32) -> F {
        F::from(self.cs.coeffs.value(cid).clone())
    }

    //
    // variable algebra
    //

    /// A linear expression denoting the variable; constants become a term on
    /// the ONE wire.
    pub(crate) fn to_linexp(&mut self, v: &Variable<F>) -> LinearExpression {
        match v {
            Variable::Constant(c) => {
                if c.is_zero() {
                    vec![]
                } else {
                    vec![Term::new(self.coeff_of(*c), ONE_WIRE)]
                }
            }
            Variable::Linear(terms) => terms.clone(),
        }
    }

    /// A hint-input expression; bare constants use the sentinel wire rather
    /// than the ONE wire.
    fn to_hint_input(&mut self, v: &Variable<F>) -> LinearExpression {
        match v {
            Variable::Constant(c) => vec![Term::constant(self.coeff_of(*c))],
            Variable::Linear(terms) => terms.clone(),
        }
    }

    pub fn add(&mut self, a: &Variable<F>, b: &Variable<F>) -> Variable<F> {
        match (a, b) {
            (Variable::Constant(x), Variable::Constant(y)) => Variable::Constant(*x + y),
            _ => match self.mode {
                LoweringMode::R1cs => {
                    let mut terms = self.to_linexp(a);
                    terms.extend(self.to_linexp(b));
                    Variable::Linear(terms)
                }
                LoweringMode::Plonk => self.plonk_add(a, b),
            },
        }
    }

    /// Sums a list of variables in one step. In R1cs mode the result is a
    /// single concatenated expression (no quadratic re-cloning through
    /// repeated [`Builder::add`] calls); in Plonk mode a chain of add gates.
    pub fn sum(&mut self, vars: &[Variable<F>]) -> Variable<F> {
        match self.mode {
            LoweringMode::R1cs => {
                let mut constant = F::zero();
                let mut terms = LinearExpression::new();
                for v in vars {
                    match v {
                        Variable::Constant(c) => constant += c,
                        Variable::Linear(ts) => terms.extend_from_slice(ts),
                    }
                }
                if !constant.is_zero() {
                    terms.push(Term::new(self.coeff_of(constant), ONE_WIRE));
                }
                if terms.is_empty() {
                    Variable::zero()
                } else {
                    Variable::Linear(terms)
                }
            }
            LoweringMode::Plonk => {
                let mut iter = vars.iter();
                let mut acc = match iter.next() {
                    None => return Variable::zero(),
                    Some(v) => v.clone(),
                };
                for v in iter {
                    acc = self.add(&acc, v);
                }
                acc
            }
        }
    }

    pub fn sub(&mut self, a: &Variable<F>, b: &Variable<F>) -> Variable<F> {
        let neg_b = self.neg(b);
        self.add(a, &neg_b)
    }

    pub fn neg(&mut self, v: &Variable<F>) -> Variable<F> {
        self.scale(v, -F::one())
    }

    /// Multiplication by a constant; free in both modes.
    pub fn scale(&mut self, v: &Variable<F>, s: F) -> Variable<F> {
        if s.is_zero() {
            return Variable::zero();
        }
        match v {
            Variable::Constant(c) => Variable::Constant(*c * s),
            Variable::Linear(terms) => {
                let scaled = terms
                    .iter()
                    .map(|t| {
                        let c = self.field_of(t.cid) * s;
                        Term::new(self.coeff_of(c), t.vid)
                    })
                    .collect();
                Variable::Linear(scaled)
            }
        }
    }

    pub fn mul(&mut self, a: &Variable<F>, b: &Variable<F>) -> Variable<F> {
        match (a, b) {
            (Variable::Constant(x), Variable::Constant(y)) => Variable::Constant(*x * y),
            (Variable::Constant(c), v) | (v, Variable::Constant(c)) => self.scale(v, *c),
            _ => match self.mode {
                LoweringMode::R1cs => {
                    let o = self.new_internal();
                    let l = self.to_linexp(a);
                    let r = self.to_linexp(b);
                    let o_lin = self.to_linexp(&o);
                    self.enforce_r1c(l, r, o_lin);
                    o
                }
                LoweringMode::Plonk => self.plonk_mul(a, b),
            },
        }
    }

    //
    // assertions
    //

    pub fn assert_is_equal(&mut self, a: &Variable<F>, b: &Variable<F>) -> Result<()> {
        match (a, b) {
            (Variable::Constant(x), Variable::Constant(y)) => {
                if x != y {
                    return Err(Error::Message(format!(
                        "constants differ: {x} != {y}"
                    )));
                }
                Ok(())
            }
            _ => match self.mode {
                LoweringMode::R1cs => {
                    let l = self.to_linexp(a);
                    let one = vec![Term::new(COEFF_ONE, ONE_WIRE)];
                    let o = self.to_linexp(b);
                    self.enforce_r1c(l, one, o);
                    Ok(())
                }
                LoweringMode::Plonk => self.plonk_assert_equal(a, b),
            },
        }
    }

    /// Asserts `a · b = c`.
    pub fn assert_mul(
        &mut self,
        a: &Variable<F>,
        b: &Variable<F>,
        c: &Variable<F>,
    ) -> Result<()> {
        match (a, b) {
            (Variable::Constant(x), _) => {
                let scaled = self.scale(b, *x);
                self.assert_is_equal(&scaled, c)
            }
            (_, Variable::Constant(y)) => {
                let scaled = self.scale(a, *y);
                self.assert_is_equal(&scaled, c)
            }
            _ => match self.mode {
                LoweringMode::R1cs => {
                    let l = self.to_linexp(a);
                    let r = self.to_linexp(b);
                    let o = self.to_linexp(c);
                    self.enforce_r1c(l, r, o);
                    Ok(())
                }
                LoweringMode::Plonk => self.plonk_assert_mul(a, b, c),
            },
        }
    }

    pub fn assert_is_boolean(&mut self, v: &Variable<F>) -> Result<()> {
        match v {
            Variable::Constant(c) => {
                if !(c.is_zero() || c.is_one()) {
                    return Err(Error::Message(format!("constant {c} is not a boolean")));
                }
                Ok(())
            }
            _ => self.assert_mul(&v.clone(), &v.clone(), &v.clone()),
        }
    }

    //
    // derived operations
    //

    /// `v⁻¹`, witnessed by hint and bound by `v · v⁻¹ = 1`. A zero input
    /// makes the circuit unsatisfiable.
    pub fn inverse(&mut self, v: &Variable<F>) -> Result<Variable<F>> {
        if let Variable::Constant(c) = v {
            return match c.inverse() {
                Some(inv) => Ok(Variable::Constant(inv)),
                None => Err(Error::Message("inverse of zero constant".to_string())),
            };
        }
        let out = self.new_hint(INVERSE_HINT, 1, &[v.clone()])?;
        self.assert_mul(v, &out[0], &Variable::one())?;
        Ok(out[0].clone())
    }

    /// 1 when `v = 0`, 0 otherwise; `(z, z_inv, r)` constrained as
    /// `z·z_inv = 1 − r` and `r·z = 0`.
    pub fn is_zero(&mut self, v: &Variable<F>) -> Result<Variable<F>> {
        if let Variable::Constant(c) = v {
            return Ok(Variable::Constant(if c.is_zero() {
                F::one()
            } else {
                F::zero()
            }));
        }
        let out = self.new_hint(IS_ZERO_HINT, 2, &[v.clone()])?;
        let (r, z_inv) = (out[0].clone(), out[1].clone());
        let one_minus_r = self.sub(&Variable::one(), &r);
        self.assert_mul(v, &z_inv, &one_minus_r)?;
        self.assert_mul(&r, v, &Variable::zero())?;
        Ok(r)
    }

    /// `if b { t } else { e }`, i.e. `e + b·(t − e)`. `b` must be boolean.
    pub fn select(
        &mut self,
        b: &Variable<F>,
        t: &Variable<F>,
        e: &Variable<F>,
    ) -> Variable<F> {
        if let Variable::Constant(c) = b {
            return if c.is_one() { t.clone() } else { e.clone() };
        }
        let diff = self.sub(t, e);
        let gated = self.mul(b, &diff);
        self.add(e, &gated)
    }

    /// Decomposes `v` into `nb_bits` boolean wires, least significant first,
    /// and binds them back with `Σ 2ⁱ·bᵢ = v`.
    pub fn to_binary(&mut self, v: &Variable<F>, nb_bits: usize) -> Result<Vec<Variable<F>>> {
        if let Variable::Constant(c) = v {
            let big: BigUint = c.into_bigint().into();
            if big.bits() as usize > nb_bits {
                return Err(Error::OutOfRange {
                    value: big.to_string(),
                    nb_bits,
                });
            }
            return Ok((0..nb_bits)
                .map(|i| Variable::Constant(F::from(big.bit(i as u64) as u64)))
                .collect());
        }
        let n = Variable::Constant(F::from(nb_bits as u64));
        let bits = self.new_hint(TO_BINARY_HINT, nb_bits, &[v.clone(), n])?;
        let mut weighted = Vec::with_capacity(nb_bits);
        let mut pow = F::one();
        for bit in &bits {
            self.assert_is_boolean(bit)?;
            weighted.push(self.scale(bit, pow));
            pow.double_in_place();
        }
        let acc = self.sum(&weighted);
        self.assert_is_equal(&acc, v)?;
        Ok(bits)
    }

    /// Seals a variable into a single wire term, emitting whatever constraint
    /// the current mode needs. Already-sealed variables come back unchanged.
    pub fn seal(&mut self, v: &Variable<F>) -> Term {
        if let Some(t) = v.as_term() {
            return t;
        }
        match self.mode {
            LoweringMode::Plonk => self.plonk_term(v),
            LoweringMode::R1cs => {
                let o = self.new_internal();
                let l = self.to_linexp(v);
                let one = vec![Term::new(COEFF_ONE, ONE_WIRE)];
                let o_lin = self.to_linexp(&o);
                self.enforce_r1c(l, one, o_lin);
                o.as_term().expect("fresh internal wire is a single term")
            }
        }
    }

    //
    // hints and commitments
    //

    /// Records a hint invocation: allocates `nb_outputs` internal wires the
    /// solver will fill by calling the registered function on the evaluated
    /// inputs. Bare constants pass through with the sentinel wire id.
    pub fn new_hint(
        &mut self,
        hint_id: u64,
        nb_outputs: usize,
        inputs: &[Variable<F>],
    ) -> Result<Vec<Variable<F>>> {
        if !self.hints.contains(hint_id) {
            return Err(Error::UnknownHint { hint_id });
        }
        let inputs = inputs
            .iter()
            .map(|v| self.to_hint_input(v))
            .collect::<Vec<_>>();
        let outputs: Vec<u32> = (0..nb_outputs).map(|_| self.alloc_internal()).collect();
        let mapping = HintMapping {
            hint_id,
            inputs,
            outputs: outputs.clone(),
        };
        self.cs.add_hint(&mapping)?;
        Ok(outputs
            .into_iter()
            .map(|vid| Variable::Linear(vec![Term::new(COEFF_ONE, vid)]))
            .collect())
    }

    /// Derives a transcript challenge bound to the given wires. The solver
    /// models the commitment as a Keccak transcript over the committed
    /// values; the proving pipeline replaces it with its own commitment.
    pub fn new_commitment(&mut self, inputs: &[Variable<F>]) -> Result<Variable<F>> {
        let out = self.new_hint(COMMITMENT_HINT, 1, inputs)?;
        Ok(out[0].clone())
    }

    //
    // raw constraint emission
    //

    /// Appends `(Σ L)·(Σ R) = (Σ O)`.
    pub(crate) fn enforce_r1c(
        &mut self,
        l: LinearExpression,
        r: LinearExpression,
        o: LinearExpression,
    ) -> u32 {
        let c = R1C { l, r, o };
        self.cs.add_r1c(&c).expect("generic R1C always compresses")
    }

    /// Appends the PLONK gate
    /// `qL·L + qR·R + qO·O + (qM1·L)·(qM2·R) + qK = 0`. All `q` arguments are
    /// coefficient ids. An optional debug message is attached to the emitted
    /// constraint index.
    #[allow(clippy::too_many_arguments)]
    pub fn add_plonk_constraint(
        &mut self,
        l: Term,
        r: Term,
        o: Term,
        ql: u32,
        qr: u32,
        qm1: u32,
        qm2: u32,
        qo: u32,
        qk: u32,
        debug: Option<String>,
    ) -> Result<u32> {
        let constraint_index = self.cs.nb_constraints;
        let c = SparseR1C {
            l: Term::new(ql, l.vid),
            r: Term::new(qr, r.vid),
            o: Term::new(qo, o.vid),
            m: [Term::new(qm1, l.vid), Term::new(qm2, r.vid)],
            k: qk,
            commitment: CommitmentStatus::NotCommitted,
        };
        self.cs.add_sparse_r1c(&c, BLUEPRINT_SPARSE_R1C)?;
        if let Some(message) = debug {
            self.cs.attach_debug(constraint_index, message);
        }
        Ok(constraint_index)
    }

    //
    // plonk lowering
    //

    /// Seals a variable into a single term; in Plonk mode variables already
    /// are, except for constants which get their own wire through a gate.
    fn plonk_term(&mut self, v: &Variable<F>) -> Term {
        if let Some(t) = v.as_term() {
            return t;
        }
        match v {
            Variable::Constant(c) => {
                // o - c = 0
                let o = self.alloc_internal();
                let k = self.coeff_of(-*c);
                let c = SparseR1C {
                    l: Term::new(COEFF_ZERO, ONE_WIRE),
                    r: Term::new(COEFF_ZERO, ONE_WIRE),
                    o: Term::new(COEFF_ONE, o),
                    m: [Term::new(COEFF_ZERO, ONE_WIRE), Term::new(COEFF_ZERO, ONE_WIRE)],
                    k,
                    commitment: CommitmentStatus::NotCommitted,
                };
                self.cs
                    .add_sparse_r1c(&c, BLUEPRINT_SPARSE_R1C)
                    .expect("generic gate always compresses");
                Term::new(COEFF_ONE, o)
            }
            Variable::Linear(terms) => {
                debug_assert_eq!(terms.len(), 1, "plonk variables stay sealed");
                terms[0]
            }
        }
    }

    fn plonk_gate(&mut self, c: &SparseR1C) {
        self.cs
            .add_sparse_r1c(c, BLUEPRINT_SPARSE_R1C)
            .expect("generic gate always compresses");
    }

    fn plonk_add(&mut self, a: &Variable<F>, b: &Variable<F>) -> Variable<F> {
        match (a, b) {
            (Variable::Constant(k), v) | (v, Variable::Constant(k)) => {
                // o = v + k
                let t = self.plonk_term(v);
                let o = self.alloc_internal();
                let gate = SparseR1C {
                    l: t,
                    r: Term::new(COEFF_ZERO, t.vid),
                    o: Term::new(crate::constraint::COEFF_MINUS_ONE, o),
                    m: [Term::new(COEFF_ZERO, t.vid), Term::new(COEFF_ZERO, t.vid)],
                    k: self.coeff_of(*k),
                    commitment: CommitmentStatus::NotCommitted,
                };
                self.plonk_gate(&gate);
                Variable::Linear(vec![Term::new(COEFF_ONE, o)])
            }
            _ => {
                // o = a + b
                let ta = self.plonk_term(a);
                let tb = self.plonk_term(b);
                let o = self.alloc_internal();
                let gate = SparseR1C {
                    l: ta,
                    r: tb,
                    o: Term::new(crate::constraint::COEFF_MINUS_ONE, o),
                    m: [Term::new(COEFF_ZERO, ta.vid), Term::new(COEFF_ZERO, tb.vid)],
                    k: COEFF_ZERO,
                    commitment: CommitmentStatus::NotCommitted,
                };
                self.plonk_gate(&gate);
                Variable::Linear(vec![Term::new(COEFF_ONE, o)])
            }
        }
    }

    fn plonk_mul(&mut self, a: &Variable<F>, b: &Variable<F>) -> Variable<F> {
        // o = (qM·a)·b through the fused multiplication gate
        let ta = self.plonk_term(a);
        let tb = self.plonk_term(b);
        let qm = {
            let ca = self.field_of(ta.cid);
            let cb = self.field_of(tb.cid);
            self.coeff_of(ca * cb)
        };
        let o = self.alloc_internal();
        let mut gate = SparseR1C::default();
        gate.m[0] = Term::new(qm, ta.vid);
        gate.m[1] = Term::new(COEFF_ONE, tb.vid);
        gate.o = Term::new(crate::constraint::COEFF_MINUS_ONE, o);
        gate.l.vid = ta.vid;
        gate.r.vid = tb.vid;
        self.cs
            .add_sparse_r1c(&gate, BLUEPRINT_SPARSE_R1C_MUL)
            .expect("mul gate always compresses");
        Variable::Linear(vec![Term::new(COEFF_ONE, o)])
    }

    fn plonk_assert_equal(&mut self, a: &Variable<F>, b: &Variable<F>) -> Result<()> {
        match (a, b) {
            (Variable::Constant(k), v) | (v, Variable::Constant(k)) => {
                // v - k = 0
                let t = self.plonk_term(v);
                let gate = SparseR1C {
                    l: t,
                    r: Term::new(COEFF_ZERO, t.vid),
                    o: Term::new(COEFF_ZERO, t.vid),
                    m: [Term::new(COEFF_ZERO, t.vid), Term::new(COEFF_ZERO, t.vid)],
                    k: self.coeff_of(-*k),
                    commitment: CommitmentStatus::NotCommitted,
                };
                self.plonk_gate(&gate);
                Ok(())
            }
            _ => {
                // a - b = 0
                let ta = self.plonk_term(a);
                let tb = self.plonk_term(b);
                let neg = {
                    let cb = self.field_of(tb.cid);
                    self.coeff_of(-cb)
                };
                let gate = SparseR1C {
                    l: ta,
                    r: Term::new(neg, tb.vid),
                    o: Term::new(COEFF_ZERO, ta.vid),
                    m: [Term::new(COEFF_ZERO, ta.vid), Term::new(COEFF_ZERO, tb.vid)],
                    k: COEFF_ZERO,
                    commitment: CommitmentStatus::NotCommitted,
                };
                self.plonk_gate(&gate);
                Ok(())
            }
        }
    }

    fn plonk_assert_mul(
        &mut self,
        a: &Variable<F>,
        b: &Variable<F>,
        c: &Variable<F>,
    ) -> Result<()> {
        let ta = self.plonk_term(a);
        let tb = self.plonk_term(b);
        let mut gate = SparseR1C::default();
        gate.m[0] = Term::new(ta.cid, ta.vid);
        gate.m[1] = Term::new(tb.cid, tb.vid);
        gate.l.vid = ta.vid;
        gate.r.vid = tb.vid;
        match c {
            Variable::Constant(k) => {
                gate.o = Term::new(COEFF_ZERO, ta.vid);
                gate.k = self.coeff_of(-*k);
            }
            _ => {
                let tc = self.plonk_term(c);
                let neg = {
                    let cc = self.field_of(tc.cid);
                    self.coeff_of(-cc)
                };
                gate.o = Term::new(neg, tc.vid);
            }
        }
        self.plonk_gate(&gate);
        Ok(())
    }

    //
    // finalization
    //

    /// Freezes the circuit: emits the lookup arguments accumulated so far and
    /// hands back the constraint system together with the hint registry the
    /// solver needs.
    pub fn finalize(mut self) -> Result<(ConstraintSystem<F>, HintRegistry)> {
        if !self.finalized {
            crate::lookup::finalize_lookups(&mut self)?;
            self.finalized = true;
        }
        log::debug!(
            "finalized circuit: {} instructions, {} constraints, {} calldata words",
            self.cs.instructions.len(),
            self.cs.nb_constraints,
            self.cs.calldata.len()
        );
        Ok((self.cs, self.hints))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{COEFF_MINUS_ONE, COEFF_TWO};
    use ark_bn254::Fr;

    #[test]
    fn constant_operations_fold_without_constraints() {
        let mut b = Builder::<Fr>::r1cs();
        let two = Variable::Constant(Fr::from(2u64));
        let three = Variable::Constant(Fr::from(3u64));
        let five = b.add(&two, &three);
        let six = b.mul(&two, &three);
        let minus_two = b.neg(&two);
        assert_eq!(five.as_constant(), Some(Fr::from(5u64)));
        assert_eq!(six.as_constant(), Some(Fr::from(6u64)));
        assert_eq!(minus_two.as_constant(), Some(-Fr::from(2u64)));
        assert!(b.cs.instructions.is_empty());
    }

    #[test]
    fn multiplying_by_a_constant_rescales_the_expression() {
        let mut b = Builder::<Fr>::r1cs();
        let x = b.new_secret("x");
        let scaled = b.mul(&x, &Variable::Constant(Fr::from(2u64)));
        let Variable::Linear(terms) = &scaled else {
            panic!("expected a linear expression");
        };
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].cid, COEFF_TWO);
        assert!(b.cs.instructions.is_empty(), "no gate for constant scaling");
    }

    #[test]
    fn coeff_interning_returns_reserved_ids() {
        let mut b = Builder::<Fr>::r1cs();
        assert_eq!(b.coeff_id(&BigUint::from(0u32)), 0);
        assert_eq!(b.coeff_id(&BigUint::from(1u32)), 1);
        assert_eq!(b.coeff_id(&BigUint::from(2u32)), 2);
        assert_eq!(b.coeff_id_i64(-1), COEFF_MINUS_ONE);
        let a = b.coeff_id(&BigUint::from(77u32));
        let b2 = b.coeff_id(&BigUint::from(77u32));
        assert_eq!(a, b2);
    }

    #[test]
    fn secret_names_land_in_the_secret_list() {
        let mut b = Builder::<Fr>::r1cs();
        b.new_public("pub_in");
        b.new_secret("sec_in");
        assert_eq!(b.cs.public_names, vec!["pub_in".to_string()]);
        assert_eq!(b.cs.secret_names, vec!["sec_in".to_string()]);
        assert_eq!(b.cs.nb_public, 1);
        assert_eq!(b.cs.nb_secret, 1);
    }

    #[test]
    fn plonk_variables_stay_sealed() {
        let mut b = Builder::<Fr>::plonk();
        let x = b.new_secret("x");
        let y = b.new_secret("y");
        let sum = b.add(&x, &y);
        assert!(sum.as_term().is_some(), "plonk add seals into one wire");
        let shifted = b.add(&sum, &Variable::Constant(Fr::from(9u64)));
        assert!(shifted.as_term().is_some());
        // one gate per add
        assert_eq!(b.cs.instructions.len(), 2);
    }

    #[test]
    fn new_hint_rejects_unknown_ids() {
        let mut b = Builder::<Fr>::r1cs();
        let x = b.new_secret("x");
        assert!(matches!(
            b.new_hint(0xbad0_bad0_bad0_bad0, 1, &[x]),
            Err(Error::UnknownHint { .. })
        ));
    }
}
