//! Log-derivative lookup tables.
//!
//! A table is an append-only list of entries; queries are field variables
//! interpreted as indices into it. Each batch of queries is answered by a
//! hint, and at finalization a single log-derivative argument binds all of
//! them at once:
//!
//! ```text
//!        1                    mᵢ
//!   Σ ─────────────  =  Σ ──────────────
//!   q  α − (q + β·v)    i  α − (i + β·eᵢ)
//! ```
//!
//! with challenges α, β drawn from the commitment transcript over the
//! entries, queries and results, and multiplicities `m` provided by hint.
//! Every fraction is introduced through a product constraint
//! (`denominator · fraction = numerator`), so the solver determines the
//! fraction wires by plain single-unknown solving.

use ark_ff::PrimeField;

use crate::builder::{Builder, Variable};
use crate::error::{Error, Result};
use crate::hints::{LOOKUP_MULTIPLICITIES_HINT, LOOKUP_VALUES_HINT};

/// Per-table accumulation, owned by the builder until finalization.
pub(crate) struct LookupState<F: PrimeField> {
    pub entries: Vec<Variable<F>>,
    pub queries: Vec<Variable<F>>,
    pub results: Vec<Variable<F>>,
}

impl<F: PrimeField> Default for LookupState<F> {
    fn default() -> Self {
        LookupState {
            entries: Vec::new(),
            queries: Vec::new(),
            results: Vec::new(),
        }
    }
}

/// Handle to a lookup table registered with a builder.
#[derive(Copy, Clone, Debug)]
pub struct LookupTable {
    index: usize,
}

impl LookupTable {
    pub fn new<F: PrimeField>(b: &mut Builder<F>) -> Self {
        let index = b.lookups.len();
        b.lookups.push(LookupState::default());
        LookupTable { index }
    }

    /// Appends a value at the next integer index and returns that index.
    /// Duplicate values are fine and get distinct indices.
    pub fn insert<F: PrimeField>(&self, b: &mut Builder<F>, value: Variable<F>) -> usize {
        let state = &mut b.lookups[self.index];
        state.entries.push(value);
        state.entries.len() - 1
    }

    pub fn len<F: PrimeField>(&self, b: &Builder<F>) -> usize {
        b.lookups[self.index].entries.len()
    }

    /// Answers each query with the entry at that index. The results are
    /// bound by hint immediately and by the log-derivative argument at
    /// finalization.
    pub fn lookup<F: PrimeField>(
        &self,
        b: &mut Builder<F>,
        queries: &[Variable<F>],
    ) -> Result<Vec<Variable<F>>> {
        let nb_entries = b.lookups[self.index].entries.len();
        if nb_entries == 0 {
            return Err(Error::LookupOutOfBounds {
                index: "any".to_string(),
                table_size: 0,
            });
        }
        if queries.is_empty() {
            return Ok(vec![]);
        }
        let mut inputs = Vec::with_capacity(1 + nb_entries + queries.len());
        inputs.push(Variable::Constant(F::from(nb_entries as u64)));
        inputs.extend(b.lookups[self.index].entries.iter().cloned());
        inputs.extend(queries.iter().cloned());
        let results = b.new_hint(LOOKUP_VALUES_HINT, queries.len(), &inputs)?;

        let state = &mut b.lookups[self.index];
        state.queries.extend(queries.iter().cloned());
        state.results.extend(results.iter().cloned());
        Ok(results)
    }
}

/// Emits the log-derivative argument for every table with at least one
/// query. Called once from [`Builder::finalize`].
pub(crate) fn finalize_lookups<F: PrimeField>(b: &mut Builder<F>) -> Result<()> {
    let states = std::mem::take(&mut b.lookups);
    for state in &states {
        if state.queries.is_empty() {
            continue;
        }
        log::debug!(
            "lookup argument over {} entries, {} queries",
            state.entries.len(),
            state.queries.len()
        );
        finalize_one(b, state)?;
    }
    Ok(())
}

fn finalize_one<F: PrimeField>(b: &mut Builder<F>, state: &LookupState<F>) -> Result<()> {
    let nb_entries = state.entries.len();

    // multiplicities of each entry across the queries
    let mut mult_inputs = Vec::with_capacity(1 + state.queries.len());
    mult_inputs.push(Variable::Constant(F::from(nb_entries as u64)));
    mult_inputs.extend(state.queries.iter().cloned());
    let multiplicities = b.new_hint(LOOKUP_MULTIPLICITIES_HINT, nb_entries, &mult_inputs)?;

    // challenges bound to everything the argument touches
    let mut committed = state.entries.clone();
    committed.extend(state.queries.iter().cloned());
    committed.extend(state.results.iter().cloned());
    let alpha = b.new_commitment(&committed)?;
    let beta = b.new_commitment(std::slice::from_ref(&alpha))?;

    // Σ 1/(α − (q + β·v)) over the queries
    let mut query_fractions = Vec::with_capacity(state.queries.len());
    for (query, value) in state.queries.iter().zip(&state.results) {
        let beta_v = b.mul(&beta, value);
        let enc = b.add(query, &beta_v);
        let denominator = b.sub(&alpha, &enc);
        let fraction = b.new_internal();
        b.assert_mul(&denominator, &fraction, &Variable::one())?;
        query_fractions.push(fraction);
    }
    let lhs = b.sum(&query_fractions);

    // Σ mᵢ/(α − (i + β·eᵢ)) over the entries
    let mut entry_fractions = Vec::with_capacity(state.entries.len());
    for (i, (entry, multiplicity)) in state.entries.iter().zip(&multiplicities).enumerate() {
        let beta_e = b.mul(&beta, entry);
        let index = Variable::Constant(F::from(i as u64));
        let enc = b.add(&index, &beta_e);
        let denominator = b.sub(&alpha, &enc);
        let fraction = b.new_internal();
        b.assert_mul(&denominator, &fraction, multiplicity)?;
        entry_fractions.push(fraction);
    }
    let rhs = b.sum(&entry_fractions);

    b.assert_is_equal(&lhs, &rhs)
}
