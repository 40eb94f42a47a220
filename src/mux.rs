//! Multiplexer: selects one column of a matrix of variables by a runtime
//! index.
//!
//! Each row of the output is `Σᵢ indᵢ·row[i]` where `indᵢ = is_zero(sel − i)`
//! and exactly one indicator is 1 (enforced by `Σ indᵢ = 1`).

use ark_ff::PrimeField;

use crate::builder::{Builder, Variable};
use crate::error::{Error, Result};

/// `inputs[row][col]`; returns one variable per row, each holding
/// `inputs[row][selector]`.
pub fn multiplex<F: PrimeField>(
    b: &mut Builder<F>,
    selector: &Variable<F>,
    inputs: &[Vec<Variable<F>>],
) -> Result<Vec<Variable<F>>> {
    let nb_cols = inputs.first().map(Vec::len).unwrap_or(0);
    if nb_cols == 0 {
        return Err(Error::Message("multiplexer over zero columns".to_string()));
    }
    if inputs.iter().any(|row| row.len() != nb_cols) {
        return Err(Error::Message("ragged multiplexer matrix".to_string()));
    }

    let mut indicators = Vec::with_capacity(nb_cols);
    for i in 0..nb_cols {
        let idx = Variable::Constant(F::from(i as u64));
        let diff = b.sub(selector, &idx);
        indicators.push(b.is_zero(&diff)?);
    }
    // out-of-range selectors leave every indicator at zero
    let sum = b.sum(&indicators);
    b.assert_is_equal(&sum, &Variable::one())?;

    let mut out = Vec::with_capacity(inputs.len());
    for row in inputs {
        let mut gated = Vec::with_capacity(nb_cols);
        for (value, ind) in row.iter().zip(&indicators) {
            gated.push(b.mul(ind, value));
        }
        out.push(b.sum(&gated));
    }
    Ok(out)
}
