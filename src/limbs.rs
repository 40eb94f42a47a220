//! Limb algebra: field variables viewed as concatenated bit-groups.
//!
//! A [`Limb`] is a variable asserted to hold exactly `size` bits; a sequence
//! is big-endian (the first limb is most significant). Splitting is done by
//! hint and tied back with a weighted-sum constraint; merging is purely
//! constraint-side; rotations split the limb straddling the boundary and
//! rearrange the sequence.

use ark_ff::PrimeField;

use crate::builder::{Builder, Variable};
use crate::error::{Error, Result};
use crate::hints::LIMB_SPLIT_HINT;

/// A field variable holding an unsigned integer of exactly `size` bits.
#[derive(Clone, Debug)]
pub struct Limb<F: PrimeField> {
    pub val: Variable<F>,
    pub size: usize,
}

impl<F: PrimeField> Limb<F> {
    pub fn new(val: Variable<F>, size: usize) -> Self {
        Limb { val, size }
    }

    /// A constant limb; the value must fit in `size` bits.
    pub fn constant(value: u64, size: usize) -> Self {
        debug_assert!(size >= 64 || value < (1 << size));
        Limb {
            val: Variable::Constant(F::from(value)),
            size,
        }
    }
}

/// A big-endian sequence of limbs.
pub type Limbs<F> = Vec<Limb<F>>;

pub fn total_size<F: PrimeField>(ws: &[Limb<F>]) -> usize {
    ws.iter().map(|w| w.size).sum()
}

pub fn values<F: PrimeField>(ws: &[Limb<F>]) -> Vec<Variable<F>> {
    ws.iter().map(|w| w.val.clone()).collect()
}

/// 2^n as a field element.
pub(crate) fn pow2<F: PrimeField>(n: usize) -> F {
    F::from(2u64).pow([n as u64])
}

/// Splits `l` into `nb_limbs` limbs of `limb_size` bits (most significant
/// first) plus one remainder limb when the sizes do not divide evenly. The
/// decomposition comes from a hint; a weighted sum ties it to the input.
///
/// E.g. `1010` with `limb_size = 1`, `nb_limbs = Some(2)` gives `[1, 0, 10]`.
pub fn split<F: PrimeField>(
    b: &mut Builder<F>,
    l: &Limb<F>,
    limb_size: usize,
    nb_limbs_opt: Option<usize>,
) -> Result<Limbs<F>> {
    if limb_size == 0 {
        return Err(Error::InvalidBitSize("limb size must be positive".to_string()));
    }
    let nb_limbs = nb_limbs_opt.unwrap_or(l.size / limb_size);
    if nb_limbs == 0 || nb_limbs > l.size || nb_limbs * limb_size > l.size {
        return Err(Error::InvalidBitSize(format!(
            "cannot split a {}-bit limb into {nb_limbs} limbs of {limb_size} bits",
            l.size
        )));
    }
    let rem_size = l.size - nb_limbs * limb_size;
    let nb_total = nb_limbs + usize::from(rem_size > 0);

    let inputs = [
        l.val.clone(),
        Variable::Constant(F::from(l.size as u64)),
        Variable::Constant(F::from(limb_size as u64)),
        Variable::Constant(F::from(nb_limbs as u64)),
    ];
    let out = b.new_hint(LIMB_SPLIT_HINT, nb_total, &inputs)?;

    let mut ret = Limbs::with_capacity(nb_total);
    let mut weighted = Vec::with_capacity(nb_total);
    let mut nb_zeros = l.size;
    for piece in out.iter().take(nb_limbs) {
        nb_zeros -= limb_size;
        weighted.push(b.scale(piece, pow2::<F>(nb_zeros)));
        ret.push(Limb::new(piece.clone(), limb_size));
    }
    if rem_size > 0 {
        let rem = &out[nb_total - 1];
        weighted.push(rem.clone());
        ret.push(Limb::new(rem.clone(), rem_size));
    }
    let acc = b.sum(&weighted);
    b.assert_is_equal(&acc, &l.val)?;
    Ok(ret)
}

/// Folds a sequence into one limb: `Σ 2^(bits after i)·wᵢ`. No hint, purely
/// constraint-side.
pub fn merge<F: PrimeField>(b: &mut Builder<F>, ws: &[Limb<F>]) -> Result<Limb<F>> {
    if ws.is_empty() {
        return Err(Error::InvalidBitSize(
            "cannot merge an empty limb sequence".to_string(),
        ));
    }
    let total = total_size(ws);
    let mut weighted = Vec::with_capacity(ws.len());
    let mut nb_zeros = total;
    for w in ws {
        nb_zeros -= w.size;
        weighted.push(b.scale(&w.val, pow2::<F>(nb_zeros)));
    }
    Ok(Limb::new(b.sum(&weighted), total))
}

/// Left-rotates the concatenated bit string by `amount` and merges the
/// result. The limb straddling the rotation boundary is split at the offset
/// first; the sequence is then rearranged and merged.
pub fn lrot_merge<F: PrimeField>(
    b: &mut Builder<F>,
    ws: &[Limb<F>],
    amount: usize,
) -> Result<Limb<F>> {
    let total = total_size(ws);
    if amount > total {
        return Err(Error::InvalidBitSize(format!(
            "cannot rotate {total} bits by {amount}"
        )));
    }
    // find the limb the rotation boundary lands in
    let mut i = 0;
    let mut rem = amount;
    while i < ws.len() {
        if rem < ws[i].size {
            break;
        }
        rem -= ws[i].size;
        i += 1;
    }

    // rotate whole limbs
    let mut rotated: Limbs<F> = ws[i..].iter().chain(&ws[..i]).cloned().collect();

    // split the straddling limb: its high `rem` bits move to the back
    if rem > 0 {
        let parts = split(b, &ws[i], rem, Some(1))?;
        if parts.len() != 2 {
            return Err(Error::InvalidBitSize(format!(
                "boundary split produced {} limbs",
                parts.len()
            )));
        }
        rotated.push(parts[0].clone());
        rotated[0] = parts[1].clone();
    }
    merge(b, &rotated)
}

/// [`lrot_merge`] followed by a [`split`] back into `limb_size`-bit chunks.
pub fn lrot<F: PrimeField>(
    b: &mut Builder<F>,
    ws: &[Limb<F>],
    amount: usize,
    limb_size: usize,
) -> Result<Limbs<F>> {
    let rotated = lrot_merge(b, ws, amount)?;
    split(b, &rotated, limb_size, None)
}
