//! Hint functions: non-deterministic advice oracles.
//!
//! A hint receives the field modulus and the evaluated input expressions as
//! big integers, and fills the output slots. The circuit always constrains
//! the results separately; a hint can therefore be wrong but never unsound.
//!
//! Hints are registered under a stable 64-bit id derived from the FNV-1a hash
//! of their canonical name. Ids are a serialization contract: a persisted
//! system names its hints by id, and solving requires a registry that knows
//! all of them.

use std::collections::HashMap;
use std::sync::Mutex;

use num_bigint::BigUint;
use once_cell::sync::Lazy;
use tiny_keccak::{Hasher, Keccak};

use crate::error::{Error, Result};

/// The hint function contract: `f(modulus, inputs, outputs)`.
pub type HintFn = fn(&BigUint, &[BigUint], &mut [BigUint]) -> Result<()>;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a over the canonical hint name. Stable across processes and
/// architectures.
pub const fn hint_id(name: &str) -> u64 {
    let bytes = name.as_bytes();
    let mut hash = FNV_OFFSET;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

pub const INVERSE_HINT: u64 = hint_id("chutney/inverse");
pub const IS_ZERO_HINT: u64 = hint_id("chutney/is_zero");
pub const TO_BINARY_HINT: u64 = hint_id("chutney/to_binary");
pub const LIMB_SPLIT_HINT: u64 = hint_id("chutney/limbs/split");
pub const LOOKUP_VALUES_HINT: u64 = hint_id("chutney/lookup/values");
pub const LOOKUP_MULTIPLICITIES_HINT: u64 = hint_id("chutney/lookup/multiplicities");
pub const RANGE_DECOMPOSE_HINT: u64 = hint_id("chutney/rangecheck/decompose");
pub const COMMITMENT_HINT: u64 = hint_id("chutney/commitment");

/// An explicit hint registry, threaded through builder and solver.
#[derive(Clone)]
pub struct HintRegistry {
    by_id: HashMap<u64, HintFn>,
    names: HashMap<u64, String>,
}

impl HintRegistry {
    /// An empty registry, without even the builtins.
    pub fn empty() -> Self {
        HintRegistry {
            by_id: HashMap::new(),
            names: HashMap::new(),
        }
    }

    /// A registry preloaded with the hints the gadget layer depends on.
    pub fn with_builtins() -> Self {
        let mut r = Self::empty();
        for (name, f) in BUILTINS {
            r.register(name, *f).expect("builtin hint registration");
        }
        r
    }

    /// Registers a function under its canonical name. Re-registering the
    /// same name replaces the function; two distinct names hashing to the
    /// same id are rejected.
    pub fn register(&mut self, name: &str, f: HintFn) -> Result<u64> {
        let id = hint_id(name);
        if let Some(existing) = self.names.get(&id) {
            if existing != name {
                return Err(Error::Message(format!(
                    "hint '{name}' collides with '{existing}'"
                )));
            }
        }
        self.by_id.insert(id, f);
        self.names.insert(id, name.to_string());
        Ok(id)
    }

    pub fn get(&self, id: u64) -> Result<HintFn> {
        self.by_id
            .get(&id)
            .copied()
            .ok_or(Error::UnknownHint { hint_id: id })
    }

    pub fn contains(&self, id: u64) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn name(&self, id: u64) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }
}

impl Default for HintRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

static DEFAULT_REGISTRY: Lazy<Mutex<HintRegistry>> =
    Lazy::new(|| Mutex::new(HintRegistry::with_builtins()));

/// Registers a hint in the process-wide default registry. A thin wrapper: the
/// builder snapshots the default instance at construction time.
pub fn register_hint(name: &str, f: HintFn) -> Result<u64> {
    DEFAULT_REGISTRY.lock().unwrap().register(name, f)
}

/// Clones the process-wide default registry.
pub fn global_registry() -> HintRegistry {
    DEFAULT_REGISTRY.lock().unwrap().clone()
}

const BUILTINS: &[(&str, HintFn)] = &[
    ("chutney/inverse", inverse),
    ("chutney/is_zero", is_zero),
    ("chutney/to_binary", to_binary),
    ("chutney/limbs/split", limb_split),
    ("chutney/lookup/values", lookup_values),
    ("chutney/lookup/multiplicities", lookup_multiplicities),
    ("chutney/rangecheck/decompose", range_decompose),
    ("chutney/commitment", commitment),
];

fn expect_len(io: &[BigUint], n: usize, what: &str) -> Result<()> {
    if io.len() != n {
        return Err(Error::Message(format!(
            "expected {n} {what}, got {}",
            io.len()
        )));
    }
    Ok(())
}

/// `out[0] = in[0]⁻¹ mod p`, or 0 when the input is 0.
fn inverse(modulus: &BigUint, inputs: &[BigUint], outputs: &mut [BigUint]) -> Result<()> {
    expect_len(inputs, 1, "inputs")?;
    expect_len(outputs, 1, "outputs")?;
    outputs[0] = mod_inverse(&inputs[0], modulus);
    Ok(())
}

/// `out = [r, z_inv]` satisfying the is-zero constraints: `r = 1, z_inv = 0`
/// when the input is zero, `r = 0, z_inv = z⁻¹` otherwise.
fn is_zero(modulus: &BigUint, inputs: &[BigUint], outputs: &mut [BigUint]) -> Result<()> {
    expect_len(inputs, 1, "inputs")?;
    expect_len(outputs, 2, "outputs")?;
    if inputs[0] == BigUint::from(0u32) {
        outputs[0] = BigUint::from(1u32);
        outputs[1] = BigUint::from(0u32);
    } else {
        outputs[0] = BigUint::from(0u32);
        outputs[1] = mod_inverse(&inputs[0], modulus);
    }
    Ok(())
}

/// Decomposes `in[0]` into `in[1]` bits, least significant first.
fn to_binary(_modulus: &BigUint, inputs: &[BigUint], outputs: &mut [BigUint]) -> Result<()> {
    expect_len(inputs, 2, "inputs")?;
    let nb_bits = as_usize(&inputs[1])?;
    expect_len(outputs, nb_bits, "outputs")?;
    let v = &inputs[0];
    if v.bits() as usize > nb_bits {
        return Err(Error::OutOfRange {
            value: v.to_string(),
            nb_bits,
        });
    }
    for (i, out) in outputs.iter_mut().enumerate() {
        *out = (v >> i) & BigUint::from(1u32);
    }
    Ok(())
}

/// Splits `in[0]` (holding `in[1]` bits) into `in[3]` limbs of `in[2]` bits,
/// most significant first, plus one remainder limb when the sizes do not
/// divide evenly.
fn limb_split(_modulus: &BigUint, inputs: &[BigUint], outputs: &mut [BigUint]) -> Result<()> {
    expect_len(inputs, 4, "inputs")?;
    let mut rem = inputs[0].clone();
    let mut rem_size = as_usize(&inputs[1])? as isize;
    let limb_size = as_usize(&inputs[2])?;
    let nb_limbs = as_usize(&inputs[3])?;
    for out in outputs.iter_mut().take(nb_limbs) {
        rem_size -= limb_size as isize;
        if rem_size < 0 {
            return Err(Error::InvalidBitSize(format!(
                "cannot take {nb_limbs} limbs of {limb_size} bits out of {} bits",
                inputs[1]
            )));
        }
        let quo = &rem >> (rem_size as usize);
        rem -= &quo << (rem_size as usize);
        *out = quo;
    }
    if rem_size > 0 {
        let last = outputs.len() - 1;
        outputs[last] = rem;
    }
    Ok(())
}

/// `inputs = [n, entries…, queries…]`; answers each query with
/// `entries[query]`.
fn lookup_values(_modulus: &BigUint, inputs: &[BigUint], outputs: &mut [BigUint]) -> Result<()> {
    let nb_entries = as_usize(inputs.first().ok_or_else(|| {
        Error::Message("lookup hint requires an entry count".to_string())
    })?)?;
    let entries = &inputs[1..1 + nb_entries];
    let queries = &inputs[1 + nb_entries..];
    expect_len(outputs, queries.len(), "outputs")?;
    for (q, out) in queries.iter().zip(outputs.iter_mut()) {
        let idx = as_usize(q).ok().filter(|i| *i < nb_entries).ok_or_else(|| {
            Error::LookupOutOfBounds {
                index: q.to_string(),
                table_size: nb_entries,
            }
        })?;
        *out = entries[idx].clone();
    }
    Ok(())
}

/// `inputs = [n, queries…]`; `out[i]` is the number of queries hitting
/// index `i`.
fn lookup_multiplicities(
    _modulus: &BigUint,
    inputs: &[BigUint],
    outputs: &mut [BigUint],
) -> Result<()> {
    let nb_entries = as_usize(inputs.first().ok_or_else(|| {
        Error::Message("multiplicity hint requires an entry count".to_string())
    })?)?;
    expect_len(outputs, nb_entries, "outputs")?;
    for out in outputs.iter_mut() {
        *out = BigUint::from(0u32);
    }
    for q in &inputs[1..] {
        let idx = as_usize(q).ok().filter(|i| *i < nb_entries).ok_or_else(|| {
            Error::LookupOutOfBounds {
                index: q.to_string(),
                table_size: nb_entries,
            }
        })?;
        outputs[idx] += 1u32;
    }
    Ok(())
}

/// Chunks `in[0]` into `in[2]`-bit limbs, least significant first, after
/// checking it fits in `in[1]` bits. The explicit check is what turns a bad
/// witness into [`Error::OutOfRange`] instead of a later sum mismatch.
fn range_decompose(_modulus: &BigUint, inputs: &[BigUint], outputs: &mut [BigUint]) -> Result<()> {
    expect_len(inputs, 3, "inputs")?;
    let v = &inputs[0];
    let nb_bits = as_usize(&inputs[1])?;
    let width = as_usize(&inputs[2])?;
    if v.bits() as usize > nb_bits {
        return Err(Error::OutOfRange {
            value: v.to_string(),
            nb_bits,
        });
    }
    let mask = (BigUint::from(1u32) << width) - 1u32;
    for (i, out) in outputs.iter_mut().enumerate() {
        *out = (v >> (i * width)) & &mask;
    }
    Ok(())
}

/// Derives a transcript challenge from the committed values: absorb each
/// input as big-endian bytes padded to the modulus width, squeeze a Keccak
/// digest, reduce mod p.
fn commitment(modulus: &BigUint, inputs: &[BigUint], outputs: &mut [BigUint]) -> Result<()> {
    expect_len(outputs, 1, "outputs")?;
    let width = (modulus.bits() as usize + 7) / 8;
    let mut hasher = Keccak::v256();
    for input in inputs {
        let mut bytes = input.to_bytes_be();
        let mut padded = vec![0u8; width.saturating_sub(bytes.len())];
        padded.append(&mut bytes);
        hasher.update(&padded);
    }
    let mut digest = [0u8; 32];
    hasher.finalize(&mut digest);
    outputs[0] = BigUint::from_bytes_be(&digest) % modulus;
    Ok(())
}

fn as_usize(v: &BigUint) -> Result<usize> {
    usize::try_from(v).map_err(|_| Error::Message(format!("value {v} does not fit in usize")))
}

/// `a⁻¹ mod p` by Fermat (p prime); 0 maps to 0.
fn mod_inverse(a: &BigUint, modulus: &BigUint) -> BigUint {
    if *a == BigUint::from(0u32) {
        return BigUint::from(0u32);
    }
    a.modpow(&(modulus - 2u32), modulus)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hint_ids_are_stable() {
        // golden values: these are a serialization contract
        assert_eq!(hint_id("chutney/inverse"), INVERSE_HINT);
        assert_eq!(hint_id(""), FNV_OFFSET);
        assert_ne!(INVERSE_HINT, IS_ZERO_HINT);
        assert_ne!(LIMB_SPLIT_HINT, LOOKUP_VALUES_HINT);
    }

    #[test]
    fn registry_roundtrip() {
        let mut reg = HintRegistry::empty();
        let id = reg.register("test/answer", |_, _, out| {
            out[0] = BigUint::from(42u32);
            Ok(())
        }).unwrap();
        assert!(reg.contains(id));
        assert_eq!(reg.name(id), Some("test/answer"));
        let f = reg.get(id).unwrap();
        let mut out = vec![BigUint::from(0u32)];
        f(&BigUint::from(97u32), &[], &mut out).unwrap();
        assert_eq!(out[0], BigUint::from(42u32));
        assert!(matches!(reg.get(7), Err(Error::UnknownHint { hint_id: 7 })));
    }

    #[test]
    fn global_registry_snapshot_sees_registrations() {
        let id = register_hint("tests/global-marker", |_, _, out| {
            out[0] = BigUint::from(1u32);
            Ok(())
        })
        .unwrap();
        assert!(global_registry().contains(id));
        assert!(global_registry().contains(INVERSE_HINT));
    }

    #[test]
    fn inverse_hint_inverts() {
        let p = BigUint::from(97u32);
        let mut out = vec![BigUint::from(0u32)];
        inverse(&p, &[BigUint::from(3u32)], &mut out).unwrap();
        assert_eq!((BigUint::from(3u32) * &out[0]) % &p, BigUint::from(1u32));
        inverse(&p, &[BigUint::from(0u32)], &mut out).unwrap();
        assert_eq!(out[0], BigUint::from(0u32));
    }

    #[test]
    fn limb_split_matches_manual_decomposition() {
        let p = BigUint::from(1u32) << 64;
        // 1010 split into limbs of 1 bit, 2 limbs requested: [1, 0, 10]
        let ins = [
            BigUint::from(0b1010u32),
            BigUint::from(4u32),
            BigUint::from(1u32),
            BigUint::from(2u32),
        ];
        let mut out = vec![BigUint::from(0u32); 3];
        limb_split(&p, &ins, &mut out).unwrap();
        assert_eq!(out[0], BigUint::from(1u32));
        assert_eq!(out[1], BigUint::from(0u32));
        assert_eq!(out[2], BigUint::from(0b10u32));
    }

    #[test]
    fn lookup_hints_answer_and_count() {
        let p = BigUint::from(1u32) << 64;
        let ins: Vec<BigUint> = [3u32, 10, 20, 30, 2, 2, 0]
            .iter()
            .map(|&x| BigUint::from(x))
            .collect();
        let mut values = vec![BigUint::from(0u32); 3];
        lookup_values(&p, &ins, &mut values).unwrap();
        assert_eq!(values[0], BigUint::from(30u32));
        assert_eq!(values[1], BigUint::from(30u32));
        assert_eq!(values[2], BigUint::from(10u32));

        let counts_in: Vec<BigUint> = [3u32, 2, 2, 0].iter().map(|&x| BigUint::from(x)).collect();
        let mut counts = vec![BigUint::from(0u32); 3];
        lookup_multiplicities(&p, &counts_in, &mut counts).unwrap();
        assert_eq!(counts[0], BigUint::from(1u32));
        assert_eq!(counts[1], BigUint::from(0u32));
        assert_eq!(counts[2], BigUint::from(2u32));

        let bad: Vec<BigUint> = [3u32, 5].iter().map(|&x| BigUint::from(x)).collect();
        let mut one = vec![BigUint::from(0u32)];
        assert!(matches!(
            lookup_values(&p, &bad, &mut one),
            Err(Error::LookupOutOfBounds { .. })
        ));
    }

    #[test]
    fn range_decompose_rejects_oversized_values() {
        let p = BigUint::from(1u32) << 64;
        let ins = [
            BigUint::from(256u32),
            BigUint::from(8u32),
            BigUint::from(8u32),
        ];
        let mut out = vec![BigUint::from(0u32)];
        assert!(matches!(
            range_decompose(&p, &ins, &mut out),
            Err(Error::OutOfRange { nb_bits: 8, .. })
        ));
    }

    #[test]
    fn commitment_is_deterministic_and_input_sensitive(){
        let p = (BigUint::from(1u32) << 61) - 1u32;
        let a = [BigUint::from(1u32), BigUint::from(2u32)];
        let b = [BigUint::from(2u32), BigUint::from(1u32)];
        let mut c1 = vec![BigUint::from(0u32)];
        let mut c2 = vec![BigUint::from(0u32)];
        let mut c3 = vec![BigUint::from(0u32)];
        commitment(&p, &a, &mut c1).unwrap();
        commitment(&p, &a, &mut c2).unwrap();
        commitment(&p, &b, &mut c3).unwrap();
        assert_eq!(c1, c2);
        assert_ne!(c1, c3);
        assert!(c1[0] < p);
    }
}
