//! chutney: an arithmetic-circuit IR compiler and in-circuit primitive
//! library.
//!
//! A [`builder::Builder`] collects wires, coefficients, constraints and hints
//! and lowers them — through either a rank-1 or a PLONK-style flavor — into a
//! bytecode-like instruction stream: blueprints dispatching over a shared
//! `u32` calldata buffer ([`constraint`]). The [`solver`] later replays the
//! stream against concrete inputs, executing hints and solving each
//! constraint for its single unknown wire.
//!
//! On top of the same IR sit the in-circuit primitives:
//!
//! - [`lookup`]: append-only tables with batched queries, proven by a
//!   log-derivative argument;
//! - [`limbs`]: split/merge/rotate of field elements viewed as concatenated
//!   bit-groups;
//! - [`keccak`]: Keccak-f[1600] and Keccak-256 over lookup-backed limbs;
//! - [`rangecheck`]: lookup-backed bit-width assertions;
//! - [`mux`]: runtime selection across unrolled circuit states.
//!
//! Field arithmetic is consumed through [`ark_ff::PrimeField`]; no concrete
//! field is baked in.

pub mod builder;
pub mod constraint;
pub mod error;
pub mod hints;
pub mod keccak;
pub mod limbs;
pub mod lookup;
pub mod mux;
pub mod rangecheck;
pub mod solver;

pub use builder::{Builder, LoweringMode, Variable};
pub use error::{Error, Result};
pub use solver::{solve, solve_parallel, Witness};
