//! End-to-end builder → IR → solver scenarios.

use ark_bn254::Fr;
use chutney::constraint::{pack_wire, system::ConstraintSystem, HintMapping, Visibility};
use chutney::hints::HintRegistry;
use chutney::{solve, solve_parallel, Builder, Error, Variable};
use num_bigint::BigUint;

#[test]
fn empty_circuit_solves() {
    let b = Builder::<Fr>::r1cs();
    let (cs, hints) = b.finalize().unwrap();
    let witness = solve(&cs, &hints, &[], &[]).unwrap();
    assert_eq!(witness.values().len(), 1); // just the constant-ONE wire

    let mut bytes = Vec::new();
    cs.write_to(&mut bytes).unwrap();
    assert_eq!(bytes.len(), 32, "empty system serializes to the header only");
}

#[test]
fn quadratic_identity_r1cs() {
    let mut b = Builder::<Fr>::r1cs();
    let y = b.new_public("y");
    let x = b.new_secret("x");
    let xx = b.mul(&x, &x);
    b.assert_is_equal(&xx, &y).unwrap();
    let (cs, hints) = b.finalize().unwrap();

    let witness = solve(&cs, &hints, &[Fr::from(25u64)], &[Fr::from(5u64)]).unwrap();
    assert_eq!(witness.eval(&xx), Fr::from(25u64));

    let err = solve(&cs, &hints, &[Fr::from(25u64)], &[Fr::from(6u64)]).unwrap_err();
    assert!(matches!(err, Error::UnsatisfiedConstraint { .. }), "{err}");
}

#[test]
fn quadratic_identity_plonk() {
    let mut b = Builder::<Fr>::plonk();
    let y = b.new_public("y");
    let x = b.new_secret("x");
    let xx = b.mul(&x, &x);
    b.assert_is_equal(&xx, &y).unwrap();
    let (cs, hints) = b.finalize().unwrap();

    let witness = solve(&cs, &hints, &[Fr::from(25u64)], &[Fr::from(5u64)]).unwrap();
    assert_eq!(witness.eval(&xx), Fr::from(25u64));

    let err = solve(&cs, &hints, &[Fr::from(25u64)], &[Fr::from(6u64)]).unwrap_err();
    assert!(matches!(err, Error::UnsatisfiedConstraint { .. }), "{err}");
}

fn modular_inverse(m: &BigUint, inputs: &[BigUint], outputs: &mut [BigUint]) -> chutney::Result<()> {
    if inputs[0] == BigUint::from(0u32) {
        return Err(Error::Message("inverse of zero".to_string()));
    }
    outputs[0] = inputs[0].modpow(&(m - 2u32), m);
    Ok(())
}

#[test]
fn hint_plus_constraint_r1cs() {
    let mut b = Builder::<Fr>::r1cs();
    let id = b.register_hint("tests/modular-inverse", modular_inverse).unwrap();
    let x = b.new_secret("x");
    let inv = b.new_hint(id, 1, &[x.clone()]).unwrap();
    b.assert_mul(&x, &inv[0], &Variable::one()).unwrap();
    let (cs, hints) = b.finalize().unwrap();

    let witness = solve(&cs, &hints, &[], &[Fr::from(7u64)]).unwrap();
    assert_eq!(witness.eval(&inv[0]) * Fr::from(7u64), Fr::from(1u64));
}

#[test]
fn hint_plus_constraint_plonk() {
    let mut b = Builder::<Fr>::plonk();
    let id = b.register_hint("tests/modular-inverse", modular_inverse).unwrap();
    let x = b.new_secret("x");
    let inv = b.new_hint(id, 1, &[x.clone()]).unwrap();
    b.assert_mul(&x, &inv[0], &Variable::one()).unwrap();
    let (cs, hints) = b.finalize().unwrap();

    let witness = solve(&cs, &hints, &[], &[Fr::from(7u64)]).unwrap();
    assert_eq!(witness.eval(&inv[0]) * Fr::from(7u64), Fr::from(1u64));
}

#[test]
fn hint_failure_is_fatal() {
    let mut b = Builder::<Fr>::r1cs();
    let id = b.register_hint("tests/modular-inverse", modular_inverse).unwrap();
    let x = b.new_secret("x");
    let inv = b.new_hint(id, 1, &[x.clone()]).unwrap();
    b.assert_mul(&x, &inv[0], &Variable::one()).unwrap();
    let (cs, hints) = b.finalize().unwrap();

    let err = solve(&cs, &hints, &[], &[Fr::from(0u64)]).unwrap_err();
    assert!(matches!(err, Error::HintFailed { .. }), "{err}");
}

#[test]
fn select_is_zero_and_to_binary() {
    let mut b = Builder::<Fr>::r1cs();
    let x = b.new_secret("x");
    let y = b.new_secret("y");

    let x_is_zero = b.is_zero(&x).unwrap();
    let y_is_zero = b.is_zero(&y).unwrap();
    let picked = b.select(&x_is_zero, &x, &y);
    let bits = b.to_binary(&y, 8).unwrap();
    let (cs, hints) = b.finalize().unwrap();

    let witness = solve(&cs, &hints, &[], &[Fr::from(0u64), Fr::from(0b1011_0001u64)]).unwrap();
    assert_eq!(witness.eval(&x_is_zero), Fr::from(1u64));
    assert_eq!(witness.eval(&y_is_zero), Fr::from(0u64));
    assert_eq!(witness.eval(&picked), Fr::from(0u64));
    let expected = [1u64, 0, 0, 0, 1, 1, 0, 1]; // lsb first
    for (bit, want) in bits.iter().zip(expected) {
        assert_eq!(witness.eval(bit), Fr::from(want));
    }
}

#[test]
fn to_binary_rejects_oversized_values() {
    let mut b = Builder::<Fr>::r1cs();
    let x = b.new_secret("x");
    let _bits = b.to_binary(&x, 4).unwrap();
    let (cs, hints) = b.finalize().unwrap();

    let err = solve(&cs, &hints, &[], &[Fr::from(16u64)]).unwrap_err();
    let Error::HintFailed { cause, .. } = err else {
        panic!("expected a hint failure");
    };
    assert!(matches!(*cause, Error::OutOfRange { nb_bits: 4, .. }));
}

#[test]
fn unconstrained_wire_is_underdetermined() {
    let mut b = Builder::<Fr>::r1cs();
    let x = b.new_secret("x");
    let dangling = b.new_internal();
    // mentions the internal wire together with another unknown, so no single
    // instruction can determine it
    let product = b.mul(&dangling, &x);
    let _ = product;
    let (cs, hints) = b.finalize().unwrap();

    let err = solve(&cs, &hints, &[], &[Fr::from(3u64)]).unwrap_err();
    assert!(matches!(err, Error::UnderdeterminedWire { .. }), "{err}");
}

#[test]
fn double_assignment_is_fatal() {
    let mut registry = HintRegistry::empty();
    let five = registry
        .register("tests/five", |_, _, out| {
            out[0] = BigUint::from(5u32);
            Ok(())
        })
        .unwrap();
    let six = registry
        .register("tests/six", |_, _, out| {
            out[0] = BigUint::from(6u32);
            Ok(())
        })
        .unwrap();

    let mut cs = ConstraintSystem::<Fr>::new();
    cs.nb_internal = 1;
    let wire = pack_wire(Visibility::Internal, 0);
    for hint_id in [five, six] {
        cs.add_hint(&HintMapping {
            hint_id,
            inputs: vec![],
            outputs: vec![wire],
        })
        .unwrap();
    }

    let err = solve(&cs, &registry, &[], &[]).unwrap_err();
    assert!(matches!(err, Error::DoubleAssignment { .. }), "{err}");
}

#[test]
fn solver_is_deterministic_and_parallel_matches() {
    let build = || {
        let mut b = Builder::<Fr>::r1cs();
        let x = b.new_secret("x");
        let y = b.new_secret("y");
        let xy = b.mul(&x, &y);
        let z = b.is_zero(&xy).unwrap();
        let sum = b.add(&xy, &y);
        let picked = b.select(&z, &x, &sum);
        let bits = b.to_binary(&picked, 16).unwrap();
        let _ = bits;
        b.finalize().unwrap()
    };
    let (cs, hints) = build();
    let secret = [Fr::from(123u64), Fr::from(321u64)];

    let w1 = solve(&cs, &hints, &[], &secret).unwrap();
    let w2 = solve(&cs, &hints, &[], &secret).unwrap();
    assert_eq!(w1.values(), w2.values());

    let w3 = solve_parallel(&cs, &hints, &[], &secret).unwrap();
    assert_eq!(w1.values(), w3.values());
}

/// A module-registered blueprint: squares its input wire into its output
/// wire. Calldata is `[input_vid, output_vid]`.
struct SquareGate;

impl chutney::constraint::blueprint::ExtensionBlueprint<Fr> for SquareGate {
    fn nb_inputs(&self) -> i32 {
        2
    }

    fn nb_constraints(&self) -> u32 {
        1
    }

    fn solve(
        &self,
        solver: &mut dyn chutney::constraint::blueprint::Solver<Fr>,
        calldata: &[u32],
    ) -> Option<chutney::Result<()>> {
        Some((|| {
            let x = solver.get_value(chutney::constraint::COEFF_ONE, calldata[0])?;
            solver.set_value(calldata[1], x * x)
        })())
    }
}

#[test]
fn extension_blueprints_dispatch_through_the_registry() {
    use chutney::constraint::blueprint::Blueprint;

    let mut cs = ConstraintSystem::<Fr>::new();
    cs.nb_secret = 1;
    cs.nb_internal = 1;
    let id = cs.blueprints.register(Blueprint::Extension(Box::new(SquareGate)));
    assert_eq!(id, 4, "user blueprints start after the reserved ids");

    let input = pack_wire(Visibility::Secret, 0);
    let output = pack_wire(Visibility::Internal, 0);
    cs.push_instruction(id, &[input, output]);

    let registry = HintRegistry::empty();
    let witness = solve(&cs, &registry, &[], &[Fr::from(9u64)]).unwrap();
    assert_eq!(witness.wire(output), Fr::from(81u64));
}

#[test]
fn plonk_constraint_debug_message_surfaces() {
    let mut b = Builder::<Fr>::plonk();
    let x = b.new_secret("x");
    let y = b.new_secret("y");
    let tx = b.seal(&x);
    let ty = b.seal(&y);
    let one = b.coeff_id(&BigUint::from(1u32));
    let minus_one = b.coeff_id_i64(-1);
    let zero = b.coeff_id(&BigUint::from(0u32));
    // x - y = 0, annotated
    b.add_plonk_constraint(
        tx,
        ty,
        tx,
        one,
        minus_one,
        zero,
        zero,
        zero,
        zero,
        Some("x must equal y".to_string()),
    )
    .unwrap();
    let (cs, hints) = b.finalize().unwrap();

    assert!(solve(&cs, &hints, &[], &[Fr::from(4u64), Fr::from(4u64)]).is_ok());
    let err = solve(&cs, &hints, &[], &[Fr::from(4u64), Fr::from(5u64)]).unwrap_err();
    let Error::UnsatisfiedConstraint { lhs, .. } = err else {
        panic!("expected an unsatisfied constraint");
    };
    assert!(lhs.contains("x must equal y"), "{lhs}");
}
