//! Keccak-256 over lookup-backed limbs, checked bit-for-bit against the
//! reference implementation.

use ark_bn254::Fr;
use chutney::keccak::{bytes_to_bits, pad101_bytes, Keccak256, Keccakf};
use chutney::limbs::{self, Limb};
use chutney::{solve, solve_parallel, Builder, Error, Variable};
use sha3::{Digest, Keccak256 as RefKeccak256};

fn secret_bits(b: &mut Builder<Fr>, n: usize) -> Vec<Variable<Fr>> {
    (0..n).map(|_| b.new_secret("bit")).collect()
}

fn bit_witness(bits: &[u8]) -> Vec<Fr> {
    bits.iter().map(|&bit| Fr::from(bit as u64)).collect()
}

#[test]
fn keccak256_single_round_matches_the_test_vector() {
    let message =
        hex::decode("ff00000000000000000000000000000000000000000000000000000000000010ff")
            .unwrap();
    let expected =
        hex::decode("746cc57064795780b008312042c24f949ad9dc0ee2dce9f4828f5a8869ccecca")
            .unwrap();
    // the vector is what the reference implementation computes
    assert_eq!(RefKeccak256::digest(&message).as_slice(), &expected[..]);

    let padded = pad101_bytes(&message);
    let data_bits = bytes_to_bits(&padded);
    assert_eq!(data_bits.len(), 1088);

    let mut b = Builder::<Fr>::r1cs();
    let data = secret_bits(&mut b, data_bits.len());
    let keccak = Keccak256::new(&mut b, 2).unwrap();
    let out = keccak
        .hash(&mut b, 1, 1, 1, &Variable::Constant(Fr::from(0u64)), &data)
        .unwrap();
    assert_eq!(out.len(), 256);
    let (cs, hints) = b.finalize().unwrap();

    let witness = solve(&cs, &hints, &[], &bit_witness(&data_bits)).unwrap();
    let expected_bits = bytes_to_bits(&expected);
    for (i, (var, want)) in out.iter().zip(&expected_bits).enumerate() {
        assert_eq!(witness.eval(var), Fr::from(*want as u64), "digest bit {i}");
    }

    // the parallel solver reaches the identical assignment
    let parallel = solve_parallel(&cs, &hints, &[], &bit_witness(&data_bits)).unwrap();
    assert_eq!(witness.values(), parallel.values());
}

#[test]
fn keccak256_multi_round_selects_by_round_index() {
    let message: Vec<u8> = (0..200).map(|i| (i as u8).wrapping_mul(7).wrapping_add(3)).collect();
    let expected = RefKeccak256::digest(&message);

    let padded = pad101_bytes(&message);
    assert_eq!(padded.len(), 2 * 136);
    let data_bits = bytes_to_bits(&padded);

    let mut b = Builder::<Fr>::r1cs();
    let round_index = b.new_public("round_index");
    let data = secret_bits(&mut b, data_bits.len());
    let keccak = Keccak256::new(&mut b, 2).unwrap();
    let out = keccak.hash(&mut b, 2, 1, 1, &round_index, &data).unwrap();
    let (cs, hints) = b.finalize().unwrap();

    // the full 200-byte message needs both absorb rounds: index 1
    let witness = solve(&cs, &hints, &[Fr::from(1u64)], &bit_witness(&data_bits)).unwrap();
    let expected_bits = bytes_to_bits(&expected);
    for (i, (var, want)) in out.iter().zip(&expected_bits).enumerate() {
        assert_eq!(witness.eval(var), Fr::from(*want as u64), "digest bit {i}");
    }
}

#[test]
fn lane_xor_matches_u64_xor() {
    // exercises the k = 4 tables; xor commutes with the limb layout, so the
    // merged result equals the plain u64 xor whatever the bit order
    let a_value: u64 = 0x0123_4567_89AB_CDEF;
    let b_value: u64 = 0xFEDC_BA98_7654_3210;

    let mut b = Builder::<Fr>::r1cs();
    let f = Keccakf::new(&mut b, 4).unwrap();
    let a_wire = b.new_secret("a");
    let b_wire = b.new_secret("b");
    let a_lane = limbs::split(&mut b, &Limb::new(a_wire, 64), 4, None).unwrap();
    let b_lane = limbs::split(&mut b, &Limb::new(b_wire, 64), 4, None).unwrap();
    let xored = f.xor2(&mut b, &a_lane, &b_lane).unwrap();
    let merged = limbs::merge(&mut b, &xored).unwrap();
    let (cs, hints) = b.finalize().unwrap();

    let witness = solve(&cs, &hints, &[], &[Fr::from(a_value), Fr::from(b_value)]).unwrap();
    assert_eq!(witness.eval(&merged.val), Fr::from(a_value ^ b_value));
}

#[test]
fn hash_preconditions_are_validated() {
    let mut b = Builder::<Fr>::r1cs();
    let keccak = Keccak256::new(&mut b, 2).unwrap();
    let sel = Variable::Constant(Fr::from(0u64));

    // 3 divides neither 1088 nor the limb width
    let data = secret_bits(&mut b, 1088);
    assert!(matches!(
        keccak.hash(&mut b, 1, 3, 1, &sel, &data),
        Err(Error::InvalidBitSize(_))
    ));
    // wrong data length for the declared rounds
    assert!(matches!(
        keccak.hash(&mut b, 2, 1, 1, &sel, &data),
        Err(Error::InvalidBitSize(_))
    ));
    // zero rounds
    assert!(matches!(
        keccak.hash(&mut b, 0, 1, 1, &sel, &data),
        Err(Error::InvalidBitSize(_))
    ));

    // unsupported limb width
    let mut b2 = Builder::<Fr>::r1cs();
    assert!(matches!(
        Keccak256::new(&mut b2, 5),
        Err(Error::InvalidBitSize(_))
    ));
}
