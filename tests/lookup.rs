//! Log-derivative lookup table scenarios, including the randomized stress
//! test: many entries, many queries, every returned value must match the
//! entry at the queried index.

use ark_bn254::Fr;
use ark_ff::UniformRand;
use chutney::lookup::LookupTable;
use chutney::{solve, solve_parallel, Builder, Error, Variable};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn lookup_returns_inserted_entries() {
    let mut b = Builder::<Fr>::r1cs();
    let table = LookupTable::new(&mut b);
    let entries: Vec<Variable<Fr>> = (0..10).map(|_| b.new_secret("entry")).collect();
    for e in &entries {
        table.insert(&mut b, e.clone());
    }
    let queries: Vec<Variable<Fr>> = (0..10).map(|_| b.new_public("query")).collect();
    let expected: Vec<Variable<Fr>> = (0..10).map(|_| b.new_secret("expected")).collect();
    let results = table.lookup(&mut b, &queries).unwrap();
    for (r, e) in results.iter().zip(&expected) {
        b.assert_is_equal(r, e).unwrap();
    }
    let (cs, hints) = b.finalize().unwrap();

    let mut rng = StdRng::seed_from_u64(42);
    let entry_values: Vec<Fr> = (0..10).map(|_| Fr::rand(&mut rng)).collect();
    let query_indices: Vec<usize> = (0..10).map(|_| rng.gen_range(0..10)).collect();
    let public: Vec<Fr> = query_indices.iter().map(|&i| Fr::from(i as u64)).collect();
    let mut secret = entry_values.clone();
    secret.extend(query_indices.iter().map(|&i| entry_values[i]));

    let witness = solve(&cs, &hints, &public, &secret).unwrap();
    for (i, r) in results.iter().enumerate() {
        assert_eq!(witness.eval(r), entry_values[query_indices[i]]);
    }
}

#[test]
fn lookup_stress_random_entries_and_queries() {
    const NB_ENTRIES: usize = 1000;
    const NB_QUERIES: usize = 100;

    let mut b = Builder::<Fr>::r1cs();
    let table = LookupTable::new(&mut b);
    let entries: Vec<Variable<Fr>> = (0..NB_ENTRIES).map(|_| b.new_secret("entry")).collect();
    for e in &entries {
        table.insert(&mut b, e.clone());
    }
    let queries: Vec<Variable<Fr>> = (0..NB_QUERIES).map(|_| b.new_public("query")).collect();
    let results = table.lookup(&mut b, &queries).unwrap();
    let (cs, hints) = b.finalize().unwrap();

    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let entry_values: Vec<Fr> = (0..NB_ENTRIES).map(|_| Fr::rand(&mut rng)).collect();
    let query_indices: Vec<usize> = (0..NB_QUERIES)
        .map(|_| rng.gen_range(0..NB_ENTRIES))
        .collect();
    let public: Vec<Fr> = query_indices.iter().map(|&i| Fr::from(i as u64)).collect();

    let witness = solve(&cs, &hints, &public, &entry_values).unwrap();
    for (r, &i) in results.iter().zip(&query_indices) {
        assert_eq!(witness.eval(r), entry_values[i]);
    }

    // the parallel mode resolves the exact same assignment
    let parallel = solve_parallel(&cs, &hints, &public, &entry_values).unwrap();
    assert_eq!(witness.values(), parallel.values());
}

#[test]
fn lookup_before_any_insert_fails() {
    let mut b = Builder::<Fr>::r1cs();
    let table = LookupTable::new(&mut b);
    let q = b.new_public("q");
    let err = table.lookup(&mut b, &[q]).unwrap_err();
    assert!(matches!(err, Error::LookupOutOfBounds { table_size: 0, .. }), "{err}");
}

#[test]
fn out_of_bounds_query_fails_at_solve_time() {
    let mut b = Builder::<Fr>::r1cs();
    let table = LookupTable::new(&mut b);
    for i in 0..4u64 {
        table.insert(&mut b, Variable::Constant(Fr::from(10 + i)));
    }
    let q = b.new_public("q");
    let _results = table.lookup(&mut b, &[q]).unwrap();
    let (cs, hints) = b.finalize().unwrap();

    assert!(solve(&cs, &hints, &[Fr::from(3u64)], &[]).is_ok());

    let err = solve(&cs, &hints, &[Fr::from(4u64)], &[]).unwrap_err();
    let Error::HintFailed { cause, .. } = err else {
        panic!("expected a hint failure");
    };
    assert!(matches!(*cause, Error::LookupOutOfBounds { table_size: 4, .. }));
}

#[test]
fn duplicate_insertions_get_distinct_indices() {
    let mut b = Builder::<Fr>::r1cs();
    let table = LookupTable::new(&mut b);
    let v = Variable::Constant(Fr::from(7u64));
    assert_eq!(table.insert(&mut b, v.clone()), 0);
    assert_eq!(table.insert(&mut b, v.clone()), 1);
    assert_eq!(table.len(&b), 2);

    // both indices answer with the same value
    let q0 = b.new_public("q0");
    let q1 = b.new_public("q1");
    let results = table.lookup(&mut b, &[q0, q1]).unwrap();
    let (cs, hints) = b.finalize().unwrap();
    let witness = solve(&cs, &hints, &[Fr::from(0u64), Fr::from(1u64)], &[]).unwrap();
    assert_eq!(witness.eval(&results[0]), Fr::from(7u64));
    assert_eq!(witness.eval(&results[1]), Fr::from(7u64));
}
