//! End-to-end behavior of the public filter API.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simfilter::{
    bucket_index, FieldStreamCodec, FilterConfig, HyperplaneHash, ProjectionParams,
    SimilarityFilter,
};

const FIXTURE_VALUES: [i32; 6] = [18, 230, 35, 674, 99, 64];

fn fixture_hyperplanes() -> Vec<Vec<f64>> {
    vec![
        vec![1.1119, 0.4241, 1.0369, 0.2489, 0.3948, 0.1853],
        vec![-0.8896, -0.4682, 0.3054, -0.0459, 0.521, -0.6422],
        vec![-0.6203, -0.7395, -0.344, -0.1064, 0.6321, 0.2484],
        vec![-0.1061, -0.8173, 0.4974, -0.0623, -1.4647, 0.8278],
        vec![0.6154, -0.6118, -0.4527, -1.2648, -0.9676, -0.5311],
        vec![1.1018, 0.1573, 0.2458, 0.4344, 1.594, 0.619],
        vec![-1.9739, -0.6337, 0.8423, -1.8112, -0.184, 1.0195],
        vec![-1.3112, 1.6101, 0.552, -0.1501, 0.3249, 0.6498],
    ]
}

#[test]
fn hyperplane_signature_matches_fixture() {
    let key = FieldStreamCodec::encode_ints(&FIXTURE_VALUES);
    let h = HyperplaneHash::new(fixture_hyperplanes()).unwrap();
    let sig = h.signature(&key);
    assert_eq!(sig.len(), 8);
    assert_eq!(sig.to_u64(), 0b1010_0001);
    for bit in [0, 5, 7] {
        assert!(sig.get(bit));
    }
    for bit in [1, 2, 3, 4, 6] {
        assert!(!sig.get(bit));
    }
}

#[test]
fn hyperplane_signature_is_deterministic() {
    let key = FieldStreamCodec::encode_ints(&FIXTURE_VALUES);
    let h = HyperplaneHash::new(fixture_hyperplanes()).unwrap();
    assert_eq!(h.signature(&key), h.signature(&key));
}

#[test]
fn random_signature_is_produced_without_a_key() {
    let h = HyperplaneHash::new(fixture_hyperplanes()).unwrap();
    assert_eq!(h.random_signature().len(), 8);
}

#[test]
fn custom_source_feeds_signatures() {
    let h = HyperplaneHash::new(fixture_hyperplanes())
        .unwrap()
        .with_source(Arc::new(|_: &[u8]| {
            FIXTURE_VALUES.iter().map(|&v| v as f64).collect::<Vec<f64>>()
        }));
    assert_eq!(h.signature(b"ignored").to_u64(), 0b1010_0001);
}

/// One table whose hashes are `floor(v_i / 4)`: rows `2·e_i` scaled by `R = 2`, zero offsets.
fn axis_aligned(coeff_seed: u64) -> (FilterConfig, SimilarityFilter) {
    let config = FilterConfig::with_dimension(2)
        .num_tables(1)
        .hash_count(2)
        .bucket_width(4.0)
        .scale(2.0)
        .coeff_seed(coeff_seed);
    let params =
        ProjectionParams::new(vec![vec![2.0, 0.0], vec![0.0, 2.0]], vec![0.0, 0.0]).unwrap();
    let filter = SimilarityFilter::with_params(config.clone(), vec![params]).unwrap();
    (config, filter)
}

/// The exact bucket of `v` followed by its 2K multi-probe buckets.
fn probe_buckets(config: &FilterConfig, filter: &SimilarityFilter, v: &[f64]) -> Vec<usize> {
    let table = &filter.tables()[0];
    let mut hashes = table.params().hashes(v, config.scale, config.bucket_width);
    let coeffs = filter.coeffs().as_slice();
    let mut out = vec![bucket_index(&hashes, coeffs, config.capacity)];
    for i in 0..hashes.len() {
        let exact = hashes[i];
        for probe in [exact.wrapping_sub(1), exact.wrapping_add(1)] {
            hashes[i] = probe;
            out.push(bucket_index(&hashes, coeffs, config.capacity));
        }
        hashes[i] = exact;
    }
    out
}

#[test]
fn multi_probe_recovers_neighbor_one_bucket_away() {
    let (config, filter) = axis_aligned(FilterConfig::default().coeff_seed);
    filter.add(&FieldStreamCodec::encode(&[1.0, 1.0]));

    for neighbor in [[5.0, 1.0], [1.0, 6.5], [-2.0, 1.0], [1.0, -0.5]] {
        let exact = probe_buckets(&config, &filter, &neighbor)[0];
        assert!(
            !filter.tables()[0].bits().get(exact as i64),
            "{neighbor:?} shares the exact bucket"
        );
        assert!(filter.is_present_vector(&neighbor), "{neighbor:?} not recovered");
    }
}

#[test]
fn multi_probe_does_not_reach_two_buckets_away() {
    let inserted = [1.0, 1.0];
    for far in [[5.0, 5.0], [9.0, 1.0], [1.0, -6.0]] {
        // pick coefficients under which no candidate of `far` collides with `inserted`
        let (_, filter) = (0..100)
            .map(axis_aligned)
            .find(|(config, filter)| {
                let set = probe_buckets(config, filter, &inserted)[0];
                !probe_buckets(config, filter, &far).contains(&set)
            })
            .unwrap();
        filter.add_vector(&inserted);
        assert!(filter.is_present_vector(&inserted));
        assert!(!filter.is_present_vector(&far), "{far:?} reported present");
    }
}

#[test]
fn distant_vectors_are_mostly_absent() {
    let mut false_count = 0;
    let trials = 100;
    for seed in 0..trials {
        let mut rng = StdRng::seed_from_u64(seed);
        let filter =
            SimilarityFilter::with_rng(FilterConfig::with_dimension(6), &mut rng).unwrap();
        let v: Vec<f64> = (0..6).map(|_| rng.gen_range(-10.0..10.0)).collect();
        filter.add_vector(&v);
        let far: Vec<f64> = v.iter().map(|x| x + rng.gen_range(80.0..120.0)).collect();
        if !filter.is_present_vector(&far) {
            false_count += 1;
        }
    }
    assert!(false_count >= 95, "only {false_count}/{trials} distant queries rejected");
}

#[test]
fn reinserted_keys_are_never_missed() {
    let mut rng = StdRng::seed_from_u64(77);
    let filter = SimilarityFilter::with_rng(FilterConfig::with_dimension(6), &mut rng).unwrap();
    let keys: Vec<Vec<u8>> = (0..200)
        .map(|_| {
            let v: Vec<f64> = (0..6).map(|_| rng.gen_range(-1000.0..1000.0)).collect();
            FieldStreamCodec::encode(&v)
        })
        .collect();
    for k in &keys {
        filter.add(k);
    }
    assert!(keys.iter().all(|k| filter.is_present(k)));
}

#[test]
fn restored_filter_answers_like_the_persisted_one() {
    let mut rng = StdRng::seed_from_u64(5);
    let config = FilterConfig::with_dimension(4).capacity(2048);
    let filter = SimilarityFilter::with_rng(config.clone(), &mut rng).unwrap();
    let keys: Vec<Vec<u8>> = (0..30)
        .map(|i| FieldStreamCodec::encode(&[i as f64, 1.0, -2.0, 3.5]))
        .collect();
    for k in &keys {
        filter.add(k);
    }

    let bytes = filter.to_bytes();
    assert_eq!(bytes.len(), filter.serialized_size());
    let restored = SimilarityFilter::from_bytes(&bytes, config).unwrap();
    assert_eq!(restored, filter);

    let probes: Vec<Vec<u8>> = (0..100)
        .map(|_| {
            let v: Vec<f64> = (0..4).map(|_| rng.gen_range(-50.0..50.0)).collect();
            FieldStreamCodec::encode(&v)
        })
        .chain(keys.iter().cloned())
        .collect();
    for p in &probes {
        assert_eq!(restored.is_present(p), filter.is_present(p));
    }
}

#[test]
fn shared_copy_and_clear_act_on_one_storage() {
    let filter = SimilarityFilter::new(FilterConfig::with_dimension(3)).unwrap();
    let reader = filter.shared_copy();
    let key = FieldStreamCodec::encode(&[3.0, 1.0, 4.0]);
    filter.add(&key);
    assert!(reader.is_present(&key));
    reader.clear();
    assert!(!filter.is_present(&key));
    reader.close();
    filter.add(&key);
    assert!(filter.is_present(&key));
}

#[test]
fn filter_handles_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SimilarityFilter>();

    let filter = Arc::new(SimilarityFilter::new(FilterConfig::with_dimension(2)).unwrap());
    let writer = Arc::clone(&filter);
    std::thread::spawn(move || writer.add(&FieldStreamCodec::encode(&[7.0, 7.0])))
        .join()
        .unwrap();
    assert!(filter.is_present(&FieldStreamCodec::encode(&[7.0, 7.0])));
}
