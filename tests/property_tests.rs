//! Property-based tests for the filter components.
//!
//! These tests verify invariants that should hold regardless of input:
//! - Buckets always fall inside the table
//! - Bit addressing never goes out of bounds, whatever the sign of the index
//! - Hashing and signatures are pure functions of the key
//! - An added key is always reported present
//! - Decoding never panics

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use simfilter::codec::{decode_bits, decode_fields};
use simfilter::projection::fold_u32;
use simfilter::{
    bucket_index, BitTable, FieldStreamCodec, FilterConfig, HyperplaneHash, SimilarityFilter,
};

prop_compose! {
    fn arb_vector(dim: usize)(vec in prop::collection::vec(-1.0e4f64..1.0e4, dim)) -> Vec<f64> {
        vec
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn buckets_lie_in_capacity(
        hashes in prop::collection::vec(any::<u32>(), 1..8),
        coeffs in prop::collection::vec(any::<u32>(), 1..8),
        capacity in 1usize..1_000_000,
    ) {
        prop_assert!(bucket_index(&hashes, &coeffs, capacity) < capacity);
    }

    #[test]
    fn folded_hashes_agree_with_twos_complement(h in any::<i64>()) {
        prop_assert_eq!(fold_u32(h), h as u32);
    }

    #[test]
    fn bit_addressing_folds_any_index(index in any::<i64>(), num_bits in 1usize..4096) {
        let t = BitTable::new(num_bits).unwrap();
        t.set(index);
        prop_assert!(t.get(index));
        prop_assert!(t.get(index.rem_euclid(num_bits as i64)));
        prop_assert_eq!(t.count_ones(), 1);
    }

    #[test]
    fn decoders_never_panic(key in prop::collection::vec(any::<u8>(), 0..64)) {
        let v = decode_fields(&key);
        prop_assert!(v.len() <= key.len());
        prop_assert_eq!(decode_bits(&key).len(), key.len());
    }

    #[test]
    fn signatures_are_deterministic(v in arb_vector(6), seed in any::<u64>()) {
        let h = HyperplaneHash::generate(32, 6, &mut StdRng::seed_from_u64(seed)).unwrap();
        let key = FieldStreamCodec::encode(&v);
        prop_assert_eq!(h.signature(&key), h.signature(&key));
        prop_assert_eq!(h.signature(&key), h.signature_of(&v));
    }

    #[test]
    fn added_vectors_are_present(v in arb_vector(6), seed in any::<u64>()) {
        let f = SimilarityFilter::with_rng(
            FilterConfig::with_dimension(6).capacity(512),
            &mut StdRng::seed_from_u64(seed),
        ).unwrap();
        let key = FieldStreamCodec::encode(&v);
        f.add(&key);
        prop_assert!(f.is_present(&key));
    }

    #[test]
    fn bucket_choice_is_a_pure_function_of_the_key(v in arb_vector(4), seed in any::<u64>()) {
        let config = FilterConfig::with_dimension(4);
        let f = SimilarityFilter::with_rng(config.clone(), &mut StdRng::seed_from_u64(seed)).unwrap();
        for table in f.tables() {
            let a = table.params().hashes(&v, config.scale, config.bucket_width);
            let b = table.params().hashes(&v, config.scale, config.bucket_width);
            prop_assert_eq!(
                bucket_index(&a, f.coeffs().as_slice(), config.capacity),
                bucket_index(&b, f.coeffs().as_slice(), config.capacity)
            );
        }
    }
}
