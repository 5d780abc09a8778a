//! Property-based tests for the KNN index.
//!
//! These hold for any input:
//! - Results never exceed `k` and are sorted by distance
//! - A document queried with its own vector is found at distance 0
//! - Deleted documents never come back from queries or lookups
//! - Bucket memberships track the document store exactly

use std::sync::Arc;

use knn_lsh::*;
use proptest::prelude::*;

const DIM: usize = 8;

prop_compose! {
    fn arb_vector(dim: usize)(vec in prop::collection::vec(-10.0f64..10.0, dim)) -> Vec<f64> {
        vec
    }
}

fn build(seed: u64, tables: usize, hyperplanes: usize, slot: f64) -> KnnIndex {
    KnnIndex::builder()
        .vector_dimension(DIM)
        .num_hash_tables(tables)
        .num_hyperplanes(hyperplanes)
        .slot_size(slot)
        .seed(seed)
        .build()
        .unwrap()
}

fn doc(id: String, vector: Vec<f64>) -> Arc<dyn Document> {
    Arc::new(VectorDocument::new(id, vector))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn results_bounded_and_sorted(
        seed in any::<u64>(),
        tables in 1usize..6,
        hyperplanes in 1usize..6,
        slot in 1.0f64..50.0,
        vectors in prop::collection::vec(arb_vector(DIM), 1..40),
        query in arb_vector(DIM),
        k in 1usize..20,
    ) {
        let index = build(seed, tables, hyperplanes, slot);
        for (i, v) in vectors.iter().enumerate() {
            index.add(doc(format!("doc_{i}"), v.clone())).unwrap();
        }

        let results = index.query(&query, k).unwrap();
        prop_assert!(results.len() <= k);
        for pair in results.windows(2) {
            prop_assert!(pair[0].distance <= pair[1].distance);
        }

        // Fewer than k only when the candidate pool is exhausted.
        let everything = index.query(&query, vectors.len() + 1).unwrap();
        prop_assert_eq!(results.len(), k.min(everything.len()));
    }

    #[test]
    fn self_query_finds_document(
        seed in any::<u64>(),
        vectors in prop::collection::vec(arb_vector(DIM), 1..30),
        pick in any::<prop::sample::Index>(),
    ) {
        let index = build(seed, 3, 4, 5.0);
        for (i, v) in vectors.iter().enumerate() {
            index.add(doc(format!("doc_{i}"), v.clone())).unwrap();
        }

        let i = pick.index(vectors.len());
        let results = index.query(&vectors[i], vectors.len()).unwrap();
        let own = results.iter().find(|r| r.id() == format!("doc_{i}"));
        prop_assert!(own.is_some());
        prop_assert_eq!(own.map(|r| r.distance), Some(0.0));
        prop_assert_eq!(results[0].distance, 0.0);
    }

    #[test]
    fn deleted_documents_stay_gone(
        seed in any::<u64>(),
        vectors in prop::collection::vec(arb_vector(DIM), 2..30),
        delete_mask in prop::collection::vec(any::<bool>(), 30),
    ) {
        let index = build(seed, 4, 3, 8.0);
        for (i, v) in vectors.iter().enumerate() {
            index.add(doc(format!("doc_{i}"), v.clone())).unwrap();
        }

        let mut kept = 0;
        for i in 0..vectors.len() {
            if delete_mask[i] {
                let id = format!("doc_{i}");
                let removed = index.delete(&id).unwrap();
                prop_assert!(removed);
            } else {
                kept += 1;
            }
        }
        prop_assert_eq!(index.len(), kept);

        for (i, v) in vectors.iter().enumerate() {
            let id = format!("doc_{i}");
            let results = index.query(v, vectors.len()).unwrap();
            let present = results.iter().any(|r| r.id() == id);
            prop_assert_eq!(present, !delete_mask[i]);
            prop_assert_eq!(index.get(&id).unwrap().is_some(), !delete_mask[i]);
        }

        let stats = index.stats();
        prop_assert_eq!(stats.total_entries, kept * stats.num_tables);
    }

    #[test]
    fn rejected_adds_do_not_mutate(
        seed in any::<u64>(),
        vectors in prop::collection::vec(arb_vector(DIM), 1..10),
        bad_len in (0usize..16).prop_filter("must differ from DIM", |n| *n != DIM),
    ) {
        let index = build(seed, 2, 2, 5.0);
        for (i, v) in vectors.iter().enumerate() {
            index.add(doc(format!("doc_{i}"), v.clone())).unwrap();
        }
        let before = index.stats();

        prop_assert!(index.add(doc("bad".into(), vec![1.0; bad_len])).is_err());
        prop_assert!(index.add(doc(String::new(), vec![1.0; DIM])).is_err());

        let after = index.stats();
        prop_assert_eq!(before.num_documents, after.num_documents);
        prop_assert_eq!(before.total_entries, after.total_entries);
        prop_assert!(!index.contains("bad"));
    }
}
