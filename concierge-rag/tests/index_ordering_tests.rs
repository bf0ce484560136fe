//! Property tests for in-memory index search ordering.

use std::collections::HashMap;

use concierge_rag::document::IndexEntry;
use concierge_rag::index::VectorIndex;
use concierge_rag::inmemory::InMemoryVectorIndex;
use proptest::prelude::*;

const DIM: usize = 16;

/// Generate a non-zero L2-normalized vector of the given dimension.
fn arb_normalized_vector(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero vector",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

fn arb_entry(dim: usize) -> impl Strategy<Value = IndexEntry> {
    ("[a-z]{3,8}", arb_normalized_vector(dim)).prop_map(|(id, vector)| IndexEntry {
        id,
        vector,
        metadata: HashMap::new(),
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// For any stored entries and query vector, results come back in
    /// descending score order, bounded by `top_k` and the number of
    /// distinct ids, with every score inside [0, 1].
    #[test]
    fn search_is_ordered_bounded_and_scored_in_unit_range(
        entries in proptest::collection::vec(arb_entry(DIM), 1..20),
        query in arb_normalized_vector(DIM),
        top_k in 1usize..25,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (matches, unique_count) = rt.block_on(async {
            let index = InMemoryVectorIndex::new();

            // Later entries with the same id overwrite earlier ones.
            let mut distinct: HashMap<String, IndexEntry> = HashMap::new();
            for entry in &entries {
                distinct.insert(entry.id.clone(), entry.clone());
            }
            let unique_count = distinct.len();

            index.upsert(&entries).await.unwrap();
            let matches = index.query(&query, top_k).await.unwrap();
            (matches, unique_count)
        });

        prop_assert!(matches.len() <= top_k);
        prop_assert!(matches.len() <= unique_count);
        for pair in matches.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
        for m in &matches {
            prop_assert!((0.0..=1.0 + 1e-6).contains(&m.score));
        }
    }
}
