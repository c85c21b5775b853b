//! Property and behaviour tests for the in-memory vector index.

use std::collections::HashMap;

use kucak_rag::record::{BABY_AGE_WEEKS_KEY, PREGNANCY_WEEK_KEY};
use kucak_rag::{Filter, InMemoryVectorIndex, Metadata, Namespace, Vector, VectorIndex};
use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
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

/// Generate a passage vector tagged with a pregnancy week.
fn arb_vector(dim: usize) -> impl Strategy<Value = Vector> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", 1u32..42, arb_normalized_embedding(dim)).prop_map(
        |(id, text, week, values)| {
            Vector::new(id, values, Metadata::passage("WHO", text).with(PREGNANCY_WEEK_KEY, week))
        },
    )
}

fn dedup(vectors: &[Vector]) -> Vec<Vector> {
    let mut seen: HashMap<String, Vector> = HashMap::new();
    for v in vectors {
        seen.entry(v.id.clone()).or_insert_with(|| v.clone());
    }
    seen.into_values().collect()
}

/// For any stored vectors, a query returns at most `top_k` matches ordered by
/// descending cosine similarity, and every match satisfies the filter.
mod prop_inmemory_query {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            vectors in proptest::collection::vec(arb_vector(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let unique = dedup(&vectors);
            let results = rt.block_on(async {
                let index = InMemoryVectorIndex::new();
                let ns = Namespace::mother_health();
                index.upsert(&ns, &unique).await.unwrap();
                index.query(&ns, &query, top_k, None).await.unwrap()
            });

            prop_assert!(results.len() <= top_k);
            prop_assert!(results.len() <= unique.len());
            prop_assert_eq!(results.len(), top_k.min(unique.len()));
            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }

        #[test]
        fn filtered_results_only_contain_matching_week(
            vectors in proptest::collection::vec(arb_vector(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            week in 1u32..42,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let unique = dedup(&vectors);
            let filter = Filter::eq(PREGNANCY_WEEK_KEY, week);
            let results = rt.block_on(async {
                let index = InMemoryVectorIndex::new();
                let ns = Namespace::mother_health();
                index.upsert(&ns, &unique).await.unwrap();
                index.query(&ns, &query, 50, Some(&filter)).await.unwrap()
            });

            let expected = unique.iter().filter(|v| filter.matches(&v.metadata)).count();
            prop_assert_eq!(results.len(), expected);
            prop_assert!(results.iter().all(|m| filter.matches(&m.metadata)));
        }
    }
}

#[tokio::test]
async fn namespaces_are_isolated() {
    let index = InMemoryVectorIndex::new();
    let mother = Namespace::mother_health();
    let baby = Namespace::baby_development();

    index
        .upsert(&mother, &[Vector::new("m1", vec![1.0, 0.0], Metadata::passage("WHO", "mother"))])
        .await
        .unwrap();
    index
        .upsert(
            &baby,
            &[Vector::new(
                "b1",
                vec![1.0, 0.0],
                Metadata::passage("UNICEF", "baby").with(BABY_AGE_WEEKS_KEY, 6u32),
            )],
        )
        .await
        .unwrap();

    let mother_hits = index.query(&mother, &[1.0, 0.0], 10, None).await.unwrap();
    let baby_hits = index.query(&baby, &[1.0, 0.0], 10, None).await.unwrap();

    assert_eq!(mother_hits.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), ["m1"]);
    assert_eq!(baby_hits.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), ["b1"]);
}

#[tokio::test]
async fn upsert_is_idempotent_and_delete_ignores_unknown_ids() {
    let index = InMemoryVectorIndex::new();
    let ns = Namespace::mother_health();
    let vector = Vector::new("v1", vec![0.0, 1.0], Metadata::passage("WHO", "hydrate"));

    assert_eq!(index.upsert(&ns, &[vector.clone()]).await.unwrap(), 1);
    assert_eq!(index.upsert(&ns, &[vector]).await.unwrap(), 1);
    assert_eq!(index.len(&ns).await, 1);

    index.delete(&ns, &["missing"]).await.unwrap();
    index.delete(&Namespace::new("never-created"), &["v1"]).await.unwrap();
    assert_eq!(index.len(&ns).await, 1);

    index.delete(&ns, &["v1"]).await.unwrap();
    assert!(index.query(&ns, &[0.0, 1.0], 3, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn fewer_vectors_than_top_k_is_not_an_error() {
    let index = InMemoryVectorIndex::new();
    let ns = Namespace::baby_development();
    index
        .upsert(&ns, &[Vector::new("only", vec![1.0, 1.0], Metadata::passage("AAP", "sleep"))])
        .await
        .unwrap();

    let hits = index.query(&ns, &[1.0, 0.0], 5, None).await.unwrap();
    assert_eq!(hits.len(), 1);
}
