//! Benchmarks for candidate ranking
//!
//! Run with: cargo bench --package ranking
//!
//! Ranks a typical backend response (a few dozen candidates) and a large
//! one against a warm interest record.

use chrono::Utc;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use interests::{CandidateSuggestion, ContentType, FeedbackAction, FeedbackEvent, UserInterests};
use learning::InterestUpdateEngine;
use ranking::ContentRanker;

fn warm_interests() -> UserInterests {
    let engine = InterestUpdateEngine::default();
    let mut interests = UserInterests::new();
    for i in 0..200 {
        let event = FeedbackEvent {
            user_id: "bench-user".to_string(),
            content_type: ContentType::Recipe,
            keywords: vec![format!("keyword-{}", i % 40), format!("keyword-{}", (i * 7) % 40)],
            category: Some(format!("category-{}", i % 8)),
            action: if i % 5 == 0 { FeedbackAction::Downvote } else { FeedbackAction::Upvote },
            timestamp: Utc::now(),
            search_term: None,
            vendor_id: None,
        };
        interests = engine.apply(&interests, &event, Utc::now());
    }
    interests
}

fn candidates(n: usize) -> Vec<CandidateSuggestion> {
    (0..n)
        .map(|i| {
            CandidateSuggestion::new(format!("c{i}"), ContentType::Faq, (i % 100) as f64 / 100.0)
                .with_keywords([format!("keyword-{}", i % 60), format!("keyword-{}", (i + 3) % 60)])
                .with_category(format!("category-{}", i % 10))
        })
        .collect()
}

fn bench_rank(c: &mut Criterion) {
    let interests = warm_interests();
    let ranker = ContentRanker::default();

    for n in [20, 500] {
        let batch = candidates(n);
        c.bench_function(&format!("rank_{n}_candidates"), |b| {
            b.iter(|| {
                let ranked = ranker.rank(black_box(batch.clone()), black_box(&interests));
                black_box(ranked)
            })
        });
    }
}

criterion_group!(benches, bench_rank);
criterion_main!(benches);
