//! End-to-end batch behaviour against an in-memory store.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Duration;
use tdwatch_core::{IdeologyDimension, RatingDimension, TopicCategory};
use tdwatch_scoring::ideology::EvidenceRecord;
use tdwatch_scoring::judgment::Stance;
use tdwatch_scoring::pipeline::{
    REASON_ALL_ANALYSES_FAILED, REASON_IMPORTANCE_FAILED, REASON_NO_MENTIONS,
};
use tdwatch_scoring::store::{AnalysisOutcome, RunOutcome};
use tdwatch_scoring::{ProcessingOptions, ProcessingStatus, ScoringError};

use support::{
    article, at, judgment, pipeline, settings, with_stance, FixedScorer, MemoryStore,
    ScriptedAnalyzer, HOUSING_BODY,
};

const ROSTER: &[(&str, &str)] = &[
    ("James Byrne", "Fine Gael"),
    ("Mary Lou McDonald", "Sinn Féin"),
];

fn options(top_percentile: f64, min_importance_score: f64) -> ProcessingOptions {
    ProcessingOptions {
        top_percentile,
        min_importance_score,
        ..ProcessingOptions::default()
    }
}

fn unrelated_articles() -> Vec<tdwatch_scoring::Article> {
    [
        ("Hospital waiting lists hit record high", "Outpatient waits rose again in Cork."),
        ("Garda numbers fall in rural districts", "Recruitment lagged behind retirements."),
        ("Farmers protest nitrates derogation loss", "Tractors blocked Merrion Street."),
        ("School transport scheme faces driver shortage", "Bus operators warned of cancellations."),
        ("Broadband rollout passes halfway mark", "Fibre reached another county."),
        ("Ferry routes added for summer season", "Rosslare bookings climbed."),
        ("Museum reopens after restoration works", "Visitors returned to Kildare Street."),
        ("Ticket prices soar for stadium concerts", "Promoters blamed demand."),
    ]
    .into_iter()
    .zip(1..)
    .map(|((title, body), id)| article(id, title, body, id))
    .collect()
}

#[tokio::test]
async fn selection_needs_both_percentile_and_floor() {
    let store = MemoryStore::new(unrelated_articles(), ROSTER);
    let scorer = FixedScorer::new(&[
        (1, 90.0),
        (2, 85.0),
        (3, 80.0),
        (4, 45.0),
        (5, 30.0),
        (6, 20.0),
        (7, 10.0),
        (8, 5.0),
    ]);
    let analyzer = ScriptedAnalyzer::always(judgment(5.0, 0.9));
    let stats = pipeline(&store, scorer, analyzer, settings())
        .process_unprocessed_articles(&options(50.0, 82.0))
        .await
        .unwrap();

    // Article 3 is inside the top half but under the floor.
    assert_eq!(stats.fetched, 8);
    assert_eq!(stats.selected, 2);
    assert_eq!(stats.skipped_low_importance, 6);
    for id in 1..=2 {
        let resolution = store.resolution(id).unwrap();
        assert_eq!(resolution.status, ProcessingStatus::Scored);
        assert_eq!(resolution.reason.as_deref(), Some(REASON_NO_MENTIONS));
        assert!(!resolution.score_applied);
    }
    let skipped = store.resolution(3).unwrap();
    assert_eq!(skipped.status, ProcessingStatus::SkippedLowImportance);
    assert!(skipped.reason.unwrap().contains("below minimum importance"));
    let outside = store.resolution(8).unwrap();
    assert!(outside.reason.unwrap().contains("outside top 50%"));
    assert_eq!(stats.terminal_articles(), 8);
}

#[tokio::test]
async fn housing_fund_coverage_collapses_to_one_event() {
    let articles = vec![
        article(1, "James Byrne unveils social housing fund", HOUSING_BODY, 60),
        article(2, "Councils to get billions for social homes", HOUSING_BODY, 62),
        article(3, "Housing fund explained", HOUSING_BODY, 65),
        article(
            4,
            "Hospital waiting lists hit record high",
            "Outpatient waits rose again in Cork.",
            66,
        ),
    ];
    let store = MemoryStore::new(articles, ROSTER);
    let scorer = FixedScorer::new(&[(1, 80.0), (2, 70.0), (3, 70.0), (4, 60.0)]);
    let analyzer = ScriptedAnalyzer::always(judgment(6.0, 0.9));

    let stats = pipeline(&store, scorer, analyzer.clone(), settings())
        .process_unprocessed_articles(&options(100.0, 0.0))
        .await
        .unwrap();

    assert_eq!(stats.clusters, 2);
    assert_eq!(stats.duplicates, 2);
    assert_eq!(stats.canonical_processed, 2);
    assert_eq!(
        *analyzer.calls.lock().unwrap(),
        vec![(1, "James Byrne".to_string())]
    );

    for id in [2, 3] {
        let duplicate = store.resolution(id).unwrap();
        assert_eq!(duplicate.status, ProcessingStatus::Duplicate);
        assert_eq!(duplicate.duplicate_of, Some(1));
        assert_eq!(
            duplicate.reason.as_deref(),
            Some("duplicate of article 1 (James Byrne unveils social housing fund)")
        );
    }
    let canonical = store.resolution(1).unwrap();
    assert!(canonical.score_applied);
    assert_eq!(
        canonical.summary.as_deref(),
        Some("Announced a social housing fund.")
    );

    let byrne = store.politician("James Byrne");
    assert_eq!(byrne.rating.total_stories, 1);
    assert_eq!(byrne.rating.positive_stories, 1);
    assert!(byrne.rating.overall > 1500.0);
    assert_eq!(store.politician("Mary Lou McDonald").rating.total_stories, 0);
    assert!(stats.aggregates_recomputed);
}

#[tokio::test]
async fn second_run_changes_nothing() {
    let articles = vec![article(
        1,
        "James Byrne unveils social housing fund",
        HOUSING_BODY,
        60,
    )];
    let store = MemoryStore::new(articles, ROSTER);
    let analyzer = ScriptedAnalyzer::always(judgment(4.0, 0.8));
    let pipeline = pipeline(
        &store,
        FixedScorer::new(&[(1, 75.0)]),
        analyzer.clone(),
        settings(),
    );

    let first = pipeline
        .process_unprocessed_articles(&options(100.0, 0.0))
        .await
        .unwrap();
    let rating_after_first = store.politician("James Byrne").rating;
    let history_after_first = store.history_len();

    let second = pipeline
        .process_unprocessed_articles(&options(100.0, 0.0))
        .await
        .unwrap();

    assert_eq!(first.canonical_processed, 1);
    assert_eq!(second.fetched, 0);
    assert_eq!(second.terminal_articles(), 0);
    assert_eq!(analyzer.call_count(), 1);
    assert_eq!(store.politician("James Byrne").rating, rating_after_first);
    assert_eq!(store.history_len(), history_after_first);
}

#[tokio::test]
async fn identical_inputs_give_identical_outcomes() {
    let articles = vec![
        article(1, "James Byrne unveils social housing fund", HOUSING_BODY, 60),
        article(2, "Councils to get billions for social homes", HOUSING_BODY, 62),
        article(
            3,
            "Mary Lou McDonald criticised the budget",
            "Mary Lou McDonald said the budget failed renters.",
            64,
        ),
    ];
    let scores = [(1, 80.0), (2, 70.0), (3, 65.0)];

    let mut runs = Vec::new();
    for _ in 0..2 {
        let store = MemoryStore::new(articles.clone(), ROSTER);
        let stats = pipeline(
            &store,
            FixedScorer::new(&scores),
            ScriptedAnalyzer::always(judgment(-3.0, 0.7)),
            settings(),
        )
        .process_unprocessed_articles(&options(100.0, 0.0))
        .await
        .unwrap();
        let resolutions: Vec<_> = (1..=3).map(|id| store.resolution(id)).collect();
        let ratings = (
            store.politician("James Byrne").rating,
            store.politician("Mary Lou McDonald").rating,
        );
        runs.push((stats, resolutions, ratings));
    }

    let (a, b) = (&runs[0], &runs[1]);
    assert_eq!(a.0, b.0);
    assert_eq!(a.1, b.1);
    for dimension in RatingDimension::ALL {
        assert!((a.2 .0.get(dimension) - b.2 .0.get(dimension)).abs() < 1e-6);
        assert!((a.2 .1.get(dimension) - b.2 .1.get(dimension)).abs() < 1e-6);
    }
}

#[tokio::test]
async fn one_article_moves_a_rating_at_most_the_cap() {
    let store = MemoryStore::new(
        vec![article(1, "James Byrne unveils social housing fund", HOUSING_BODY, 71)],
        ROSTER,
    );
    store.with_politician("James Byrne", |p| {
        for dimension in RatingDimension::ALL {
            p.rating.set(dimension, 800.0);
        }
    });
    let mut strong = judgment(10.0, 1.0);
    strong.flags.constituency_focus = true;

    let stats = pipeline(
        &store,
        FixedScorer::new(&[(1, 90.0)]),
        ScriptedAnalyzer::always(strong),
        settings(),
    )
    .process_unprocessed_articles(&options(100.0, 0.0))
    .await
    .unwrap();

    let inner = store.inner.lock().unwrap();
    assert_eq!(stats.rating_changes, inner.history.len());
    assert!(!inner.history.is_empty());
    for (_, change) in &inner.history {
        assert!(change.delta.abs() <= 40.0 + 1e-9, "{change:?}");
    }
    let overall = inner
        .history
        .iter()
        .find(|(_, c)| c.dimension == RatingDimension::Overall)
        .unwrap();
    assert!((overall.1.delta - 40.0).abs() < 1e-9);
}

#[tokio::test]
async fn low_confidence_mentions_leave_no_trace() {
    let store = MemoryStore::new(
        vec![article(
            1,
            "Councils welcome housing package",
            "Deputy Byrne said the package was long overdue.",
            60,
        )],
        ROSTER,
    );
    let analyzer = ScriptedAnalyzer::always(with_stance(judgment(5.0, 0.9), Stance::Support, 1.0));
    let strict = tdwatch_scoring::PipelineSettings {
        mention_min_confidence: 0.8,
        ..settings()
    };

    let stats = pipeline(&store, FixedScorer::new(&[(1, 90.0)]), analyzer.clone(), strict)
        .process_unprocessed_articles(&options(100.0, 0.0))
        .await
        .unwrap();

    assert_eq!(stats.mentions_found, 1);
    assert_eq!(stats.mentions_suppressed, 1);
    assert_eq!(stats.mentions_analyzed, 0);
    assert_eq!(analyzer.call_count(), 0);
    assert_eq!(store.history_len(), 0);
    let byrne = store.politician("James Byrne");
    assert_eq!(byrne.rating.total_stories, 0);
    assert!(byrne.ideology.value(IdeologyDimension::Welfare).is_none());

    let resolution = store.resolution(1).unwrap();
    assert_eq!(resolution.status, ProcessingStatus::Scored);
    assert_eq!(resolution.reason.as_deref(), Some(REASON_NO_MENTIONS));
    assert!(!stats.aggregates_recomputed);
}

async fn oppose_after(prior: Option<EvidenceRecord>) -> tdwatch_scoring::IdeologyUpdate {
    let store = MemoryStore::new(
        vec![article(1, "James Byrne drops social housing fund", HOUSING_BODY, 60)],
        ROSTER,
    );
    if let Some(record) = prior {
        store.with_politician("James Byrne", |p| p.evidence.push(record));
    }
    let analyzer = ScriptedAnalyzer::always(with_stance(judgment(-2.0, 0.9), Stance::Oppose, -1.0));
    pipeline(&store, FixedScorer::new(&[(1, 90.0)]), analyzer, settings())
        .process_unprocessed_articles(&options(100.0, 0.0))
        .await
        .unwrap();
    let inner = store.inner.lock().unwrap();
    inner.ideology_updates[0].1.clone()
}

#[tokio::test]
async fn contradicting_a_recent_stance_is_down_weighted() {
    let earlier_support = EvidenceRecord {
        policy_topic: Some("Social Housing Fund".to_string()),
        topic_category: Some(TopicCategory::Housing),
        stance: Some(Stance::Support),
        deltas: [(IdeologyDimension::Welfare, 1.0)].into_iter().collect(),
        source_date: at(0) - Duration::days(10),
    };

    let contradicted = oppose_after(Some(earlier_support)).await;
    let fresh = oppose_after(None).await;

    assert!((contradicted.consistency_penalty - 0.4).abs() < 1e-12);
    assert!((fresh.consistency_penalty - 1.0).abs() < 1e-12);
    assert!((contradicted.effective_weight - 0.4 * fresh.effective_weight).abs() < 1e-9);

    let shift = |u: &tdwatch_scoring::IdeologyUpdate| {
        u.updated.get(IdeologyDimension::Welfare).value
    };
    assert!(shift(&contradicted) < 0.0);
    assert!(shift(&contradicted) > shift(&fresh));
}

#[tokio::test]
async fn failed_analyses_mark_article_failed_without_rating_changes() {
    let store = MemoryStore::new(
        vec![article(1, "James Byrne unveils social housing fund", HOUSING_BODY, 60)],
        ROSTER,
    );
    let analyzer = ScriptedAnalyzer::new(|_, _| {
        Err(ScoringError::MalformedJudgment("no confidence".to_string()))
    });

    let stats = pipeline(&store, FixedScorer::new(&[(1, 90.0)]), analyzer, settings())
        .process_unprocessed_articles(&options(100.0, 0.0))
        .await
        .unwrap();

    assert_eq!(stats.analyses_failed, 1);
    assert_eq!(stats.articles_failed, 1);
    assert_eq!(stats.rating_changes, 0);
    let resolution = store.resolution(1).unwrap();
    assert_eq!(resolution.status, ProcessingStatus::Failed);
    assert_eq!(resolution.reason.as_deref(), Some(REASON_ALL_ANALYSES_FAILED));
    assert!(resolution.error_message.unwrap().contains("no confidence"));
    assert!(store.is_processed(1));
    assert_eq!(store.politician("James Byrne").rating.total_stories, 0);
    assert_eq!(store.inner.lock().unwrap().analyses.len(), 1);
}

#[tokio::test]
async fn one_failed_politician_does_not_block_the_other() {
    let store = MemoryStore::new(
        vec![article(
            1,
            "James Byrne and Mary Lou McDonald clash over housing",
            "James Byrne said the plan works. Mary Lou McDonald said it does not.",
            60,
        )],
        ROSTER,
    );
    let analyzer = ScriptedAnalyzer::new(|_, mention| {
        if mention.name == "Mary Lou McDonald" {
            Err(ScoringError::Timeout { secs: 1 })
        } else {
            Ok(judgment(3.0, 0.8))
        }
    });

    let stats = pipeline(&store, FixedScorer::new(&[(1, 90.0)]), analyzer, settings())
        .process_unprocessed_articles(&options(100.0, 0.0))
        .await
        .unwrap();

    assert_eq!(stats.mentions_analyzed, 2);
    assert_eq!(stats.analyses_failed, 1);
    assert_eq!(stats.articles_failed, 0);
    let resolution = store.resolution(1).unwrap();
    assert_eq!(resolution.status, ProcessingStatus::Scored);
    assert!(resolution.score_applied);
    assert_eq!(store.politician("James Byrne").rating.total_stories, 1);
    assert_eq!(store.politician("Mary Lou McDonald").rating.total_stories, 0);
}

#[tokio::test]
async fn importance_failure_is_terminal_for_that_article_only() {
    let store = MemoryStore::new(unrelated_articles().into_iter().take(2).collect(), ROSTER);
    let mut scorer = FixedScorer::default();
    scorer.failing.insert(2);
    scorer.scores.insert(1, 90.0);

    let stats = pipeline(
        &store,
        std::sync::Arc::new(scorer),
        ScriptedAnalyzer::always(judgment(1.0, 0.5)),
        settings(),
    )
    .process_unprocessed_articles(&options(100.0, 0.0))
    .await
    .unwrap();

    assert_eq!(stats.importance_failed, 1);
    assert_eq!(stats.importance_scored, 1);
    let failed = store.resolution(2).unwrap();
    assert_eq!(failed.status, ProcessingStatus::Failed);
    assert_eq!(failed.reason.as_deref(), Some(REASON_IMPORTANCE_FAILED));
    assert_eq!(store.resolution(1).unwrap().status, ProcessingStatus::Scored);
}

#[tokio::test]
async fn commit_failure_leaves_article_for_the_next_run() {
    let articles = vec![
        article(1, "James Byrne unveils social housing fund", HOUSING_BODY, 60),
        article(
            2,
            "Mary Lou McDonald criticised the budget",
            "Mary Lou McDonald said the budget failed renters.",
            64,
        ),
    ];
    let store = MemoryStore::new(articles, ROSTER);
    store.inner.lock().unwrap().fail_commit_for.insert(1);

    let stats = pipeline(
        &store,
        FixedScorer::new(&[(1, 80.0), (2, 70.0)]),
        ScriptedAnalyzer::always(judgment(2.0, 0.9)),
        settings(),
    )
    .process_unprocessed_articles(&options(100.0, 0.0))
    .await
    .unwrap();

    assert_eq!(stats.commit_failures, 1);
    assert_eq!(stats.canonical_processed, 1);
    assert!(!store.is_processed(1));
    assert!(store.is_processed(2));
    assert_eq!(store.politician("James Byrne").rating.total_stories, 0);
    assert_eq!(store.politician("Mary Lou McDonald").rating.total_stories, 1);
}

#[tokio::test]
async fn dry_run_writes_nothing() {
    let store = MemoryStore::new(
        vec![article(1, "James Byrne unveils social housing fund", HOUSING_BODY, 60)],
        ROSTER,
    );
    let analyzer = ScriptedAnalyzer::always(judgment(5.0, 0.9));
    let dry = ProcessingOptions {
        dry_run: true,
        ..options(100.0, 0.0)
    };

    let stats = pipeline(&store, FixedScorer::new(&[(1, 90.0)]), analyzer.clone(), settings())
        .process_unprocessed_articles(&dry)
        .await
        .unwrap();

    assert_eq!(stats.selected, 1);
    assert_eq!(stats.mentions_found, 1);
    assert_eq!(analyzer.call_count(), 0);
    assert!(!store.is_processed(1));
    assert!(store.resolution(1).is_none());
    assert!(store.inner.lock().unwrap().runs.is_empty());
}

#[tokio::test]
async fn batch_run_is_recorded_with_its_stats() {
    let store = MemoryStore::new(unrelated_articles(), ROSTER);
    let stats = pipeline(
        &store,
        FixedScorer::new(&[]),
        ScriptedAnalyzer::always(judgment(0.0, 0.5)),
        settings(),
    )
    .process_unprocessed_articles(&options(25.0, 40.0))
    .await
    .unwrap();

    let runs = store.inner.lock().unwrap().runs.clone();
    assert_eq!(runs, vec![Some(RunOutcome::Succeeded { stats })]);
}

#[tokio::test]
async fn single_article_respects_processed_flag_unless_forced() {
    let store = MemoryStore::new(
        vec![article(1, "James Byrne unveils social housing fund", HOUSING_BODY, 60)],
        ROSTER,
    );
    let analyzer = ScriptedAnalyzer::always(judgment(5.0, 0.9));
    let pipeline = pipeline(&store, FixedScorer::new(&[(1, 90.0)]), analyzer.clone(), settings());

    let missing = pipeline.process_article_by_id(99, false).await.unwrap_err();
    assert!(matches!(missing, ScoringError::ArticleNotFound(99)));

    let first = pipeline.process_article_by_id(1, false).await.unwrap();
    assert_eq!(first.canonical_processed, 1);
    let overall = store.politician("James Byrne").rating.overall;
    let history = store.history_len();

    let again = pipeline.process_article_by_id(1, false).await.unwrap();
    assert_eq!(again.already_processed, 1);
    assert_eq!(analyzer.call_count(), 1);

    let forced = pipeline.process_article_by_id(1, true).await.unwrap_err();
    assert!(matches!(forced, ScoringError::AlreadyApplied(1)));
    assert_eq!(analyzer.call_count(), 1);

    let byrne = store.politician("James Byrne");
    assert_eq!(byrne.rating.total_stories, 1);
    assert!((byrne.rating.overall - overall).abs() < f64::EPSILON);
    assert_eq!(store.history_len(), history);
    assert!(store.is_processed(1));
}

#[tokio::test]
async fn forced_reprocess_retries_a_failed_article_once() {
    let store = MemoryStore::new(
        vec![article(1, "James Byrne unveils social housing fund", HOUSING_BODY, 60)],
        ROSTER,
    );
    let attempts = AtomicUsize::new(0);
    let analyzer = ScriptedAnalyzer::new(move |_, _| {
        if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(ScoringError::MalformedJudgment("scripted".to_string()))
        } else {
            Ok(judgment(5.0, 0.9))
        }
    });
    let pipeline = pipeline(&store, FixedScorer::new(&[(1, 90.0)]), analyzer.clone(), settings());

    pipeline.process_article_by_id(1, false).await.unwrap();
    assert_eq!(store.resolution(1).unwrap().status, ProcessingStatus::Failed);
    assert_eq!(store.politician("James Byrne").rating.total_stories, 0);

    let forced = pipeline.process_article_by_id(1, true).await.unwrap();
    assert_eq!(forced.canonical_processed, 1);
    assert_eq!(analyzer.call_count(), 2);
    let resolution = store.resolution(1).unwrap();
    assert_eq!(resolution.status, ProcessingStatus::Scored);
    assert!(resolution.score_applied);
    assert_eq!(store.politician("James Byrne").rating.total_stories, 1);
}

fn rent_cap_articles() -> Vec<tdwatch_scoring::Article> {
    vec![
        article(
            1,
            "Byrne backs rent caps for Dublin tenants",
            "James Byrne said he backs rent caps for tenants in Dublin, telling colleagues the \
             measure would protect renters through the winter.",
            60,
        ),
        article(
            2,
            "Minister reverses position on controls",
            "James Byrne announced he would vote against the proposal, arguing in the Dáil that \
             controls would choke off supply across the country.",
            64,
        ),
    ]
}

#[tokio::test]
async fn same_politician_in_two_events_updates_sequentially() {
    let store = MemoryStore::new(rent_cap_articles(), ROSTER);
    let analyzer = ScriptedAnalyzer::always(judgment(6.0, 0.9));

    let stats = pipeline(&store, FixedScorer::new(&[(1, 80.0), (2, 80.0)]), analyzer, settings())
        .process_unprocessed_articles(&options(100.0, 0.0))
        .await
        .unwrap();

    assert_eq!(stats.clusters, 2);
    assert_eq!(stats.canonical_processed, 2);
    assert_eq!(store.politician("James Byrne").rating.total_stories, 2);

    let inner = store.inner.lock().unwrap();
    let overall: Vec<_> = inner
        .history
        .iter()
        .filter(|(_, change)| change.dimension == RatingDimension::Overall)
        .map(|(_, change)| *change)
        .collect();
    assert_eq!(overall.len(), 2);
    assert!((overall[1].old - overall[0].new).abs() < f64::EPSILON);
    assert!(overall[1].new > overall[0].new);
}

#[tokio::test]
async fn contradicting_stances_within_one_batch_are_flagged() {
    let store = MemoryStore::new(rent_cap_articles(), ROSTER);
    let analyzer = ScriptedAnalyzer::new(|article, _| {
        Ok(if article.id == 1 {
            with_stance(judgment(3.0, 0.9), Stance::Support, 1.0)
        } else {
            with_stance(judgment(-3.0, 0.9), Stance::Oppose, -1.0)
        })
    });

    pipeline(&store, FixedScorer::new(&[(1, 80.0), (2, 80.0)]), analyzer, settings())
        .process_unprocessed_articles(&options(100.0, 0.0))
        .await
        .unwrap();

    let inner = store.inner.lock().unwrap();
    let flagged: Vec<(i64, bool)> = inner
        .analyses
        .iter()
        .map(|(article_id, _, outcome)| match outcome {
            AnalysisOutcome::Applied(j) => (*article_id, j.flags.flip_flop),
            AnalysisOutcome::Failed { .. } => (*article_id, false),
        })
        .collect();
    // Newest first: article 2 commits, then article 1 contradicts it.
    assert_eq!(flagged, vec![(2, false), (1, true)]);
}
