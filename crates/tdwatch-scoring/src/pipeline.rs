//! Batch orchestration.
//!
//! 1. Fetch unprocessed articles and score importance (bounded concurrency).
//! 2. Select by batch percentile AND absolute floor; commit the rest as skipped.
//! 3. Cluster survivors into events; commit non-canonical members as duplicates.
//! 4. Extract substantial mentions from each canonical article.
//! 5. Analyze every (article, politician) pair (bounded concurrency).
//! 6. Apply judgments article by article, reloading politician state each time,
//!    and commit each article in its own transaction.
//! 7. Recompute ranks and party aggregates if any rating moved.
//!
//! A failure on one article or mention never aborts the batch. Only failing to
//! fetch the batch or load the roster does.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tdwatch_core::{AppConfig, SourceReliabilityConfig};

use crate::analyzer::ImpactAnalyzer;
use crate::dedup::{cluster, DedupCandidate};
use crate::error::ScoringError;
use crate::ideology::{apply_adjustments, AdjustmentMetadata, EvidenceRecord, IdeologyParams};
use crate::importance::{select_by_importance, ImportanceScorer};
use crate::judgment::{apply_flip_flop_check, AnalysisContext, ImpactJudgment, PriorStance};
use crate::mentions::{
    apply_primary_boost, partition_mentions, MentionExtractor, RosterExtractor,
};
use crate::pg_store::ARTICLE_SOURCE_TYPE;
use crate::rating::{update_rating, RatingParams};
use crate::store::{
    AnalysisOutcome, AnalysisRecord, ArticleCommit, ArticleResolution, PipelineStore,
    PoliticianState, PoliticianUpdate, RunOutcome,
};
use crate::types::{
    Article, ImportanceAssessment, PoliticianMention, ProcessingOptions, ProcessingStats,
    ProcessingStatus,
};

pub const REASON_NO_MENTIONS: &str = "no substantial politician mentions";
pub const REASON_ALL_ANALYSES_FAILED: &str = "all politician analyses failed";
pub const REASON_IMPORTANCE_FAILED: &str = "importance scoring failed";

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_concurrent_calls: usize,
    /// Outer limit on one judgment call, retries included.
    pub call_timeout: Duration,
    pub mention_min_confidence: f64,
    pub rating: RatingParams,
    pub ideology: IdeologyParams,
    pub sources: SourceReliabilityConfig,
    /// Selection thresholds used for single-article runs.
    pub defaults: ProcessingOptions,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 5,
            call_timeout: Duration::from_secs(240),
            mention_min_confidence: 0.7,
            rating: RatingParams::default(),
            ideology: IdeologyParams::default(),
            sources: SourceReliabilityConfig::default_seed(),
            defaults: ProcessingOptions::default(),
        }
    }
}

impl PipelineSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig, sources: SourceReliabilityConfig) -> Self {
        let attempts = u64::from(config.judge_max_retries) + 2;
        Self {
            max_concurrent_calls: config.pipeline_max_concurrent_calls.max(1),
            call_timeout: Duration::from_secs(config.judge_timeout_secs.saturating_mul(attempts)),
            mention_min_confidence: config.pipeline_mention_min_confidence,
            rating: RatingParams::default(),
            ideology: IdeologyParams::default(),
            sources,
            defaults: ProcessingOptions {
                batch_size: config.pipeline_batch_size,
                top_percentile: config.pipeline_top_percentile,
                min_importance_score: config.pipeline_min_importance,
                dry_run: false,
                trigger_source: "cli".to_string(),
            },
        }
    }
}

pub struct Pipeline {
    store: Arc<dyn PipelineStore>,
    scorer: Arc<dyn ImportanceScorer>,
    analyzer: Arc<dyn ImpactAnalyzer>,
    settings: PipelineSettings,
}

/// One canonical article waiting for analysis.
struct CanonicalWork {
    article: Article,
    importance: ImportanceAssessment,
    event_name: String,
    mentions: Vec<PoliticianMention>,
}

/// Stances committed earlier in the current batch, by politician name.
type BatchStances = HashMap<String, Vec<PriorStance>>;

fn prior_stances(evidence: &[EvidenceRecord]) -> Vec<PriorStance> {
    evidence
        .iter()
        .filter_map(|e| {
            Some(PriorStance {
                topic: e.policy_topic.clone()?,
                stance: e.stance?,
                source_date: e.source_date,
            })
        })
        .collect()
}

impl Pipeline {
    #[must_use]
    pub fn new(
        store: Arc<dyn PipelineStore>,
        scorer: Arc<dyn ImportanceScorer>,
        analyzer: Arc<dyn ImpactAnalyzer>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            scorer,
            analyzer,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Process up to `options.batch_size` unprocessed articles.
    ///
    /// # Errors
    ///
    /// Returns an error only when the batch or roster cannot be loaded. Per
    /// article and per mention failures are recorded and counted instead.
    pub async fn process_unprocessed_articles(
        &self,
        options: &ProcessingOptions,
    ) -> Result<ProcessingStats, ScoringError> {
        let run_id = self.start_run("batch", options).await;

        let result = async {
            let articles = self.store.fetch_unprocessed(options.batch_size).await?;
            self.run_batch(articles, options).await
        }
        .await;

        self.finish_run(run_id, &result).await;
        result
    }

    /// Process one article. Already-processed articles are left alone unless
    /// `force` is set, which resets the article first. Articles whose ratings
    /// were already applied are never reprocessed.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::ArticleNotFound`] for an unknown id,
    /// [`ScoringError::AlreadyApplied`] when `force` targets an article whose
    /// judgments were applied, or a persistence error if the article cannot be
    /// loaded or reset.
    pub async fn process_article_by_id(
        &self,
        article_id: i64,
        force: bool,
    ) -> Result<ProcessingStats, ScoringError> {
        let mut article = self
            .store
            .fetch_article(article_id)
            .await?
            .ok_or(ScoringError::ArticleNotFound(article_id))?;

        if article.processed && !force {
            tracing::info!(article_id, "article already processed; use force to reprocess");
            return Ok(ProcessingStats {
                already_processed: 1,
                ..ProcessingStats::default()
            });
        }
        if article.processed && article.score_applied {
            tracing::warn!(article_id, "refusing to reprocess an article with applied ratings");
            return Err(ScoringError::AlreadyApplied(article_id));
        }
        if article.processed {
            tracing::info!(article_id, "resetting article for manual reprocess");
            self.store.reset_article(article_id).await?;
            article.processed = false;
        }

        let options = ProcessingOptions {
            batch_size: 1,
            top_percentile: 100.0,
            ..self.settings.defaults.clone()
        };
        let run_id = self.start_run("single", &options).await;
        let result = self.run_batch(vec![article], &options).await;
        self.finish_run(run_id, &result).await;
        result
    }

    async fn start_run(&self, run_type: &str, options: &ProcessingOptions) -> Option<i64> {
        if options.dry_run {
            return None;
        }
        match self.store.start_run(run_type, &options.trigger_source).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "could not record processing run; continuing");
                None
            }
        }
    }

    async fn finish_run(
        &self,
        run_id: Option<i64>,
        result: &Result<ProcessingStats, ScoringError>,
    ) {
        let Some(run_id) = run_id else {
            return;
        };
        let outcome = match result {
            Ok(stats) => RunOutcome::Succeeded {
                stats: stats.clone(),
            },
            Err(e) => RunOutcome::Failed {
                error: e.to_string(),
            },
        };
        if let Err(e) = self.store.finish_run(run_id, &outcome).await {
            tracing::warn!(run_id, error = %e, "could not finalize processing run");
        }
    }

    async fn timed<T>(
        &self,
        call: impl Future<Output = Result<T, ScoringError>>,
    ) -> Result<T, ScoringError> {
        let limit = self.settings.call_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(ScoringError::Timeout {
                secs: limit.as_secs(),
            }),
        }
    }

    /// Commit a terminal resolution. Returns whether the article is now
    /// terminal (always true for dry runs, which write nothing).
    async fn resolve(
        &self,
        resolution: &ArticleResolution,
        options: &ProcessingOptions,
        stats: &mut ProcessingStats,
    ) -> bool {
        if options.dry_run {
            return true;
        }
        match self.store.commit_terminal(resolution).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    article_id = resolution.article_id,
                    status = %resolution.status,
                    error = %e,
                    "terminal commit failed; article stays unprocessed"
                );
                stats.commit_failures += 1;
                false
            }
        }
    }

    async fn run_batch(
        &self,
        articles: Vec<Article>,
        options: &ProcessingOptions,
    ) -> Result<ProcessingStats, ScoringError> {
        let mut stats = ProcessingStats {
            fetched: articles.len(),
            ..ProcessingStats::default()
        };
        if articles.is_empty() {
            tracing::info!("no unprocessed articles");
            return Ok(stats);
        }
        tracing::info!(
            articles = articles.len(),
            dry_run = options.dry_run,
            "processing batch"
        );

        let extractor = RosterExtractor::new(self.store.load_roster().await?);
        if extractor.is_empty() {
            tracing::warn!("politician roster is empty; no mentions can be found");
        }

        let scored = self.score_importance(&articles).await;

        let mut assessments: HashMap<i64, ImportanceAssessment> = HashMap::new();
        for (article, result) in articles.iter().zip(scored) {
            match result {
                Ok(assessment) => {
                    stats.importance_scored += 1;
                    assessments.insert(article.id, assessment);
                }
                Err(e) => {
                    tracing::warn!(
                        article_id = article.id,
                        error = %e,
                        "importance scoring failed"
                    );
                    let mut resolution =
                        ArticleResolution::new(article.id, ProcessingStatus::Failed);
                    resolution.reason = Some(REASON_IMPORTANCE_FAILED.to_string());
                    resolution.error_message = Some(e.to_string());
                    if self.resolve(&resolution, options, &mut stats).await {
                        stats.importance_failed += 1;
                    }
                }
            }
        }

        let ranked: Vec<(i64, f64)> = articles
            .iter()
            .filter_map(|a| assessments.get(&a.id).map(|i| (a.id, i.score)))
            .collect();
        let decisions = select_by_importance(
            &ranked,
            options.top_percentile,
            options.min_importance_score,
        );

        let by_id: HashMap<i64, &Article> = articles.iter().map(|a| (a.id, a)).collect();
        let mut candidates = Vec::new();
        for decision in decisions {
            let Some(assessment) = assessments.get(&decision.article_id) else {
                continue;
            };
            if decision.selected {
                stats.selected += 1;
                if let Some(article) = by_id.get(&decision.article_id) {
                    candidates.push(DedupCandidate {
                        id: article.id,
                        title: article.title.clone(),
                        content: article.content.clone(),
                        published_date: article.published_date,
                        credibility_score: article.credibility_score,
                        importance_score: assessment.score,
                    });
                }
                continue;
            }
            tracing::debug!(
                article_id = decision.article_id,
                reason = decision.reason.as_deref().unwrap_or_default(),
                "article not selected"
            );
            let mut resolution =
                ArticleResolution::new(decision.article_id, ProcessingStatus::SkippedLowImportance);
            resolution.reason = decision.reason;
            resolution.importance = Some(assessment.clone());
            if self.resolve(&resolution, options, &mut stats).await {
                stats.skipped_low_importance += 1;
            }
        }

        let outcome = cluster(&candidates);
        stats.clusters = outcome.stats.clusters;
        tracing::info!(
            selected = candidates.len(),
            events = outcome.stats.clusters,
            duplicates = outcome.stats.duplicates,
            exact = outcome.stats.exact_matches,
            "deduplicated selected articles"
        );

        let mut event_names: HashMap<i64, String> = HashMap::new();
        for event in &outcome.clusters {
            event_names.insert(event.canonical_id, event.label.clone());
            for duplicate_id in event.duplicate_ids() {
                let mut resolution =
                    ArticleResolution::new(duplicate_id, ProcessingStatus::Duplicate);
                resolution.reason = Some(format!(
                    "duplicate of article {} ({})",
                    event.canonical_id, event.label
                ));
                resolution.duplicate_of = Some(event.canonical_id);
                resolution.event_name = Some(event.label.clone());
                resolution.importance = assessments.get(&duplicate_id).cloned();
                if self.resolve(&resolution, options, &mut stats).await {
                    stats.duplicates += 1;
                }
            }
        }

        // Canonical articles are applied in fetch order.
        let mut work = Vec::new();
        for article in &articles {
            let Some(event_name) = event_names.remove(&article.id) else {
                continue;
            };
            let Some(importance) = assessments.remove(&article.id) else {
                continue;
            };
            let mentions = self.substantial_mentions(&extractor, article, &importance, &mut stats);
            work.push(CanonicalWork {
                article: article.clone(),
                importance,
                event_name,
                mentions,
            });
        }

        if options.dry_run {
            stats.canonical_processed = work.len();
            tracing::info!(?stats, "dry run complete; nothing written");
            return Ok(stats);
        }

        let judgments = self.analyze_all(&work).await;
        let mut judgments = judgments.into_iter();
        let mut batch_stances = BatchStances::new();
        for item in &work {
            let results: Vec<_> = judgments.by_ref().take(item.mentions.len()).collect();
            self.apply_article(item, results, &mut batch_stances, &mut stats)
                .await;
        }

        if stats.rating_changes > 0 {
            self.recompute_aggregates(&mut stats).await;
        }

        tracing::info!(
            fetched = stats.fetched,
            selected = stats.selected,
            skipped = stats.skipped_low_importance,
            duplicates = stats.duplicates,
            canonical = stats.canonical_processed,
            mentions = stats.mentions_analyzed,
            rating_changes = stats.rating_changes,
            commit_failures = stats.commit_failures,
            "batch complete"
        );
        Ok(stats)
    }

    async fn score_importance(
        &self,
        articles: &[Article],
    ) -> Vec<Result<ImportanceAssessment, ScoringError>> {
        let cap = self.settings.max_concurrent_calls.max(1);
        let mut indexed: Vec<(usize, Result<ImportanceAssessment, ScoringError>)> =
            stream::iter(0..articles.len())
                .map(|idx| {
                    let article = &articles[idx];
                    async move { (idx, self.timed(self.scorer.score_importance(article)).await) }
                })
                .buffer_unordered(cap)
                .collect()
                .await;
        indexed.sort_by_key(|(idx, _)| *idx);
        indexed.into_iter().map(|(_, result)| result).collect()
    }

    fn substantial_mentions(
        &self,
        extractor: &dyn MentionExtractor,
        article: &Article,
        importance: &ImportanceAssessment,
        stats: &mut ProcessingStats,
    ) -> Vec<PoliticianMention> {
        let mut mentions = extractor.extract_mentions(&article.full_text());
        apply_primary_boost(&mut mentions, &importance.primary_politicians);
        stats.mentions_found += mentions.len();

        let (kept, suppressed) =
            partition_mentions(mentions, self.settings.mention_min_confidence);
        for mention in &suppressed {
            tracing::info!(
                article_id = article.id,
                politician = %mention.name,
                confidence = mention.confidence,
                substantial = mention.substantial,
                "mention suppressed"
            );
        }
        stats.mentions_suppressed += suppressed.len();
        kept
    }

    fn evidence_since(&self) -> chrono::DateTime<Utc> {
        Utc::now() - chrono::Duration::days(self.settings.ideology.contradiction_window_days)
    }

    async fn analysis_context(
        &self,
        item: &CanonicalWork,
        mention: &PoliticianMention,
    ) -> AnalysisContext {
        let state = match self.load_state(&mention.name).await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    politician = %mention.name,
                    error = %e,
                    "could not load analysis context"
                );
                None
            }
        };
        AnalysisContext {
            party: mention.party.clone(),
            constituency: mention.constituency.clone(),
            prior_stances: state
                .map(|s| prior_stances(&s.recent_evidence))
                .unwrap_or_default(),
            topic: Some(item.importance.topic_category),
        }
    }

    /// Judgments for every (article, mention) pair, in work order.
    async fn analyze_all(
        &self,
        work: &[CanonicalWork],
    ) -> Vec<Result<ImpactJudgment, ScoringError>> {
        let cap = self.settings.max_concurrent_calls.max(1);
        let pairs = work
            .iter()
            .enumerate()
            .flat_map(|(i, item)| (0..item.mentions.len()).map(move |j| (i, j)))
            .collect::<Vec<_>>();
        stream::iter(pairs)
            .map(|(i, j)| {
                let item = &work[i];
                let mention = &item.mentions[j];
                async move {
                    let context = self.analysis_context(item, mention).await;
                    self.timed(self.analyzer.analyze(&item.article, mention, &context))
                        .await
                }
            })
            .buffered(cap)
            .collect()
            .await
    }

    async fn load_state(&self, name: &str) -> Result<Option<PoliticianState>, ScoringError> {
        self.store
            .load_politician_state(name, self.evidence_since())
            .await
    }

    async fn apply_article(
        &self,
        item: &CanonicalWork,
        results: Vec<Result<ImpactJudgment, ScoringError>>,
        batch_stances: &mut BatchStances,
        stats: &mut ProcessingStats,
    ) {
        let article = &item.article;
        let now = Utc::now();
        let (_, reliability) = self
            .settings
            .sources
            .reliability_for(&article.source, Some(&article.url));

        let mut analyses = Vec::new();
        let mut updates = Vec::new();
        let mut errors = Vec::new();
        let mut summary = None;
        let mut applied_stances = Vec::new();

        for (mention, result) in item.mentions.iter().zip(results) {
            stats.mentions_analyzed += 1;
            let mut judgment = match result {
                Ok(judgment) => judgment,
                Err(e) => {
                    tracing::warn!(
                        article_id = article.id,
                        politician = %mention.name,
                        error = %e,
                        "impact analysis failed"
                    );
                    stats.analyses_failed += 1;
                    errors.push(format!("{}: {e}", mention.name));
                    analyses.push(AnalysisRecord {
                        politician_name: mention.name.clone(),
                        outcome: AnalysisOutcome::Failed {
                            analyzer: self.analyzer.name().to_string(),
                            error: e.to_string(),
                        },
                    });
                    continue;
                }
            };

            let state = match self.load_state(&mention.name).await {
                Ok(Some(state)) => state,
                Ok(None) => {
                    let e = ScoringError::PoliticianNotFound(mention.name.clone());
                    stats.analyses_failed += 1;
                    errors.push(e.to_string());
                    analyses.push(AnalysisRecord {
                        politician_name: mention.name.clone(),
                        outcome: AnalysisOutcome::Failed {
                            analyzer: judgment.analyzer.clone(),
                            error: e.to_string(),
                        },
                    });
                    continue;
                }
                Err(e) => {
                    tracing::error!(
                        article_id = article.id,
                        politician = %mention.name,
                        error = %e,
                        "could not load politician state; article stays unprocessed"
                    );
                    stats.commit_failures += 1;
                    return;
                }
            };

            // Analysis ran before earlier articles in this batch committed, so
            // re-check stances against the state as it is now.
            let mut known_stances = prior_stances(&state.recent_evidence);
            if let Some(earlier) = batch_stances.get(&state.name) {
                known_stances.extend(earlier.iter().cloned());
            }
            apply_flip_flop_check(
                &mut judgment,
                &AnalysisContext {
                    party: state.party.clone(),
                    constituency: state.constituency.clone(),
                    prior_stances: known_stances,
                    topic: Some(item.importance.topic_category),
                },
            );
            if let Some(stance) = &judgment.policy_stance {
                applied_stances.push((
                    state.name.clone(),
                    PriorStance {
                        topic: stance.topic.clone(),
                        stance: stance.stance,
                        source_date: article.published_date,
                    },
                ));
            }

            let rating = update_rating(
                &state.rating,
                &judgment,
                article.credibility_score,
                article.age_days(now),
                &self.settings.rating,
            );
            let ideology = judgment
                .ideology_delta
                .as_ref()
                .filter(|delta| !delta.is_empty())
                .map(|delta| {
                    let metadata = AdjustmentMetadata {
                        source_type: ARTICLE_SOURCE_TYPE.to_string(),
                        source_id: article.id.to_string(),
                        source_date: article.published_date,
                        topic: judgment.topic,
                        confidence: judgment.confidence,
                        source_reliability: reliability,
                        policy_stance: judgment.policy_stance.clone(),
                        base_weight: None,
                        opposition_advocacy: judgment.flags.opposition_advocacy,
                    };
                    apply_adjustments(
                        &state.ideology,
                        delta,
                        &metadata,
                        &state.recent_evidence,
                        &self.settings.ideology,
                    )
                });

            summary.get_or_insert_with(|| judgment.summary.clone());
            updates.push(PoliticianUpdate {
                politician_id: state.id,
                politician_name: state.name.clone(),
                rating,
                ideology,
            });
            analyses.push(AnalysisRecord {
                politician_name: mention.name.clone(),
                outcome: AnalysisOutcome::Applied(judgment),
            });
        }

        let mut resolution = ArticleResolution::new(article.id, ProcessingStatus::Scored);
        resolution.importance = Some(item.importance.clone());
        resolution.event_name = Some(item.event_name.clone());
        resolution.summary = summary;
        if item.mentions.is_empty() {
            resolution.reason = Some(REASON_NO_MENTIONS.to_string());
        } else if updates.is_empty() {
            resolution.status = ProcessingStatus::Failed;
            resolution.reason = Some(REASON_ALL_ANALYSES_FAILED.to_string());
            resolution.error_message = Some(errors.join("; "));
        } else {
            resolution.score_applied = true;
            if !errors.is_empty() {
                resolution.error_message = Some(errors.join("; "));
            }
        }

        let rating_changes: usize = updates.iter().map(|u| u.rating.changes.len()).sum();
        let ideology_updates = updates
            .iter()
            .filter(|u| u.ideology.as_ref().is_some_and(|i| !i.changes.is_empty()))
            .count();
        let status = resolution.status;
        let commit = ArticleCommit {
            resolution,
            analyses,
            politician_updates: updates,
        };

        match self.store.commit_article(&commit).await {
            Ok(report) => {
                for (name, stance) in applied_stances {
                    batch_stances.entry(name).or_default().push(stance);
                }
                stats.canonical_processed += 1;
                stats.rating_changes += rating_changes;
                stats.ideology_updates += ideology_updates;
                stats.secondary_write_failures += report.secondary_failures();
                if status == ProcessingStatus::Failed {
                    stats.articles_failed += 1;
                }
                tracing::info!(
                    article_id = article.id,
                    status = %status,
                    politicians = commit.politician_updates.len(),
                    rating_changes,
                    "article committed"
                );
            }
            Err(e) => {
                tracing::error!(
                    article_id = article.id,
                    error = %e,
                    "article commit failed; rolled back and left unprocessed"
                );
                stats.commit_failures += 1;
            }
        }
    }

    async fn recompute_aggregates(&self, stats: &mut ProcessingStats) {
        let ranked = match self.store.recompute_rankings().await {
            Ok(count) => {
                tracing::info!(politicians = count, "rankings recomputed");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "ranking recompute failed");
                false
            }
        };
        let aggregated = match self.store.recompute_party_aggregates().await {
            Ok(count) => {
                tracing::info!(parties = count, "party aggregates recomputed");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "party aggregate recompute failed");
                false
            }
        };
        stats.aggregates_recomputed = ranked && aggregated;
    }
}
