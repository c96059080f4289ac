//! In-memory store and scripted judgment doubles for pipeline tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tdwatch_core::{IdeologyDimension, TopicCategory};
use tdwatch_db::DbError;
use tdwatch_scoring::ideology::{EvidenceRecord, IdeologyUpdate};
use tdwatch_scoring::judgment::{
    JudgmentFlags, PolicyStance, ProcessScore, ProcessScores, Stance, StoryType,
};
use tdwatch_scoring::rating::RatingChange;
use tdwatch_scoring::store::{
    AnalysisOutcome, ArticleCommit, ArticleResolution, CommitReport, PipelineStore,
    PoliticianState, RunOutcome,
};
use tdwatch_scoring::{
    AnalysisContext, Article, ImpactAnalyzer, ImpactJudgment, ImportanceAssessment,
    ImportanceScorer, IdeologyProfile, Pipeline, PipelineSettings, PoliticianMention,
    PoliticianRating, RosterEntry, ScoringError, Sentiment,
};

pub const HOUSING_BODY: &str = "The Minister for Housing James Byrne announced a two billion \
    euro social housing fund on Monday, saying local authorities would be able to draw down \
    money for new homes from next year and that the scheme would be reviewed after eighteen \
    months.";

/// Three days ago plus `hour` hours, so recency decay stays small.
pub fn at(hour: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(3) + Duration::hours(hour)
}

pub fn article(id: i64, title: &str, content: &str, hour: i64) -> Article {
    Article {
        id,
        title: title.to_string(),
        content: content.to_string(),
        source: "RTÉ".to_string(),
        url: format!("https://www.rte.ie/news/{id}"),
        published_date: at(hour),
        credibility_score: 1.0,
        processed: false,
        score_applied: false,
    }
}

#[derive(Debug, Clone)]
pub struct StoredPolitician {
    pub id: i64,
    pub entry: RosterEntry,
    pub rating: PoliticianRating,
    pub ideology: IdeologyProfile,
    pub evidence: Vec<EvidenceRecord>,
}

#[derive(Debug, Default)]
pub struct Inner {
    pub articles: BTreeMap<i64, Article>,
    pub resolutions: HashMap<i64, ArticleResolution>,
    pub politicians: Vec<StoredPolitician>,
    pub history: Vec<(i64, RatingChange)>,
    pub analyses: Vec<(i64, String, AnalysisOutcome)>,
    pub ideology_updates: Vec<(i64, IdeologyUpdate)>,
    pub runs: Vec<Option<RunOutcome>>,
    pub rankings_recomputed: usize,
    pub fail_commit_for: HashSet<i64>,
}

/// A [`PipelineStore`] over plain collections.
#[derive(Default)]
pub struct MemoryStore {
    pub inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new(articles: Vec<Article>, roster: &[(&str, &str)]) -> Arc<Self> {
        let store = Self::default();
        {
            let mut inner = store.inner.lock().unwrap();
            for article in articles {
                inner.articles.insert(article.id, article);
            }
            for (idx, (name, party)) in roster.iter().enumerate() {
                inner.politicians.push(StoredPolitician {
                    id: i64::try_from(idx).unwrap() + 1,
                    entry: RosterEntry {
                        name: (*name).to_string(),
                        party: (*party).to_string(),
                        constituency: "Wicklow".to_string(),
                        aliases: Vec::new(),
                    },
                    rating: PoliticianRating::default(),
                    ideology: IdeologyProfile::new(),
                    evidence: Vec::new(),
                });
            }
        }
        Arc::new(store)
    }

    pub fn with_politician(&self, name: &str, edit: impl FnOnce(&mut StoredPolitician)) {
        let mut inner = self.inner.lock().unwrap();
        let politician = inner
            .politicians
            .iter_mut()
            .find(|p| p.entry.name == name)
            .expect("politician seeded");
        edit(politician);
    }

    pub fn politician(&self, name: &str) -> StoredPolitician {
        self.inner
            .lock()
            .unwrap()
            .politicians
            .iter()
            .find(|p| p.entry.name == name)
            .cloned()
            .expect("politician seeded")
    }

    pub fn resolution(&self, article_id: i64) -> Option<ArticleResolution> {
        self.inner.lock().unwrap().resolutions.get(&article_id).cloned()
    }

    pub fn is_processed(&self, article_id: i64) -> bool {
        self.inner.lock().unwrap().articles[&article_id].processed
    }

    pub fn history_len(&self) -> usize {
        self.inner.lock().unwrap().history.len()
    }

    fn mark_processed(
        inner: &mut Inner,
        resolution: &ArticleResolution,
    ) -> Result<(), ScoringError> {
        let article = inner
            .articles
            .get_mut(&resolution.article_id)
            .ok_or(ScoringError::ArticleNotFound(resolution.article_id))?;
        if article.processed {
            return Err(DbError::AlreadyProcessed(resolution.article_id).into());
        }
        article.processed = true;
        article.score_applied = resolution.score_applied;
        inner
            .resolutions
            .insert(resolution.article_id, resolution.clone());
        Ok(())
    }
}

#[async_trait]
impl PipelineStore for MemoryStore {
    async fn fetch_unprocessed(&self, limit: u32) -> Result<Vec<Article>, ScoringError> {
        let inner = self.inner.lock().unwrap();
        let mut articles: Vec<Article> = inner
            .articles
            .values()
            .filter(|a| !a.processed)
            .cloned()
            .collect();
        articles.sort_by(|a, b| {
            b.published_date
                .cmp(&a.published_date)
                .then(b.id.cmp(&a.id))
        });
        articles.truncate(limit as usize);
        Ok(articles)
    }

    async fn fetch_article(&self, article_id: i64) -> Result<Option<Article>, ScoringError> {
        Ok(self.inner.lock().unwrap().articles.get(&article_id).cloned())
    }

    async fn reset_article(&self, article_id: i64) -> Result<(), ScoringError> {
        let mut inner = self.inner.lock().unwrap();
        let article = inner
            .articles
            .get_mut(&article_id)
            .ok_or(ScoringError::ArticleNotFound(article_id))?;
        article.processed = false;
        article.score_applied = false;
        inner.resolutions.remove(&article_id);
        Ok(())
    }

    async fn load_roster(&self) -> Result<Vec<RosterEntry>, ScoringError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.politicians.iter().map(|p| p.entry.clone()).collect())
    }

    async fn load_politician_state(
        &self,
        name: &str,
        evidence_since: DateTime<Utc>,
    ) -> Result<Option<PoliticianState>, ScoringError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.politicians.iter().find(|p| p.entry.name == name).map(|p| {
            let mut recent_evidence: Vec<EvidenceRecord> = p
                .evidence
                .iter()
                .filter(|e| e.source_date >= evidence_since)
                .cloned()
                .collect();
            recent_evidence.sort_by(|a, b| b.source_date.cmp(&a.source_date));
            PoliticianState {
                id: p.id,
                name: p.entry.name.clone(),
                party: p.entry.party.clone(),
                constituency: p.entry.constituency.clone(),
                rating: p.rating,
                ideology: p.ideology.clone(),
                recent_evidence,
            }
        }))
    }

    async fn commit_terminal(&self, resolution: &ArticleResolution) -> Result<(), ScoringError> {
        let mut inner = self.inner.lock().unwrap();
        Self::mark_processed(&mut inner, resolution)
    }

    async fn commit_article(&self, commit: &ArticleCommit) -> Result<CommitReport, ScoringError> {
        let mut inner = self.inner.lock().unwrap();
        let article_id = commit.resolution.article_id;
        if inner.fail_commit_for.contains(&article_id) {
            return Err(DbError::NotFound.into());
        }
        Self::mark_processed(&mut inner, &commit.resolution)?;

        for record in &commit.analyses {
            inner.analyses.push((
                article_id,
                record.politician_name.clone(),
                record.outcome.clone(),
            ));
        }
        for update in &commit.politician_updates {
            let Some(politician) = inner
                .politicians
                .iter_mut()
                .find(|p| p.id == update.politician_id)
            else {
                continue;
            };
            politician.rating = update.rating.updated;
            if let Some(ideology) = &update.ideology {
                politician.ideology = ideology.updated.clone();
                politician.evidence.push(EvidenceRecord {
                    policy_topic: ideology.evidence.policy_topic.clone(),
                    topic_category: Some(ideology.evidence.topic_category),
                    stance: ideology.evidence.stance,
                    deltas: ideology.evidence.deltas.clone(),
                    source_date: ideology.evidence.source_date,
                });
            }
            for change in &update.rating.changes {
                inner.history.push((update.politician_id, *change));
            }
            if let Some(ideology) = &update.ideology {
                inner
                    .ideology_updates
                    .push((update.politician_id, ideology.clone()));
            }
        }
        Ok(CommitReport::default())
    }

    async fn recompute_rankings(&self) -> Result<u64, ScoringError> {
        let mut inner = self.inner.lock().unwrap();
        inner.rankings_recomputed += 1;
        Ok(inner.politicians.len() as u64)
    }

    async fn recompute_party_aggregates(&self) -> Result<u64, ScoringError> {
        let inner = self.inner.lock().unwrap();
        let parties: HashSet<&str> = inner
            .politicians
            .iter()
            .map(|p| p.entry.party.as_str())
            .collect();
        Ok(parties.len() as u64)
    }

    async fn start_run(&self, _run_type: &str, _trigger: &str) -> Result<i64, ScoringError> {
        let mut inner = self.inner.lock().unwrap();
        inner.runs.push(None);
        Ok(i64::try_from(inner.runs.len()).unwrap())
    }

    async fn finish_run(&self, run_id: i64, outcome: &RunOutcome) -> Result<(), ScoringError> {
        let mut inner = self.inner.lock().unwrap();
        let slot = usize::try_from(run_id - 1).unwrap();
        inner.runs[slot] = Some(outcome.clone());
        Ok(())
    }
}

/// Importance by article id; ids in `failing` error out.
#[derive(Default)]
pub struct FixedScorer {
    pub scores: HashMap<i64, f64>,
    pub failing: HashSet<i64>,
    pub calls: Mutex<usize>,
}

impl FixedScorer {
    pub fn new(scores: &[(i64, f64)]) -> Arc<Self> {
        Arc::new(Self {
            scores: scores.iter().copied().collect(),
            ..Self::default()
        })
    }
}

#[async_trait]
impl ImportanceScorer for FixedScorer {
    async fn score_importance(
        &self,
        article: &Article,
    ) -> Result<ImportanceAssessment, ScoringError> {
        *self.calls.lock().unwrap() += 1;
        if self.failing.contains(&article.id) {
            return Err(ScoringError::MalformedJudgment("scripted".to_string()));
        }
        let score = self.scores.get(&article.id).copied().unwrap_or(50.0);
        Ok(ImportanceAssessment::new(
            score,
            TopicCategory::Housing,
            Vec::new(),
            "scripted".to_string(),
        ))
    }
}

type Script =
    Box<dyn Fn(&Article, &PoliticianMention) -> Result<ImpactJudgment, ScoringError> + Send + Sync>;

/// An analyzer answering from a closure; records `(article_id, politician)`.
pub struct ScriptedAnalyzer {
    script: Script,
    pub calls: Mutex<Vec<(i64, String)>>,
}

impl ScriptedAnalyzer {
    pub fn new(
        script: impl Fn(&Article, &PoliticianMention) -> Result<ImpactJudgment, ScoringError>
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn always(judgment: ImpactJudgment) -> Arc<Self> {
        Self::new(move |_, _| Ok(judgment.clone()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ImpactAnalyzer for ScriptedAnalyzer {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn analyze(
        &self,
        article: &Article,
        mention: &PoliticianMention,
        _context: &AnalysisContext,
    ) -> Result<ImpactJudgment, ScoringError> {
        self.calls
            .lock()
            .unwrap()
            .push((article.id, mention.name.clone()));
        (self.script)(article, mention)
    }
}

pub fn judgment(impact: f64, confidence: f64) -> ImpactJudgment {
    ImpactJudgment {
        sentiment: if impact >= 0.0 {
            Sentiment::Positive
        } else {
            Sentiment::Negative
        },
        story_type: StoryType::PolicyAction,
        topic: TopicCategory::Housing,
        process_scores: ProcessScores {
            transparency: ProcessScore::Assessed(75.0),
            integrity: ProcessScore::Unavailable,
            effectiveness: ProcessScore::Assessed(65.0),
            consistency: ProcessScore::Unavailable,
        },
        rationale: BTreeMap::new(),
        impact_score: impact,
        confidence,
        ideology_delta: None,
        policy_stance: None,
        flags: JudgmentFlags::default(),
        summary: "Announced a social housing fund.".to_string(),
        analyzer: "scripted".to_string(),
    }
}

pub fn with_stance(mut judgment: ImpactJudgment, stance: Stance, welfare: f64) -> ImpactJudgment {
    judgment.policy_stance = Some(PolicyStance {
        stance,
        strength: 5,
        evidence: "quoted in article".to_string(),
        topic: "social housing fund".to_string(),
    });
    judgment.ideology_delta = Some([(IdeologyDimension::Welfare, welfare)].into_iter().collect());
    judgment
}

pub fn settings() -> PipelineSettings {
    PipelineSettings {
        max_concurrent_calls: 3,
        ..PipelineSettings::default()
    }
}

pub fn pipeline(
    store: &Arc<MemoryStore>,
    scorer: Arc<FixedScorer>,
    analyzer: Arc<ScriptedAnalyzer>,
    settings: PipelineSettings,
) -> Pipeline {
    Pipeline::new(store.clone(), scorer, analyzer, settings)
}
