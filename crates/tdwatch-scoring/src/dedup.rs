//! Event deduplication: same-story articles collapse into one canonical event.
//!
//! Articles are visited in canonical order (importance desc, published asc,
//! credibility desc, id asc). Each joins the first cluster whose leader it
//! matches, otherwise it leads a new cluster. Leaders are canonical, so the
//! result depends only on the set of inputs, never on their order.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Minimum combined similarity for two articles to be the same event.
pub const SIMILARITY_THRESHOLD: f64 = 0.35;
/// Maximum publication gap between two articles of the same event.
pub const EVENT_WINDOW_HOURS: i64 = 72;
pub const TITLE_WEIGHT: f64 = 0.6;
pub const LEAD_WEIGHT: f64 = 0.4;
/// Words of body text compared as the article lead.
pub const LEAD_WORDS: usize = 80;
/// Bodies shorter than this never take the exact-fingerprint shortcut.
pub const MIN_FINGERPRINT_TOKENS: usize = 25;
pub const MAX_LABEL_CHARS: usize = 120;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "he", "her",
    "his", "in", "is", "it", "its", "of", "on", "or", "over", "says", "said", "she", "that",
    "the", "their", "they", "this", "to", "was", "were", "will", "with", "after", "new",
];

/// What the deduplicator needs to know about a selected article.
#[derive(Debug, Clone)]
pub struct DedupCandidate {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub published_date: DateTime<Utc>,
    pub credibility_score: f64,
    pub importance_score: f64,
}

/// One event and the articles that report it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventCluster {
    pub canonical_id: i64,
    /// Canonical first, then duplicates in canonical order.
    pub member_ids: Vec<i64>,
    pub label: String,
}

impl EventCluster {
    pub fn duplicate_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.member_ids.iter().copied().skip(1)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupStats {
    pub input: usize,
    pub clusters: usize,
    pub duplicates: usize,
    pub exact_matches: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DedupOutcome {
    pub clusters: Vec<EventCluster>,
    /// Canonical article ids, one per cluster, in canonical order.
    pub selected_ids: Vec<i64>,
    pub stats: DedupStats,
}

impl DedupOutcome {
    /// The cluster containing `article_id`, if any.
    #[must_use]
    pub fn cluster_of(&self, article_id: i64) -> Option<&EventCluster> {
        self.clusters
            .iter()
            .find(|c| c.member_ids.contains(&article_id))
    }
}

/// Precomputed comparison features for one article.
struct Features {
    fingerprint: Option<String>,
    title_tokens: HashSet<String>,
    lead_tokens: HashSet<String>,
    published: DateTime<Utc>,
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn is_stopword(token: &str) -> bool {
    token.chars().count() < 2 || STOPWORDS.contains(&token)
}

/// SHA-256 over lowercased alphanumeric tokens joined by single spaces.
/// `None` when the body is too short to be a meaningful fingerprint.
#[must_use]
pub fn content_fingerprint(content: &str) -> Option<String> {
    let words: Vec<String> = tokens(content).collect();
    if words.len() < MIN_FINGERPRINT_TOKENS {
        return None;
    }
    let digest = Sha256::digest(words.join(" ").as_bytes());
    Some(digest.iter().map(|b| format!("{b:02x}")).collect())
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    #[allow(clippy::cast_precision_loss)]
    let score = intersection as f64 / union as f64;
    score
}

impl Features {
    fn of(candidate: &DedupCandidate) -> Self {
        Self {
            fingerprint: content_fingerprint(&candidate.content),
            title_tokens: tokens(&candidate.title)
                .filter(|t| !is_stopword(t))
                .collect(),
            lead_tokens: tokens(&candidate.content)
                .take(LEAD_WORDS)
                .filter(|t| !is_stopword(t))
                .collect(),
            published: candidate.published_date,
        }
    }

    fn similarity(&self, other: &Features) -> f64 {
        TITLE_WEIGHT * jaccard(&self.title_tokens, &other.title_tokens)
            + LEAD_WEIGHT * jaccard(&self.lead_tokens, &other.lead_tokens)
    }

    fn exact_match(&self, other: &Features) -> bool {
        matches!((&self.fingerprint, &other.fingerprint), (Some(a), Some(b)) if a == b)
    }

    fn within_window(&self, other: &Features) -> bool {
        (self.published - other.published).abs() <= Duration::hours(EVENT_WINDOW_HOURS)
    }
}

/// Combined title/lead similarity in `[0, 1]`. Identical fingerprints score 1.
#[must_use]
pub fn similarity(a: &DedupCandidate, b: &DedupCandidate) -> f64 {
    let (fa, fb) = (Features::of(a), Features::of(b));
    if fa.exact_match(&fb) {
        1.0
    } else {
        fa.similarity(&fb)
    }
}

fn canonical_order(a: &DedupCandidate, b: &DedupCandidate) -> std::cmp::Ordering {
    b.importance_score
        .total_cmp(&a.importance_score)
        .then(a.published_date.cmp(&b.published_date))
        .then(b.credibility_score.total_cmp(&a.credibility_score))
        .then(a.id.cmp(&b.id))
}

fn event_label(title: &str) -> String {
    let trimmed = title.trim();
    match trimmed.char_indices().nth(MAX_LABEL_CHARS) {
        Some((idx, _)) => trimmed[..idx].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

/// Partition `articles` into events.
#[must_use]
pub fn cluster(articles: &[DedupCandidate]) -> DedupOutcome {
    let mut ordered: Vec<&DedupCandidate> = articles.iter().collect();
    ordered.sort_by(|a, b| canonical_order(a, b));

    let mut leaders: Vec<Features> = Vec::new();
    let mut clusters: Vec<EventCluster> = Vec::new();
    let mut exact_matches = 0usize;

    for article in ordered {
        let features = Features::of(article);
        let mut joined = false;
        for (idx, leader) in leaders.iter().enumerate() {
            let exact = leader.exact_match(&features);
            let similar = leader.within_window(&features)
                && leader.similarity(&features) >= SIMILARITY_THRESHOLD;
            if exact || similar {
                if exact {
                    exact_matches += 1;
                }
                clusters[idx].member_ids.push(article.id);
                joined = true;
                break;
            }
        }
        if !joined {
            clusters.push(EventCluster {
                canonical_id: article.id,
                member_ids: vec![article.id],
                label: event_label(&article.title),
            });
            leaders.push(features);
        }
    }

    let duplicates = clusters.iter().map(|c| c.member_ids.len() - 1).sum();
    let selected_ids = clusters.iter().map(|c| c.canonical_id).collect();
    DedupOutcome {
        stats: DedupStats {
            input: articles.len(),
            clusters: clusters.len(),
            duplicates,
            exact_matches,
        },
        clusters,
        selected_ids,
    }
}
