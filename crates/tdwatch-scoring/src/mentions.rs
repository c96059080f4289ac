//! Roster-based politician mention extraction.
//!
//! Text layout: the first line is the headline, everything after is body.
//! Only full names, configured aliases, and honorific + unique surname count
//! as matches. A bare surname never does.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::{PoliticianMention, RosterEntry};

pub const CONFIDENCE_FULL_NAME_TITLE: f64 = 0.95;
pub const CONFIDENCE_FULL_NAME_BODY: f64 = 0.9;
pub const CONFIDENCE_ALIAS: f64 = 0.8;
pub const CONFIDENCE_HONORIFIC: f64 = 0.75;
/// Added when the importance scorer named the politician as a main subject.
pub const PRIMARY_SUBJECT_BOOST: f64 = 0.05;

const HONORIFICS: &str =
    r"(?:Minister|Taoiseach|Tánaiste|Tanaiste|Deputy|Senator|Mr|Mrs|Ms|Dr|Cllr|Councillor)\.?";

static ACTION_VERB: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:said|says|say|announced|announces|stated|states|claimed|argued|criticised|criticized|defended|launched|introduced|proposed|voted|called|warned|confirmed|denied|rejected|pledged|promised|told|insisted|welcomed|unveiled|backed|opposed|resigned|apologised|apologized|committed|secured|approved|signed|tabled|accused|admitted|refused)\b",
    )
    .ok()
});

const PERIPHERAL_PREFIXES: &[&str] = &[
    "by ",
    "photo",
    "picture",
    "pictured",
    "image",
    "caption",
    "credit",
    "attendees",
    "attending",
    "also present",
    "also in attendance",
    "in attendance",
    "present:",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKind {
    FullName,
    Alias,
    Honorific,
}

/// Finds politicians in article text.
pub trait MentionExtractor: Send + Sync {
    fn extract_mentions(&self, text: &str) -> Vec<PoliticianMention>;

    fn is_substantial_mention(&self, text: &str, politician_name: &str) -> bool;
}

struct CompiledEntry {
    entry: RosterEntry,
    patterns: Vec<(MatchKind, Regex)>,
}

impl CompiledEntry {
    fn matches_in<'t>(&self, haystack: &'t str) -> Vec<(MatchKind, regex::Match<'t>)> {
        self.patterns
            .iter()
            .flat_map(|(kind, re)| re.find_iter(haystack).map(move |m| (*kind, m)))
            .collect()
    }

    /// Non-overlapping match spans in `line`, merged across pattern kinds.
    fn spans(&self, line: &str) -> Vec<(usize, usize)> {
        let mut spans: Vec<(usize, usize)> = self
            .matches_in(line)
            .into_iter()
            .map(|(_, m)| (m.start(), m.end()))
            .collect();
        spans.sort_unstable();
        let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
        for (start, end) in spans {
            match merged.last_mut() {
                Some(last) if start < last.1 => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }
        merged
    }
}

fn word_pattern(literal: &str) -> Option<Regex> {
    let words: Vec<String> = literal.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return None;
    }
    Regex::new(&format!(r"(?i)\b{}\b", words.join(r"\s+"))).ok()
}

fn honorific_pattern(surname: &str) -> Option<Regex> {
    Regex::new(&format!(
        r"(?i)\b{HONORIFICS}\s+{}\b",
        regex::escape(surname)
    ))
    .ok()
}

fn surname_of(name: &str) -> Option<String> {
    name.split_whitespace().last().map(str::to_lowercase)
}

/// Matches a fixed roster with precompiled, case-insensitive patterns.
pub struct RosterExtractor {
    entries: Vec<CompiledEntry>,
}

impl RosterExtractor {
    #[must_use]
    pub fn new(roster: Vec<RosterEntry>) -> Self {
        let mut surname_counts: HashMap<String, usize> = HashMap::new();
        for entry in &roster {
            if let Some(surname) = surname_of(&entry.name) {
                *surname_counts.entry(surname).or_default() += 1;
            }
        }

        let entries = roster
            .into_iter()
            .filter_map(|entry| {
                let Some(full) = word_pattern(&entry.name) else {
                    tracing::warn!(
                        politician = %entry.name,
                        "skipping roster entry with unusable name"
                    );
                    return None;
                };
                let mut patterns = vec![(MatchKind::FullName, full)];
                for alias in &entry.aliases {
                    if let Some(re) = word_pattern(alias) {
                        patterns.push((MatchKind::Alias, re));
                    }
                }
                let unique_surname = surname_of(&entry.name)
                    .filter(|s| surname_counts.get(s).copied() == Some(1));
                if let Some(surname) = unique_surname {
                    if let Some(re) = honorific_pattern(&surname) {
                        patterns.push((MatchKind::Honorific, re));
                    }
                }
                Some(CompiledEntry { entry, patterns })
            })
            .collect();

        Self { entries }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find_entry(&self, name: &str) -> Option<&CompiledEntry> {
        self.entries
            .iter()
            .find(|c| c.entry.name.eq_ignore_ascii_case(name.trim()))
    }

    fn confidence(compiled: &CompiledEntry, title: &str, body: &str) -> Option<f64> {
        let title_kinds: Vec<MatchKind> =
            compiled.matches_in(title).into_iter().map(|(k, _)| k).collect();
        let body_kinds: Vec<MatchKind> =
            compiled.matches_in(body).into_iter().map(|(k, _)| k).collect();
        let has = |kind| title_kinds.contains(&kind) || body_kinds.contains(&kind);

        if title_kinds.contains(&MatchKind::FullName) {
            Some(CONFIDENCE_FULL_NAME_TITLE)
        } else if body_kinds.contains(&MatchKind::FullName) {
            Some(CONFIDENCE_FULL_NAME_BODY)
        } else if has(MatchKind::Alias) {
            Some(CONFIDENCE_ALIAS)
        } else if has(MatchKind::Honorific) {
            Some(CONFIDENCE_HONORIFIC)
        } else {
            None
        }
    }
}

fn split_title(text: &str) -> (&str, &str) {
    text.split_once('\n').unwrap_or((text, ""))
}

fn is_peripheral_line(line: &str) -> bool {
    let lower = line.trim_start().to_lowercase();
    PERIPHERAL_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// The sentence around `[start, end)` in `line`, bounded by `.`, `!`, or `?`.
fn sentence_around(line: &str, start: usize, end: usize) -> &str {
    let is_boundary = |c: char| matches!(c, '.' | '!' | '?');
    let from = line[..start]
        .rfind(is_boundary)
        .map_or(0, |idx| idx + 1);
    let to = line[end..]
        .find(is_boundary)
        .map_or(line.len(), |idx| end + idx);
    &line[from..to]
}

fn has_action_verb(sentence: &str) -> bool {
    ACTION_VERB
        .as_ref()
        .is_some_and(|re| re.is_match(sentence))
}

fn substantial(compiled: &CompiledEntry, text: &str) -> bool {
    let (title, body) = split_title(text);
    if !compiled.spans(title).is_empty() {
        return true;
    }

    let mut occurrences = 0usize;
    let mut sentences: Vec<&str> = Vec::new();
    for line in body.lines().filter(|l| !is_peripheral_line(l)) {
        for (start, end) in compiled.spans(line) {
            occurrences += 1;
            sentences.push(sentence_around(line, start, end));
        }
    }

    match occurrences {
        0 => false,
        1 => sentences.iter().any(|s| has_action_verb(s)),
        _ => true,
    }
}

impl MentionExtractor for RosterExtractor {
    fn extract_mentions(&self, text: &str) -> Vec<PoliticianMention> {
        let (title, body) = split_title(text);
        self.entries
            .iter()
            .filter_map(|compiled| {
                let confidence = Self::confidence(compiled, title, body)?;
                Some(PoliticianMention {
                    name: compiled.entry.name.clone(),
                    party: compiled.entry.party.clone(),
                    constituency: compiled.entry.constituency.clone(),
                    confidence,
                    substantial: substantial(compiled, text),
                })
            })
            .collect()
    }

    fn is_substantial_mention(&self, text: &str, politician_name: &str) -> bool {
        match self.find_entry(politician_name) {
            Some(compiled) => substantial(compiled, text),
            None => word_pattern(politician_name).is_some_and(|full| {
                let adhoc = CompiledEntry {
                    entry: RosterEntry {
                        name: politician_name.to_string(),
                        party: String::new(),
                        constituency: String::new(),
                        aliases: Vec::new(),
                    },
                    patterns: vec![(MatchKind::FullName, full)],
                };
                substantial(&adhoc, text)
            }),
        }
    }
}

/// Raise confidence for politicians the importance scorer named as a main
/// subject of the article.
pub fn apply_primary_boost(mentions: &mut [PoliticianMention], primary_politicians: &[String]) {
    for mention in mentions.iter_mut() {
        let is_primary = primary_politicians
            .iter()
            .any(|p| p.trim().eq_ignore_ascii_case(&mention.name));
        if is_primary {
            mention.confidence = (mention.confidence + PRIMARY_SUBJECT_BOOST).min(1.0);
        }
    }
}

/// Split mentions into those worth rating and those suppressed.
#[must_use]
pub fn partition_mentions(
    mentions: Vec<PoliticianMention>,
    min_confidence: f64,
) -> (Vec<PoliticianMention>, Vec<PoliticianMention>) {
    mentions
        .into_iter()
        .partition(|m| m.confidence >= min_confidence && m.substantial)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, aliases: &[&str]) -> RosterEntry {
        RosterEntry {
            name: name.to_string(),
            party: "Fine Gael".to_string(),
            constituency: "Wicklow".to_string(),
            aliases: aliases.iter().map(|a| (*a).to_string()).collect(),
        }
    }

    fn extractor() -> RosterExtractor {
        RosterExtractor::new(vec![
            entry("James Byrne", &[]),
            entry("Mary Lou McDonald", &["Mary Lou"]),
            entry("Alan Kelly", &[]),
            entry("Sean Kelly", &[]),
        ])
    }

    fn find<'a>(mentions: &'a [PoliticianMention], name: &str) -> Option<&'a PoliticianMention> {
        mentions.iter().find(|m| m.name == name)
    }

    #[test]
    fn full_name_in_title_scores_highest() {
        let text = "James Byrne unveils housing plan\nThe plan was published today.";
        let mentions = extractor().extract_mentions(text);
        let byrne = find(&mentions, "James Byrne").unwrap();
        assert!((byrne.confidence - CONFIDENCE_FULL_NAME_TITLE).abs() < f64::EPSILON);
        assert!(byrne.substantial);
    }

    #[test]
    fn full_name_in_body_is_case_insensitive() {
        let text = "Housing plan published\nJAMES BYRNE said the plan would be funded.";
        let mentions = extractor().extract_mentions(text);
        let byrne = find(&mentions, "James Byrne").unwrap();
        assert!((byrne.confidence - CONFIDENCE_FULL_NAME_BODY).abs() < f64::EPSILON);
        assert!(byrne.substantial);
    }

    #[test]
    fn alias_match_scores_below_full_name() {
        let text = "Opposition reacts\nMary Lou told the Dáil the plan was late.";
        let mentions = extractor().extract_mentions(text);
        let mcdonald = find(&mentions, "Mary Lou McDonald").unwrap();
        assert!((mcdonald.confidence - CONFIDENCE_ALIAS).abs() < f64::EPSILON);
    }

    #[test]
    fn honorific_needs_a_unique_surname() {
        let text = "Budget row\nMinister Byrne defended the figures. Deputy Kelly objected.";
        let mentions = extractor().extract_mentions(text);
        let byrne = find(&mentions, "James Byrne").unwrap();
        assert!((byrne.confidence - CONFIDENCE_HONORIFIC).abs() < f64::EPSILON);
        // Two Kellys on the roster: "Deputy Kelly" is ambiguous.
        assert!(find(&mentions, "Alan Kelly").is_none());
        assert!(find(&mentions, "Sean Kelly").is_none());
    }

    #[test]
    fn bare_surname_is_ignored() {
        let text = "Budget row\nByrne was not available for comment.";
        assert!(extractor().extract_mentions(text).is_empty());
    }

    #[test]
    fn word_boundaries_are_respected() {
        let text = "Headline\nJames Byrneside Road was closed.";
        assert!(find(&extractor().extract_mentions(text), "James Byrne").is_none());
    }

    #[test]
    fn byline_and_caption_mentions_are_not_substantial() {
        let text = "Council meeting held\nBy James Byrne\n\
                    Pictured: James Byrne at the launch.\nThe council met to discuss roads.";
        let mentions = extractor().extract_mentions(text);
        let byrne = find(&mentions, "James Byrne").unwrap();
        assert!(!byrne.substantial);
    }

    #[test]
    fn single_passing_mention_without_action_is_not_substantial() {
        let text = "Roads budget\nThe meeting, chaired in the presence of James Byrne, ran late.";
        assert!(!extractor().is_substantial_mention(text, "James Byrne"));
    }

    #[test]
    fn two_body_mentions_are_substantial() {
        let text = "Roads budget\nJames Byrne was in the chamber.\nLater James Byrne left early.";
        assert!(extractor().is_substantial_mention(text, "James Byrne"));
    }

    #[test]
    fn alias_inside_full_name_counts_once() {
        // "Mary Lou" overlaps "Mary Lou McDonald"; one occurrence, no verb.
        let text = "Dáil report\nThe chamber, with Mary Lou McDonald present, was quiet.";
        assert!(!extractor().is_substantial_mention(text, "Mary Lou McDonald"));
    }

    #[test]
    fn honorific_with_period_keeps_the_sentence_intact() {
        let text = "Roads budget\nMr. Byrne said the roads budget would rise.";
        assert!(extractor().is_substantial_mention(text, "James Byrne"));
    }

    #[test]
    fn unknown_name_falls_back_to_full_name_matching() {
        let text = "Seanad vote\nPat Murphy voted against the bill.";
        assert!(extractor().is_substantial_mention(text, "Pat Murphy"));
        assert!(!extractor().is_substantial_mention(text, "Someone Else"));
    }

    #[test]
    fn primary_boost_is_capped() {
        let mut mentions = vec![
            PoliticianMention {
                name: "James Byrne".to_string(),
                party: String::new(),
                constituency: String::new(),
                confidence: 0.98,
                substantial: true,
            },
            PoliticianMention {
                name: "Alan Kelly".to_string(),
                party: String::new(),
                constituency: String::new(),
                confidence: 0.75,
                substantial: true,
            },
        ];
        apply_primary_boost(&mut mentions, &["james byrne".to_string()]);
        assert!((mentions[0].confidence - 1.0).abs() < f64::EPSILON);
        assert!((mentions[1].confidence - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn partition_requires_confidence_and_substance() {
        let make = |name: &str, confidence: f64, substantial: bool| PoliticianMention {
            name: name.to_string(),
            party: String::new(),
            constituency: String::new(),
            confidence,
            substantial,
        };
        let (kept, suppressed) = partition_mentions(
            vec![
                make("a", 0.9, true),
                make("b", 0.65, true),
                make("c", 0.95, false),
                make("d", 0.7, true),
            ],
            0.7,
        );
        let kept: Vec<&str> = kept.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(kept, vec!["a", "d"]);
        assert_eq!(suppressed.len(), 2);
    }
}
