//! Prompt text for the judgment capability. Each prompt pins the JSON shape
//! the matching parser expects; wording is otherwise free to change.

use crate::judgment::AnalysisContext;
use crate::types::{Article, PoliticianMention};

/// Article bodies longer than this are cut before prompting.
pub const MAX_CONTENT_CHARS: usize = 8000;

pub const IMPORTANCE_SYSTEM: &str = "You rate Irish political news for citizens tracking their TDs. \
Score how much the article matters for public accountability of elected representatives. \
Answer with a single JSON object: \
{\"score\": number 0-100, \
\"topic_category\": one of housing|healthcare|economy|justice|immigration|environment|education|general, \
\"primary_politicians\": [full names of politicians who are the main subject], \
\"reasoning\": short string}.";

pub const IMPACT_SYSTEM: &str = "You assess how a news article reflects on one named politician. \
Judge only what the article supports. If the article gives no basis for a process score, use null; \
never guess a midpoint. Report your own certainty honestly in confidence. \
If the politician's stance contradicts a recorded prior stance on the same topic, set flip_flop to true. \
Answer with a single JSON object: \
{\"sentiment\": positive|negative|neutral|mixed, \
\"story_type\": policy_action|statement|scandal|achievement|constituency_work|campaign|other, \
\"topic\": housing|healthcare|economy|justice|immigration|environment|education|general, \
\"process_scores\": {\"transparency\": 0-100 or null, \"integrity\": 0-100 or null, \
\"effectiveness\": 0-100 or null, \"consistency\": 0-100 or null}, \
\"rationale\": {\"transparency\": string, \"integrity\": string, \"effectiveness\": string, \"consistency\": string}, \
\"impact_score\": number -10 to 10, \
\"confidence\": number 0-1, \
\"ideology_delta\": {dimension: number -2 to 2} or null, using only economic|social|cultural|globalism|environmental|authority|welfare|technocratic, \
\"policy_stance\": {\"stance\": support|oppose|neutral, \"strength\": 1-5, \"evidence\": quote, \"topic\": short policy name} or null, \
\"opposition_advocacy\": bool, \"flip_flop\": bool, \"suspicious_timing\": bool, \"constituency_focus\": bool, \
\"summary\": one sentence}.";

/// Truncate on a character boundary.
#[must_use]
pub fn truncate_content(content: &str) -> &str {
    match content.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

#[must_use]
pub fn importance_user_prompt(article: &Article) -> String {
    format!(
        "Source: {}\nPublished: {}\nTitle: {}\n\n{}",
        article.source,
        article.published_date.format("%Y-%m-%d"),
        article.title,
        truncate_content(&article.content)
    )
}

#[must_use]
pub fn impact_user_prompt(
    article: &Article,
    mention: &PoliticianMention,
    context: &AnalysisContext,
) -> String {
    format!(
        "Politician: {}\n{}\nSource: {}\nPublished: {}\nTitle: {}\n\n{}",
        mention.name,
        context.describe(),
        article.source,
        article.published_date.format("%Y-%m-%d"),
        article.title,
        truncate_content(&article.content)
    )
}

/// Prepend a panel perspective to the shared impact instructions.
#[must_use]
pub fn perspective_system(perspective: &str) -> String {
    format!("{perspective}\n\n{IMPACT_SYSTEM}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_is_untouched() {
        assert_eq!(truncate_content("short"), "short");
    }

    #[test]
    fn long_content_is_cut_at_limit() {
        let long = "é".repeat(MAX_CONTENT_CHARS + 50);
        assert_eq!(truncate_content(&long).chars().count(), MAX_CONTENT_CHARS);
    }
}
