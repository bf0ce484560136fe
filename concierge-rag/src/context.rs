//! Context assembler: retrieval matches → numbered, bounded context blocks.

use tracing::debug;

use crate::config::PipelineConfig;
use crate::document::Match;

/// Continuation marker appended when the joined context is truncated.
pub const TRUNCATION_MARKER: char = '…';

/// A formatted excerpt derived from a match that passed the relevance
/// filter. The 1-based `index` is reused for citation numbering.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextBlock {
    /// 1-based position in the post-filter sequence.
    pub index: usize,
    /// Id of the match this block was built from, so citation *n* can
    /// name the entry that actually contributed block *n*.
    pub source_id: String,
    /// The formatted block text (heading, optional bold title, body).
    pub text: String,
}

/// The assembled context for one answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledContext {
    /// Surviving blocks, in rank order.
    pub blocks: Vec<ContextBlock>,
    /// All blocks joined with blank lines, truncated to the configured
    /// character cap with a continuation marker when exceeded.
    pub joined: String,
    /// Whether the joined text was truncated.
    pub truncated: bool,
}

impl AssembledContext {
    /// Whether any block survived the filters.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Assemble context blocks from ranked matches.
///
/// A match contributes a block only if its score reaches the relevance
/// threshold and its metadata yields body text (`"text"`, else
/// `"excerpt"`). Blocks with case-insensitively duplicate bodies are
/// dropped, keeping the first occurrence. The result is capped at the
/// configured block count, and the joined text at the configured
/// character length (truncation operates on the concatenation, not per
/// block).
pub fn assemble(matches: &[Match], config: &PipelineConfig) -> AssembledContext {
    let mut blocks: Vec<ContextBlock> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    for m in matches {
        if blocks.len() >= config.max_context_blocks {
            break;
        }
        if m.score < config.min_score {
            continue;
        }
        let Some(body) = block_body(m) else {
            debug!(id = %m.id, score = m.score, "match passed score filter but has no text");
            continue;
        };

        let key = body.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);

        let index = blocks.len() + 1;
        let text = match m.metadata.get("title").map(String::as_str) {
            Some(title) if !title.is_empty() => {
                format!("### Doc {index}\n**{title}**\n{body}")
            }
            _ => format!("### Doc {index}\n{body}"),
        };
        blocks.push(ContextBlock { index, source_id: m.id.clone(), text });
    }

    let joined = blocks.iter().map(|b| b.text.as_str()).collect::<Vec<_>>().join("\n\n");
    let (joined, truncated) = truncate_chars(joined, config.max_context_chars);

    AssembledContext { blocks, joined, truncated }
}

/// Body text for a match: explicit stored text, else an excerpt.
fn block_body(m: &Match) -> Option<&str> {
    ["text", "excerpt"]
        .iter()
        .filter_map(|key| m.metadata.get(*key))
        .map(String::as_str)
        .find(|text| !text.trim().is_empty())
}

/// Truncate to at most `max_chars` characters, appending the
/// continuation marker when anything was cut.
fn truncate_chars(text: String, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => {
            let mut truncated = text[..byte_index].to_string();
            truncated.push(TRUNCATION_MARKER);
            (truncated, true)
        }
        None => (text, false),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn match_with(id: &str, score: f32, pairs: &[(&str, &str)]) -> Match {
        let metadata: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Match { id: id.to_string(), score, metadata }
    }

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    #[test]
    fn low_scoring_matches_are_excluded() {
        let matches = vec![
            match_with("a", 0.8, &[("text", "alpha")]),
            match_with("b", 0.59, &[("text", "beta")]),
        ];
        let ctx = assemble(&matches, &config());
        assert_eq!(ctx.blocks.len(), 1);
        assert!(ctx.joined.contains("alpha"));
        assert!(!ctx.joined.contains("beta"));
    }

    #[test]
    fn excerpt_is_used_when_text_is_absent() {
        let matches = vec![match_with("a", 0.9, &[("excerpt", "from the excerpt")])];
        let ctx = assemble(&matches, &config());
        assert!(ctx.joined.contains("from the excerpt"));
    }

    #[test]
    fn textless_matches_are_skipped_even_above_threshold() {
        let matches = vec![
            match_with("a", 0.95, &[("title", "no body here")]),
            match_with("b", 0.80, &[("text", "has a body")]),
        ];
        let ctx = assemble(&matches, &config());
        assert_eq!(ctx.blocks.len(), 1);
        assert_eq!(ctx.blocks[0].index, 1);
        assert_eq!(ctx.blocks[0].source_id, "b");
        assert!(ctx.blocks[0].text.contains("has a body"));
    }

    #[test]
    fn title_is_bolded_and_blocks_are_numbered_post_filter() {
        let matches = vec![
            match_with("skip", 0.1, &[("text", "irrelevant")]),
            match_with("a", 0.9, &[("text", "body one"), ("title", "Services")]),
            match_with("b", 0.8, &[("text", "body two")]),
        ];
        let ctx = assemble(&matches, &config());
        assert_eq!(ctx.blocks[0].text, "### Doc 1\n**Services**\nbody one");
        assert_eq!(ctx.blocks[1].text, "### Doc 2\nbody two");
    }

    #[test]
    fn case_insensitive_duplicates_keep_first_occurrence() {
        let matches = vec![
            match_with("a", 0.9, &[("text", "Our Services")]),
            match_with("b", 0.8, &[("text", "our services")]),
            match_with("c", 0.7, &[("text", "something else")]),
        ];
        let ctx = assemble(&matches, &config());
        assert_eq!(ctx.blocks.len(), 2);
        assert!(ctx.blocks[0].text.contains("Our Services"));
        assert_eq!(ctx.blocks[1].index, 2);
        assert_eq!(ctx.blocks[1].source_id, "c");
    }

    #[test]
    fn block_count_is_capped() {
        let matches: Vec<Match> = (0..10)
            .map(|i| match_with(&format!("m{i}"), 0.9, &[("text", &format!("body {i}"))]))
            .collect();
        let ctx = assemble(&matches, &config());
        assert_eq!(ctx.blocks.len(), config().max_context_blocks);
    }

    #[test]
    fn joined_context_truncates_with_marker() {
        let long = "x".repeat(3000);
        let matches = vec![match_with("a", 0.9, &[("text", long.as_str())])];
        let cfg = config();
        let ctx = assemble(&matches, &cfg);
        assert!(ctx.truncated);
        assert!(ctx.joined.ends_with(TRUNCATION_MARKER));
        assert_eq!(ctx.joined.chars().count(), cfg.max_context_chars + 1);
    }

    #[test]
    fn short_context_is_not_truncated() {
        let matches = vec![match_with("a", 0.9, &[("text", "short")])];
        let ctx = assemble(&matches, &config());
        assert!(!ctx.truncated);
        assert!(!ctx.joined.ends_with(TRUNCATION_MARKER));
    }
}
