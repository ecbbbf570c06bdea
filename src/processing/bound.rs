//! Size-bounded re-chunking of segments against the stored record ceiling.
//!
//! A segment is stored as its *decorated* text: a preamble naming the reference and page followed
//! by the segment itself. When that string exceeds the record ceiling the segment is re-split:
//!
//! - the segment is cut at the most meaningful boundary available (blank lines, then line breaks,
//!   sentence ends and spaces) and falls back to raw character cuts for runs with none of those;
//! - consecutive sub-chunks then share a character overlap so a cut does not strand context;
//! - every sub-chunk is re-decorated and re-checked once. Anything still too long is dropped with
//!   a warning; text is never truncated to make it fit.
//!
//! Lengths are measured in Unicode scalar values.

use crate::config::{
    DEFAULT_MAX_RECORD_LENGTH, DEFAULT_SPLIT_CHUNK_OVERLAP, DEFAULT_SPLIT_CHUNK_SIZE,
};
use std::ops::Range;

use super::types::{Chunk, ChunkingError};

/// Length limits applied while bounding segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLimits {
    /// Maximum length of a decorated record.
    pub max_record_length: usize,
    /// Target size of sub-chunks produced when a segment is re-split.
    pub split_size: usize,
    /// Characters shared between consecutive sub-chunks.
    pub split_overlap: usize,
}

impl Default for ChunkLimits {
    fn default() -> Self {
        Self {
            max_record_length: DEFAULT_MAX_RECORD_LENGTH,
            split_size: DEFAULT_SPLIT_CHUNK_SIZE,
            split_overlap: DEFAULT_SPLIT_CHUNK_OVERLAP,
        }
    }
}

/// Chunks that survived bounding, plus a count of the ones that had to be discarded.
#[derive(Debug, Clone, Default)]
pub struct BoundChunks {
    /// Chunks whose decorated text fits the ceiling, in source order.
    pub chunks: Vec<Chunk>,
    /// Sub-chunks dropped because they still exceeded the ceiling.
    pub dropped: usize,
}

/// Wrap chunk text in the stored preamble.
pub fn decorate(reference: &str, page_number: u32, text: &str) -> String {
    format!("Content from {reference}. Page number: {page_number}. {text}")
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Turn one segment into chunks whose decorated form fits `limits.max_record_length`.
///
/// Every emitted chunk inherits `page_number`. Re-splitting happens at most once per segment.
pub fn bound(
    segment: &str,
    page_number: u32,
    reference: &str,
    limits: &ChunkLimits,
) -> Result<BoundChunks, ChunkingError> {
    let decorated = decorate(reference, page_number, segment);
    let decorated_len = char_len(&decorated);
    if decorated_len <= limits.max_record_length {
        return Ok(BoundChunks {
            chunks: vec![Chunk {
                text: segment.to_string(),
                page_number,
                decorated_text: decorated,
            }],
            dropped: 0,
        });
    }

    tracing::debug!(
        page = page_number,
        decorated_len,
        max_record_length = limits.max_record_length,
        "Segment exceeds record ceiling; re-splitting"
    );

    let segment_len = char_len(segment);
    let mut bounded = BoundChunks::default();
    for sub_chunk in split_text(segment, limits.split_size, limits.split_overlap)? {
        let sub_len = char_len(&sub_chunk);
        if sub_len >= segment_len {
            tracing::warn!(
                page = page_number,
                sub_len,
                segment_len,
                "Re-split made no progress; skipping problematic chunk"
            );
            bounded.dropped += 1;
            continue;
        }

        let decorated = decorate(reference, page_number, &sub_chunk);
        let decorated_len = char_len(&decorated);
        if decorated_len > limits.max_record_length {
            tracing::warn!(
                page = page_number,
                decorated_len,
                max_record_length = limits.max_record_length,
                "Still too large even after splitting; skipping problematic chunk"
            );
            bounded.dropped += 1;
            continue;
        }

        bounded.chunks.push(Chunk {
            text: sub_chunk,
            page_number,
            decorated_text: decorated,
        });
    }

    Ok(bounded)
}

/// Split text into pieces of at most `chunk_size` characters with `overlap` characters of carry.
///
/// Every character of `text` lands in at least one piece. Cuts prefer blank lines, then line
/// breaks, sentence ends and spaces; a run with none of those is cut at character boundaries.
/// Each piece after the first is prefixed with up to `overlap` characters of the text before it.
/// Returns an empty vector when the input is all whitespace.
pub fn split_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let effective_overlap = overlap.min(chunk_size - 1);
    // Leave room for the carried tail so no piece exceeds `chunk_size`.
    let spans = split_spans(text, chunk_size - effective_overlap);
    Ok(apply_overlap(text, &spans, effective_overlap))
}

const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Contiguous byte ranges that exactly cover `text`, none longer than `budget` characters.
fn split_spans(text: &str, budget: usize) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    split_range(text, 0..text.len(), 0, budget, &mut spans);
    spans
}

fn split_range(
    text: &str,
    range: Range<usize>,
    level: usize,
    budget: usize,
    spans: &mut Vec<Range<usize>>,
) {
    let slice = &text[range.clone()];
    if char_len(slice) <= budget {
        if !range.is_empty() {
            spans.push(range);
        }
        return;
    }

    let Some((depth, separator)) = SEPARATORS
        .iter()
        .enumerate()
        .skip(level)
        .find(|(_, separator)| slice.contains(**separator))
    else {
        hard_cut(text, range, budget, spans);
        return;
    };

    // The separator stays on the part before it.
    let mut parts = Vec::new();
    let mut part_start = range.start;
    for (index, matched) in slice.match_indices(*separator) {
        let part_end = range.start + index + matched.len();
        parts.push(part_start..part_end);
        part_start = part_end;
    }
    if part_start < range.end {
        parts.push(part_start..range.end);
    }

    let mut pending: Option<(Range<usize>, usize)> = None;
    for part in parts {
        let part_len = char_len(&text[part.clone()]);
        if part_len > budget {
            if let Some((merged, _)) = pending.take() {
                spans.push(merged);
            }
            split_range(text, part, depth + 1, budget, spans);
            continue;
        }
        pending = match pending.take() {
            Some((merged, merged_len)) if merged_len + part_len <= budget => {
                Some((merged.start..part.end, merged_len + part_len))
            }
            Some((merged, _)) => {
                spans.push(merged);
                Some((part, part_len))
            }
            None => Some((part, part_len)),
        };
    }
    if let Some((merged, _)) = pending {
        spans.push(merged);
    }
}

/// Cut `range` every `budget` characters.
fn hard_cut(text: &str, range: Range<usize>, budget: usize, spans: &mut Vec<Range<usize>>) {
    let mut start = range.start;
    let mut count = 0;
    for (offset, _) in text[range.clone()].char_indices() {
        if count == budget {
            let cut = range.start + offset;
            spans.push(start..cut);
            start = cut;
            count = 0;
        }
        count += 1;
    }
    if start < range.end {
        spans.push(start..range.end);
    }
}

/// Extend each span backwards by `overlap` characters and drop the blank ones.
fn apply_overlap(text: &str, spans: &[Range<usize>], overlap: usize) -> Vec<String> {
    spans
        .iter()
        .filter(|span| !text[(*span).clone()].trim().is_empty())
        .map(|span| {
            let carried = char_tail(&text[..span.start], overlap);
            let start = span.start - carried.len();
            text[start..span.end].trim().to_string()
        })
        .collect()
}

fn char_tail(text: &str, count: usize) -> &str {
    if count == 0 {
        return "";
    }
    match text.char_indices().rev().nth(count - 1) {
        Some((index, _)) => &text[index..],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: &str = "Accounts At A Glance 2019-20";

    fn words(count: usize) -> String {
        (0..count)
            .map(|index| format!("word{index}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn text_with_decorated_len(target: usize, page: u32) -> String {
        let preamble = char_len(&decorate(REFERENCE, page, ""));
        let mut body = String::new();
        let mut sentence = 0;
        while char_len(&body) < target - preamble {
            body.push_str(&format!("Sentence number {sentence} talks about revenue. "));
            if sentence % 7 == 6 {
                body.push_str("\n\n");
            }
            sentence += 1;
        }
        body.chars().take(target - preamble).collect()
    }

    #[test]
    fn decorate_uses_fixed_template() {
        assert_eq!(
            decorate("Report", 3, "Body"),
            "Content from Report. Page number: 3. Body"
        );
    }

    #[test]
    fn fitting_segment_passes_through_unchanged() {
        let bounded = bound("Short body", 2, REFERENCE, &ChunkLimits::default()).unwrap();
        assert_eq!(bounded.dropped, 0);
        assert_eq!(bounded.chunks.len(), 1);
        let chunk = &bounded.chunks[0];
        assert_eq!(chunk.text, "Short body");
        assert_eq!(chunk.page_number, 2);
        assert_eq!(chunk.decorated_text, decorate(REFERENCE, 2, "Short body"));
    }

    #[test]
    fn segment_exactly_at_ceiling_is_kept_whole() {
        let limits = ChunkLimits::default();
        let segment = text_with_decorated_len(limits.max_record_length, 1);
        let bounded = bound(&segment, 1, REFERENCE, &limits).unwrap();
        assert_eq!(bounded.chunks.len(), 1);
        assert_eq!(char_len(&bounded.chunks[0].decorated_text), limits.max_record_length);
    }

    #[test]
    fn oversize_segment_is_split_within_ceiling() {
        let limits = ChunkLimits::default();
        let segment = text_with_decorated_len(10_000, 4);
        assert_eq!(char_len(&decorate(REFERENCE, 4, &segment)), 10_000);

        let bounded = bound(&segment, 4, REFERENCE, &limits).unwrap();
        assert!(bounded.chunks.len() >= 2);
        assert_eq!(bounded.dropped, 0);
        for chunk in &bounded.chunks {
            assert_eq!(chunk.page_number, 4);
            assert!(char_len(&chunk.decorated_text) <= limits.max_record_length);
            assert!(char_len(&chunk.text) <= limits.split_size);
            assert_eq!(chunk.decorated_text, decorate(REFERENCE, 4, &chunk.text));
        }
    }

    #[test]
    fn adjacent_sub_chunks_share_bounded_overlap() {
        let text = words(1200);
        let chunks = split_text(&text, 2000, 200).unwrap();
        assert!(chunks.len() >= 2);
        for pair in chunks.windows(2) {
            let head: String = pair[1].chars().take(20).collect();
            assert!(
                pair[0].contains(&head),
                "expected {head:?} to be carried over from the previous chunk"
            );
        }
        let total: usize = chunks.iter().map(|chunk| char_len(chunk)).sum();
        assert!(total <= char_len(&text) + chunks.len() * 201);
    }

    #[test]
    fn unbroken_text_falls_back_to_hard_cuts() {
        let limits = ChunkLimits::default();
        let segment = "x".repeat(20_000);
        let bounded = bound(&segment, 1, REFERENCE, &limits).unwrap();
        assert!(bounded.chunks.len() >= 10);
        assert_eq!(bounded.dropped, 0);
        for chunk in &bounded.chunks {
            assert!(char_len(&chunk.text) <= limits.split_size);
            assert!(char_len(&chunk.decorated_text) <= limits.max_record_length);
        }
    }

    #[test]
    fn multibyte_text_is_measured_in_characters() {
        let limits = ChunkLimits {
            max_record_length: 300,
            split_size: 100,
            split_overlap: 10,
        };
        let segment = "é".repeat(1000);
        let bounded = bound(&segment, 1, "R", &limits).unwrap();
        assert!(!bounded.chunks.is_empty());
        for chunk in &bounded.chunks {
            assert!(char_len(&chunk.decorated_text) <= 300);
        }
    }

    #[test]
    fn sub_chunks_that_still_do_not_fit_are_dropped() {
        let long_reference = "R".repeat(120);
        let limits = ChunkLimits {
            max_record_length: 100,
            split_size: 40,
            split_overlap: 5,
        };
        let segment = words(60);
        let bounded = bound(&segment, 9, &long_reference, &limits).unwrap();
        assert!(bounded.chunks.is_empty());
        assert!(bounded.dropped >= 2);
    }

    #[test]
    fn resplit_without_progress_is_dropped_not_retried() {
        let limits = ChunkLimits {
            max_record_length: 60,
            split_size: 2000,
            split_overlap: 200,
        };
        let segment = words(10);
        let bounded = bound(&segment, 1, REFERENCE, &limits).unwrap();
        assert!(bounded.chunks.is_empty());
        assert_eq!(bounded.dropped, 1);
    }

    #[test]
    fn split_text_rejects_zero_chunk_size() {
        let error = split_text("hello", 0, 0).unwrap_err();
        assert!(matches!(error, ChunkingError::InvalidChunkSize));
    }

    #[test]
    fn split_text_handles_blank_input() {
        assert!(split_text("   \n ", 10, 2).unwrap().is_empty());
    }

    #[test]
    fn char_tail_respects_char_boundaries() {
        assert_eq!(char_tail("abcdé", 2), "dé");
        assert_eq!(char_tail("ab", 5), "ab");
        assert_eq!(char_tail("ab", 0), "");
    }

    #[test]
    fn long_token_inside_prose_is_hard_cut_not_dropped() {
        let limits = ChunkLimits::default();
        let segment = format!("Intro sentence here. {} end.", "q".repeat(9000));
        let bounded = bound(&segment, 1, REFERENCE, &limits).unwrap();
        assert_eq!(bounded.dropped, 0);
        assert!(bounded.chunks.len() >= 5);
        for chunk in &bounded.chunks {
            assert!(char_len(&chunk.text) <= limits.split_size);
        }
        let kept: usize = bounded
            .chunks
            .iter()
            .map(|chunk| chunk.text.matches('q').count())
            .sum();
        assert!(kept >= 9000, "only {kept} of 9000 characters survived");
        assert!(bounded.chunks[0].text.starts_with("Intro sentence here."));
        assert!(bounded.chunks.last().unwrap().text.ends_with(" end."));
    }

    #[test]
    fn spans_cover_text_exactly_within_budget() {
        let text = format!("alpha beta\n\n{}\ngamma. delta {}", "é".repeat(250), "x".repeat(90));
        let spans = split_spans(&text, 40);
        assert_eq!(spans.first().map(|span| span.start), Some(0));
        assert_eq!(spans.last().map(|span| span.end), Some(text.len()));
        for pair in spans.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        for span in &spans {
            assert!(char_len(&text[span.clone()]) <= 40);
        }
    }

    /// Deterministic linear congruential generator for reproducible inputs.
    struct Lcg(u64);

    impl Lcg {
        fn below(&mut self, bound: usize) -> usize {
            self.0 = self
                .0
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            ((self.0 >> 33) as usize) % bound
        }
    }

    fn generated_segment(rng: &mut Lcg) -> String {
        const PIECES: [&str; 8] = [
            "revenue ",
            "expenditure. ",
            "é ",
            "会計年度の報告 ",
            "हिन्दी पाठ ",
            "\n",
            "\n\n",
            "Total: 1,204.50 ",
        ];
        let target = 1 + rng.below(20_000);
        let mut text = String::new();
        while char_len(&text) < target {
            match rng.below(12) {
                0 => text.push_str(&"z".repeat(1 + rng.below(5_000))),
                1 => text.push_str(&"é".repeat(1 + rng.below(3_000))),
                2 => text.push_str(&"漢".repeat(1 + rng.below(3_000))),
                3 => text.push_str(&"longwordwithoutbreaks".repeat(1 + rng.below(200))),
                _ => text.push_str(PIECES[rng.below(PIECES.len())]),
            }
        }
        text
    }

    #[test]
    fn generated_inputs_stay_bounded_and_keep_every_character() {
        let limits = ChunkLimits::default();
        let base_size = limits.split_size - limits.split_overlap;
        let mut rng = Lcg(0x5eed_d0c5);
        for case in 0..200 {
            let segment = generated_segment(&mut rng);

            let spans = split_spans(&segment, base_size);
            let mut covered = 0;
            for span in &spans {
                assert_eq!(span.start, covered, "case {case}: gap or overlap in spans");
                assert!(char_len(&segment[span.clone()]) <= base_size);
                covered = span.end;
            }
            assert_eq!(covered, segment.len(), "case {case}: spans stop early");

            let pieces = split_text(&segment, limits.split_size, limits.split_overlap).unwrap();
            let kept: Vec<&str> = spans
                .iter()
                .map(|span| segment[span.clone()].trim())
                .filter(|text| !text.is_empty())
                .collect();
            assert_eq!(pieces.len(), kept.len(), "case {case}");
            for (piece, own) in pieces.iter().zip(&kept) {
                assert!(char_len(piece) <= limits.split_size, "case {case}");
                assert!(piece.contains(own), "case {case}: piece lost its own text");
            }

            let resplit = char_len(&decorate(REFERENCE, 1, &segment)) > limits.max_record_length;
            let bounded = bound(&segment, 1, REFERENCE, &limits).unwrap();
            assert_eq!(bounded.dropped, 0, "case {case}");
            for chunk in &bounded.chunks {
                assert!(char_len(&chunk.decorated_text) <= limits.max_record_length);
                assert!(!resplit || char_len(&chunk.text) <= limits.split_size);
            }
        }
    }
}
