//! Stop-sequence set.
//!
//! Two distinct matching strategies live here on purpose. The generation
//! loop only ever asks "does the buffer *end* with a fragment" (cheap,
//! O(total fragment length) per step). The normalizer instead scans the
//! whole buffer for the earliest occurrence, which catches markers that
//! slipped into the middle of the output. Unifying the two would change
//! observable truncation points, so both are kept.

/// Ordered set of literal stop fragments: chat-template leakage markers,
/// end-of-text markers, and sentence terminators.
///
/// Empty fragments are never matched; every operation skips them so an
/// empty string cannot vacuously stop generation.
#[derive(Debug, Clone)]
pub struct StopSet {
    fragments: Vec<String>,
}

/// Sentence-terminating punctuation, CJK and ASCII. Whole code points;
/// the newline case is handled separately by the normalizer.
pub const TERMINATORS: &[&str] = &["。", "！", "？", ".", "!", "?"];

/// Chat leakage and end-of-text markers, plus newlines.
const MARKERS: &[&str] = &[
    "\nHuman:",
    "\nUser:",
    "\nassistant:",
    "\nAssistant:",
    "<|endoftext|>",
    "</s>",
    "<|im_end|>",
    "<|eot_id|>",
    "\n\n",
    "\n",
];

impl Default for StopSet {
    fn default() -> Self {
        // The loop's set: terminators double as stop fragments so
        // generation halts at the end of the first sentence instead of
        // running to max_tokens.
        let mut fragments: Vec<String> = MARKERS.iter().map(|s| s.to_string()).collect();
        fragments.extend(TERMINATORS.iter().map(|s| s.to_string()));
        Self { fragments }
    }
}

impl StopSet {
    pub fn new(fragments: Vec<String>) -> Self {
        Self { fragments }
    }

    /// Leakage and end-of-text markers only, no sentence terminators.
    ///
    /// This is the set the normalizer trims against. Trimming cuts *at*
    /// the fragment start, so terminators must stay out of it or a final
    /// "X is a Y." would lose its period before the sentence cut runs.
    pub fn markers() -> Self {
        Self {
            fragments: MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Exact suffix check: true iff the buffer ends byte-for-byte with
    /// any non-empty fragment. Does not trigger on mid-buffer matches.
    pub fn matches_suffix(&self, buf: &str) -> bool {
        self.fragments
            .iter()
            .filter(|f| !f.is_empty())
            .any(|f| buf.ends_with(f.as_str()))
    }

    /// Byte offset of the earliest occurrence of any non-empty fragment
    /// anywhere in the buffer.
    pub fn earliest_match(&self, buf: &str) -> Option<usize> {
        self.fragments
            .iter()
            .filter(|f| !f.is_empty())
            .filter_map(|f| buf.find(f.as_str()))
            .min()
    }
}
