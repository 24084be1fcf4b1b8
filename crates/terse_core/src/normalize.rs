//! Output normalizer: force raw model output into one clean sentence.
//!
//! Four steps, applied in order, each a no-op when its trigger condition
//! is absent: stop-marker trim, sentence-boundary cut, whitespace
//! normalization, and anchor salvage. Empty input yields empty output.

use crate::stop::{StopSet, TERMINATORS};

/// Run the full normalization pipeline on raw loop output.
///
/// `stops` should be the marker set ([`StopSet::markers`]); `anchor` is
/// the optional key phrase for the salvage heuristic.
pub fn normalize_answer(raw: String, stops: &StopSet, anchor: Option<&str>) -> String {
    let mut out = raw;
    trim_at_first_stop(&mut out, stops);
    cut_first_sentence(&mut out);
    normalize_whitespace(&mut out);
    if let Some(key) = anchor {
        salvage_at_anchor(&mut out, key);
    }
    out
}

/// Truncate at the earliest occurrence of any stop fragment, anywhere in
/// the buffer. Unlike the loop's suffix check this catches markers that
/// appear mid-buffer due to sampling variance.
pub fn trim_at_first_stop(buf: &mut String, stops: &StopSet) {
    if let Some(cut) = stops.earliest_match(buf) {
        buf.truncate(cut);
    }
}

/// Cut the buffer down to its first sentence.
///
/// Strips carriage returns, then truncates immediately after the earliest
/// sentence terminator, or at the earliest newline (excluding it),
/// whichever comes first. Terminators are matched as whole code points so
/// a multi-byte sequence is never split. No terminator, no newline: the
/// buffer is left untouched.
pub fn cut_first_sentence(buf: &mut String) {
    if buf.contains('\r') {
        buf.retain(|c| c != '\r');
    }

    // Earliest terminator wins; the cut lands after it.
    let mut cut: Option<usize> = None;
    for term in TERMINATORS {
        if let Some(pos) = buf.find(term) {
            let end = pos + term.len();
            cut = Some(cut.map_or(end, |c: usize| c.min(end)));
        }
    }

    // A newline that appears before any terminator ends the sentence
    // without being kept.
    if let Some(nl) = buf.find('\n') {
        cut = Some(cut.map_or(nl, |c: usize| c.min(nl)));
    }

    if let Some(cut) = cut {
        buf.truncate(cut);
    }
}

/// Trim leading/trailing whitespace bytes, map inner newlines and tabs to
/// spaces, and collapse runs of spaces into one. Never grows the string.
pub fn normalize_whitespace(buf: &mut String) {
    let trimmed = buf.trim_matches(&[' ', '\t', '\n'][..]);

    let mut out = String::with_capacity(trimmed.len());
    let mut prev_space = false;
    for c in trimmed.chars() {
        let mapped = match c {
            '\n' | '\t' => ' ',
            other => other,
        };
        if mapped == ' ' {
            if !prev_space {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(mapped);
            prev_space = false;
        }
    }

    *buf = out;
}

/// Anchor salvage: if the key phrase occurs past the start of the buffer,
/// discard everything before it and re-run the sentence cut and
/// whitespace normalization on the remainder.
///
/// Deliberately narrow: positional truncation only, no semantic repair,
/// so otherwise-correct output is never corrupted. Absent key phrase, or
/// one already at position zero, leaves the buffer unchanged.
pub fn salvage_at_anchor(buf: &mut String, key: &str) {
    if key.is_empty() {
        return;
    }
    match buf.find(key) {
        Some(pos) if pos > 0 => {
            buf.drain(..pos);
            cut_first_sentence(buf);
            normalize_whitespace(buf);
        }
        _ => {}
    }
}
