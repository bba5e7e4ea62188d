/*!
 * Negation cue detection and scope extraction.
 *
 * All offsets are char (Unicode scalar) indices into the original sentence.
 * Matching compares char by char, case-insensitively, instead of lower-casing
 * the sentence, because lower-casing can change the char count.
 */

use super::vocabulary::{Cue, CueKind, CueVocabulary};

/// Span of a sentence governed by a negation cue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeSpan {
    /// First char of the scope (after the cue and any whitespace)
    pub start: usize,
    /// One past the last char; always the sentence length
    pub end: usize,
    /// The scope text
    pub text: String,
}

/// Per-sentence annotation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegationAnnotation {
    /// Whitespace-separated token count
    pub word_count: usize,
    /// Char count
    pub char_count: usize,
    /// Every distinct cue found, in vocabulary order
    pub cue_words: Vec<String>,
    /// Scope of the winning cue; present exactly when a cue was found
    pub scope: Option<ScopeSpan>,
}

impl NegationAnnotation {
    pub fn has_negation(&self) -> bool {
        !self.cue_words.is_empty()
    }
}

/// Scans sentences against a cue vocabulary
#[derive(Debug, Clone, Default)]
pub struct NegationAnnotator {
    vocabulary: CueVocabulary,
}

impl NegationAnnotator {
    pub fn new(vocabulary: CueVocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &CueVocabulary {
        &self.vocabulary
    }

    /// Annotate one sentence.
    ///
    /// The winning cue is the one with the smallest start offset; on a tie
    /// the earlier vocabulary entry wins.
    pub fn annotate(&self, sentence: &str) -> NegationAnnotation {
        let chars: Vec<char> = sentence.chars().collect();

        let mut cue_words = Vec::new();
        // (start, end) of the current winner
        let mut winner: Option<(usize, usize)> = None;

        for cue in self.vocabulary.iter() {
            let Some((start, end)) = find_first(&chars, cue) else {
                continue;
            };

            cue_words.push(cue.text().to_string());

            // strict `<` keeps the earlier vocabulary entry on ties
            if winner.is_none_or(|(best, _)| start < best) {
                winner = Some((start, end));
            }
        }

        let scope = winner.map(|(_, cue_end)| {
            let start = chars[cue_end..]
                .iter()
                .position(|c| !c.is_whitespace())
                .map_or(chars.len(), |skipped| cue_end + skipped);

            ScopeSpan {
                start,
                end: chars.len(),
                text: chars[start..].iter().collect(),
            }
        });

        NegationAnnotation {
            word_count: sentence.split_whitespace().count(),
            char_count: chars.len(),
            cue_words,
            scope,
        }
    }
}

/// Leftmost match of `cue` in `chars`, as a char range
fn find_first(chars: &[char], cue: &Cue) -> Option<(usize, usize)> {
    let len = cue.chars().len();
    if len == 0 || len > chars.len() {
        return None;
    }

    (0..=chars.len() - len)
        .find(|&pos| matches_at(chars, pos, cue))
        .map(|pos| (pos, pos + len))
}

fn matches_at(chars: &[char], pos: usize, cue: &Cue) -> bool {
    let pattern = cue.chars();
    let end = pos + pattern.len();

    let body_matches = pattern.iter().zip(&chars[pos..end]).all(|(&want, &got)| {
        if want == ' ' {
            got.is_whitespace()
        } else {
            chars_eq_ignore_case(got, want)
        }
    });
    if !body_matches {
        return false;
    }

    let right_bounded = chars.get(end).is_none_or(|c| !c.is_alphanumeric());
    let left_bounded = match cue.kind() {
        CueKind::Word => pos == 0 || !chars[pos - 1].is_alphanumeric(),
        CueKind::Suffix => pos > 0 && chars[pos - 1].is_alphabetic(),
    };

    left_bounded && right_bounded
}

fn chars_eq_ignore_case(got: char, want: char) -> bool {
    let got = if got == '\u{2019}' { '\'' } else { got };
    got == want || got.to_lowercase().eq(want.to_lowercase())
}
