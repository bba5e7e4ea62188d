/*!
 * Negation cue vocabulary.
 *
 * The built-in list is fixed and ordered; its order is the tie-break when
 * two cues start at the same offset, so entries must never be reordered.
 */

/// Built-in cues in enumeration order
pub const BUILTIN_CUES: [&str; 25] = [
    "not", "n't", "no", "never", "none", "neither", "nor", "cannot", "without", "denies", "deny",
    "denied", "refute", "refutes", "refuted", "absence", "lacks", "lack", "negative", "negatives",
    "negation", "exclude", "excluded", "excludes", "excluding",
];

/// How a cue is anchored on its left side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueKind {
    /// Whole word or phrase, bounded on both sides
    Word,
    /// Contraction suffix such as "n't", may be glued to the preceding word
    Suffix,
}

/// One vocabulary entry
#[derive(Debug, Clone)]
pub struct Cue {
    text: String,
    chars: Vec<char>,
    kind: CueKind,
}

impl Cue {
    fn new(raw: &str) -> Option<Self> {
        let text = normalize_cue(raw);
        if text.is_empty() {
            return None;
        }

        let kind = if text.starts_with("n'") {
            CueKind::Suffix
        } else {
            CueKind::Word
        };

        Some(Self {
            chars: text.chars().collect(),
            text,
            kind,
        })
    }

    /// Canonical (lower-case, single-spaced) form
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Canonical form as chars; a space stands for any whitespace char
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Left anchoring rule
    pub fn kind(&self) -> CueKind {
        self.kind
    }
}

/// Ordered, de-duplicated list of cues
#[derive(Debug, Clone)]
pub struct CueVocabulary {
    cues: Vec<Cue>,
}

impl CueVocabulary {
    /// The built-in vocabulary
    pub fn builtin() -> Self {
        Self::with_extra(&[])
    }

    /// Built-ins followed by `extra`, skipping blanks and duplicates
    pub fn with_extra(extra: &[String]) -> Self {
        let mut cues: Vec<Cue> = Vec::with_capacity(BUILTIN_CUES.len() + extra.len());

        let candidates = BUILTIN_CUES.iter().copied().chain(extra.iter().map(String::as_str));
        for raw in candidates {
            if let Some(cue) = Cue::new(raw) {
                if !cues.iter().any(|existing| existing.text == cue.text) {
                    cues.push(cue);
                }
            }
        }

        Self { cues }
    }

    /// Cues in enumeration order
    pub fn iter(&self) -> impl Iterator<Item = &Cue> {
        self.cues.iter()
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

impl Default for CueVocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize_cue(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| word.to_lowercase().replace('\u{2019}', "'"))
        .collect::<Vec<_>>()
        .join(" ")
}
