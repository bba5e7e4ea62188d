/*!
 * Negation annotation.
 *
 * Detects negation cue words in a sentence and computes the scope span that
 * follows the leftmost cue, with offsets stable against the original text.
 */

pub mod annotator;
pub mod vocabulary;

pub use annotator::{NegationAnnotation, NegationAnnotator, ScopeSpan};
pub use vocabulary::{BUILTIN_CUES, CueVocabulary};
