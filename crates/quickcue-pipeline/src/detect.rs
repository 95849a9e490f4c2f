//! Pattern-based question detection.
//!
//! Cheap pure-function pre-filters that run on every final transcript before
//! the pipeline spends any provider budget: a keyword check for "is this a
//! question at all", a completeness gate for "has the speaker finished
//! asking it", and a coarse kind classifier used to pick a fitting generic
//! fallback line.

/// Leading or embedded words that mark a question.
const QUESTION_WORDS: &[&str] = &[
    "what", "how", "why", "when", "where", "who", "which", "whose",
    "can you", "could you", "would you", "will you", "should you",
    "do you", "did you", "does", "have you", "has",
    "describe", "tell me", "explain", "share", "talk about",
    "give me", "walk me through", "think of",
];

/// Quick pre-filter: might this text be a question?
///
/// Errs on the side of `true` for longer text; the decomposer and search
/// stages tolerate a non-question slipping through, while a dropped real
/// question is unrecoverable.
pub fn looks_like_question(text: &str) -> bool {
    if text.len() < 5 {
        return false;
    }

    if text.contains('?') {
        return true;
    }

    let lower = text.to_lowercase();
    let lower = lower.trim();
    if QUESTION_WORDS.iter().any(|q| lower.starts_with(q)) {
        return true;
    }
    let padded = format!(" {lower} ");
    if QUESTION_WORDS.iter().any(|q| padded.contains(&format!(" {q} "))) {
        return true;
    }

    // Short text with no indicators is almost certainly not a question;
    // longer text gets the benefit of the doubt.
    text.split_whitespace().count() >= 8
}

/// Has the speaker likely finished asking? At least 5 words; a trailing `?`
/// settles it, otherwise length or terminal punctuation decides.
pub fn is_likely_complete(text: &str) -> bool {
    let text = text.trim();
    let word_count = text.split_whitespace().count();
    if word_count < 5 {
        return false;
    }
    if text.ends_with('?') {
        return true;
    }
    if word_count >= 8 {
        return true;
    }
    text.ends_with('.') || text.ends_with('!')
}

/// Coarse question category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Behavioral,
    Technical,
    Situational,
    General,
}

impl QuestionKind {
    /// Keyword classifier; first matching category wins.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();

        const BEHAVIORAL: &[&str] = &[
            "tell me about a time",
            "describe a time",
            "describe a situation",
            "give me an example",
            "have you ever",
            "your experience",
        ];
        const SITUATIONAL: &[&str] = &[
            "what would you do",
            "how would you handle",
            "how would you approach",
            "if you were",
            "imagine",
        ];
        const TECHNICAL: &[&str] = &[
            "how does",
            "how would you implement",
            "explain how",
            "architecture",
            "design",
            "algorithm",
            "trade-off",
            "tradeoff",
        ];

        if BEHAVIORAL.iter().any(|k| lower.contains(k)) {
            QuestionKind::Behavioral
        } else if SITUATIONAL.iter().any(|k| lower.contains(k)) {
            QuestionKind::Situational
        } else if TECHNICAL.iter().any(|k| lower.contains(k)) {
            QuestionKind::Technical
        } else {
            QuestionKind::General
        }
    }

    /// Safe holding answer for this kind of question; the terminal fallback
    /// when every other stage has come up empty.
    pub fn fallback_line(&self) -> &'static str {
        match self {
            QuestionKind::Behavioral => {
                "That's a good one — let me think of a concrete example. Could \
                 you give me a moment, or rephrase which part matters most to you?"
            }
            QuestionKind::Situational => {
                "Let me think through how I'd approach that scenario — could \
                 you clarify the constraints you have in mind?"
            }
            QuestionKind::Technical => {
                "Let me structure my thoughts on the technical side of that — \
                 could you repeat the question so I cover every part?"
            }
            QuestionKind::General => {
                "Let me take a moment to structure my thoughts on that — could \
                 you repeat or rephrase the question while I gather the key points?"
            }
        }
    }
}
