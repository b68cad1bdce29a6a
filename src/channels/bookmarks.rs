use std::collections::BTreeMap;

use regex::Regex;
use thiserror::Error;

pub const DEFAULT_BOOKMARK_PATTERN: &str = r"\$(\d+)";

#[derive(Debug, Error)]
pub enum BookmarkPatternError {
    #[error("invalid bookmark pattern")]
    Invalid(#[from] regex::Error),
    #[error("bookmark pattern matches the empty string")]
    MatchesEmpty,
}

/// Utterance text with its bookmark markers stripped out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedSpeech {
    /// Text handed to the renderer.
    pub text: String,
    pub word_count: usize,
    /// Word index -> bookmark ids reached when that word is spoken.
    pub bookmarks: BTreeMap<usize, Vec<String>>,
}

impl PreparedSpeech {
    pub fn bookmarks_at(&self, index: usize) -> &[String] {
        self.bookmarks.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bookmarks placed after the last word; reported on completion.
    pub fn trailing(&self) -> impl Iterator<Item = &String> {
        self.bookmarks.range(self.word_count..).flat_map(|(_, ids)| ids)
    }
}

#[derive(Debug, Clone)]
pub struct BookmarkExtractor {
    pattern: Regex,
}

impl BookmarkExtractor {
    pub fn new(pattern: &str) -> Result<Self, BookmarkPatternError> {
        let pattern = Regex::new(pattern)?;
        if pattern.is_match("") {
            return Err(BookmarkPatternError::MatchesEmpty);
        }
        Ok(Self { pattern })
    }

    pub fn prepare(&self, text: &str) -> PreparedSpeech {
        let mut words: Vec<&str> = Vec::new();
        let mut bookmarks: BTreeMap<usize, Vec<String>> = BTreeMap::new();

        for token in text.split_whitespace() {
            let mut rest = 0;
            for caps in self.pattern.captures_iter(token) {
                let Some(whole) = caps.get(0) else { continue };
                let fragment = &token[rest..whole.start()];
                if !fragment.is_empty() {
                    words.push(fragment);
                }
                let id = caps.get(1).unwrap_or(whole).as_str();
                bookmarks
                    .entry(words.len())
                    .or_default()
                    .push(id.to_string());
                rest = whole.end();
            }
            if rest < token.len() {
                words.push(&token[rest..]);
            }
        }

        PreparedSpeech {
            text: words.join(" "),
            word_count: words.len(),
            bookmarks,
        }
    }
}
