use anyhow::Result;
use tracing::{debug, info};

use super::{SpeechEvent, SpeechHandle, SpeechRenderer};

#[derive(Debug)]
struct Playback {
    handle: SpeechHandle,
    words: Vec<String>,
    started_at: Option<f64>,
    reported: usize,
}

/// Stand-in text-to-speech renderer: "speaks" at a fixed words-per-minute
/// rate and reports word boundaries and completion as time passes.
#[derive(Debug)]
pub struct PacedSpeechRenderer {
    word_secs: f64,
    next_handle: u64,
    current: Option<Playback>,
}

impl PacedSpeechRenderer {
    pub fn new(words_per_minute: f64) -> Self {
        Self {
            word_secs: 60.0 / words_per_minute.max(1.0),
            next_handle: 1,
            current: None,
        }
    }
}

impl SpeechRenderer for PacedSpeechRenderer {
    fn speak(&mut self, text: &str) -> Result<SpeechHandle> {
        let handle = SpeechHandle(self.next_handle);
        self.next_handle += 1;
        let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        info!(handle = %handle, words = words.len(), text, "speaking");
        self.current = Some(Playback {
            handle,
            words,
            started_at: None,
            reported: 0,
        });
        Ok(handle)
    }

    fn silence(&mut self, handle: SpeechHandle) {
        if self.current.as_ref().is_some_and(|p| p.handle == handle) {
            debug!(handle = %handle, "silenced");
            self.current = None;
        }
    }

    fn poll(&mut self, now: f64) -> Vec<SpeechEvent> {
        let Some(playback) = self.current.as_mut() else {
            return Vec::new();
        };
        let started = *playback.started_at.get_or_insert(now);
        let elapsed = (now - started).max(0.0);
        let total = playback.words.len();

        let mut events = Vec::new();
        let spoken = ((elapsed / self.word_secs).floor() as usize + 1).min(total);
        for index in playback.reported..spoken {
            debug!(handle = %playback.handle, index, word = %playback.words[index], "word boundary");
            events.push(SpeechEvent::WordBoundary {
                handle: playback.handle,
                index,
            });
        }
        playback.reported = playback.reported.max(spoken);

        if elapsed >= total as f64 * self.word_secs {
            events.push(SpeechEvent::Complete {
                handle: playback.handle,
            });
            self.current = None;
        }
        events
    }
}
