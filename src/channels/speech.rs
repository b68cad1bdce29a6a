//! Speech slot: one utterance playing on the renderer, the rest waiting in
//! arrival order. Word-boundary callbacks are translated into bookmark
//! statuses for the utterance's task.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use super::bookmarks::{BookmarkExtractor, PreparedSpeech};
use super::Tickable;
use crate::rig::{SpeechEvent, SpeechHandle, SpeechRenderer};
use crate::transport::Status;

#[derive(Debug)]
struct Utterance {
    task_id: String,
    handle: SpeechHandle,
    prepared: PreparedSpeech,
}

#[derive(Debug)]
struct Pending {
    task_id: String,
    prepared: PreparedSpeech,
}

pub struct SpeechScheduler {
    renderer: Box<dyn SpeechRenderer>,
    extractor: BookmarkExtractor,
    active: Option<Utterance>,
    queue: VecDeque<Pending>,
}

impl SpeechScheduler {
    pub fn new(renderer: Box<dyn SpeechRenderer>, extractor: BookmarkExtractor) -> Self {
        Self {
            renderer,
            extractor,
            active: None,
            queue: VecDeque::new(),
        }
    }

    pub fn active_task(&self) -> Option<&str> {
        self.active.as_ref().map(|u| u.task_id.as_str())
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Queue an utterance. It starts right away when nothing is playing,
    /// otherwise on the tick after the current one completes.
    pub fn enqueue(&mut self, task_id: &str, text: &str) -> Vec<Status> {
        let pending = Pending {
            task_id: task_id.to_string(),
            prepared: self.extractor.prepare(text),
        };
        if self.active.is_none() && self.queue.is_empty() {
            return self.start(pending);
        }
        debug!(task_id, position = self.queue.len(), "speech queued");
        self.queue.push_back(pending);
        Vec::new()
    }

    /// Silence the active utterance and drop everything queued. Every task
    /// affected gets its `finished`.
    pub fn stop(&mut self) -> Vec<Status> {
        let mut statuses = Vec::new();
        if let Some(active) = self.active.take() {
            self.renderer.silence(active.handle);
            info!(task_id = %active.task_id, "speech stopped");
            statuses.push(Status::finished(active.task_id));
        }
        for pending in self.queue.drain(..) {
            debug!(task_id = %pending.task_id, "queued speech dropped");
            statuses.push(Status::finished(pending.task_id));
        }
        statuses
    }

    pub fn on_word_boundary(&mut self, handle: SpeechHandle, index: usize) -> Vec<Status> {
        let Some(active) = self.active.as_ref().filter(|u| u.handle == handle) else {
            debug!(%handle, index, "word boundary for stale utterance");
            return Vec::new();
        };
        active
            .prepared
            .bookmarks_at(index)
            .iter()
            .map(|id| {
                debug!(task_id = %active.task_id, index, id = %id, "bookmark reached");
                Status::bookmark(&active.task_id, id)
            })
            .collect()
    }

    pub fn on_complete(&mut self, handle: SpeechHandle) -> Vec<Status> {
        if !self.active.as_ref().is_some_and(|u| u.handle == handle) {
            debug!(%handle, "completion for stale utterance");
            return Vec::new();
        }
        let Some(done) = self.active.take() else {
            return Vec::new();
        };
        let mut statuses: Vec<Status> = done
            .prepared
            .trailing()
            .map(|id| Status::bookmark(&done.task_id, id))
            .collect();
        info!(task_id = %done.task_id, "speech finished");
        statuses.push(Status::finished(done.task_id));
        statuses
    }

    pub fn tick(&mut self, now: f64) -> Vec<Status> {
        let mut statuses = Vec::new();
        for event in self.renderer.poll(now) {
            match event {
                SpeechEvent::WordBoundary { handle, index } => {
                    statuses.extend(self.on_word_boundary(handle, index));
                }
                SpeechEvent::Complete { handle } => {
                    statuses.extend(self.on_complete(handle));
                }
            }
        }
        while self.active.is_none() {
            let Some(next) = self.queue.pop_front() else {
                break;
            };
            statuses.extend(self.start(next));
        }
        statuses
    }

    fn start(&mut self, pending: Pending) -> Vec<Status> {
        let Pending { task_id, prepared } = pending;
        if prepared.text.is_empty() {
            if !prepared.bookmarks.is_empty() {
                warn!(task_id = %task_id, "bookmarks in text without words are ignored");
            }
            return vec![Status::finished(task_id)];
        }
        match self.renderer.speak(&prepared.text) {
            Ok(handle) => {
                info!(task_id = %task_id, %handle, words = prepared.word_count, "speech started");
                let status = Status::started(&task_id);
                self.active = Some(Utterance {
                    task_id,
                    handle,
                    prepared,
                });
                vec![status]
            }
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "speech renderer refused utterance");
                vec![Status::rejected(task_id, format!("speech rendering failed: {e}"))]
            }
        }
    }
}

impl Tickable for SpeechScheduler {
    fn name(&self) -> &'static str {
        "speech"
    }

    fn tick(&mut self, now: f64) -> Vec<Status> {
        SpeechScheduler::tick(self, now)
    }

    fn is_busy(&self) -> bool {
        self.active.is_some() || !self.queue.is_empty()
    }
}
