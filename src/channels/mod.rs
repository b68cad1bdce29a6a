pub mod bookmarks;
pub mod facial;
pub mod gaze;
pub mod gesture;
pub mod interpolation;
pub mod scheduler;
pub mod speech;
pub mod timing;

use std::sync::{Arc, Mutex, MutexGuard};

use crate::transport::Status;

pub use bookmarks::{BookmarkExtractor, BookmarkPatternError, PreparedSpeech};
pub use facial::{FacialChannel, FacsRequest};
pub use gaze::{GazeChannel, GazeRequest};
pub use gesture::{GestureChannel, GestureRequest};
pub use scheduler::{Channel, ChannelScheduler, SlotState};
pub use speech::SpeechScheduler;

pub type GazeScheduler = ChannelScheduler<GazeChannel>;
pub type FacialScheduler = ChannelScheduler<FacialChannel>;
pub type GestureScheduler = ChannelScheduler<GestureChannel>;

/// Anything the tick driver advances once per frame.
pub trait Tickable: Send {
    fn name(&self) -> &'static str;

    fn tick(&mut self, now: f64) -> Vec<Status>;

    fn is_busy(&self) -> bool;
}

/// A scheduler shared between its command handler and the tick driver.
pub type Shared<T> = Arc<Mutex<T>>;

pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Lock a shared scheduler, recovering the guard if a holder panicked.
pub fn lock<T: ?Sized>(shared: &Mutex<T>) -> MutexGuard<'_, T> {
    match shared.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
