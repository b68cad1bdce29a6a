//! Single-slot preemptive task runner shared by the interpolating channels.

use std::fmt;

use tracing::{debug, info};

use super::timing::{AnimationPhase, AnimationWindow};
use super::Tickable;
use crate::transport::Status;

/// Channel-specific half of the scheduler: how a request becomes a target,
/// how states compare and blend, and where the output goes.
pub trait Channel: Send {
    type State: Clone + fmt::Debug + Send;
    type Request: fmt::Debug;

    fn name(&self) -> &'static str;

    /// Last state written to the output.
    fn current(&self) -> Self::State;

    fn target(&self, current: &Self::State, request: &Self::Request) -> Self::State;

    /// State the interpolation starts from. Most channels start wherever the
    /// output currently is.
    fn origin(&self, current: &Self::State, _target: &Self::State) -> Self::State {
        current.clone()
    }

    fn differs(&self, from: &Self::State, to: &Self::State) -> bool;

    fn interpolate(&self, from: &Self::State, to: &Self::State, fraction: f64) -> Self::State;

    fn apply(&mut self, state: &Self::State);
}

#[derive(Debug, Clone)]
pub struct AnimationTask<S> {
    pub task_id: String,
    pub window: AnimationWindow,
    pub old_state: S,
    pub target_state: S,
}

#[derive(Debug, Clone, Default)]
pub enum SlotState<S> {
    #[default]
    Idle,
    Running(AnimationTask<S>),
}

pub struct ChannelScheduler<C: Channel> {
    channel: C,
    slot: SlotState<C::State>,
}

impl<C: Channel> ChannelScheduler<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            slot: SlotState::Idle,
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn slot(&self) -> &SlotState<C::State> {
        &self.slot
    }

    pub fn active_task(&self) -> Option<&str> {
        match &self.slot {
            SlotState::Running(task) => Some(task.task_id.as_str()),
            SlotState::Idle => None,
        }
    }

    /// Take over the slot for a new task. Statuses come back in emission
    /// order: a preempted task's `finished` always precedes anything for the
    /// new task.
    pub fn accept(
        &mut self,
        task_id: &str,
        request: &C::Request,
        time_ms: f64,
        now: f64,
    ) -> Vec<Status> {
        let mut statuses = Vec::with_capacity(2);
        statuses.extend(self.preempt());

        let current = self.channel.current();
        let target = self.channel.target(&current, request);
        let origin = self.channel.origin(&current, &target);

        if !self.channel.differs(&origin, &target) {
            debug!(channel = self.channel.name(), task_id, "target already reached");
            statuses.push(Status::finished(task_id));
            return statuses;
        }

        let window = AnimationWindow::starting_at(now, time_ms);
        info!(
            channel = self.channel.name(),
            task_id,
            duration = window.duration,
            ?request,
            "animation started"
        );
        self.slot = SlotState::Running(AnimationTask {
            task_id: task_id.to_string(),
            window,
            old_state: origin,
            target_state: target,
        });
        statuses.push(Status::started(task_id));
        statuses
    }

    /// Force-complete the running task, leaving the output where it is.
    pub fn preempt(&mut self) -> Option<Status> {
        match std::mem::take(&mut self.slot) {
            SlotState::Running(task) => {
                info!(channel = self.channel.name(), task_id = %task.task_id, "animation preempted");
                Some(Status::finished(task.task_id))
            }
            SlotState::Idle => None,
        }
    }

    pub fn tick(&mut self, now: f64) -> Vec<Status> {
        let phase = match &self.slot {
            SlotState::Running(task) => task.window.phase(now),
            SlotState::Idle => return Vec::new(),
        };

        match phase {
            AnimationPhase::Interpolating(fraction) => {
                if let SlotState::Running(task) = &self.slot {
                    let state =
                        self.channel
                            .interpolate(&task.old_state, &task.target_state, fraction);
                    self.channel.apply(&state);
                }
                Vec::new()
            }
            AnimationPhase::Expired => match std::mem::take(&mut self.slot) {
                SlotState::Running(task) => {
                    self.channel.apply(&task.target_state);
                    info!(channel = self.channel.name(), task_id = %task.task_id, "animation finished");
                    vec![Status::finished(task.task_id)]
                }
                SlotState::Idle => Vec::new(),
            },
        }
    }
}

impl<C: Channel> Tickable for ChannelScheduler<C> {
    fn name(&self) -> &'static str {
        self.channel.name()
    }

    fn tick(&mut self, now: f64) -> Vec<Status> {
        ChannelScheduler::tick(self, now)
    }

    fn is_busy(&self) -> bool {
        matches!(self.slot, SlotState::Running(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{FINISHED, STARTED};

    /// Scalar channel that remembers every write.
    struct Dial {
        value: f64,
        writes: Vec<f64>,
    }

    impl Channel for Dial {
        type State = f64;
        type Request = f64;

        fn name(&self) -> &'static str {
            "dial"
        }

        fn current(&self) -> f64 {
            self.value
        }

        fn target(&self, _current: &f64, request: &f64) -> f64 {
            *request
        }

        fn differs(&self, from: &f64, to: &f64) -> bool {
            (from - to).abs() > 1e-9
        }

        fn interpolate(&self, from: &f64, to: &f64, fraction: f64) -> f64 {
            from + (to - from) * fraction
        }

        fn apply(&mut self, state: &f64) {
            self.value = *state;
            self.writes.push(*state);
        }
    }

    fn dial() -> ChannelScheduler<Dial> {
        ChannelScheduler::new(Dial {
            value: 0.0,
            writes: Vec::new(),
        })
    }

    fn labels(statuses: &[Status]) -> Vec<(&str, &str)> {
        statuses
            .iter()
            .map(|s| (s.task_id.as_str(), s.status.as_str()))
            .collect()
    }

    #[test]
    fn accept_while_idle_emits_started_only() {
        let mut s = dial();
        let out = s.accept("A", &10.0, 1000.0, 0.0);
        assert_eq!(labels(&out), vec![("A", STARTED)]);
        assert_eq!(s.active_task(), Some("A"));
        assert!(s.is_busy());
    }

    #[test]
    fn identical_target_finishes_without_starting() {
        let mut s = dial();
        let out = s.accept("A", &0.0, 1000.0, 0.0);
        assert_eq!(labels(&out), vec![("A", FINISHED)]);
        assert!(!s.is_busy());
        assert!(s.tick(5.0).is_empty());
    }

    #[test]
    fn preemption_finishes_old_task_first() {
        let mut s = dial();
        s.accept("A", &10.0, 1000.0, 0.0);
        s.tick(0.5);
        let out = s.accept("B", &20.0, 1000.0, 0.5);
        assert_eq!(labels(&out), vec![("A", FINISHED), ("B", STARTED)]);

        // B starts from where A was interrupted
        match s.slot() {
            SlotState::Running(task) => assert_eq!(task.old_state, 5.0),
            SlotState::Idle => panic!("B should be running"),
        }
    }

    #[test]
    fn preempted_task_is_not_finalized_to_its_target() {
        let mut s = dial();
        s.accept("A", &10.0, 1000.0, 0.0);
        s.tick(0.25);
        let out = s.accept("B", &5.0, 1000.0, 0.25);
        assert_eq!(labels(&out), vec![("A", FINISHED), ("B", STARTED)]);
        assert_eq!(s.channel().current(), 2.5);
        assert!(!s.channel().writes.contains(&10.0));
    }

    #[test]
    fn midpoint_then_exact_target() {
        let mut s = dial();
        s.accept("A", &10.0, 2000.0, 1.0);
        assert!(s.tick(2.0).is_empty());
        assert!((s.channel().current() - 5.0).abs() < 1e-9);

        let out = s.tick(3.01);
        assert_eq!(labels(&out), vec![("A", FINISHED)]);
        assert_eq!(s.channel().current(), 10.0);
        assert!(matches!(s.slot(), SlotState::Idle));
    }

    #[test]
    fn zero_duration_transits_running_for_one_tick() {
        let mut s = dial();
        let out = s.accept("A", &3.0, 0.0, 1.0);
        assert_eq!(labels(&out), vec![("A", STARTED)]);

        let out = s.tick(1.0);
        assert_eq!(labels(&out), vec![("A", FINISHED)]);
        assert_eq!(s.channel().current(), 3.0);
    }

    #[test]
    fn negative_duration_finalizes_on_next_tick() {
        let mut s = dial();
        s.accept("A", &4.0, -50.0, 1.0);
        assert_eq!(labels(&s.tick(0.5)), vec![("A", FINISHED)]);
    }

    #[test]
    fn preempt_on_idle_is_noop() {
        let mut s = dial();
        assert!(s.preempt().is_none());
    }
}
