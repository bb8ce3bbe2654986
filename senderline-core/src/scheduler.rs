//! Cooperative single-threaded event loop
//!
//! Every pipeline step is a [`Periodic`] task registered with a fixed
//! period. [`EventLoop::tick`] runs each task whose deadline has passed,
//! once, in registration order, then returns. Nothing inside a task blocks
//! and nothing can preempt it, so a task sees the state every earlier task
//! left behind.
//!
//! ```text
//! tick(now) ─▶ [task 0 due?] ─▶ [task 1 due?] ─▶ ... ─▶ return ran
//! ```
//!
//! A task that falls behind by more than one period is rescheduled from
//! `now`, not replayed: sensors want the current value, not a backlog.
//! There is no cancellation; tasks live as long as the loop.

use alloc::{boxed::Box, vec::Vec};
use fugit::MillisDurationU32;

use crate::time::{TimeSource, Timestamp};

/// Task run by the [`EventLoop`] at a fixed period
pub trait Periodic {
    /// Repeat period
    fn period(&self) -> MillisDurationU32;

    /// Do one round of work
    fn run(&mut self, now: Timestamp);

    /// Name for logs
    fn name(&self) -> &'static str {
        "task"
    }
}

/// Closure task created by [`EventLoop::on_repeat_fn`]
pub struct RepeatFn<F> {
    name: &'static str,
    period: MillisDurationU32,
    f: F,
}

impl<F> RepeatFn<F>
where
    F: FnMut(Timestamp),
{
    /// Wrap a closure as a task
    pub fn new(name: &'static str, period_ms: u32, f: F) -> Self {
        Self {
            name,
            period: MillisDurationU32::millis(period_ms),
            f,
        }
    }
}

impl<F> Periodic for RepeatFn<F>
where
    F: FnMut(Timestamp),
{
    fn period(&self) -> MillisDurationU32 {
        self.period
    }

    fn run(&mut self, now: Timestamp) {
        (self.f)(now)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

struct Slot {
    task: Box<dyn Periodic>,
    due: Timestamp,
    runs: u64,
}

/// Registration-ordered periodic scheduler
#[derive(Default)]
pub struct EventLoop {
    slots: Vec<Slot>,
}

impl EventLoop {
    /// Empty loop
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task; its first run is one period after `now`
    pub fn on_repeat<T>(&mut self, task: T, now: Timestamp) -> usize
    where
        T: Periodic + 'static,
    {
        let due = now.saturating_add(u64::from(task.period().to_millis()));
        log_debug!(
            "Registered {} every {} ms",
            task.name(),
            task.period().to_millis()
        );
        self.slots.push(Slot {
            task: Box::new(task),
            due,
            runs: 0,
        });
        self.slots.len() - 1
    }

    /// Register a closure as a task
    pub fn on_repeat_fn<F>(&mut self, name: &'static str, period_ms: u32, now: Timestamp, f: F) -> usize
    where
        F: FnMut(Timestamp) + 'static,
    {
        self.on_repeat(RepeatFn::new(name, period_ms, f), now)
    }

    /// Run every due task once, in registration order
    ///
    /// Returns the number of tasks that ran.
    pub fn tick(&mut self, now: Timestamp) -> usize {
        let mut ran = 0;
        for slot in self.slots.iter_mut() {
            if now < slot.due {
                continue;
            }

            slot.task.run(now);
            slot.runs = slot.runs.saturating_add(1);
            ran += 1;

            let period = u64::from(slot.task.period().to_millis()).max(1);
            slot.due = slot.due.saturating_add(period);
            if slot.due <= now {
                slot.due = now.saturating_add(period);
            }
        }
        ran
    }

    /// Tick against a clock
    pub fn tick_with(&mut self, clock: &dyn TimeSource) -> usize {
        self.tick(clock.now())
    }

    /// Earliest upcoming deadline, if any task is registered
    pub fn next_due(&self) -> Option<Timestamp> {
        self.slots.iter().map(|slot| slot.due).min()
    }

    /// How often the task registered at `index` has run
    pub fn run_count(&self, index: usize) -> Option<u64> {
        self.slots.get(index).map(|slot| slot.runs)
    }

    /// Number of registered tasks
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no task is registered
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
