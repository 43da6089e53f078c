//! Animation scheduler
//!
//! One frame-driven run loop advancing any number of time-bounded tasks.
//! Every task keeps its own clock (start + duration), so tasks finishing
//! never shift the timing of the others. The loop asks the platform for a
//! frame only while at least one task is in flight.
//!
//! Callbacks get a [`Frame`]: mutable access to the caller's context `C`
//! plus a queue for scheduling follow-up tasks. Queued tasks join the
//! scheduler after the current tick and are first advanced on the next one.

use crate::data::MarkerId;
use crate::easing::Easing;

/// Timestamps and durations, in milliseconds
pub type Millis = f64;

/// Platform hook for "call tick again on the next display refresh"
pub trait FrameRequester {
    fn request_frame(&mut self);
}

type UpdateFn<C> = Box<dyn FnMut(f64, &mut Frame<'_, C>)>;
type CompleteFn<C> = Box<dyn FnOnce(&mut Frame<'_, C>)>;

/// What a task callback can touch during a tick
pub struct Frame<'a, C> {
    pub now: Millis,
    pub ctx: &'a mut C,
    pub queue: &'a mut TaskQueue<C>,
}

/// Tasks scheduled from inside a tick
pub struct TaskQueue<C> {
    tasks: Vec<AnimationTask<C>>,
}

impl<C> Default for TaskQueue<C> {
    fn default() -> Self {
        Self { tasks: Vec::new() }
    }
}

impl<C> TaskQueue<C> {
    pub fn push(&mut self, task: AnimationTask<C>) {
        self.tasks.push(task);
    }
}

/// One in-flight, time-bounded effect
pub struct AnimationTask<C> {
    key: Option<MarkerId>,
    start: Millis,
    duration: Millis,
    easing: Easing,
    update: UpdateFn<C>,
    complete: Option<CompleteFn<C>>,
}

impl<C> AnimationTask<C> {
    pub fn new(start: Millis, duration: Millis, easing: Easing) -> Self {
        Self {
            key: None,
            start,
            duration,
            easing,
            update: Box::new(|_, _| {}),
            complete: None,
        }
    }

    /// Entity this task animates
    pub fn keyed(mut self, key: MarkerId) -> Self {
        self.key = Some(key);
        self
    }

    pub fn on_update<F>(mut self, f: F) -> Self
    where
        F: FnMut(f64, &mut Frame<'_, C>) + 'static,
    {
        self.update = Box::new(f);
        self
    }

    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut Frame<'_, C>) + 'static,
    {
        self.complete = Some(Box::new(f));
        self
    }

    pub fn key(&self) -> Option<&MarkerId> {
        self.key.as_ref()
    }

    /// Progress clamped to [0, 1]; non-positive durations are already done
    pub fn local_progress(&self, now: Millis) -> f64 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((now - self.start) / self.duration).clamp(0.0, 1.0)
    }
}

pub struct Scheduler<C> {
    tasks: Vec<AnimationTask<C>>,
    running: bool,
    frames: Box<dyn FrameRequester>,
}

impl<C> Scheduler<C> {
    pub fn new(frames: Box<dyn FrameRequester>) -> Self {
        Self {
            tasks: Vec::new(),
            running: false,
            frames,
        }
    }

    /// Register a task, starting the frame loop if it was idle
    pub fn schedule(&mut self, task: AnimationTask<C>) {
        if let Some(key) = task.key() {
            if self.is_animating(key) {
                tracing::warn!("Marker '{}' already has an animation in flight", key);
            }
        }
        self.tasks.push(task);
        if !self.running {
            self.running = true;
            self.frames.request_frame();
        }
    }

    /// Advance every task to `now`; called from the platform frame callback
    pub fn tick(&mut self, now: Millis, ctx: &mut C) {
        let mut queue = TaskQueue::default();
        let tasks = std::mem::take(&mut self.tasks);
        let mut remaining = Vec::with_capacity(tasks.len());

        for mut task in tasks {
            let progress = task.local_progress(now);
            let mut frame = Frame {
                now,
                ctx: &mut *ctx,
                queue: &mut queue,
            };
            (task.update)((task.easing)(progress), &mut frame);

            if progress >= 1.0 {
                if let Some(complete) = task.complete.take() {
                    complete(&mut frame);
                }
            } else {
                remaining.push(task);
            }
        }

        remaining.append(&mut queue.tasks);
        self.tasks = remaining;

        if self.tasks.is_empty() {
            self.running = false;
        } else {
            self.running = true;
            self.frames.request_frame();
        }
    }

    /// Whether any task is still in flight
    pub fn is_active(&self) -> bool {
        !self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn is_animating(&self, key: &MarkerId) -> bool {
        self.tasks.iter().any(|t| t.key() == Some(key))
    }
}
