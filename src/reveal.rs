//! Reveal sequencer
//!
//! Plays the chronological reveal: markers flip from dormant to revealed in
//! order of their first visit, each with a short pop-in, while the counter
//! tracks how many are revealed.
//!
//! Two tracks share one [`Scheduler`]:
//! - the outer timeline, eased with a cubic ease-in, maps progress to
//!   `target = floor(eased * total)` and reveals `[last, target)` each frame
//! - one pop-in task per revealed marker, scheduled from inside the frame
//!   that revealed it, which scales the marker about its own position and
//!   resets it to identity when done
//!
//! The last frame runs at eased progress 1, so the tail of the order pops in
//! like everything before it. Completion then pins the counter to the exact
//! total and reveals, without animation, anything the timeline missed.

use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};

use crate::config::RevealConfig;
use crate::data::{DateError, Marker, MarkerId, Point, Visit};
use crate::easing::{ease_in_cubic, elastic_out};
use crate::scheduler::{AnimationTask, Frame, FrameRequester, Millis, Scheduler, TaskQueue};
use crate::surface::{CounterSink, RenderSurface, Transform, Treatment};

/// A marker's place in the reveal order
#[derive(Debug, Clone, PartialEq)]
pub struct RevealEntry {
    pub id: MarkerId,
    pub first_visit: NaiveDateTime,
}

/// Markers ordered by first visit, earliest first
#[derive(Debug, Clone, Default)]
pub struct RevealOrder {
    pub entries: Vec<RevealEntry>,
    /// Visits whose date could not be parsed; left out of the order
    pub rejected: Vec<DateError>,
}

impl RevealOrder {
    /// Each marker appears once, at its earliest visit. Ties keep input order.
    /// Visits to markers `is_placed` rejects are skipped.
    pub fn from_visits<F>(visits: &[Visit], is_placed: F) -> Self
    where
        F: Fn(&MarkerId) -> bool,
    {
        let mut earliest: HashMap<&MarkerId, (NaiveDateTime, usize)> = HashMap::new();
        let mut rejected = Vec::new();

        for (index, visit) in visits.iter().enumerate() {
            let ts = match visit.timestamp() {
                Ok(ts) => ts,
                Err(e) => {
                    rejected.push(e);
                    continue;
                }
            };
            if !is_placed(&visit.marker_id) {
                tracing::debug!("Visit to unplaced marker '{}' skipped", visit.marker_id);
                continue;
            }
            earliest
                .entry(&visit.marker_id)
                .and_modify(|slot| {
                    if ts < slot.0 {
                        *slot = (ts, index);
                    }
                })
                .or_insert((ts, index));
        }

        let mut ranked: Vec<(&MarkerId, NaiveDateTime, usize)> =
            earliest.into_iter().map(|(id, (ts, index))| (id, ts, index)).collect();
        ranked.sort_by(|a, b| a.1.cmp(&b.1).then(a.2.cmp(&b.2)));

        Self {
            entries: ranked
                .into_iter()
                .map(|(id, first_visit, _)| RevealEntry {
                    id: id.clone(),
                    first_visit,
                })
                .collect(),
            rejected,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &MarkerId> {
        self.entries.iter().map(|e| &e.id)
    }

    /// Copy first-visit dates onto the laid-out markers
    pub fn annotate(&self, markers: &mut [Marker]) {
        let dates: HashMap<&MarkerId, NaiveDateTime> =
            self.entries.iter().map(|e| (&e.id, e.first_visit)).collect();
        for marker in markers.iter_mut() {
            marker.first_visit = dates.get(marker.id()).copied();
        }
    }
}

/// State the reveal's tasks mutate: surface, counter and the reveal cursor
pub struct RevealStage<S, K> {
    surface: S,
    counter: K,
    order: Vec<(MarkerId, Point)>,
    last_revealed: usize,
    pop_in_ms: Millis,
    finished: bool,
}

impl<S, K> RevealStage<S, K>
where
    S: RenderSurface + 'static,
    K: CounterSink + 'static,
{
    /// Reveal everything up to `eased` of the order, scheduling pop-ins
    fn advance(&mut self, eased: f64, now: Millis, queue: &mut TaskQueue<Self>) {
        let total = self.order.len();
        let target = ((eased.max(0.0) * total as f64).floor() as usize).min(total);

        for index in self.last_revealed..target {
            let (id, origin) = self.order[index].clone();
            self.surface.set_treatment(&id, Treatment::Revealed);
            queue.push(pop_in(id, origin, now, self.pop_in_ms));
        }
        if target > self.last_revealed {
            self.last_revealed = target;
            self.counter.set_count(target);
        }
    }

    /// Force-reveal whatever is left and pin the counter to the total
    fn finalize(&mut self) {
        let total = self.order.len();
        for (id, _) in &self.order[self.last_revealed..] {
            self.surface.set_treatment(id, Treatment::Revealed);
        }
        if self.last_revealed < total {
            tracing::debug!("Finalization revealed {} pending markers", total - self.last_revealed);
        }
        self.last_revealed = total;
        self.counter.set_count(total);
        self.counter.mark_complete();
        self.finished = true;
        tracing::info!("Reveal complete: {} markers", total);
    }
}

fn pop_in<S, K>(id: MarkerId, origin: Point, now: Millis, duration: Millis) -> AnimationTask<RevealStage<S, K>>
where
    S: RenderSurface + 'static,
    K: CounterSink + 'static,
{
    let done = id.clone();
    AnimationTask::new(now, duration, elastic_out)
        .keyed(id.clone())
        .on_update(move |scale, frame: &mut Frame<'_, RevealStage<S, K>>| {
            frame.ctx.surface.set_transform(&id, Some(Transform { scale, origin }));
        })
        .on_complete(move |frame: &mut Frame<'_, RevealStage<S, K>>| {
            frame.ctx.surface.set_transform(&done, None);
        })
}

pub struct RevealSequencer<S, K> {
    scheduler: Scheduler<RevealStage<S, K>>,
    stage: RevealStage<S, K>,
    duration_ms: Millis,
    started: bool,
}

impl<S, K> RevealSequencer<S, K>
where
    S: RenderSurface + 'static,
    K: CounterSink + 'static,
{
    /// `positions` gives each marker's adjusted position, the pop-in origin
    pub fn new(
        config: &RevealConfig,
        order: &RevealOrder,
        positions: &HashMap<MarkerId, Point>,
        surface: S,
        counter: K,
        frames: Box<dyn FrameRequester>,
    ) -> Self {
        let order = order
            .ids()
            .filter_map(|id| positions.get(id).map(|p| (id.clone(), *p)))
            .collect();

        Self {
            scheduler: Scheduler::new(frames),
            stage: RevealStage {
                surface,
                counter,
                order,
                last_revealed: 0,
                pop_in_ms: config.pop_in_ms,
                finished: false,
            },
            duration_ms: config.duration_ms,
            started: false,
        }
    }

    /// Begin playback at `now`. An empty order finishes immediately.
    pub fn start(&mut self, now: Millis) {
        if self.started {
            return;
        }
        self.started = true;
        self.stage.counter.set_count(0);

        if self.stage.order.is_empty() {
            tracing::info!("Nothing to reveal");
            self.stage.counter.mark_complete();
            self.stage.finished = true;
            return;
        }

        tracing::info!(
            "Revealing {} markers over {} ms",
            self.stage.order.len(),
            self.duration_ms
        );
        let timeline = AnimationTask::new(now, self.duration_ms, ease_in_cubic)
            .on_update(|eased, frame: &mut Frame<'_, RevealStage<S, K>>| {
                let now = frame.now;
                frame.ctx.advance(eased, now, &mut *frame.queue);
            })
            .on_complete(|frame: &mut Frame<'_, RevealStage<S, K>>| frame.ctx.finalize());
        self.scheduler.schedule(timeline);
    }

    /// Platform frame callback
    pub fn on_frame(&mut self, now: Millis) {
        self.scheduler.tick(now, &mut self.stage);
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Any timeline or pop-in still running
    pub fn is_active(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn is_finished(&self) -> bool {
        self.stage.finished
    }

    pub fn revealed_count(&self) -> usize {
        self.stage.last_revealed
    }

    pub fn total(&self) -> usize {
        self.stage.order.len()
    }

    pub fn is_revealed(&self, id: &MarkerId) -> bool {
        self.stage.order[..self.stage.last_revealed].iter().any(|(r, _)| r == id)
    }

    pub fn surface(&self) -> &S {
        &self.stage.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.stage.surface
    }

    pub fn counter(&self) -> &K {
        &self.stage.counter
    }

}

/// How an image load ended; both count as settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    Loaded,
    Failed,
}

/// Holds the reveal back until every marker image has settled
#[derive(Debug, Default)]
pub struct SettleGate {
    pending: HashSet<MarkerId>,
    failed: usize,
}

impl SettleGate {
    pub fn new<I: IntoIterator<Item = MarkerId>>(ids: I) -> Self {
        Self {
            pending: ids.into_iter().collect(),
            failed: 0,
        }
    }

    /// Record a settle event; returns whether the gate is now open
    pub fn settle(&mut self, id: &MarkerId, outcome: Settle) -> bool {
        if self.pending.remove(id) && outcome == Settle::Failed {
            self.failed += 1;
            tracing::debug!("Image for '{}' failed to load", id);
        }
        self.is_open()
    }

    pub fn is_open(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn failed(&self) -> usize {
        self.failed
    }
}
