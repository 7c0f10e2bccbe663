//! Deferred work driven by the host.
//!
//! The graph itself never waits. Anything that has to happen later is queued here and
//! runs when the host says so:
//!
//! - tick tasks run when the current turn ends ([`Realm::flush_ticks`]),
//! - frame tasks run on the next rendering frame ([`Realm::advance_frame`]),
//! - timers run once virtual time passes their deadline ([`Realm::advance_time`]).

use std::{
    collections::{BTreeMap, VecDeque},
    time::Duration,
};

use crate::Realm;

pub(crate) type Task = Box<dyn FnOnce(&Realm) + Send>;

#[derive(Default)]
pub(crate) struct Scheduler {
    now: Duration,
    ticks: VecDeque<Task>,
    frames: VecDeque<Task>,
    timers: BTreeMap<(Duration, u64), Task>,
    next_timer: u64,
}

impl Realm {
    /// Runs `task` at the end of the current scheduling tick.
    pub fn schedule_tick(&self, task: impl FnOnce(&Realm) + Send + 'static) {
        self.scheduler().lock().ticks.push_back(Box::new(task));
    }

    /// Runs `task` on the next rendering frame.
    pub fn schedule_frame(&self, task: impl FnOnce(&Realm) + Send + 'static) {
        self.scheduler().lock().frames.push_back(Box::new(task));
    }

    /// Runs `task` once virtual time has advanced by `delay`.
    pub fn schedule_after(&self, delay: Duration, task: impl FnOnce(&Realm) + Send + 'static) {
        let mut scheduler = self.scheduler().lock();
        scheduler.next_timer += 1;
        let key = (scheduler.now + delay, scheduler.next_timer);
        scheduler.timers.insert(key, Box::new(task));
    }

    /// Runs every queued tick task, including ones queued while flushing. Returns the
    /// number of tasks that ran.
    pub fn flush_ticks(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.scheduler().lock().ticks.pop_front();
            let Some(task) = task else {
                break;
            };
            task(self);
            ran += 1;
        }
        ran
    }

    /// Starts a new rendering frame: runs the tasks queued for it, then flushes ticks.
    /// Tasks queued for a frame while this one runs wait for the next call.
    pub fn advance_frame(&self) -> usize {
        let frame: Vec<Task> = self.scheduler().lock().frames.drain(..).collect();
        let mut ran = frame.len();
        for task in frame {
            task(self);
        }
        ran += self.flush_ticks();
        ran
    }

    /// Moves virtual time forward by `delta`, firing due timers in deadline order.
    pub fn advance_time(&self, delta: Duration) -> usize {
        let target = self.scheduler().lock().now + delta;
        let mut ran = self.flush_ticks();
        loop {
            let due = {
                let mut scheduler = self.scheduler().lock();
                let is_due = scheduler
                    .timers
                    .first_key_value()
                    .is_some_and(|((deadline, _), _)| *deadline <= target);
                if is_due {
                    match scheduler.timers.pop_first() {
                        Some(((deadline, _), task)) => {
                            scheduler.now = deadline;
                            Some(task)
                        }
                        None => None,
                    }
                } else {
                    None
                }
            };
            let Some(task) = due else {
                break;
            };
            task(self);
            ran += 1 + self.flush_ticks();
        }
        let mut scheduler = self.scheduler().lock();
        scheduler.now = scheduler.now.max(target);
        ran
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.scheduler().lock().now
    }

    /// Whether any tick, frame or timer task is waiting.
    pub fn has_pending_tasks(&self) -> bool {
        let scheduler = self.scheduler().lock();
        !scheduler.ticks.is_empty() || !scheduler.frames.is_empty() || !scheduler.timers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn test_ticks_run_in_order_including_nested() {
        let realm = Realm::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = log.clone();
        realm.schedule_tick(move |realm| {
            first.lock().push(1);
            let nested = first.clone();
            realm.schedule_tick(move |_| nested.lock().push(3));
        });
        let second = log.clone();
        realm.schedule_tick(move |_| second.lock().push(2));

        assert_eq!(realm.flush_ticks(), 3);
        assert_eq!(*log.lock(), vec![1, 2, 3]);
        assert!(!realm.has_pending_tasks());
    }

    #[test]
    fn test_frame_tasks_wait_for_frame() {
        let realm = Realm::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        realm.schedule_frame(move |realm| {
            sink.lock().push("frame");
            let next = sink.clone();
            realm.schedule_frame(move |_| next.lock().push("next frame"));
        });

        realm.flush_ticks();
        assert!(log.lock().is_empty());
        realm.advance_frame();
        assert_eq!(*log.lock(), vec!["frame"]);
        realm.advance_frame();
        assert_eq!(*log.lock(), vec!["frame", "next frame"]);
    }

    #[test]
    fn test_timers_fire_by_deadline() {
        let realm = Realm::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for (delay, tag) in [(30, "c"), (10, "a"), (20, "b")] {
            let sink = log.clone();
            realm.schedule_after(Duration::from_millis(delay), move |realm| {
                sink.lock().push((tag, realm.now()));
            });
        }

        realm.advance_time(Duration::from_millis(15));
        assert_eq!(*log.lock(), vec![("a", Duration::from_millis(10))]);
        assert_eq!(realm.now(), Duration::from_millis(15));

        realm.advance_time(Duration::from_millis(100));
        let tags: Vec<_> = log.lock().iter().map(|(tag, _)| *tag).collect();
        assert_eq!(tags, vec!["a", "b", "c"]);
        assert_eq!(realm.now(), Duration::from_millis(115));
    }
}
