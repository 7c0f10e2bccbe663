//! Placeholder mode for fast scrolling.

use std::{fmt, sync::Arc};

use vgrid_reactive::{Realm, Signal, Stream};

use crate::{state_flags::StateFlags, types::ListRange};

/// Predicate over the current velocity and rendered range.
pub type SeekPredicate = Arc<dyn Fn(f64, ListRange) -> bool + Send + Sync>;
/// Callback invoked while seeking.
pub type SeekCallback = Arc<dyn Fn(f64, ListRange) + Send + Sync>;

/// When to swap real items for placeholders.
///
/// The closures run while the graph propagates: they must be pure and must not touch the
/// realm.
#[derive(Clone)]
pub struct ScrollSeekConfiguration {
    /// Decides whether to start seeking.
    pub enter: SeekPredicate,
    /// Decides whether to stop seeking.
    pub exit: SeekPredicate,
    /// Notified on every velocity or range change while seeking.
    pub change: Option<SeekCallback>,
}

impl ScrollSeekConfiguration {
    /// Enters above `enter_velocity` and exits below `exit_velocity`, both in absolute
    /// pixels per sample.
    pub fn velocity_thresholds(enter_velocity: f64, exit_velocity: f64) -> Self {
        Self {
            enter: Arc::new(move |velocity: f64, _: ListRange| velocity.abs() > enter_velocity),
            exit: Arc::new(move |velocity: f64, _: ListRange| velocity.abs() < exit_velocity),
            change: None,
        }
    }
}

impl fmt::Debug for ScrollSeekConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollSeekConfiguration")
            .field("change", &self.change.is_some())
            .finish_non_exhaustive()
    }
}

/// Scroll seek cells.
#[derive(Clone, Copy, Debug)]
pub struct ScrollSeek {
    /// Active configuration. `None` disables seeking.
    pub configuration: Signal<Option<ScrollSeekConfiguration>>,
    /// Whether placeholders should be rendered.
    pub is_seeking: Signal<bool>,
    /// Rendered range, fed by the grid.
    pub range_changed: Stream<ListRange>,
}

impl ScrollSeek {
    /// Wires seeking on top of the velocity in `flags`.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn new(realm: &Realm, flags: &StateFlags) -> Self {
        let configuration = realm.signal(None::<ScrollSeekConfiguration>);
        let range_changed = realm.stream::<ListRange>();
        let is_seeking = realm.signal(false);
        let latest_range = realm
            .pipe(range_changed)
            .signal(ListRange::default());

        realm
            .pipe(flags.scroll_velocity)
            .with_latest_all((configuration, is_seeking, latest_range))
            .map(|(velocity, (configuration, seeking, range))| {
                match configuration {
                    None => false,
                    Some(configuration) if *seeking => !(configuration.exit)(*velocity, *range),
                    Some(configuration) => (configuration.enter)(*velocity, *range),
                }
            })
            .distinct()
            .connect(is_seeking);

        realm
            .combine((is_seeking, flags.scroll_velocity, latest_range))
            .with_latest(configuration)
            .subscribe(|_, ((seeking, velocity, range), configuration)| {
                if !seeking {
                    return;
                }
                if let Some(change) = configuration.as_ref().and_then(|c| c.change.as_ref()) {
                    change(*velocity, *range);
                }
            });

        Self {
            configuration,
            is_seeking,
            range_changed,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;
    use crate::{dom_io::DomIo, types::ScrollContainerState};

    fn scroll(realm: &Realm, io: &DomIo, scroll_top: f64) {
        realm.publish(
            io.scroll_container_state,
            ScrollContainerState {
                scroll_top,
                scroll_height: 100_000.0,
                viewport_height: 300.0,
            },
        );
    }

    #[test]
    fn test_seeking_follows_velocity() {
        let realm = Realm::new();
        let io = DomIo::new(&realm);
        let flags = StateFlags::new(&realm, &io);
        let seek = ScrollSeek::new(&realm, &flags);

        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = changes.clone();
        let mut configuration = ScrollSeekConfiguration::velocity_thresholds(500.0, 50.0);
        configuration.change = Some(Arc::new(move |velocity: f64, _: ListRange| {
            sink.lock().push(velocity);
        }));
        realm.publish(seek.configuration, Some(configuration));

        scroll(&realm, &io, 0.0);
        for step in 1..=4 {
            scroll(&realm, &io, f64::from(step) * 1000.0);
            realm.advance_time(Duration::from_millis(50));
        }
        assert!(realm.value(seek.is_seeking));
        assert!(!changes.lock().is_empty());

        realm.advance_time(Duration::from_millis(300));
        assert!(!realm.value(seek.is_seeking));
    }

    #[test]
    fn test_without_configuration_never_seeks() {
        let realm = Realm::new();
        let io = DomIo::new(&realm);
        let flags = StateFlags::new(&realm, &io);
        let seek = ScrollSeek::new(&realm, &flags);

        scroll(&realm, &io, 0.0);
        for step in 1..=4 {
            scroll(&realm, &io, f64::from(step) * 1000.0);
            realm.advance_time(Duration::from_millis(50));
        }
        assert!(!realm.value(seek.is_seeking));
    }
}
