//! A headless stand-in for a rendering host.
//!
//! It owns the scroll position and plays the part of the browser: it reports measurements,
//! applies scroll commands and drives the realm's frames and timers.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use vgrid::{
    Dimensions, GridState, GridSystem, Realm, ScrollBehavior, ScrollContainerState,
    ScrollToOptions,
};

/// Duration of one simulated frame.
pub const FRAME: Duration = Duration::from_millis(16);

#[derive(Clone, Copy, Debug)]
enum Command {
    To(ScrollToOptions),
    By(ScrollToOptions),
}

pub struct Host {
    grid: GridSystem<String>,
    viewport: Dimensions,
    item: Dimensions,
    scroll_top: f64,
    commands: Arc<Mutex<Vec<Command>>>,
}

impl Host {
    pub fn new(grid: GridSystem<String>, viewport: Dimensions, item: Dimensions) -> Self {
        let commands = Arc::new(Mutex::new(Vec::new()));
        let sink = commands.clone();
        grid.realm().subscribe(grid.dom_io.scroll_to, move |_, options| {
            sink.lock().push(Command::To(*options));
        });
        let sink = commands.clone();
        grid.realm().subscribe(grid.dom_io.scroll_by, move |_, options| {
            sink.lock().push(Command::By(*options));
        });
        Self {
            grid,
            viewport,
            item,
            scroll_top: 0.0,
            commands,
        }
    }

    pub fn grid(&self) -> &GridSystem<String> {
        &self.grid
    }

    fn realm(&self) -> &Realm {
        self.grid.realm()
    }

    /// Reports the viewport, and the item size once something was rendered to measure.
    pub fn measure(&self) {
        let rendered = !self.grid.state().items.is_empty();
        let measured = self.realm().value(self.grid.item_dimensions).height > 0.0;
        self.realm().batch(|batch| {
            batch.publish(self.grid.viewport_dimensions, self.viewport);
            if rendered && !measured {
                batch.publish(self.grid.item_dimensions, self.item);
            }
        });
    }

    /// Content height as the host sees it. Unknown until the first layout.
    fn content_height(&self) -> f64 {
        self.realm().value(self.grid.total_list_height)
    }

    fn clamp(&self, top: f64) -> f64 {
        let content = self.content_height();
        let top = top.max(0.0);
        if content > 0.0 {
            top.min((content - self.viewport.height).max(0.0))
        } else {
            top
        }
    }

    fn report(&self) {
        self.realm().publish(
            self.grid.dom_io.scroll_container_state,
            ScrollContainerState {
                scroll_top: self.scroll_top,
                scroll_height: self.content_height(),
                viewport_height: self.viewport.height,
            },
        );
    }

    /// One rendering frame: pending scroll commands land, the position is reported and
    /// frame tasks run.
    pub fn frame(&mut self) {
        let commands: Vec<_> = self.commands.lock().drain(..).collect();
        let mut smooth = false;
        for command in commands {
            tracing::debug!(?command, "scroll command");
            let (top, options) = match command {
                Command::To(options) => (options.top, options),
                Command::By(options) => (self.scroll_top + options.top, options),
            };
            self.scroll_top = self.clamp(top);
            smooth |= options.behavior == ScrollBehavior::Smooth;
        }
        self.measure();
        self.report();
        if smooth {
            // Animations complete within the frame.
            self.realm()
                .publish(self.grid.dom_io.smooth_scroll_target_reached, ());
        }
        self.realm().advance_frame();
        self.realm().advance_time(FRAME);
    }

    /// Runs frames until no scroll command is left, at least two of them.
    pub fn settle(&mut self) {
        for frame in 0..16 {
            self.frame();
            if frame >= 1 && self.commands.lock().is_empty() {
                break;
            }
        }
    }

    /// User scroll by `delta` pixels, followed by one frame.
    pub fn scroll_by(&mut self, delta: f64) {
        self.scroll_top = self.clamp(self.scroll_top + delta);
        self.frame();
    }

    /// Lets every debounce and throttle run out.
    pub fn idle(&mut self, duration: Duration) {
        self.realm().advance_time(duration);
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    pub fn state(&self) -> GridState<String> {
        self.grid.state()
    }
}
