//! Mount gate: nothing that depends on props runs before the host applied them once.

use vgrid_reactive::{Realm, Signal, Stream};

/// Mount state cells.
#[derive(Clone, Copy, Debug)]
pub struct PropsReady {
    /// Raised by the host once every prop was published.
    pub props_ready: Signal<bool>,
    /// Fires once, the first time `props_ready` turns true.
    pub did_mount: Stream<()>,
}

impl PropsReady {
    /// Creates the gate in `realm`.
    #[tracing::instrument(level = "debug", skip(realm))]
    pub fn new(realm: &Realm) -> Self {
        let props_ready = realm.signal(false);
        let did_mount = realm
            .pipe(props_ready)
            .filter(|ready| *ready)
            .map_to(())
            .distinct()
            .stream();
        realm.subscribe(did_mount, |_, _| tracing::debug!("grid mounted"));
        Self {
            props_ready,
            did_mount,
        }
    }
}
