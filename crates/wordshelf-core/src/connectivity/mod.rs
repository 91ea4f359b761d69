//! Connectivity monitor
//!
//! Turns the platform's push-based reachability updates into a readable
//! snapshot plus `became-available` / `became-unavailable` transition events.
//! There is no polling and no retry logic here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Anything that can tell whether outbound calls are likely to succeed now
pub trait Connectivity: Send + Sync {
    fn is_connected(&self) -> bool;
}

/// Kind of link currently carrying traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionQuality {
    Wifi,
    Cellular,
    Other,
    #[default]
    None,
}

/// Transition between offline and online
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    BecameAvailable,
    BecameUnavailable,
}

/// Reachability verdict reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    Satisfied,
    Unsatisfied,
    /// A connection could be established on demand (e.g. VPN on demand)
    RequiresConnection,
}

/// Network interface kinds a path may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceKind {
    Wifi,
    Cellular,
    Wired,
    Loopback,
    Other,
}

/// One update from the platform's low-level reachability primitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathUpdate {
    pub status: PathStatus,
    /// Interfaces used by the path, in the platform's preference order
    pub interfaces: Vec<InterfaceKind>,
    /// Metered connection
    pub is_expensive: bool,
    /// Low-data mode
    pub is_constrained: bool,
}

impl PathUpdate {
    /// A satisfied path over the given interface
    pub fn online(interface: InterfaceKind) -> Self {
        Self {
            status: PathStatus::Satisfied,
            interfaces: vec![interface],
            is_expensive: matches!(interface, InterfaceKind::Cellular),
            is_constrained: false,
        }
    }

    /// An unsatisfied path
    pub const fn offline() -> Self {
        Self {
            status: PathStatus::Unsatisfied,
            interfaces: Vec::new(),
            is_expensive: false,
            is_constrained: false,
        }
    }
}

/// Derived connectivity state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectivitySnapshot {
    pub connected: bool,
    pub connection_quality: ConnectionQuality,
    pub is_expensive: bool,
    pub is_constrained: bool,
}

impl ConnectivitySnapshot {
    /// Recompute every field from a platform update
    pub fn from_path(update: &PathUpdate) -> Self {
        let connected = update.status == PathStatus::Satisfied;
        let connection_quality = if !connected {
            ConnectionQuality::None
        } else if update.interfaces.contains(&InterfaceKind::Wifi) {
            ConnectionQuality::Wifi
        } else if update.interfaces.contains(&InterfaceKind::Cellular) {
            ConnectionQuality::Cellular
        } else {
            ConnectionQuality::Other
        };

        Self {
            connected,
            connection_quality,
            is_expensive: connected && update.is_expensive,
            is_constrained: connected && update.is_constrained,
        }
    }
}

/// Observes reachability and publishes transitions
///
/// Starts offline until the first platform update arrives.
pub struct ConnectivityMonitor {
    state: watch::Sender<ConnectivitySnapshot>,
    events: broadcast::Sender<ConnectivityEvent>,
}

impl ConnectivityMonitor {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectivitySnapshot::default());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { state, events }
    }

    /// Apply one platform update, emitting an event if `connected` flipped
    pub fn apply_path_update(&self, update: &PathUpdate) -> Option<ConnectivityEvent> {
        let next = ConnectivitySnapshot::from_path(update);
        let previous = self.state.send_replace(next);

        let event = match (previous.connected, next.connected) {
            (false, true) => Some(ConnectivityEvent::BecameAvailable),
            (true, false) => Some(ConnectivityEvent::BecameUnavailable),
            _ => None,
        };

        if let Some(event) = event {
            tracing::info!(
                ?event,
                quality = ?next.connection_quality,
                "Connectivity changed"
            );
            // No subscribers is fine; the snapshot is still current
            let _ = self.events.send(event);
        } else if previous != next {
            tracing::debug!(quality = ?next.connection_quality, "Connection details changed");
        }

        event
    }

    /// Current state
    pub fn snapshot(&self) -> ConnectivitySnapshot {
        *self.state.borrow()
    }

    /// Transition events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.events.subscribe()
    }

    /// Every snapshot change, for UI bindings
    pub fn watch(&self) -> watch::Receiver<ConnectivitySnapshot> {
        self.state.subscribe()
    }

    /// Feed platform updates from a channel until it closes
    pub fn spawn_path_listener(
        monitor: Arc<Self>,
        mut updates: mpsc::Receiver<PathUpdate>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(update) = updates.recv().await {
                monitor.apply_path_update(&update);
            }
            tracing::debug!("Reachability source closed");
        })
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Connectivity for ConnectivityMonitor {
    fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }
}

/// Connectivity signal set explicitly by the caller
///
/// Used where no platform reachability source exists (the CLI, tests).
#[derive(Debug, Default)]
pub struct ManualConnectivity {
    connected: AtomicBool,
}

impl ManualConnectivity {
    pub const fn new(connected: bool) -> Self {
        Self {
            connected: AtomicBool::new(connected),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl Connectivity for ManualConnectivity {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn starts_offline() {
        let monitor = ConnectivityMonitor::new();
        assert!(!monitor.is_connected());
        assert_eq!(monitor.snapshot().connection_quality, ConnectionQuality::None);
    }

    #[test]
    fn emits_only_on_transitions() {
        let monitor = ConnectivityMonitor::new();
        let mut events = monitor.subscribe();

        assert_eq!(
            monitor.apply_path_update(&PathUpdate::online(InterfaceKind::Wifi)),
            Some(ConnectivityEvent::BecameAvailable)
        );
        // Switching interface while online is not a transition
        assert_eq!(
            monitor.apply_path_update(&PathUpdate::online(InterfaceKind::Cellular)),
            None
        );
        assert_eq!(
            monitor.apply_path_update(&PathUpdate::offline()),
            Some(ConnectivityEvent::BecameUnavailable)
        );
        assert_eq!(monitor.apply_path_update(&PathUpdate::offline()), None);

        assert_eq!(events.try_recv().unwrap(), ConnectivityEvent::BecameAvailable);
        assert_eq!(events.try_recv().unwrap(), ConnectivityEvent::BecameUnavailable);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn snapshot_tracks_quality_and_cost() {
        let monitor = ConnectivityMonitor::new();
        monitor.apply_path_update(&PathUpdate {
            status: PathStatus::Satisfied,
            interfaces: vec![InterfaceKind::Cellular],
            is_expensive: true,
            is_constrained: true,
        });

        assert_eq!(
            monitor.snapshot(),
            ConnectivitySnapshot {
                connected: true,
                connection_quality: ConnectionQuality::Cellular,
                is_expensive: true,
                is_constrained: true,
            }
        );
    }

    #[test]
    fn wired_and_requires_connection_paths() {
        let wired = ConnectivitySnapshot::from_path(&PathUpdate::online(InterfaceKind::Wired));
        assert_eq!(wired.connection_quality, ConnectionQuality::Other);

        let pending = ConnectivitySnapshot::from_path(&PathUpdate {
            status: PathStatus::RequiresConnection,
            interfaces: vec![InterfaceKind::Wifi],
            is_expensive: false,
            is_constrained: false,
        });
        assert!(!pending.connected);
        assert_eq!(pending.connection_quality, ConnectionQuality::None);
    }

    #[tokio::test]
    async fn path_listener_applies_channel_updates() {
        let monitor = Arc::new(ConnectivityMonitor::new());
        let mut state = monitor.watch();
        let (tx, rx) = mpsc::channel(4);
        let handle = ConnectivityMonitor::spawn_path_listener(Arc::clone(&monitor), rx);

        tx.send(PathUpdate::online(InterfaceKind::Wifi)).await.unwrap();
        state.changed().await.unwrap();
        assert!(state.borrow().connected);

        drop(tx);
        handle.await.unwrap();
        assert!(monitor.is_connected());
    }

    #[test]
    fn manual_connectivity_toggles() {
        let connectivity = ManualConnectivity::new(false);
        assert!(!connectivity.is_connected());
        connectivity.set_connected(true);
        assert!(connectivity.is_connected());
    }
}
