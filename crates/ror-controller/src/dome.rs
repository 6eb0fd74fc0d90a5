//! The higher-level dome abstraction the roof reports its park state to.

/// Park state and mount policy owned by the host.
///
/// Parked means the roof is closed; unparked means it is open.
pub trait Dome {
    /// Whether the dome currently believes the roof is parked.
    fn is_parked(&self) -> bool;

    /// Whether the mount parking policy forbids closing the roof.
    fn is_locked(&self) -> bool;

    /// Record the roof as parked or unparked.
    fn set_parked(&mut self, parked: bool);

    /// Forget the park state; the roof is somewhere between its limits.
    fn clear_park(&mut self);
}

/// An in-memory [`Dome`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParkState {
    parked: Option<bool>,
    mount_locked: bool,
}

impl ParkState {
    /// Create a park state, `None` meaning unknown.
    pub fn new(parked: Option<bool>) -> Self {
        ParkState {
            parked,
            mount_locked: false,
        }
    }

    /// The park state, `None` if unknown.
    pub fn parked(&self) -> Option<bool> {
        self.parked
    }

    /// Set whether the mount forbids closing the roof.
    pub fn set_mount_locked(&mut self, locked: bool) {
        self.mount_locked = locked;
    }
}

impl Dome for ParkState {
    fn is_parked(&self) -> bool {
        self.parked == Some(true)
    }

    fn is_locked(&self) -> bool {
        self.mount_locked
    }

    fn set_parked(&mut self, parked: bool) {
        self.parked = Some(parked);
    }

    fn clear_park(&mut self) {
        self.parked = None;
    }
}
