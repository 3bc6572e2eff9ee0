//! Predicate-based device selection.
//!
//! A [`Predicate`] is a small boolean expression over a device's group set,
//! composed with `and`/`or`/`not`. Selection never mutates the inventory; it
//! only narrows it to a [`DeviceSet`] view.

use std::sync::Arc;

use crate::error::FilterError;
use crate::inventory::{Device, Inventory};

/// Boolean predicate over a device's group memberships.
///
/// ```
/// use fleetrun::Predicate;
///
/// let p = Predicate::group("ios").and(Predicate::group("core").not());
/// ```
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Matches devices belonging to the named group.
    Group(String),

    /// Matches when both sides match.
    And(Box<Predicate>, Box<Predicate>),

    /// Matches when either side matches.
    Or(Box<Predicate>, Box<Predicate>),

    /// Inverts the inner predicate.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Predicate matching membership in `group`.
    pub fn group(group: impl Into<String>) -> Self {
        Self::Group(group.into())
    }

    /// Combine with another predicate, requiring both.
    pub fn and(self, other: Predicate) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Combine with another predicate, requiring either.
    pub fn or(self, other: Predicate) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Invert this predicate.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Evaluate against a single device.
    pub fn matches(&self, device: &Device) -> bool {
        match self {
            Self::Group(name) => device.has_group(name),
            Self::And(a, b) => a.matches(device) && b.matches(device),
            Self::Or(a, b) => a.matches(device) || b.matches(device),
            Self::Not(inner) => !inner.matches(device),
        }
    }

    /// Collect every group name the predicate mentions.
    fn referenced_groups<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Group(name) => out.push(name),
            Self::And(a, b) | Self::Or(a, b) => {
                a.referenced_groups(out);
                b.referenced_groups(out);
            }
            Self::Not(inner) => inner.referenced_groups(out),
        }
    }
}

/// An ordered view of selected devices, unique by name.
///
/// Owns no devices; it shares the inventory's `Arc`s.
#[derive(Debug, Clone, Default)]
pub struct DeviceSet {
    devices: Vec<Arc<Device>>,
}

impl DeviceSet {
    /// Iterate the selected devices in inventory order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Device>> {
        self.devices.iter()
    }

    /// Selected device names, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(|d| d.name.as_str())
    }

    /// Check whether a device is in the set.
    pub fn contains(&self, name: &str) -> bool {
        self.devices.iter().any(|d| d.name == name)
    }

    /// Number of selected devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// True if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Select the subset of `inventory` matching `predicate`.
///
/// An empty match is a valid empty set. A predicate naming a group the
/// inventory never declares is a [`FilterError`]: such a predicate can only
/// be a typo, and silently matching nothing would mask it.
pub fn select(inventory: &Inventory, predicate: &Predicate) -> Result<DeviceSet, FilterError> {
    let mut referenced = Vec::new();
    predicate.referenced_groups(&mut referenced);
    for group in referenced {
        if !inventory.has_group(group) {
            return Err(FilterError::UnknownGroup {
                group: group.to_string(),
            });
        }
    }

    let devices = inventory
        .all_devices()
        .filter(|d| predicate.matches(d))
        .cloned()
        .collect();

    Ok(DeviceSet { devices })
}
