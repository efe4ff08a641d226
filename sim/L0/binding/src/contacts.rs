//! Per-step contact snapshots.

use hashbrown::HashMap;
use nalgebra::{Point3, Rotation3, UnitQuaternion, Vector3};

use crate::engine::EngineContact;

/// A contact between two named colliders.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Contact {
    /// World position.
    pub position: Point3<f64>,
    /// Contact frame; its x axis is the normal.
    pub orientation: UnitQuaternion<f64>,
    /// Unit normal, from the first collider towards the second.
    pub normal: Vector3<f64>,
    /// Penetration depth.
    pub depth: f64,
    /// First collider (or terrain slot) name.
    pub collider1: String,
    /// Second collider (or terrain slot) name.
    pub collider2: String,
}

impl Contact {
    /// Whether `name` is one of the two colliders.
    #[must_use]
    pub fn involves(&self, name: &str) -> bool {
        self.collider1 == name || self.collider2 == name
    }
}

/// Holds the contacts of the most recent step.
///
/// Contacts are not tracked across steps; every update replaces the whole
/// snapshot.
#[derive(Debug, Clone, Default)]
pub struct ContactManager {
    contacts: Vec<Contact>,
}

impl ContactManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot. Contacts touching a geometry without an owner
    /// (the implicit ground plane, engine-internal geometry) are dropped.
    pub fn update(&mut self, engine_contacts: &[EngineContact], owners: &HashMap<usize, String>) {
        self.contacts.clear();
        for contact in engine_contacts {
            let owner = |geom: Option<usize>| geom.and_then(|g| owners.get(&g));
            let (Some(first), Some(second)) = (owner(contact.geom1), owner(contact.geom2)) else {
                continue;
            };
            let rotation = Rotation3::from_matrix(&contact.frame.transpose());
            self.contacts.push(Contact {
                position: Point3::from(contact.position),
                orientation: UnitQuaternion::from_rotation_matrix(&rotation),
                normal: contact.frame.row(0).transpose(),
                depth: contact.depth,
                collider1: first.clone(),
                collider2: second.clone(),
            });
        }
    }

    /// Drop every contact.
    pub fn clear(&mut self) {
        self.contacts.clear();
    }

    /// Current snapshot.
    #[must_use]
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Contacts touching the named collider.
    pub fn involving<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Contact> + 'a {
        self.contacts.iter().filter(move |c| c.involves(name))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Matrix3;

    fn engine_contact(geom1: Option<usize>, geom2: Option<usize>) -> EngineContact {
        EngineContact {
            position: Vector3::new(0.0, 0.0, 0.1),
            frame: Matrix3::new(0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0),
            depth: 0.01,
            geom1,
            geom2,
        }
    }

    #[test]
    fn unnamed_geometry_is_dropped() {
        let owners: HashMap<usize, String> =
            [(1, "ball".to_owned()), (2, "crate".to_owned())].into_iter().collect();
        let mut manager = ContactManager::new();
        manager.update(
            &[
                engine_contact(Some(1), Some(2)),
                engine_contact(Some(0), Some(1)),
                engine_contact(None, Some(2)),
            ],
            &owners,
        );

        assert_eq!(manager.contacts().len(), 1);
        let contact = &manager.contacts()[0];
        assert_eq!((contact.collider1.as_str(), contact.collider2.as_str()), ("ball", "crate"));
        assert!(contact.involves("crate"));
        assert_eq!(manager.involving("ball").count(), 1);
    }

    #[test]
    fn frame_becomes_orientation() {
        let owners: HashMap<usize, String> =
            [(0, "a".to_owned()), (1, "b".to_owned())].into_iter().collect();
        let mut manager = ContactManager::new();
        manager.update(&[engine_contact(Some(0), Some(1))], &owners);
        let contact = &manager.contacts()[0];

        assert_relative_eq!(contact.normal, Vector3::z());
        assert_relative_eq!(contact.orientation * Vector3::x(), Vector3::z(), epsilon = 1e-9);
        assert_relative_eq!(contact.position, Point3::new(0.0, 0.0, 0.1));
    }

    #[test]
    fn update_replaces_snapshot() {
        let owners: HashMap<usize, String> =
            [(0, "a".to_owned()), (1, "b".to_owned())].into_iter().collect();
        let mut manager = ContactManager::new();
        manager.update(&[engine_contact(Some(0), Some(1))], &owners);
        manager.update(&[], &owners);
        assert!(manager.contacts().is_empty());
    }
}
