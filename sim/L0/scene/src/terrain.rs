//! Procedurally streamed terrain.
//!
//! A [`TerrainGenerator`] emits box primitives over time and takes them back
//! once the binding layer needs their engine slot for something newer. The
//! generator owns primitive geometry; the binding layer only mirrors it into
//! a fixed set of engine bodies.

use std::collections::BTreeMap;

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::pose::Pose;

/// Handle of a primitive inside its generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrimitiveId(pub u64);

impl std::fmt::Display for PrimitiveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Primitive({})", self.0)
    }
}

/// Geometry of one terrain box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TerrainPrimitive {
    /// World pose of the box center.
    pub pose: Pose,
    /// Full extents (width, depth, thickness).
    pub size: Vector3<f64>,
    /// Bounding-sphere radius used by the engine's broad phase.
    pub rbound: f64,
}

impl TerrainPrimitive {
    /// Box primitive with a bounding radius derived from its extents.
    #[must_use]
    pub fn new(pose: Pose, size: Vector3<f64>) -> Self {
        Self {
            pose,
            size,
            rbound: 0.5 * size.norm(),
        }
    }
}

/// Source of streamed terrain primitives.
pub trait TerrainGenerator: std::fmt::Debug {
    /// Generator name; engine slot names derive from it.
    fn name(&self) -> &str;

    /// Take the primitives created since the previous call, oldest first.
    fn drain_created(&mut self) -> Vec<PrimitiveId>;

    /// The engine slot backing `id` was reassigned; `id` may be reused.
    fn recycle(&mut self, id: PrimitiveId);

    /// Current geometry of a live primitive.
    fn primitive(&self, id: PrimitiveId) -> Option<&TerrainPrimitive>;

    /// Advance to simulation time `time`. Called once per frame before the
    /// binding layer collects new primitives.
    fn update(&mut self, _time: f64) {}
}

/// Timed change applied by [`ScriptedTerrainGenerator::update`].
#[derive(Debug, Clone, Copy, PartialEq)]
enum ScriptEvent {
    Spawn(PrimitiveId, TerrainPrimitive),
    Remove(PrimitiveId),
}

/// Generator driven explicitly by the caller.
///
/// Useful for deterministic scenarios and tests: every [`spawn`] call
/// creates one primitive, and recycled ids are recorded in order. Changes
/// can also be [`schedule`]d for a simulation time; they apply in time
/// order once [`update`](TerrainGenerator::update) reaches it.
///
/// [`spawn`]: ScriptedTerrainGenerator::spawn
/// [`schedule`]: ScriptedTerrainGenerator::schedule
#[derive(Debug, Clone, Default)]
pub struct ScriptedTerrainGenerator {
    name: String,
    next_id: u64,
    live: BTreeMap<PrimitiveId, TerrainPrimitive>,
    created: Vec<PrimitiveId>,
    recycled: Vec<PrimitiveId>,
    script: Vec<(f64, ScriptEvent)>,
}

impl ScriptedTerrainGenerator {
    /// Create an empty generator.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn next_id(&mut self) -> PrimitiveId {
        let id = PrimitiveId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Emit a new primitive.
    pub fn spawn(&mut self, primitive: TerrainPrimitive) -> PrimitiveId {
        let id = self.next_id();
        self.live.insert(id, primitive);
        self.created.push(id);
        id
    }

    /// Emit `primitive` once the simulation reaches `at`. The id is reserved
    /// now.
    pub fn schedule(&mut self, at: f64, primitive: TerrainPrimitive) -> PrimitiveId {
        let id = self.next_id();
        self.script.push((at, ScriptEvent::Spawn(id, primitive)));
        id
    }

    /// Drop `id` once the simulation reaches `at`.
    pub fn schedule_removal(&mut self, at: f64, id: PrimitiveId) {
        self.script.push((at, ScriptEvent::Remove(id)));
    }

    /// Drop a live primitive without recycling it. Its engine slot is
    /// released at the next collection.
    pub fn remove(&mut self, id: PrimitiveId) -> Option<TerrainPrimitive> {
        self.live.remove(&id)
    }

    /// Number of scheduled changes not yet applied.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.script.len()
    }

    /// Move a live primitive. Returns `false` if `id` is not live.
    pub fn set_pose(&mut self, id: PrimitiveId, pose: Pose) -> bool {
        match self.live.get_mut(&id) {
            Some(primitive) => {
                primitive.pose = pose;
                true
            }
            None => false,
        }
    }

    /// Ids handed back through [`TerrainGenerator::recycle`], in order.
    #[must_use]
    pub fn recycled(&self) -> &[PrimitiveId] {
        &self.recycled
    }

    /// Number of live primitives.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl TerrainGenerator for ScriptedTerrainGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn drain_created(&mut self) -> Vec<PrimitiveId> {
        std::mem::take(&mut self.created)
    }

    fn recycle(&mut self, id: PrimitiveId) {
        self.live.remove(&id);
        self.recycled.push(id);
    }

    fn primitive(&self, id: PrimitiveId) -> Option<&TerrainPrimitive> {
        self.live.get(&id)
    }

    fn update(&mut self, time: f64) {
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.script)
            .into_iter()
            .partition(|(at, _)| *at <= time);
        self.script = pending;
        due.sort_by(|a, b| a.0.total_cmp(&b.0));

        for (_, event) in due {
            match event {
                ScriptEvent::Spawn(id, primitive) => {
                    self.live.insert(id, primitive);
                    self.created.push(id);
                }
                ScriptEvent::Remove(id) => {
                    self.live.remove(&id);
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn slab(x: f64) -> TerrainPrimitive {
        TerrainPrimitive::new(
            Pose::from_position(Point3::new(x, 0.0, 0.0)),
            Vector3::new(0.5, 2.0, 0.025),
        )
    }

    #[test]
    fn drain_returns_creation_order_once() {
        let mut generator = ScriptedTerrainGenerator::new("path");
        let a = generator.spawn(slab(0.0));
        let b = generator.spawn(slab(1.0));

        assert_eq!(generator.drain_created(), vec![a, b]);
        assert!(generator.drain_created().is_empty());
    }

    #[test]
    fn scheduled_changes_apply_in_time_order() {
        let mut generator = ScriptedTerrainGenerator::new("path");
        let late = generator.schedule(0.5, slab(2.0));
        let early = generator.schedule(0.1, slab(1.0));
        generator.schedule_removal(0.3, early);

        generator.update(0.0);
        assert!(generator.drain_created().is_empty());
        assert_eq!(generator.pending(), 3);

        generator.update(0.2);
        assert_eq!(generator.drain_created(), vec![early]);
        assert!(generator.primitive(early).is_some());

        generator.update(1.0);
        assert_eq!(generator.drain_created(), vec![late]);
        assert!(generator.primitive(early).is_none());
        assert_eq!(generator.pending(), 0);
        assert!(generator.recycled().is_empty());
    }

    #[test]
    fn recycle_drops_primitive() {
        let mut generator = ScriptedTerrainGenerator::new("path");
        let a = generator.spawn(slab(0.0));
        generator.recycle(a);

        assert!(generator.primitive(a).is_none());
        assert_eq!(generator.recycled(), &[a]);
        assert_eq!(generator.live_count(), 0);
    }
}
