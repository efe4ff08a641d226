//! Terrain primitive pool.
//!
//! Streaming terrain cannot add engine bodies after bind, so every generator
//! gets a fixed number of box slots in the composed description. Slots cycle
//! between two FIFO queues: `available` (parked, empty) and `working`
//! (occupied, in assignment order). When a new primitive arrives and nothing
//! is available, the oldest working slot is evicted and its occupant handed
//! back to the generator for recycling; creation is never blocked.

use std::collections::VecDeque;

use nalgebra::{UnitQuaternion, Vector3};
use sim_scene::{PrimitiveId, ShapeKind, TerrainGenerator};
use tracing::{debug, warn};

use crate::engine::{ElementKind, PhysicsEngine};
use crate::error::BindingError;
use crate::resource::{ResourceElement, tags};
use crate::shape::engine_size_padded;

/// Full extents of a parked slot box.
pub const SLOT_EXTENTS: [f64; 3] = [0.5, 2.0, 0.025];

/// Height of the first parked slot.
pub const PARK_HEIGHT: f64 = 100.0;

/// Engine name of slot `index` of `generator`. Body and geometry share it.
#[must_use]
pub fn slot_name(generator: &str, index: usize) -> String {
    format!("terrainGen_{generator}_{index}")
}

/// Parking position of slot `index`, stacked clear of each other.
#[must_use]
pub fn park_position(index: usize) -> Vector3<f64> {
    #[allow(clippy::cast_precision_loss)]
    let offset = index as f64 * (SLOT_EXTENTS[2] + 1.0);
    Vector3::new(0.0, 0.0, PARK_HEIGHT + offset)
}

/// Slot body element: one box geometry that is only collided against.
#[must_use]
pub fn slot_element(name: &str, index: usize) -> ResourceElement {
    let half = Vector3::from(SLOT_EXTENTS) * 0.5;
    let geom = ResourceElement::new(tags::GEOM)
        .with("name", name)
        .with("type", "box")
        .with("size", half)
        .with("contype", 0_i32)
        .with("conaffinity", 1_i32);
    ResourceElement::new(tags::BODY)
        .with("name", name)
        .with("pos", park_position(index))
        .with_child(geom)
}

/// One pre-allocated engine slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainSlot {
    /// Engine name of the slot body and geometry.
    pub name: String,
    /// Resolved body index.
    pub body: Option<usize>,
    /// Resolved geometry index.
    pub geom: Option<usize>,
    /// Current occupant.
    pub occupant: Option<PrimitiveId>,
}

/// Fixed-capacity slot pool for one terrain generator.
#[derive(Debug, Clone)]
pub struct TerrainPool {
    generator: String,
    slots: Vec<TerrainSlot>,
    available: VecDeque<usize>,
    working: VecDeque<usize>,
    released: Vec<usize>,
}

impl TerrainPool {
    /// Pool over the named slots, all available.
    #[must_use]
    pub fn new(generator: impl Into<String>, names: impl IntoIterator<Item = String>) -> Self {
        let slots: Vec<TerrainSlot> = names
            .into_iter()
            .map(|name| TerrainSlot {
                name,
                body: None,
                geom: None,
                occupant: None,
            })
            .collect();
        Self {
            generator: generator.into(),
            available: (0..slots.len()).collect(),
            working: VecDeque::new(),
            released: Vec::new(),
            slots,
        }
    }

    /// Resolve every slot against a compiled model. Slots that fail to
    /// resolve are withheld from the available queue and reported.
    pub fn resolve<E: PhysicsEngine>(
        engine: &E,
        model: &E::Model,
        generator: &str,
        names: &[String],
    ) -> (Self, Vec<BindingError>) {
        let mut pool = Self::new(generator, names.iter().cloned());
        let mut errors = Vec::new();
        pool.available.clear();

        for (index, slot) in pool.slots.iter_mut().enumerate() {
            slot.body = engine.name_to_index(model, ElementKind::Body, &slot.name);
            slot.geom = engine.name_to_index(model, ElementKind::Geom, &slot.name);
            if slot.body.is_some() && slot.geom.is_some() {
                pool.available.push_back(index);
            } else {
                warn!(slot = %slot.name, "terrain slot not found in compiled model");
                errors.push(BindingError::bind(&slot.name, "terrain slot not found"));
            }
        }
        (pool, errors)
    }

    /// Generator this pool serves.
    #[must_use]
    pub fn generator(&self) -> &str {
        &self.generator
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// All slots in index order.
    #[must_use]
    pub fn slots(&self) -> &[TerrainSlot] {
        &self.slots
    }

    /// Number of empty slots ready for assignment.
    #[must_use]
    pub fn available_len(&self) -> usize {
        self.available.len()
    }

    /// Occupants of working slots, oldest first.
    #[must_use]
    pub fn working_occupants(&self) -> Vec<PrimitiveId> {
        self.working
            .iter()
            .filter_map(|&slot| self.slots[slot].occupant)
            .collect()
    }

    /// Give `id` a slot. Returns the primitive that must be recycled: the
    /// evicted occupant, or `id` itself if the pool has no usable slot.
    pub fn assign(&mut self, id: PrimitiveId) -> Option<PrimitiveId> {
        let (slot, evicted) = if let Some(slot) = self.available.pop_front() {
            (slot, None)
        } else if let Some(slot) = self.working.pop_front() {
            let evicted = self.slots[slot].occupant.take();
            warn!(
                generator = %self.generator,
                slot = %self.slots[slot].name,
                "terrain pool exhausted, evicting oldest primitive"
            );
            (slot, evicted)
        } else {
            warn!(generator = %self.generator, primitive = %id, "terrain pool has no slots");
            return Some(id);
        };

        self.slots[slot].occupant = Some(id);
        self.working.push_back(slot);
        evicted
    }

    /// Return a slot whose occupant the generator already dropped. The
    /// slot is parked again at the next [`sync`](Self::sync).
    fn release(&mut self, slot: usize) {
        self.slots[slot].occupant = None;
        self.working.retain(|&s| s != slot);
        self.available.push_back(slot);
        self.released.push(slot);
    }

    /// Take the generator's newly created primitives, evicting as needed.
    pub fn collect(&mut self, generator: &mut dyn TerrainGenerator) {
        let stale: Vec<usize> = self
            .working
            .iter()
            .copied()
            .filter(|&slot| {
                self.slots[slot]
                    .occupant
                    .is_some_and(|id| generator.primitive(id).is_none())
            })
            .collect();
        for slot in stale {
            debug!(slot = %self.slots[slot].name, "terrain primitive dropped by generator");
            self.release(slot);
        }

        for id in generator.drain_created() {
            if let Some(recycled) = self.assign(id) {
                generator.recycle(recycled);
            }
        }
    }

    /// Park released slots, then write the current occupant of every
    /// working slot into the model.
    pub fn sync<E: PhysicsEngine>(
        &mut self,
        engine: &E,
        model: &mut E::Model,
        generator: &dyn TerrainGenerator,
    ) {
        for index in std::mem::take(&mut self.released) {
            let slot = &self.slots[index];
            if slot.occupant.is_some() {
                continue;
            }
            if let (Some(body), Some(geom)) = (slot.body, slot.geom) {
                debug!(slot = %slot.name, "parking released terrain slot");
                park(engine, model, index, body, geom);
            }
        }

        for &index in &self.working {
            let slot = &self.slots[index];
            let (Some(body), Some(geom), Some(id)) = (slot.body, slot.geom, slot.occupant) else {
                continue;
            };
            let Some(primitive) = generator.primitive(id) else {
                continue;
            };

            if let Some(pos) = engine.body_pos_mut(model).get_mut(body) {
                *pos = primitive.pose.position.coords;
            }
            if let Some(quat) = engine.body_quat_mut(model).get_mut(body) {
                *quat = primitive.pose.rotation;
            }
            if let Some(size) = engine.geom_size_mut(model).get_mut(geom) {
                *size = engine_size_padded(ShapeKind::Box, &primitive.size);
            }
            if let Some(rbound) = engine.geom_rbound_mut(model).get_mut(geom) {
                *rbound = primitive.rbound;
            }
        }
    }
}

/// Return a slot body and geometry to their parked layout.
fn park<E: PhysicsEngine>(
    engine: &E,
    model: &mut E::Model,
    index: usize,
    body: usize,
    geom: usize,
) {
    let extents = Vector3::from(SLOT_EXTENTS);
    if let Some(pos) = engine.body_pos_mut(model).get_mut(body) {
        *pos = park_position(index);
    }
    if let Some(quat) = engine.body_quat_mut(model).get_mut(body) {
        *quat = UnitQuaternion::identity();
    }
    if let Some(size) = engine.geom_size_mut(model).get_mut(geom) {
        *size = engine_size_padded(ShapeKind::Box, &extents);
    }
    if let Some(rbound) = engine.geom_rbound_mut(model).get_mut(geom) {
        *rbound = 0.5 * extents.norm();
    }
}
