//! The scene aggregate.

use std::collections::HashSet;

use crate::body::Body;
use crate::collider::Collider;
use crate::constraint::Constraint;
use crate::error::SceneError;
use crate::terrain::TerrainGenerator;

/// Root of everything the binding layer translates into an engine model.
///
/// Bodies are kept in insertion order; that order is the build traversal
/// order and therefore fixes the layout of the composed description.
#[derive(Debug, Default)]
pub struct Scene {
    name: String,
    bodies: Vec<Body>,
    terrain: Vec<Box<dyn TerrainGenerator>>,
}

impl Scene {
    /// Create an empty scene.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bodies: Vec::new(),
            terrain: Vec::new(),
        }
    }

    /// Scene name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a body. Body names must be unique.
    pub fn add_body(&mut self, body: Body) -> crate::Result<()> {
        if self.body(&body.name).is_some() {
            return Err(SceneError::duplicate("body", body.name));
        }
        self.bodies.push(body);
        Ok(())
    }

    /// Add a terrain generator.
    pub fn add_terrain_generator(&mut self, generator: Box<dyn TerrainGenerator>) {
        self.terrain.push(generator);
    }

    /// Bodies in insertion order.
    #[must_use]
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Mutable bodies. The set itself cannot change through this slice.
    pub fn bodies_mut(&mut self) -> &mut [Body] {
        &mut self.bodies
    }

    /// Look up a body.
    #[must_use]
    pub fn body(&self, name: &str) -> Option<&Body> {
        self.bodies.iter().find(|b| b.name == name)
    }

    /// Look up a body mutably.
    pub fn body_mut(&mut self, name: &str) -> Option<&mut Body> {
        self.bodies.iter_mut().find(|b| b.name == name)
    }

    /// Look up a collider anywhere in the scene.
    #[must_use]
    pub fn collider(&self, name: &str) -> Option<&Collider> {
        self.bodies.iter().find_map(|b| b.collider(name))
    }

    /// Look up a collider mutably.
    pub fn collider_mut(&mut self, name: &str) -> Option<&mut Collider> {
        self.bodies
            .iter_mut()
            .find_map(|b| b.colliders.iter_mut().find(|c| c.name == name))
    }

    /// Look up a constraint anywhere in the scene.
    #[must_use]
    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.bodies.iter().find_map(|b| b.constraint(name))
    }

    /// Look up a constraint mutably.
    pub fn constraint_mut(&mut self, name: &str) -> Option<&mut Constraint> {
        self.bodies
            .iter_mut()
            .find_map(|b| b.constraints.iter_mut().find(|c| c.name == name))
    }

    /// Terrain generators in insertion order.
    #[must_use]
    pub fn terrain_generators(&self) -> &[Box<dyn TerrainGenerator>] {
        &self.terrain
    }

    /// Mutable terrain generators.
    pub fn terrain_generators_mut(&mut self) -> &mut [Box<dyn TerrainGenerator>] {
        &mut self.terrain
    }

    /// Check name uniqueness and parent references.
    ///
    /// The binding layer tolerates violations (offending entities are
    /// skipped with a diagnostic); this is for callers that prefer to fail
    /// early.
    pub fn validate(&self) -> crate::Result<()> {
        let mut colliders = HashSet::new();
        let mut constraints = HashSet::new();
        for body in &self.bodies {
            if let Some(parent) = &body.parent {
                if self.body(parent).is_none() {
                    return Err(SceneError::UnknownParent {
                        body: body.name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
            for collider in &body.colliders {
                if !colliders.insert(collider.name.as_str()) {
                    return Err(SceneError::duplicate("collider", &collider.name));
                }
            }
            for constraint in &body.constraints {
                if !constraints.insert(constraint.name.as_str()) {
                    return Err(SceneError::duplicate("constraint", &constraint.name));
                }
            }
        }
        Ok(())
    }
}
