//! Body tree traversal.
//!
//! Resolves parent links into a forest, emits one `<body>` element per scene
//! body with its joints, mass properties, geometries and child bodies, and
//! records what the binder has to resolve afterwards.

use hashbrown::HashMap;
use sim_scene::{Body, Constraint, Pose, Scene};

use super::{BodyPlan, ConstraintPlan, ResourceBuilder};
use crate::constraint::expand;
use crate::engine::JointKind;
use crate::resource::{ResourceElement, tags};

impl ResourceBuilder<'_> {
    /// Emit every root body of the scene with its subtree.
    pub(super) fn body_tree(&mut self, scene: &Scene) -> Vec<ResourceElement> {
        let bodies = scene.bodies();
        let parents = self.resolve_parents(bodies);

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); bodies.len()];
        let mut roots = Vec::new();
        for (index, parent) in parents.iter().enumerate() {
            match parent {
                Some(parent) => children[*parent].push(index),
                None => roots.push(index),
            }
        }

        roots
            .into_iter()
            .map(|index| self.body_element(bodies, &children, index, None))
            .collect()
    }

    /// Parent index per body. Unknown parents and cycles detach the body
    /// to the world.
    fn resolve_parents(&mut self, bodies: &[Body]) -> Vec<Option<usize>> {
        let index: HashMap<&str, usize> = bodies
            .iter()
            .enumerate()
            .map(|(i, body)| (body.name.as_str(), i))
            .collect();

        let mut parents = vec![None; bodies.len()];
        for (i, body) in bodies.iter().enumerate() {
            let Some(parent) = body.parent.as_deref() else {
                continue;
            };
            match index.get(parent) {
                None => {
                    self.report(
                        &body.name,
                        format!("unknown parent '{parent}', attached to world"),
                    );
                }
                Some(_) if in_cycle(bodies, &index, i) => {
                    self.report(&body.name, "parent chain forms a cycle, attached to world");
                }
                Some(&p) => parents[i] = Some(p),
            }
        }
        parents
    }

    fn body_element(
        &mut self,
        bodies: &[Body],
        children: &[Vec<usize>],
        index: usize,
        parent: Option<&Body>,
    ) -> ResourceElement {
        let body = &bodies[index];
        let local = match parent {
            Some(parent) => Pose::from_isometry(
                parent
                    .start_pose
                    .to_isometry()
                    .inv_mul(&body.start_pose.to_isometry()),
            ),
            None => body.start_pose,
        };

        let mut element = ResourceElement::new(tags::BODY)
            .with("name", body.name.as_str())
            .with("pos", local.position.coords)
            .with("quat", local.quat_wxyz());

        let free_joint = body.needs_free_joint().then(|| format!("{}_free", body.name));
        if let Some(name) = &free_joint {
            element.push(
                ResourceElement::new(tags::JOINT)
                    .with("name", name.as_str())
                    .with("type", JointKind::Free.as_str()),
            );
        }
        self.plan.bodies.push(BodyPlan {
            name: body.name.clone(),
            free_joint,
            start_pose: body.start_pose,
        });

        for constraint in &body.constraints {
            for joint in self.constraint(body, constraint) {
                element.push(joint);
            }
        }

        let fallback_mass = self.mass_properties(body, &mut element);
        for collider in &body.colliders {
            for geom in self.collider(body, collider, fallback_mass) {
                element.push(geom);
            }
        }

        for &child in &children[index] {
            let child = self.body_element(bodies, children, child, Some(body));
            element.push(child);
        }
        element
    }

    fn constraint(&mut self, body: &Body, constraint: &Constraint) -> Vec<ResourceElement> {
        if !self.constraint_names.insert(constraint.name.clone()) {
            self.report(&constraint.name, "duplicate constraint name");
            return Vec::new();
        }
        let primitives = expand(constraint);
        let elements = primitives.iter().map(|p| p.to_element()).collect();
        self.plan.constraints.push(ConstraintPlan {
            name: constraint.name.clone(),
            body: body.name.clone(),
            kind: constraint.kind,
            primitives,
        });
        elements
    }

    /// Emit explicit mass properties, or return the mass each computable
    /// collider converts into a density when no inertia terms are given.
    fn mass_properties(&mut self, body: &Body, element: &mut ResourceElement) -> Option<f64> {
        let inertia = &body.inertia;
        if inertia.is_mass_only() {
            return Some(inertia.mass);
        }

        if inertia.has_mass() {
            let mut inertial = ResourceElement::new(tags::INERTIAL)
                .with("pos", [0.0, 0.0, 0.0])
                .with("mass", inertia.mass);
            if inertia.is_diagonal() {
                inertial.set("diaginertia", [inertia.ixx, inertia.iyy, inertia.izz]);
            } else {
                inertial.set(
                    "fullinertia",
                    [
                        inertia.ixx,
                        inertia.iyy,
                        inertia.izz,
                        inertia.ixy,
                        inertia.ixz,
                        inertia.iyz,
                    ],
                );
            }
            element.push(inertial);
        }
        None
    }
}

/// Whether following parent links from `start` returns to it.
fn in_cycle(bodies: &[Body], index: &HashMap<&str, usize>, start: usize) -> bool {
    let mut cursor = start;
    for _ in 0..bodies.len() {
        match bodies[cursor].parent.as_deref().and_then(|p| index.get(p)) {
            Some(&next) if next == start => return true,
            Some(&next) => cursor = next,
            None => return false,
        }
    }
    false
}
