//! The engine binder.
//!
//! Owns one scene and drives it through the lifecycle
//!
//! ```text
//! Unbuilt --build--> Built --bind--> Bound --step--> Stepping
//!                      ^   (retry)     ^               |
//!                      +--compile err  +-----reset-----+
//! any --reload--> Unbuilt --build--> Built --bind--> Bound
//! ```
//!
//! Per step the order is fixed: queued commands are flushed, terrain slots
//! are refreshed, the engine is advanced in whole integration steps until a
//! frame's worth of simulated time has passed, fresh state is pulled back
//! into the scene, and only then do post-step callbacks run.

use std::fmt;
use std::path::Path;

use nalgebra::{Point3, Vector3};
use sim_scene::{Collider, Limits, Pose, Scene};
use tracing::{debug, error, info, warn};

use crate::activation::ensure_activated;
use crate::binding::BindingTable;
use crate::builder::{self, BuildOutput};
use crate::collider::ColliderBinding;
use crate::config::BinderConfig;
use crate::contacts::{Contact, ContactManager};
use crate::engine::PhysicsEngine;
use crate::error::BindingError;
use crate::resource::ComposedDescription;
use crate::terrain::TerrainPool;

/// Lifecycle phase of an [`EngineBinder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No description exists.
    Unbuilt,
    /// A description exists but is not loaded.
    Built,
    /// Loaded and resolved, not yet stepped since bind or reset.
    Bound,
    /// Stepped at least once since bind or reset.
    Stepping,
}

impl Phase {
    /// Lower-case name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unbuilt => "unbuilt",
            Self::Built => "built",
            Self::Bound => "bound",
            Self::Stepping => "stepping",
        }
    }

    /// Whether an engine session is live.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Bound | Self::Stepping)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback run after every step, once state has been pulled.
pub type PostStepCallback = Box<dyn FnMut(&Scene, &[Contact])>;

/// A write queued until the next step.
#[derive(Debug, Clone, PartialEq)]
enum Command {
    ConstraintPositions { constraint: String, values: Vec<f64> },
    ConstraintVelocities { constraint: String, values: Vec<f64> },
    BodyPose { body: String, pose: Pose },
    BodyVelocity { body: String, linear: Vector3<f64>, angular: Vector3<f64> },
}

/// Engine handles plus the bindings resolved against them.
struct Session<E: PhysicsEngine> {
    model: E::Model,
    data: E::Data,
    table: BindingTable,
}

/// Binds a [`Scene`] to a [`PhysicsEngine`] and keeps the two in sync.
pub struct EngineBinder<E: PhysicsEngine> {
    engine: E,
    config: BinderConfig,
    scene: Scene,
    phase: Phase,
    output: Option<BuildOutput>,
    session: Option<Session<E>>,
    commands: Vec<Command>,
    contacts: ContactManager,
    callbacks: Vec<PostStepCallback>,
    diagnostics: Vec<BindingError>,
}

impl<E: PhysicsEngine> fmt::Debug for EngineBinder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBinder")
            .field("scene", &self.scene.name())
            .field("phase", &self.phase)
            .field("config", &self.config)
            .field("queued_commands", &self.commands.len())
            .field("contacts", &self.contacts.contacts().len())
            .field("callbacks", &self.callbacks.len())
            .field("diagnostics", &self.diagnostics.len())
            .finish_non_exhaustive()
    }
}

impl<E: PhysicsEngine> EngineBinder<E> {
    /// Create an unbuilt binder.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::InvalidConfig`] if `config` does not validate.
    pub fn new(engine: E, scene: Scene, config: BinderConfig) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self {
            engine,
            config,
            scene,
            phase: Phase::Unbuilt,
            output: None,
            session: None,
            commands: Vec::new(),
            contacts: ContactManager::new(),
            callbacks: Vec::new(),
            diagnostics: Vec::new(),
        })
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The scene, with state pulled after the last step.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    /// The engine.
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The composed description of the last build.
    #[must_use]
    pub fn description(&self) -> Option<&ComposedDescription> {
        self.output.as_ref().map(|o| &o.description)
    }

    /// Build and bind diagnostics of the current session.
    #[must_use]
    pub fn diagnostics(&self) -> &[BindingError] {
        &self.diagnostics
    }

    /// Bindings of the live session.
    #[must_use]
    pub fn bindings(&self) -> Option<&BindingTable> {
        self.session.as_ref().map(|s| &s.table)
    }

    /// Compiled model of the live session.
    #[must_use]
    pub fn model(&self) -> Option<&E::Model> {
        self.session.as_ref().map(|s| &s.model)
    }

    /// State of the live session.
    #[must_use]
    pub fn data(&self) -> Option<&E::Data> {
        self.session.as_ref().map(|s| &s.data)
    }

    /// Simulation time of the live session.
    #[must_use]
    pub fn time(&self) -> Option<f64> {
        self.session.as_ref().map(|s| self.engine.time(&s.data))
    }

    /// Contacts of the last step.
    #[must_use]
    pub fn contacts(&self) -> &[Contact] {
        self.contacts.contacts()
    }

    /// Register a callback to run after every step.
    pub fn on_post_step(&mut self, callback: impl FnMut(&Scene, &[Contact]) + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    fn require(
        &self,
        operation: &'static str,
        allowed: &[Phase],
        expected: &'static str,
    ) -> crate::Result<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(BindingError::InvalidPhase {
                operation,
                expected,
                actual: self.phase.as_str(),
            })
        }
    }

    /// Translate the scene into a composed description.
    ///
    /// Per-entity problems do not fail the build; they are returned and
    /// kept in [`diagnostics`](Self::diagnostics).
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::InvalidPhase`] once bound, or
    /// [`BindingError::Output`] if the configured dump cannot be written.
    pub fn build(&mut self) -> crate::Result<&[BindingError]> {
        self.require("build", &[Phase::Unbuilt, Phase::Built], "unbuilt or built")?;

        let output = builder::build(&self.scene, &self.config);
        if let Some(path) = &self.config.description_dump {
            dump_description(&output.description, path)?;
        }
        info!(
            scene = self.scene.name(),
            bodies = output.plan.bodies.len(),
            colliders = output.plan.colliders.len(),
            constraints = output.plan.constraints.len(),
            diagnostics = output.diagnostics.len(),
            "scene built"
        );

        self.diagnostics.clone_from(&output.diagnostics);
        self.output = Some(output);
        self.phase = Phase::Built;
        Ok(&self.diagnostics)
    }

    /// Compile the description, resolve every entity and load initial state.
    ///
    /// Entities that fail to resolve stay unbound for this session and are
    /// reported in the returned diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::Compile`] if the engine rejects the
    /// description; the binder stays built and bind may be retried.
    pub fn bind(&mut self) -> crate::Result<&[BindingError]> {
        self.require("bind", &[Phase::Built], "built")?;
        let Self {
            engine,
            scene,
            phase,
            output,
            session,
            contacts,
            diagnostics,
            ..
        } = self;
        let engine = &*engine;
        let Some(output) = output.as_ref() else {
            return Err(BindingError::InvalidPhase {
                operation: "bind",
                expected: "built",
                actual: Phase::Unbuilt.as_str(),
            });
        };

        if ensure_activated(|| engine.activate()) {
            info!("physics engine activated");
        }

        let (mut model, mut data) = match engine.compile(&output.description) {
            Ok(handles) => handles,
            Err(diagnostic) => {
                error!(
                    scene = scene.name(),
                    %diagnostic,
                    "engine rejected the composed description"
                );
                return Err(BindingError::Compile { diagnostic });
            }
        };

        let (mut table, mut errors) = BindingTable::resolve(engine, &model, &output.plan);
        errors.extend(write_heightfields(engine, &mut model, &table, scene));
        sync_terrain(engine, &mut model, table.pools_mut(), scene, engine.time(&data));
        engine.kinematics(&model, &mut data);
        pull_state(engine, &table, &data, scene, contacts);
        contacts.clear();

        info!(
            bodies = table.bodies().len(),
            colliders = table.colliders().len(),
            constraints = table.constraints().len(),
            unbound = errors.len(),
            "scene bound"
        );
        diagnostics.extend(errors);
        *session = Some(Session { model, data, table });
        *phase = Phase::Bound;
        Ok(&self.diagnostics)
    }

    /// Advance the simulation by one frame.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::InvalidPhase`] unless bound.
    pub fn step(&mut self) -> crate::Result<()> {
        self.require("step", &[Phase::Bound, Phase::Stepping], "bound or stepping")?;
        let Self {
            engine,
            config,
            scene,
            phase,
            session,
            commands,
            contacts,
            callbacks,
            ..
        } = self;
        let engine = &*engine;
        let Some(Session { model, data, table }) = session.as_mut() else {
            return Err(BindingError::unbound(scene.name()));
        };

        flush_commands(engine, &*table, data, std::mem::take(commands));
        sync_terrain(engine, model, table.pools_mut(), scene, engine.time(data));

        let start = engine.time(data);
        while engine.time(data) - start < config.frame_duration {
            let before = engine.time(data);
            engine.step(model, data);
            if engine.time(data) <= before {
                warn!(time = before, "engine time did not advance, ending frame early");
                break;
            }
        }

        pull_state(engine, &*table, &*data, scene, contacts);
        *phase = Phase::Stepping;
        for callback in callbacks.iter_mut() {
            callback(scene, contacts.contacts());
        }
        Ok(())
    }

    /// Return every bound entity to its rest state. Queued commands are
    /// discarded; topology and bindings are kept.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::InvalidPhase`] unless bound.
    pub fn reset(&mut self) -> crate::Result<()> {
        self.require("reset", &[Phase::Bound, Phase::Stepping], "bound or stepping")?;
        let Self {
            engine,
            scene,
            session,
            commands,
            contacts,
            phase,
            ..
        } = self;
        let engine = &*engine;
        let Some(Session { model, data, table }) = session.as_mut() else {
            return Err(BindingError::unbound(scene.name()));
        };

        commands.clear();
        let (qpos, qvel) = engine.state_mut(data);
        table.reset(qpos, qvel);
        engine.kinematics(model, data);
        pull_state(engine, &*table, &*data, scene, contacts);
        contacts.clear();
        *phase = Phase::Bound;
        debug!(scene = scene.name(), "scene reset");
        Ok(())
    }

    /// Release the engine session and rebuild and rebind from scratch.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`build`](Self::build) and [`bind`](Self::bind).
    pub fn reload(&mut self) -> crate::Result<&[BindingError]> {
        info!(scene = self.scene.name(), phase = %self.phase, "reloading");
        self.session = None;
        self.output = None;
        self.commands.clear();
        self.contacts.clear();
        self.diagnostics.clear();
        self.phase = Phase::Unbuilt;
        self.build()?;
        self.bind()
    }

    fn live(
        &mut self,
        operation: &'static str,
    ) -> crate::Result<(&E, &mut Session<E>, &mut Scene)> {
        self.require(operation, &[Phase::Bound, Phase::Stepping], "bound or stepping")?;
        let Self {
            engine,
            scene,
            session,
            ..
        } = self;
        let session = session
            .as_mut()
            .ok_or_else(|| BindingError::unbound(scene.name()))?;
        Ok((&*engine, session, scene))
    }

    /// Resize a collider.
    ///
    /// # Errors
    ///
    /// Unknown or unbound colliders, invalid sizes and compound colliders
    /// are rejected without mutation.
    pub fn set_collider_size(&mut self, name: &str, size: Vector3<f64>) -> crate::Result<()> {
        let (engine, session, scene) = self.live("set_collider_size")?;
        let (binding, collider) = collider_target(&session.table, scene, name)?;
        binding.set_size(engine, &mut session.model, collider, size)
    }

    /// Replace the raw elevation samples of a heightfield collider.
    ///
    /// # Errors
    ///
    /// [`BindingError::RuntimeMismatch`] if the sample count differs from the
    /// bound grid, [`BindingError::UnsupportedOperation`] for other shapes.
    pub fn set_collider_elevation(&mut self, name: &str, heights: &[f64]) -> crate::Result<()> {
        let (engine, session, scene) = self.live("set_collider_elevation")?;
        let (binding, collider) = collider_target(&session.table, scene, name)?;
        binding.set_elevation(engine, &mut session.model, collider, heights)
    }

    /// Move the vertices of a mesh collider.
    ///
    /// # Errors
    ///
    /// [`BindingError::UnsupportedOperation`] if the vertex count changes or
    /// the collider is not a mesh.
    pub fn set_collider_mesh_vertices(
        &mut self,
        name: &str,
        vertices: &[Point3<f64>],
    ) -> crate::Result<()> {
        let (engine, session, scene) = self.live("set_collider_mesh_vertices")?;
        let (binding, collider) = collider_target(&session.table, scene, name)?;
        binding.set_mesh_vertices(engine, &mut session.model, collider, vertices)
    }

    /// Set a collider's collision group.
    ///
    /// # Errors
    ///
    /// Unknown or unbound colliders.
    pub fn set_collider_group(&mut self, name: &str, group: i32) -> crate::Result<()> {
        let (engine, session, scene) = self.live("set_collider_group")?;
        let (binding, collider) = collider_target(&session.table, scene, name)?;
        binding.set_group(engine, &mut session.model, collider, group);
        Ok(())
    }

    /// Set a collider's collision mask.
    ///
    /// # Errors
    ///
    /// Unknown or unbound colliders.
    pub fn set_collider_mask(&mut self, name: &str, mask: i32) -> crate::Result<()> {
        let (engine, session, scene) = self.live("set_collider_mask")?;
        let (binding, collider) = collider_target(&session.table, scene, name)?;
        binding.set_mask(engine, &mut session.model, collider, mask);
        Ok(())
    }

    /// Set a collider's sliding friction.
    ///
    /// # Errors
    ///
    /// Unknown or unbound colliders, negative or non-finite values.
    pub fn set_collider_friction(&mut self, name: &str, sliding: f64) -> crate::Result<()> {
        let (engine, session, scene) = self.live("set_collider_friction")?;
        let (binding, collider) = collider_target(&session.table, scene, name)?;
        binding.set_friction(engine, &mut session.model, collider, sliding)
    }

    /// Change the range of a revolute or prismatic constraint.
    ///
    /// # Errors
    ///
    /// [`BindingError::UnsupportedOperation`] for multi-primitive kinds.
    pub fn set_constraint_limits(&mut self, name: &str, limits: Limits) -> crate::Result<()> {
        let (engine, session, scene) = self.live("set_constraint_limits")?;
        let binding = session
            .table
            .constraint(name)
            .ok_or_else(|| missing(scene.constraint(name).is_some(), name))?;
        let unsupported = || {
            BindingError::unsupported(
                name,
                format!("limits cannot be changed on {} constraints", binding.kind),
            )
        };
        if !binding.kind.is_single_dof() {
            return Err(unsupported());
        }
        let [joint] = binding.joints.as_slice() else {
            return Err(unsupported());
        };

        let id = joint.id;
        if let Some(limited) = engine.jnt_limited_mut(&mut session.model).get_mut(id) {
            *limited = limits.is_limited();
        }
        if let Some(range) = engine.jnt_range_mut(&mut session.model).get_mut(id) {
            *range = (limits.min, limits.max);
        }
        if let Some(constraint) = scene.constraint_mut(name) {
            constraint.limits = limits;
        }
        Ok(())
    }

    /// Queue generalized positions for a constraint, applied before the next
    /// step.
    ///
    /// # Errors
    ///
    /// [`BindingError::RuntimeMismatch`] if the length differs from the
    /// constraint's position count.
    pub fn set_constraint_positions(&mut self, name: &str, values: Vec<f64>) -> crate::Result<()> {
        let (_, session, scene) = self.live("set_constraint_positions")?;
        let binding = session
            .table
            .constraint(name)
            .ok_or_else(|| missing(scene.constraint(name).is_some(), name))?;
        binding.check_positions(&values)?;
        self.commands.push(Command::ConstraintPositions {
            constraint: name.to_owned(),
            values,
        });
        Ok(())
    }

    /// Queue generalized velocities for a constraint.
    ///
    /// # Errors
    ///
    /// [`BindingError::RuntimeMismatch`] if the length differs from the
    /// constraint's velocity count.
    pub fn set_constraint_velocities(&mut self, name: &str, values: Vec<f64>) -> crate::Result<()> {
        let (_, session, scene) = self.live("set_constraint_velocities")?;
        let binding = session
            .table
            .constraint(name)
            .ok_or_else(|| missing(scene.constraint(name).is_some(), name))?;
        binding.check_velocities(&values)?;
        self.commands.push(Command::ConstraintVelocities {
            constraint: name.to_owned(),
            values,
        });
        Ok(())
    }

    /// Queue a world pose for a floating body.
    ///
    /// # Errors
    ///
    /// [`BindingError::UnsupportedOperation`] for bodies without a free joint.
    pub fn set_body_pose(&mut self, name: &str, pose: Pose) -> crate::Result<()> {
        self.check_floating("set_body_pose", name)?;
        self.commands.push(Command::BodyPose {
            body: name.to_owned(),
            pose,
        });
        Ok(())
    }

    /// Queue linear and angular velocity for a floating body.
    ///
    /// # Errors
    ///
    /// [`BindingError::UnsupportedOperation`] for bodies without a free joint.
    pub fn set_body_velocity(
        &mut self,
        name: &str,
        linear: Vector3<f64>,
        angular: Vector3<f64>,
    ) -> crate::Result<()> {
        self.check_floating("set_body_velocity", name)?;
        self.commands.push(Command::BodyVelocity {
            body: name.to_owned(),
            linear,
            angular,
        });
        Ok(())
    }

    fn check_floating(&mut self, operation: &'static str, name: &str) -> crate::Result<()> {
        let (_, session, scene) = self.live(operation)?;
        let binding = session
            .table
            .body(name)
            .ok_or_else(|| missing(scene.body(name).is_some(), name))?;
        if binding.free_joint.is_none() {
            return Err(BindingError::unsupported(name, "body has no free joint"));
        }
        Ok(())
    }
}

/// Unbound if the scene knows the entity, unknown otherwise.
fn missing(in_scene: bool, name: &str) -> BindingError {
    if in_scene {
        BindingError::unbound(name)
    } else {
        BindingError::unknown(name)
    }
}

fn collider_target<'a>(
    table: &'a BindingTable,
    scene: &'a mut Scene,
    name: &str,
) -> crate::Result<(&'a ColliderBinding, &'a mut Collider)> {
    let Some(binding) = table.collider(name) else {
        return Err(missing(scene.collider(name).is_some(), name));
    };
    let collider = scene
        .collider_mut(name)
        .ok_or_else(|| BindingError::unknown(name))?;
    Ok((binding, collider))
}

fn dump_description(description: &ComposedDescription, path: &Path) -> crate::Result<()> {
    let xml = description.to_xml_string()?;
    std::fs::write(path, xml)
        .map_err(|e| BindingError::output(format!("{}: {e}", path.display())))?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    for (file, bytes) in description.blobs() {
        let target = dir.join(file);
        std::fs::write(&target, bytes)
            .map_err(|e| BindingError::output(format!("{}: {e}", target.display())))?;
    }
    debug!(path = %path.display(), "composed description written");
    Ok(())
}

fn write_heightfields<E: PhysicsEngine>(
    engine: &E,
    model: &mut E::Model,
    table: &BindingTable,
    scene: &Scene,
) -> Vec<BindingError> {
    let mut errors = Vec::new();
    for binding in table.colliders() {
        let Some(collider) = scene.collider(&binding.name) else {
            continue;
        };
        let sim_scene::Shape::Heightfield(data) = &collider.shape else {
            continue;
        };
        if let Err(error) = binding.write_elevation(engine, model, &collider.size, &data.heights) {
            errors.push(error);
        }
    }
    errors
}

fn sync_terrain<E: PhysicsEngine>(
    engine: &E,
    model: &mut E::Model,
    pools: &mut [TerrainPool],
    scene: &mut Scene,
    time: f64,
) {
    for generator in scene.terrain_generators_mut() {
        generator.update(time);
    }
    for pool in pools {
        let Some(generator) = scene
            .terrain_generators_mut()
            .iter_mut()
            .find(|g| g.name() == pool.generator())
        else {
            continue;
        };
        pool.collect(generator.as_mut());
        pool.sync(engine, model, generator.as_ref());
    }
}

fn flush_commands<E: PhysicsEngine>(
    engine: &E,
    table: &BindingTable,
    data: &mut E::Data,
    commands: Vec<Command>,
) {
    if commands.is_empty() {
        return;
    }
    let (qpos, qvel) = engine.state_mut(data);
    for command in commands {
        let result = match &command {
            Command::ConstraintPositions { constraint, values } => table
                .constraint(constraint)
                .ok_or_else(|| BindingError::unbound(constraint))
                .and_then(|b| b.write_positions(qpos, values)),
            Command::ConstraintVelocities { constraint, values } => table
                .constraint(constraint)
                .ok_or_else(|| BindingError::unbound(constraint))
                .and_then(|b| b.write_velocities(qvel, values)),
            Command::BodyPose { body, pose } => table
                .body(body)
                .ok_or_else(|| BindingError::unbound(body))
                .and_then(|b| b.write_pose(qpos, pose)),
            Command::BodyVelocity {
                body,
                linear,
                angular,
            } => table
                .body(body)
                .ok_or_else(|| BindingError::unbound(body))
                .and_then(|b| b.write_velocity(qvel, linear, angular)),
        };
        if let Err(error) = result {
            warn!("dropped queued command: {error}");
        }
    }
}

fn pull_state<E: PhysicsEngine>(
    engine: &E,
    table: &BindingTable,
    data: &E::Data,
    scene: &mut Scene,
    contacts: &mut ContactManager,
) {
    let xpos = engine.body_xpos(data);
    let xquat = engine.body_xquat(data);
    let qpos = engine.qpos(data);
    let qvel = engine.qvel(data);

    for body in scene.bodies_mut() {
        if let Some(pose) = table
            .body(&body.name)
            .and_then(|b| b.world_pose(xpos, xquat))
        {
            body.world_pose = pose;
        }
        for constraint in &mut body.constraints {
            if let Some(binding) = table.constraint(&constraint.name) {
                constraint.state = binding.read(qpos, qvel);
            }
        }
    }
    contacts.update(engine.contacts(data), table.geom_owners());
}
