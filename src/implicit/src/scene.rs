//! Scene composition: what exists and in which order it is evaluated.

use protocol::pr_model::{PrConstraint, PrKinematic, PrModel, PrParticle};

use crate::animator::Animator;
use crate::condition::Condition;
use crate::config::StorageConfig;
use crate::constraint::SceneView;
use crate::dynamic::Dynamic;
use crate::error::{Error, Result};
use crate::force::Force;
use crate::kinematic::Kinematic;
use crate::node::NodeStore;
use crate::shape::Shape;

#[derive(Clone)]
pub struct Scene {
	storage: StorageConfig,
	nodes: NodeStore,
	dynamics: Vec<Dynamic>,
	kinematics: Vec<Kinematic>,
	animators: Vec<Option<Box<dyn Animator>>>,
	conditions: Vec<Condition>,
	forces: Vec<Box<dyn Force>>,
}

impl Default for Scene {
	fn default() -> Self {
		Self::new(StorageConfig::default())
	}
}

impl Scene {
	pub fn new(storage: StorageConfig) -> Self {
		Self {
			storage,
			nodes: NodeStore::new(storage.block_size, storage.node_capacity),
			dynamics: Vec::new(),
			kinematics: Vec::new(),
			animators: Vec::new(),
			conditions: Vec::new(),
			forces: Vec::new(),
		}
	}

	pub fn storage(&self) -> &StorageConfig {
		&self.storage
	}

	/// Adds a deformable body with one node per shape vertex. Returns its index.
	pub fn add_dynamic(&mut self, shape: &Shape, node_mass: f64) -> Result<usize> {
		let mut dynamic = Dynamic::new(&mut self.nodes, shape, node_mass)?;
		let index = self.dynamics.len();
		dynamic.set_index(index);
		log::info!(
			"dynamic {}: {} nodes from id {}",
			index,
			dynamic.num_nodes(),
			dynamic.global_offset()
		);
		self.dynamics.push(dynamic);
		Ok(index)
	}

	pub fn add_kinematic(&mut self, mut kinematic: Kinematic, animator: Option<Box<dyn Animator>>) -> usize {
		let index = self.kinematics.len();
		kinematic.set_index(index);
		log::info!("kinematic {}: {} surface edges", index, kinematic.surface_edges().len());
		self.kinematics.push(kinematic);
		self.animators.push(animator);
		index
	}

	pub fn add_condition(&mut self, mut condition: Condition) -> Result<usize> {
		condition.validate(self.dynamics.len(), self.kinematics.len())?;
		let index = self.conditions.len();
		condition.set_index(index);
		log::info!("condition {}: {}", index, condition.kind().name());
		self.conditions.push(condition);
		Ok(index)
	}

	pub fn add_force(&mut self, force: Box<dyn Force>) -> usize {
		log::info!("force {}: {}", self.forces.len(), force.name());
		self.forces.push(force);
		self.forces.len() - 1
	}

	/// Moves every animated kinematic to its pose at `time`.
	pub fn update_kinematics(&mut self, time: f64, dt: f64) {
		for (kinematic, animator) in self.kinematics.iter_mut().zip(self.animators.iter()) {
			if let Some(animator) = animator {
				let (position, rotation) = animator.sample(time);
				kinematic.update(position, rotation, dt);
			}
		}
	}

	/// Rebuilds the constraints of the static or of the dynamic conditions.
	pub fn update_conditions(&mut self, is_static: bool) -> Result<()> {
		let view = SceneView {
			nodes: &self.nodes,
			kinematics: &self.kinematics,
		};
		for condition in self.conditions.iter_mut() {
			if condition.is_static() == is_static {
				condition.update_constraints(&view, &self.dynamics)?;
			}
		}
		Ok(())
	}

	/// Resets node forces, applies global forces then constraint forces.
	pub fn compute_forces(&mut self) {
		self.nodes.clear_forces();
		for force in self.forces.iter() {
			force.apply_forces(&mut self.nodes);
		}
		let view = SceneView {
			nodes: &self.nodes,
			kinematics: &self.kinematics,
		};
		for condition in self.conditions.iter_mut() {
			condition.compute_forces(&view);
		}
		for condition in self.conditions.iter() {
			condition.gather_forces(&mut self.nodes);
		}
	}

	pub fn compute_jacobians(&mut self) {
		let view = SceneView {
			nodes: &self.nodes,
			kinematics: &self.kinematics,
		};
		for condition in self.conditions.iter_mut() {
			condition.compute_jacobians(&view);
		}
	}

	pub fn view(&self) -> SceneView {
		SceneView {
			nodes: &self.nodes,
			kinematics: &self.kinematics,
		}
	}

	pub fn nodes(&self) -> &NodeStore {
		&self.nodes
	}

	pub fn nodes_mut(&mut self) -> &mut NodeStore {
		&mut self.nodes
	}

	pub fn num_nodes(&self) -> usize {
		self.nodes.num_nodes()
	}

	pub fn dynamics(&self) -> &[Dynamic] {
		&self.dynamics
	}

	pub fn dynamic(&self, index: usize) -> Result<&Dynamic> {
		self.dynamics.get(index).ok_or(Error::InvalidDynamic(index))
	}

	pub fn kinematics(&self) -> &[Kinematic] {
		&self.kinematics
	}

	pub fn kinematic(&self, index: usize) -> Result<&Kinematic> {
		self.kinematics.get(index).ok_or(Error::InvalidKinematic(index))
	}

	pub fn conditions(&self) -> &[Condition] {
		&self.conditions
	}

	pub fn condition(&self, index: usize) -> Result<&Condition> {
		self.conditions.get(index).ok_or(Error::InvalidCondition(index))
	}

	pub fn forces(&self) -> &[Box<dyn Force>] {
		&self.forces
	}

	pub fn num_constraints(&self) -> usize {
		self.conditions.iter().map(|c| c.num_constraints()).sum()
	}

	/// Potential energy stored in the constraints.
	pub fn potential_energy(&self) -> f64 {
		let view = self.view();
		self.conditions.iter().map(|c| c.energy(&view)).sum()
	}

	pub fn pr_model(&self, time: f64) -> PrModel {
		let particles = self
			.nodes
			.positions()
			.into_iter()
			.enumerate()
			.map(|(id, x)| PrParticle { id, pos: [x[0], x[1]] })
			.collect();
		let constraints = self
			.conditions
			.iter()
			.flat_map(|c| {
				c.constraints()
					.node_ids()
					.into_iter()
					.map(move |particles| PrConstraint {
						condition: c.index(),
						particles,
					})
			})
			.collect();
		let kinematics = self
			.kinematics
			.iter()
			.map(|k| PrKinematic {
				id: k.index(),
				vertices: k.vertices().iter().map(|v| [v[0], v[1]]).collect(),
				edges: k.surface_edges().to_vec(),
			})
			.collect();
		PrModel {
			time,
			particles,
			constraints,
			kinematics,
		}
	}
}
