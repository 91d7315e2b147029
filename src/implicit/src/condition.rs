//! Conditions generate constraints from the scene.
//!
//! Static conditions build their constraints once at initialization.
//! Kinematic collision is rebuilt every substep.

use crate::config::StorageConfig;
use crate::constraint::{
	AnchorSpring, AnchorTarget, Area, Bending, ConstraintBatch, ConstraintKind, ConstraintSet, ConstraintSpec,
	SceneView, Spring,
};
use crate::dynamic::Dynamic;
use crate::error::{check_coefficient, Error, Result};
use crate::node::NodeStore;
use crate::sparse::BlockMatrixBuilder;
use crate::V2;

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionKind {
	/// A spring per edge.
	Edge { dynamics: Vec<usize> },
	/// A bending constraint per pair of consecutive edges.
	WireBending { dynamics: Vec<usize> },
	/// An area constraint per face.
	Area { dynamics: Vec<usize> },
	/// Anchors every node within `distance` of the kinematic surface. Rest
	/// length defaults to the distance at creation.
	KinematicAttachment {
		dynamic: usize,
		kinematic: usize,
		distance: f64,
		rest_length: Option<f64>,
	},
	/// Links every node of `dynamic0` to its closest node of `dynamic1`
	/// when closer than `distance`.
	DynamicAttachment {
		dynamic0: usize,
		dynamic1: usize,
		distance: f64,
	},
	/// Pulls nodes inside any kinematic to its surface.
	KinematicCollision,
}

impl ConditionKind {
	pub fn constraint_kind(&self) -> ConstraintKind {
		match self {
			Self::Edge { .. } | Self::DynamicAttachment { .. } => ConstraintKind::Spring,
			Self::WireBending { .. } => ConstraintKind::Bending,
			Self::Area { .. } => ConstraintKind::Area,
			Self::KinematicAttachment { .. } | Self::KinematicCollision => ConstraintKind::AnchorSpring,
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::Edge { .. } => "edge",
			Self::WireBending { .. } => "wire_bending",
			Self::Area { .. } => "area",
			Self::KinematicAttachment { .. } => "kinematic_attachment",
			Self::DynamicAttachment { .. } => "dynamic_attachment",
			Self::KinematicCollision => "kinematic_collision",
		}
	}

	fn dynamics(&self) -> Vec<usize> {
		match self {
			Self::Edge { dynamics } | Self::WireBending { dynamics } | Self::Area { dynamics } => dynamics.clone(),
			Self::KinematicAttachment { dynamic, .. } => vec![*dynamic],
			Self::DynamicAttachment { dynamic0, dynamic1, .. } => vec![*dynamic0, *dynamic1],
			Self::KinematicCollision => Vec::new(),
		}
	}
}

#[derive(Debug, Clone)]
pub struct Condition {
	index: usize,
	kind: ConditionKind,
	stiffness: f64,
	damping: f64,
	constraints: ConstraintSet,
}

impl Condition {
	pub fn new(kind: ConditionKind, stiffness: f64, damping: f64, storage: &StorageConfig) -> Result<Self> {
		check_coefficient("stiffness", stiffness)?;
		check_coefficient("damping", damping)?;
		match &kind {
			ConditionKind::KinematicAttachment {
				distance, rest_length, ..
			} => {
				check_coefficient("distance", *distance)?;
				if let Some(rest) = rest_length {
					check_coefficient("rest_length", *rest)?;
				}
			}
			ConditionKind::DynamicAttachment {
				dynamic0,
				dynamic1,
				distance,
			} => {
				check_coefficient("distance", *distance)?;
				if dynamic0 == dynamic1 {
					return Err(Error::InvalidParameter(format!("dynamic {} attached to itself", dynamic0)));
				}
			}
			_ => {}
		}
		let constraints = ConstraintSet::new(
			kind.constraint_kind(),
			storage.block_size,
			storage.constraint_capacity,
		);
		Ok(Self {
			index: 0,
			kind,
			stiffness,
			damping,
			constraints,
		})
	}

	/// Checks every referenced dynamic and kinematic index.
	pub fn validate(&self, num_dynamics: usize, num_kinematics: usize) -> Result<()> {
		if let Some(d) = self.kind.dynamics().into_iter().find(|d| *d >= num_dynamics) {
			return Err(Error::InvalidDynamic(d));
		}
		if let ConditionKind::KinematicAttachment { kinematic, .. } = self.kind {
			if kinematic >= num_kinematics {
				return Err(Error::InvalidKinematic(kinematic));
			}
		}
		Ok(())
	}

	pub fn index(&self) -> usize {
		self.index
	}

	pub(crate) fn set_index(&mut self, index: usize) {
		self.index = index;
	}

	pub fn kind(&self) -> &ConditionKind {
		&self.kind
	}

	pub fn stiffness(&self) -> f64 {
		self.stiffness
	}

	pub fn damping(&self) -> f64 {
		self.damping
	}

	pub fn is_static(&self) -> bool {
		!matches!(self.kind, ConditionKind::KinematicCollision)
	}

	pub fn constraints(&self) -> &ConstraintSet {
		&self.constraints
	}

	pub fn num_constraints(&self) -> usize {
		self.constraints.len()
	}

	/// Rebuilds every constraint of this condition from the current state.
	pub fn update_constraints(&mut self, view: &SceneView, dynamics: &[Dynamic]) -> Result<()> {
		self.constraints.clear();
		let batches = self.build(view, dynamics)?;
		for batch in batches.iter() {
			self.constraints.append(view, batch)?;
		}
		if batches.len() > 1 {
			self.constraints.compact();
		}
		log::trace!(
			"condition {} ({}): {} constraints",
			self.index,
			self.kind.name(),
			self.constraints.len()
		);
		Ok(())
	}

	fn build(&self, view: &SceneView, dynamics: &[Dynamic]) -> Result<Vec<ConstraintBatch>> {
		let (k, c) = (self.stiffness, self.damping);
		let dynamic = |index: usize| dynamics.get(index).ok_or(Error::InvalidDynamic(index));
		let mut batches = Vec::new();
		match &self.kind {
			ConditionKind::Edge { dynamics: ids } => {
				for d in ids.iter() {
					let d = dynamic(*d)?;
					let specs = d
						.edges()
						.iter()
						.map(|[a, b]| {
							let ids = [d.node_id(*a), d.node_id(*b)];
							ConstraintSpec::new(&ids, k, c, Spring::rest_length(view, &ids))
						})
						.collect::<Result<Vec<_>>>()?;
					batches.push(ConstraintBatch::Spring(specs));
				}
			}
			ConditionKind::WireBending { dynamics: ids } => {
				for d in ids.iter() {
					let d = dynamic(*d)?;
					let specs = d
						.edges()
						.windows(2)
						.filter(|pair| pair[0][1] == pair[1][0])
						.map(|pair| {
							let ids = [d.node_id(pair[0][0]), d.node_id(pair[0][1]), d.node_id(pair[1][1])];
							ConstraintSpec::new(&ids, k, c, Bending::rest_angle(view, &ids))
						})
						.collect::<Result<Vec<_>>>()?;
					batches.push(ConstraintBatch::Bending(specs));
				}
			}
			ConditionKind::Area { dynamics: ids } => {
				for d in ids.iter() {
					let d = dynamic(*d)?;
					let specs = d
						.faces()
						.iter()
						.map(|[a, b, e]| {
							let ids = [d.node_id(*a), d.node_id(*b), d.node_id(*e)];
							ConstraintSpec::new(&ids, k, c, Area::rest_area(view, &ids))
						})
						.collect::<Result<Vec<_>>>()?;
					batches.push(ConstraintBatch::Area(specs));
				}
			}
			ConditionKind::KinematicAttachment {
				dynamic: d,
				kinematic,
				distance,
				rest_length,
			} => {
				let d = dynamic(*d)?;
				let kin = view.kinematics.get(*kinematic).ok_or(Error::InvalidKinematic(*kinematic))?;
				let mut specs = Vec::new();
				for id in d.node_ids() {
					let x = view.nodes.x(id);
					let point = kin.closest_parametric_point(x);
					let gap = (kin.position_from_parametric_point(&point) - x).norm();
					if gap > *distance {
						continue;
					}
					let target = AnchorTarget {
						kinematic: *kinematic,
						point,
						rest_length: rest_length.unwrap_or(gap),
					};
					specs.push(ConstraintSpec::new(&[id], k, c, target)?);
				}
				batches.push(ConstraintBatch::AnchorSpring(specs));
			}
			ConditionKind::DynamicAttachment {
				dynamic0,
				dynamic1,
				distance,
			} => {
				let (d0, d1) = (dynamic(*dynamic0)?, dynamic(*dynamic1)?);
				let mut specs = Vec::new();
				for id0 in d0.node_ids() {
					let x0 = view.nodes.x(id0);
					if let Some((id1, gap)) = closest_node(view.nodes, x0, d1) {
						if gap <= *distance {
							specs.push(ConstraintSpec::new(&[id0, id1], k, c, gap)?);
						}
					}
				}
				batches.push(ConstraintBatch::Spring(specs));
			}
			ConditionKind::KinematicCollision => {
				let mut specs = Vec::new();
				for kin in view.kinematics.iter() {
					for d in dynamics.iter() {
						for id in d.node_ids() {
							let x = view.nodes.x(id);
							if !kin.is_inside(x) {
								continue;
							}
							let target = AnchorTarget {
								kinematic: kin.index(),
								point: kin.closest_parametric_point(x),
								rest_length: 0.0,
							};
							specs.push(ConstraintSpec::new(&[id], k, c, target)?);
						}
					}
				}
				batches.push(ConstraintBatch::AnchorSpring(specs));
			}
		}
		Ok(batches)
	}

	pub fn compute_forces(&mut self, view: &SceneView) {
		self.constraints.compute_forces(view);
	}

	pub fn compute_jacobians(&mut self, view: &SceneView) {
		self.constraints.compute_jacobians(view);
	}

	pub fn gather_forces(&self, nodes: &mut NodeStore) {
		self.constraints.gather_forces(nodes);
	}

	pub fn assemble(&self, h: f64, v: &[V2], builder: &mut BlockMatrixBuilder, rhs: &mut [V2]) {
		self.constraints.assemble(h, v, builder, rhs);
	}

	pub fn energy(&self, view: &SceneView) -> f64 {
		self.constraints.energy(view)
	}

	/// Segments of two node constraints.
	pub fn segments(&self, nodes: &NodeStore) -> Vec<[V2; 2]> {
		self.constraints
			.node_ids()
			.iter()
			.filter(|ids| ids.len() == 2)
			.map(|ids| [*nodes.x(ids[0]), *nodes.x(ids[1])])
			.collect()
	}
}

/// Closest node of `dynamic` to `x` and its distance. The first of equally
/// close nodes wins.
fn closest_node(nodes: &NodeStore, x: &V2, dynamic: &Dynamic) -> Option<(usize, f64)> {
	let mut best: Option<(usize, f64)> = None;
	for id in dynamic.node_ids() {
		let d = (nodes.x(id) - x).norm();
		if best.map_or(true, |(_, b)| d < b) {
			best = Some((id, d));
		}
	}
	best
}
