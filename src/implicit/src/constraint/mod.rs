//! Constraint storage and the force/Jacobian contract.
//!
//! Each constraint kind is a [`ConstraintLaw`] over a fixed number of nodes.
//! Instances of one kind live in a [`DataBlock`] of [`ConstraintBlock`]s,
//! and [`ConstraintSet`] dispatches to the law by kind.

pub mod area;
pub mod bending;
pub mod spring;

use crate::block::{BlockData, DataBlock};
use crate::error::{check_coefficient, Error, Result};
use crate::kinematic::{Kinematic, ParametricPoint};
use crate::node::NodeStore;
use crate::sparse::BlockMatrixBuilder;
use crate::{M2, V2};

pub use area::Area;
pub use bending::Bending;
pub use spring::{AnchorSpring, Spring};

/// Read-only scene state visible to force laws.
#[derive(Clone, Copy)]
pub struct SceneView<'a> {
	pub nodes: &'a NodeStore,
	pub kinematics: &'a [Kinematic],
}

/// Attachment of an anchor spring on a kinematic boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnchorTarget {
	pub kinematic: usize,
	pub point: ParametricPoint,
	pub rest_length: f64,
}

pub trait ConstraintLaw<const N: usize> {
	type Params: Clone + Default + Send + Sync;

	fn compute_forces(
		view: &SceneView,
		ids: &[usize; N],
		stiffness: f64,
		damping: f64,
		params: &Self::Params,
	) -> [V2; N];

	fn compute_jacobians(
		view: &SceneView,
		ids: &[usize; N],
		stiffness: f64,
		damping: f64,
		params: &Self::Params,
		dfdx: &mut [[M2; N]; N],
		dfdv: &mut [[M2; N]; N],
	);

	fn energy(view: &SceneView, ids: &[usize; N], stiffness: f64, params: &Self::Params) -> f64;
}

/// One chunk of constraints connecting `N` nodes each.
#[derive(Debug, Clone)]
pub struct ConstraintBlock<P, const N: usize> {
	pub node_ids: Vec<[usize; N]>,
	pub stiffness: Vec<f64>,
	pub damping: Vec<f64>,
	pub params: Vec<P>,
	pub f: Vec<[V2; N]>,
	pub dfdx: Vec<[[M2; N]; N]>,
	pub dfdv: Vec<[[M2; N]; N]>,
}

impl<P, const N: usize> ConstraintBlock<P, N> {
	pub fn node_ids(&self) -> &[[usize; N]] {
		&self.node_ids
	}

	pub fn node_ids_mut(&mut self) -> &mut [[usize; N]] {
		&mut self.node_ids
	}

	pub fn stiffness_mut(&mut self) -> &mut [f64] {
		&mut self.stiffness
	}

	pub fn damping_mut(&mut self) -> &mut [f64] {
		&mut self.damping
	}

	pub fn params(&self) -> &[P] {
		&self.params
	}

	pub fn params_mut(&mut self) -> &mut [P] {
		&mut self.params
	}

	fn compute_forces<L: ConstraintLaw<N, Params = P>>(&mut self, view: &SceneView) {
		for i in 0..self.node_ids.len() {
			self.f[i] = L::compute_forces(
				view,
				&self.node_ids[i],
				self.stiffness[i],
				self.damping[i],
				&self.params[i],
			);
		}
	}

	fn compute_jacobians<L: ConstraintLaw<N, Params = P>>(&mut self, view: &SceneView) {
		for i in 0..self.node_ids.len() {
			L::compute_jacobians(
				view,
				&self.node_ids[i],
				self.stiffness[i],
				self.damping[i],
				&self.params[i],
				&mut self.dfdx[i],
				&mut self.dfdv[i],
			);
		}
	}

	fn energy<L: ConstraintLaw<N, Params = P>>(&self, view: &SceneView) -> f64 {
		(0..self.node_ids.len())
			.map(|i| L::energy(view, &self.node_ids[i], self.stiffness[i], &self.params[i]))
			.sum()
	}

	fn gather_forces(&self, nodes: &mut NodeStore) {
		for (ids, forces) in self.node_ids.iter().zip(self.f.iter()) {
			for (id, f) in ids.iter().zip(forces.iter()) {
				nodes.add_force(*id, f);
			}
		}
	}

	fn assemble(&self, h: f64, v: &[V2], builder: &mut BlockMatrixBuilder, rhs: &mut [V2]) {
		for c in 0..self.node_ids.len() {
			let ids = &self.node_ids[c];
			for i in 0..N {
				for j in 0..N {
					let dfdx = &self.dfdx[c][i][j];
					let dfdv = &self.dfdv[c][i][j];
					builder.add(ids[i], ids[j], -(dfdv * h + dfdx * (h * h)));
					rhs[ids[i]] += dfdx * v[ids[j]] * h;
				}
			}
		}
	}
}

impl<P: Clone + Default + Send, const N: usize> BlockData for ConstraintBlock<P, N> {
	fn with_capacity(capacity: usize) -> Self {
		Self {
			node_ids: Vec::with_capacity(capacity),
			stiffness: Vec::with_capacity(capacity),
			damping: Vec::with_capacity(capacity),
			params: Vec::with_capacity(capacity),
			f: Vec::with_capacity(capacity),
			dfdx: Vec::with_capacity(capacity),
			dfdv: Vec::with_capacity(capacity),
		}
	}

	fn len(&self) -> usize {
		self.node_ids.len()
	}

	fn resize(&mut self, len: usize) {
		self.node_ids.resize(len, [0; N]);
		self.stiffness.resize(len, 0.0);
		self.damping.resize(len, 0.0);
		self.params.resize(len, P::default());
		self.f.resize(len, [V2::zeros(); N]);
		self.dfdx.resize(len, [[M2::zeros(); N]; N]);
		self.dfdv.resize(len, [[M2::zeros(); N]; N]);
	}

	fn push_from(&mut self, other: &Self, index: usize) {
		self.node_ids.push(other.node_ids[index]);
		self.stiffness.push(other.stiffness[index]);
		self.damping.push(other.damping[index]);
		self.params.push(other.params[index].clone());
		self.f.push(other.f[index]);
		self.dfdx.push(other.dfdx[index]);
		self.dfdv.push(other.dfdv[index]);
	}
}

/// Everything needed to create one constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSpec<P, const N: usize> {
	pub node_ids: [usize; N],
	pub stiffness: f64,
	pub damping: f64,
	pub params: P,
}

impl<P, const N: usize> ConstraintSpec<P, N> {
	/// Fails with [`Error::ArityMismatch`] unless `node_ids` has `N` entries.
	pub fn new(node_ids: &[usize], stiffness: f64, damping: f64, params: P) -> Result<Self> {
		let node_ids = <[usize; N]>::try_from(node_ids).map_err(|_| Error::ArityMismatch {
			expected: N,
			found: node_ids.len(),
		})?;
		Ok(Self {
			node_ids,
			stiffness,
			damping,
			params,
		})
	}
}

/// Constraints of one kind waiting to be appended to a [`ConstraintSet`].
#[derive(Debug, Clone)]
pub enum ConstraintBatch {
	AnchorSpring(Vec<ConstraintSpec<AnchorTarget, 1>>),
	Spring(Vec<ConstraintSpec<f64, 2>>),
	Bending(Vec<ConstraintSpec<f64, 3>>),
	Area(Vec<ConstraintSpec<f64, 3>>),
}

impl ConstraintBatch {
	pub fn kind(&self) -> ConstraintKind {
		match self {
			Self::AnchorSpring(_) => ConstraintKind::AnchorSpring,
			Self::Spring(_) => ConstraintKind::Spring,
			Self::Bending(_) => ConstraintKind::Bending,
			Self::Area(_) => ConstraintKind::Area,
		}
	}

	pub fn len(&self) -> usize {
		match self {
			Self::AnchorSpring(v) => v.len(),
			Self::Spring(v) => v.len(),
			Self::Bending(v) => v.len(),
			Self::Area(v) => v.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
	AnchorSpring,
	Spring,
	Bending,
	Area,
}

impl ConstraintKind {
	pub fn arity(self) -> usize {
		match self {
			Self::AnchorSpring => 1,
			Self::Spring => 2,
			Self::Bending | Self::Area => 3,
		}
	}

	pub fn name(self) -> &'static str {
		match self {
			Self::AnchorSpring => "anchor_spring",
			Self::Spring => "spring",
			Self::Bending => "bending",
			Self::Area => "area",
		}
	}
}

/// Constraint storage of a single kind.
#[derive(Debug, Clone)]
pub enum ConstraintSet {
	AnchorSpring(DataBlock<ConstraintBlock<AnchorTarget, 1>>),
	Spring(DataBlock<ConstraintBlock<f64, 2>>),
	Bending(DataBlock<ConstraintBlock<f64, 3>>),
	Area(DataBlock<ConstraintBlock<f64, 3>>),
}

#[cfg(not(debug_assertions))]
fn for_each_block<B: BlockData>(data: &mut DataBlock<B>, f: impl Fn(&mut B) + Send + Sync) {
	use rayon::prelude::*;
	data.blocks_mut().par_iter_mut().for_each(f);
}

#[cfg(debug_assertions)]
fn for_each_block<B: BlockData>(data: &mut DataBlock<B>, f: impl Fn(&mut B) + Send + Sync) {
	data.blocks_mut().iter_mut().for_each(f);
}

fn append_specs<P: Clone + Default + Send, const N: usize>(
	data: &mut DataBlock<ConstraintBlock<P, N>>,
	view: &SceneView,
	specs: &[ConstraintSpec<P, N>],
) -> Result<()> {
	for spec in specs {
		check_coefficient("stiffness", spec.stiffness)?;
		check_coefficient("damping", spec.damping)?;
		for id in spec.node_ids.iter() {
			view.nodes.check(*id)?;
		}
	}
	let handles = data.append_empty(specs.len())?;
	let ids: Vec<[usize; N]> = specs.iter().map(|s| s.node_ids).collect();
	let stiffness: Vec<f64> = specs.iter().map(|s| s.stiffness).collect();
	let damping: Vec<f64> = specs.iter().map(|s| s.damping).collect();
	let params: Vec<P> = specs.iter().map(|s| s.params.clone()).collect();
	data.copy_into(&handles, &ids, ConstraintBlock::node_ids_mut)?;
	data.copy_into(&handles, &stiffness, ConstraintBlock::stiffness_mut)?;
	data.copy_into(&handles, &damping, ConstraintBlock::damping_mut)?;
	data.copy_into(&handles, &params, ConstraintBlock::params_mut)?;
	Ok(())
}

fn flatten_ids<P, const N: usize>(data: &DataBlock<ConstraintBlock<P, N>>) -> Vec<Vec<usize>>
where
	P: Clone + Default + Send,
{
	data.blocks()
		.iter()
		.flat_map(|b| b.node_ids().iter().map(|ids| ids.to_vec()))
		.collect()
}

fn check_target(view: &SceneView, target: &AnchorTarget) -> Result<()> {
	view.kinematics
		.get(target.kinematic)
		.ok_or(Error::InvalidKinematic(target.kinematic))?
		.check_parametric_point(&target.point)
}

/// Expands to `$body` with `$data` bound to the storage of any variant.
macro_rules! with_data {
	($set:expr, $data:ident => $body:expr) => {
		match $set {
			ConstraintSet::AnchorSpring($data) => $body,
			ConstraintSet::Spring($data) => $body,
			ConstraintSet::Bending($data) => $body,
			ConstraintSet::Area($data) => $body,
		}
	};
}

impl ConstraintSet {
	pub fn new(kind: ConstraintKind, block_size: usize, capacity: usize) -> Self {
		match kind {
			ConstraintKind::AnchorSpring => Self::AnchorSpring(DataBlock::new(block_size, capacity)),
			ConstraintKind::Spring => Self::Spring(DataBlock::new(block_size, capacity)),
			ConstraintKind::Bending => Self::Bending(DataBlock::new(block_size, capacity)),
			ConstraintKind::Area => Self::Area(DataBlock::new(block_size, capacity)),
		}
	}

	pub fn kind(&self) -> ConstraintKind {
		match self {
			Self::AnchorSpring(_) => ConstraintKind::AnchorSpring,
			Self::Spring(_) => ConstraintKind::Spring,
			Self::Bending(_) => ConstraintKind::Bending,
			Self::Area(_) => ConstraintKind::Area,
		}
	}

	pub fn arity(&self) -> usize {
		self.kind().arity()
	}

	pub fn len(&self) -> usize {
		with_data!(self, data => data.len())
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn num_blocks(&self) -> usize {
		with_data!(self, data => data.num_blocks())
	}

	pub fn clear(&mut self) {
		with_data!(self, data => data.clear())
	}

	pub fn compact(&mut self) {
		with_data!(self, data => data.compact())
	}

	/// Appends a batch of the same kind. Node ids and anchor targets must
	/// resolve in `view`; nothing is appended otherwise.
	pub fn append(&mut self, view: &SceneView, batch: &ConstraintBatch) -> Result<()> {
		match (self, batch) {
			(Self::AnchorSpring(data), ConstraintBatch::AnchorSpring(specs)) => {
				for spec in specs.iter() {
					check_target(view, &spec.params)?;
				}
				append_specs(data, view, specs)
			}
			(Self::Spring(data), ConstraintBatch::Spring(specs)) => append_specs(data, view, specs),
			(Self::Bending(data), ConstraintBatch::Bending(specs)) => append_specs(data, view, specs),
			(Self::Area(data), ConstraintBatch::Area(specs)) => append_specs(data, view, specs),
			(set, batch) => Err(Error::InvalidParameter(format!(
				"cannot append {} constraints to a {} set",
				batch.kind().name(),
				set.kind().name()
			))),
		}
	}

	pub fn compute_forces(&mut self, view: &SceneView) {
		match self {
			Self::AnchorSpring(data) => for_each_block(data, |b| b.compute_forces::<AnchorSpring>(view)),
			Self::Spring(data) => for_each_block(data, |b| b.compute_forces::<Spring>(view)),
			Self::Bending(data) => for_each_block(data, |b| b.compute_forces::<Bending>(view)),
			Self::Area(data) => for_each_block(data, |b| b.compute_forces::<Area>(view)),
		}
	}

	pub fn compute_jacobians(&mut self, view: &SceneView) {
		match self {
			Self::AnchorSpring(data) => for_each_block(data, |b| b.compute_jacobians::<AnchorSpring>(view)),
			Self::Spring(data) => for_each_block(data, |b| b.compute_jacobians::<Spring>(view)),
			Self::Bending(data) => for_each_block(data, |b| b.compute_jacobians::<Bending>(view)),
			Self::Area(data) => for_each_block(data, |b| b.compute_jacobians::<Area>(view)),
		}
	}

	/// Potential energy of every constraint in the set.
	pub fn energy(&self, view: &SceneView) -> f64 {
		match self {
			Self::AnchorSpring(data) => data.blocks().iter().map(|b| b.energy::<AnchorSpring>(view)).sum(),
			Self::Spring(data) => data.blocks().iter().map(|b| b.energy::<Spring>(view)).sum(),
			Self::Bending(data) => data.blocks().iter().map(|b| b.energy::<Bending>(view)).sum(),
			Self::Area(data) => data.blocks().iter().map(|b| b.energy::<Area>(view)).sum(),
		}
	}

	/// Adds the last computed forces to the node accumulators.
	pub fn gather_forces(&self, nodes: &mut NodeStore) {
		with_data!(self, data => data.blocks().iter().for_each(|b| b.gather_forces(nodes)))
	}

	/// Scatters `-h·dfdv - h²·dfdx` into `builder` and `h·dfdx·v` into `rhs`.
	pub fn assemble(&self, h: f64, v: &[V2], builder: &mut BlockMatrixBuilder, rhs: &mut [V2]) {
		with_data!(self, data => data.blocks().iter().for_each(|b| b.assemble(h, v, builder, rhs)))
	}

	pub fn node_ids(&self) -> Vec<Vec<usize>> {
		with_data!(self, data => flatten_ids(data))
	}

	/// Per-constraint forces from the last evaluation, in storage order.
	pub fn forces(&self) -> Vec<Vec<V2>> {
		with_data!(self, data => data
			.blocks()
			.iter()
			.flat_map(|b| b.f.iter().map(|f| f.to_vec()))
			.collect())
	}

	pub fn anchor_targets(&self) -> Vec<AnchorTarget> {
		match self {
			Self::AnchorSpring(data) => data.blocks().iter().flat_map(|b| b.params().iter().copied()).collect(),
			_ => Vec::new(),
		}
	}

	/// Rest parameter of every constraint: length, angle or area.
	pub fn rest_values(&self) -> Vec<f64> {
		match self {
			Self::AnchorSpring(data) => data
				.blocks()
				.iter()
				.flat_map(|b| b.params().iter().map(|p| p.rest_length))
				.collect(),
			Self::Spring(data) => data.blocks().iter().flat_map(|b| b.params().iter().copied()).collect(),
			Self::Bending(data) => data.blocks().iter().flat_map(|b| b.params().iter().copied()).collect(),
			Self::Area(data) => data.blocks().iter().flat_map(|b| b.params().iter().copied()).collect(),
		}
	}
}
