//! Particle storage and the node accessor.

use crate::block::{BlockData, BlockHandle, DataBlock};
use crate::error::{check_coefficient, Error, Result};
use crate::V2;

/// Particle fields of one storage block.
#[derive(Debug, Clone, Default)]
pub struct NodeBlock {
	pub x: Vec<V2>,
	pub v: Vec<V2>,
	pub f: Vec<V2>,
	pub m: Vec<f64>,
	pub id: Vec<usize>,
}

impl NodeBlock {
	pub fn x(&self) -> &[V2] {
		&self.x
	}

	pub fn x_mut(&mut self) -> &mut [V2] {
		&mut self.x
	}

	pub fn v(&self) -> &[V2] {
		&self.v
	}

	pub fn v_mut(&mut self) -> &mut [V2] {
		&mut self.v
	}

	pub fn f(&self) -> &[V2] {
		&self.f
	}

	pub fn m(&self) -> &[f64] {
		&self.m
	}

	pub fn m_mut(&mut self) -> &mut [f64] {
		&mut self.m
	}

	pub fn id_mut(&mut self) -> &mut [usize] {
		&mut self.id
	}
}

impl BlockData for NodeBlock {
	fn with_capacity(capacity: usize) -> Self {
		Self {
			x: Vec::with_capacity(capacity),
			v: Vec::with_capacity(capacity),
			f: Vec::with_capacity(capacity),
			m: Vec::with_capacity(capacity),
			id: Vec::with_capacity(capacity),
		}
	}

	fn len(&self) -> usize {
		self.id.len()
	}

	fn resize(&mut self, len: usize) {
		self.x.resize(len, V2::zeros());
		self.v.resize(len, V2::zeros());
		self.f.resize(len, V2::zeros());
		self.m.resize(len, 0.0);
		self.id.resize(len, 0);
	}

	fn push_from(&mut self, other: &Self, index: usize) {
		self.x.push(other.x[index]);
		self.v.push(other.v[index]);
		self.f.push(other.f[index]);
		self.m.push(other.m[index]);
		self.id.push(other.id[index]);
	}
}

#[derive(Debug, Clone, Copy)]
struct NodeLocation {
	block: usize,
	index: usize,
}

/// Node storage plus the `global id -> (block, offset)` table.
///
/// Every read or write of particle state by forces and constraints goes
/// through here, so they never depend on which dynamic owns a node.
#[derive(Debug, Clone)]
pub struct NodeStore {
	data: DataBlock<NodeBlock>,
	locations: Vec<NodeLocation>,
}

impl NodeStore {
	pub fn new(block_size: usize, capacity: usize) -> Self {
		Self {
			data: DataBlock::new(block_size, capacity),
			locations: Vec::new(),
		}
	}

	/// Appends particles at rest and returns their blocks and the global id
	/// of the first one. Ids are consecutive.
	pub fn append(&mut self, positions: &[V2], mass: f64) -> Result<(Vec<BlockHandle>, usize)> {
		check_coefficient("mass", mass)?;
		let offset = self.locations.len();
		let handles = self.data.append_empty(positions.len())?;
		let masses = vec![mass; positions.len()];
		let ids: Vec<usize> = (offset..offset + positions.len()).collect();
		self.data.copy_into(&handles, positions, NodeBlock::x_mut)?;
		self.data.copy_into(&handles, &masses, NodeBlock::m_mut)?;
		self.data.copy_into(&handles, &ids, NodeBlock::id_mut)?;
		for handle in handles.iter() {
			let n = self.data.blocks()[handle.0].len();
			for index in 0..n {
				self.locations.push(NodeLocation {
					block: handle.0,
					index,
				});
			}
		}
		Ok((handles, offset))
	}

	pub fn num_nodes(&self) -> usize {
		self.locations.len()
	}

	pub fn contains(&self, id: usize) -> bool {
		id < self.locations.len()
	}

	pub fn check(&self, id: usize) -> Result<()> {
		if self.contains(id) {
			Ok(())
		} else {
			Err(Error::InvalidNode(id))
		}
	}

	fn location(&self, id: usize) -> NodeLocation {
		self.locations[id]
	}

	/// Position and velocity of a node. Panics on an id that was never
	/// appended; constraints validate their ids when created.
	pub fn xv(&self, id: usize) -> (&V2, &V2) {
		let loc = self.location(id);
		let block = &self.data.blocks()[loc.block];
		(&block.x[loc.index], &block.v[loc.index])
	}

	pub fn x(&self, id: usize) -> &V2 {
		self.xv(id).0
	}

	pub fn mass(&self, id: usize) -> f64 {
		let loc = self.location(id);
		self.data.blocks()[loc.block].m[loc.index]
	}

	pub fn force(&self, id: usize) -> &V2 {
		let loc = self.location(id);
		&self.data.blocks()[loc.block].f[loc.index]
	}

	pub fn add_force(&mut self, id: usize, f: &V2) {
		let loc = self.location(id);
		self.data.blocks_mut()[loc.block].f[loc.index] += f;
	}

	pub fn set_state(&mut self, id: usize, x: V2, v: V2) {
		let loc = self.location(id);
		let block = &mut self.data.blocks_mut()[loc.block];
		block.x[loc.index] = x;
		block.v[loc.index] = v;
	}

	pub fn clear_forces(&mut self) {
		for block in self.data.blocks_mut() {
			block.f.iter_mut().for_each(|f| *f = V2::zeros());
		}
	}

	pub fn data(&self) -> &DataBlock<NodeBlock> {
		&self.data
	}

	pub fn data_mut(&mut self) -> &mut DataBlock<NodeBlock> {
		&mut self.data
	}

	fn gather<T: Copy>(&self, zero: T, field: fn(&NodeBlock) -> &[T]) -> Vec<T> {
		let mut result = vec![zero; self.num_nodes()];
		for block in self.data.blocks() {
			for (id, value) in block.id.iter().zip(field(block)) {
				result[*id] = *value;
			}
		}
		result
	}

	/// Positions in global id order.
	pub fn positions(&self) -> Vec<V2> {
		self.gather(V2::zeros(), NodeBlock::x)
	}

	/// Velocities in global id order.
	pub fn velocities(&self) -> Vec<V2> {
		self.gather(V2::zeros(), NodeBlock::v)
	}

	/// Accumulated forces in global id order.
	pub fn forces(&self) -> Vec<V2> {
		self.gather(V2::zeros(), NodeBlock::f)
	}

	/// Masses in global id order.
	pub fn masses(&self) -> Vec<f64> {
		self.gather(0.0, NodeBlock::m)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_accessor_across_blocks() {
		let mut nodes = NodeStore::new(2, 100);
		let a: Vec<V2> = (0..3).map(|i| V2::new(i as f64, 0.)).collect();
		let b: Vec<V2> = (0..3).map(|i| V2::new(i as f64, 1.)).collect();
		let (ha, oa) = nodes.append(&a, 1.0).unwrap();
		let (hb, ob) = nodes.append(&b, 2.0).unwrap();
		assert_eq!((oa, ob), (0, 3));
		assert_eq!(ha.len(), 2);
		assert_eq!(hb, vec![BlockHandle(2), BlockHandle(3)]);
		assert_eq!(nodes.num_nodes(), 6);
		assert_eq!(*nodes.x(4), V2::new(1., 1.));
		assert_eq!(nodes.mass(4), 2.0);
		nodes.add_force(4, &V2::new(1., 2.));
		nodes.add_force(4, &V2::new(1., 2.));
		assert_eq!(nodes.forces()[4], V2::new(2., 4.));
		nodes.clear_forces();
		assert_eq!(*nodes.force(4), V2::zeros());
		assert_eq!(nodes.positions()[2], V2::new(2., 0.));
	}

	#[test]
	fn test_invalid() {
		let mut nodes = NodeStore::new(4, 2);
		assert!(nodes.append(&[V2::zeros()], -1.0).is_err());
		assert!(nodes.append(&[V2::zeros(); 3], 1.0).is_err());
		assert!(matches!(nodes.check(0), Err(Error::InvalidNode(0))));
	}
}
