//! Deformable bodies: a contiguous range of global node ids.

use crate::block::BlockHandle;
use crate::error::Result;
use crate::node::{NodeBlock, NodeStore};
use crate::shape::Shape;
use crate::V2;

#[derive(Debug, Clone)]
pub struct Dynamic {
	index: usize,
	global_offset: usize,
	num_nodes: usize,
	block_handles: Vec<BlockHandle>,
	edges: Vec<[usize; 2]>,
	faces: Vec<[usize; 3]>,
}

impl Dynamic {
	/// Appends one node per shape vertex, all with `node_mass`.
	pub fn new(nodes: &mut NodeStore, shape: &Shape, node_mass: f64) -> Result<Self> {
		let (block_handles, global_offset) = nodes.append(&shape.vertex, node_mass)?;
		Ok(Self {
			index: 0,
			global_offset,
			num_nodes: shape.num_vertices(),
			block_handles,
			edges: shape.edge.clone(),
			faces: shape.face.clone(),
		})
	}

	pub fn index(&self) -> usize {
		self.index
	}

	pub(crate) fn set_index(&mut self, index: usize) {
		self.index = index;
	}

	pub fn num_nodes(&self) -> usize {
		self.num_nodes
	}

	pub fn global_offset(&self) -> usize {
		self.global_offset
	}

	/// Global id of local vertex `local`.
	pub fn node_id(&self, local: usize) -> usize {
		self.global_offset + local
	}

	pub fn node_ids(&self) -> std::ops::Range<usize> {
		self.global_offset..self.global_offset + self.num_nodes
	}

	pub fn edges(&self) -> &[[usize; 2]] {
		&self.edges
	}

	pub fn faces(&self) -> &[[usize; 3]] {
		&self.faces
	}

	pub fn block_handles(&self) -> &[BlockHandle] {
		&self.block_handles
	}

	/// Current node positions in local vertex order.
	pub fn positions(&self, nodes: &NodeStore) -> Vec<V2> {
		nodes.data().flatten(&self.block_handles, NodeBlock::x)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_offsets() {
		let mut nodes = NodeStore::new(2, 64);
		let wire = Shape::wire(V2::zeros(), V2::new(1., 0.), 2).unwrap();
		let a = Dynamic::new(&mut nodes, &wire, 1.0).unwrap();
		let b = Dynamic::new(&mut nodes, &wire, 1.0).unwrap();
		assert_eq!(a.node_ids(), 0..3);
		assert_eq!(b.node_id(1), 4);
		assert_eq!(b.positions(&nodes), wire.vertex);
		assert_eq!(nodes.num_nodes(), 6);
	}
}
