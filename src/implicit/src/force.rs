//! Global forces applied to every node before constraints.

use dyn_clone::DynClone;

use crate::node::{NodeBlock, NodeStore};
use crate::V2;

pub trait Force: DynClone + Send + Sync {
	fn apply_forces(&self, nodes: &mut NodeStore);

	fn name(&self) -> &'static str;
}

dyn_clone::clone_trait_object!(Force);

#[derive(Clone, Debug)]
pub struct Gravity {
	pub acceleration: V2,
}

impl Gravity {
	pub fn new(acceleration: V2) -> Self {
		Self { acceleration }
	}
}

impl Default for Gravity {
	fn default() -> Self {
		Self::new(V2::new(0.0, -9.81))
	}
}

impl Force for Gravity {
	fn apply_forces(&self, nodes: &mut NodeStore) {
		let g = self.acceleration;
		for block in nodes.data_mut().blocks_mut() {
			apply_gravity(block, &g);
		}
	}

	fn name(&self) -> &'static str {
		"gravity"
	}
}

fn apply_gravity(block: &mut NodeBlock, g: &V2) {
	for (f, m) in block.f.iter_mut().zip(block.m.iter()) {
		*f += g * *m;
	}
}
