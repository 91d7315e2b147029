use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegratorKind {
	/// Backward Euler on velocities, one linear solve per substep.
	Implicit,
	/// `v += h·f/m`; debugging baseline, unstable with stiff constraints.
	SemiImplicit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
	pub integrator: IntegratorKind,
	pub cg_max_iterations: u32,
	/// Relative residual `|r| / |b|` at which the linear solve stops.
	pub cg_tolerance: f64,
}

impl Default for SolverConfig {
	fn default() -> Self {
		Self {
			integrator: IntegratorKind::Implicit,
			cg_max_iterations: 200,
			cg_tolerance: 1e-8,
		}
	}
}

impl SolverConfig {
	pub fn with_integrator(mut self, integrator: IntegratorKind) -> Self {
		self.integrator = integrator;
		self
	}

	pub fn with_cg_max_iterations(mut self, n: u32) -> Self {
		self.cg_max_iterations = n;
		self
	}

	pub fn with_cg_tolerance(mut self, tolerance: f64) -> Self {
		self.cg_tolerance = tolerance;
		self
	}
}

/// Chunking of the structure-of-arrays storages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
	pub block_size: usize,
	pub node_capacity: usize,
	/// Per condition.
	pub constraint_capacity: usize,
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			block_size: 64,
			node_capacity: 1 << 20,
			constraint_capacity: 1 << 20,
		}
	}
}

impl StorageConfig {
	pub fn with_block_size(mut self, block_size: usize) -> Self {
		self.block_size = block_size;
		self
	}

	pub fn with_node_capacity(mut self, capacity: usize) -> Self {
		self.node_capacity = capacity;
		self
	}

	pub fn with_constraint_capacity(mut self, capacity: usize) -> Self {
		self.constraint_capacity = capacity;
		self
	}
}

/// Simulation clock shared by the caller and the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
	pub time: f64,
	pub frame: u64,
	pub frame_dt: f64,
	pub num_substep: u32,
}

impl Default for Context {
	fn default() -> Self {
		Self::new(1.0 / 24.0, 4)
	}
}

impl Context {
	pub fn new(frame_dt: f64, num_substep: u32) -> Self {
		Self {
			time: 0.0,
			frame: 0,
			frame_dt,
			num_substep: num_substep.max(1),
		}
	}

	/// Substep length.
	pub fn dt(&self) -> f64 {
		self.frame_dt / self.num_substep as f64
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_substep() {
		let ctx = Context::new(0.1, 4);
		assert!((ctx.dt() - 0.025).abs() < 1e-15);
		assert_eq!(Context::new(0.1, 0).num_substep, 1);
	}

	#[test]
	fn test_builder() {
		let config = SolverConfig::default()
			.with_integrator(IntegratorKind::SemiImplicit)
			.with_cg_max_iterations(3);
		assert_eq!(config.integrator, IntegratorKind::SemiImplicit);
		assert_eq!(config.cg_max_iterations, 3);
		assert_eq!(config.cg_tolerance, SolverConfig::default().cg_tolerance);
	}
}
