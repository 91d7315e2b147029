//! Time integration of a [`Scene`].
//!
//! Each substep of length `h` solves the backward Euler velocity update
//! `(M − h·∂f/∂v − h²·∂f/∂x)·Δv = h·(f + h·∂f/∂x·v)` and then moves the
//! nodes with the new velocities.

use nalgebra::DVector;

use crate::cg::ConjugateGradient;
use crate::config::{Context, IntegratorKind, SolverConfig};
use crate::error::Result;
use crate::node::NodeBlock;
use crate::profiler::Profiler;
use crate::scene::Scene;
use crate::sparse::{BlockMatrixBuilder, BlockSparseMatrix};
use crate::V2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverPhase {
	Idle,
	AssemblingForces,
	AssemblingJacobians,
	SolvingLinearSystem,
	Integrating,
}

/// Outcome of one substep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
	pub time: f64,
	pub num_constraints: usize,
	pub iterations: u32,
	pub residual: f64,
	/// False when the linear solve stopped before reaching its tolerance.
	/// Always true for the semi-implicit integrator.
	pub converged: bool,
}

pub struct Solver {
	config: SolverConfig,
	phase: SolverPhase,
	cg: ConjugateGradient,
	system: Option<BlockSparseMatrix>,
}

impl Default for Solver {
	fn default() -> Self {
		Self::new(SolverConfig::default())
	}
}

impl Solver {
	pub fn new(config: SolverConfig) -> Self {
		let cg = ConjugateGradient::new(0, config.cg_max_iterations, config.cg_tolerance);
		Self {
			config,
			phase: SolverPhase::Idle,
			cg,
			system: None,
		}
	}

	pub fn config(&self) -> &SolverConfig {
		&self.config
	}

	pub fn phase(&self) -> SolverPhase {
		self.phase
	}

	/// Matrix of the last implicit substep.
	pub fn system_matrix(&self) -> Option<&BlockSparseMatrix> {
		self.system.as_ref()
	}

	fn set_phase(&mut self, phase: SolverPhase) {
		log::trace!("solver phase {:?}", phase);
		self.phase = phase;
	}

	/// Poses the kinematics at `context.time` without deriving velocities,
	/// then builds every condition.
	pub fn initialize(&mut self, scene: &mut Scene, context: &Context) -> Result<()> {
		scene.update_kinematics(context.time, 0.0);
		scene.update_conditions(true)?;
		scene.update_conditions(false)?;
		self.system = None;
		log::info!(
			"solver initialized: {} nodes, {} constraints, {:?} integrator",
			scene.num_nodes(),
			scene.num_constraints(),
			self.config.integrator
		);
		Ok(())
	}

	/// Advances the scene by one substep ending at `context.time`.
	pub fn solve_step(&mut self, scene: &mut Scene, context: &Context, profiler: &mut Profiler) -> Result<StepReport> {
		let h = context.dt();
		profiler.scope("solve_step", |p| -> Result<StepReport> {
			p.scope("update_kinematics", |_| scene.update_kinematics(context.time, h));
			p.scope("update_conditions", |_| scene.update_conditions(false))?;

			self.set_phase(SolverPhase::AssemblingForces);
			p.scope("compute_forces", |_| scene.compute_forces());

			let mut report = StepReport {
				time: context.time,
				num_constraints: scene.num_constraints(),
				iterations: 0,
				residual: 0.0,
				converged: true,
			};
			match self.config.integrator {
				IntegratorKind::Implicit => self.implicit_step(scene, h, p, &mut report),
				IntegratorKind::SemiImplicit => {
					self.set_phase(SolverPhase::Integrating);
					p.scope("integrate", |_| semi_implicit_step(scene, h));
				}
			}
			self.set_phase(SolverPhase::Idle);
			Ok(report)
		})
	}

	fn implicit_step(&mut self, scene: &mut Scene, h: f64, profiler: &mut Profiler, report: &mut StepReport) {
		self.set_phase(SolverPhase::AssemblingJacobians);
		profiler.scope("compute_jacobians", |_| scene.compute_jacobians());
		let (matrix, b) = profiler.scope("assemble", |_| assemble_system(scene, h));

		self.set_phase(SolverPhase::SolvingLinearSystem);
		let mut dv = DVector::zeros(b.len());
		let result = profiler.scope("linear_solve", |_| self.cg.solve(|x, out| matrix.mul_into(x, out), &b, &mut dv));
		if !result.converged() {
			log::warn!(
				"t={:.4}: linear solve stopped after {} iterations ({:?}), relative residual {:.3e}",
				report.time,
				result.iterations,
				result.status,
				result.error
			);
		}
		report.iterations = result.iterations;
		report.residual = result.residual;
		report.converged = result.converged();

		self.set_phase(SolverPhase::Integrating);
		profiler.scope("integrate", |_| {
			for block in scene.nodes_mut().data_mut().blocks_mut() {
				integrate_block(block, &dv, h);
			}
		});
		self.system = Some(matrix);
	}

	/// Runs every substep of the next frame, advancing `context.time` before
	/// each one.
	pub fn solve_frame(
		&mut self,
		scene: &mut Scene,
		context: &mut Context,
		profiler: &mut Profiler,
	) -> Result<Vec<StepReport>> {
		let mut reports = Vec::with_capacity(context.num_substep as usize);
		for _ in 0..context.num_substep {
			context.time += context.dt();
			reports.push(self.solve_step(scene, context, profiler)?);
		}
		context.frame += 1;
		log::debug!(
			"frame {} done at t={:.4}, {} cg iterations",
			context.frame,
			context.time,
			reports.iter().map(|r| r.iterations).sum::<u32>()
		);
		Ok(reports)
	}
}

/// Builds `A = M − h·∂f/∂v − h²·∂f/∂x` and `b = h·(f + h·∂f/∂x·v)` from the
/// last computed forces and Jacobians.
pub fn assemble_system(scene: &Scene, h: f64) -> (BlockSparseMatrix, DVector<f64>) {
	let nodes = scene.nodes();
	let n = nodes.num_nodes();
	let mut builder = BlockMatrixBuilder::new(n);
	builder.add_diagonal(&nodes.masses());
	let mut rhs = nodes.forces();
	let v = nodes.velocities();
	for condition in scene.conditions() {
		condition.assemble(h, &v, &mut builder, &mut rhs);
	}
	let b = DVector::from_iterator(2 * n, rhs.iter().flat_map(|f| [f[0] * h, f[1] * h]));
	(builder.build(), b)
}

fn integrate_block(block: &mut NodeBlock, dv: &DVector<f64>, h: f64) {
	let NodeBlock { x, v, id, .. } = block;
	for ((x, v), id) in x.iter_mut().zip(v.iter_mut()).zip(id.iter()) {
		*v += V2::new(dv[2 * id], dv[2 * id + 1]);
		*x += *v * h;
	}
}

/// `v += h·f/m`, `x += h·v`. Massless nodes keep their velocity.
fn semi_implicit_step(scene: &mut Scene, h: f64) {
	for block in scene.nodes_mut().data_mut().blocks_mut() {
		let NodeBlock { x, v, f, m, .. } = block;
		for (((x, v), f), m) in x.iter_mut().zip(v.iter_mut()).zip(f.iter()).zip(m.iter()) {
			if *m > 0.0 {
				*v += f * (h / m);
			}
			*x += *v * h;
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::condition::{Condition, ConditionKind};
	use crate::force::Gravity;
	use crate::shape::Shape;

	#[test]
	fn test_free_fall() {
		let mut scene = Scene::default();
		let point = Shape::new(vec![V2::zeros()], vec![], vec![]).unwrap();
		scene.add_dynamic(&point, 2.0).unwrap();
		scene.add_force(Box::new(Gravity::new(V2::new(0., -10.))));
		let mut context = Context::new(0.1, 1);
		let mut solver = Solver::default();
		let mut profiler = Profiler::default();
		solver.initialize(&mut scene, &context).unwrap();
		let reports = solver.solve_frame(&mut scene, &mut context, &mut profiler).unwrap();
		assert_eq!(reports.len(), 1);
		assert!(reports[0].converged);
		let (x, v) = scene.nodes().xv(0);
		assert!((v - V2::new(0., -1.)).norm() < 1e-10);
		assert!((x - V2::new(0., -0.1)).norm() < 1e-10);
		assert_eq!(context.frame, 1);
		assert!((context.time - 0.1).abs() < 1e-15);
		assert_eq!(solver.phase(), SolverPhase::Idle);
	}

	#[test]
	fn test_system_is_symmetric() {
		let mut scene = Scene::default();
		let beam = Shape::beam(V2::zeros(), 2., 1., 2, 1).unwrap();
		scene.add_dynamic(&beam, 0.1).unwrap();
		for kind in [ConditionKind::Edge { dynamics: vec![0] }, ConditionKind::Area { dynamics: vec![0] }] {
			let condition = Condition::new(kind, 5.0, 0.1, scene.storage()).unwrap();
			scene.add_condition(condition).unwrap();
		}
		let mut context = Context::new(0.04, 2);
		let mut solver = Solver::default();
		let mut profiler = Profiler::default();
		solver.initialize(&mut scene, &context).unwrap();
		scene.nodes_mut().set_state(0, V2::new(-0.2, 0.1), V2::new(1., 0.));
		solver.solve_frame(&mut scene, &mut context, &mut profiler).unwrap();
		let matrix = solver.system_matrix().unwrap();
		assert_eq!(matrix.num_rows(), 6);
		assert!(matrix.is_symmetric(1e-9));
		assert!(profiler.total("solve_step") >= profiler.total("linear_solve"));
	}
}
