//! Scene authoring and query commands.
//!
//! These are the operations exposed to remote clients through
//! [`crate::dispatch::Dispatcher`], usable directly from Rust as well.

use nalgebra::DMatrix;

use crate::animator::Animator;
use crate::condition::{Condition, ConditionKind};
use crate::config::Context;
use crate::error::Result;
use crate::force::Gravity;
use crate::kinematic::Kinematic;
use crate::profiler::Profiler;
use crate::scene::Scene;
use crate::shape::Shape;
use crate::solver::{Solver, StepReport};
use crate::V2;

pub fn add_dynamic(scene: &mut Scene, shape: &Shape, node_mass: f64) -> Result<usize> {
	scene.add_dynamic(shape, node_mass)
}

/// With an animator, `shape` is in local space and the initial pose is
/// sampled at time zero. Without one, `shape` is in world space and the
/// body stays put around its centroid.
pub fn add_kinematic(scene: &mut Scene, shape: &Shape, animator: Option<Box<dyn Animator>>) -> Result<usize> {
	let kinematic = match animator.as_ref() {
		Some(animator) => {
			let (position, rotation) = animator.sample(0.0);
			Kinematic::new(shape, position, rotation)?
		}
		None => {
			let mut local = shape.clone();
			let (position, rotation) = local.extract_transform();
			Kinematic::new(&local, position, rotation)?
		}
	};
	Ok(scene.add_kinematic(kinematic, animator))
}

fn add_condition(scene: &mut Scene, kind: ConditionKind, stiffness: f64, damping: f64) -> Result<usize> {
	let condition = Condition::new(kind, stiffness, damping, scene.storage())?;
	scene.add_condition(condition)
}

pub fn add_wire_bending_constraint(scene: &mut Scene, dynamic: usize, stiffness: f64, damping: f64) -> Result<usize> {
	let kind = ConditionKind::WireBending {
		dynamics: vec![dynamic],
	};
	add_condition(scene, kind, stiffness, damping)
}

pub fn add_edge_constraint(scene: &mut Scene, dynamic: usize, stiffness: f64, damping: f64) -> Result<usize> {
	let kind = ConditionKind::Edge {
		dynamics: vec![dynamic],
	};
	add_condition(scene, kind, stiffness, damping)
}

pub fn add_face_constraint(scene: &mut Scene, dynamic: usize, stiffness: f64, damping: f64) -> Result<usize> {
	let kind = ConditionKind::Area {
		dynamics: vec![dynamic],
	};
	add_condition(scene, kind, stiffness, damping)
}

pub fn add_kinematic_attachment(
	scene: &mut Scene,
	dynamic: usize,
	kinematic: usize,
	stiffness: f64,
	damping: f64,
	distance: f64,
) -> Result<usize> {
	let kind = ConditionKind::KinematicAttachment {
		dynamic,
		kinematic,
		distance,
		rest_length: None,
	};
	add_condition(scene, kind, stiffness, damping)
}

pub fn add_dynamic_attachment(
	scene: &mut Scene,
	dynamic0: usize,
	dynamic1: usize,
	stiffness: f64,
	damping: f64,
	distance: f64,
) -> Result<usize> {
	let kind = ConditionKind::DynamicAttachment {
		dynamic0,
		dynamic1,
		distance,
	};
	add_condition(scene, kind, stiffness, damping)
}

pub fn add_kinematic_collision(scene: &mut Scene, stiffness: f64, damping: f64) -> Result<usize> {
	add_condition(scene, ConditionKind::KinematicCollision, stiffness, damping)
}

pub fn add_gravity(scene: &mut Scene, acceleration: V2) -> usize {
	scene.add_force(Box::new(Gravity::new(acceleration)))
}

pub fn initialize(scene: &mut Scene, solver: &mut Solver, context: &Context) -> Result<()> {
	solver.initialize(scene, context)
}

pub fn solve_to_next_frame(
	scene: &mut Scene,
	solver: &mut Solver,
	context: &mut Context,
	profiler: &mut Profiler,
) -> Result<Vec<StepReport>> {
	profiler.scope("solve_to_next_frame", |p| solver.solve_frame(scene, context, p))
}

pub fn get_nodes_from_dynamic(scene: &Scene, dynamic: usize) -> Result<Vec<V2>> {
	Ok(scene.dynamic(dynamic)?.positions(scene.nodes()))
}

pub fn get_shape_from_kinematic(scene: &Scene, kinematic: usize) -> Result<Shape> {
	Ok(scene.kinematic(kinematic)?.as_shape())
}

/// One segment per surface edge, from its midpoint along its outward
/// normal scaled by `normal_scale`.
pub fn get_normals_from_kinematic(scene: &Scene, kinematic: usize, normal_scale: f64) -> Result<Vec<[V2; 2]>> {
	let kinematic = scene.kinematic(kinematic)?;
	let vertices = kinematic.vertices();
	Ok(kinematic
		.surface_edges()
		.iter()
		.zip(kinematic.normals())
		.map(|([a, b], n)| {
			let mid = (vertices[*a] + vertices[*b]) * 0.5;
			[mid, mid + n * normal_scale]
		})
		.collect())
}

/// Segments of the two node constraints of a condition.
pub fn get_segments_from_constraint(scene: &Scene, condition: usize) -> Result<Vec<[V2; 2]>> {
	Ok(scene.condition(condition)?.segments(scene.nodes()))
}

/// Absolute values of the last system matrix, or its non-zero pattern as
/// ones and zeros with `as_binary`. `None` before the first implicit step.
pub fn get_sparse_matrix_as_dense(solver: &Solver, as_binary: bool) -> Option<DMatrix<f64>> {
	let dense = solver.system_matrix()?.to_dense().abs();
	if as_binary {
		Some(dense.map(|x| if x > 0.0 { 1.0 } else { 0.0 }))
	} else {
		Some(dense)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::animator::Still;

	#[test]
	fn test_kinematic_placement() {
		let mut scene = Scene::default();
		let shape = Shape::rectangle(V2::new(3., 1.), 2., 2.).unwrap();
		let fixed = add_kinematic(&mut scene, &shape, None).unwrap();
		let k = scene.kinematic(fixed).unwrap();
		assert!((k.state.position - V2::new(3., 1.)).norm() < 1e-12);
		assert_eq!(get_shape_from_kinematic(&scene, fixed).unwrap().vertex, shape.vertex);

		let local = Shape::rectangle(V2::zeros(), 2., 2.).unwrap();
		let animated = add_kinematic(&mut scene, &local, Some(Box::new(Still(V2::new(0., 5.), 0.0)))).unwrap();
		let k = scene.kinematic(animated).unwrap();
		assert!((k.vertices()[0] - V2::new(-1., 4.)).norm() < 1e-12);
	}

	#[test]
	fn test_normals() {
		let mut scene = Scene::default();
		let shape = Shape::rectangle(V2::zeros(), 2., 2.).unwrap();
		add_kinematic(&mut scene, &shape, None).unwrap();
		let normals = get_normals_from_kinematic(&scene, 0, 0.5).unwrap();
		assert_eq!(normals.len(), 4);
		assert!((normals[0][0] - V2::new(0., -1.)).norm() < 1e-12);
		assert!((normals[0][1] - V2::new(0., -1.5)).norm() < 1e-12);
		assert!(get_normals_from_kinematic(&scene, 1, 0.5).is_err());
	}

	#[test]
	fn test_dense_matrix_before_and_after_step() {
		let mut scene = Scene::default();
		let wire = Shape::wire(V2::zeros(), V2::new(1., 0.), 2).unwrap();
		let dynamic = add_dynamic(&mut scene, &wire, 1.0).unwrap();
		add_edge_constraint(&mut scene, dynamic, 1.0, 0.0).unwrap();
		let mut solver = Solver::default();
		let mut context = Context::default();
		let mut profiler = Profiler::default();
		initialize(&mut scene, &mut solver, &context).unwrap();
		assert!(get_sparse_matrix_as_dense(&solver, false).is_none());
		solve_to_next_frame(&mut scene, &mut solver, &mut context, &mut profiler).unwrap();
		let pattern = get_sparse_matrix_as_dense(&solver, true).unwrap();
		assert_eq!(pattern.shape(), (6, 6));
		// nodes 0 and 2 share no constraint
		assert_eq!(pattern[(0, 4)], 0.0);
		assert_eq!(pattern[(0, 0)], 1.0);
		assert_eq!(get_segments_from_constraint(&scene, 0).unwrap().len(), 2);
		assert_eq!(get_nodes_from_dynamic(&scene, dynamic).unwrap().len(), 3);
	}
}
