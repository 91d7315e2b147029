//! Named commands with keyword arguments over a solver session.

use fnv::FnvHashMap;
use protocol::{Kwargs, Value};

use crate::animator::{Animator, Keyframes};
use crate::commands;
use crate::config::{Context, SolverConfig, StorageConfig};
use crate::error::{Error, Result};
use crate::profiler::Profiler;
use crate::scene::Scene;
use crate::shape::Shape;
use crate::solver::Solver;
use crate::V2;

/// Everything a remote client manipulates.
#[derive(Default)]
pub struct Session {
	pub scene: Scene,
	pub solver: Solver,
	pub context: Context,
	pub profiler: Profiler,
}

impl Session {
	pub fn new(storage: StorageConfig, config: SolverConfig, context: Context) -> Self {
		Self {
			scene: Scene::new(storage),
			solver: Solver::new(config),
			context,
			profiler: Profiler::default(),
		}
	}
}

pub type Handler = fn(&mut Session, &Kwargs) -> Result<Value>;

pub struct Dispatcher {
	session: Session,
	handlers: FnvHashMap<String, Handler>,
}

impl Dispatcher {
	/// A dispatcher with every built-in command registered.
	pub fn new(session: Session) -> Self {
		let mut result = Self {
			session,
			handlers: FnvHashMap::default(),
		};
		for (name, handler) in builtin_commands() {
			result.handlers.insert(name.to_string(), handler);
		}
		result
	}

	pub fn register(&mut self, name: &str, handler: Handler) -> Result<()> {
		if name == "get_commands" || self.handlers.contains_key(name) {
			return Err(Error::DuplicateCommand(name.to_string()));
		}
		self.handlers.insert(name.to_string(), handler);
		Ok(())
	}

	pub fn session(&self) -> &Session {
		&self.session
	}

	pub fn session_mut(&mut self) -> &mut Session {
		&mut self.session
	}

	/// Sorted names of the accepted commands, `get_commands` included.
	pub fn commands(&self) -> Vec<String> {
		let mut names: Vec<String> = self.handlers.keys().cloned().collect();
		names.push("get_commands".to_string());
		names.sort();
		names
	}

	pub fn run(&mut self, name: &str, kwargs: &Kwargs) -> Result<Value> {
		if name == "get_commands" {
			return Ok(Value::List(self.commands().into_iter().map(Value::Text).collect()));
		}
		let handler = self
			.handlers
			.get(name)
			.ok_or_else(|| Error::UnknownCommand(name.to_string()))?;
		handler(&mut self.session, kwargs)
	}
}

fn arg<'a>(kwargs: &'a Kwargs, name: &str) -> Result<&'a Value> {
	kwargs.get(name).ok_or_else(|| Error::InvalidArgument(name.to_string()))
}

pub fn arg_usize(kwargs: &Kwargs, name: &str) -> Result<usize> {
	arg(kwargs, name)?
		.as_usize()
		.ok_or_else(|| Error::InvalidArgument(name.to_string()))
}

pub fn arg_f64(kwargs: &Kwargs, name: &str) -> Result<f64> {
	arg(kwargs, name)?
		.as_f64()
		.ok_or_else(|| Error::InvalidArgument(name.to_string()))
}

pub fn arg_f64_or(kwargs: &Kwargs, name: &str, default: f64) -> Result<f64> {
	match kwargs.get(name) {
		None | Some(Value::Null) => Ok(default),
		Some(_) => arg_f64(kwargs, name),
	}
}

pub fn arg_bool_or(kwargs: &Kwargs, name: &str, default: bool) -> Result<bool> {
	match kwargs.get(name) {
		None | Some(Value::Null) => Ok(default),
		Some(value) => value.as_bool().ok_or_else(|| Error::InvalidArgument(name.to_string())),
	}
}

/// First point of a `Points` argument.
pub fn arg_point(kwargs: &Kwargs, name: &str) -> Result<V2> {
	arg_points(kwargs, name)?
		.first()
		.copied()
		.ok_or_else(|| Error::InvalidArgument(name.to_string()))
}

pub fn arg_points(kwargs: &Kwargs, name: &str) -> Result<Vec<V2>> {
	let points = arg(kwargs, name)?
		.as_points()
		.ok_or_else(|| Error::InvalidArgument(name.to_string()))?;
	Ok(points.iter().map(|p| V2::new(p[0], p[1])).collect())
}

/// A `List` of numbers. Absent or null yields `None`.
pub fn arg_f64_list(kwargs: &Kwargs, name: &str) -> Result<Option<Vec<f64>>> {
	match kwargs.get(name) {
		None | Some(Value::Null) => Ok(None),
		Some(Value::List(values)) => values
			.iter()
			.map(|v| v.as_f64().ok_or_else(|| Error::InvalidArgument(name.to_string())))
			.collect::<Result<Vec<_>>>()
			.map(Some),
		Some(_) => Err(Error::InvalidArgument(name.to_string())),
	}
}

fn points(values: &[V2]) -> Value {
	Value::Points(values.iter().map(|v| [v[0], v[1]]).collect())
}

fn segments(values: &[[V2; 2]]) -> Value {
	Value::Segments(values.iter().map(|[a, b]| [[a[0], a[1]], [b[0], b[1]]]).collect())
}

fn coefficients(kwargs: &Kwargs) -> Result<(f64, f64)> {
	Ok((arg_f64(kwargs, "stiffness")?, arg_f64_or(kwargs, "damping", 0.0)?))
}

fn builtin_commands() -> Vec<(&'static str, Handler)> {
	vec![
		("add_wire", add_wire as Handler),
		("add_beam", add_beam as Handler),
		("add_rectangle_kinematic", add_rectangle_kinematic as Handler),
		("add_polygon_kinematic", add_polygon_kinematic as Handler),
		("add_edge_constraint", add_edge_constraint as Handler),
		("add_wire_bending_constraint", add_wire_bending_constraint as Handler),
		("add_face_constraint", add_face_constraint as Handler),
		("add_kinematic_attachment", add_kinematic_attachment as Handler),
		("add_dynamic_attachment", add_dynamic_attachment as Handler),
		("add_kinematic_collision", add_kinematic_collision as Handler),
		("add_gravity", add_gravity as Handler),
		("initialize", initialize as Handler),
		("solve_to_next_frame", solve_to_next_frame as Handler),
		("get_scene", get_scene as Handler),
		("get_nodes_from_dynamic", get_nodes_from_dynamic as Handler),
		("get_shape_from_kinematic", get_shape_from_kinematic as Handler),
		("get_normals_from_kinematic", get_normals_from_kinematic as Handler),
		("get_segments_from_constraint", get_segments_from_constraint as Handler),
		("get_sparse_matrix_as_dense", get_sparse_matrix_as_dense as Handler),
	]
}

fn add_wire(s: &mut Session, kwargs: &Kwargs) -> Result<Value> {
	let ends = arg_points(kwargs, "points")?;
	if ends.len() != 2 {
		return Err(Error::InvalidArgument("points".to_string()));
	}
	let shape = Shape::wire(ends[0], ends[1], arg_usize(kwargs, "num_edges")?)?;
	let index = commands::add_dynamic(&mut s.scene, &shape, arg_f64(kwargs, "node_mass")?)?;
	Ok(Value::from(index))
}

fn add_beam(s: &mut Session, kwargs: &Kwargs) -> Result<Value> {
	let shape = Shape::beam(
		arg_point(kwargs, "position")?,
		arg_f64(kwargs, "width")?,
		arg_f64(kwargs, "height")?,
		arg_usize(kwargs, "cell_x")?,
		arg_usize(kwargs, "cell_y")?,
	)?;
	let index = commands::add_dynamic(&mut s.scene, &shape, arg_f64(kwargs, "node_mass")?)?;
	Ok(Value::from(index))
}

fn add_rectangle_kinematic(s: &mut Session, kwargs: &Kwargs) -> Result<Value> {
	let shape = Shape::rectangle(
		arg_point(kwargs, "center")?,
		arg_f64(kwargs, "width")?,
		arg_f64(kwargs, "height")?,
	)?;
	Ok(Value::from(commands::add_kinematic(&mut s.scene, &shape, None)?))
}

/// `points` are world space unless `key_times` is given, in which case they
/// are local and the body follows the keys. `key_rotations` defaults to zero.
fn add_polygon_kinematic(s: &mut Session, kwargs: &Kwargs) -> Result<Value> {
	let shape = Shape::polygon(arg_points(kwargs, "points")?)?;
	let animator = match arg_f64_list(kwargs, "key_times")? {
		None => None,
		Some(times) => {
			let positions = arg_points(kwargs, "key_positions")?;
			let rotations = arg_f64_list(kwargs, "key_rotations")?.unwrap_or_else(|| vec![0.0; times.len()]);
			if times.is_empty() {
				return Err(Error::InvalidArgument("key_times".to_string()));
			}
			if positions.len() != times.len() {
				return Err(Error::InvalidArgument("key_positions".to_string()));
			}
			if rotations.len() != times.len() {
				return Err(Error::InvalidArgument("key_rotations".to_string()));
			}
			let keys = times
				.iter()
				.zip(positions.iter())
				.zip(rotations.iter())
				.fold(Keyframes::default(), |keys, ((t, x), r)| keys.with_key(*t, *x, *r));
			Some(Box::new(keys) as Box<dyn Animator>)
		}
	};
	Ok(Value::from(commands::add_kinematic(&mut s.scene, &shape, animator)?))
}

fn add_edge_constraint(s: &mut Session, kwargs: &Kwargs) -> Result<Value> {
	let (k, c) = coefficients(kwargs)?;
	let index = commands::add_edge_constraint(&mut s.scene, arg_usize(kwargs, "dynamic")?, k, c)?;
	Ok(Value::from(index))
}

fn add_wire_bending_constraint(s: &mut Session, kwargs: &Kwargs) -> Result<Value> {
	let (k, c) = coefficients(kwargs)?;
	let index = commands::add_wire_bending_constraint(&mut s.scene, arg_usize(kwargs, "dynamic")?, k, c)?;
	Ok(Value::from(index))
}

fn add_face_constraint(s: &mut Session, kwargs: &Kwargs) -> Result<Value> {
	let (k, c) = coefficients(kwargs)?;
	let index = commands::add_face_constraint(&mut s.scene, arg_usize(kwargs, "dynamic")?, k, c)?;
	Ok(Value::from(index))
}

fn add_kinematic_attachment(s: &mut Session, kwargs: &Kwargs) -> Result<Value> {
	let (k, c) = coefficients(kwargs)?;
	let index = commands::add_kinematic_attachment(
		&mut s.scene,
		arg_usize(kwargs, "dynamic")?,
		arg_usize(kwargs, "kinematic")?,
		k,
		c,
		arg_f64(kwargs, "distance")?,
	)?;
	Ok(Value::from(index))
}

fn add_dynamic_attachment(s: &mut Session, kwargs: &Kwargs) -> Result<Value> {
	let (k, c) = coefficients(kwargs)?;
	let index = commands::add_dynamic_attachment(
		&mut s.scene,
		arg_usize(kwargs, "dynamic0")?,
		arg_usize(kwargs, "dynamic1")?,
		k,
		c,
		arg_f64(kwargs, "distance")?,
	)?;
	Ok(Value::from(index))
}

fn add_kinematic_collision(s: &mut Session, kwargs: &Kwargs) -> Result<Value> {
	let (k, c) = coefficients(kwargs)?;
	Ok(Value::from(commands::add_kinematic_collision(&mut s.scene, k, c)?))
}

fn add_gravity(s: &mut Session, kwargs: &Kwargs) -> Result<Value> {
	let g = arg_point(kwargs, "gravity")?;
	Ok(Value::from(commands::add_gravity(&mut s.scene, g)))
}

fn initialize(s: &mut Session, _kwargs: &Kwargs) -> Result<Value> {
	commands::initialize(&mut s.scene, &mut s.solver, &s.context)?;
	Ok(Value::Null)
}

/// Replies with the new frame index.
fn solve_to_next_frame(s: &mut Session, _kwargs: &Kwargs) -> Result<Value> {
	s.profiler.clear_logs();
	commands::solve_to_next_frame(&mut s.scene, &mut s.solver, &mut s.context, &mut s.profiler)?;
	s.profiler.print_logs();
	Ok(Value::from(s.context.frame as usize))
}

fn get_scene(s: &mut Session, _kwargs: &Kwargs) -> Result<Value> {
	Ok(Value::Model(s.scene.pr_model(s.context.time)))
}

fn get_nodes_from_dynamic(s: &mut Session, kwargs: &Kwargs) -> Result<Value> {
	let nodes = commands::get_nodes_from_dynamic(&s.scene, arg_usize(kwargs, "dynamic")?)?;
	Ok(points(&nodes))
}

fn get_shape_from_kinematic(s: &mut Session, kwargs: &Kwargs) -> Result<Value> {
	let shape = commands::get_shape_from_kinematic(&s.scene, arg_usize(kwargs, "kinematic")?)?;
	let edges: Vec<[V2; 2]> = shape.edge.iter().map(|[a, b]| [shape.vertex[*a], shape.vertex[*b]]).collect();
	Ok(Value::List(vec![points(&shape.vertex), segments(&edges)]))
}

fn get_normals_from_kinematic(s: &mut Session, kwargs: &Kwargs) -> Result<Value> {
	let scale = arg_f64_or(kwargs, "normal_scale", 0.2)?;
	let normals = commands::get_normals_from_kinematic(&s.scene, arg_usize(kwargs, "kinematic")?, scale)?;
	Ok(segments(&normals))
}

fn get_segments_from_constraint(s: &mut Session, kwargs: &Kwargs) -> Result<Value> {
	let segs = commands::get_segments_from_constraint(&s.scene, arg_usize(kwargs, "condition")?)?;
	Ok(segments(&segs))
}

fn get_sparse_matrix_as_dense(s: &mut Session, kwargs: &Kwargs) -> Result<Value> {
	let as_binary = arg_bool_or(kwargs, "as_binary", false)?;
	Ok(match commands::get_sparse_matrix_as_dense(&s.solver, as_binary) {
		Some(dense) => Value::Matrix {
			rows: dense.nrows(),
			cols: dense.ncols(),
			data: dense.transpose().as_slice().to_vec(),
		},
		None => Value::Null,
	})
}

#[cfg(test)]
mod test {
	use super::*;

	fn kwargs(pairs: &[(&str, Value)]) -> Kwargs {
		pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
	}

	fn wire_session() -> Dispatcher {
		let mut dispatcher = Dispatcher::new(Session::default());
		let wire = kwargs(&[
			("points", Value::Points(vec![[0., 0.], [0., -2.]])),
			("num_edges", Value::Int(4)),
			("node_mass", Value::Float(0.001)),
		]);
		assert_eq!(dispatcher.run("add_wire", &wire).unwrap(), Value::Int(0));
		let edge = kwargs(&[("dynamic", Value::Int(0)), ("stiffness", Value::Float(1.0))]);
		assert_eq!(dispatcher.run("add_edge_constraint", &edge).unwrap(), Value::Int(0));
		dispatcher
	}

	#[test]
	fn test_commands_listed() {
		let mut dispatcher = Dispatcher::new(Session::default());
		let names = dispatcher.commands();
		assert!(names.contains(&"get_commands".to_string()));
		assert!(names.windows(2).all(|w| w[0] < w[1]));
		match dispatcher.run("get_commands", &Kwargs::new()).unwrap() {
			Value::List(values) => assert_eq!(values.len(), names.len()),
			other => panic!("unexpected {:?}", other),
		}
	}

	#[test]
	fn test_unknown_and_duplicate() {
		let mut dispatcher = Dispatcher::new(Session::default());
		assert!(matches!(
			dispatcher.run("explode", &Kwargs::new()),
			Err(Error::UnknownCommand(_))
		));
		assert!(matches!(
			dispatcher.register("initialize", initialize),
			Err(Error::DuplicateCommand(_))
		));
		assert!(dispatcher.register("init_again", initialize).is_ok());
		assert!(dispatcher.run("init_again", &Kwargs::new()).unwrap().is_null());
	}

	#[test]
	fn test_missing_argument() {
		let mut dispatcher = Dispatcher::new(Session::default());
		let result = dispatcher.run("add_edge_constraint", &kwargs(&[("stiffness", Value::Float(1.0))]));
		assert!(matches!(result, Err(Error::InvalidArgument(name)) if name == "dynamic"));
	}

	#[test]
	fn test_frame_round() {
		let mut dispatcher = wire_session();
		let g = kwargs(&[("gravity", Value::Points(vec![[0., -9.81]]))]);
		dispatcher.run("add_gravity", &g).unwrap();
		dispatcher.run("initialize", &Kwargs::new()).unwrap();
		assert_eq!(dispatcher.run("solve_to_next_frame", &Kwargs::new()).unwrap(), Value::Int(1));
		let nodes = dispatcher.run("get_nodes_from_dynamic", &kwargs(&[("dynamic", Value::Int(0))])).unwrap();
		let nodes = nodes.as_points().unwrap().to_vec();
		assert_eq!(nodes.len(), 5);
		assert!(nodes[0][1] < 0.0);
		let segs = dispatcher
			.run("get_segments_from_constraint", &kwargs(&[("condition", Value::Int(0))]))
			.unwrap();
		assert!(matches!(segs, Value::Segments(s) if s.len() == 4));
		match dispatcher.run("get_sparse_matrix_as_dense", &Kwargs::new()).unwrap() {
			Value::Matrix { rows, cols, data } => {
				assert_eq!((rows, cols), (10, 10));
				assert_eq!(data.len(), 100);
			}
			other => panic!("unexpected {:?}", other),
		}
		let model = dispatcher.run("get_scene", &Kwargs::new()).unwrap();
		assert_eq!(model.as_model().unwrap().particles.len(), 5);
	}

	fn triangle() -> Value {
		Value::Points(vec![[-1., 0.], [1., 0.], [0., 1.]])
	}

	#[test]
	fn test_polygon_kinematic_follows_keys() {
		let mut dispatcher = Dispatcher::new(Session::new(
			StorageConfig::default(),
			SolverConfig::default(),
			Context::new(1.0, 2),
		));
		let still = kwargs(&[("points", triangle())]);
		assert_eq!(dispatcher.run("add_polygon_kinematic", &still).unwrap(), Value::Int(0));
		let animated = kwargs(&[
			("points", triangle()),
			("key_times", Value::List(vec![Value::Float(0.0), Value::Int(1)])),
			("key_positions", Value::Points(vec![[0., -5.], [0., -3.]])),
		]);
		assert_eq!(dispatcher.run("add_polygon_kinematic", &animated).unwrap(), Value::Int(1));
		let start = dispatcher.session().scene.kinematic(1).unwrap().vertices().to_vec();
		assert!((start[2] - V2::new(0., -4.)).norm() < 1e-12);

		dispatcher.run("initialize", &Kwargs::new()).unwrap();
		dispatcher.run("solve_to_next_frame", &Kwargs::new()).unwrap();
		let scene = &dispatcher.session().scene;
		let moved = scene.kinematic(1).unwrap().vertices();
		for (a, b) in start.iter().zip(moved.iter()) {
			assert!((b - a - V2::new(0., 2.)).norm() < 1e-12);
		}
		let fixed = scene.kinematic(0).unwrap().vertices();
		assert!((fixed[0] - V2::new(-1., 0.)).norm() < 1e-12);
	}

	#[test]
	fn test_polygon_kinematic_rejects_bad_keys() {
		let mut dispatcher = Dispatcher::new(Session::default());
		let mismatched = kwargs(&[
			("points", triangle()),
			("key_times", Value::List(vec![Value::Float(0.0), Value::Float(1.0)])),
			("key_positions", Value::Points(vec![[0., 0.]])),
		]);
		let result = dispatcher.run("add_polygon_kinematic", &mismatched);
		assert!(matches!(result, Err(Error::InvalidArgument(name)) if name == "key_positions"));
		let not_numbers = kwargs(&[
			("points", triangle()),
			("key_times", Value::List(vec![Value::Text("soon".to_string())])),
			("key_positions", Value::Points(vec![[0., 0.]])),
		]);
		let result = dispatcher.run("add_polygon_kinematic", &not_numbers);
		assert!(matches!(result, Err(Error::InvalidArgument(name)) if name == "key_times"));
		let two_points = kwargs(&[("points", Value::Points(vec![[0., 0.], [1., 0.]]))]);
		assert!(matches!(
			dispatcher.run("add_polygon_kinematic", &two_points),
			Err(Error::InvalidShape(_))
		));
		assert!(dispatcher.session().scene.kinematics().is_empty());
	}
}
