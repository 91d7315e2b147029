//! Animated rigid obstacles.

use crate::error::{Error, Result};
use crate::geometry;
use crate::math2d;
use crate::shape::Shape;
use crate::{M2, V2};

/// A point on a kinematic boundary: edge index and parameter along the edge.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParametricPoint {
	pub index: usize,
	pub t: f64,
}

impl ParametricPoint {
	pub fn new(index: usize, t: f64) -> Self {
		Self { index, t }
	}
}

/// Rigid pose and its time derivatives. Rotations are in degrees.
#[derive(Debug, Clone)]
pub struct KinematicState {
	pub position: V2,
	pub rotation: f64,
	pub linear_velocity: V2,
	pub angular_velocity: f64,
	rotation_matrix: M2,
}

impl KinematicState {
	pub fn new(position: V2, rotation: f64) -> Self {
		Self {
			position,
			rotation,
			linear_velocity: V2::zeros(),
			angular_velocity: 0.0,
			rotation_matrix: math2d::rotation_matrix(rotation),
		}
	}

	/// Records a new pose. Velocities are derived from the previous pose
	/// when `dt > 0` and left untouched otherwise.
	pub fn update(&mut self, position: V2, rotation: f64, dt: f64) {
		if dt > 0.0 {
			let inv_dt = 1.0 / dt;
			self.linear_velocity = (position - self.position) * inv_dt;
			self.angular_velocity = shortest_angle(self.rotation, rotation) * inv_dt;
		}
		self.position = position;
		self.rotation = rotation;
		self.rotation_matrix = math2d::rotation_matrix(rotation);
	}

	pub fn rotation_matrix(&self) -> &M2 {
		&self.rotation_matrix
	}
}

/// Signed rotation from `from` to `to` in `(-180, 180]` degrees.
pub fn shortest_angle(from: f64, to: f64) -> f64 {
	let delta = (to - from).rem_euclid(360.0);
	if delta > 180.0 {
		delta - 360.0
	} else {
		delta
	}
}

#[derive(Debug, Clone)]
pub struct Kinematic {
	index: usize,
	pub state: KinematicState,
	local_vertex: Vec<V2>,
	vertex: Vec<V2>,
	surface_edges: Vec<[usize; 2]>,
	local_normals: Vec<V2>,
	normals: Vec<V2>,
	faces: Vec<[usize; 3]>,
}

impl Kinematic {
	/// `shape` is in local space. It needs at least one boundary edge.
	pub fn new(shape: &Shape, position: V2, rotation: f64) -> Result<Self> {
		let (surface_edges, local_normals) = shape.surface_edges();
		if surface_edges.is_empty() {
			return Err(Error::InvalidShape("a kinematic needs boundary edges".to_string()));
		}
		let mut result = Self {
			index: 0,
			state: KinematicState::new(position, rotation),
			local_vertex: shape.vertex.clone(),
			vertex: shape.vertex.clone(),
			normals: local_normals.clone(),
			surface_edges,
			local_normals,
			faces: shape.face.clone(),
		};
		result.update_vertices();
		Ok(result)
	}

	pub fn index(&self) -> usize {
		self.index
	}

	pub(crate) fn set_index(&mut self, index: usize) {
		self.index = index;
	}

	pub fn update(&mut self, position: V2, rotation: f64, dt: f64) {
		self.state.update(position, rotation, dt);
		self.update_vertices();
	}

	fn update_vertices(&mut self) {
		let r = *self.state.rotation_matrix();
		let p = self.state.position;
		for (world, local) in self.vertex.iter_mut().zip(&self.local_vertex) {
			*world = r * local + p;
		}
		for (world, local) in self.normals.iter_mut().zip(&self.local_normals) {
			*world = r * local;
		}
	}

	pub fn vertices(&self) -> &[V2] {
		&self.vertex
	}

	pub fn surface_edges(&self) -> &[[usize; 2]] {
		&self.surface_edges
	}

	/// World space outward normals, one per surface edge.
	pub fn normals(&self) -> &[V2] {
		&self.normals
	}

	pub fn faces(&self) -> &[[usize; 3]] {
		&self.faces
	}

	pub fn check_parametric_point(&self, param: &ParametricPoint) -> Result<()> {
		if param.index >= self.surface_edges.len() {
			return Err(Error::InvalidEdge {
				kinematic: self.index,
				edge: param.index,
			});
		}
		if !(0.0..=1.0).contains(&param.t) {
			return Err(Error::InvalidParameter(format!("parametric value {} outside [0, 1]", param.t)));
		}
		Ok(())
	}

	pub fn closest_parametric_point(&self, point: &V2) -> ParametricPoint {
		let (index, t) = geometry::closest_parametric_value(point, &self.vertex, &self.surface_edges);
		ParametricPoint { index, t }
	}

	pub fn position_from_parametric_point(&self, param: &ParametricPoint) -> V2 {
		let [v0, v1] = self.surface_edges[param.index];
		self.vertex[v0] * (1.0 - param.t) + self.vertex[v1] * param.t
	}

	pub fn normal_from_parametric_point(&self, param: &ParametricPoint) -> V2 {
		self.normals[param.index]
	}

	/// Velocity of the body at a world space point. Positive angular
	/// velocity turns clockwise.
	pub fn velocity_at(&self, point: &V2) -> V2 {
		let omega = self.state.angular_velocity.to_radians();
		let r = point - self.state.position;
		self.state.linear_velocity + V2::new(r[1], -r[0]) * omega
	}

	pub fn is_inside(&self, point: &V2) -> bool {
		geometry::is_inside(point, &self.vertex, &self.faces)
	}

	/// Current world space geometry.
	pub fn as_shape(&self) -> Shape {
		Shape {
			vertex: self.vertex.clone(),
			edge: self.surface_edges.clone(),
			face: self.faces.clone(),
		}
	}
}
