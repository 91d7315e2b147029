//! Vertex/edge/face descriptions used to build dynamics and kinematics.

use fnv::FnvHashMap;

use crate::error::{Error, Result};
use crate::math2d;
use crate::V2;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
	pub vertex: Vec<V2>,
	pub edge: Vec<[usize; 2]>,
	pub face: Vec<[usize; 3]>,
}

impl Shape {
	pub fn new(vertex: Vec<V2>, edge: Vec<[usize; 2]>, face: Vec<[usize; 3]>) -> Result<Self> {
		let n = vertex.len();
		let bad_edge = edge.iter().flatten().any(|&i| i >= n);
		let bad_face = face.iter().flatten().any(|&i| i >= n);
		if bad_edge || bad_face {
			return Err(Error::InvalidShape(format!("vertex index out of range ({} vertices)", n)));
		}
		Ok(Self { vertex, edge, face })
	}

	pub fn num_vertices(&self) -> usize {
		self.vertex.len()
	}

	pub fn num_edges(&self) -> usize {
		self.edge.len()
	}

	pub fn num_faces(&self) -> usize {
		self.face.len()
	}

	/// Moves the vertices to local space around their centroid and returns
	/// that centroid with a zero rotation.
	pub fn extract_transform(&mut self) -> (V2, f64) {
		if self.vertex.is_empty() {
			return (V2::zeros(), 0.0);
		}
		let centroid = self.vertex.iter().sum::<V2>() / self.vertex.len() as f64;
		self.vertex.iter_mut().for_each(|v| *v -= centroid);
		(centroid, 0.0)
	}

	/// Boundary edges with their outward unit normals.
	///
	/// With faces, the boundary is every face edge used by exactly one face,
	/// oriented like its face. Without faces every edge is boundary and its
	/// normal points to the right of `v0 -> v1`.
	pub fn surface_edges(&self) -> (Vec<[usize; 2]>, Vec<V2>) {
		if self.face.is_empty() {
			let normals = self
				.edge
				.iter()
				.map(|[a, b]| right_normal(&self.vertex[*a], &self.vertex[*b]))
				.collect();
			return (self.edge.clone(), normals);
		}
		let mut count: FnvHashMap<(usize, usize), usize> = FnvHashMap::default();
		for [a, b, c] in self.face.iter() {
			for (i, j) in [(*a, *b), (*b, *c), (*c, *a)] {
				*count.entry((i.min(j), i.max(j))).or_insert(0) += 1;
			}
		}
		let mut edges = Vec::new();
		let mut normals = Vec::new();
		for [a, b, c] in self.face.iter() {
			let ccw = math2d::area(&self.vertex[*a], &self.vertex[*b], &self.vertex[*c]) >= 0.0;
			for (i, j) in [(*a, *b), (*b, *c), (*c, *a)] {
				if count[&(i.min(j), i.max(j))] != 1 {
					continue;
				}
				let n = right_normal(&self.vertex[i], &self.vertex[j]);
				edges.push([i, j]);
				normals.push(if ccw { n } else { -n });
			}
		}
		(edges, normals)
	}

	/// Straight polyline from `start` to `end` split into `num_edges` edges.
	pub fn wire(start: V2, end: V2, num_edges: usize) -> Result<Self> {
		if num_edges == 0 {
			return Err(Error::InvalidShape("a wire needs at least one edge".to_string()));
		}
		let vertex = (0..=num_edges)
			.map(|i| start + (end - start) * (i as f64 / num_edges as f64))
			.collect();
		let edge = (0..num_edges).map(|i| [i, i + 1]).collect();
		Self::new(vertex, edge, Vec::new())
	}

	/// Regular grid of `cell_x * cell_y` cells, two triangles per cell,
	/// with `position` as lower-left corner.
	pub fn beam(position: V2, width: f64, height: f64, cell_x: usize, cell_y: usize) -> Result<Self> {
		if cell_x == 0 || cell_y == 0 {
			return Err(Error::InvalidShape("a beam needs at least one cell".to_string()));
		}
		let id = |i: usize, j: usize| i * (cell_y + 1) + j;
		let mut vertex = Vec::with_capacity((cell_x + 1) * (cell_y + 1));
		for i in 0..=cell_x {
			for j in 0..=cell_y {
				let x = position[0] + width * i as f64 / cell_x as f64;
				let y = position[1] + height * j as f64 / cell_y as f64;
				vertex.push(V2::new(x, y));
			}
		}
		let mut edge = Vec::new();
		let mut face = Vec::new();
		for i in 0..=cell_x {
			for j in 0..=cell_y {
				if i < cell_x {
					edge.push([id(i, j), id(i + 1, j)]);
				}
				if j < cell_y {
					edge.push([id(i, j), id(i, j + 1)]);
				}
				if i < cell_x && j < cell_y {
					edge.push([id(i, j), id(i + 1, j + 1)]);
					edge.push([id(i + 1, j), id(i, j + 1)]);
					face.push([id(i, j), id(i + 1, j), id(i + 1, j + 1)]);
					face.push([id(i, j), id(i + 1, j + 1), id(i, j + 1)]);
				}
			}
		}
		Self::new(vertex, edge, face)
	}

	/// Convex polygon from counter-clockwise points, fan-triangulated.
	pub fn polygon(points: Vec<V2>) -> Result<Self> {
		let n = points.len();
		if n < 3 {
			return Err(Error::InvalidShape("a polygon needs three points".to_string()));
		}
		let edge = (0..n).map(|i| [i, (i + 1) % n]).collect();
		let face = (1..n - 1).map(|i| [0, i, i + 1]).collect();
		Self::new(points, edge, face)
	}

	/// Axis aligned box centered on `center`.
	pub fn rectangle(center: V2, width: f64, height: f64) -> Result<Self> {
		let (hw, hh) = (width * 0.5, height * 0.5);
		Self::polygon(vec![
			center + V2::new(-hw, -hh),
			center + V2::new(hw, -hh),
			center + V2::new(hw, hh),
			center + V2::new(-hw, hh),
		])
	}
}

fn right_normal(a: &V2, b: &V2) -> V2 {
	let d = b - a;
	let n = V2::new(d[1], -d[0]);
	let norm = n.norm();
	if norm < math2d::EPSILON {
		V2::zeros()
	} else {
		n / norm
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_rectangle_normals_point_out() {
		let shape = Shape::rectangle(V2::new(1., 1.), 2., 2.).unwrap();
		let (edges, normals) = shape.surface_edges();
		assert_eq!(edges.len(), 4);
		for ([a, b], n) in edges.iter().zip(normals.iter()) {
			let mid = (shape.vertex[*a] + shape.vertex[*b]) * 0.5;
			assert!((mid - V2::new(1., 1.)).dot(n) > 0.0);
			assert!((n.norm() - 1.0).abs() < 1e-12);
		}
	}

	#[test]
	fn test_beam_boundary() {
		let shape = Shape::beam(V2::zeros(), 3., 1., 3, 1).unwrap();
		assert_eq!(shape.num_vertices(), 8);
		assert_eq!(shape.num_faces(), 6);
		let (edges, _) = shape.surface_edges();
		// 3 + 3 along the long sides, 1 + 1 at the ends
		assert_eq!(edges.len(), 8);
	}

	#[test]
	fn test_wire() {
		let shape = Shape::wire(V2::zeros(), V2::new(2., 0.), 4).unwrap();
		assert_eq!(shape.num_vertices(), 5);
		assert_eq!(shape.edge[3], [3, 4]);
		assert!((shape.vertex[2] - V2::new(1., 0.)).norm() < 1e-15);
		assert!(Shape::wire(V2::zeros(), V2::zeros(), 0).is_err());
	}

	#[test]
	fn test_invalid_index() {
		assert!(Shape::new(vec![V2::zeros()], vec![[0, 1]], vec![]).is_err());
	}

	#[test]
	fn test_extract_transform() {
		let mut shape = Shape::rectangle(V2::new(2., 3.), 1., 1.).unwrap();
		let (pos, rot) = shape.extract_transform();
		assert!((pos - V2::new(2., 3.)).norm() < 1e-12);
		assert_eq!(rot, 0.0);
		assert!(shape.vertex.iter().sum::<V2>().norm() < 1e-12);
	}
}
