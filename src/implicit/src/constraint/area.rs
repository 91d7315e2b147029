//! Signed area preservation of a triangle.

use super::{ConstraintLaw, SceneView};
use crate::math2d::{self, outer};
use crate::{M2, V2};

/// `∂A/∂xi` for the signed area `A` of `(x0, x1, x2)`.
pub fn area_gradients(x0: &V2, x1: &V2, x2: &V2) -> [V2; 3] {
	[
		V2::new(x1[1] - x2[1], x2[0] - x1[0]) * 0.5,
		V2::new(x2[1] - x0[1], x0[0] - x2[0]) * 0.5,
		V2::new(x0[1] - x1[1], x1[0] - x0[0]) * 0.5,
	]
}

/// `∂²A/∂xi∂xj`, constant for a triangle.
fn area_hessian(i: usize, j: usize) -> M2 {
	let s = M2::new(0.0, 0.5, -0.5, 0.0);
	match (3 + j - i) % 3 {
		0 => M2::zeros(),
		1 => s,
		_ => -s,
	}
}

pub fn area_energy(x0: &V2, x1: &V2, x2: &V2, rest_area: f64, stiffness: f64) -> f64 {
	let d = math2d::area(x0, x1, x2) - rest_area;
	0.5 * stiffness * d * d
}

pub fn area_forces(x: &[V2; 3], v: &[V2; 3], rest_area: f64, stiffness: f64, damping: f64) -> [V2; 3] {
	let g = area_gradients(&x[0], &x[1], &x[2]);
	let d = math2d::area(&x[0], &x[1], &x[2]) - rest_area;
	let rate: f64 = g.iter().zip(v.iter()).map(|(g, v)| g.dot(v)).sum();
	let scale = -(stiffness * d + damping * rate);
	[g[0] * scale, g[1] * scale, g[2] * scale]
}

pub struct Area;

impl Area {
	pub fn rest_area(view: &SceneView, ids: &[usize; 3]) -> f64 {
		math2d::area(view.nodes.x(ids[0]), view.nodes.x(ids[1]), view.nodes.x(ids[2]))
	}

	fn state(view: &SceneView, ids: &[usize; 3]) -> ([V2; 3], [V2; 3]) {
		let mut x = [V2::zeros(); 3];
		let mut v = [V2::zeros(); 3];
		for (i, id) in ids.iter().enumerate() {
			let (xi, vi) = view.nodes.xv(*id);
			x[i] = *xi;
			v[i] = *vi;
		}
		(x, v)
	}
}

impl ConstraintLaw<3> for Area {
	type Params = f64;

	fn compute_forces(view: &SceneView, ids: &[usize; 3], k: f64, c: f64, rest: &f64) -> [V2; 3] {
		let (x, v) = Self::state(view, ids);
		area_forces(&x, &v, *rest, k, c)
	}

	fn compute_jacobians(
		view: &SceneView,
		ids: &[usize; 3],
		k: f64,
		c: f64,
		rest: &f64,
		dfdx: &mut [[M2; 3]; 3],
		dfdv: &mut [[M2; 3]; 3],
	) {
		let (x, _) = Self::state(view, ids);
		let g = area_gradients(&x[0], &x[1], &x[2]);
		let d = math2d::area(&x[0], &x[1], &x[2]) - rest;
		for i in 0..3 {
			for j in 0..3 {
				let gg = outer(&g[i], &g[j]);
				dfdx[i][j] = (gg + area_hessian(i, j) * d) * -k;
				dfdv[i][j] = gg * -c;
			}
		}
	}

	fn energy(view: &SceneView, ids: &[usize; 3], k: f64, rest: &f64) -> f64 {
		let (x, _) = Self::state(view, ids);
		area_energy(&x[0], &x[1], &x[2], *rest, k)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::node::NodeStore;
	use approx::assert_relative_eq;

	fn triangle() -> [V2; 3] {
		[V2::new(0.0, 0.0), V2::new(1.2, 0.1), V2::new(0.3, 0.9)]
	}

	#[test]
	fn test_rest_area() {
		let mut nodes = NodeStore::new(8, 8);
		nodes.append(&[V2::zeros(), V2::new(2., 0.), V2::new(0., 1.)], 1.0).unwrap();
		let view = SceneView {
			nodes: &nodes,
			kinematics: &[],
		};
		let rest = Area::rest_area(&view, &[0, 1, 2]);
		assert_eq!(rest, 1.0);
		let f = Area::compute_forces(&view, &[0, 1, 2], 5.0, 0.0, &rest);
		assert_eq!(f, [V2::zeros(); 3]);
	}

	#[test]
	fn test_forces_are_negative_energy_gradient() {
		let x = triangle();
		let (rest, k) = (0.2, 3.0);
		let f = area_forces(&x, &[V2::zeros(); 3], rest, k, 0.0);
		let h = 1e-6;
		for node in 0..3 {
			for axis in 0..2 {
				let mut plus = x;
				let mut minus = x;
				plus[node][axis] += h;
				minus[node][axis] -= h;
				let ep = area_energy(&plus[0], &plus[1], &plus[2], rest, k);
				let em = area_energy(&minus[0], &minus[1], &minus[2], rest, k);
				assert_relative_eq!(f[node][axis], -(ep - em) / (2.0 * h), epsilon = 1e-6);
			}
		}
	}

	#[test]
	fn test_jacobian_matches_finite_difference() {
		let mut nodes = NodeStore::new(8, 8);
		let x = triangle();
		nodes.append(&x, 1.0).unwrap();
		let view = SceneView {
			nodes: &nodes,
			kinematics: &[],
		};
		let (rest, k) = (0.2, 3.0);
		let mut dfdx = [[M2::zeros(); 3]; 3];
		let mut dfdv = [[M2::zeros(); 3]; 3];
		Area::compute_jacobians(&view, &[0, 1, 2], k, 0.0, &rest, &mut dfdx, &mut dfdv);
		let h = 1e-6;
		for j in 0..3 {
			for axis in 0..2 {
				let mut plus = x;
				let mut minus = x;
				plus[j][axis] += h;
				minus[j][axis] -= h;
				let fp = area_forces(&plus, &[V2::zeros(); 3], rest, k, 0.0);
				let fm = area_forces(&minus, &[V2::zeros(); 3], rest, k, 0.0);
				for i in 0..3 {
					let column = (fp[i] - fm[i]) / (2.0 * h);
					assert_relative_eq!(column, dfdx[i][j].column(axis).into_owned(), epsilon = 1e-6);
				}
			}
		}
		for i in 0..3 {
			for j in 0..3 {
				assert_relative_eq!(dfdx[i][j], dfdx[j][i].transpose(), epsilon = 1e-12);
				assert_eq!(dfdv[i][j], M2::zeros());
			}
		}
	}

	#[test]
	fn test_damping_resists_expansion() {
		let x = triangle();
		let g = area_gradients(&x[0], &x[1], &x[2]);
		let rest = math2d::area(&x[0], &x[1], &x[2]);
		let f = area_forces(&x, &g, rest, 0.0, 1.0);
		for i in 0..3 {
			assert!(f[i].dot(&g[i]) < 0.0);
		}
	}
}
