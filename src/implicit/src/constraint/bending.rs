//! Bending resistance at the middle node of a three node polyline.
//!
//! The energy is `½·k·(θ − θ₀)²·(|u| + |v|)/2` with `u = x0 − x1`,
//! `v = x1 − x2` and `θ` the signed turning angle. Weighting by the mean edge
//! length keeps a uniformly stiff wire independent of its discretization.

use super::{ConstraintLaw, SceneView};
use crate::math2d::{self, EPSILON};
use crate::{M2, V2};

/// Perturbation used for the finite difference Jacobians.
pub const STENCIL: f64 = 1e-6;

pub fn bending_energy(x0: &V2, x1: &V2, x2: &V2, rest_angle: f64, stiffness: f64) -> f64 {
	let u = x0 - x1;
	let v = x1 - x2;
	let diff = math2d::angle(x0, x1, x2) - rest_angle;
	0.5 * stiffness * diff * diff * (u.norm() + v.norm()) * 0.5
}

/// Negative gradient of [`bending_energy`] for each node.
pub fn elastic_bending_forces(x0: &V2, x1: &V2, x2: &V2, rest_angle: f64, stiffness: f64) -> [V2; 3] {
	let u = x0 - x1;
	let v = x1 - x2;
	let (lu, lv) = (u.norm(), v.norm());
	let det = math2d::cross(&u, &v);
	let dot = u.dot(&v);
	let r2 = det * det + dot * dot;
	if lu < EPSILON || lv < EPSILON || r2 < EPSILON * EPSILON {
		return [V2::zeros(); 3];
	}
	let diff = det.atan2(dot) - rest_angle;
	let length = (lu + lv) * 0.5;

	// ∂θ/∂x0 and ∂θ/∂x2
	let dtheta0 = V2::new(dot * v[1] - det * v[0], -dot * v[0] - det * v[1]) / r2;
	let dtheta2 = V2::new(dot * u[1] + det * u[0], det * u[1] - dot * u[0]) / r2;

	let angular = stiffness * diff * length;
	let radial = 0.25 * stiffness * diff * diff;
	let f0 = -dtheta0 * angular - u * (radial / lu);
	let f2 = -dtheta2 * angular + v * (radial / lv);
	[f0, -(f0 + f2), f2]
}

/// `∂fi/∂xj` by central differences with step `stencil`. The upper blocks
/// are differentiated and the lower ones mirrored as their transposes, so
/// the result is exactly symmetric.
pub fn bending_jacobians(
	x: [V2; 3],
	rest_angle: f64,
	stiffness: f64,
	stencil: f64,
) -> [[M2; 3]; 3] {
	let mut result = [[M2::zeros(); 3]; 3];
	for j in 0..3 {
		for axis in 0..2 {
			let mut plus = x;
			let mut minus = x;
			plus[j][axis] += stencil;
			minus[j][axis] -= stencil;
			let fp = elastic_bending_forces(&plus[0], &plus[1], &plus[2], rest_angle, stiffness);
			let fm = elastic_bending_forces(&minus[0], &minus[1], &minus[2], rest_angle, stiffness);
			for i in 0..=j {
				let column = (fp[i] - fm[i]) / (2.0 * stencil);
				result[i][j].set_column(axis, &column);
			}
		}
	}
	for i in 0..3 {
		result[i][i] = (result[i][i] + result[i][i].transpose()) * 0.5;
		for j in 0..i {
			result[i][j] = result[j][i].transpose();
		}
	}
	result
}

pub struct Bending;

impl Bending {
	pub fn rest_angle(view: &SceneView, ids: &[usize; 3]) -> f64 {
		math2d::angle(view.nodes.x(ids[0]), view.nodes.x(ids[1]), view.nodes.x(ids[2]))
	}

	fn positions(view: &SceneView, ids: &[usize; 3]) -> [V2; 3] {
		[*view.nodes.x(ids[0]), *view.nodes.x(ids[1]), *view.nodes.x(ids[2])]
	}
}

impl ConstraintLaw<3> for Bending {
	type Params = f64;

	fn compute_forces(view: &SceneView, ids: &[usize; 3], k: f64, _c: f64, rest: &f64) -> [V2; 3] {
		let [x0, x1, x2] = Self::positions(view, ids);
		elastic_bending_forces(&x0, &x1, &x2, *rest, k)
	}

	fn compute_jacobians(
		view: &SceneView,
		ids: &[usize; 3],
		k: f64,
		_c: f64,
		rest: &f64,
		dfdx: &mut [[M2; 3]; 3],
		dfdv: &mut [[M2; 3]; 3],
	) {
		*dfdx = bending_jacobians(Self::positions(view, ids), *rest, k, STENCIL);
		*dfdv = [[M2::zeros(); 3]; 3];
	}

	fn energy(view: &SceneView, ids: &[usize; 3], k: f64, rest: &f64) -> f64 {
		let [x0, x1, x2] = Self::positions(view, ids);
		bending_energy(&x0, &x1, &x2, *rest, k)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::node::NodeStore;
	use approx::assert_relative_eq;

	fn bent() -> [V2; 3] {
		[V2::new(-1.0, 0.2), V2::new(0.1, 0.0), V2::new(0.9, 0.7)]
	}

	#[test]
	fn test_rest_angle_from_geometry() {
		let mut nodes = NodeStore::new(8, 8);
		nodes.append(&[V2::zeros(), V2::new(1., 0.), V2::new(1., 1.)], 1.0).unwrap();
		let view = SceneView {
			nodes: &nodes,
			kinematics: &[],
		};
		let rest = Bending::rest_angle(&view, &[0, 1, 2]);
		assert_relative_eq!(rest.abs(), std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
		let f = Bending::compute_forces(&view, &[0, 1, 2], 1.0, 0.0, &rest);
		assert!(f.iter().all(|f| f.norm() < 1e-12));
	}

	#[test]
	fn test_forces_are_negative_energy_gradient() {
		let x = bent();
		let (rest, k) = (0.3, 2.0);
		let f = elastic_bending_forces(&x[0], &x[1], &x[2], rest, k);
		let h = 1e-6;
		for node in 0..3 {
			for axis in 0..2 {
				let mut plus = x;
				let mut minus = x;
				plus[node][axis] += h;
				minus[node][axis] -= h;
				let ep = bending_energy(&plus[0], &plus[1], &plus[2], rest, k);
				let em = bending_energy(&minus[0], &minus[1], &minus[2], rest, k);
				assert_relative_eq!(f[node][axis], -(ep - em) / (2.0 * h), epsilon = 1e-6);
			}
		}
		assert_relative_eq!(f[0] + f[1] + f[2], V2::zeros(), epsilon = 1e-12);
	}

	#[test]
	fn test_jacobian_stable_under_halved_stencil() {
		let x = bent();
		let a = bending_jacobians(x, 0.3, 2.0, STENCIL);
		let b = bending_jacobians(x, 0.3, 2.0, STENCIL * 0.5);
		let scale = a.iter().flatten().map(|m| m.abs().max()).fold(0.0, f64::max);
		assert!(scale > 0.0);
		for (ma, mb) in a.iter().flatten().zip(b.iter().flatten()) {
			assert!((ma - mb).abs().max() <= 1e-4 * scale);
		}
	}

	#[test]
	fn test_jacobian_is_symmetric() {
		let j = bending_jacobians(bent(), 0.3, 2.0, STENCIL);
		for i in 0..3 {
			for k in 0..3 {
				assert_eq!(j[i][k], j[k][i].transpose());
			}
		}
	}

	#[test]
	fn test_degenerate_edges() {
		let x = V2::new(1., 1.);
		let f = elastic_bending_forces(&x, &x, &V2::new(2., 1.), 0.5, 1.0);
		assert_eq!(f, [V2::zeros(); 3]);
	}
}
