//! Hookean springs between two nodes, or between a node and a point on a
//! kinematic boundary.

use super::{AnchorTarget, ConstraintLaw, SceneView};
use crate::math2d::{outer, EPSILON};
use crate::{M2, V2};

/// Stretch force on `x0` from a spring to `x1`.
pub fn stretch_force(x0: &V2, x1: &V2, rest_length: f64, stiffness: f64) -> V2 {
	let d = x1 - x0;
	let stretch = d.norm();
	if stretch < EPSILON {
		return V2::zeros();
	}
	d * ((stretch - rest_length) * stiffness / stretch)
}

/// Damping force on `x0` from the relative velocity along the spring axis.
pub fn damping_force(x0: &V2, x1: &V2, v0: &V2, v1: &V2, damping: f64) -> V2 {
	let d = x1 - x0;
	let stretch = d.norm();
	if stretch < EPSILON {
		return V2::zeros();
	}
	let dir = d / stretch;
	dir * ((v1 - v0).dot(&dir) * damping)
}

/// `∂f0/∂x0` of [`stretch_force`].
pub fn stretch_jacobian(x0: &V2, x1: &V2, rest_length: f64, stiffness: f64) -> M2 {
	let d = x1 - x0;
	let stretch = d.norm();
	if stretch < EPSILON {
		return M2::identity() * -stiffness;
	}
	let dir = d / stretch;
	let a = outer(&dir, &dir);
	let i = M2::identity();
	((i - a) * (1.0 - rest_length / stretch) + a) * -stiffness
}

/// [`stretch_jacobian`] with the transverse term clamped at zero, so that a
/// compressed spring never makes the step system indefinite. This is the
/// block the laws hand to assembly.
pub fn definite_stretch_jacobian(x0: &V2, x1: &V2, rest_length: f64, stiffness: f64) -> M2 {
	let d = x1 - x0;
	let stretch = d.norm();
	if stretch < EPSILON {
		return M2::identity() * -stiffness;
	}
	let dir = d / stretch;
	let a = outer(&dir, &dir);
	let i = M2::identity();
	((i - a) * (1.0 - rest_length / stretch).max(0.0) + a) * -stiffness
}

/// `∂f0/∂v0` of [`damping_force`].
pub fn damping_jacobian(x0: &V2, x1: &V2, damping: f64) -> M2 {
	let d = x1 - x0;
	let stretch = d.norm();
	if stretch < EPSILON {
		return M2::zeros();
	}
	let dir = d / stretch;
	outer(&dir, &dir) * -damping
}

pub fn stretch_energy(x0: &V2, x1: &V2, rest_length: f64, stiffness: f64) -> f64 {
	let s = (x1 - x0).norm() - rest_length;
	0.5 * stiffness * s * s
}

/// Spring between two nodes.
pub struct Spring;

impl Spring {
	pub fn rest_length(view: &SceneView, ids: &[usize; 2]) -> f64 {
		(view.nodes.x(ids[1]) - view.nodes.x(ids[0])).norm()
	}
}

impl ConstraintLaw<2> for Spring {
	type Params = f64;

	fn compute_forces(view: &SceneView, ids: &[usize; 2], k: f64, c: f64, rest: &f64) -> [V2; 2] {
		let (x0, v0) = view.nodes.xv(ids[0]);
		let (x1, v1) = view.nodes.xv(ids[1]);
		let f = stretch_force(x0, x1, *rest, k) + damping_force(x0, x1, v0, v1, c);
		[f, -f]
	}

	fn compute_jacobians(
		view: &SceneView,
		ids: &[usize; 2],
		k: f64,
		c: f64,
		rest: &f64,
		dfdx: &mut [[M2; 2]; 2],
		dfdv: &mut [[M2; 2]; 2],
	) {
		let x0 = view.nodes.x(ids[0]);
		let x1 = view.nodes.x(ids[1]);
		let jx = definite_stretch_jacobian(x0, x1, *rest, k);
		let jv = damping_jacobian(x0, x1, c);
		*dfdx = [[jx, -jx], [-jx, jx]];
		*dfdv = [[jv, -jv], [-jv, jv]];
	}

	fn energy(view: &SceneView, ids: &[usize; 2], k: f64, rest: &f64) -> f64 {
		stretch_energy(view.nodes.x(ids[0]), view.nodes.x(ids[1]), *rest, k)
	}
}

/// Spring from a node to a parametric point of a kinematic.
pub struct AnchorSpring;

impl AnchorSpring {
	/// World position and velocity of the anchor.
	pub fn target(view: &SceneView, target: &AnchorTarget) -> (V2, V2) {
		let kinematic = &view.kinematics[target.kinematic];
		let x = kinematic.position_from_parametric_point(&target.point);
		(x, kinematic.velocity_at(&x))
	}
}

impl ConstraintLaw<1> for AnchorSpring {
	type Params = AnchorTarget;

	fn compute_forces(view: &SceneView, ids: &[usize; 1], k: f64, c: f64, target: &AnchorTarget) -> [V2; 1] {
		let (x, v) = view.nodes.xv(ids[0]);
		let (xt, vt) = Self::target(view, target);
		[stretch_force(x, &xt, target.rest_length, k) + damping_force(x, &xt, v, &vt, c)]
	}

	fn compute_jacobians(
		view: &SceneView,
		ids: &[usize; 1],
		k: f64,
		c: f64,
		target: &AnchorTarget,
		dfdx: &mut [[M2; 1]; 1],
		dfdv: &mut [[M2; 1]; 1],
	) {
		let x = view.nodes.x(ids[0]);
		let (xt, _) = Self::target(view, target);
		dfdx[0][0] = definite_stretch_jacobian(x, &xt, target.rest_length, k);
		dfdv[0][0] = damping_jacobian(x, &xt, c);
	}

	fn energy(view: &SceneView, ids: &[usize; 1], k: f64, target: &AnchorTarget) -> f64 {
		let (xt, _) = Self::target(view, target);
		stretch_energy(view.nodes.x(ids[0]), &xt, target.rest_length, k)
	}
}
