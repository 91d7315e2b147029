use crate::{M2, V2};

/// Lengths below this are treated as zero.
pub const EPSILON: f64 = 1e-9;

/// z component of the 3D cross product.
pub fn cross(a: &V2, b: &V2) -> f64 {
	a[0] * b[1] - a[1] * b[0]
}

/// Signed turning angle at `x1` along the polyline `x0 - x1 - x2`, in radians.
/// Zero for a straight line.
pub fn angle(x0: &V2, x1: &V2, x2: &V2) -> f64 {
	let u = x0 - x1;
	let v = x1 - x2;
	cross(&u, &v).atan2(u.dot(&v))
}

/// Clockwise rotation by `degrees`: kinematic poses turn clockwise for
/// positive angles.
pub fn rotation_matrix(degrees: f64) -> M2 {
	let (s, c) = degrees.to_radians().sin_cos();
	M2::new(c, s, -s, c)
}

/// Signed triangle area, positive for counter-clockwise order.
pub fn area(x0: &V2, x1: &V2, x2: &V2) -> f64 {
	0.5 * cross(&(x1 - x0), &(x2 - x0))
}

/// Outer product `a·bᵀ`.
pub fn outer(a: &V2, b: &V2) -> M2 {
	a * b.transpose()
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_angle() {
		let x0 = V2::new(0., 0.);
		let x1 = V2::new(1., 0.);
		assert!(angle(&x0, &x1, &V2::new(2., 0.)).abs() < 1e-15);
		let up = angle(&x0, &x1, &V2::new(1., 1.));
		let down = angle(&x0, &x1, &V2::new(1., -1.));
		assert!((up.abs() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
		assert!((up + down).abs() < 1e-12);
	}

	#[test]
	fn test_rotation() {
		let r = rotation_matrix(90.0);
		let p = r * V2::new(1., 0.);
		assert!((p - V2::new(0., -1.)).norm() < 1e-12);
		let q = rotation_matrix(-90.0) * V2::new(1., 0.);
		assert!((q - V2::new(0., 1.)).norm() < 1e-12);
	}

	#[test]
	fn test_area() {
		let a = area(&V2::new(0., 0.), &V2::new(1., 0.), &V2::new(0., 2.));
		assert!((a - 1.0).abs() < 1e-15);
		let b = area(&V2::new(0., 0.), &V2::new(0., 2.), &V2::new(1., 0.));
		assert!((a + b).abs() < 1e-15);
	}
}
