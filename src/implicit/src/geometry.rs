use crate::math2d::{cross, EPSILON};
use crate::V2;

/// Parameter in `[0, 1]` of the point of segment `a-b` closest to `p`.
/// A degenerate segment is a single point and yields 0.
pub fn project_on_segment(p: &V2, a: &V2, b: &V2) -> f64 {
	let d = b - a;
	let len2 = d.norm_squared();
	if len2 < EPSILON * EPSILON {
		return 0.0;
	}
	((p - a).dot(&d) / len2).clamp(0.0, 1.0)
}

/// Edge index and parameter of the closest point to `p` on `edges`.
/// Ties go to the lowest edge index. `edges` must not be empty.
pub fn closest_parametric_value(p: &V2, vertices: &[V2], edges: &[[usize; 2]]) -> (usize, f64) {
	let mut best = (0, 0.0);
	let mut best_dist2 = f64::INFINITY;
	for (index, [i, j]) in edges.iter().enumerate() {
		let (a, b) = (&vertices[*i], &vertices[*j]);
		let t = project_on_segment(p, a, b);
		let q = a * (1.0 - t) + b * t;
		let dist2 = (q - p).norm_squared();
		if dist2 < best_dist2 {
			best_dist2 = dist2;
			best = (index, t);
		}
	}
	best
}

/// Inclusive point-in-triangle test, valid for both windings.
/// A zero-area triangle contains nothing.
pub fn is_inside_triangle(p: &V2, a: &V2, b: &V2, c: &V2) -> bool {
	if cross(&(b - a), &(c - a)).abs() < EPSILON * EPSILON {
		return false;
	}
	let d0 = cross(&(b - a), &(p - a));
	let d1 = cross(&(c - b), &(p - b));
	let d2 = cross(&(a - c), &(p - c));
	let has_neg = d0 < 0.0 || d1 < 0.0 || d2 < 0.0;
	let has_pos = d0 > 0.0 || d1 > 0.0 || d2 > 0.0;
	!(has_neg && has_pos)
}

pub fn is_inside(p: &V2, vertices: &[V2], faces: &[[usize; 3]]) -> bool {
	faces
		.iter()
		.any(|[a, b, c]| is_inside_triangle(p, &vertices[*a], &vertices[*b], &vertices[*c]))
}

#[cfg(test)]
mod test {
	use super::*;

	fn square() -> (Vec<V2>, Vec<[usize; 2]>, Vec<[usize; 3]>) {
		let v = vec![
			V2::new(0., 0.),
			V2::new(1., 0.),
			V2::new(1., 1.),
			V2::new(0., 1.),
		];
		let e = vec![[0, 1], [1, 2], [2, 3], [3, 0]];
		let f = vec![[0, 1, 2], [0, 2, 3]];
		(v, e, f)
	}

	#[test]
	fn test_closest() {
		let (v, e, _) = square();
		let (index, t) = closest_parametric_value(&V2::new(0.25, -2.0), &v, &e);
		assert_eq!(index, 0);
		assert!((t - 0.25).abs() < 1e-12);
		let (index, t) = closest_parametric_value(&V2::new(3.0, 0.5), &v, &e);
		assert_eq!(index, 1);
		assert!((t - 0.5).abs() < 1e-12);
	}

	#[test]
	fn test_tie_takes_first_edge() {
		let (v, e, _) = square();
		// equidistant to edge 0 and edge 3 through the shared corner
		let (index, t) = closest_parametric_value(&V2::new(-1.0, -1.0), &v, &e);
		assert_eq!(index, 0);
		assert_eq!(t, 0.0);
	}

	#[test]
	fn test_degenerate_segment() {
		let a = V2::new(1., 1.);
		let t = project_on_segment(&V2::new(5., 5.), &a, &a);
		assert_eq!(t, 0.0);
	}

	#[test]
	fn test_inside() {
		let (v, _, f) = square();
		assert!(is_inside(&V2::new(0.5, 0.5), &v, &f));
		assert!(is_inside(&V2::new(0.2, 0.9), &v, &f));
		assert!(!is_inside(&V2::new(1.5, 0.5), &v, &f));
		assert!(!is_inside(&V2::new(0.5, 0.5), &v, &[]));
	}

	#[test]
	fn test_degenerate_face_contains_nothing() {
		let a = V2::new(1., 1.);
		assert!(!is_inside_triangle(&V2::new(5., 5.), &a, &a, &a));
		assert!(!is_inside_triangle(&a, &a, &a, &a));
		let (b, c) = (V2::new(2., 2.), V2::new(3., 3.));
		assert!(!is_inside_triangle(&V2::new(2., 2.), &a, &b, &c));
		let v = vec![a, a, a];
		assert!(!is_inside(&V2::new(-4., 7.), &v, &[[0, 1, 2]]));
	}
}
