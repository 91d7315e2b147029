//! Pose sources for kinematics.

use dyn_clone::DynClone;

use crate::V2;

/// Maps scene time to a pose `(position, rotation in degrees)`.
pub trait Animator: DynClone + Send + Sync {
	fn sample(&self, time: f64) -> (V2, f64);
}

dyn_clone::clone_trait_object!(Animator);

/// Piecewise linear keyframe track. Outside the keyed range the nearest
/// key is held.
#[derive(Clone, Debug, Default)]
pub struct Keyframes {
	keys: Vec<(f64, V2, f64)>,
}

impl Keyframes {
	pub fn with_key(mut self, time: f64, position: V2, rotation: f64) -> Self {
		let at = self.keys.partition_point(|(t, _, _)| *t <= time);
		self.keys.insert(at, (time, position, rotation));
		self
	}

	pub fn len(&self) -> usize {
		self.keys.len()
	}

	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}
}

impl Animator for Keyframes {
	fn sample(&self, time: f64) -> (V2, f64) {
		let (first, last) = match (self.keys.first(), self.keys.last()) {
			(Some(first), Some(last)) => (first, last),
			_ => return (V2::zeros(), 0.0),
		};
		if time <= first.0 {
			return (first.1, first.2);
		}
		if time >= last.0 {
			return (last.1, last.2);
		}
		let i = self.keys.partition_point(|(t, _, _)| *t <= time);
		let (t0, p0, r0) = self.keys[i - 1];
		let (t1, p1, r1) = self.keys[i];
		let span = t1 - t0;
		if span <= 0.0 {
			return (p1, r1);
		}
		let a = (time - t0) / span;
		(p0 * (1.0 - a) + p1 * a, r0 * (1.0 - a) + r1 * a)
	}
}

/// Fixed pose.
#[derive(Clone, Debug)]
pub struct Still(pub V2, pub f64);

impl Animator for Still {
	fn sample(&self, _time: f64) -> (V2, f64) {
		(self.0, self.1)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_keyframes() {
		let track = Keyframes::default()
			.with_key(1.0, V2::new(2., 0.), 90.0)
			.with_key(0.0, V2::zeros(), 0.0);
		assert_eq!(track.len(), 2);
		let (p, r) = track.sample(0.25);
		assert!((p - V2::new(0.5, 0.)).norm() < 1e-12);
		assert!((r - 22.5).abs() < 1e-12);
		assert_eq!(track.sample(-1.0), (V2::zeros(), 0.0));
		assert_eq!(track.sample(5.0), (V2::new(2., 0.), 90.0));
	}

	#[test]
	fn test_boxed_clone() {
		let a: Box<dyn Animator> = Box::new(Still(V2::new(1., 2.), 3.0));
		let b = a.clone();
		assert_eq!(b.sample(10.0), (V2::new(1., 2.), 3.0));
		assert!(Keyframes::default().is_empty());
		assert_eq!(Keyframes::default().sample(1.0), (V2::zeros(), 0.0));
	}
}
