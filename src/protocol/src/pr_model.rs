// pr_model: read-only scene snapshot for rendering

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrParticle {
	pub id: usize,
	pub pos: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrConstraint {
	pub condition: usize,
	pub particles: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrKinematic {
	pub id: usize,
	pub vertices: Vec<[f64; 2]>,
	pub edges: Vec<[usize; 2]>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrModel {
	pub time: f64,
	// indexed by particle id
	pub particles: Vec<PrParticle>,
	pub constraints: Vec<PrConstraint>,
	pub kinematics: Vec<PrKinematic>,
}

impl PrModel {
	/// Line segments of every two-particle constraint.
	pub fn segments(&self) -> Vec<[[f64; 2]; 2]> {
		self.constraints
			.iter()
			.filter(|c| c.particles.len() == 2)
			.filter_map(|c| {
				let p0 = self.particles.get(c.particles[0])?;
				let p1 = self.particles.get(c.particles[1])?;
				Some([p0.pos, p1.pos])
			})
			.collect()
	}

	/// Boundary segments of every kinematic, in world space.
	pub fn kinematic_segments(&self) -> Vec<[[f64; 2]; 2]> {
		let mut result = Vec::new();
		for k in self.kinematics.iter() {
			for [a, b] in k.edges.iter() {
				if let (Some(va), Some(vb)) = (k.vertices.get(*a), k.vertices.get(*b)) {
					result.push([*va, *vb]);
				}
			}
		}
		result
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_segments_skip_other_arity() {
		let model = PrModel {
			time: 0.0,
			particles: vec![
				PrParticle { id: 0, pos: [0., 0.] },
				PrParticle { id: 1, pos: [1., 0.] },
				PrParticle { id: 2, pos: [2., 0.] },
			],
			constraints: vec![
				PrConstraint { condition: 0, particles: vec![0, 1] },
				PrConstraint { condition: 1, particles: vec![0, 1, 2] },
				PrConstraint { condition: 1, particles: vec![2] },
			],
			kinematics: vec![],
		};
		let segs = model.segments();
		assert_eq!(segs, vec![[[0., 0.], [1., 0.]]]);
	}
}
