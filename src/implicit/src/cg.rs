//! Conjugate gradient for the symmetric step system.

use nalgebra::DVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
	Success,
	MaximumIterationsExceeded,
	/// A search direction with non-positive curvature was met; the matrix
	/// is not positive definite.
	Breakdown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveResult {
	pub iterations: u32,
	/// Absolute residual norm of the returned iterate.
	pub residual: f64,
	/// `residual / |b|`.
	pub error: f64,
	pub status: Status,
}

impl SolveResult {
	pub fn converged(&self) -> bool {
		self.status == Status::Success
	}
}

pub struct ConjugateGradient {
	max_iter: u32,
	tol: f64,
	r: DVector<f64>,
	p: DVector<f64>,
	ap: DVector<f64>,
}

impl ConjugateGradient {
	pub fn new(size: usize, max_iter: u32, tol: f64) -> Self {
		Self {
			max_iter,
			tol: tol.max(f64::EPSILON),
			r: DVector::zeros(size),
			p: DVector::zeros(size),
			ap: DVector::zeros(size),
		}
	}

	fn resize(&mut self, size: usize) {
		if self.r.len() != size {
			self.r = DVector::zeros(size);
			self.p = DVector::zeros(size);
			self.ap = DVector::zeros(size);
		}
	}

	/// Solves `Ax = b` starting from the current `x`, where `matvec(v, out)`
	/// writes `A·v` into `out`. Stops when `|r| ≤ tol·|b|`. On failure `x`
	/// holds the last iterate.
	pub fn solve<F>(&mut self, mut matvec: F, b: &DVector<f64>, x: &mut DVector<f64>) -> SolveResult
	where
		F: FnMut(&[f64], &mut [f64]),
	{
		self.resize(b.len());
		let ConjugateGradient {
			max_iter,
			tol,
			ref mut r,
			ref mut p,
			ref mut ap,
		} = *self;

		let b_norm = b.norm();
		let result = |iterations, r_norm_sq: f64, status| {
			let residual = r_norm_sq.sqrt();
			SolveResult {
				iterations,
				residual,
				error: if b_norm > 0.0 { residual / b_norm } else { 0.0 },
				status,
			}
		};
		if b_norm == 0.0 {
			x.fill(0.0);
			return result(0, 0.0, Status::Success);
		}

		// r0 = b - A·x0
		matvec(x.as_slice(), ap.as_mut_slice());
		r.copy_from(b);
		r.axpy(-1.0, ap, 1.0);
		p.copy_from(r);
		let mut rr = r.norm_squared();

		let mut iterations = 0;
		loop {
			if rr <= tol * tol * b_norm * b_norm {
				return result(iterations, rr, Status::Success);
			}
			if iterations >= max_iter {
				return result(iterations, rr, Status::MaximumIterationsExceeded);
			}
			matvec(p.as_slice(), ap.as_mut_slice());
			let pap = p.dot(ap);
			if pap <= 0.0 {
				return result(iterations, rr, Status::Breakdown);
			}
			let alpha = rr / pap;
			x.axpy(alpha, p, 1.0);
			r.axpy(-alpha, ap, 1.0);
			let rr_new = r.norm_squared();
			let beta = rr_new / rr;
			rr = rr_new;
			// p = r + βp
			p.axpy(1.0, r, beta);
			iterations += 1;
		}
	}
}
