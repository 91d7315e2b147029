//! Block-sparse matrices with 2×2 blocks, one block row per node.

use fnv::FnvHashMap;
use nalgebra::DMatrix;

use crate::M2;

/// Scatter-add accumulator. Blocks added twice at the same position sum up.
#[derive(Debug, Clone, Default)]
pub struct BlockMatrixBuilder {
	num_rows: usize,
	entries: FnvHashMap<(usize, usize), M2>,
}

impl BlockMatrixBuilder {
	pub fn new(num_rows: usize) -> Self {
		Self {
			num_rows,
			entries: FnvHashMap::default(),
		}
	}

	pub fn add(&mut self, row: usize, col: usize, block: M2) {
		*self.entries.entry((row, col)).or_insert_with(M2::zeros) += block;
	}

	pub fn add_diagonal(&mut self, values: &[f64]) {
		for (i, value) in values.iter().enumerate() {
			self.add(i, i, M2::identity() * *value);
		}
	}

	pub fn build(self) -> BlockSparseMatrix {
		let n = self.num_rows;
		let mut entries: Vec<((usize, usize), M2)> = self.entries.into_iter().collect();
		entries.sort_unstable_by_key(|(key, _)| *key);
		let mut row_offsets = vec![0; n + 1];
		for ((row, _), _) in entries.iter() {
			row_offsets[row + 1] += 1;
		}
		for i in 0..n {
			row_offsets[i + 1] += row_offsets[i];
		}
		let (columns, blocks) = entries.into_iter().map(|((_, col), block)| (col, block)).unzip();
		BlockSparseMatrix {
			num_rows: n,
			row_offsets,
			columns,
			blocks,
		}
	}
}

/// Compressed block rows, columns sorted within each row.
#[derive(Debug, Clone)]
pub struct BlockSparseMatrix {
	num_rows: usize,
	row_offsets: Vec<usize>,
	columns: Vec<usize>,
	blocks: Vec<M2>,
}

impl BlockSparseMatrix {
	/// Number of block rows; the scalar size is twice this.
	pub fn num_rows(&self) -> usize {
		self.num_rows
	}

	pub fn num_blocks(&self) -> usize {
		self.blocks.len()
	}

	pub fn get(&self, row: usize, col: usize) -> Option<&M2> {
		let range = self.row_offsets[row]..self.row_offsets[row + 1];
		self.columns[range.clone()]
			.binary_search(&col)
			.ok()
			.map(|k| &self.blocks[range.start + k])
	}

	/// `out = A·x` on flat `[x0, y0, x1, y1, …]` vectors.
	pub fn mul_into(&self, x: &[f64], out: &mut [f64]) {
		for row in 0..self.num_rows {
			let (mut a, mut b) = (0.0, 0.0);
			for k in self.row_offsets[row]..self.row_offsets[row + 1] {
				let m = &self.blocks[k];
				let c = self.columns[k];
				a += m[(0, 0)] * x[2 * c] + m[(0, 1)] * x[2 * c + 1];
				b += m[(1, 0)] * x[2 * c] + m[(1, 1)] * x[2 * c + 1];
			}
			out[2 * row] = a;
			out[2 * row + 1] = b;
		}
	}

	pub fn to_dense(&self) -> DMatrix<f64> {
		let mut dense = DMatrix::zeros(2 * self.num_rows, 2 * self.num_rows);
		for row in 0..self.num_rows {
			for k in self.row_offsets[row]..self.row_offsets[row + 1] {
				let col = self.columns[k];
				dense.fixed_slice_mut::<2, 2>(2 * row, 2 * col).copy_from(&self.blocks[k]);
			}
		}
		dense
	}

	pub fn is_symmetric(&self, tolerance: f64) -> bool {
		(0..self.num_rows).all(|row| {
			(self.row_offsets[row]..self.row_offsets[row + 1]).all(|k| {
				let col = self.columns[k];
				let transposed = self.get(col, row).copied().unwrap_or_else(M2::zeros);
				(self.blocks[k] - transposed.transpose()).abs().max() <= tolerance
			})
		})
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_scatter_add() {
		let mut builder = BlockMatrixBuilder::new(3);
		builder.add(0, 1, M2::identity());
		builder.add(0, 1, M2::identity());
		builder.add(2, 0, M2::new(1., 2., 3., 4.));
		builder.add_diagonal(&[1., 2., 3.]);
		let a = builder.build();
		assert_eq!(a.num_blocks(), 5);
		assert_eq!(a.get(0, 1), Some(&(M2::identity() * 2.0)));
		assert_eq!(a.get(1, 1), Some(&(M2::identity() * 2.0)));
		assert_eq!(a.get(1, 0), None);
		assert!(!a.is_symmetric(1e-12));
	}

	#[test]
	fn test_mul_matches_dense() {
		let mut builder = BlockMatrixBuilder::new(2);
		builder.add(0, 0, M2::new(4., 1., 1., 3.));
		builder.add(0, 1, M2::new(0., -1., 2., 0.));
		builder.add(1, 0, M2::new(0., 2., -1., 0.));
		builder.add(1, 1, M2::identity());
		let a = builder.build();
		assert!(a.is_symmetric(0.0));
		let x = [1., 2., 3., 4.];
		let mut out = [0.0; 4];
		a.mul_into(&x, &mut out);
		let dense = a.to_dense() * nalgebra::DVector::from_column_slice(&x);
		for i in 0..4 {
			assert_eq!(out[i], dense[i]);
		}
	}
}
