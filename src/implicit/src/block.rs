//! Chunked structure-of-arrays storage.
//!
//! Entities of one kind live in blocks of at most `block_size` elements.
//! Each block keeps its fields in parallel vectors so that per-kind kernels
//! run as tight loops over a bounded working set, block after block.

use crate::error::{Error, Result};

/// One chunk of a [`DataBlock`]: a fixed set of parallel field vectors.
pub trait BlockData: Send {
	fn with_capacity(capacity: usize) -> Self;

	fn len(&self) -> usize;

	/// Grows with default values or truncates every field to `len`.
	fn resize(&mut self, len: usize);

	/// Appends element `index` of `other`.
	fn push_from(&mut self, other: &Self, index: usize);

	fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Index of a block inside its [`DataBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockHandle(pub usize);

#[derive(Debug, Clone)]
pub struct DataBlock<B> {
	block_size: usize,
	capacity: usize,
	blocks: Vec<B>,
	len: usize,
}

impl<B: BlockData> DataBlock<B> {
	pub fn new(block_size: usize, capacity: usize) -> Self {
		Self {
			block_size: block_size.max(1),
			capacity,
			blocks: Vec::new(),
			len: 0,
		}
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn block_size(&self) -> usize {
		self.block_size
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	pub fn num_blocks(&self) -> usize {
		self.blocks.len()
	}

	/// Reserves `n` default elements in new blocks and returns their handles.
	pub fn append_empty(&mut self, n: usize) -> Result<Vec<BlockHandle>> {
		if self.len + n > self.capacity {
			return Err(Error::CapacityExceeded {
				requested: self.len + n,
				capacity: self.capacity,
			});
		}
		let mut handles = Vec::with_capacity(n / self.block_size + 1);
		let mut remaining = n;
		while remaining > 0 {
			let count = remaining.min(self.block_size);
			let mut block = B::with_capacity(self.block_size);
			block.resize(count);
			handles.push(BlockHandle(self.blocks.len()));
			self.blocks.push(block);
			remaining -= count;
		}
		self.len += n;
		Ok(handles)
	}

	pub fn block(&self, handle: BlockHandle) -> Option<&B> {
		self.blocks.get(handle.0)
	}

	pub fn block_mut(&mut self, handle: BlockHandle) -> Option<&mut B> {
		self.blocks.get_mut(handle.0)
	}

	pub fn blocks(&self) -> &[B] {
		&self.blocks
	}

	pub fn blocks_mut(&mut self) -> &mut [B] {
		&mut self.blocks
	}

	fn handles_len(&self, handles: &[BlockHandle]) -> Result<usize> {
		handles.iter().try_fold(0, |acc, h| {
			self.block(*h)
				.map(|b| acc + b.len())
				.ok_or_else(|| Error::InvalidParameter(format!("invalid block handle {}", h.0)))
		})
	}

	/// Writes `source` into one field of the blocks named by `handles`,
	/// in handle order.
	pub fn copy_into<T: Clone>(
		&mut self,
		handles: &[BlockHandle],
		source: &[T],
		field: fn(&mut B) -> &mut [T],
	) -> Result<()> {
		let expected = self.handles_len(handles)?;
		if expected != source.len() {
			return Err(Error::InvalidParameter(format!(
				"copy of {} values into {} slots",
				source.len(),
				expected
			)));
		}
		let mut offset = 0;
		for handle in handles {
			let slots = field(&mut self.blocks[handle.0]);
			let n = slots.len();
			slots.clone_from_slice(&source[offset..offset + n]);
			offset += n;
		}
		Ok(())
	}

	/// Reads one field of the blocks named by `handles` into a single vector.
	pub fn flatten<T: Clone>(&self, handles: &[BlockHandle], field: fn(&B) -> &[T]) -> Vec<T> {
		handles
			.iter()
			.filter_map(|h| self.block(*h))
			.flat_map(|b| field(b).iter().cloned())
			.collect()
	}

	pub fn clear(&mut self) {
		self.blocks.clear();
		self.len = 0;
	}

	/// Packs elements so that every block but the last is full, keeping
	/// element order. Invalidates outstanding handles.
	pub fn compact(&mut self) {
		if self.blocks.iter().rev().skip(1).all(|b| b.len() == self.block_size)
			&& self.blocks.last().map_or(true, |b| !b.is_empty())
		{
			return;
		}
		let old = std::mem::take(&mut self.blocks);
		let mut current = B::with_capacity(self.block_size);
		for block in old.iter() {
			for i in 0..block.len() {
				if current.len() == self.block_size {
					let full = std::mem::replace(&mut current, B::with_capacity(self.block_size));
					self.blocks.push(full);
				}
				current.push_from(block, i);
			}
		}
		if !current.is_empty() {
			self.blocks.push(current);
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[derive(Default)]
	struct Scalars {
		value: Vec<f64>,
		tag: Vec<u32>,
	}

	impl Scalars {
		fn value(&self) -> &[f64] {
			&self.value
		}

		fn value_mut(&mut self) -> &mut [f64] {
			&mut self.value
		}
	}

	impl BlockData for Scalars {
		fn with_capacity(capacity: usize) -> Self {
			Self {
				value: Vec::with_capacity(capacity),
				tag: Vec::with_capacity(capacity),
			}
		}

		fn len(&self) -> usize {
			self.value.len()
		}

		fn resize(&mut self, len: usize) {
			self.value.resize(len, 0.0);
			self.tag.resize(len, 0);
		}

		fn push_from(&mut self, other: &Self, index: usize) {
			self.value.push(other.value[index]);
			self.tag.push(other.tag[index]);
		}
	}

	#[test]
	fn test_append_chunks() {
		let mut data: DataBlock<Scalars> = DataBlock::new(4, 100);
		let handles = data.append_empty(10).unwrap();
		assert_eq!(handles, vec![BlockHandle(0), BlockHandle(1), BlockHandle(2)]);
		assert_eq!(data.len(), 10);
		let sizes: Vec<_> = data.blocks().iter().map(|b| b.len()).collect();
		assert_eq!(sizes, vec![4, 4, 2]);
	}

	#[test]
	fn test_capacity() {
		let mut data: DataBlock<Scalars> = DataBlock::new(4, 6);
		data.append_empty(5).unwrap();
		let err = data.append_empty(2).unwrap_err();
		assert!(matches!(err, Error::CapacityExceeded { requested: 7, capacity: 6 }));
		assert_eq!(data.len(), 5);
	}

	#[test]
	fn test_copy_and_flatten() {
		let mut data: DataBlock<Scalars> = DataBlock::new(2, 100);
		let _first = data.append_empty(1).unwrap();
		let handles = data.append_empty(3).unwrap();
		let values = [1.0, 2.0, 3.0];
		data.copy_into(&handles, &values, Scalars::value_mut).unwrap();
		assert_eq!(data.flatten(&handles, Scalars::value), values.to_vec());
		assert!(data.copy_into(&handles, &values[..2], Scalars::value_mut).is_err());
	}

	#[test]
	fn test_compact_keeps_order() {
		let mut data: DataBlock<Scalars> = DataBlock::new(3, 100);
		let mut all = Vec::new();
		for n in [2usize, 1, 2] {
			let handles = data.append_empty(n).unwrap();
			all.extend(handles.iter().copied());
		}
		let values = [0.0, 1.0, 2.0, 3.0, 4.0];
		data.copy_into(&all, &values, Scalars::value_mut).unwrap();
		assert_eq!(data.num_blocks(), 3);
		data.compact();
		assert_eq!(data.num_blocks(), 2);
		assert_eq!(data.len(), 5);
		let flat: Vec<f64> = data.blocks().iter().flat_map(|b| b.value.clone()).collect();
		assert_eq!(flat, values.to_vec());
	}

	#[test]
	fn test_clear() {
		let mut data: DataBlock<Scalars> = DataBlock::new(3, 4);
		data.append_empty(4).unwrap();
		data.clear();
		assert!(data.is_empty());
		assert!(data.append_empty(4).is_ok());
	}
}
