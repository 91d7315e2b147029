//! Wall-clock timing of solver phases for one simulation run.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileEntry {
	pub name: &'static str,
	pub depth: usize,
	pub duration: Duration,
}

/// Collects named durations. Nested [`Profiler::scope`] calls are recorded
/// with their depth so the log reads as a tree.
#[derive(Debug, Default)]
pub struct Profiler {
	logs: Vec<ProfileEntry>,
	depth: usize,
}

impl Profiler {
	pub fn scope<T>(&mut self, name: &'static str, f: impl FnOnce(&mut Self) -> T) -> T {
		let slot = self.logs.len();
		self.logs.push(ProfileEntry {
			name,
			depth: self.depth,
			duration: Duration::ZERO,
		});
		self.depth += 1;
		let start = Instant::now();
		let result = f(self);
		self.depth -= 1;
		self.logs[slot].duration = start.elapsed();
		result
	}

	pub fn record(&mut self, name: &'static str, duration: Duration) {
		self.logs.push(ProfileEntry {
			name,
			depth: self.depth,
			duration,
		});
	}

	pub fn logs(&self) -> &[ProfileEntry] {
		&self.logs
	}

	pub fn clear_logs(&mut self) {
		self.logs.clear();
	}

	/// Sum of every entry named `name`.
	pub fn total(&self, name: &str) -> Duration {
		self.logs
			.iter()
			.filter(|e| e.name == name)
			.map(|e| e.duration)
			.sum()
	}

	pub fn print_logs(&self) {
		for entry in self.logs.iter() {
			log::info!(
				"{:indent$}{}: {:.3} ms",
				"",
				entry.name,
				entry.duration.as_secs_f64() * 1e3,
				indent = entry.depth * 2
			);
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_nested_scopes() {
		let mut profiler = Profiler::default();
		let value = profiler.scope("frame", |p| {
			p.scope("step", |_| ());
			p.scope("step", |_| 3)
		});
		assert_eq!(value, 3);
		let names: Vec<_> = profiler.logs().iter().map(|e| (e.name, e.depth)).collect();
		assert_eq!(names, vec![("frame", 0), ("step", 1), ("step", 1)]);
		assert!(profiler.total("frame") >= profiler.total("step"));
		profiler.record("io", Duration::from_millis(2));
		assert_eq!(profiler.total("io"), Duration::from_millis(2));
		profiler.clear_logs();
		assert!(profiler.logs().is_empty());
	}
}
