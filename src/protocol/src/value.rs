use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::pr_model::PrModel;

/// Keyword arguments of a command, ordered by name.
pub type Kwargs = BTreeMap<String, Value>;

/// Argument or result value of a dispatched command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Text(String),
	Points(Vec<[f64; 2]>),
	Segments(Vec<[[f64; 2]; 2]>),
	// row-major
	Matrix {
		rows: usize,
		cols: usize,
		data: Vec<f64>,
	},
	List(Vec<Value>),
	Model(PrModel),
}

impl Value {
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Value::Float(x) => Some(*x),
			Value::Int(x) => Some(*x as f64),
			_ => None,
		}
	}

	pub fn as_usize(&self) -> Option<usize> {
		match self {
			Value::Int(x) if *x >= 0 => Some(*x as usize),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Text(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_points(&self) -> Option<&[[f64; 2]]> {
		match self {
			Value::Points(p) => Some(p),
			_ => None,
		}
	}

	pub fn as_model(&self) -> Option<&PrModel> {
		match self {
			Value::Model(m) => Some(m),
			_ => None,
		}
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}

impl From<f64> for Value {
	fn from(x: f64) -> Self {
		Value::Float(x)
	}
}

impl From<usize> for Value {
	fn from(x: usize) -> Self {
		Value::Int(x as i64)
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::Text(s.to_string())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_accessors() {
		assert_eq!(Value::Int(3).as_usize(), Some(3));
		assert_eq!(Value::Int(-3).as_usize(), None);
		assert_eq!(Value::Int(3).as_f64(), Some(3.0));
		assert_eq!(Value::from("wire").as_str(), Some("wire"));
		assert!(Value::Null.is_null());
		assert_eq!(Value::Float(1.0).as_bool(), None);
	}
}
