use thiserror::Error;

/// Configuration errors. Numerical degeneracies are never reported here,
/// they are resolved where they happen.
#[derive(Debug, Error)]
pub enum Error {
	#[error("storage capacity exceeded: {requested} elements requested, capacity is {capacity}")]
	CapacityExceeded { requested: usize, capacity: usize },

	#[error("invalid node id {0}")]
	InvalidNode(usize),

	#[error("invalid kinematic index {0}")]
	InvalidKinematic(usize),

	#[error("invalid dynamic index {0}")]
	InvalidDynamic(usize),

	#[error("invalid condition index {0}")]
	InvalidCondition(usize),

	#[error("invalid edge index {edge} on kinematic {kinematic}")]
	InvalidEdge { kinematic: usize, edge: usize },

	#[error("constraint connects {expected} nodes, got {found}")]
	ArityMismatch { expected: usize, found: usize },

	#[error("invalid parameter: {0}")]
	InvalidParameter(String),

	#[error("invalid shape: {0}")]
	InvalidShape(String),

	#[error("unknown command `{0}`")]
	UnknownCommand(String),

	#[error("command `{0}` is already registered")]
	DuplicateCommand(String),

	#[error("missing or invalid argument `{0}`")]
	InvalidArgument(String),

	#[error(transparent)]
	Protocol(#[from] protocol::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Rejects negative or non-finite coefficients.
pub(crate) fn check_coefficient(name: &str, value: f64) -> Result<()> {
	if value.is_finite() && value >= 0.0 {
		Ok(())
	} else {
		Err(Error::InvalidParameter(format!("{} must be non-negative, got {}", name, value)))
	}
}
