pub mod pr_model;
pub mod sock;
pub mod value;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use value::{Kwargs, Value};

#[derive(Debug, Error)]
pub enum Error {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("codec error: {0}")]
	Codec(#[from] bincode::Error),

	#[error("frame of {0} bytes exceeds the frame limit")]
	FrameTooLarge(usize),

	#[error("not connected")]
	NotConnected,

	#[error("unexpected message")]
	UnexpectedMessage,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Everything exchanged between a dispatch client and the solver server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
	Command {
		name: String,
		client: String,
		kwargs: Kwargs,
	},
	Reply(Value),
	Failure(String),
	// ends the server loop
	Close {
		client: String,
	},
}

impl Message {
	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		Ok(bincode::serialize(&self)?)
	}

	pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
		Ok(bincode::deserialize(bytes)?)
	}
}
