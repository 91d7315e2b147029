use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use crate::{Error, Kwargs, Message, Result, Value};

pub const DEFAULT_SOCKET: &str = "implicit.socket";

const MAX_FRAME: usize = 1 << 28;

/// Writes one length-prefixed message.
pub fn write_msg(stream: &mut impl Write, msg: &Message) -> Result<()> {
	let bytes = msg.to_bytes()?;
	if bytes.len() > MAX_FRAME {
		return Err(Error::FrameTooLarge(bytes.len()));
	}
	stream.write_all(&(bytes.len() as u32).to_le_bytes())?;
	stream.write_all(&bytes)?;
	stream.flush()?;
	Ok(())
}

/// Reads one length-prefixed message.
pub fn read_msg(stream: &mut impl Read) -> Result<Message> {
	let mut len = [0u8; 4];
	stream.read_exact(&mut len)?;
	let len = u32::from_le_bytes(len) as usize;
	if len > MAX_FRAME {
		return Err(Error::FrameTooLarge(len));
	}
	let mut buf = vec![0u8; len];
	stream.read_exact(&mut buf)?;
	Message::from_bytes(&buf)
}

pub struct SockServer {
	listener: UnixListener,
	path: PathBuf,
}

impl SockServer {
	pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref().to_path_buf();
		let _ = std::fs::remove_file(&path);
		let listener = UnixListener::bind(&path)?;
		log::info!("listening on {}", path.display());
		Ok(Self { listener, path })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Serves clients one at a time until one of them sends `Close`.
	///
	/// Commands are executed in arrival order; `handler` errors are sent
	/// back as `Failure` and the server keeps going.
	pub fn serve<F>(&mut self, mut handler: F) -> Result<()>
	where
		F: FnMut(&str, &Kwargs) -> std::result::Result<Value, String>,
	{
		loop {
			let (mut stream, _) = self.listener.accept()?;
			log::info!("client connected");
			loop {
				let msg = match read_msg(&mut stream) {
					Ok(msg) => msg,
					Err(e) => {
						log::info!("client dropped: {}", e);
						break;
					}
				};
				let reply = match msg {
					Message::Command { name, client, kwargs } => {
						log::debug!("{} -> {}", client, name);
						match handler(&name, &kwargs) {
							Ok(value) => Message::Reply(value),
							Err(e) => {
								log::error!("command {} failed: {}", name, e);
								Message::Failure(e)
							}
						}
					}
					Message::Close { client } => {
						log::info!("close requested by {}", client);
						return Ok(());
					}
					_ => Message::Failure("expected a command".to_string()),
				};
				if let Err(e) = write_msg(&mut stream, &reply) {
					log::warn!("reply lost: {}", e);
					break;
				}
			}
		}
	}
}

impl Drop for SockServer {
	fn drop(&mut self) {
		let _ = std::fs::remove_file(&self.path);
	}
}

pub struct SockClient {
	name: String,
	stream: Option<UnixStream>,
}

impl SockClient {
	pub fn new(name: &str) -> Self {
		Self {
			name: name.to_string(),
			stream: None,
		}
	}

	pub fn is_connected(&self) -> bool {
		self.stream.is_some()
	}

	pub fn connect(&mut self, path: impl AsRef<Path>) -> bool {
		match UnixStream::connect(path.as_ref()) {
			Ok(s) => {
				log::info!("client {} connected to {}", self.name, path.as_ref().display());
				self.stream = Some(s);
				true
			}
			Err(e) => {
				log::error!("client {} cannot connect: {}", self.name, e);
				self.stream = None;
				false
			}
		}
	}

	fn round_trip(&mut self, msg: &Message) -> Result<Message> {
		let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
		write_msg(stream, msg)?;
		read_msg(stream)
	}

	/// Runs a command on the server. Returns `None` when not connected,
	/// when the connection broke, or when the command failed remotely.
	pub fn run(&mut self, command: &str, kwargs: Kwargs) -> Option<Value> {
		if !self.is_connected() {
			return None;
		}
		let msg = Message::Command {
			name: command.to_string(),
			client: self.name.clone(),
			kwargs,
		};
		match self.round_trip(&msg) {
			Ok(Message::Reply(value)) => Some(value),
			Ok(Message::Failure(e)) => {
				log::warn!("{} failed on server: {}", command, e);
				None
			}
			Ok(_) => {
				log::warn!("{}: {}", command, Error::UnexpectedMessage);
				None
			}
			Err(e) => {
				log::error!("connection lost: {}", e);
				self.stream = None;
				None
			}
		}
	}

	/// Names of the commands the server accepts.
	pub fn commands(&mut self) -> Vec<String> {
		match self.run("get_commands", Kwargs::new()) {
			Some(Value::List(names)) => names
				.iter()
				.filter_map(|v| v.as_str().map(|s| s.to_string()))
				.collect(),
			_ => Vec::new(),
		}
	}

	/// Asks the server to stop and drops the connection.
	pub fn disconnect(&mut self) {
		if let Some(mut stream) = self.stream.take() {
			let msg = Message::Close {
				client: self.name.clone(),
			};
			if let Err(e) = write_msg(&mut stream, &msg) {
				log::warn!("close not delivered: {}", e);
			}
		}
	}
}

impl Drop for SockClient {
	fn drop(&mut self) {
		self.disconnect();
	}
}
