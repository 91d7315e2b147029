use implicit::demo;
use implicit::dispatch::{Dispatcher, Session};
use protocol::sock::{SockServer, DEFAULT_SOCKET};

fn main() -> implicit::Result<()> {
	env_logger::init();
	let mut path = DEFAULT_SOCKET.to_string();
	let mut preload = false;
	for arg in std::env::args().skip(1) {
		match arg.as_str() {
			"--demo" => preload = true,
			_ => path = arg,
		}
	}
	let session = if preload {
		demo::reference_session()?
	} else {
		Session::default()
	};
	let mut dispatcher = Dispatcher::new(session);
	log::info!("{} commands available", dispatcher.commands().len());
	let mut server = SockServer::bind(&path)?;
	server.serve(|name, kwargs| dispatcher.run(name, kwargs).map_err(|e| e.to_string()))?;
	Ok(())
}
