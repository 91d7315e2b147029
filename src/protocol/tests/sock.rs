use std::path::PathBuf;
use std::thread;

use protocol::sock::{SockClient, SockServer};
use protocol::{Kwargs, Value};

fn socket_path(tag: &str) -> PathBuf {
	std::env::temp_dir().join(format!("protocol-{}-{}.socket", tag, std::process::id()))
}

#[test]
fn test_client_without_server() {
	let mut client = SockClient::new("lonely");
	assert!(!client.connect(socket_path("missing")));
	assert!(!client.is_connected());
	assert_eq!(client.run("get_commands", Kwargs::new()), None);
	assert!(client.commands().is_empty());
}

#[test]
fn test_round_trip() {
	let path = socket_path("round-trip");
	let mut server = SockServer::bind(&path).unwrap();
	let handle = thread::spawn(move || {
		let mut served = 0;
		server
			.serve(|name, kwargs| {
				served += 1;
				match name {
					"get_commands" => Ok(Value::List(vec![
						Value::from("get_commands"),
						Value::from("double"),
					])),
					"double" => {
						let x = kwargs
							.get("x")
							.and_then(|v| v.as_f64())
							.ok_or_else(|| "missing x".to_string())?;
						Ok(Value::Float(2.0 * x))
					}
					_ => Err(format!("unknown command {}", name)),
				}
			})
			.unwrap();
		served
	});

	let mut client = SockClient::new("test");
	let mut connected = false;
	for _ in 0..50 {
		if client.connect(&path) {
			connected = true;
			break;
		}
		thread::sleep(std::time::Duration::from_millis(20));
	}
	assert!(connected);

	assert_eq!(client.commands(), vec!["get_commands", "double"]);
	let mut kwargs = Kwargs::new();
	kwargs.insert("x".to_string(), Value::Float(1.5));
	assert_eq!(client.run("double", kwargs), Some(Value::Float(3.0)));
	// a failing command leaves the connection usable
	assert_eq!(client.run("triple", Kwargs::new()), None);
	assert!(client.is_connected());

	client.disconnect();
	assert!(!client.is_connected());
	assert_eq!(handle.join().unwrap(), 3);
}
