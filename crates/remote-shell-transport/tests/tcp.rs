#![cfg(feature = "tcp")]

use std::{
    io::{Read, Write},
    net::{TcpListener, TcpStream},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use remote_shell_core::{
    CommandContext, CommandError, CommandValue, ConnectionId, Dispatcher, Evaluation,
};
use remote_shell_postprocess::TransformerRegistry;
use remote_shell_session::{SessionConfig, SessionManager};
use remote_shell_transport::{TransportConfig, tcp::TcpTransport};

const TIMEOUT: Duration = Duration::from_secs(5);

struct Echo;

impl Dispatcher for Echo {
    fn evaluate(
        &self,
        command: &str,
        _ctx: &mut CommandContext<'_>,
    ) -> Result<Evaluation, CommandError> {
        match command.strip_prefix("echo ") {
            Some(rest) => Ok(CommandValue::from(rest).into()),
            None => Err(CommandError::UnknownCommand(command.to_string())),
        }
    }
}

fn transport() -> TcpTransport<Echo> {
    let registry = Arc::new(TransformerRegistry::with_builtins().unwrap());
    let config = SessionConfig::default().prompt("$ ").display_banner(false);
    let manager = Arc::new(SessionManager::new(Echo, registry, config));
    TcpTransport::new(
        manager,
        TransportConfig {
            input_poll_interval_ms: 10,
            ..TransportConfig::default()
        },
    )
}

/// Connect a client and hand the server side to the transport.
fn connect(transport: &TcpTransport<Echo>) -> (TcpStream, ConnectionId) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
    client.set_read_timeout(Some(TIMEOUT)).unwrap();
    let (server, _) = listener.accept().unwrap();
    let id = transport.accept(server).unwrap();
    (client, id)
}

/// Read until `needle` shows up or the peer closes.
fn read_until(client: &mut TcpStream, needle: &str) -> String {
    let mut out = Vec::new();
    let mut buf = [0u8; 256];
    while !String::from_utf8_lossy(&out).contains(needle) {
        match client.read(&mut buf).unwrap() {
            0 => break,
            n => out.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8(out).unwrap()
}

fn wait_until(condition: impl Fn() -> bool) {
    let deadline = Instant::now() + TIMEOUT;
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_tcp_command_roundtrip() {
    let transport = transport();
    let (mut client, id) = connect(&transport);

    assert_eq!(read_until(&mut client, "$ "), "$ ");
    client.write_all(b"echo hello world | grep world\r\n").unwrap();
    assert_eq!(read_until(&mut client, "$ "), "1. hello world\r\n$ ");
    assert!(transport.manager().is_active(id));
}

#[test]
fn test_exit_closes_socket_and_session() {
    let transport = transport();
    let (mut client, id) = connect(&transport);

    read_until(&mut client, "$ ");
    client.write_all(b"exit\n").unwrap();
    let rest = read_until(&mut client, "never printed");
    assert_eq!(rest, "Bye.\r\n");

    wait_until(|| !transport.manager().is_active(id));
}

#[test]
fn test_client_disconnect_ends_session() {
    let transport = transport();
    let (mut client, id) = connect(&transport);

    read_until(&mut client, "$ ");
    drop(client);
    wait_until(|| !transport.manager().is_active(id));
}

#[test]
fn test_manager_close_drops_socket() {
    let transport = transport();
    let (mut client, id) = connect(&transport);

    read_until(&mut client, "$ ");
    assert!(transport.manager().on_connection_closed(id));
    let rest = read_until(&mut client, "never printed");
    assert!(rest.is_empty());
}

#[test]
fn test_serve_accepts_in_background() {
    let transport = Arc::new(transport());
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = Arc::clone(&transport);
    thread::spawn(move || server.serve(&listener));

    let mut client = TcpStream::connect(addr).unwrap();
    client.set_read_timeout(Some(TIMEOUT)).unwrap();
    read_until(&mut client, "$ ");
    assert_eq!(transport.manager().active_count(), 1);
}
