use std::{
    sync::{Arc, mpsc},
    thread,
    time::{Duration, Instant},
};

use remote_shell_core::{
    CommandContext, CommandError, CommandValue, ConnectionId, ConnectionInfo, Dispatcher,
    Evaluation, ExitStatus, InputSender, IoHandles, OutputReceiver, TerminalAttributes,
    input_channel, output_channel,
};
use remote_shell_postprocess::{OutputTransformer, TransformError, TransformerRegistry};
use remote_shell_session::{ManagerError, SessionConfig, SessionManager};
use serde_json::Value;
use tokio::sync::mpsc::error::TryRecvError;

const PROMPT: &str = "shell> ";
const TIMEOUT: Duration = Duration::from_secs(5);

/// Demo-style commands exercising values, failures and prompts.
struct TestCommands;

impl Dispatcher for TestCommands {
    fn evaluate(
        &self,
        command: &str,
        ctx: &mut CommandContext<'_>,
    ) -> Result<Evaluation, CommandError> {
        let mut words = command.split_whitespace();
        match words.next() {
            Some("echo") => Ok(CommandValue::from(words.collect::<Vec<_>>().join(" ")).into()),
            Some("lines") => Ok(CommandValue::from("test\ntoto\ntiti\ntest").into()),
            Some("ex") => Err(CommandError::Failed("Test exception message".to_string())),
            Some("boom") => panic!("kaboom"),
            Some("welcome") => {
                let name = ctx.read("What's your name ?")?;
                Ok(CommandValue::from(format!("Hello, '{name}' !")).into())
            }
            Some("conf") => {
                let answer = if ctx.confirm("Are you sure ?")? {
                    "Great ! Let's do it !"
                } else {
                    "Such a shame ..."
                };
                Ok(CommandValue::from(answer).into())
            }
            Some("remember") => {
                let value = words.next().unwrap_or_default().to_string();
                ctx.runtime.set_metadata("remembered", Value::String(value));
                Ok(CommandValue::Empty.into())
            }
            Some("recall") => {
                let value = ctx
                    .runtime
                    .get_metadata("remembered")
                    .and_then(Value::as_str)
                    .unwrap_or("nothing")
                    .to_string();
                Ok(CommandValue::from(format!("recalled {value}")).into())
            }
            Some("whoami") => Ok(CommandValue::from(ctx.user().unwrap_or("anonymous")).into()),
            Some(other) => Err(CommandError::UnknownCommand(other.to_string())),
            None => Ok(CommandValue::Empty.into()),
        }
    }
}

/// Post-processor that always panics.
struct Explode;

impl OutputTransformer for Explode {
    fn name(&self) -> &'static str {
        "explode"
    }

    fn description(&self) -> &'static str {
        "Panic while rendering"
    }

    fn apply(&self, _input: &str, _args: &[String]) -> Result<String, TransformError> {
        panic!("transformer blew up")
    }
}

fn manager() -> Arc<SessionManager<TestCommands>> {
    manager_with(TransformerRegistry::with_builtins().unwrap())
}

fn manager_with(registry: TransformerRegistry) -> Arc<SessionManager<TestCommands>> {
    let registry = Arc::new(registry);
    let config = SessionConfig::default().prompt(PROMPT).display_banner(false);
    Arc::new(SessionManager::new(TestCommands, registry, config))
}

struct Client {
    id: ConnectionId,
    input: Option<InputSender>,
    output: OutputReceiver,
    exits: mpsc::Receiver<ExitStatus>,
    buffer: String,
}

impl Client {
    fn connect(manager: &SessionManager<TestCommands>, user: Option<&str>) -> Self {
        let id = ConnectionId::new();
        let (input_tx, input) = input_channel(Duration::from_millis(10));
        let (output, output_rx) = output_channel();
        let (exit_tx, exits) = mpsc::channel();
        let handles = IoHandles::new(input, output, move |status| {
            let _ = exit_tx.send(status);
        });
        let info = ConnectionInfo {
            terminal: TerminalAttributes::new("dumb", 80, 24),
            user: user.map(ToString::to_string),
        };
        manager.on_connection_accepted(id, handles, info).unwrap();

        let mut client = Self {
            id,
            input: Some(input_tx),
            output: output_rx,
            exits,
            buffer: String::new(),
        };
        client.read_until(PROMPT);
        client
    }

    fn send(&self, line: &str) {
        self.input
            .as_ref()
            .unwrap()
            .send(format!("{line}\n").into_bytes())
            .unwrap();
    }

    /// Run a command and return everything printed before the next prompt.
    fn run(&mut self, line: &str) -> String {
        self.send(line);
        let out = self.read_until(PROMPT);
        out.trim_end_matches(PROMPT).to_string()
    }

    fn read_until(&mut self, needle: &str) -> String {
        let deadline = Instant::now() + TIMEOUT;
        loop {
            while let Ok(chunk) = self.output.try_recv() {
                self.buffer.push_str(&String::from_utf8_lossy(&chunk));
            }
            if let Some(pos) = self.buffer.find(needle) {
                let end = pos + needle.len();
                return self.buffer.drain(..end).collect();
            }
            assert!(
                Instant::now() < deadline,
                "timed out waiting for {needle:?}, got {:?}",
                self.buffer
            );
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// Wait until the session thread has dropped its output stream.
    fn wait_for_thread_exit(&mut self) -> String {
        let deadline = Instant::now() + TIMEOUT;
        loop {
            match self.output.try_recv() {
                Ok(chunk) => self.buffer.push_str(&String::from_utf8_lossy(&chunk)),
                Err(TryRecvError::Disconnected) => return std::mem::take(&mut self.buffer),
                Err(TryRecvError::Empty) => {
                    assert!(Instant::now() < deadline, "session thread still running");
                    thread::sleep(Duration::from_millis(5));
                }
            }
        }
    }
}

#[test]
fn test_pipeline_applied_to_command_output() {
    let manager = manager();
    let mut client = Client::connect(&manager, None);

    assert_eq!(client.run("lines | grep test"), "1. test\r\n4. test\r\n");
    assert_eq!(
        client.run("lines | grep test toto"),
        "1. test\r\n2. toto\r\n4. test\r\n"
    );
    assert_eq!(client.run("lines | grep ''"), "test\r\ntoto\r\ntiti\r\ntest\r\n");
}

#[test]
fn test_unknown_transformer_shows_only_error() {
    let manager = manager();
    let mut client = Client::connect(&manager, None);

    let out = client.run("lines | grep test | nope");
    assert_eq!(out, "Error: Unknown post-processor: nope\r\n");
}

#[test]
fn test_failing_command_keeps_session_alive() {
    let manager = manager();
    let mut client = Client::connect(&manager, None);

    assert_eq!(client.run("ex"), "Error: Test exception message\r\n");
    assert_eq!(client.run("echo still here"), "still here\r\n");
    assert_eq!(client.run("frobnicate"), "Error: Unknown command: frobnicate\r\n");
    assert!(manager.is_active(client.id));
}

#[test]
fn test_panicking_command_keeps_session_alive() {
    let manager = manager();
    let mut client = Client::connect(&manager, None);

    assert_eq!(client.run("boom"), "Error: Command panicked: kaboom\r\n");
    assert_eq!(client.run("echo after"), "after\r\n");
}

#[test]
fn test_panicking_transformer_keeps_session_alive() {
    let mut registry = TransformerRegistry::with_builtins().unwrap();
    registry.register(Arc::new(Explode)).unwrap();
    let manager = manager_with(registry);
    let mut client = Client::connect(&manager, None);

    assert_eq!(
        client.run("echo hi | explode"),
        "Error: Command panicked: transformer blew up\r\n"
    );
    assert_eq!(client.run("echo after"), "after\r\n");
    assert!(manager.is_active(client.id));
    assert!(client.exits.try_recv().is_err());
}

#[test]
fn test_interactive_prompts() {
    let manager = manager();
    let mut client = Client::connect(&manager, Some("alice"));

    client.send("welcome");
    client.read_until("What's your name ? ");
    assert_eq!(client.run("Bob"), "Hello, 'Bob' !\r\n");

    client.send("conf");
    client.read_until("Are you sure ? (y/N) ");
    assert_eq!(client.run("y"), "Great ! Let's do it !\r\n");

    client.send("conf");
    client.read_until("(y/N) ");
    assert_eq!(client.run("maybe"), "Such a shame ...\r\n");

    assert_eq!(client.run("whoami"), "alice\r\n");
}

#[test]
fn test_sessions_are_isolated() {
    let manager = manager();
    let mut clients: Vec<Client> = (0..4).map(|_| Client::connect(&manager, None)).collect();
    assert_eq!(manager.active_count(), 4);

    let handles: Vec<_> = clients
        .drain(..)
        .enumerate()
        .map(|(i, mut client)| {
            thread::spawn(move || {
                let marker = format!("value-{i}");
                client.run(&format!("remember {marker}"));
                for _ in 0..10 {
                    assert_eq!(client.run("recall"), format!("recalled {marker}\r\n"));
                    assert_eq!(client.run(&format!("echo {marker}")), format!("{marker}\r\n"));
                }
                client
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_close_is_idempotent() {
    let manager = manager();
    let mut client = Client::connect(&manager, None);

    assert!(manager.on_connection_closed(client.id));
    assert!(!manager.on_connection_closed(client.id));
    assert!(!manager.is_active(client.id));
    assert_eq!(manager.active_count(), 0);

    client.wait_for_thread_exit();
    assert!(client.exits.try_recv().is_err(), "teardown must not signal exit");
}

#[test]
fn test_close_unknown_connection_is_noop() {
    let manager = manager();
    let client = Client::connect(&manager, None);

    assert!(!manager.on_connection_closed(ConnectionId::new()));
    assert!(manager.is_active(client.id));
}

#[test]
fn test_close_interrupts_pending_prompt() {
    let manager = manager();
    let mut client = Client::connect(&manager, None);

    client.send("welcome");
    client.read_until("What's your name ? ");
    manager.on_connection_closed(client.id);

    let rest = client.wait_for_thread_exit();
    assert!(!rest.contains("Hello"));
    assert!(client.exits.try_recv().is_err());
}

#[test]
fn test_duplicate_accept_rejected() {
    let manager = manager();
    let client = Client::connect(&manager, None);

    let (_, input) = input_channel(Duration::from_millis(10));
    let (output, _rx) = output_channel();
    let err = manager
        .on_connection_accepted(
            client.id,
            IoHandles::new(input, output, |_| {}),
            ConnectionInfo::default(),
        )
        .unwrap_err();
    assert!(matches!(err, ManagerError::AlreadyActive(id) if id == client.id));
    assert_eq!(manager.active_count(), 1);
}

#[test]
fn test_exit_command_signals_transport() {
    let manager = manager();
    let mut client = Client::connect(&manager, None);

    client.send("exit");
    assert!(client.wait_for_thread_exit().contains("Bye."));
    assert_eq!(
        client.exits.recv_timeout(TIMEOUT).unwrap(),
        ExitStatus::SUCCESS
    );

    // The transport reacts to the exit signal by reporting the close.
    assert!(manager.on_connection_closed(client.id));
}

#[test]
fn test_end_of_input_signals_transport() {
    let manager = manager();
    let mut client = Client::connect(&manager, None);

    client.input.take();
    client.wait_for_thread_exit();
    assert_eq!(
        client.exits.recv_timeout(TIMEOUT).unwrap(),
        ExitStatus::SUCCESS
    );
}

#[test]
fn test_postprocessors_builtin() {
    let manager = manager();
    let mut client = Client::connect(&manager, None);

    let out = client.run("postprocessors");
    assert!(out.starts_with("Available Post-Processors\r\n"));
    for name in ["grep", "highlight", "json", "save"] {
        assert!(out.contains(&format!("\t{name}: ")), "missing {name} in {out:?}");
    }

    let filtered = client.run("postprocessors | grep json");
    assert_eq!(filtered, "5. \tjson: json - Extract the value at a JSON pointer\r\n");
}

#[test]
fn test_shutdown_interrupts_every_session() {
    let manager = manager();
    let mut clients: Vec<Client> = (0..3).map(|_| Client::connect(&manager, None)).collect();

    assert_eq!(manager.shutdown(), 3);
    assert_eq!(manager.active_count(), 0);
    for client in &mut clients {
        client.wait_for_thread_exit();
    }
}

#[test]
fn test_session_snapshot_is_ordered() {
    let manager = manager();
    let first = Client::connect(&manager, None);
    let second = Client::connect(&manager, None);

    let ids: Vec<_> = manager.sessions().iter().map(|s| s.connection).collect();
    assert_eq!(ids, [first.id, second.id]);
}
