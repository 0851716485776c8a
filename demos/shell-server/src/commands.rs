//! Demo commands.

use remote_shell_core::{CommandContext, CommandError, CommandValue, Dispatcher, Evaluation};

const HELP: &[(&str, &str)] = &[
    ("echo <message>", "Echo command"),
    ("ex", "Ex command"),
    ("welcome", "Welcome command"),
    ("conf", "Confirmation command"),
    ("whoami", "Show the connected user"),
    ("term", "Show terminal attributes as JSON"),
    ("postprocessors", "List output post-processors"),
    ("exit", "Close the session"),
];

/// Dispatcher for the demo server.
pub struct DemoCommands;

impl Dispatcher for DemoCommands {
    fn evaluate(
        &self,
        command: &str,
        ctx: &mut CommandContext<'_>,
    ) -> Result<Evaluation, CommandError> {
        let (name, rest) = command
            .split_once(char::is_whitespace)
            .map_or((command, ""), |(name, rest)| (name, rest.trim()));

        let value = match name {
            "echo" => CommandValue::from(rest),
            "ex" => return Err(CommandError::Failed("Test exception message".to_string())),
            "welcome" => {
                let name = ctx.read("What's your name ?")?;
                CommandValue::from(format!("Hello, '{name}' !"))
            }
            "conf" => {
                if ctx.confirm("Are you sure ?")? {
                    CommandValue::from("Great ! Let's do it !")
                } else {
                    CommandValue::from("Such a shame ...")
                }
            }
            "whoami" => CommandValue::from(ctx.user().unwrap_or("anonymous")),
            "term" => CommandValue::Json(
                serde_json::to_value(ctx.terminal()).map_err(anyhow::Error::from)?,
            ),
            "help" => CommandValue::Lines(
                HELP.iter()
                    .map(|(usage, about)| format!("{usage:<18}{about}"))
                    .collect(),
            ),
            _ => return Err(CommandError::UnknownCommand(name.to_string())),
        };
        Ok(value.into())
    }
}
