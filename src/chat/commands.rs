//! Slash commands understood by the chat REPL.
//!
//! Anything starting with `/` is a command and never reaches the API.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Print the command reference.
    Help,

    /// Leave the REPL.
    Quit,

    /// Forget the conversation, keeping the system prompt.
    Clear,

    /// Switch models for subsequent turns.
    Model(String),

    /// Replace the system prompt; `None` removes it.
    System(Option<String>),

    /// Set the sampling temperature.
    Temperature(f32),

    /// Fall back to the server's default temperature.
    ClearTemperature,

    /// Set nucleus sampling.
    TopP(f32),

    /// Fall back to the server's default top-p.
    ClearTopP,

    /// Cap the tokens of each response.
    MaxTokens(u32),

    /// Remove the response token cap.
    ClearMaxTokens,

    /// Add a stop sequence.
    Stop(String),

    /// Remove every stop sequence.
    ClearStop,

    /// Toggle streamed responses.
    Stream(bool),

    /// Show session statistics.
    Stats,

    /// Print the conversation so far.
    History,

    /// The input looked like a command but could not be parsed.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `None` when the input is an ordinary message.
///
/// ```
/// # use chatter::chat::{parse_command, ChatCommand};
/// assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
/// assert_eq!(parse_command("/model gpt-4"), Some(ChatCommand::Model("gpt-4".to_string())));
/// assert!(parse_command("What's up?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let rest = input.trim().strip_prefix('/')?;

    let (command, argument) = match rest.split_once(char::is_whitespace) {
        Some((command, argument)) => (command, Some(argument.trim())),
        None => (rest, None),
    };
    let command = command.to_lowercase();
    let argument = argument.filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" => ChatCommand::Quit,
        "clear" => ChatCommand::Clear,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "system" => ChatCommand::System(argument.map(String::from)),
        "temperature" => parse_clearable(
            "/temperature",
            argument,
            |arg| parse_f32_in_range(arg, 0.0, 2.0).map(ChatCommand::Temperature),
            ChatCommand::ClearTemperature,
        ),
        "top_p" => parse_clearable(
            "/top_p",
            argument,
            |arg| parse_f32_in_range(arg, 0.0, 1.0).map(ChatCommand::TopP),
            ChatCommand::ClearTopP,
        ),
        "max_tokens" => parse_clearable(
            "/max_tokens",
            argument,
            |arg| match arg.parse::<u32>() {
                Ok(n) if n > 0 => Ok(ChatCommand::MaxTokens(n)),
                _ => Err("expects a positive integer".to_string()),
            },
            ChatCommand::ClearMaxTokens,
        ),
        "stop" => match argument {
            Some(arg) if arg.eq_ignore_ascii_case("clear") => ChatCommand::ClearStop,
            Some(arg) => ChatCommand::Stop(arg.to_string()),
            None => ChatCommand::Invalid("/stop requires a sequence or 'clear'".to_string()),
        },
        "stream" => match argument.and_then(parse_on_off) {
            Some(on) => ChatCommand::Stream(on),
            None => ChatCommand::Invalid("/stream expects 'on' or 'off'".to_string()),
        },
        "stats" => ChatCommand::Stats,
        "history" => ChatCommand::History,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

fn parse_clearable<F>(name: &str, argument: Option<&str>, parse: F, clear: ChatCommand) -> ChatCommand
where
    F: FnOnce(&str) -> Result<ChatCommand, String>,
{
    match argument {
        Some(arg) if arg.eq_ignore_ascii_case("clear") => clear,
        Some(arg) => parse(arg).unwrap_or_else(|err| ChatCommand::Invalid(format!("{name} {err}"))),
        None => ChatCommand::Invalid(format!("{name} requires a value")),
    }
}

fn parse_f32_in_range(value: &str, min: f32, max: f32) -> Result<f32, String> {
    match value.parse::<f32>() {
        Ok(parsed) if parsed.is_finite() && (min..=max).contains(&parsed) => Ok(parsed),
        _ => Err(format!("expects a value between {min} and {max}")),
    }
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                 Clear conversation history
  /model <name>          Change the model (e.g., /model gpt-4o)
  /system [prompt]       Set system prompt (no argument removes it)
  /temperature <v>       Set temperature 0.0-2.0 (use 'clear' to reset)
  /top_p <v>             Set top-p 0.0-1.0 (use 'clear' to reset)
  /max_tokens <n>        Cap response tokens (use 'clear' to reset)
  /stop <seq>            Add a stop sequence
  /stop clear            Clear all stop sequences
  /stream on|off         Stream responses as they are generated
  /history               Show the conversation so far
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit the chat"#
}
