//! Interactive chat with an OpenAI-compatible chat completion API.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings
//! OPENAI_API_KEY=sk-... chatter
//!
//! # Specify a model and system prompt
//! chatter --model gpt-4o --system "You are a helpful coding assistant"
//!
//! # Talk to a local server and wait for whole responses
//! chatter --base-url http://localhost:8080/v1 --no-stream
//! ```
//!
//! Type `/help` at the prompt for the available commands.  Ctrl+C while a
//! response is arriving abandons that response; the conversation continues.

use std::sync::{Arc, Mutex};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio_util::sync::CancellationToken;

use chatter::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use chatter::client::API_KEY_ENV;
use chatter::{Model, OpenAi};

const USER_LABEL: &str = "User: ";
const ASSISTANT_LABEL: &str = "Assistant: ";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("chatter [OPTIONS]");
    let config = ChatConfig::from(args);
    let use_color = config.use_color;

    if std::env::var(API_KEY_ENV).map_or(true, |key| key.trim().is_empty()) {
        eprintln!("Please set {API_KEY_ENV} environment variable.");
        std::process::exit(1);
    }
    let client = OpenAi::with_options(None, config.base_url.clone(), None)?;
    let mut session = ChatSession::new(client, config);
    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;

    // Token of the turn in flight; Ctrl+C cancels it.
    let current_turn: Arc<Mutex<Option<CancellationToken>>> = Arc::new(Mutex::new(None));
    let handler_turn = Arc::clone(&current_turn);
    ctrlc::set_handler(move || {
        if let Ok(turn) = handler_turn.lock()
            && let Some(token) = turn.as_ref()
        {
            token.cancel();
        }
    })?;

    renderer.print_label("Hi, I'm a chatbot. How can I help you?\n");
    renderer.print_info(&format!(
        "model: {} (type /help for commands, /quit to exit)",
        session.model()
    ));
    let prompt = if use_color {
        format!("\x1b[38;5;208m{USER_LABEL}\x1b[0m")
    } else {
        USER_LABEL.to_string()
    };

    loop {
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at the prompt clears the line.
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);

        if let Some(cmd) = parse_command(line) {
            if !handle_command(cmd, &mut session, &mut renderer) {
                break;
            }
            continue;
        }

        let cancel = CancellationToken::new();
        if let Ok(mut turn) = current_turn.lock() {
            *turn = Some(cancel.clone());
        }
        renderer.print_label(ASSISTANT_LABEL);
        let result = session.send(line, &mut renderer, &cancel).await;
        if let Ok(mut turn) = current_turn.lock() {
            *turn = None;
        }
        match result {
            Ok(_) => {}
            Err(err) if err.is_cancelled() => renderer.print_interrupted(),
            Err(err) => renderer.print_error(&err.to_string()),
        }
    }

    Ok(())
}

/// Apply one slash command; returns false when the REPL should exit.
fn handle_command(
    cmd: ChatCommand,
    session: &mut ChatSession,
    renderer: &mut PlainTextRenderer,
) -> bool {
    match cmd {
        ChatCommand::Quit => {
            println!("Goodbye!");
            return false;
        }
        ChatCommand::Help => {
            for line in help_text().lines() {
                println!("    {line}");
            }
        }
        ChatCommand::Clear => {
            session.clear();
            renderer.print_info("Conversation cleared.");
        }
        ChatCommand::Model(name) => {
            let model = Model::from(name);
            renderer.print_info(&format!("Model changed to: {model}"));
            session.set_model(model);
        }
        ChatCommand::System(prompt) => {
            match &prompt {
                Some(p) => renderer.print_info(&format!("System prompt set to: {p}")),
                None => renderer.print_info("System prompt removed."),
            }
            session.set_system_prompt(prompt);
        }
        ChatCommand::Temperature(value) => {
            session.set_temperature(Some(value));
            renderer.print_info(&format!("temperature set to {value:.2}"));
        }
        ChatCommand::ClearTemperature => {
            session.set_temperature(None);
            renderer.print_info("temperature reset to model default");
        }
        ChatCommand::TopP(value) => {
            session.set_top_p(Some(value));
            renderer.print_info(&format!("top_p set to {value:.2}"));
        }
        ChatCommand::ClearTopP => {
            session.set_top_p(None);
            renderer.print_info("top_p reset to model default");
        }
        ChatCommand::MaxTokens(value) => {
            session.set_max_tokens(Some(value));
            renderer.print_info(&format!("max_tokens set to {value}"));
        }
        ChatCommand::ClearMaxTokens => {
            session.set_max_tokens(None);
            renderer.print_info("max_tokens reset to model default");
        }
        ChatCommand::Stop(sequence) => {
            renderer.print_info(&format!("Added stop sequence: {sequence}"));
            session.add_stop_sequence(sequence);
        }
        ChatCommand::ClearStop => {
            session.clear_stop_sequences();
            renderer.print_info("Stop sequences cleared.");
        }
        ChatCommand::Stream(on) => {
            session.set_stream(on);
            renderer.print_info(if on {
                "Streaming enabled."
            } else {
                "Streaming disabled."
            });
        }
        ChatCommand::Stats => {
            for line in session.stats().to_string().lines() {
                println!("    {line}");
            }
        }
        ChatCommand::History => {
            for message in session.messages() {
                println!("    {}: {}", message.role, message.content);
            }
        }
        ChatCommand::Invalid(message) => {
            renderer.print_error(&message);
        }
    }
    true
}
