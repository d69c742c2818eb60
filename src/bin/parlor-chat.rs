//! Interactive terminal client for the assistant endpoint.
//!
//! # Usage
//!
//! ```bash
//! # Endpoint from the environment
//! PARLOR_API_URL=http://localhost:8000/chat parlor-chat
//!
//! # Endpoint on the command line, no colors, throwaway identity
//! parlor-chat --endpoint http://localhost:8000/chat --no-color --ephemeral
//!
//! # Everything else from a YAML file
//! parlor-chat --config parlor.yaml
//! ```
//!
//! Diagnostics go to stderr and are filtered by `PARLOR_LOG` (default `parlor=warn`).
//!
//! # Commands
//!
//! - `/history` - Show the conversation so far
//! - `/whoami` - Show the client identity token
//! - `/stats` - Show session statistics
//! - `/help` - Show available commands
//! - `/quit` - Exit the application

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use parlor::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatController, PlainTextRenderer, Renderer, SubmitOutcome,
    help_text, parse_command,
};

/// Environment variable holding the diagnostic log filter.
const LOG_ENV: &str = "PARLOR_LOG";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| "parlor=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("parlor-chat [OPTIONS]");
    let config = ChatConfig::try_from(args)?;
    let controller = ChatController::from_config(&config)?;
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut rl = DefaultEditor::new()?;

    tracing::info!(endpoint = ?config.endpoint, "starting chat session");
    for message in controller.messages() {
        renderer.print_message(&message);
    }
    renderer.print_info("Type /help for commands, /quit to exit\n");

    loop {
        match rl.readline("You: ") {
            Ok(line) => {
                if let Some(cmd) = parse_command(&line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::History => {
                            for message in controller.messages() {
                                renderer.print_message(&message);
                            }
                        }
                        ChatCommand::WhoAmI => {
                            renderer.print_info(&format!("Identity: {}", controller.user_id()));
                        }
                        ChatCommand::Stats => {
                            print_stats(&controller);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                renderer.print_pending();
                match controller.submit(&line).await {
                    SubmitOutcome::Replied(message) => renderer.print_message(&message),
                    SubmitOutcome::Ignored | SubmitOutcome::Busy => {}
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn print_stats<E: parlor::Exchange>(controller: &ChatController<E>) {
    let stats = controller.stats();
    println!("    Session Statistics:");
    println!("      Messages: {}", stats.message_count);
    println!(
        "      From you / from assistant: {} / {}",
        stats.user_messages, stats.assistant_messages
    );
    println!(
        "      Replies: {} answered, {} without text, {} failed",
        stats.answered, stats.unanswered, stats.failed
    );
    println!(
        "      Ignored: {} blank, {} while busy",
        stats.ignored, stats.busy
    );
}
