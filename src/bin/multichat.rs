//! Interactive chat application for conversing with several hosted models.
//!
//! This binary provides a streaming REPL interface over an OpenRouter-style
//! chat completion API.  Each model reads its own API key from
//! `secrets.yaml` or the environment.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with the built-in model catalog
//! multichat
//!
//! # Start on a specific model with an image attached
//! multichat --model "Molmo 2 8B" --image cat.jpg
//!
//! # Use a custom catalog and secrets file
//! multichat --models models.yaml --secrets keys.yaml
//!
//! # Disable colors (useful for piping output)
//! multichat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/clear` - Clear conversation history
//! - `/model <name>` - Change the model
//! - `/models` - List the models
//! - `/image <file>` - Attach an image
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use multichat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use multichat::{Error, FileLogger, OpenRouter, Role};

/// Main entry point for the multichat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("multichat [OPTIONS]");
    let config = ChatConfig::from(args);

    let catalog = config.load_catalog()?;
    let credentials = config.load_credentials()?;
    let mut client = OpenRouter::with_options(config.base_url.clone(), config.timeout)?;
    if let Some(path) = &config.log_path {
        client = client.with_logger(Arc::new(FileLogger::append(path)?));
    }

    let mut session = ChatSession::new(client, catalog, credentials);
    if let Some(model) = &config.model {
        session.switch_model(model)?;
    }
    if let Some(path) = &config.image_path {
        session.attach_image_from_path(path)?;
    }

    // Flag for interrupt handling during streaming
    let interrupted = Arc::new(AtomicBool::new(false));
    let mut renderer =
        PlainTextRenderer::with_color(config.use_color).with_interrupt(interrupted.clone());
    let mut rl = DefaultEditor::new()?;

    // Set up Ctrl+C handler
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    println!("Multichat (model: {})", session.model());
    println!("Type /help for commands, /quit to exit\n");
    describe_model(&session, &mut renderer);

    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            session.clear();
                            renderer.print_info("Conversation cleared.");
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Model(name) => match session.switch_model(&name) {
                            Ok(true) => {
                                renderer.print_info(&format!(
                                    "Model changed to {}; conversation cleared.",
                                    session.model()
                                ));
                                describe_model(&session, &mut renderer);
                            }
                            Ok(false) => renderer
                                .print_info(&format!("Already using {}.", session.model())),
                            Err(err) => report(&mut renderer, &err),
                        },
                        ChatCommand::ListModels => {
                            print_models(&session);
                        }
                        ChatCommand::AttachImage(path) => {
                            match session.attach_image_from_path(&path) {
                                Ok(()) if session.model().supports_image_input => {
                                    renderer.print_info(&format!("Attached {path}."))
                                }
                                Ok(()) => renderer.print_info(&format!(
                                    "Attached {path}; {} does not accept images, so it will not be sent.",
                                    session.model().display_name
                                )),
                                Err(err) => report(&mut renderer, &err),
                            }
                        }
                        ChatCommand::DetachImage => {
                            if session.detach_image() {
                                renderer.print_info("Image removed.");
                            } else {
                                renderer.print_info("No image attached.");
                            }
                        }
                        ChatCommand::History => {
                            print_history(&session);
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to API
                if let Err(err) = session.send_streaming(line, &mut renderer).await {
                    if !err.is_abort() {
                        report(&mut renderer, &err);
                    }
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

fn report(renderer: &mut dyn Renderer, err: &Error) {
    if err.is_configuration() {
        renderer.print_configuration_error(&err.to_string());
    } else {
        renderer.print_error(&err.to_string());
    }
}

fn describe_model(session: &ChatSession, renderer: &mut dyn Renderer) {
    let model = session.model();
    if !model.description.is_empty() {
        renderer.print_info(&model.description);
    }
    if let Err(err) = session.check_credentials() {
        report(renderer, &err);
    }
}

fn print_models(session: &ChatSession) {
    println!("    Models:");
    for model in session.catalog().iter() {
        let marker = if model == session.model() { "*" } else { " " };
        let images = if model.supports_image_input {
            " [images]"
        } else {
            ""
        };
        println!("    {marker} {model}{images}");
    }
}

fn print_history(session: &ChatSession) {
    if session.transcript().is_empty() {
        println!("    (no messages)");
        return;
    }
    for turn in session.transcript() {
        let label = match turn.role {
            Role::User => "You",
            Role::Assistant => session.model().display_name.as_str(),
        };
        println!("    {label}: {}", turn.content);
    }
}

fn print_stats(session: &ChatSession) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Model: {}", stats.model);
    println!("      Messages: {}", stats.message_count);
    println!(
        "      Image: {}",
        match (stats.image_attached, stats.image_will_be_sent) {
            (false, _) => "(none)",
            (true, true) => "attached",
            (true, false) => "attached, not sent to this model",
        }
    );
    println!(
        "      Turns: {} completed / {} failed",
        stats.completed_turns, stats.failed_turns
    );
    println!(
        "      API key: {}",
        if session.check_credentials().is_ok() {
            "configured"
        } else {
            "missing"
        }
    );
}
