//! Interactive chat application for conversing with Claude on Amazon Bedrock.
//!
//! # Usage
//!
//! ```bash
//! # Credentials come from the environment or a .env file
//! export AWS_ACCESS_KEY_ID=... AWS_SECRET_ACCESS_KEY=...
//!
//! # Basic usage with default settings
//! bedrock-chat
//!
//! # Stream responses from Claude 2.1 in another region
//! bedrock-chat --stream --model anthropic.claude-v2:1 --region us-east-1
//!
//! # Disable colors (useful for piping output)
//! bedrock-chat --no-color
//! ```
//!
//! # Commands
//!
//! - `/stream on|off` - Stream responses as they are generated
//! - `/clear` - Restart the session
//! - `/history` - Replay the conversation
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use bedrock_chat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use bedrock_chat::{Bedrock, Credentials, StderrLogger, counter_readings, register_biometrics};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("bedrock-chat [OPTIONS]");
    let config = ChatConfig::from(args);
    let use_color = config.use_color;
    register_biometrics(biometrics::Collector::new());

    let credentials = Credentials::from_dotenv_and_env();
    let mut client = Bedrock::with_options(
        credentials,
        config.region.clone(),
        config.endpoint.clone(),
        None,
    )?
    .with_model(config.model.clone())
    .with_max_tokens(config.max_tokens)
    .with_temperature(config.temperature)
    .with_top_p(config.top_p)
    .with_top_k(config.top_k);
    if config.verbose {
        client = client.with_logger(Arc::new(StderrLogger));
    }

    let mut session = ChatSession::new(client, config);
    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;

    println!(
        "Bedrock Chat (model: {}, region: {})",
        session.config().model,
        session.client().region()
    );
    println!("Type /help for commands, /quit to exit\n");

    loop {
        match rl.readline("Human: ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Stream(on) => {
                            session.set_streaming(on);
                            if on {
                                renderer.print_info("Streaming enabled.");
                            } else {
                                renderer.print_info("Streaming disabled.");
                            }
                        }
                        ChatCommand::Clear => {
                            session.restart();
                            renderer.print_info("Session restarted.");
                        }
                        ChatCommand::History => session.replay(&mut renderer),
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {line}");
                            }
                        }
                        ChatCommand::Stats => print_stats(&session),
                        ChatCommand::ShowConfig => print_config(&session),
                        ChatCommand::Invalid(message) => renderer.print_error(&message),
                    }
                    continue;
                }

                session.submit(line, &mut renderer).await;
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }

    Ok(())
}

fn print_stats(session: &ChatSession<Bedrock>) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Model: {}", stats.model);
    println!(
        "      Turns: {} ({} human, {} assistant)",
        stats.turn_count, stats.human_turns, stats.assistant_turns
    );
    println!(
        "      Exchanges: {} completed, {} failed",
        stats.exchanges_completed, stats.exchanges_failed
    );
    println!(
        "      Time in exchanges: {} seconds",
        stats.total_elapsed.as_secs()
    );
    println!("    Metrics:");
    for (name, value) in counter_readings() {
        println!("      {name}: {value}");
    }
}

fn print_config(session: &ChatSession<Bedrock>) {
    let config = session.config();
    println!("    Current Configuration:");
    println!("      Model: {}", config.model);
    println!("      Region: {}", session.client().region());
    println!("      Endpoint: {}", session.client().endpoint());
    println!("      Max tokens: {}", config.max_tokens);
    println!("      Window: {} turns", config.window_turns);
    if let Some(temperature) = config.temperature {
        println!("      Temperature: {temperature:.2}");
    }
    if let Some(top_p) = config.top_p {
        println!("      Top-p: {top_p:.2}");
    }
    if let Some(top_k) = config.top_k {
        println!("      Top-k: {top_k}");
    }
    println!(
        "      Streaming: {}",
        if config.streaming { "on" } else { "off" }
    );
    println!("      System prompt: {}", config.system_prompt);
}
