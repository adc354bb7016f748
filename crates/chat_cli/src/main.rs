//! Interactive REPL over the `chatgpt_api` client.
//!
//! Thin by design: reads prompts from stdin, streams answers to stdout, and
//! maps `!` commands onto the client's session operations.

mod commands;
mod settings;

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use futures_util::{pin_mut, StreamExt};

use chatgpt_api::{ChatBot, ChatGptError, TurnOptions};
use commands::{parse_bang_command, BangCommand, HELP_TEXT};
use credential_provider::{
    BearerTokenProvider, CachedTokenProvider, FileTokenStore, StaticTokenProvider,
};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), String> {
    let settings = settings::load_settings()?;
    let starting_conversation = settings.conversation_id.clone();
    let mut config = settings.into_chatgpt_config();

    let account = config.email.clone().unwrap_or_else(|| "default".to_owned());
    let provider = CachedTokenProvider::new(
        account,
        StaticTokenProvider::new(config.access_token.clone()),
        FileTokenStore::new(settings::token_cache_path()),
    );
    config.access_token = provider
        .bearer_token()
        .map_err(|error| format!("{error}; only pre-obtained access tokens are supported"))?;

    let mut bot = ChatBot::new(config).map_err(|error| error.to_string())?;
    if let Some(conversation_id) = starting_conversation {
        bot.set_conversation_id(conversation_id);
    }

    println!("Type '!help' to show a full list of commands");
    let stdin = io::stdin();
    loop {
        print!("You: ");
        io::stdout().flush().map_err(|error| error.to_string())?;

        let mut prompt = String::new();
        if stdin
            .lock()
            .read_line(&mut prompt)
            .map_err(|error| error.to_string())?
            == 0
        {
            return Ok(());
        }
        let prompt = prompt.trim();
        if prompt.is_empty() {
            continue;
        }

        match parse_bang_command(prompt) {
            Some(BangCommand::Help) => println!("{HELP_TEXT}"),
            Some(BangCommand::Reset) => {
                bot.reset_chat();
                println!("Chat session successfully reset.");
            }
            Some(BangCommand::Config) => println!("{:#?}", bot.config()),
            Some(BangCommand::Rollback(steps)) => match bot.rollback_conversation(steps) {
                Ok(()) => println!("Rolled back {steps} turns."),
                Err(error) => println!("{error}"),
            },
            Some(BangCommand::SetConversation(conversation_id)) => {
                bot.set_conversation_id(conversation_id);
                println!("Conversation has been changed.");
            }
            Some(BangCommand::Continue) => {
                let stream = bot.continue_write(TurnOptions::new());
                stream_to_stdout(stream).await;
            }
            Some(BangCommand::Exit) => return Ok(()),
            Some(BangCommand::Unknown(command)) => {
                println!("Unknown command {command}; try !help");
            }
            None => {
                let stream = bot.ask(prompt, TurnOptions::new().with_auto_continue(true));
                stream_to_stdout(stream).await;
            }
        }
    }
}

async fn stream_to_stdout(
    stream: impl futures_util::Stream<Item = Result<chatgpt_api::MessageDelta, ChatGptError>>,
) {
    println!("Chatbot:");
    pin_mut!(stream);

    let mut shown = String::new();
    while let Some(delta) = stream.next().await {
        match delta {
            Ok(delta) => {
                let suffix = delta
                    .message
                    .strip_prefix(&shown)
                    .unwrap_or(&delta.message)
                    .to_owned();
                print!("{suffix}");
                let _ = io::stdout().flush();
                shown = delta.message;
            }
            Err(error) => {
                eprintln!();
                eprintln!("error: {error}");
                break;
            }
        }
    }
    println!();
}
