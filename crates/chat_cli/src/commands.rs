/// REPL commands, entered with a leading `!`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BangCommand {
    Help,
    Reset,
    Config,
    /// Roll the conversation back `n` turns (default 1).
    Rollback(usize),
    SetConversation(String),
    Continue,
    Exit,
    Unknown(String),
}

pub fn parse_bang_command(input: &str) -> Option<BangCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('!') {
        return None;
    }

    let mut words = trimmed.split_whitespace();
    let command = words.next().unwrap_or(trimmed);

    let parsed = match command {
        "!help" => BangCommand::Help,
        "!reset" => BangCommand::Reset,
        "!config" => BangCommand::Config,
        "!rollback" => {
            let steps = words.next().and_then(|value| value.parse().ok()).unwrap_or(1);
            BangCommand::Rollback(steps)
        }
        "!setconversation" => match words.next() {
            Some(id) => BangCommand::SetConversation(id.to_owned()),
            None => BangCommand::Unknown(command.to_owned()),
        },
        "!continue" => BangCommand::Continue,
        "!exit" => BangCommand::Exit,
        _ => BangCommand::Unknown(command.to_owned()),
    };

    Some(parsed)
}

pub const HELP_TEXT: &str = "\
!help - Show this message
!reset - Forget the current conversation
!config - Show the current configuration
!rollback <n> - Roll the conversation back n turns (default 1)
!setconversation <uuid> - Switch to another conversation
!continue - Ask the assistant to keep writing
!exit - Exit this program";
