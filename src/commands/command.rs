//! Command parsing

use super::error::CommandError;

/// A parsed player command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a fight here, or join the one already going
    Fight,
    Attack { target: String },
    /// End the turn without doing anything else
    Pass,
    /// End the turn and signal willingness to stop fighting
    Disengage,
    /// Recover to full health outside of combat
    Rest,
    Use { item: String, target: Option<String> },
    Help { topic: Option<String> },
}

impl Command {
    /// Parse one line of input
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let (word, args) = match line.split_once(char::is_whitespace) {
            Some((word, args)) => (word, args.trim()),
            None => (line, ""),
        };

        match word.to_lowercase().as_str() {
            "fight" => Ok(Command::Fight),
            "attack" => {
                if args.is_empty() {
                    return Err(CommandError::Usage("attack <target>"));
                }
                Ok(Command::Attack { target: args.to_string() })
            }
            "pass" | "wait" | "hold" => Ok(Command::Pass),
            "disengage" | "spare" => Ok(Command::Disengage),
            "rest" => Ok(Command::Rest),
            "use" => {
                let (item, target) = match args.split_once('=') {
                    Some((item, target)) => (item.trim(), Some(target.trim())),
                    None => (args, None),
                };
                if item.is_empty() || target == Some("") {
                    return Err(CommandError::Usage("use <item> [= <target>]"));
                }
                Ok(Command::Use {
                    item: item.to_string(),
                    target: target.map(str::to_string),
                })
            }
            "help" => Ok(Command::Help {
                topic: (!args.is_empty()).then(|| args.to_string()),
            }),
            "" => Err(CommandError::Unknown(String::new())),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }

    /// Name the command goes by
    pub fn key(&self) -> &'static str {
        match self {
            Command::Fight => "fight",
            Command::Attack { .. } => "attack",
            Command::Pass => "pass",
            Command::Disengage => "disengage",
            Command::Rest => "rest",
            Command::Use { .. } => "use",
            Command::Help { .. } => "help",
        }
    }
}
