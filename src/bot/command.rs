//! Slash-command parsing.

/// A recognized bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Stats,
    SetDumbChannel(Option<String>),
    RemoveDumbChannel,
    SetForceSub(Option<String>),
    RemoveForceSub,
    SetApiTemplate(Option<String>),
}

impl Command {
    /// Commands restricted to configured admins.
    #[must_use]
    pub fn requires_admin(&self) -> bool {
        !matches!(self, Self::Start | Self::Help)
    }
}

/// Parses `/name[@bot] [args]`.
///
/// Returns `None` for plain text, unknown commands and commands addressed to
/// a different bot. Arguments are everything after the first whitespace,
/// trimmed; empty arguments become `None`.
#[must_use]
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let text = text.trim_start();
    let rest = text.strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    let (name, target) = match head.split_once('@') {
        Some((name, target)) => (name, Some(target)),
        None => (head, None),
    };
    if let (Some(target), Some(own)) = (target, bot_username)
        && !target.eq_ignore_ascii_case(own.trim_start_matches('@'))
    {
        return None;
    }

    let args = (!args.is_empty()).then(|| args.to_string());
    let command = match name.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "stats" => Command::Stats,
        "set_dumb_channel" => Command::SetDumbChannel(args),
        "remove_dumb_channel" => Command::RemoveDumbChannel,
        "set_force_sub" => Command::SetForceSub(args),
        "remove_force_sub" => Command::RemoveForceSub,
        "set_api_template" => Command::SetApiTemplate(args),
        _ => return None,
    };
    Some(command)
}
