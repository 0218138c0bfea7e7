//! Line commands understood by the terminal chat.

/// One parsed line of REPL input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Quit,
    New,
    Threads,
    Switch(&'a str),
    /// A known command with missing or bad arguments; carries the usage text.
    Usage(&'static str),
    /// Plain text for the assistant.
    Send(&'a str),
}

impl<'a> Command<'a> {
    /// Parses a trimmed, non-empty input line.
    pub fn parse(line: &'a str) -> Self {
        match line.split_once(' ').unwrap_or((line, "")) {
            ("/quit", _) | ("/exit", _) => Command::Quit,
            ("/new", _) => Command::New,
            ("/threads", _) => Command::Threads,
            ("/switch", thread_id) if !thread_id.trim().is_empty() => {
                Command::Switch(thread_id.trim())
            }
            ("/switch", _) => Command::Usage("usage: /switch <thread id>"),
            _ => Command::Send(line),
        }
    }
}
