//! Interactive session input.

use std::io::{self, BufRead};

use tokio::sync::mpsc;

/// A command typed into a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionCommand {
    /// Forward the local file to everyone.
    Send,
    /// Trigger a run of the local file.
    Run,
    /// Trigger formatting of the local file.
    Format,
    /// Leave the session.
    Quit,
}

/// One line of input, interpreted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// A recognized command.
    Command(SessionCommand),
    /// Whitespace only.
    Blank,
    /// Anything else, trimmed.
    Unknown(String),
}

pub const HINT: &str = "commands: send, run, format, quit";

impl Input {
    pub fn parse(line: &str) -> Self {
        let word = line.trim();
        let command = match word.to_ascii_lowercase().as_str() {
            "" => return Self::Blank,
            "send" | "s" => SessionCommand::Send,
            "run" | "r" => SessionCommand::Run,
            "format" | "fmt" | "f" => SessionCommand::Format,
            "quit" | "exit" | "q" => SessionCommand::Quit,
            _ => return Self::Unknown(word.to_string()),
        };
        Self::Command(command)
    }
}

/// Read lines on a dedicated thread.
///
/// Blocking reads cannot be cancelled, so the thread is detached and only
/// stops at EOF, on a read error, or once the receiver is dropped.
pub fn spawn_line_reader<R>(reader: R) -> mpsc::UnboundedReceiver<io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let _ = std::thread::spawn(move || {
        for line in reader.lines() {
            let failed = line.is_err();
            if tx.send(line).is_err() || failed {
                break;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_aliases() {
        assert_eq!(Input::parse("send"), Input::Command(SessionCommand::Send));
        assert_eq!(Input::parse("  RUN \n"), Input::Command(SessionCommand::Run));
        assert_eq!(Input::parse("fmt"), Input::Command(SessionCommand::Format));
        assert_eq!(Input::parse("q"), Input::Command(SessionCommand::Quit));
    }

    #[test]
    fn blank_and_unknown() {
        assert_eq!(Input::parse("   "), Input::Blank);
        assert_eq!(Input::parse(" deploy "), Input::Unknown("deploy".into()));
    }

    #[tokio::test]
    async fn line_reader_yields_lines_then_ends() {
        let mut rx = spawn_line_reader(io::Cursor::new("send\nrun\n"));
        assert_eq!(rx.recv().await.unwrap().unwrap(), "send");
        assert_eq!(rx.recv().await.unwrap().unwrap(), "run");
        assert!(rx.recv().await.is_none());
    }
}
