//! A line-driven front end for a [`Session`].
//!
//! Reads one command per line (from a terminal or a script) and prints the
//! outcome. Errors are printed and the loop carries on.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::session::Session;

const HELP: &str = "\
Commands:
  open <path>   open an image and show its metadata
  show          show the metadata of the open image
  strip         write a metadata-free copy of the open image
  undo          step back
  redo          step forward again
  status        show the session state
  clear         close the open image
  help          this text
  quit          leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open(PathBuf),
    Show,
    Strip,
    Undo,
    Redo,
    Status,
    Clear,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines and `#` comments give `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "open" => {
                if rest.is_empty() {
                    anyhow::bail!("usage: open <path>");
                }
                Self::Open(PathBuf::from(unquote(rest)))
            }
            "show" => Self::Show,
            "strip" | "scrub" => Self::Strip,
            "undo" => Self::Undo,
            "redo" => Self::Redo,
            "status" => Self::Status,
            "clear" => Self::Clear,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => anyhow::bail!("unknown command '{other}' (try `help`)"),
        };

        if !rest.is_empty() && !matches!(command, Self::Open(_)) {
            anyhow::bail!("'{word}' takes no arguments");
        }
        Ok(Some(command))
    }
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

/// Run commands from `input` against `session` until EOF or `quit`.
///
/// With `prompt` set, `> ` is printed before each line is read.
pub fn run<R: BufRead, W: Write>(
    session: &mut Session,
    input: R,
    out: &mut W,
    prompt: bool,
) -> Result<()> {
    let mut lines = input.lines();
    loop {
        if prompt {
            write!(out, "> ")?;
            out.flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read command")?;

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                writeln!(out, "error: {e}")?;
                continue;
            }
        };

        if command == Command::Quit {
            break;
        }
        if let Err(e) = execute(session, &command, out) {
            writeln!(out, "error: {e:#}")?;
        }
    }
    Ok(())
}

fn execute<W: Write>(session: &mut Session, command: &Command, out: &mut W) -> Result<()> {
    match command {
        Command::Open(path) => {
            let report = session.open(path)?;
            write!(out, "{report}")?;
        }
        Command::Show => {
            let report = session
                .state()
                .metadata
                .as_ref()
                .context("No image is open")?;
            write!(out, "{report}")?;
        }
        Command::Strip => {
            let result = session.scrub()?;
            let found = result.found.labels();
            let removed = if found.is_empty() {
                "nothing to remove".to_string()
            } else {
                format!("removed {}", found.join(", "))
            };
            writeln!(
                out,
                "{} → {} ({removed}, {} → {} bytes)",
                result.path.display(),
                result.output_path.as_deref().map(|p| p.display().to_string()).unwrap_or_default(),
                result.bytes_before,
                result.bytes_after,
            )?;
        }
        Command::Undo => {
            if session.undo() {
                writeln!(out, "undone")?;
                write_status(session, out)?;
            } else {
                writeln!(out, "nothing to undo")?;
            }
        }
        Command::Redo => {
            if session.redo() {
                writeln!(out, "redone")?;
                write_status(session, out)?;
            } else {
                writeln!(out, "nothing to redo")?;
            }
        }
        Command::Status => write_status(session, out)?,
        Command::Clear => {
            if session.clear() {
                writeln!(out, "closed")?;
            } else {
                writeln!(out, "nothing open")?;
            }
        }
        Command::Help => writeln!(out, "{HELP}")?,
        Command::Quit => {}
    }
    Ok(())
}

fn write_status<W: Write>(session: &Session, out: &mut W) -> Result<()> {
    let state = session.state();
    match &state.file_name {
        Some(name) => writeln!(out, "image: {name}")?,
        None => writeln!(out, "image: (none)")?,
    }
    if let Some(processed) = &state.processed {
        writeln!(out, "clean copy: {}", processed.display())?;
    }
    let strip = &session.config().strip;
    writeln!(
        out,
        "mode: {}{}",
        strip.mode,
        if strip.keep_icc { ", keeping ICC" } else { "" }
    )?;
    writeln!(
        out,
        "undo: {}, redo: {}",
        session.undo_depth(),
        session.redo_depth()
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::test_support;
    use tempfile::TempDir;

    #[test]
    fn parse_commands() {
        assert_eq!(Command::parse("undo").unwrap(), Some(Command::Undo));
        assert_eq!(Command::parse("  REDO ").unwrap(), Some(Command::Redo));
        assert_eq!(Command::parse("scrub").unwrap(), Some(Command::Strip));
        assert_eq!(Command::parse("exit").unwrap(), Some(Command::Quit));
        assert_eq!(
            Command::parse("open my photos/a.jpg").unwrap(),
            Some(Command::Open(PathBuf::from("my photos/a.jpg")))
        );
        assert_eq!(
            Command::parse("open \"a b.jpg\"").unwrap(),
            Some(Command::Open(PathBuf::from("a b.jpg")))
        );
    }

    #[test]
    fn parse_skips_blank_and_comments() {
        assert_eq!(Command::parse("").unwrap(), None);
        assert_eq!(Command::parse("   ").unwrap(), None);
        assert_eq!(Command::parse("# a comment").unwrap(), None);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(Command::parse("open").is_err());
        assert!(Command::parse("undo twice").is_err());
        assert!(Command::parse("rotate").is_err());
    }

    #[test]
    fn run_script() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        std::fs::write(&path, test_support::jpeg_with_metadata()).unwrap();

        let script = format!(
            "open {}\nstrip\nundo\nstatus\nbogus\nredo\nquit\nundo\n",
            path.display()
        );
        let mut session = Session::new(Config::default());
        let mut out = Vec::new();
        run(&mut session, script.as_bytes(), &mut out, false).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("a.jpg (Jpeg"));
        assert!(text.contains("removed EXIF"));
        assert!(text.contains("undone"));
        assert!(text.contains("error: unknown command 'bogus'"));
        assert!(text.contains("redone"));
        assert!(text.contains("clean copy:"));
        assert!(text.contains("mode: reencode"));

        // `quit` stopped the loop before the final undo
        assert!(session.state().processed.is_some());
        assert!(dir.path().join("a_clean.jpg").exists());
    }

    #[test]
    fn errors_do_not_stop_the_loop() {
        let mut session = Session::new(Config::default());
        let mut out = Vec::new();
        run(&mut session, "show\nstrip\nundo\n".as_bytes(), &mut out, false).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("error: No image is open"));
        assert!(text.contains("nothing to undo"));
    }
}
