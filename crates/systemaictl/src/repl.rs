//! REPL - interactive loop
//!
//! `exit`/`quit` leave, `help` and `show config` are local, anything else goes
//! through the request pipeline. A failed request never ends the loop.

use crate::pipeline::Session;
use owo_colors::OwoColorize;
use std::io::{self, BufRead, Cursor, Write};
use systemai_common::SystemAiConfig;

/// Commands handled by the REPL itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand<'a> {
    Exit,
    Help,
    ShowConfig,
    Empty,
    Query(&'a str),
}

impl<'a> ReplCommand<'a> {
    pub fn parse(line: &'a str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "" => ReplCommand::Empty,
            "exit" | "quit" => ReplCommand::Exit,
            "help" => ReplCommand::Help,
            "show config" => ReplCommand::ShowConfig,
            _ => ReplCommand::Query(trimmed),
        }
    }
}

/// Source of operator input, read one line at a time.
///
/// Stdin is locked per line so the confirmation prompts can read from it
/// while a request is running.
pub trait LineSource {
    fn next_line(&mut self, buf: &mut String) -> io::Result<usize>;
}

impl LineSource for io::Stdin {
    fn next_line(&mut self, buf: &mut String) -> io::Result<usize> {
        self.read_line(buf)
    }
}

impl<T: AsRef<[u8]>> LineSource for Cursor<T> {
    fn next_line(&mut self, buf: &mut String) -> io::Result<usize> {
        BufRead::read_line(self, buf)
    }
}

/// Human-readable config listing
pub fn format_config(config: &SystemAiConfig) -> String {
    let flag = |b: bool| if b { "yes" } else { "no" };
    [
        ("Distro family", config.distro_family.clone()),
        ("Package manager", config.package_manager.to_string()),
        ("Shell", config.shell.clone()),
        ("Editor", config.editor.clone()),
        ("Allow root suggest", flag(config.allow_root_suggest).to_string()),
        ("Allow root execute", flag(config.allow_root_execute).to_string()),
        ("AI backend", config.ai_backend.clone()),
        ("AI model", config.ai_model.clone()),
        ("AI endpoint", config.ai_endpoint.clone()),
    ]
    .iter()
    .map(|(label, value)| format!("  {:<20} {}", format!("{}:", label), value))
    .collect::<Vec<_>>()
    .join("\n")
}

fn print_help(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "Describe what you want in plain language, for example:")?;
    writeln!(out, "  install htop")?;
    writeln!(out, "  show /etc/fstab")?;
    writeln!(out, "  create a hello world python script in ~/hello.py")?;
    writeln!(out)?;
    writeln!(out, "Every plan is checked and shown before anything runs.")?;
    writeln!(out, "Commands: help, show config, exit")
}

/// Run the loop until `exit` or end of input
pub fn run_repl<L: LineSource>(session: &mut Session, input: &mut L) -> io::Result<()> {
    {
        let out = session.out();
        writeln!(out, "{}", "🧠 SystemAI ready".bold())?;
        writeln!(out, "Try: 'update my system', 'install htop', 'show /etc/fstab'")?;
    }

    let mut line = String::new();
    loop {
        {
            let out = session.out();
            write!(out, "{} ", "systemai>".green())?;
            out.flush()?;
        }

        line.clear();
        if input.next_line(&mut line)? == 0 {
            writeln!(session.out())?;
            break;
        }

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => continue,
            ReplCommand::Exit => break,
            ReplCommand::Help => print_help(session.out())?,
            ReplCommand::ShowConfig => {
                let listing = format_config(&session.config);
                writeln!(session.out(), "{}", listing)?;
            }
            ReplCommand::Query(query) => {
                let result = session.handle_query(query);
                tracing::debug!(?result, "request finished");
            }
        }
    }

    Ok(())
}
