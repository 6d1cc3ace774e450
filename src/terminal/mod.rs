use anyhow::{Context, Result};
use std::fmt;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// How the program to run is handed to the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStyle {
    /// Program and arguments as separate argv entries
    Argv,
    /// One shell-quoted string after the exec option
    SingleString,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalSpec {
    pub command: &'static str,
    pub title_opt: &'static str,
    /// `None` when the terminal takes the program as trailing positional arguments
    pub exec_opt: Option<&'static str>,
    pub exec_style: ExecStyle,
}

const TERMINALS: &[TerminalSpec] = &[
    TerminalSpec {
        command: "alacritty",
        title_opt: "-t",
        exec_opt: Some("-e"),
        exec_style: ExecStyle::Argv,
    },
    TerminalSpec {
        command: "termite",
        title_opt: "-t",
        exec_opt: Some("-e"),
        exec_style: ExecStyle::SingleString,
    },
    TerminalSpec {
        command: "gnome-terminal",
        title_opt: "-t",
        exec_opt: Some("--"),
        exec_style: ExecStyle::Argv,
    },
    TerminalSpec {
        command: "kitty",
        title_opt: "-T",
        exec_opt: None,
        exec_style: ExecStyle::Argv,
    },
    TerminalSpec {
        command: "foot",
        title_opt: "-T",
        exec_opt: None,
        exec_style: ExecStyle::Argv,
    },
    TerminalSpec {
        command: "xterm",
        title_opt: "-T",
        exec_opt: Some("-e"),
        exec_style: ExecStyle::Argv,
    },
    TerminalSpec {
        command: "urxvt",
        title_opt: "-title",
        exec_opt: Some("-e"),
        exec_style: ExecStyle::Argv,
    },
];

pub fn supported_names() -> Vec<&'static str> {
    TERMINALS.iter().map(|t| t.command).collect()
}

pub fn is_supported(name: &str) -> bool {
    TerminalSpec::lookup(name).is_some()
}

impl TerminalSpec {
    pub fn lookup(name: &str) -> Option<&'static TerminalSpec> {
        TERMINALS.iter().find(|t| t.command == name)
    }

    /// Build the full command line that opens this terminal running `program`
    pub fn launch(
        &self,
        title: &str,
        extra_args: &[String],
        program: &str,
        program_args: &[String],
    ) -> Result<TerminalLaunch> {
        if title.is_empty() {
            return Err(anyhow::anyhow!("Terminal title is empty"));
        }
        if program.is_empty() {
            return Err(anyhow::anyhow!("Program to execute is empty"));
        }

        let mut args = vec![self.title_opt.to_string(), title.to_string()];
        args.extend(extra_args.iter().cloned());

        if let Some(exec_opt) = self.exec_opt {
            args.push(exec_opt.to_string());
        }

        match self.exec_style {
            ExecStyle::Argv => {
                args.push(program.to_string());
                args.extend(program_args.iter().cloned());
            }
            ExecStyle::SingleString => {
                let words =
                    std::iter::once(program).chain(program_args.iter().map(String::as_str));
                args.push(shell_words::join(words));
            }
        }

        Ok(TerminalLaunch {
            program: self.command.to_string(),
            args,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalLaunch {
    pub program: String,
    pub args: Vec<String>,
}

impl TerminalLaunch {
    /// Start the terminal without waiting for it. Stdio and environment are inherited.
    pub fn spawn(&self) -> Result<()> {
        info!("🚀 Spawning terminal: {}", self);

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to spawn terminal '{}'", self.program))?;

        debug!("Terminal started with pid {:?}", child.id());
        Ok(())
    }
}

impl fmt::Display for TerminalLaunch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words = std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str));
        write!(f, "{}", shell_words::join(words))
    }
}
