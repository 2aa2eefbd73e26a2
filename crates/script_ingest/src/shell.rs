use std::fmt;

/// Shell used to interpret the configured command string.
///
/// Resolved once at startup and passed explicitly wherever a phase command is
/// built; nothing reads it from ambient state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ShellKind {
    /// `sh -c`, the default everywhere except Windows.
    Posix,
    /// `PowerShell.exe -Command`.
    PowerShell,
}

impl ShellKind {
    /// Picks the platform shell.
    pub fn detect() -> Self {
        if cfg!(windows) {
            ShellKind::PowerShell
        } else {
            ShellKind::Posix
        }
    }

    pub(crate) fn program(self) -> &'static str {
        match self {
            ShellKind::Posix => "sh",
            ShellKind::PowerShell => "PowerShell.exe",
        }
    }

    pub(crate) fn flag(self) -> &'static str {
        match self {
            ShellKind::Posix => "-c",
            ShellKind::PowerShell => "-Command",
        }
    }
}

impl fmt::Display for ShellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.program(), self.flag())
    }
}

/// Escapes one argument token for inclusion in the shell command line.
///
/// Single quotes are rewritten to `'"'"'` and spaces are backslash-escaped.
/// Other shell metacharacters pass through untouched; external programs may
/// rely on that passthrough, so it is preserved rather than hardened.
pub fn escape_arg(arg: &str) -> String {
    let mut escaped = String::with_capacity(arg.len());
    for ch in arg.chars() {
        match ch {
            '\'' => escaped.push_str(r#"'"'"'"#),
            ' ' => escaped.push_str(r"\ "),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Builds the single command line `<command> <escaped-arg> ...`.
///
/// An empty argument list yields the command alone.
pub fn command_line(command: &str, args: &[String]) -> String {
    let mut line = String::from(command);
    for arg in args {
        line.push(' ');
        line.push_str(&escape_arg(arg));
    }
    line
}

/// Full argv executed by the process layer: `[program, flag, command line]`.
pub fn invocation(shell: ShellKind, command: &str, args: &[String]) -> Vec<String> {
    vec![
        shell.program().to_string(),
        shell.flag().to_string(),
        command_line(command, args),
    ]
}
