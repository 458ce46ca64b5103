//! Line-oriented shell loop driving the dispatcher.
//!
//! Reads a line, expands variables, splits it into words and hands the first
//! word to the dispatcher. `exit`, `logout` and `help` are handled here since
//! they act on the session and the registry rather than on the process.

use std::io::{self, Read, Write};

use decoy_os::{CrlfWriter, Dispatcher, ProcessEnv, ReadWrite, VirtualProcess};
use decoy_types::error::Result;

/// Malformed command line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    #[error("unexpected EOF while looking for matching `{0}'")]
    Unterminated(char),
}

/// Split a command line into words, honouring quotes and backslash escapes.
///
/// Single quotes keep everything literally. Inside double quotes a backslash
/// only escapes `"`, `\` and `$`.
pub fn tokenize(input: &str) -> std::result::Result<Vec<String>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut started = false;
    let mut chars = input.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;

    while let Some(ch) = chars.next() {
        if in_single {
            if ch == '\'' {
                in_single = false;
            } else {
                current.push(ch);
            }
        } else if in_double {
            if ch == '"' {
                in_double = false;
            } else if ch == '\\'
                && let Some(&next) = chars.peek()
                && matches!(next, '"' | '\\' | '$')
            {
                current.push(next);
                chars.next();
            } else {
                current.push(ch);
            }
        } else {
            match ch {
                '\'' => {
                    in_single = true;
                    started = true;
                },
                '"' => {
                    in_double = true;
                    started = true;
                },
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                    started = true;
                },
                c if c.is_whitespace() => {
                    if started {
                        tokens.push(std::mem::take(&mut current));
                        started = false;
                    }
                },
                _ => {
                    current.push(ch);
                    started = true;
                },
            }
        }
    }

    if in_single {
        return Err(SyntaxError::Unterminated('\''));
    }
    if in_double {
        return Err(SyntaxError::Unterminated('"'));
    }
    if started {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Expand `$VAR`, `${VAR}` and `$?` outside single quotes.
pub fn expand_variables<'a>(
    input: &str,
    last_status: i32,
    lookup: impl Fn(&str) -> Option<&'a str>,
) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut result = String::with_capacity(input.len());
    let mut in_single = false;
    let mut in_double = false;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '\\' if !in_single && i + 1 < chars.len() => {
                result.push(ch);
                result.push(chars[i + 1]);
                i += 2;
                continue;
            },
            '$' if !in_single && i + 1 < chars.len() => {
                if chars[i + 1] == '?' {
                    result.push_str(&last_status.to_string());
                    i += 2;
                    continue;
                }
                if chars[i + 1] == '{'
                    && let Some(end) = chars[i + 2..].iter().position(|&c| c == '}')
                {
                    let name: String = chars[i + 2..i + 2 + end].iter().collect();
                    result.push_str(lookup(&name).unwrap_or_default());
                    i += 3 + end;
                    continue;
                }
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_')
                {
                    end += 1;
                }
                if end > start {
                    let name: String = chars[start..end].iter().collect();
                    result.push_str(lookup(&name).unwrap_or_default());
                    i = end;
                    continue;
                }
            },
            _ => {},
        }
        result.push(ch);
        i += 1;
    }
    result
}

/// Read one line, without its terminator. `None` at end of input.
fn read_line(input: &mut dyn Read) -> io::Result<Option<String>> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match input.read(&mut byte) {
            Ok(0) if line.is_empty() => return Ok(None),
            Ok(0) => break,
            Ok(_) if byte[0] == b'\n' => break,
            Ok(_) => line.push(byte[0]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
            Err(e) => return Err(e),
        }
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}

/// What the loop does after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit(i32),
}

/// An interactive session over one virtual process.
pub struct Shell {
    dispatcher: Dispatcher,
    process: VirtualProcess,
    recorder: Option<Box<dyn ReadWrite + Send>>,
    hostname: String,
    user: String,
    home: String,
    last_status: i32,
}

impl Shell {
    pub fn new(
        dispatcher: Dispatcher,
        process: VirtualProcess,
        hostname: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        let home = process.getcwd().to_string();
        Self {
            dispatcher,
            process,
            recorder: None,
            hostname: hostname.into(),
            user: user.into(),
            home,
            last_status: 0,
        }
    }

    /// Route all command IO and prompts through `recorder`.
    pub fn with_recorder(mut self, recorder: Box<dyn ReadWrite + Send>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Prompt text, e.g. `root@svr04:~# `.
    pub fn prompt(&self) -> String {
        let cwd = self.process.getcwd();
        let dir = if cwd == self.home {
            "~".to_string()
        } else if let Some(rest) = cwd.strip_prefix(&self.home)
            && rest.starts_with('/')
        {
            format!("~{rest}")
        } else {
            cwd.to_string()
        };
        let sigil = if self.user == "root" { '#' } else { '$' };
        format!("{}@{}:{dir}{sigil} ", self.user, self.hostname)
    }

    /// Run until `exit` or end of input. Returns the session's exit status.
    pub fn run(&mut self) -> Result<i32> {
        loop {
            let prompt = self.prompt();
            self.terminal().write_all(prompt.as_bytes())?;
            self.terminal().flush()?;

            let line = match &mut self.recorder {
                Some(rec) => read_line(&mut **rec)?,
                None => read_line(self.process.stdin())?,
            };
            let Some(line) = line else {
                log::info!("Session {} reached end of input", self.process.session());
                return Ok(self.last_status);
            };
            if let Flow::Exit(code) = self.run_line(&line)? {
                return Ok(code);
            }
        }
    }

    /// Output for text the shell itself prints.
    fn terminal(&mut self) -> CrlfWriter<&mut dyn Write> {
        let out: &mut dyn Write = match &mut self.recorder {
            Some(rec) => &mut **rec,
            None => self.process.raw_output(),
        };
        CrlfWriter::new(out)
    }

    /// Error output for messages the shell itself prints.
    fn diagnostics(&mut self) -> CrlfWriter<&mut dyn Write> {
        let out: &mut dyn Write = match &mut self.recorder {
            Some(rec) => &mut **rec,
            None => self.process.stderr(),
        };
        CrlfWriter::new(out)
    }

    fn run_line(&mut self, line: &str) -> Result<Flow> {
        let expanded = expand_variables(line, self.last_status, |name| self.process.getenv(name));
        let words = match tokenize(&expanded) {
            Ok(words) => words,
            Err(e) => {
                writeln!(self.diagnostics(), "-bash: {e}")?;
                self.last_status = 2;
                return Ok(Flow::Continue);
            },
        };
        let Some((name, rest)) = words.split_first() else {
            return Ok(Flow::Continue);
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        log::debug!(
            session = self.process.session(), cmd = name.as_str(), args:? = args;
            "Shell input"
        );

        match name.as_str() {
            "exit" | "logout" => {
                let code = match args.first() {
                    Some(n) => n.parse().unwrap_or(2),
                    None => self.last_status,
                };
                writeln!(self.terminal(), "logout")?;
                return Ok(Flow::Exit(code));
            },
            "help" => {
                self.last_status = self.help(&args)?;
                return Ok(Flow::Continue);
            },
            _ => {},
        }

        let result = match &mut self.recorder {
            Some(rec) => self
                .dispatcher
                .exec_observed(&mut self.process, name, &args, &mut **rec),
            None => self.dispatcher.exec(&mut self.process, name, &args),
        };
        self.last_status = match result {
            Ok(code) => code,
            Err(e) if e.is_not_found() => {
                writeln!(self.diagnostics(), "-bash: {name}: command not found")?;
                e.exit_status()
            },
            Err(e) => {
                log::warn!("Command {name} failed: {e}");
                e.exit_status()
            },
        };
        Ok(Flow::Continue)
    }

    fn help(&mut self, args: &[&str]) -> Result<i32> {
        let registry = self.dispatcher.registry();
        let mut text = String::new();
        let mut code = 0;
        if args.is_empty() {
            for name in registry.names() {
                let summary = registry
                    .lookup(name)
                    .and_then(|cmd| cmd.help().lines().nth(1))
                    .unwrap_or_default()
                    .trim();
                text.push_str(&format!("{name:<10} {summary}\n"));
            }
        } else {
            for name in args {
                match registry.lookup(name) {
                    Some(cmd) => {
                        text.push_str(&format!("{}\n  Location: {}\n", cmd.help(), cmd.location()));
                    },
                    None => {
                        text.push_str(&format!("-bash: help: no help topics match `{name}'.\n"));
                        code = 1;
                    },
                }
            }
        }
        self.terminal().write_all(text.as_bytes())?;
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use decoy_os::RegistryBuilder;
    use decoy_types::config::DecoyConfig;
    use decoy_vfs::Vfs;

    use super::*;
    use crate::commands::register_commands;
    use crate::test_support::{Buffer, make_session};

    fn shell(input: &[u8]) -> (Shell, Buffer, Buffer) {
        let mut builder = RegistryBuilder::new();
        register_commands(&mut builder, &DecoyConfig::default());
        let dispatcher = Dispatcher::new(Arc::new(builder.build()));
        let s = make_session(input);
        (
            Shell::new(dispatcher, s.process, "svr04", "root"),
            s.output,
            s.error,
        )
    }

    #[test]
    fn tokenize_handles_quotes_and_escapes() {
        assert_eq!(tokenize("ls  -la /tmp").unwrap(), ["ls", "-la", "/tmp"]);
        assert_eq!(
            tokenize(r#"echo 'a  b' "c \"d\"" e\ f"#).unwrap(),
            ["echo", "a  b", "c \"d\"", "e f"]
        );
        assert_eq!(tokenize("echo ''").unwrap(), ["echo", ""]);
        assert!(tokenize("   ").unwrap().is_empty());
    }

    #[test]
    fn tokenize_rejects_unterminated_quotes() {
        assert_eq!(tokenize("echo 'oops"), Err(SyntaxError::Unterminated('\'')));
        assert_eq!(tokenize("echo \"oops"), Err(SyntaxError::Unterminated('"')));
    }

    #[test]
    fn expansion_forms() {
        let lookup = |name: &str| match name {
            "HOME" => Some("/root"),
            "USER" => Some("root"),
            _ => None,
        };
        assert_eq!(expand_variables("cd $HOME", 0, lookup), "cd /root");
        assert_eq!(expand_variables("${USER}x $NOPE.", 0, lookup), "rootx .");
        assert_eq!(expand_variables("echo $?", 127, lookup), "echo 127");
        assert_eq!(expand_variables("echo '$HOME'", 0, lookup), "echo '$HOME'");
        assert_eq!(expand_variables("echo \\$HOME $", 0, lookup), "echo \\$HOME $");
    }

    #[test]
    fn prompt_abbreviates_home() {
        let (mut sh, _, _) = shell(b"");
        assert_eq!(sh.prompt(), "root@svr04:~# ");
        sh.run_line("cd /tmp").unwrap();
        assert_eq!(sh.prompt(), "root@svr04:/tmp# ");
        sh.process.fs().mkdir("/root/.ssh").unwrap();
        sh.run_line("cd /root/.ssh").unwrap();
        assert_eq!(sh.prompt(), "root@svr04:~/.ssh# ");
    }

    #[test]
    fn session_runs_until_exit() {
        let (mut sh, out, err) = shell(b"echo hi\r\ncd /tmp\npwd\nwget http://x/y.sh\necho $?\nexit 3\necho never\n");
        assert_eq!(sh.run().unwrap(), 3);
        let out = out.text();
        assert!(out.starts_with("root@svr04:~# hi\r\n"));
        assert!(out.contains("root@svr04:/tmp# /tmp\r\n"));
        assert!(out.contains("127\r\n"));
        assert!(out.ends_with("logout\r\n"));
        assert!(!out.contains("never"));
        assert_eq!(err.text(), "-bash: wget: command not found\r\n");
    }

    #[test]
    fn end_of_input_returns_last_status() {
        let (mut sh, _, _) = shell(b"cat /nope");
        assert_eq!(sh.run().unwrap(), 1);
        assert_eq!(sh.last_status, 1);
    }

    #[test]
    fn syntax_error_sets_status() {
        let (mut sh, _, err) = shell(b"");
        sh.run_line("echo \"open").unwrap();
        assert_eq!(sh.last_status, 2);
        assert_eq!(
            err.text(),
            "-bash: unexpected EOF while looking for matching `\"'\r\n"
        );
    }

    #[test]
    fn help_lists_and_describes() {
        let (mut sh, out, _) = shell(b"");
        sh.run_line("help").unwrap();
        assert!(out.text().contains("uname      Print system information.\r\n"));
        sh.run_line("help cd").unwrap();
        assert!(out.text().contains("Location: shell builtin\r\n"));
        sh.run_line("help nc").unwrap();
        assert_eq!(sh.last_status, 1);
    }

    #[test]
    fn recorder_receives_prompts_and_output() {
        let (sh, out, err) = shell(b"");
        let recording = Buffer::default();
        let mut sh = sh.with_recorder(Box::new(recording.clone()));
        sh.run_line("echo recorded").unwrap();
        assert_eq!(sh.last_status, 0);
        sh.run_line("cd /nope").unwrap();
        assert_eq!(sh.last_status, 1);
        sh.run_line("nmap").unwrap();
        assert_eq!(sh.last_status, 127);
        // The recording stream reads as end of input, so the loop prompts once.
        assert_eq!(sh.run().unwrap(), 127);

        let text = recording.text();
        assert!(text.starts_with("recorded\r\n"));
        assert!(text.contains("-bash: cd: /nope: No such file or directory\n"));
        assert!(text.contains("-bash: nmap: command not found\r\n"));
        assert!(text.ends_with("root@svr04:~# "));
        assert!(out.text().is_empty());
        assert!(err.text().is_empty());
    }

    #[test]
    fn shell_messages_use_crlf() {
        let (mut sh, out, err) = shell(b"");
        sh.run_line("curl").unwrap();
        assert_eq!(sh.run_line("logout").unwrap(), Flow::Exit(127));
        assert_eq!(err.text(), "-bash: curl: command not found\r\n");
        assert_eq!(out.text(), "logout\r\n");
    }
}
