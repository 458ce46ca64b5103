//! Demonstration commands for the console session.
//!
//! Just enough of a userland to poke at the virtual process layer: the
//! output and error text mimic GNU coreutils and bash.

use std::io::{Read, Write};

use decoy_os::{Command, ProcessEnv, RegistryBuilder};
use decoy_types::config::DecoyConfig;
use decoy_vfs::EntryKind;

/// Register every demo command into `builder`.
pub fn register_commands(builder: &mut RegistryBuilder, config: &DecoyConfig) {
    builder
        .register("echo", Box::new(EchoCmd))
        .register("pwd", Box::new(PwdCmd))
        .register("cd", Box::new(CdCmd))
        .register("env", Box::new(EnvCmd))
        .register("export", Box::new(ExportCmd))
        .register("ls", Box::new(LsCmd))
        .register("cat", Box::new(CatCmd))
        .register("whoami", Box::new(WhoamiCmd))
        .register(
            "uname",
            Box::new(UnameCmd {
                hostname: config.hostname.clone(),
            }),
        );
}

/// Resolve a possibly-relative path against the current working directory,
/// folding `.` and `..`.
pub fn resolve_path(cwd: &str, input: &str) -> String {
    let raw = if input.starts_with('/') {
        input.to_string()
    } else {
        format!("{cwd}/{input}")
    };

    let mut parts: Vec<&str> = Vec::new();
    for component in raw.split('/') {
        match component {
            "" | "." => {},
            ".." => {
                parts.pop();
            },
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Value of `key` in the process environment.
fn lookup_env(env: &dyn ProcessEnv, key: &str) -> Option<String> {
    env.environ().into_iter().find_map(|entry| {
        let (k, v) = entry.split_once('=')?;
        (k == key).then(|| v.to_string())
    })
}

/// Map a write result to an exit status.
fn status(result: std::io::Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

// ---------------------------------------------------------------------------
// echo
// ---------------------------------------------------------------------------

struct EchoCmd;
impl Command for EchoCmd {
    fn help(&self) -> &str {
        "echo [-n] [STRING]...\n  Display a line of text."
    }
    fn exec(&self, args: &[&str], env: &mut dyn ProcessEnv) -> i32 {
        let (newline, words) = match args.first() {
            Some(&"-n") => (false, &args[1..]),
            _ => (true, args),
        };
        let mut out = env.stdout();
        let mut result = out.write_all(words.join(" ").as_bytes());
        if newline && result.is_ok() {
            result = out.write_all(b"\n");
        }
        status(result)
    }
}

// ---------------------------------------------------------------------------
// pwd / cd
// ---------------------------------------------------------------------------

struct PwdCmd;
impl Command for PwdCmd {
    fn help(&self) -> &str {
        "pwd\n  Print the name of the current working directory."
    }
    fn exec(&self, _args: &[&str], env: &mut dyn ProcessEnv) -> i32 {
        let cwd = env.getcwd().to_string();
        status(writeln!(env.stdout(), "{cwd}"))
    }
}

struct CdCmd;
impl Command for CdCmd {
    fn help(&self) -> &str {
        "cd [dir]\n  Change the shell working directory."
    }
    fn location(&self) -> &str {
        "shell builtin"
    }
    fn exec(&self, args: &[&str], env: &mut dyn ProcessEnv) -> i32 {
        let target = match args.first() {
            Some(&dir) => dir.to_string(),
            None => lookup_env(env, "HOME").unwrap_or_else(|| "/".to_string()),
        };
        let resolved = resolve_path(env.getcwd(), &target);
        let old = env.getcwd().to_string();
        match env.chdir(&resolved) {
            Ok(()) => {
                let _ = env.set_env("OLDPWD", &old);
                let _ = env.set_env("PWD", &resolved);
                0
            },
            Err(e) => {
                log::debug!("cd {target} failed: {e}");
                let _ = writeln!(env.stderr(), "-bash: cd: {target}: No such file or directory");
                1
            },
        }
    }
}

// ---------------------------------------------------------------------------
// env / export
// ---------------------------------------------------------------------------

struct EnvCmd;
impl Command for EnvCmd {
    fn help(&self) -> &str {
        "env\n  Print the environment."
    }
    fn location(&self) -> &str {
        "/usr/bin"
    }
    fn exec(&self, _args: &[&str], env: &mut dyn ProcessEnv) -> i32 {
        let mut vars = env.environ();
        vars.sort();
        let mut text = vars.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        status(env.stdout().write_all(text.as_bytes()))
    }
}

struct ExportCmd;
impl Command for ExportCmd {
    fn help(&self) -> &str {
        "export [name[=value] ...]\n  Set export attribute for shell variables."
    }
    fn location(&self) -> &str {
        "shell builtin"
    }
    fn exec(&self, args: &[&str], env: &mut dyn ProcessEnv) -> i32 {
        if args.is_empty() {
            let mut vars = env.environ();
            vars.sort();
            let mut out = env.stdout();
            for var in &vars {
                let (k, v) = var.split_once('=').unwrap_or((var.as_str(), ""));
                if let Err(e) = writeln!(out, "declare -x {k}=\"{v}\"") {
                    log::debug!("export: write failed: {e}");
                    return 1;
                }
            }
            return 0;
        }
        let mut code = 0;
        for arg in args {
            let (key, value) = arg.split_once('=').unwrap_or((*arg, ""));
            let valid = key
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                let _ = writeln!(
                    env.stderr(),
                    "-bash: export: `{arg}': not a valid identifier"
                );
                code = 1;
                continue;
            }
            let _ = env.set_env(key, value);
        }
        code
    }
}

// ---------------------------------------------------------------------------
// ls / cat
// ---------------------------------------------------------------------------

struct LsCmd;
impl Command for LsCmd {
    fn help(&self) -> &str {
        "ls [FILE]...\n  List directory contents."
    }
    fn exec(&self, args: &[&str], env: &mut dyn ProcessEnv) -> i32 {
        let mut targets: Vec<&str> = args
            .iter()
            .copied()
            .filter(|a| !a.starts_with('-'))
            .collect();
        if targets.is_empty() {
            targets.push(".");
        }

        let mut code = 0;
        let mut lines = Vec::new();
        for target in &targets {
            let path = resolve_path(env.getcwd(), target);
            match env.fs().stat(&path) {
                Ok(meta) if meta.kind == EntryKind::File => lines.push(target.to_string()),
                Ok(_) => match env.fs().readdir(&path) {
                    Ok(entries) => {
                        let names: Vec<String> = entries
                            .into_iter()
                            .filter(|e| !e.name.starts_with('.'))
                            .map(|e| e.name)
                            .collect();
                        if targets.len() > 1 {
                            lines.push(format!("{target}:"));
                        }
                        if !names.is_empty() {
                            lines.push(names.join("  "));
                        }
                    },
                    Err(e) => {
                        log::debug!("ls {path}: {e}");
                        code = 2;
                    },
                },
                Err(_) => {
                    let _ = writeln!(
                        env.stderr(),
                        "ls: cannot access '{target}': No such file or directory"
                    );
                    code = 2;
                },
            }
        }
        let mut text = lines.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        if env.stdout().write_all(text.as_bytes()).is_err() {
            return 1;
        }
        code
    }
}

struct CatCmd;
impl Command for CatCmd {
    fn help(&self) -> &str {
        "cat [FILE]...\n  Concatenate files and print on the standard output."
    }
    fn exec(&self, args: &[&str], env: &mut dyn ProcessEnv) -> i32 {
        if args.is_empty() {
            let mut data = Vec::new();
            if env.stdin().read_to_end(&mut data).is_err() {
                return 1;
            }
            return status(env.stdout().write_all(&data));
        }

        let mut code = 0;
        for name in args {
            let path = resolve_path(env.getcwd(), name);
            let result = env.fs().read(&path);
            match result {
                Ok(data) => {
                    if env.stdout().write_all(&data).is_err() {
                        return 1;
                    }
                },
                Err(e) => {
                    let reason = if e.is_not_found() {
                        "No such file or directory"
                    } else {
                        "Is a directory"
                    };
                    let _ = writeln!(env.stderr(), "cat: {name}: {reason}");
                    code = 1;
                },
            }
        }
        code
    }
}

// ---------------------------------------------------------------------------
// whoami / uname
// ---------------------------------------------------------------------------

struct WhoamiCmd;
impl Command for WhoamiCmd {
    fn help(&self) -> &str {
        "whoami\n  Print effective user name."
    }
    fn location(&self) -> &str {
        "/usr/bin"
    }
    fn exec(&self, _args: &[&str], env: &mut dyn ProcessEnv) -> i32 {
        let user = lookup_env(env, "USER").unwrap_or_else(|| "root".to_string());
        status(writeln!(env.stdout(), "{user}"))
    }
}

struct UnameCmd {
    hostname: String,
}

impl Command for UnameCmd {
    fn help(&self) -> &str {
        "uname [-a]\n  Print system information."
    }
    fn exec(&self, args: &[&str], env: &mut dyn ProcessEnv) -> i32 {
        let text = if args.contains(&"-a") {
            format!(
                "Linux {} 4.19.0-21-amd64 #1 SMP Debian 4.19.249-2 (2022-06-30) x86_64 GNU/Linux",
                self.hostname
            )
        } else if args.contains(&"-n") {
            self.hostname.clone()
        } else {
            "Linux".to_string()
        };
        status(writeln!(env.stdout(), "{text}"))
    }
}
