//! Command name table.
//!
//! Built once at startup with [`RegistryBuilder`], then frozen into a
//! [`CommandRegistry`] that sessions share read-only.

use std::collections::HashMap;
use std::fmt;

use crate::command::Command;

/// Collects commands before any session starts.
#[derive(Default)]
pub struct RegistryBuilder {
    commands: HashMap<String, Box<dyn Command>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `cmd` under `name`. A later registration of the same name
    /// replaces the earlier one.
    pub fn register(&mut self, name: impl Into<String>, cmd: Box<dyn Command>) -> &mut Self {
        let name = name.into();
        if self.commands.insert(name.clone(), cmd).is_some() {
            log::debug!("Command {name} re-registered, previous implementation dropped");
        }
        self
    }

    /// Freeze the table.
    pub fn build(self) -> CommandRegistry {
        log::info!("Command registry ready with {} commands", self.commands.len());
        CommandRegistry {
            commands: self.commands,
        }
    }
}

/// Read-only map from executable name to implementation.
pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn Command>>,
}

impl CommandRegistry {
    /// The command registered as `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|cmd| &**cmd)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessEnv;

    struct Fixed {
        help: &'static str,
        code: i32,
    }

    impl Command for Fixed {
        fn help(&self) -> &str {
            self.help
        }
        fn exec(&self, _: &[&str], _: &mut dyn ProcessEnv) -> i32 {
            self.code
        }
        fn location(&self) -> &str {
            "/usr/bin"
        }
    }

    fn fixed(help: &'static str, code: i32) -> Box<dyn Command> {
        Box::new(Fixed { help, code })
    }

    #[test]
    fn empty_registry() {
        let reg = RegistryBuilder::new().build();
        assert!(reg.is_empty());
        assert!(reg.lookup("ls").is_none());
    }

    #[test]
    fn lookup_finds_registered() {
        let mut builder = RegistryBuilder::new();
        builder.register("id", fixed("print user identity", 0));
        let reg = builder.build();
        let cmd = reg.lookup("id").expect("id registered");
        assert_eq!(cmd.help(), "print user identity");
        assert_eq!(cmd.location(), "/usr/bin");
    }

    #[test]
    fn last_registration_wins() {
        let mut builder = RegistryBuilder::new();
        builder
            .register("uname", fixed("first", 1))
            .register("uname", fixed("second", 2));
        let reg = builder.build();
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.lookup("uname").unwrap().help(), "second");
    }

    #[test]
    fn lookup_is_exact() {
        let mut builder = RegistryBuilder::new();
        builder.register("ls", fixed("list", 0));
        let reg = builder.build();
        assert!(reg.lookup("LS").is_none());
        assert!(reg.lookup("/bin/ls").is_none());
        assert!(reg.lookup("l").is_none());
    }

    #[test]
    fn names_sorted() {
        let mut builder = RegistryBuilder::new();
        for name in ["wget", "cat", "ps"] {
            builder.register(name, fixed("", 0));
        }
        let reg = builder.build();
        assert_eq!(reg.names(), ["cat", "ps", "wget"]);
        assert!(format!("{reg:?}").contains("wget"));
    }

    #[test]
    fn registry_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CommandRegistry>();
    }
}
