//! Several sessions sharing one registry.

use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex};
use std::thread;

use decoy_os::{
    Command, Dispatcher, EXIT_CRASHED, EXIT_NOT_FOUND, ProcessEnv, ReadWrite, RegistryBuilder,
    SessionIo, VirtualProcess,
};
use decoy_vfs::MemoryVfs;

#[derive(Clone, Default)]
struct Sink(Arc<Mutex<Vec<u8>>>);

impl Sink {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for Sink {
    fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
        Ok(0)
    }
}

struct Channel {
    input: Cursor<Vec<u8>>,
    output: Sink,
    error: Sink,
}

impl SessionIo for Channel {
    fn input(&mut self) -> &mut dyn Read {
        &mut self.input
    }
    fn output(&mut self) -> &mut dyn Write {
        &mut self.output
    }
    fn error(&mut self) -> &mut dyn ReadWrite {
        &mut self.error
    }
}

struct Pwd;
impl Command for Pwd {
    fn help(&self) -> &str {
        "print working directory"
    }
    fn exec(&self, _: &[&str], env: &mut dyn ProcessEnv) -> i32 {
        let cwd = env.getcwd().to_string();
        match writeln!(env.stdout(), "{cwd}") {
            Ok(()) => 0,
            Err(_) => 1,
        }
    }
}

struct Cd;
impl Command for Cd {
    fn help(&self) -> &str {
        "change directory"
    }
    fn exec(&self, args: &[&str], env: &mut dyn ProcessEnv) -> i32 {
        match env.chdir(args.first().copied().unwrap_or("/")) {
            Ok(()) => 0,
            Err(_) => 1,
        }
    }
}

struct Overflow;
impl Command for Overflow {
    fn help(&self) -> &str {
        "always crashes"
    }
    fn exec(&self, args: &[&str], _: &mut dyn ProcessEnv) -> i32 {
        let width: u8 = 200;
        let extra: u8 = args.len() as u8 + 100;
        i32::from(width.checked_add(extra).expect("arithmetic overflow"))
    }
}

fn session(name: &str, home: &str) -> (VirtualProcess, Sink, Sink) {
    let output = Sink::default();
    let error = Sink::default();
    let channel = Channel {
        input: Cursor::new(Vec::new()),
        output: output.clone(),
        error: error.clone(),
    };
    let vfs = MemoryVfs::with_dirs(["/etc", "/tmp"]).unwrap();
    let process =
        VirtualProcess::new(name, home, Box::new(vfs), Box::new(channel), 80, 24).unwrap();
    (process, output, error)
}

fn dispatcher() -> Dispatcher {
    let mut builder = RegistryBuilder::new();
    builder
        .register("pwd", Box::new(Pwd))
        .register("cd", Box::new(Cd))
        .register("overflow", Box::new(Overflow));
    Dispatcher::new(Arc::new(builder.build()))
}

#[test]
fn sessions_are_independent() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dispatcher = dispatcher();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let dispatcher = dispatcher.clone();
            thread::spawn(move || {
                let home = format!("/home/user{i}");
                let (mut process, out, err) = session(&format!("s{i}"), &home);
                if i % 2 == 0 {
                    assert_eq!(
                        dispatcher.exec(&mut process, "overflow", &[]).unwrap(),
                        EXIT_CRASHED
                    );
                }
                assert_eq!(dispatcher.exec(&mut process, "cd", &["/tmp"]).unwrap(), 0);
                assert_eq!(dispatcher.exec(&mut process, "/bin/pwd", &[]).unwrap(), 0);
                (i, out.text(), err.text())
            })
        })
        .collect();

    for handle in handles {
        let (i, out, err) = handle.join().expect("session thread must not panic");
        assert_eq!(out, "/tmp\r\n");
        if i % 2 == 0 {
            assert_eq!(err, "Segmentation fault\n");
        } else {
            assert!(err.is_empty());
        }
    }
}

#[test]
fn unknown_command_leaves_session_usable() {
    let dispatcher = dispatcher();
    let (mut process, out, err) = session("s", "/root");
    let e = dispatcher.exec(&mut process, "/usr/bin/curl", &["-O", "x"]).unwrap_err();
    assert_eq!(e.exit_status(), EXIT_NOT_FOUND);
    assert_eq!(dispatcher.exec(&mut process, "pwd", &[]).unwrap(), 0);
    assert_eq!(out.text(), "/root\r\n");
    assert!(err.text().is_empty());
}

#[test]
fn recorder_sees_command_io() {
    let dispatcher = dispatcher();
    let (mut process, out, _) = session("s", "/root");
    let mut recording = Cursor::new(Vec::new());
    dispatcher
        .exec_observed(&mut process, "cd", &["/etc"], &mut recording)
        .unwrap();
    dispatcher
        .exec_observed(&mut process, "pwd", &[], &mut recording)
        .unwrap();
    assert_eq!(recording.into_inner(), b"/etc\r\n");
    assert!(out.text().is_empty());
    assert_eq!(process.getcwd(), "/etc");
}
