use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};

use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;

/// Processes started by the window manager. Autostart programs are kept
/// apart so they can be stopped on quit.
#[derive(Debug, Default)]
pub struct Children {
    autostart: Vec<Child>,
    spawned: Vec<Child>,
}

impl Children {
    /// Runs `command` through `sh -c` in its own process group.
    pub fn spawn_shell(&mut self, command: &str) {
        if let Some(child) = spawn(Command::new("sh").arg("-c").arg(command)) {
            self.spawned.push(child);
        }
    }

    pub fn spawn_with_args(&mut self, program: &str, args: &[String]) {
        if let Some(child) = spawn(Command::new(program).args(args)) {
            self.spawned.push(child);
        }
    }

    pub fn autostart(&mut self, command: &str) {
        if let Some(child) = spawn(Command::new("sh").arg("-c").arg(command)) {
            tracing::info!(command, pid = child.id(), "autostart spawned");
            self.autostart.push(child);
        }
    }

    /// Collects children that have exited, without blocking.
    pub fn reap(&mut self) {
        self.spawned.retain_mut(is_running);
        self.autostart.retain_mut(is_running);
    }

    /// Sends SIGTERM to the process group of every autostart program that is
    /// still running and waits for it.
    pub fn terminate_autostart(&mut self) {
        for mut child in self.autostart.drain(..) {
            if !is_running(&mut child) {
                continue;
            }
            let Ok(pid) = i32::try_from(child.id()) else {
                continue;
            };
            if let Err(error) = killpg(Pid::from_raw(pid), Signal::SIGTERM) {
                tracing::warn!(pid, %error, "failed to stop autostart program");
                continue;
            }
            if let Err(error) = child.wait() {
                tracing::warn!(pid, %error, "failed to wait for autostart program");
            }
        }
    }
}

fn is_running(child: &mut Child) -> bool {
    matches!(child.try_wait(), Ok(None))
}

fn spawn(command: &mut Command) -> Option<Child> {
    let result = command
        .stdin(Stdio::null())
        .process_group(0)
        .spawn();

    match result {
        Ok(child) => Some(child),
        Err(error) => {
            tracing::warn!(?command, %error, "failed to spawn");
            None
        }
    }
}

/// Builds the argument list for an array spawn. dmenu is pointed at the
/// selected monitor unless the caller already chose one.
pub fn command_args(command: &[String], selected_monitor: usize) -> Option<(&str, Vec<String>)> {
    let (program, args) = command.split_first()?;
    let mut args = args.to_vec();
    if program.contains("dmenu") && !args.iter().any(|arg| arg == "-m") {
        args.insert(0, selected_monitor.to_string());
        args.insert(0, "-m".to_string());
    }
    Some((program.as_str(), args))
}
