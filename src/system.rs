use std::{path::Path, process::Command};

use tracing::info;

use crate::easter_egg::desktop_dir;

pub fn open_path_in_system(path: &Path) -> Result<(), String> {
    #[cfg(target_os = "windows")]
    {
        return Command::new("explorer.exe")
            .arg(path)
            .spawn()
            .map(|_| ())
            .map_err(|e| format!("failed opening {}: {e}", path.display()));
    }
    #[cfg(target_os = "linux")]
    {
        return Command::new("xdg-open")
            .arg(path)
            .spawn()
            .map(|_| ())
            .map_err(|e| format!("failed opening {}: {e}", path.display()));
    }
    #[cfg(target_os = "macos")]
    {
        return Command::new("open")
            .arg(path)
            .spawn()
            .map(|_| ())
            .map_err(|e| format!("failed opening {}: {e}", path.display()));
    }
    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        Err(format!(
            "opening files is unsupported on this platform: {}",
            path.display()
        ))
    }
}

pub fn open_desktop_folder() -> Result<(), String> {
    let desktop = desktop_dir().ok_or_else(|| "desktop folder not found".to_owned())?;
    open_path_in_system(&desktop)
}

pub fn open_task_manager() -> Result<(), String> {
    let mut command = task_manager_command();
    command
        .spawn()
        .map(|_| ())
        .map_err(|e| format!("failed launching task manager: {e}"))
}

#[cfg(target_os = "windows")]
fn task_manager_command() -> Command {
    Command::new("taskmgr.exe")
}

#[cfg(target_os = "macos")]
fn task_manager_command() -> Command {
    let mut command = Command::new("open");
    command.args(["-a", "Activity Monitor"]);
    command
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn task_manager_command() -> Command {
    Command::new("gnome-system-monitor")
}

/// Builds the shell invocation for a user supplied command line.
pub fn shell_command(command_line: &str) -> Result<Command, String> {
    let trimmed = command_line.trim();
    if trimmed.is_empty() {
        return Err("custom launch path is empty".to_owned());
    }
    #[cfg(target_os = "windows")]
    {
        let mut command = Command::new("cmd");
        command.args(["/C", trimmed]);
        Ok(command)
    }
    #[cfg(not(target_os = "windows"))]
    {
        let mut command = Command::new("sh");
        command.args(["-c", trimmed]);
        Ok(command)
    }
}

/// Starts the user's custom program without waiting for it.
pub fn launch_custom_command(command_line: &str) -> Result<(), String> {
    let mut command = shell_command(command_line)?;
    command
        .spawn()
        .map(|child| info!(pid = child.id(), command = %command_line.trim(), "launched custom command"))
        .map_err(|e| format!("failed launching {}: {e}", command_line.trim()))
}

/// Spawns a fresh copy of this executable with the current arguments.
pub fn restart_self() -> Result<(), String> {
    let exe = std::env::current_exe().map_err(|e| format!("cannot locate executable: {e}"))?;
    Command::new(&exe)
        .args(std::env::args_os().skip(1))
        .spawn()
        .map(|_| info!(exe = %exe.display(), "restarting"))
        .map_err(|e| format!("failed restarting {}: {e}", exe.display()))
}
