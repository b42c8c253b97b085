//! Copying reply text out of the terminal.
//!
//! There is no portable clipboard API, but every platform ships a small
//! command that reads stdin. The first candidate that accepts the text
//! wins; on Linux the list covers Wayland and X11 setups.

use std::io::Write;
use std::process::{Command, Stdio};

#[cfg(target_os = "macos")]
const CANDIDATES: &[(&str, &[&str])] = &[("pbcopy", &[])];

#[cfg(target_os = "windows")]
const CANDIDATES: &[(&str, &[&str])] = &[("cmd", &["/C", "clip"])];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const CANDIDATES: &[(&str, &[&str])] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
];

pub fn copy_to_clipboard(text: &str) -> Result<(), String> {
    let mut last_error = String::from("no clipboard command configured");
    for (program, args) in CANDIDATES {
        match pipe_through(program, args, text) {
            Ok(()) => return Ok(()),
            Err(e) => last_error = e,
        }
    }
    Err(last_error)
}

fn pipe_through(program: &str, args: &[&str], input: &str) -> Result<(), String> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|_| format!("`{program}` not available"))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input.as_bytes())
            .map_err(|e| format!("`{program}`: {e}"))?;
    }

    match child.wait() {
        Ok(status) if status.success() => Ok(()),
        _ => Err(format!("`{program}` exited with an error")),
    }
}
