//! Command construction shared by every spawn path

use std::ffi::OsStr;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;
#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// Platform tweaks applied to child processes
pub(crate) trait CommandExt {
    /// Do not open a console window for the child (Windows only).
    fn no_window(&mut self) -> &mut Self;

    /// Put the child in its own process group so terminal signals aimed at
    /// us (Ctrl-C) do not reach it.
    fn own_process_group(&mut self) -> &mut Self;
}

impl CommandExt for tokio::process::Command {
    fn no_window(&mut self) -> &mut Self {
        #[cfg(windows)]
        {
            self.creation_flags(CREATE_NO_WINDOW);
        }
        self
    }

    fn own_process_group(&mut self) -> &mut Self {
        #[cfg(unix)]
        {
            self.process_group(0);
        }
        #[cfg(windows)]
        {
            self.creation_flags(CREATE_NO_WINDOW | CREATE_NEW_PROCESS_GROUP);
        }
        self
    }
}

/// Create a `tokio::process::Command` with the platform defaults applied
pub(crate) fn tokio_command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(program);
    cmd.no_window();
    cmd
}
