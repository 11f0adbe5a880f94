use std::{env, io, path::PathBuf};

use anyhow::{anyhow, Result};

/// Directory for logs of the tool. Follows $XDG_STATE_HOME or $HOME/.local/state on unix.
pub fn create_application_default_path() -> Result<PathBuf> {
    let path = {
        #[cfg(windows)]
        {
            let mut path = PathBuf::from(
                env::var("APPDATA").map_err(|_| anyhow!("APPDATA should be present on Windows"))?,
            );
            path.push("arbtt2toggl");
            path
        }
        #[cfg(not(windows))]
        {
            let mut path = env::var("XDG_STATE_HOME")
                .map(PathBuf::from)
                .or_else(|_| {
                    env::var("HOME").map(|home| {
                        let mut path = PathBuf::from(home);
                        path.push(".local/state");
                        path
                    })
                })
                .map_err(|_| anyhow!("Couldn't find neither XDG_STATE_HOME nor HOME"))?;
            path.push("arbtt2toggl");
            path
        }
    };

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

/// Default location of the checkpoint, next to arbtt's own data in `~/.arbtt`.
pub fn default_checkpoint_path() -> Result<PathBuf> {
    let home = {
        #[cfg(windows)]
        {
            env::var("USERPROFILE")
        }
        #[cfg(not(windows))]
        {
            env::var("HOME")
        }
    }
    .map_err(|_| anyhow!("Can't locate home directory for the checkpoint file"))?;

    let mut path = PathBuf::from(home);
    path.push(".arbtt");
    path.push("last_run");
    Ok(path)
}
