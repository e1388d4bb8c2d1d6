//! Endpoint path resolution for Unix-like hosts.
//!
//! Slot `n` lives at `<dir>/discord-ipc-<n>`, where `<dir>` is one of the
//! runtime/temp directories, optionally under a sandbox sub-directory
//! (flatpak, snap).

use std::env;
use std::path::PathBuf;

pub const ENDPOINT_PREFIX: &str = "discord-ipc-";

const ENV_DIRS: [&str; 4] = ["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"];
const FALLBACK_DIR: &str = "/tmp";
const SANDBOX_DIRS: [&str; 2] = ["app/com.discordapp.Discord", "snap.discord"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResolver {
    base_dirs: Vec<PathBuf>,
}

impl EndpointResolver {
    /// Base directories from the environment, in lookup order, then `/tmp`.
    pub fn from_env() -> Self {
        let dirs = ENV_DIRS
            .iter()
            .filter_map(|key| env::var_os(key))
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .chain(std::iter::once(PathBuf::from(FALLBACK_DIR)));
        Self::with_base_dirs(dirs)
    }

    pub fn with_base_dirs(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut base_dirs: Vec<PathBuf> = Vec::new();
        for dir in dirs {
            if !base_dirs.contains(&dir) {
                base_dirs.push(dir);
            }
        }
        Self { base_dirs }
    }

    pub fn base_dirs(&self) -> &[PathBuf] {
        &self.base_dirs
    }

    /// Every path slot `slot` may live at, in connection order.
    pub fn candidates(&self, slot: u8) -> Vec<PathBuf> {
        let name = format!("{ENDPOINT_PREFIX}{slot}");
        let mut out = Vec::with_capacity(self.base_dirs.len() * (SANDBOX_DIRS.len() + 1));
        for dir in &self.base_dirs {
            out.push(dir.join(&name));
            for sandbox in SANDBOX_DIRS {
                out.push(dir.join(sandbox).join(&name));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_cover_sandboxes_in_order() {
        let r = EndpointResolver::with_base_dirs([PathBuf::from("/run/user/1000")]);
        let got = r.candidates(3);
        assert_eq!(
            got,
            vec![
                PathBuf::from("/run/user/1000/discord-ipc-3"),
                PathBuf::from("/run/user/1000/app/com.discordapp.Discord/discord-ipc-3"),
                PathBuf::from("/run/user/1000/snap.discord/discord-ipc-3"),
            ]
        );
    }

    #[test]
    fn duplicate_base_dirs_collapse() {
        let r = EndpointResolver::with_base_dirs([
            PathBuf::from("/tmp"),
            PathBuf::from("/var/tmp"),
            PathBuf::from("/tmp"),
        ]);
        assert_eq!(r.base_dirs(), &[PathBuf::from("/tmp"), PathBuf::from("/var/tmp")]);
        assert_eq!(r.candidates(0).len(), 6);
    }

    #[test]
    fn env_resolution_ends_with_tmp() {
        let r = EndpointResolver::from_env();
        assert_eq!(r.base_dirs().last(), Some(&PathBuf::from("/tmp")));
    }
}
