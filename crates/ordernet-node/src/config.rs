//! Node configuration.
//!
//! Built from CLI arguments by the binary; UI processes construct it
//! directly. `ORDERNET_HOME` overrides the data directory root,
//! `ORDERNET_PASSPHRASE` supplies the identity passphrase.

use std::path::PathBuf;

use ordernet_types::DEFAULT_PASSPHRASE;

use crate::{NodeError, Result};

/// Everything the node needs to start.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Initial nickname, used only when no stored identity exists.
    pub nickname: Option<String>,
    /// Local TCP listen port for the transport engine; 0 = ephemeral.
    pub port: u16,
    /// Database path override.
    pub db_path: Option<PathBuf>,
    /// Multiaddrs of peers the transport engine dials at startup. Dial
    /// failures there are swallowed; discovery continues in the background.
    pub bootstrap: Vec<String>,
    /// Enable LAN mDNS discovery in the transport engine.
    pub mdns: bool,
    /// Identity passphrase; the well-known default applies when unset.
    pub passphrase: Option<String>,
}

impl NodeConfig {
    /// Parse CLI arguments (without the program name).
    ///
    /// `--nick <string>`, `--port <int>`, `--db <path>`,
    /// `--bootstrap <multiaddr>` (repeatable), `--mdns`.
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = NodeConfig {
            passphrase: std::env::var("ORDERNET_PASSPHRASE").ok(),
            ..NodeConfig::default()
        };

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--nick" => {
                    config.nickname = Some(required_value(&mut args, "--nick")?);
                }
                "--port" => {
                    let value = required_value(&mut args, "--port")?;
                    config.port = value
                        .parse()
                        .map_err(|_| NodeError::InvalidArguments(format!("bad port '{value}'")))?;
                }
                "--db" => {
                    config.db_path = Some(PathBuf::from(required_value(&mut args, "--db")?));
                }
                "--bootstrap" => {
                    config.bootstrap.push(required_value(&mut args, "--bootstrap")?);
                }
                "--mdns" => {
                    config.mdns = true;
                }
                other => {
                    return Err(NodeError::InvalidArguments(format!(
                        "unknown argument '{other}'"
                    )));
                }
            }
        }
        Ok(config)
    }

    /// The identity passphrase in effect.
    pub fn passphrase(&self) -> &str {
        self.passphrase.as_deref().unwrap_or(DEFAULT_PASSPHRASE)
    }

    /// The database file path in effect.
    pub fn db_path(&self) -> PathBuf {
        match &self.db_path {
            Some(path) => path.clone(),
            None => Self::default_data_dir().join("ordernet.db"),
        }
    }

    /// Create the directory holding the database, mode 0700, if absent.
    pub fn ensure_db_dir(&self) -> std::io::Result<()> {
        let db_path = self.db_path();
        let Some(dir) = db_path.parent() else {
            return Ok(());
        };
        if dir.as_os_str().is_empty() || dir.exists() {
            return Ok(());
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            std::fs::DirBuilder::new()
                .recursive(true)
                .mode(0o700)
                .create(dir)
        }
        #[cfg(not(unix))]
        {
            std::fs::create_dir_all(dir)
        }
    }

    /// `$ORDERNET_HOME`, else `$HOME/.ordernet`.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("ORDERNET_HOME") {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".ordernet"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/ordernet"))
    }
}

fn required_value<I>(args: &mut I, flag: &str) -> Result<String>
where
    I: Iterator<Item = String>,
{
    args.next()
        .ok_or_else(|| NodeError::InvalidArguments(format!("{flag} requires a value")))
}
