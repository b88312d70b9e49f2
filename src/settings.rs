use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const SETTINGS_FILE_NAME: &str = "servers.toml";

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    AnyConnect,
    Nc,
    Gp,
    Pulse,
    F5,
    Fortinet,
    Array,
}

impl Protocol {
    pub const ALL: [Protocol; 7] = [
        Protocol::AnyConnect,
        Protocol::Nc,
        Protocol::Gp,
        Protocol::Pulse,
        Protocol::F5,
        Protocol::Fortinet,
        Protocol::Array,
    ];

    pub fn cli_name(self) -> &'static str {
        match self {
            Self::AnyConnect => "anyconnect",
            Self::Nc => "nc",
            Self::Gp => "gp",
            Self::Pulse => "pulse",
            Self::F5 => "f5",
            Self::Fortinet => "fortinet",
            Self::Array => "array",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::AnyConnect => "AnyConnect",
            Self::Nc => "Juniper",
            Self::Gp => "GlobalProtect",
            Self::Pulse => "Pulse",
            Self::F5 => "F5",
            Self::Fortinet => "Fortinet",
            Self::Array => "Array",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerProfile {
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub save_password: bool,
    #[serde(default)]
    pub minimize_on_connect: bool,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub server_certificate: String,
    #[serde(default = "default_use_system_proxy")]
    pub use_system_proxy: bool,
    #[serde(default)]
    pub disable_dtls: bool,
}

fn default_use_system_proxy() -> bool {
    true
}

impl ServerProfile {
    /// A profile for a gateway typed straight into the server box.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            server: name.to_string(),
            username: String::new(),
            password: String::new(),
            group: String::new(),
            save_password: false,
            minimize_on_connect: false,
            protocol: Protocol::default(),
            server_certificate: String::new(),
            use_system_proxy: true,
            disable_dtls: false,
        }
    }

    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    pub fn clear_credentials(&mut self) {
        self.password.clear();
        self.group.clear();
    }
}

#[derive(Serialize, Deserialize, Default)]
struct SettingsFile {
    #[serde(default)]
    servers: BTreeMap<String, ServerProfile>,
}

/// Named server profiles persisted as one TOML table per server.
pub struct ProfileStore {
    path: PathBuf,
    servers: BTreeMap<String, ServerProfile>,
}

pub fn settings_directory() -> PathBuf {
    let directory = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("openconnect-ui");
    if let Err(error) = std::fs::create_dir_all(&directory) {
        log::warn!(
            "[settings] failed to create settings directory {}: {error}",
            directory.display()
        );
    }
    directory
}

impl ProfileStore {
    pub fn open_default() -> Self {
        let path = settings_directory().join(SETTINGS_FILE_NAME);
        match Self::open(&path) {
            Ok(store) => store,
            Err(error) => {
                log::warn!("[settings] {error}; starting with an empty server list");
                Self {
                    path,
                    servers: BTreeMap::new(),
                }
            }
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let servers = match std::fs::read_to_string(path) {
            Ok(content) => {
                let file: SettingsFile =
                    toml::from_str(&content).map_err(|source| Error::Parse {
                        path: path.display().to_string(),
                        source,
                    })?;
                file.servers
                    .into_iter()
                    .map(|(name, mut profile)| {
                        profile.name = name.clone();
                        (name, profile)
                    })
                    .collect()
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                log::info!(
                    "[settings] no settings file at {}, using defaults",
                    path.display()
                );
                BTreeMap::new()
            }
            Err(error) => return Err(error.into()),
        };

        log::info!(
            "[settings] loaded {} servers from {}",
            servers.len(),
            path.display()
        );
        Ok(Self {
            path: path.to_path_buf(),
            servers,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn server_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.servers.keys().cloned().collect();
        names.sort_by_key(|name| name.to_lowercase());
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.servers.contains_key(name)
    }

    pub fn load(&self, name: &str) -> Option<ServerProfile> {
        self.servers.get(name).cloned()
    }

    /// Unknown names become a fresh profile whose gateway is the name itself.
    pub fn load_or_new(&self, name: &str) -> ServerProfile {
        self.load(name).unwrap_or_else(|| ServerProfile::new(name))
    }

    pub fn save(&mut self, profile: &ServerProfile) -> Result<()> {
        if profile.name.trim().is_empty() {
            return Err(Error::Settings("server name must not be empty".into()));
        }
        self.servers.insert(profile.name.clone(), profile.clone());
        self.write()?;
        log::info!("[settings] saved server: {}", profile.name);
        Ok(())
    }

    /// Saves `profile`, dropping the entry stored under `previous_name` when the name changed.
    pub fn save_renamed(&mut self, previous_name: &str, profile: &ServerProfile) -> Result<()> {
        if !previous_name.is_empty() && previous_name != profile.name {
            self.servers.remove(previous_name);
            log::info!(
                "[settings] renamed server: {previous_name} -> {}",
                profile.name
            );
        }
        self.save(profile)
    }

    pub fn remove(&mut self, name: &str) -> Result<bool> {
        if self.servers.remove(name).is_none() {
            return Ok(false);
        }
        self.write()?;
        log::info!("[settings] removed server: {name}");
        Ok(true)
    }

    pub fn clear_credentials(&mut self, name: &str) -> Result<()> {
        let Some(profile) = self.servers.get_mut(name) else {
            return Ok(());
        };
        profile.clear_credentials();
        self.write()
    }

    fn write(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = SettingsFile {
            servers: self.servers.clone(),
        };
        let content = toml::to_string_pretty(&file)?;
        std::fs::write(&self.path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            if let Err(error) = std::fs::set_permissions(&self.path, permissions) {
                log::warn!(
                    "[settings] failed to restrict permissions on {}: {error}",
                    self.path.display()
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(directory: &tempfile::TempDir) -> ProfileStore {
        ProfileStore::open(&directory.path().join(SETTINGS_FILE_NAME)).unwrap()
    }

    #[test]
    fn test_missing_file_is_empty() {
        let directory = tempfile::tempdir().unwrap();
        let store = store_in(&directory);
        assert!(store.server_names().is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let directory = tempfile::tempdir().unwrap();
        let mut store = store_in(&directory);

        let mut profile = ServerProfile::new("vpn.example.com:443");
        profile.username = "alice".into();
        profile.password = "secret".into();
        profile.protocol = Protocol::Gp;
        store.save(&profile).unwrap();

        let reopened = store_in(&directory);
        assert_eq!(reopened.server_names(), vec!["vpn.example.com:443"]);
        assert_eq!(reopened.load("vpn.example.com:443"), Some(profile));
    }

    #[test]
    fn test_names_sorted_case_insensitive() {
        let directory = tempfile::tempdir().unwrap();
        let mut store = store_in(&directory);
        for name in ["beta", "Alpha", "gamma"] {
            store.save(&ServerProfile::new(name)).unwrap();
        }
        assert_eq!(store.server_names(), vec!["Alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_remove() {
        let directory = tempfile::tempdir().unwrap();
        let mut store = store_in(&directory);
        store.save(&ServerProfile::new("one")).unwrap();

        assert!(store.remove("one").unwrap());
        assert!(!store.remove("one").unwrap());
        assert!(store_in(&directory).server_names().is_empty());
    }

    #[test]
    fn test_rename_drops_old_entry() {
        let directory = tempfile::tempdir().unwrap();
        let mut store = store_in(&directory);
        store.save(&ServerProfile::new("old")).unwrap();

        let mut renamed = store.load("old").unwrap();
        renamed.name = "new".into();
        store.save_renamed("old", &renamed).unwrap();

        assert_eq!(store.server_names(), vec!["new"]);
    }

    #[test]
    fn test_clear_credentials() {
        let directory = tempfile::tempdir().unwrap();
        let mut store = store_in(&directory);
        let mut profile = ServerProfile::new("gw");
        profile.password = "secret".into();
        profile.group = "staff".into();
        profile.username = "bob".into();
        store.save(&profile).unwrap();

        store.clear_credentials("gw").unwrap();

        let cleared = store_in(&directory).load("gw").unwrap();
        assert!(cleared.password.is_empty());
        assert!(cleared.group.is_empty());
        assert_eq!(cleared.username, "bob");
    }

    #[test]
    fn test_unknown_name_becomes_new_profile() {
        let directory = tempfile::tempdir().unwrap();
        let store = store_in(&directory);
        let profile = store.load_or_new("gw.example.org");
        assert_eq!(profile.server, "gw.example.org");
        assert!(profile.use_system_proxy);
    }

    #[test]
    fn test_defaults_for_sparse_entries() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, "[servers.gw]\nserver = \"gw:8443\"\n").unwrap();

        let profile = ProfileStore::open(&path).unwrap().load("gw").unwrap();
        assert_eq!(profile.name, "gw");
        assert_eq!(profile.protocol, Protocol::AnyConnect);
        assert!(profile.use_system_proxy);
        assert!(!profile.save_password);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, "[servers\n").unwrap();
        assert!(matches!(
            ProfileStore::open(&path),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_empty_name_rejected() {
        let directory = tempfile::tempdir().unwrap();
        let mut store = store_in(&directory);
        assert!(store.save(&ServerProfile::new("  ")).is_err());
    }
}
