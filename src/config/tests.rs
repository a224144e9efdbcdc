use super::load::{default_config_path, default_data_path, resolve_config_path};
use super::schema::*;
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn resolve_config_path_prefers_musica_config_path() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("MUSICA_CONFIG_PATH", "/tmp/musica-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        std::path::PathBuf::from("/tmp/musica-test-config.toml")
    );
}

#[test]
fn default_config_path_prefers_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/xdg-config-home")
            .join("musica")
            .join("config.toml")
    );
}

#[test]
fn default_config_path_falls_back_to_home_dot_config() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_CONFIG_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/home-dir")
            .join(".config")
            .join("musica")
            .join("config.toml")
    );
}

#[test]
fn default_data_path_falls_back_to_local_share() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_DATA_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    assert_eq!(
        default_data_path().unwrap(),
        std::path::PathBuf::from("/tmp/home-dir/.local/share/musica/catalog.sqlite3")
    );
}

#[test]
fn defaults_match_hourly_backup_policy() {
    let s = Settings::default();
    assert_eq!(s.backup.threshold_secs, 3600);
    assert_eq!(s.backup.poll_interval_secs, 3600);
    assert_eq!(s.library.extensions, vec!["mp3", "wav", "ogg", "flac", "m4a", "opus"]);
    assert!(s.library.restricted_paths.contains(&"node_modules".to_string()));
    assert!(s.validate().is_ok());
}

#[test]
fn settings_load_from_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[library]
root = "/srv/music"
extensions = ["mp3", ".FLAC"]
recursive = false
include_hidden = false
follow_links = false
max_depth = 3
restricted_paths = ["podcasts"]
display_fields = ["id", "last-backup"]
display_separator = "::"

[catalog]
db_path = "/tmp/musica.sqlite3"

[backup]
threshold_secs = 86400
poll_interval_secs = 60
rescan_on_poll = false
command = ["cp", "{path}", "/mnt/backup/"]

[playback]
volume = 0.25
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::remove("MUSICA__BACKUP__THRESHOLD_SECS");

    let s = Settings::load(Some(cfg_path)).unwrap();
    assert_eq!(s.library.root, Some(std::path::PathBuf::from("/srv/music")));
    assert_eq!(s.library.extensions, vec!["mp3".to_string(), ".FLAC".to_string()]);
    assert!(!s.library.recursive);
    assert!(!s.library.include_hidden);
    assert!(!s.library.follow_links);
    assert_eq!(s.library.max_depth, Some(3));
    assert_eq!(s.library.restricted_paths, vec!["podcasts".to_string()]);
    assert_eq!(
        s.library.display_fields,
        vec![TrackDisplayField::Id, TrackDisplayField::LastBackup]
    );
    assert_eq!(s.library.display_separator, "::");
    assert_eq!(s.catalog.db_path, std::path::PathBuf::from("/tmp/musica.sqlite3"));
    assert_eq!(s.backup.threshold_secs, 86400);
    assert_eq!(s.backup.poll_interval_secs, 60);
    assert!(!s.backup.rescan_on_poll);
    assert_eq!(s.backup.command, vec!["cp", "{path}", "/mnt/backup/"]);
    assert_eq!(s.playback.volume, 0.25);
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[backup]
threshold_secs = 3600
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("MUSICA_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("MUSICA__BACKUP__THRESHOLD_SECS", "60");

    let s = Settings::load(None).unwrap();
    assert_eq!(s.backup.threshold_secs, 60);
}

#[test]
fn validate_rejects_unusable_settings() {
    let mut s = Settings::default();
    s.library.extensions = vec![" . ".to_string(), String::new()];
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.backup.poll_interval_secs = 0;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.playback.volume = 1.5;
    assert!(s.validate().is_err());
}
