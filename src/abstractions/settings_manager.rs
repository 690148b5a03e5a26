use std::{io::Write, path::PathBuf};
use anyhow::Result;
use log::{info, warn};

use crate::models::Settings;

#[cfg(test)]
use mockall::automock;

use super::FileSystem;

#[cfg_attr(test, automock)]
pub trait SettingsManager {
    fn get_or_create(&mut self) -> Result<Settings>;
    fn write(&mut self, settings: &Settings) -> Result<()>;
}

pub struct DefaultSettingsManager<FS: FileSystem> {
    file_system: FS,
    path: PathBuf
}

impl<FS: FileSystem> SettingsManager for DefaultSettingsManager<FS> {
    fn get_or_create(&mut self) -> Result<Settings> {

        if self.file_system.exists(&self.path) {
            let file = self.file_system.get_reader(&self.path)?;

            match serde_json::from_reader::<_, Settings>(file) {
                Ok(settings) => return Ok(settings),
                Err(err) => warn!("could not parse {}, using defaults: {}", self.path.display(), err),
            }
        }

        let settings = Settings::default();
        self.write(&settings)?;
        info!("created settings at {}", self.path.display());

        Ok(settings)
    }

    fn write(&mut self, settings: &Settings) -> Result<()> {
        let mut file = self.file_system.get_writer(&self.path)?;
        let json_str = serde_json::to_string_pretty(&settings)?;

        file.write_all(json_str.as_bytes())?;

        Ok(())
    }
}

impl<FS: FileSystem> DefaultSettingsManager<FS> {
    pub fn new(file_system: FS, path: PathBuf) -> Self {
        Self { file_system, path }
    }
}

#[cfg(test)]
mod tests {
    use std::{env, io::Write, path::PathBuf};

    use crate::abstractions::{FileSystem, MemoryFileSystem};
    use crate::constants::MIN_EVENT_UPDATE_RATE_MS;
    use crate::models::Settings;

    use super::{DefaultSettingsManager, SettingsManager};

    fn settings_path() -> PathBuf {
        env::temp_dir().join("settings.json")
    }

    #[test]
    fn should_create_settings() {
        let file_system = MemoryFileSystem::new();
        let mut settings_manager = DefaultSettingsManager::new(file_system, settings_path());
        let settings = settings_manager.get_or_create().unwrap();

        assert_eq!(settings, Settings::default());
        assert!(settings.wipe_detection);
        assert!(settings_manager.file_system.exists(&settings_path()));
    }

    #[test]
    fn should_save_settings() {
        let file_system = MemoryFileSystem::new();
        let mut settings_manager = DefaultSettingsManager::new(file_system, settings_path());
        let mut settings = Settings::default();
        settings.boss_only_dps = true;
        settings.dungeon_segments_enabled = false;

        settings_manager.write(&settings).unwrap();
        let actual = settings_manager.get_or_create().unwrap();

        assert_eq!(actual, settings);
    }

    #[test]
    fn should_fill_missing_keys_and_clamp_rate() {
        let mut file_system = MemoryFileSystem::new();
        let mut writer = file_system.get_writer(&settings_path()).unwrap();
        writer.write_all(br#"{"eventUpdateRateMs": 5}"#).unwrap();

        let mut settings_manager = DefaultSettingsManager::new(file_system, settings_path());
        let settings = settings_manager.get_or_create().unwrap();

        assert_eq!(settings.event_update_rate_ms, 5);
        assert_eq!(settings.event_update_rate().as_millis() as u64, MIN_EVENT_UPDATE_RATE_MS);
        assert!(settings.dungeon_segments_enabled);
    }

    #[test]
    fn should_fall_back_to_defaults_on_corrupt_file() {
        let mut file_system = MemoryFileSystem::new();
        let mut writer = file_system.get_writer(&settings_path()).unwrap();
        writer.write_all(b"{not json").unwrap();

        let mut settings_manager = DefaultSettingsManager::new(file_system, settings_path());
        let settings = settings_manager.get_or_create().unwrap();

        assert_eq!(settings, Settings::default());
    }
}
