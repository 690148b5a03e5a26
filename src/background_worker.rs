use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;

use anyhow::{Result, anyhow};
use flexi_logger::LoggerHandle;
use log::*;

use crate::abstractions::*;
use crate::commands::Commands;
use crate::constants::{INACTIVITY_CHECK_INTERVAL, SHUTDOWN_FLUSH_TIMEOUT};
use crate::encounter_state::EncounterState;
use crate::entity_registry::EntityRegistry;
use crate::event_handler::DefaultEventHandler;
use crate::flags::{AtomicBoolFlags, Flags};
use crate::logger::init_logger;
use crate::publisher::{SharedBuffs, SharedSubscriptions, SnapshotPublisher, SubscriptionTable};
use crate::skill_names::{SkillNames, skill_names_path};
use crate::store::connection_pool;
use crate::store::migration_runner::MigrationRunner;
use crate::store::{DefaultEncounterService, SqliteRepository};
use crate::{StartOptions, start};

pub type DefaultCommands = Commands<AtomicBoolFlags, DefaultEncounterService<SqliteRepository>>;

/// Hosts the engine loop on its own thread with a current-thread runtime.
pub struct BackgroundWorker {
    directory: Option<PathBuf>,
    flags: Arc<AtomicBoolFlags>,
    registry: Arc<RwLock<EntityRegistry>>,
    subscriptions: SharedSubscriptions,
    live_buffs: SharedBuffs,
    _logger: Option<LoggerHandle>,
    handle: Option<JoinHandle<Result<()>>>,
}

impl BackgroundWorker {
    /// Keeps settings, logs and the database next to the executable.
    pub fn new() -> Self {
        Self {
            directory: None,
            flags: Arc::new(AtomicBoolFlags::new(false)),
            registry: Arc::new(RwLock::new(EntityRegistry::new())),
            subscriptions: Arc::new(RwLock::new(SubscriptionTable::new())),
            live_buffs: Arc::new(RwLock::new(vec![])),
            _logger: None,
            handle: None,
        }
    }

    pub fn with_directory(directory: PathBuf) -> Self {
        Self {
            directory: Some(directory),
            ..Self::new()
        }
    }

    pub fn start<ES, EE>(&mut self, event_source: ES, event_emitter: Arc<EE>) -> Result<DefaultCommands>
    where
        ES: EventSource + Send + 'static,
        EE: EventEmitter,
    {
        let mut file_system = DefaultFileSystem::new();
        let directory = match &self.directory {
            Some(directory) => directory.clone(),
            None => file_system.get_executable_directory()?,
        };
        file_system.create_dir_all(&directory)?;

        match init_logger(&directory.join("logs")) {
            Ok(handle) => self._logger = Some(handle),
            Err(err) => eprintln!("file logging disabled: {err}"),
        }

        let skill_names = Arc::new(SkillNames::load_or_empty(&mut file_system, &skill_names_path(&directory)));
        let mut settings_manager = DefaultSettingsManager::new(file_system, directory.join("settings.json"));
        let settings = settings_manager.get_or_create()?;

        if settings.boss_only_dps {
            self.flags.set_boss_only_dps(true);
            info!("boss only damage enabled");
        }

        let options = StartOptions {
            version: env!("CARGO_PKG_VERSION").to_string(),
            event_update_rate: settings.event_update_rate(),
            inactivity_check_interval: INACTIVITY_CHECK_INTERVAL,
            flush_timeout: SHUTDOWN_FLUSH_TIMEOUT,
        };

        let connection_pool = connection_pool::get(&directory.join("encounters.db"))?;
        if let Err(err) = MigrationRunner::new(connection_pool.clone()).run() {
            error!("Fatal: {err}");
            return Err(err);
        }

        let repository = SqliteRepository::new(connection_pool);
        let encounter_service = Arc::new(DefaultEncounterService::new(repository).with_skill_names(skill_names.clone()));
        let persister = Arc::new(DefaultPersister::new(encounter_service.clone(), event_emitter.clone()));

        let flags = self.flags.clone();
        let registry = self.registry.clone();
        let subscriptions = self.subscriptions.clone();
        let live_buffs = self.live_buffs.clone();

        let handle = std::thread::Builder::new()
            .name("combat-meter".into())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()?;

                let mut state = EncounterState::new(&options.version, &settings, registry);
                let mut event_handler = DefaultEventHandler::new(event_emitter.clone(), persister.clone());
                let mut publisher =
                    SnapshotPublisher::new(event_emitter.clone(), subscriptions, live_buffs).with_skill_names(skill_names);

                runtime
                    .block_on(start(
                        flags,
                        event_source,
                        &mut event_handler,
                        &mut state,
                        &mut publisher,
                        event_emitter,
                        persister,
                        options,
                    ))
                    .inspect_err(|err| error!("unexpected error occurred in engine: {err}"))
            })?;

        self.handle = Some(handle);

        Ok(Commands::new(
            self.flags.clone(),
            encounter_service,
            self.registry.clone(),
            self.subscriptions.clone(),
            self.live_buffs.clone(),
        ))
    }

    pub fn join(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|err| anyhow!("Error while stopping processor: {:?}", err))??;
        }

        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.flags.set_stop();
        self.join()
    }
}
