use std::sync::Arc;
use std::sync::mpsc::{self, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Result};
use log::*;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::abstractions::{AppEvent, EventEmitter};
use crate::constants::{PERSIST_BACKOFF, PERSIST_RETRIES};
use crate::models::CompleteEncounter;
use crate::store::EncounterService;

#[cfg(test)]
use mockall::automock;

/// Hands finalized encounters to the store without blocking the engine loop.
#[cfg_attr(test, automock)]
pub trait Persister: Send + Sync + 'static {
    fn save(&self, encounter: CompleteEncounter) -> Result<()>;
    /// Blocks until every queued write has been attempted or `timeout` elapses.
    fn flush(&self, timeout: Duration) -> Result<()>;
}

enum PersistTask {
    Save(Box<CompleteEncounter>),
    Flush(SyncSender<()>),
}

/// Writes on one dedicated thread so encounters land in the order they closed.
pub struct DefaultPersister {
    sender: Option<UnboundedSender<PersistTask>>,
    handle: Option<JoinHandle<()>>,
}

impl DefaultPersister {
    pub fn new<ES, EE>(encounter_service: Arc<ES>, event_emitter: Arc<EE>) -> Self
    where
        ES: EncounterService,
        EE: EventEmitter,
    {
        Self::with_backoff(encounter_service, event_emitter, PERSIST_BACKOFF)
    }

    pub fn with_backoff<ES, EE>(encounter_service: Arc<ES>, event_emitter: Arc<EE>, backoff: Duration) -> Self
    where
        ES: EncounterService,
        EE: EventEmitter,
    {
        let (sender, receiver) = unbounded_channel();

        let handle = thread::Builder::new()
            .name("persister".into())
            .spawn(move || writer_loop(receiver, encounter_service, event_emitter, backoff))
            .inspect_err(|err| error!("could not spawn persister thread: {err}"))
            .ok();

        Self {
            sender: Some(sender),
            handle,
        }
    }

    fn send(&self, task: PersistTask) -> Result<()> {
        self.sender
            .as_ref()
            .ok_or_else(|| anyhow!("persister is shutting down"))?
            .send(task)
            .map_err(|_| anyhow!("persister thread is gone"))
    }
}

impl Drop for DefaultPersister {
    fn drop(&mut self) {
        self.sender.take();

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Persister for DefaultPersister {
    fn save(&self, encounter: CompleteEncounter) -> Result<()> {
        info!("queueing encounter started at {} for persistence", encounter.started_at_ms);
        self.send(PersistTask::Save(Box::new(encounter)))
    }

    fn flush(&self, timeout: Duration) -> Result<()> {
        let (done_tx, done_rx) = mpsc::sync_channel(1);
        self.send(PersistTask::Flush(done_tx))?;

        done_rx
            .recv_timeout(timeout)
            .map_err(|_| anyhow!("persistence queue did not drain within {timeout:?}"))
    }
}

fn writer_loop<ES, EE>(mut receiver: UnboundedReceiver<PersistTask>, encounter_service: Arc<ES>, event_emitter: Arc<EE>, backoff: Duration)
where
    ES: EncounterService,
    EE: EventEmitter,
{
    while let Some(task) = receiver.blocking_recv() {
        match task {
            PersistTask::Save(encounter) => {
                let event = match write_with_retries(encounter_service.as_ref(), &encounter, backoff) {
                    Ok(encounter_id) => {
                        info!("saved encounter {encounter_id}");
                        AppEvent::EncounterSaved { encounter_id }
                    }
                    Err(err) => {
                        error!("giving up on encounter started at {}: {err:?}", encounter.started_at_ms);
                        AppEvent::PersistenceError { message: err.to_string() }
                    }
                };

                if let Err(err) = event_emitter.emit(event) {
                    warn!("could not report persistence result: {err}");
                }
            }
            PersistTask::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    debug!("persister queue closed");
}

fn write_with_retries<ES: EncounterService>(encounter_service: &ES, encounter: &CompleteEncounter, backoff: Duration) -> Result<i64> {
    let mut attempt = 1;

    loop {
        match encounter_service.create(encounter) {
            Ok(id) => return Ok(id),
            Err(err) if attempt < PERSIST_RETRIES => {
                warn!("write attempt {attempt}/{PERSIST_RETRIES} failed: {err}");
                thread::sleep(backoff * attempt);
                attempt += 1;
            }
            Err(err) => return Err(err.context(format!("failed after {PERSIST_RETRIES} attempts"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::abstractions::MockEventEmitter;
    use crate::store::MockEncounterService;
    use crate::test_utils::*;

    fn recording_emitter() -> (MockEventEmitter, Arc<Mutex<Vec<AppEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let mut emitter = MockEventEmitter::new();
        emitter.expect_emit().returning(move |event| {
            sink.lock().unwrap().push(event);
            Ok(())
        });

        (emitter, events)
    }

    #[test]
    fn should_save_and_report_encounter_id() {
        let (emitter, events) = recording_emitter();
        let mut service = MockEncounterService::new();
        service.expect_create().times(1).returning(|_| Ok(42));

        let persister = DefaultPersister::with_backoff(Arc::new(service), Arc::new(emitter), Duration::ZERO);
        persister.save(create_complete_encounter()).unwrap();
        persister.flush(Duration::from_secs(1)).unwrap();

        assert_eq!(*events.lock().unwrap(), vec![AppEvent::EncounterSaved { encounter_id: 42 }]);
    }

    #[test]
    fn should_retry_then_succeed() {
        let (emitter, events) = recording_emitter();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let mut service = MockEncounterService::new();
        service.expect_create().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(anyhow!("database is locked"))
            } else {
                Ok(7)
            }
        });

        let persister = DefaultPersister::with_backoff(Arc::new(service), Arc::new(emitter), Duration::ZERO);
        persister.save(create_complete_encounter()).unwrap();
        persister.flush(Duration::from_secs(1)).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*events.lock().unwrap(), vec![AppEvent::EncounterSaved { encounter_id: 7 }]);
    }

    #[test]
    fn should_report_error_after_bounded_retries() {
        let (emitter, events) = recording_emitter();
        let mut service = MockEncounterService::new();
        service
            .expect_create()
            .times(PERSIST_RETRIES as usize)
            .returning(|_| Err(anyhow!("disk full")));

        let persister = DefaultPersister::with_backoff(Arc::new(service), Arc::new(emitter), Duration::ZERO);
        persister.save(create_complete_encounter()).unwrap();
        persister.flush(Duration::from_secs(1)).unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], AppEvent::PersistenceError { message } if message.contains("3 attempts")));
    }

    #[test]
    fn should_write_in_close_order() {
        let (emitter, events) = recording_emitter();
        let mut service = MockEncounterService::new();
        service
            .expect_create()
            .returning(|encounter| Ok(encounter.started_at_ms));

        let persister = DefaultPersister::with_backoff(Arc::new(service), Arc::new(emitter), Duration::ZERO);
        let first = create_complete_encounter();
        let mut second = create_complete_encounter();
        second.started_at_ms += 60_000;
        let (first_start, second_start) = (first.started_at_ms, second.started_at_ms);

        persister.save(first).unwrap();
        persister.save(second).unwrap();
        persister.flush(Duration::from_secs(1)).unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                AppEvent::EncounterSaved { encounter_id: first_start },
                AppEvent::EncounterSaved { encounter_id: second_start },
            ]
        );
    }

    #[test]
    fn should_drain_queue_before_drop_returns() {
        let (emitter, events) = recording_emitter();
        let mut service = MockEncounterService::new();
        service.expect_create().times(2).returning(|_| Ok(1));

        let persister = DefaultPersister::with_backoff(Arc::new(service), Arc::new(emitter), Duration::ZERO);
        persister.save(create_complete_encounter()).unwrap();
        persister.save(create_complete_encounter()).unwrap();
        drop(persister);

        assert_eq!(events.lock().unwrap().len(), 2);
    }
}
