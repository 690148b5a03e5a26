use mockall::predicate;

use crate::abstractions::*;
use crate::event_handler::DefaultEventHandler;

pub struct EventHandlerBuilder {
    event_emitter: MockEventEmitter,
    persister: MockPersister,
}

impl EventHandlerBuilder {
    pub fn new() -> Self {
        Self {
            event_emitter: MockEventEmitter::new(),
            persister: MockPersister::new(),
        }
    }

    pub fn ensure_event_called(&mut self) {
        self.event_emitter
            .expect_emit()
            .with(predicate::always())
            .returning(|_| Ok(()));
    }

    pub fn expect_event(&mut self, event: AppEvent) {
        self.event_emitter
            .expect_emit()
            .with(predicate::eq(event))
            .times(1)
            .returning(|_| Ok(()));
    }

    pub fn ensure_save_called(&mut self, times: usize) {
        self.persister
            .expect_save()
            .with(predicate::always())
            .times(times)
            .returning(|_| Ok(()));
    }

    pub fn build(self) -> DefaultEventHandler<MockEventEmitter, MockPersister> {
        DefaultEventHandler::new(self.event_emitter.into(), self.persister.into())
    }
}
