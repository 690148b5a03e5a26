use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::models::CombatEvent;

/// Trust boundary with the decoding subsystem. Events are yielded in arrival order;
/// `None` means the producer is gone and the engine should shut down.
#[allow(async_fn_in_trait)]
pub trait EventSource {
    async fn recv(&mut self) -> Option<CombatEvent>;
}

pub struct ChannelEventSource {
    rx: UnboundedReceiver<CombatEvent>,
}

impl EventSource for ChannelEventSource {
    async fn recv(&mut self) -> Option<CombatEvent> {
        self.rx.recv().await
    }
}

impl ChannelEventSource {
    pub fn new() -> (Self, UnboundedSender<CombatEvent>) {
        let (tx, rx) = unbounded_channel::<CombatEvent>();
        (Self { rx }, tx)
    }
}
