use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use once_cell::sync::OnceCell;

use super::StreamEvent;
use crate::errors::{IoError, Result};

const GLOBAL_PUMP_NAME: &str = "ark-io-event-pump";

static GLOBAL: OnceCell<EventPump> = OnceCell::new();

pub type StreamId = u64;

type Delegates = Arc<Mutex<HashMap<StreamId, Arc<Readiness>>>>;

enum Envelope {
    Event { stream: StreamId, event: StreamEvent },
    Shutdown,
}

/// A background thread delivering native stream events to their adapters.
///
/// [`EventPump::global`] is the process-wide pump: started lazily on first
/// use and never stopped. [`EventPump::start`] creates a pump owned by the
/// caller, which stops its thread when dropped.
pub struct EventPump {
    handle: PumpHandle,
    worker: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub(crate) struct PumpHandle {
    events: Sender<Envelope>,
    delegates: Delegates,
    next_id: Arc<AtomicU64>,
}

impl EventPump {
    pub fn global() -> Result<&'static EventPump> {
        GLOBAL.get_or_try_init(|| EventPump::start(GLOBAL_PUMP_NAME))
    }

    pub fn start(name: &str) -> Result<EventPump> {
        let (events, queue) = mpsc::channel();
        let delegates = Delegates::default();

        let worker = {
            let delegates = delegates.clone();
            thread::Builder::new()
                .name(name.to_owned())
                .spawn(move || pump(queue, delegates))
                .map_err(IoError::os)?
        };
        log::info!("Started event pump {}", name);

        Ok(EventPump {
            handle: PumpHandle {
                events,
                delegates,
                next_id: Arc::new(AtomicU64::new(1)),
            },
            worker: Some(worker),
        })
    }

    pub(crate) fn handle(&self) -> PumpHandle {
        self.handle.clone()
    }

    /// Number of streams currently registered.
    pub fn registered(&self) -> usize {
        lock(&self.handle.delegates).len()
    }
}

impl Drop for EventPump {
    fn drop(&mut self) {
        let _ = self.handle.events.send(Envelope::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("Event pump thread panicked");
            }
        }
    }
}

impl PumpHandle {
    pub(crate) fn register(&self, readiness: Arc<Readiness>) -> EventSink {
        let stream = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.delegates).insert(stream, readiness);
        log::debug!("Registered stream {} with event pump", stream);
        EventSink {
            stream,
            events: self.events.clone(),
        }
    }

    pub(crate) fn deregister(&self, stream: StreamId) {
        if lock(&self.delegates).remove(&stream).is_some() {
            log::debug!("Deregistered stream {} from event pump", stream);
        }
    }
}

/// Where a native stream posts its events.
#[derive(Clone)]
pub struct EventSink {
    stream: StreamId,
    events: Sender<Envelope>,
}

impl EventSink {
    pub fn stream_id(&self) -> StreamId {
        self.stream
    }

    /// Post `event`. Never blocks; events posted after the pump stopped are
    /// dropped.
    pub fn notify(&self, event: StreamEvent) {
        let envelope = Envelope::Event {
            stream: self.stream,
            event,
        };
        if self.events.send(envelope).is_err() {
            log::trace!(
                "Event pump stopped, dropping {:?} for stream {}",
                event,
                self.stream
            );
        }
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("stream", &self.stream)
            .finish()
    }
}

fn pump(queue: Receiver<Envelope>, delegates: Delegates) {
    while let Ok(envelope) = queue.recv() {
        match envelope {
            Envelope::Event { stream, event } => {
                let delegate = lock(&delegates).get(&stream).cloned();
                match delegate {
                    Some(readiness) => readiness.notify(event),
                    None => log::trace!(
                        "Dropping {:?} for unregistered stream {}",
                        event,
                        stream
                    ),
                }
            }
            Envelope::Shutdown => break,
        }
    }
}

/// Latched wake-up signal between the pump and one blocked caller.
///
/// An event that arrives before anyone waits stays latched, so the next
/// `wait` returns at once instead of missing it.
#[derive(Default)]
pub(crate) struct Readiness {
    latched: Mutex<Option<StreamEvent>>,
    signal: Condvar,
}

impl Readiness {
    pub(crate) fn notify(&self, event: StreamEvent) {
        *lock(&self.latched) = Some(event);
        self.signal.notify_all();
    }

    /// Block until an event is delivered and consume it.
    pub(crate) fn wait(&self) -> StreamEvent {
        let mut latched = lock(&self.latched);
        loop {
            if let Some(event) = latched.take() {
                return event;
            }
            latched = self
                .signal
                .wait(latched)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
