//! Scripted `TransferTransport` for tests.
//!
//! Records every start/cancel call and lets the test play the transport's
//! side of the contract (progress, location, terminal callbacks) by asset id.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use medialoft_download::{
    Asset, AssetEvent, AssetEventEmitterPort, AssetId, InFlightTransfer, TransferHandle,
    TransferOutcome, TransferSink, TransferTransport, TransportError,
};

#[derive(Default)]
struct Script {
    next_task: u32,
    started: Vec<AssetId>,
    cancelled: Vec<TransferHandle>,
    handles: HashMap<AssetId, TransferHandle>,
    sink: Option<TransferSink>,
    fail_start: HashSet<AssetId>,
    fail_cancel: bool,
    in_flight: Vec<InFlightTransfer>,
    in_flight_calls: u32,
}

#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A transport that reports these transfers as left over from a previous
    /// process.
    pub fn with_in_flight(transfers: &[(&str, &str)]) -> Arc<Self> {
        let transport = Self::default();
        {
            let mut script = transport.script.lock().unwrap();
            script.in_flight = transfers
                .iter()
                .map(|(handle, id)| InFlightTransfer {
                    handle: TransferHandle::new(*handle),
                    asset_id: AssetId::new(*id),
                    source_locator: format!("https://cdn.example.com/{id}/master.m3u8"),
                })
                .collect();
        }
        Arc::new(transport)
    }

    pub fn fail_start_for(&self, id: &str) {
        self.script.lock().unwrap().fail_start.insert(AssetId::new(id));
    }

    pub fn fail_cancels(&self) {
        self.script.lock().unwrap().fail_cancel = true;
    }

    /// Asset ids in the order `start_transfer` was called.
    pub fn started(&self) -> Vec<String> {
        self.script
            .lock()
            .unwrap()
            .started
            .iter()
            .map(|id| id.as_str().to_string())
            .collect()
    }

    pub fn cancelled(&self) -> Vec<TransferHandle> {
        self.script.lock().unwrap().cancelled.clone()
    }

    pub fn in_flight_calls(&self) -> u32 {
        self.script.lock().unwrap().in_flight_calls
    }

    /// The most recent handle issued for an asset.
    pub fn handle(&self, id: &str) -> TransferHandle {
        self.script.lock().unwrap().handles[&AssetId::new(id)].clone()
    }

    fn with_sink(&self, id: &str, f: impl FnOnce(&TransferSink, &TransferHandle)) {
        let script = self.script.lock().unwrap();
        let handle = &script.handles[&AssetId::new(id)];
        let sink = script.sink.as_ref().expect("no transfer was started");
        f(sink, handle);
    }

    pub fn progress(&self, id: &str, fraction: f64) {
        self.with_sink(id, |sink, handle| sink.progress(handle, fraction));
    }

    pub fn location(&self, id: &str, location: &Path) {
        self.with_sink(id, |sink, handle| sink.location_chosen(handle, location));
    }

    pub fn complete_at(&self, id: &str, location: &Path) {
        self.with_sink(id, |sink, handle| {
            sink.location_chosen(handle, location);
            sink.terminal(handle, TransferOutcome::Success);
        });
    }

    pub fn succeed(&self, id: &str) {
        self.with_sink(id, |sink, handle| sink.terminal(handle, TransferOutcome::Success));
    }

    pub fn fail(&self, id: &str, error: &str) {
        self.with_sink(id, |sink, handle| {
            sink.terminal(handle, TransferOutcome::Failed(error.to_string()));
        });
    }

    pub fn confirm_cancel(&self, id: &str) {
        self.with_sink(id, |sink, handle| sink.terminal(handle, TransferOutcome::Cancelled));
    }
}

#[async_trait]
impl TransferTransport for ScriptedTransport {
    async fn start_transfer(
        &self,
        asset: &Asset,
        sink: TransferSink,
    ) -> Result<TransferHandle, TransportError> {
        let mut script = self.script.lock().unwrap();
        if script.fail_start.contains(asset.id()) {
            return Err(TransportError::Rejected("no space left on device".into()));
        }
        script.next_task += 1;
        let handle = TransferHandle::new(format!("task-{}", script.next_task));
        script.started.push(asset.id().clone());
        script.handles.insert(asset.id().clone(), handle.clone());
        script.sink = Some(sink);
        Ok(handle)
    }

    async fn cancel_transfer(&self, handle: &TransferHandle) -> Result<(), TransportError> {
        let mut script = self.script.lock().unwrap();
        if script.fail_cancel {
            return Err(TransportError::UnknownHandle(handle.to_string()));
        }
        script.cancelled.push(handle.clone());
        Ok(())
    }

    async fn in_flight_transfers(
        &self,
        sink: TransferSink,
    ) -> Result<Vec<InFlightTransfer>, TransportError> {
        let mut script = self.script.lock().unwrap();
        script.in_flight_calls += 1;
        script.sink = Some(sink);
        let transfers = script.in_flight.clone();
        for transfer in &transfers {
            script
                .handles
                .insert(transfer.asset_id.clone(), transfer.handle.clone());
        }
        Ok(transfers)
    }
}

/// Emitter that keeps every event it is handed.
#[derive(Clone, Default)]
pub struct RecordingEmitter {
    events: Arc<Mutex<Vec<AssetEvent>>>,
}

impl RecordingEmitter {
    pub fn events(&self) -> Vec<AssetEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Wait until at least `count` events were delivered, then return them.
    pub async fn wait_for(&self, count: usize) -> Vec<AssetEvent> {
        let delivered = async {
            loop {
                let events = self.events();
                if events.len() >= count {
                    return events;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), delivered)
            .await
            .unwrap_or_else(|_| panic!("emitter saw {:?}, expected {count} events", self.events()))
    }
}

/// Emitter whose `emit` blocks until its `Gate` is opened.
#[derive(Clone)]
pub struct GatedEmitter {
    open: Arc<(Mutex<bool>, Condvar)>,
    pub recorder: RecordingEmitter,
}

/// Opens a `GatedEmitter`; also opens it when dropped so a failing test
/// cannot leave the forwarder stuck.
pub struct Gate {
    open: Arc<(Mutex<bool>, Condvar)>,
}

impl GatedEmitter {
    pub fn new() -> (Self, Gate) {
        let open = Arc::new((Mutex::new(false), Condvar::new()));
        let emitter = Self {
            open: Arc::clone(&open),
            recorder: RecordingEmitter::default(),
        };
        (emitter, Gate { open })
    }
}

impl Gate {
    pub fn open(&self) {
        let (flag, cvar) = &*self.open;
        *flag.lock().unwrap() = true;
        cvar.notify_all();
    }
}

impl Drop for Gate {
    fn drop(&mut self) {
        self.open();
    }
}

impl AssetEventEmitterPort for GatedEmitter {
    fn emit(&self, event: AssetEvent) {
        let (flag, cvar) = &*self.open;
        let _open = cvar
            .wait_while(flag.lock().unwrap(), |open| !*open)
            .unwrap();
        self.recorder.emit(event);
    }

    fn clone_box(&self) -> Box<dyn AssetEventEmitterPort> {
        Box::new(self.clone())
    }
}

impl AssetEventEmitterPort for RecordingEmitter {
    fn emit(&self, event: AssetEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn clone_box(&self) -> Box<dyn AssetEventEmitterPort> {
        Box::new(self.clone())
    }
}
