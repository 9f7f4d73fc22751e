//! Transport double that fails on demand.

use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use bytes::Bytes;
use sync_shared::{ClientTransport, Message, NetworkIdentity, TransportError, TransportResult, new_identity};

/// Always connected. `receive_next` replays a script, then reports nothing ready.
#[derive(Debug)]
pub(crate) struct ScriptedTransport {
    identity: NetworkIdentity,
    script: Mutex<VecDeque<TransportResult<Option<Bytes>>>>,
    refuse_outbound: AtomicBool,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self {
            identity: new_identity(),
            script: Mutex::new(VecDeque::new()),
            refuse_outbound: AtomicBool::new(false),
        }
    }

    pub(crate) fn push_message(&self, message: &Message) {
        self.script.lock().unwrap().push_back(Ok(Some(message.encode())));
    }

    pub(crate) fn push_error(&self, err: TransportError) {
        self.script.lock().unwrap().push_back(Err(err));
    }

    /// Makes `send` and `heartbeat` fail from now on.
    pub(crate) fn refuse_outbound(&self) {
        self.refuse_outbound.store(true, Ordering::SeqCst);
    }

    fn outbound(&self) -> TransportResult<()> {
        if self.refuse_outbound.load(Ordering::SeqCst) {
            Err(TransportError::Other("outbound refused".into()))
        } else {
            Ok(())
        }
    }
}

impl ClientTransport for ScriptedTransport {
    fn is_connected(&self) -> bool {
        true
    }

    fn receive_next(&self) -> TransportResult<Option<Bytes>> {
        self.script.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }

    fn send(&self, _frame: Bytes) -> TransportResult<()> {
        self.outbound()
    }

    fn heartbeat(&self) -> TransportResult<()> {
        self.outbound()
    }

    fn local_identity(&self) -> NetworkIdentity {
        self.identity
    }
}
