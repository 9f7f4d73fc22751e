//! Verwaltung des clientseitigen Tokio-Runtimes.

use std::{future::Future, sync::Arc};

use thiserror::Error;
use tokio::runtime::{Builder, Handle, Runtime};

/// Gemeinsamer Zugriffspunkt auf den Client-Netzwerkruntime.
#[derive(Debug, Clone)]
pub struct ClientNetworkRuntime {
    runtime: Arc<Runtime>,
}

impl ClientNetworkRuntime {
    /// Baut einen Multi-Thread-Runtime mit `worker_threads` Worker-Threads.
    pub fn multi_thread(worker_threads: usize) -> Result<Self, RuntimeError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("net_receive")
            .enable_all()
            .build()
            .map_err(RuntimeError::Build)?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }

    /// Blockiert den aufrufenden (Nicht-Async-)Thread bis `future` fertig ist.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Liefert einen Klon des Handles.
    pub fn handle(&self) -> Handle {
        self.runtime.handle().clone()
    }

    /// Beendet den Runtime ohne zu blockieren, sofern dies der letzte Klon ist.
    /// Darf auch aus einem Async-Kontext aufgerufen werden.
    pub fn shutdown_background(self) {
        if let Ok(runtime) = Arc::try_unwrap(self.runtime) {
            runtime.shutdown_background();
        }
    }
}

/// Fehler, die beim Aufbau des Runtimes auftreten können.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to build tokio runtime: {0}")]
    Build(std::io::Error),
}
