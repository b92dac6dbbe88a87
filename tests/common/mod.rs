//! Shared utilities for integration testing.

use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use db_bootstrap::{AttemptContext, ConnectError, ConnectionFactory};

#[allow(dead_code)]
pub const TARGET: &str = "postgresql://root@127.0.0.1:26257/defaultdb?sslmode=disable";

/// What a scripted factory call does.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Fail,
    Hang,
    Succeed,
}

/// Connection handed out by [`ScriptedFactory`].
#[allow(dead_code)]
#[derive(Debug, PartialEq, Eq)]
pub struct MockConnection {
    /// 1-based factory call that produced this connection.
    pub call: u32,
    pub target: String,
}

/// Factory that plays back a fixed sequence of outcomes.
#[allow(dead_code)]
pub struct ScriptedFactory {
    script: Vec<Outcome>,
    fallback: Outcome,
    calls: Arc<AtomicU32>,
}

#[allow(dead_code)]
impl ScriptedFactory {
    pub fn new(script: Vec<Outcome>, fallback: Outcome) -> Self {
        Self {
            script,
            fallback,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn failing_first(failures: usize) -> Self {
        Self::new(vec![Outcome::Fail; failures], Outcome::Succeed)
    }

    pub fn always(outcome: Outcome) -> Self {
        Self::new(Vec::new(), outcome)
    }

    /// Handle to the call counter that stays valid after the factory is
    /// moved into a gate.
    pub fn call_counter(&self) -> Arc<AtomicU32> {
        self.calls.clone()
    }
}

impl ConnectionFactory for ScriptedFactory {
    type Connection = MockConnection;

    async fn connect(&self, ctx: &AttemptContext, target: &str) -> Result<MockConnection, ConnectError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let outcome = self
            .script
            .get(call as usize - 1)
            .copied()
            .unwrap_or(self.fallback);
        let target = target.to_string();

        ctx.run(async move {
            match outcome {
                Outcome::Fail => Err(ConnectError::Failed(format!("refused on call {}", call))),
                Outcome::Hang => std::future::pending().await,
                Outcome::Succeed => Ok(MockConnection { call, target }),
            }
        })
        .await
    }
}

/// In-memory sink for formatted log output.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

#[allow(dead_code)]
impl LogCapture {
    /// Route this thread's tracing events into the capture until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
