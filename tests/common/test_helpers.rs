use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use stubborn::Failure;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TestError(pub &'static str);

/// Counts calls; fails with an expected `message` until call number `succeed_on`.
#[derive(Debug, Clone)]
pub struct Flaky {
    calls: Arc<AtomicUsize>,
    succeed_on: usize,
    message: &'static str,
}

impl Flaky {
    pub fn new(succeed_on: usize, message: &'static str) -> Self {
        Self { calls: Arc::new(AtomicUsize::new(0)), succeed_on, message }
    }

    pub fn never(message: &'static str) -> Self {
        Self::new(usize::MAX, message)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn call(self) -> Result<(), Failure> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n >= self.succeed_on {
            Ok(())
        } else {
            Err(Failure::expected(TestError(self.message)))
        }
    }
}

/// In-memory writer for asserting on `tracing` output.
#[derive(Clone, Default)]
pub struct SharedWriter(Arc<Mutex<Vec<u8>>>);

impl SharedWriter {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl<'a> MakeWriter<'a> for SharedWriter {
    type Writer = SharedGuard;
    fn make_writer(&'a self) -> Self::Writer {
        SharedGuard(self.0.clone())
    }
}

pub struct SharedGuard(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for SharedGuard {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
