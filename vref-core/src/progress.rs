use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::thread;
use std::time::{Duration, Instant};

/// Periodic progress line on stderr while references are being written.
#[derive(Clone)]
pub struct Progress {
    enabled: bool,
    interval: Duration,
    pub stage: Arc<Mutex<String>>,
    pub refs_done: Arc<AtomicUsize>,
    pub refs_skipped: Arc<AtomicUsize>,
    pub chunks_total: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Self::with_interval(enabled, Duration::from_secs(5))
    }

    pub fn with_interval(enabled: bool, interval: Duration) -> Self {
        Self {
            enabled,
            interval,
            stage: Arc::new(Mutex::new(String::new())),
            refs_done: Arc::new(AtomicUsize::new(0)),
            refs_skipped: Arc::new(AtomicUsize::new(0)),
            chunks_total: Arc::new(AtomicUsize::new(0)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A disabled tracker; counters still work, nothing is printed.
    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn set_stage(&self, s: &str) {
        if let Ok(mut stage) = self.stage.lock() {
            *stage = s.to_string();
        }
    }
    pub fn add_chunks_total(&self, n: usize) {
        self.chunks_total.fetch_add(n, Ordering::Relaxed);
    }
    pub fn inc_written(&self) {
        self.refs_done.fetch_add(1, Ordering::Relaxed);
    }
    pub fn inc_skipped(&self) {
        self.refs_skipped.fetch_add(1, Ordering::Relaxed);
    }
    pub fn written(&self) -> usize {
        self.refs_done.load(Ordering::Relaxed)
    }
    pub fn skipped(&self) -> usize {
        self.refs_skipped.load(Ordering::Relaxed)
    }

    pub fn start(&self) {
        if !self.enabled {
            return;
        }
        self.running.store(true, Ordering::Relaxed);
        let this = self.clone();
        thread::spawn(move || {
            let t0 = Instant::now();
            while this.running.load(Ordering::Relaxed) {
                thread::sleep(this.interval);
                if !this.running.load(Ordering::Relaxed) {
                    break;
                }
                let s = this.stage.lock().map(|s| s.clone()).unwrap_or_default();
                let done = this.written();
                let skipped = this.skipped();
                let total = this.chunks_total.load(Ordering::Relaxed);
                let pct = if total > 0 {
                    ((done + skipped) as f64 / total as f64) * 100.0
                } else {
                    0.0
                };
                eprintln!(
                    "[{:>4}s] {} | refs {} | absent {} | chunks {}/{} ({}%)",
                    t0.elapsed().as_secs(),
                    s,
                    done,
                    skipped,
                    done + skipped,
                    total,
                    pct as i32
                );
            }
        });
    }
    pub fn stop(&self) {
        if self.enabled {
            self.running.store(false, Ordering::Relaxed);
        }
    }
}
