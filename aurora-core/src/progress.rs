use std::time::Instant;

use tracing::{debug, info};

/// Reports the steps of a long initialization sequence.
///
/// Every step is logged as `[ n/N] label`.
#[derive(Debug)]
pub struct LoadProgress {
    total: usize,
    current: usize,
    started: Instant,
}

impl LoadProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            current: 0,
            started: Instant::now(),
        }
    }

    pub fn step(&mut self, label: &str) {
        self.current += 1;
        info!("{}", self.format_step(label));

        if self.current == self.total {
            debug!("Finished in {:.2?}", self.started.elapsed());
        }
    }

    fn format_step(&self, label: &str) -> String {
        let width = self.total.to_string().len();
        format!(
            "[{:>width$}/{}] {}",
            self.current,
            self.total,
            label,
            width = width + 1
        )
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_done(&self) -> bool {
        self.current >= self.total
    }
}
