//! Progress reporting for batch operations.
//!
//! Engines call the sink synchronously after each unit of work (one line
//! loaded, one part rendered). Reports carry no correctness guarantees.

pub trait ProgressSink {
    /// `done` of `total` units finished for `stage`.
    fn report(&mut self, stage: &str, done: usize, total: usize);
}

/// Sink that discards every report.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _stage: &str, _done: usize, _total: usize) {}
}

impl<F> ProgressSink for F
where
    F: FnMut(&str, usize, usize),
{
    fn report(&mut self, stage: &str, done: usize, total: usize) {
        self(stage, done, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_sink_receives_reports() {
        let mut seen = Vec::new();
        {
            let mut sink = |stage: &str, done: usize, total: usize| {
                seen.push(format!("{stage}:{done}/{total}"));
            };
            sink.report("join", 1, 3);
            sink.report("join", 3, 3);
        }
        assert_eq!(seen, vec!["join:1/3", "join:3/3"]);
    }
}
