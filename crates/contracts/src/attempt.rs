//! Cursor state of an in-flight dispatch call and the views derived from it.

use serde::Serialize;

/// Cursor of one dispatch call
///
/// Created fresh by every public dispatch call and returned to the caller in
/// the [`RoundReport`](crate::RoundReport). `index` never exceeds the source
/// count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Cursor {
    /// Index of the current source
    pub index: usize,
    /// Consecutive failures on the current source within this pass
    pub fail_retries: u32,
    /// Completed passes
    pub passes: u64,
    /// Operation invocations
    pub attempts: u64,
    /// Failed invocations (equals error observer calls)
    pub failures: u64,
    /// Times the cursor moved to the next source
    pub failovers: u64,
}

impl Cursor {
    /// True once every source of a rotation has been given up on
    pub fn rotation_exhausted(&self, count: usize) -> bool {
        self.index + self.fail_retries as usize == count
    }
}

/// What the dispatched operation and the error observer see
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt<S> {
    /// Index of `source` in the dispatcher's source list
    pub index: usize,
    /// Source this invocation targets
    pub source: S,
    /// Retries already spent on this source in the current pass
    pub retry: u32,
    /// 1-based pass number within the round
    pub pass: u64,
}

impl<S> Attempt<S> {
    /// True when this is a retry rather than the first try of the pass
    pub fn is_retry(&self) -> bool {
        self.retry > 0
    }
}

/// What a stop predicate sees between passes
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a, S> {
    sources: &'a [S],
    cursor: Cursor,
    results: usize,
    last_succeeded: bool,
}

impl<'a, S> Progress<'a, S> {
    pub fn new(sources: &'a [S], cursor: Cursor, results: usize, last_succeeded: bool) -> Self {
        Self {
            sources,
            cursor,
            results,
            last_succeeded,
        }
    }

    pub fn sources(&self) -> &'a [S] {
        self.sources
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn current_index(&self) -> usize {
        self.cursor.index
    }

    /// Source the next pass will start on
    pub fn current_source(&self) -> Option<&'a S> {
        self.sources.get(self.cursor.index)
    }

    pub fn passes(&self) -> u64 {
        self.cursor.passes
    }

    pub fn failures(&self) -> u64 {
        self.cursor.failures
    }

    /// Results collected so far (always 0 for action dispatch)
    pub fn results(&self) -> usize {
        self.results
    }

    /// Whether the pass that just finished produced a success
    pub fn last_succeeded(&self) -> bool {
        self.last_succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_exhausted() {
        let cursor = Cursor {
            index: 1,
            ..Default::default()
        };
        assert!(cursor.rotation_exhausted(1));
        assert!(!cursor.rotation_exhausted(2));
    }

    #[test]
    fn test_progress_current_source() {
        let sources = ["a", "b"];
        let cursor = Cursor {
            index: 1,
            passes: 3,
            ..Default::default()
        };
        let progress = Progress::new(&sources, cursor, 2, true);
        assert_eq!(progress.current_source(), Some(&"b"));
        assert_eq!(progress.passes(), 3);
        assert_eq!(progress.results(), 2);

        let done = Progress::new(
            &sources,
            Cursor {
                index: 2,
                ..Default::default()
            },
            0,
            false,
        );
        assert_eq!(done.current_source(), None);
    }
}
