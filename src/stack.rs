//! Stack growth for the recursive parts of parsing and evaluation.
//!
//! Deeply nested input recurses once per nesting level in both the parser
//! and the evaluator. Wrapping those entry points lets the recursion run on
//! any thread, including the 2 MiB default, without aborting the process.

// Grow when less than this is left
const RED_ZONE: usize = 128 * 1024;

// Size of each new stack segment
const STACK_SEGMENT: usize = 1024 * 1024;

/// Runs `f`, first switching to a fresh stack segment if the current one is
/// nearly exhausted.
#[inline]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_SEGMENT, f)
}
