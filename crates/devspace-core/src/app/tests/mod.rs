//! Randomized tests for transcript and send invariants.

mod property;
