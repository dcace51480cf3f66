//! Property-based tests for index selection.
