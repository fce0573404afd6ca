//! Sparse index tests
