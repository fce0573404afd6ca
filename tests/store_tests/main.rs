//! Store tests

mod store_tests;
