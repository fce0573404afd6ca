//! Storage layer tests: blocks, the sequence set, and the block dump
