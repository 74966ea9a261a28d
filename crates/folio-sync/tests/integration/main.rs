//! Integration tests for folio-sync
//!
//! Runs reconciliation passes against an in-memory fake drive, an in-memory
//! SQLite store and a temporary upload directory.

mod common;

mod test_service;
