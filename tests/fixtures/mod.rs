//! Test Fixtures Module
//!
//! Generated audio for the live tester integration tests.

// Not every test binary uses every fixture
#![allow(dead_code)]

pub mod audio_fixtures;

pub use audio_fixtures::*;
