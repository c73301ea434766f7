//! Unit tests for the synchronisation client.

mod support;
