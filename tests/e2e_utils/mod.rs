#![cfg(test)]
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod tester_server;

pub use tester_server::TestPacServer;
