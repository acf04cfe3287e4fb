//! Maintenance of proxy auto-configuration files.
//!
//! `domain` holds the text rewriting, the PAC suffix-walk matcher and the
//! generator; `adapters` plugs in the file system, the system clock and the
//! hyper-based test page.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
