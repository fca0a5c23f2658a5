//! `roster` - A small student records service
//!
//! This library provides the record store, the HTTP resource API over it,
//! and a client data layer with a terminal list view.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod storage;
pub mod student;
pub mod view;

pub use client::{StudentClient, StudentList};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use storage::Storage;
pub use student::{NewStudent, Student, StudentId, StudentPatch};
