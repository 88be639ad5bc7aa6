#![no_std]

#[cfg(any(test, feature = "std"))]
#[macro_use]
extern crate std;

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

pub mod components;
pub mod config;
pub mod datastore;
pub mod logger;
pub mod protocol;
pub mod sync;
pub mod sys;
