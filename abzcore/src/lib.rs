#![no_std]

#[cfg(feature = "std")]
pub mod std;

pub mod common;

mod traits;
pub use traits::*;

pub mod prelude;
