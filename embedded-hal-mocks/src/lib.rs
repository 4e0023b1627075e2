//! Test doubles for the blocking `embedded-hal` 1.0 traits.

pub mod delay;
pub mod digital;
