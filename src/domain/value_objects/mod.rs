//! # Domain Value Objects
//!
//! Immutable value types that represent domain concepts without identity.
//!
//! ## Value Objects
//!
//! - **VirtualNumber**: Routable phone-number-shaped user handle

mod virtual_number;

pub use virtual_number::*;
