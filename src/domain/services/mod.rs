//! # Domain Services
//!
//! Domain services encapsulate business rules that don't naturally belong to
//! a single entity.
//!
//! ## Services
//!
//! - **MembershipPolicy**: Who may change a chat's membership and metadata

mod membership_policy;

pub use membership_policy::*;
