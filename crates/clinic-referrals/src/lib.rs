//! Referral matching and tiered commission engine for the clinic referral platform.
//!
//! Incoming clinic visit reports are matched against open referrals by
//! [`workflows::matching`], approved amounts flow through
//! [`workflows::commission`], and withdrawals are priced by
//! [`workflows::payout`].

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
