//! Component-level tests run as a single integration target.

mod unit;
