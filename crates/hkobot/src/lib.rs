//! hkobot - Telegram front end for the HKO weather menu
//!
//! The navigation engine, weather feed and settings live in `hkocore`; this
//! crate turns Telegram updates into interactions and delivers the resulting
//! descriptors.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod cli;
pub mod telegram;
