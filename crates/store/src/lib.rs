// SPDX-License-Identifier: MIT

//! aeon-store: the persistent state store (C2).
//!
//! One JSON document per store, written with a write-then-rename plus
//! `.bak`-rotation idiom for crash safety.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod error;
mod record;
mod store;

pub use error::StoreError;
pub use record::UnitRecord;
pub use store::FileStateStore;
