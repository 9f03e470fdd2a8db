// Copyright 2023-2023 CrabNebula Ltd.
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Runtime switch for the crate's diagnostics.
//!
//! Lines go to the [`log`] facade under the `desktop_drop` target, so whatever logger the
//! application installed decides where they end up. The switch sits in front of it: debug
//! builds start with diagnostics on, release builds with them off.

use std::sync::atomic::{AtomicBool, Ordering};

static ENABLED: AtomicBool = AtomicBool::new(cfg!(debug_assertions));

pub fn set_logging_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn logging_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Toggle diagnostics from native code that cannot call into Rust directly.
#[no_mangle]
pub extern "C" fn desktop_drop_set_logging_enabled(on: i32) {
    set_logging_enabled(on != 0);
}

macro_rules! diag {
    ($($arg:tt)+) => {{
        if $crate::logging::logging_enabled() {
            ::log::debug!(target: "desktop_drop", $($arg)+);
        }
    }};
}
