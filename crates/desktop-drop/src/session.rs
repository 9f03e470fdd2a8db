// Copyright 2023-2023 CrabNebula Ltd.
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Whether an OLE drag session is in progress, and when the last drop completed.
///
/// Both values are advisory and read from callback contexts that interleave with message
/// dispatch, so they are plain relaxed atomics with no ordering between them.
#[derive(Debug, Default)]
pub struct DragSession {
    active: AtomicBool,
    last_drop_ms: AtomicU64,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub(crate) fn begin(&self) {
        self.active.store(true, Ordering::Relaxed);
    }

    pub(crate) fn end(&self) {
        self.active.store(false, Ordering::Relaxed);
    }

    pub(crate) fn record_drop(&self, now_ms: u64) {
        self.last_drop_ms.store(now_ms, Ordering::Relaxed);
    }

    pub fn last_drop_ms(&self) -> u64 {
        self.last_drop_ms.load(Ordering::Relaxed)
    }

    /// True when a drop completed less than `window_ms` before `now_ms`.
    pub fn within_debounce(&self, now_ms: u64, window_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_drop_ms()) < window_ms
    }
}
