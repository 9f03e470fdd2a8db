// Copyright 2023-2023 CrabNebula Ltd.
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use crate::DropEvent;

/// Receives drag notifications on the window's own thread, in the order they happened.
pub trait DropEventSink {
    fn entered(&self, x: f64, y: f64);

    fn updated(&self, x: f64, y: f64);

    fn exited(&self);

    fn perform_operation(&self, paths: Vec<String>);

    /// Routes one event to the matching notification.
    fn dispatch(&self, event: DropEvent) {
        match event {
            DropEvent::Entered { x, y } => self.entered(x, y),
            DropEvent::Updated { x, y } => self.updated(x, y),
            DropEvent::Exited => self.exited(),
            DropEvent::Performed { paths } => self.perform_operation(paths),
        }
    }
}

impl<F: Fn(DropEvent)> DropEventSink for F {
    fn entered(&self, x: f64, y: f64) {
        self(DropEvent::Entered { x, y })
    }

    fn updated(&self, x: f64, y: f64) {
        self(DropEvent::Updated { x, y })
    }

    fn exited(&self) {
        self(DropEvent::Exited)
    }

    fn perform_operation(&self, paths: Vec<String>) {
        self(DropEvent::Performed { paths })
    }
}
