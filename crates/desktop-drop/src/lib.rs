// Copyright 2023-2023 CrabNebula Ltd.
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Receive files dropped onto a Windows window, and onto every child window it owns,
//! without taking over the application's event loop.
//!
//! The crate registers an OLE drop target on the window and its descendants, keeps those
//! registrations in sync as child windows come and go, listens to the legacy `WM_DROPFILES`
//! message as a fallback, and delivers one de-duplicated stream of notifications
//! (`entered`, `updated`, `exited`, `perform_operation`) on the window's own thread.
//!
//! - Add the `desktop-drop` dependency:
//!
//! `$ cargo add desktop-drop`
//!
//! - Use the `desktop_drop::attach` function. It takes a `&T: raw_window_handle::HasWindowHandle`
//!   type and anything implementing [`DropEventSink`], including a plain closure:
//!
//!   - winit:
//!   ```rust,no_run
//!   # #[cfg(target_os = "windows")]
//!   # fn run(window: &winit::window::Window) -> desktop_drop::Result<()> {
//!   let drop_support = desktop_drop::attach(
//!     window,
//!     |event: desktop_drop::DropEvent| println!("drop event: {event:?}"),
//!     desktop_drop::Options::default(),
//!   )?;
//!   // keep `drop_support` alive for as long as the window should accept files
//!   # Ok(())
//!   # }
//!   ```
//!
//! On other platforms only the platform-independent engine ([`DropTarget`] over a custom
//! [`Platform`]) is available.

use std::time::Duration;

#[macro_use]
mod logging;

pub mod control;
mod effect;
mod event;
mod platform;
mod platform_impl;
mod registrar;
mod session;
mod target;

pub use effect::{choose_allowed_effect, effect_from_key_state, DropEffect, KeyState};
pub use event::DropEventSink;
pub use logging::{logging_enabled, set_logging_enabled};
pub use platform::{MessageHandler, Platform, Registration, RootMessage, WorkItem};
pub use registrar::{Intercepted, Registrar};
pub use session::DragSession;
pub use target::DropTarget;

#[cfg(target_os = "windows")]
pub use platform_impl::{attach, Hdrop, Hwnd, Win32Platform};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[cfg(windows)]
    #[error("{0}")]
    WindowsError(#[from] windows::core::Error),
    #[error("unsupported window handle")]
    UnsupportedWindowHandle,
    #[error("object model is not initialized")]
    NotInitialized,
    #[error("failed to register drop target")]
    RegistrationFailed,
    #[error("data object carries no file list")]
    NoFileList,
    #[error("failed to lock drop data")]
    LockFailed,
    #[error("failed to intercept window messages")]
    InterceptionFailed,
    #[error("method `{0}` is not implemented")]
    NotImplemented(String),
}

/// A discrete drag notification on its way to the [`DropEventSink`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "camelCase"))]
pub enum DropEvent {
    /// A drag entered the window, in client coordinates.
    Entered { x: f64, y: f64 },
    /// The pointer moved while dragging over the window, in client coordinates.
    Updated { x: f64, y: f64 },
    /// The drag left the window, or the drop finished.
    Exited,
    /// Files were dropped. The list is empty when nothing could be extracted.
    Performed { paths: Vec<String> },
}

/// Physical pixel position, either on screen or relative to a window's client area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Where a legacy drop landed, as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPoint {
    /// Already relative to the window's client area.
    Client(Point),
    /// Screen coordinates; needs converting.
    Screen(Point),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct Options {
    /// Legacy drop notifications arriving this soon after a completed drop are ignored.
    pub legacy_debounce: Duration,
    /// Overrides the process-wide logging toggle when set.
    pub enable_logging: Option<bool>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            legacy_debounce: Duration::from_millis(200),
            enable_logging: None,
        }
    }
}
