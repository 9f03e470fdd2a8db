// Copyright 2023-2023 CrabNebula Ltd.
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use std::{fmt, hash::Hash, rc::Weak};

use crate::{DropEvent, DropPoint, DropTarget, Point, Result};

/// Outcome of a successful drop target registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Registered,
    /// The window already had a drop target; counts as success.
    AlreadyRegistered,
}

/// Asynchronous work posted to the root window's own message queue.
#[derive(Debug)]
pub enum WorkItem {
    /// Run a forced full re-registration once no drag session is active.
    ReRegister,
    /// Deliver one event to the sink. Ownership of the payload travels with the message.
    Event(Box<DropEvent>),
}

/// The root window messages the interception owns. Everything else is forwarded untouched
/// to the procedure that was installed before it.
pub enum RootMessage<P: Platform> {
    ReRegister,
    Event(Box<DropEvent>),
    DropFiles(P::DropHandle),
    ChildCreated(P::Window),
    ChildDestroyed(P::Window),
}

impl<P: Platform> From<WorkItem> for RootMessage<P> {
    fn from(item: WorkItem) -> Self {
        match item {
            WorkItem::ReRegister => Self::ReRegister,
            WorkItem::Event(event) => Self::Event(event),
        }
    }
}

impl<P: Platform> fmt::Debug for RootMessage<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReRegister => f.write_str("ReRegister"),
            Self::Event(event) => f.debug_tuple("Event").field(event).finish(),
            Self::DropFiles(drop) => f.debug_tuple("DropFiles").field(drop).finish(),
            Self::ChildCreated(window) => f.debug_tuple("ChildCreated").field(window).finish(),
            Self::ChildDestroyed(window) => f.debug_tuple("ChildDestroyed").field(window).finish(),
        }
    }
}

/// Called by the platform's message interception for every [`RootMessage`].
pub trait MessageHandler<P: Platform> {
    fn handle_message(&self, message: RootMessage<P>);
}

/// The window system calls the drop engine relies on.
///
/// Every method is called on the thread that owns the root window.
pub trait Platform: Sized + 'static {
    type Window: Copy + Eq + Hash + fmt::Debug;
    /// Handle carried by a legacy drop-files message.
    type DropHandle: Copy + fmt::Debug;
    /// What the OS hands to drag callbacks to describe the dragged content.
    type DataObject: ?Sized;
    /// The object registered with the OS as the drop target.
    type Target: Clone;

    /// Wraps `engine` into the object the OS calls back during a drag.
    fn create_target(&self, engine: Weak<DropTarget<Self>>) -> Self::Target;

    fn initialize_object_model(&self) -> Result<()>;

    fn uninitialize_object_model(&self);

    fn register_drop_target(
        &self,
        window: Self::Window,
        target: &Self::Target,
    ) -> Result<Registration>;

    fn revoke_drop_target(&self, window: Self::Window) -> Result<()>;

    /// Enables or disables the legacy drop-files message for `window`.
    fn set_accept_files(&self, window: Self::Window, accept: bool);

    /// All descendants of `root`, not only direct children.
    fn child_windows(&self, root: Self::Window) -> Vec<Self::Window>;

    fn window_from_point(&self, screen: Point) -> Option<Self::Window>;

    fn screen_to_client(&self, window: Self::Window, screen: Point) -> Point;

    fn is_window(&self, window: Self::Window) -> bool;

    fn has_file_list(&self, data: &Self::DataObject) -> bool;

    fn file_paths(&self, data: &Self::DataObject) -> Result<Vec<String>>;

    fn drop_point(&self, drop: Self::DropHandle) -> DropPoint;

    fn drop_files(&self, drop: Self::DropHandle) -> Vec<String>;

    /// Releases the legacy drop handle.
    fn finish_drop(&self, drop: Self::DropHandle);

    /// Routes `root`'s messages through `handler`, saving the current procedure for
    /// forwarding and restoration.
    fn install_interception(
        &self,
        root: Self::Window,
        handler: Weak<dyn MessageHandler<Self>>,
    ) -> Result<()>;

    /// Restores the procedure saved by [`Platform::install_interception`].
    fn remove_interception(&self, root: Self::Window);

    /// Queues `item` behind the messages already pending for `root`.
    ///
    /// On failure the item is handed back so the caller can destroy it.
    fn post(&self, root: Self::Window, item: WorkItem) -> std::result::Result<(), WorkItem>;

    /// Monotonic milliseconds.
    fn tick_count(&self) -> u64;
}
