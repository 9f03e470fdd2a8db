// Copyright 2023-2023 CrabNebula Ltd.
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Keeps every window under the root registered as a drop target.
//!
//! OLE forbids `RegisterDragDrop`/`RevokeDragDrop` while a drag session is running, and the
//! modal drag loop keeps pumping our messages, so child windows created or destroyed
//! mid-drag have their (de)registration queued and applied when the session ends.

use std::{
    cell::RefCell,
    collections::HashSet,
    mem,
    rc::{Rc, Weak},
};

use crate::{
    platform::{MessageHandler, Platform, RootMessage, WorkItem},
    DragSession, DropEvent, Point,
};

/// What the interception leaves for the drop target to do with a root message.
pub enum Intercepted<P: Platform> {
    Handled,
    /// Dispatch the event to the sink; the payload is destroyed afterwards.
    Deliver(Box<DropEvent>),
    /// Run the legacy drop path, then release the handle.
    LegacyDrop(P::DropHandle),
}

struct State<P: Platform> {
    root: Option<P::Window>,
    target: Option<P::Target>,
    intercepting: bool,
    registered: HashSet<P::Window>,
    pending_add: Vec<P::Window>,
    pending_del: Vec<P::Window>,
    re_register_pending: bool,
}

impl<P: Platform> State<P> {
    fn new() -> Self {
        Self {
            root: None,
            target: None,
            intercepting: false,
            registered: HashSet::new(),
            pending_add: Vec::new(),
            pending_del: Vec::new(),
            re_register_pending: false,
        }
    }
}

pub struct Registrar<P: Platform> {
    platform: Rc<P>,
    session: Rc<DragSession>,
    state: RefCell<State<P>>,
}

impl<P: Platform> Registrar<P> {
    pub(crate) fn new(platform: Rc<P>, session: Rc<DragSession>) -> Self {
        Self {
            platform,
            session,
            state: RefCell::new(State::new()),
        }
    }

    /// Takes over `root`: legacy drops, message interception, and registration of the root
    /// and all of its current descendants.
    pub fn start(
        &self,
        root: P::Window,
        target: P::Target,
        handler: Weak<dyn MessageHandler<P>>,
    ) {
        {
            let mut state = self.state.borrow_mut();
            state.root = Some(root);
            state.target = Some(target);
        }

        self.platform.set_accept_files(root, true);
        self.intercept_root(root, handler);

        self.register_on_window(root);
        self.register_descendants(root);
        diag!(
            "registrar started on {root:?}, {} window(s) registered",
            self.registered_count()
        );
    }

    /// Undoes [`Registrar::start`]. Revocation is best effort, one failure does not stop
    /// the others.
    pub fn stop(&self) {
        let (root, intercepting, registered) = {
            let mut state = self.state.borrow_mut();
            state.target = None;
            state.pending_add.clear();
            state.pending_del.clear();
            state.re_register_pending = false;
            (
                state.root.take(),
                mem::take(&mut state.intercepting),
                state.registered.drain().collect::<Vec<_>>(),
            )
        };

        if let Some(root) = root {
            self.platform.set_accept_files(root, false);
            if intercepting {
                self.platform.remove_interception(root);
                diag!("root interception removed from {root:?}");
            }
        }

        for window in registered {
            if self.platform.is_window(window) {
                let result = self.platform.revoke_drop_target(window);
                diag!("stop revoke {window:?}: {result:?}");
            }
        }
    }

    /// Registers whatever window sits under `screen` if it is not registered yet. Catches
    /// windows created since the last enumeration the moment a drag reaches them.
    pub fn ensure_registered_under_point(&self, screen: Point) {
        let Some(window) = self.platform.window_from_point(screen) else {
            return;
        };
        if !self.is_registered(window) {
            self.register_on_window(window);
        }
    }

    /// Arms the re-registration flag and schedules the work item on the root.
    ///
    /// Extra work items are harmless: the first one to run clears the flag.
    pub fn request_full_re_registration(&self) {
        let Some(root) = self.live_root() else {
            return;
        };
        self.state.borrow_mut().re_register_pending = true;
        self.post(root, WorkItem::ReRegister);
    }

    /// Applies the operations queued during the session, then reschedules a re-registration
    /// requested meanwhile.
    pub fn on_session_end(&self) {
        self.flush_pending();
        if self.re_registration_pending() {
            self.request_full_re_registration();
        }
    }

    pub fn register_on_window(&self, window: P::Window) {
        let target = {
            let mut state = self.state.borrow_mut();
            if state.registered.contains(&window) {
                return;
            }
            if self.session.is_active() {
                if !state.pending_add.contains(&window) {
                    state.pending_add.push(window);
                    diag!("drag in progress, deferring registration of {window:?}");
                }
                return;
            }
            match &state.target {
                Some(target) => target.clone(),
                None => return,
            }
        };

        self.apply_register(window, &target);
    }

    pub fn revoke_on_window(&self, window: P::Window) {
        {
            let mut state = self.state.borrow_mut();
            let known =
                state.registered.contains(&window) || state.pending_add.contains(&window);
            if !known {
                return;
            }
            if self.session.is_active() {
                if !state.pending_del.contains(&window) {
                    state.pending_del.push(window);
                    diag!("drag in progress, deferring revocation of {window:?}");
                }
                return;
            }
            state.registered.remove(&window);
        }

        let result = self.platform.revoke_drop_target(window);
        diag!("revoke {window:?}: {result:?}");
    }

    /// Revokes and re-registers the root and every tracked window, then re-enumerates the
    /// descendants. Must not run during a drag session.
    pub fn force_full_re_registration(&self) {
        let Some(root) = self.live_root() else {
            return;
        };
        let Some(target) = self.state.borrow().target.clone() else {
            return;
        };

        diag!("forced re-registration begin");
        let snapshot = self
            .state
            .borrow()
            .registered
            .iter()
            .copied()
            .collect::<Vec<_>>();

        self.re_register(root, &target);
        for window in snapshot {
            if window == root {
                continue;
            }
            if self.platform.is_window(window) {
                self.re_register(window, &target);
            } else {
                self.state.borrow_mut().registered.remove(&window);
            }
        }

        self.register_descendants(root);
        self.platform.set_accept_files(root, true);
        diag!(
            "forced re-registration done, {} window(s) registered",
            self.registered_count()
        );
    }

    /// Handles the root messages owned by the drop engine, in priority order.
    pub fn intercept(&self, message: RootMessage<P>) -> Intercepted<P> {
        match message {
            RootMessage::ReRegister => {
                self.run_re_registration();
                Intercepted::Handled
            }
            RootMessage::Event(event) => Intercepted::Deliver(event),
            RootMessage::DropFiles(drop) => Intercepted::LegacyDrop(drop),
            RootMessage::ChildCreated(child) => {
                self.register_on_window(child);
                self.platform.set_accept_files(child, true);
                // a new child may overlap earlier siblings
                self.request_full_re_registration();
                Intercepted::Handled
            }
            RootMessage::ChildDestroyed(child) => {
                self.revoke_on_window(child);
                self.platform.set_accept_files(child, false);
                Intercepted::Handled
            }
        }
    }

    /// Hands `event` to the root's message queue. Dropped when the root is gone.
    pub(crate) fn post_event(&self, event: DropEvent) {
        match self.live_root() {
            Some(root) => self.post(root, WorkItem::Event(Box::new(event))),
            None => diag!("no live root window, dropping {event:?}"),
        }
    }

    pub fn root(&self) -> Option<P::Window> {
        self.state.borrow().root
    }

    pub fn is_intercepting(&self) -> bool {
        self.state.borrow().intercepting
    }

    pub fn is_registered(&self, window: P::Window) -> bool {
        self.state.borrow().registered.contains(&window)
    }

    pub fn registered_windows(&self) -> Vec<P::Window> {
        self.state.borrow().registered.iter().copied().collect()
    }

    pub fn registered_count(&self) -> usize {
        self.state.borrow().registered.len()
    }

    pub fn pending_additions(&self) -> Vec<P::Window> {
        self.state.borrow().pending_add.clone()
    }

    pub fn pending_removals(&self) -> Vec<P::Window> {
        self.state.borrow().pending_del.clone()
    }

    pub fn re_registration_pending(&self) -> bool {
        self.state.borrow().re_register_pending
    }

    fn run_re_registration(&self) {
        if !self.re_registration_pending() {
            return;
        }
        if self.session.is_active() {
            // try again once the drag loop lets go
            if let Some(root) = self.live_root() {
                self.post(root, WorkItem::ReRegister);
            }
            return;
        }
        self.state.borrow_mut().re_register_pending = false;
        self.force_full_re_registration();
    }

    fn flush_pending(&self) {
        let (deletes, adds, target) = {
            let mut state = self.state.borrow_mut();
            (
                mem::take(&mut state.pending_del),
                mem::take(&mut state.pending_add),
                state.target.clone(),
            )
        };

        for window in &deletes {
            let was_registered = self.state.borrow_mut().registered.remove(window);
            if was_registered && self.platform.is_window(*window) {
                let result = self.platform.revoke_drop_target(*window);
                diag!("flush revoke {window:?}: {result:?}");
            }
        }

        let Some(target) = target else {
            return;
        };
        for window in adds {
            if deletes.contains(&window) {
                diag!("skipping deferred registration of removed {window:?}");
                continue;
            }
            if self.platform.is_window(window) && !self.is_registered(window) {
                self.apply_register(window, &target);
            }
        }
    }

    fn intercept_root(&self, root: P::Window, handler: Weak<dyn MessageHandler<P>>) {
        if self.state.borrow().intercepting || !self.platform.is_window(root) {
            return;
        }
        match self.platform.install_interception(root, handler) {
            Ok(()) => {
                self.state.borrow_mut().intercepting = true;
                diag!("root interception installed on {root:?}");
            }
            Err(e) => diag!("failed to intercept {root:?}: {e}"),
        }
    }

    fn register_descendants(&self, root: P::Window) {
        for child in self.platform.child_windows(root) {
            self.register_on_window(child);
            self.platform.set_accept_files(child, true);
        }
    }

    fn re_register(&self, window: P::Window, target: &P::Target) {
        let result = self.platform.revoke_drop_target(window);
        diag!("re-register revoke {window:?}: {result:?}");
        self.state.borrow_mut().registered.remove(&window);
        self.apply_register(window, target);
    }

    fn apply_register(&self, window: P::Window, target: &P::Target) {
        match self.platform.register_drop_target(window, target) {
            Ok(outcome) => {
                diag!("register {window:?}: {outcome:?}");
                self.state.borrow_mut().registered.insert(window);
            }
            Err(e) => diag!("register {window:?} failed: {e}"),
        }
    }

    fn live_root(&self) -> Option<P::Window> {
        self.root().filter(|root| self.platform.is_window(*root))
    }

    fn post(&self, root: P::Window, item: WorkItem) {
        if let Err(item) = self.platform.post(root, item) {
            diag!("failed to post {item:?} to {root:?}, dropped");
        }
    }
}
