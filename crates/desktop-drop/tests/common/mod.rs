// Copyright 2023-2023 CrabNebula Ltd.
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! An in-memory window system for driving the drop engine without an OS.
//!
//! Windows are plain numbers. Posted work items sit in a queue until the test calls
//! [`MockPlatform::pump`] or [`MockPlatform::settle`], which stand in for the root
//! window's message loop.

#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, HashMap, HashSet, VecDeque},
    rc::{Rc, Weak},
};

use desktop_drop::{
    DropEvent, DropPoint, DropTarget, Error, MessageHandler, Options, Platform, Point,
    Registration, Result, RootMessage, WorkItem,
};

pub type Win = u32;

pub const ROOT: Win = 1;

/// Every call the engine made, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Register(Win),
    Revoke(Win),
    Initialize,
    Uninitialize,
    AcceptFiles(Win, bool),
    Install(Win),
    Remove(Win),
    FinishDrop(usize),
}

#[derive(Debug, Clone)]
struct WindowInfo {
    parent: Option<Win>,
    alive: bool,
    client_origin: Point,
}

/// What the drag source offers in a data object.
pub struct MockData {
    pub files: Option<Vec<String>>,
}

impl MockData {
    pub fn files(paths: &[&str]) -> Self {
        Self {
            files: Some(paths.iter().map(|p| p.to_string()).collect()),
        }
    }

    pub fn text() -> Self {
        Self { files: None }
    }
}

#[derive(Clone)]
pub struct MockTarget(pub Weak<DropTarget<MockPlatform>>);

#[derive(Default)]
pub struct MockState {
    windows: RefCell<BTreeMap<Win, WindowInfo>>,
    os_registered: RefCell<HashSet<Win>>,
    refused: RefCell<HashSet<Win>>,
    accept_files: RefCell<HashMap<Win, bool>>,
    calls: RefCell<Vec<Call>>,
    queue: RefCell<VecDeque<(Win, WorkItem)>>,
    handlers: RefCell<HashMap<Win, Weak<dyn MessageHandler<MockPlatform>>>>,
    legacy_drops: RefCell<Vec<(DropPoint, Vec<String>)>>,
    window_at: Cell<Option<Win>>,
    requires_initialization: Cell<bool>,
    initialization_fails: Cell<bool>,
    initialized: Cell<bool>,
    post_fails: Cell<bool>,
    tick: Cell<u64>,
}

/// Cheap to clone; clones share one window system.
#[derive(Clone)]
pub struct MockPlatform(Rc<MockState>);

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlatform {
    /// A window system holding only the root, with its client area at (50, 50).
    pub fn new() -> Self {
        let state = MockState::default();
        state.tick.set(10_000);
        let platform = Self(Rc::new(state));
        platform.add_window(ROOT, None, Point::new(50, 50));
        platform
    }

    pub fn add_window(&self, window: Win, parent: Option<Win>, client_origin: Point) {
        self.0.windows.borrow_mut().insert(
            window,
            WindowInfo {
                parent,
                alive: true,
                client_origin,
            },
        );
    }

    pub fn add_child(&self, window: Win, parent: Win) {
        let origin = self.0.windows.borrow()[&parent].client_origin;
        self.add_window(window, Some(parent), origin);
    }

    /// Destroys the window. The OS drops its drop target registration along with it.
    pub fn destroy_window(&self, window: Win) {
        if let Some(info) = self.0.windows.borrow_mut().get_mut(&window) {
            info.alive = false;
        }
        self.0.os_registered.borrow_mut().remove(&window);
    }

    /// Registration fails until the object model has been initialized.
    pub fn require_initialization(&self) {
        self.0.requires_initialization.set(true);
    }

    /// The OS refuses drop targets on `window` even though it exists.
    pub fn refuse_registration(&self, window: Win) {
        self.0.refused.borrow_mut().insert(window);
    }

    pub fn fail_initialization(&self) {
        self.0.initialization_fails.set(true);
    }

    pub fn fail_posts(&self, fail: bool) {
        self.0.post_fails.set(fail);
    }

    pub fn set_window_at(&self, window: Option<Win>) {
        self.0.window_at.set(window);
    }

    pub fn advance(&self, ms: u64) {
        self.0.tick.set(self.0.tick.get() + ms);
    }

    pub fn queue_legacy_drop(&self, point: DropPoint, paths: &[&str]) -> usize {
        let mut drops = self.0.legacy_drops.borrow_mut();
        drops.push((point, paths.iter().map(|p| p.to_string()).collect()));
        drops.len() - 1
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.0.calls.borrow_mut().clear();
    }

    pub fn count(&self, call: &Call) -> usize {
        self.0.calls.borrow().iter().filter(|c| *c == call).count()
    }

    pub fn os_registered(&self, window: Win) -> bool {
        self.0.os_registered.borrow().contains(&window)
    }

    pub fn accepts_files(&self, window: Win) -> bool {
        self.0
            .accept_files
            .borrow()
            .get(&window)
            .copied()
            .unwrap_or(false)
    }

    pub fn is_intercepted(&self, window: Win) -> bool {
        self.0.handlers.borrow().contains_key(&window)
    }

    pub fn queued(&self) -> usize {
        self.0.queue.borrow().len()
    }

    pub fn queued_re_registrations(&self) -> usize {
        self.0
            .queue
            .borrow()
            .iter()
            .filter(|(_, item)| matches!(item, WorkItem::ReRegister))
            .count()
    }

    /// Delivers a message straight to the root's intercepting procedure, the way the OS
    /// sends `WM_DROPFILES` and `WM_PARENTNOTIFY`.
    pub fn send(&self, root: Win, message: RootMessage<MockPlatform>) {
        let handler = self
            .0
            .handlers
            .borrow()
            .get(&root)
            .and_then(Weak::upgrade);
        match (handler, message) {
            (Some(handler), message) => handler.handle_message(message),
            (None, RootMessage::DropFiles(drop)) => self.finish_drop(drop),
            _ => {}
        }
    }

    /// One pass of the root message loop over the items queued right now. Items posted
    /// while pumping wait for the next pass. Returns how many items were dispatched.
    pub fn pump(&self) -> usize {
        let pending = self.queued();
        (0..pending).take_while(|_| self.pump_one()).count()
    }

    /// Pumps until the queue stays empty.
    pub fn settle(&self) {
        for _ in 0..64 {
            if self.pump() == 0 {
                return;
            }
        }
        panic!("message queue never drained");
    }

    pub fn pump_one(&self) -> bool {
        let Some((root, item)) = self.0.queue.borrow_mut().pop_front() else {
            return false;
        };
        self.send(root, item.into());
        true
    }

    fn record(&self, call: Call) {
        self.0.calls.borrow_mut().push(call);
    }

    fn alive(&self, window: Win) -> bool {
        self.0
            .windows
            .borrow()
            .get(&window)
            .is_some_and(|info| info.alive)
    }

    fn descendants_of(&self, root: Win) -> Vec<Win> {
        let windows = self.0.windows.borrow();
        windows
            .iter()
            .filter(|(_, info)| info.alive)
            .filter(|(_, info)| {
                let mut parent = info.parent;
                while let Some(p) = parent {
                    if p == root {
                        return true;
                    }
                    parent = windows.get(&p).and_then(|i| i.parent);
                }
                false
            })
            .map(|(window, _)| *window)
            .collect()
    }
}

impl Platform for MockPlatform {
    type Window = Win;
    type DropHandle = usize;
    type DataObject = MockData;
    type Target = MockTarget;

    fn create_target(&self, engine: Weak<DropTarget<Self>>) -> MockTarget {
        MockTarget(engine)
    }

    fn initialize_object_model(&self) -> Result<()> {
        self.record(Call::Initialize);
        if self.0.initialization_fails.get() {
            return Err(Error::NotInitialized);
        }
        self.0.initialized.set(true);
        Ok(())
    }

    fn uninitialize_object_model(&self) {
        self.record(Call::Uninitialize);
        self.0.initialized.set(false);
    }

    fn register_drop_target(&self, window: Win, _target: &MockTarget) -> Result<Registration> {
        self.record(Call::Register(window));
        if self.0.requires_initialization.get() && !self.0.initialized.get() {
            return Err(Error::NotInitialized);
        }
        if !self.alive(window) || self.0.refused.borrow().contains(&window) {
            return Err(Error::RegistrationFailed);
        }
        if self.0.os_registered.borrow_mut().insert(window) {
            Ok(Registration::Registered)
        } else {
            Ok(Registration::AlreadyRegistered)
        }
    }

    fn revoke_drop_target(&self, window: Win) -> Result<()> {
        self.record(Call::Revoke(window));
        if self.0.os_registered.borrow_mut().remove(&window) {
            Ok(())
        } else {
            Err(Error::RegistrationFailed)
        }
    }

    fn set_accept_files(&self, window: Win, accept: bool) {
        self.record(Call::AcceptFiles(window, accept));
        self.0.accept_files.borrow_mut().insert(window, accept);
    }

    fn child_windows(&self, root: Win) -> Vec<Win> {
        self.descendants_of(root)
    }

    fn window_from_point(&self, _screen: Point) -> Option<Win> {
        self.0.window_at.get()
    }

    fn screen_to_client(&self, window: Win, screen: Point) -> Point {
        let origin = self
            .0
            .windows
            .borrow()
            .get(&window)
            .map(|info| info.client_origin)
            .unwrap_or_default();
        Point::new(screen.x - origin.x, screen.y - origin.y)
    }

    fn is_window(&self, window: Win) -> bool {
        self.alive(window)
    }

    fn has_file_list(&self, data: &MockData) -> bool {
        data.files.is_some()
    }

    fn file_paths(&self, data: &MockData) -> Result<Vec<String>> {
        data.files.clone().ok_or(Error::NoFileList)
    }

    fn drop_point(&self, drop: usize) -> DropPoint {
        self.0.legacy_drops.borrow()[drop].0
    }

    fn drop_files(&self, drop: usize) -> Vec<String> {
        self.0.legacy_drops.borrow()[drop].1.clone()
    }

    fn finish_drop(&self, drop: usize) {
        self.record(Call::FinishDrop(drop));
    }

    fn install_interception(
        &self,
        root: Win,
        handler: Weak<dyn MessageHandler<Self>>,
    ) -> Result<()> {
        self.record(Call::Install(root));
        let mut handlers = self.0.handlers.borrow_mut();
        if handlers.contains_key(&root) {
            return Err(Error::InterceptionFailed);
        }
        handlers.insert(root, handler);
        Ok(())
    }

    fn remove_interception(&self, root: Win) {
        self.record(Call::Remove(root));
        self.0.handlers.borrow_mut().remove(&root);
        // nobody is left to read the queued payloads
        self.0.queue.borrow_mut().retain(|(window, _)| *window != root);
    }

    fn post(&self, root: Win, item: WorkItem) -> std::result::Result<(), WorkItem> {
        if self.0.post_fails.get() || !self.alive(root) {
            return Err(item);
        }
        self.0.queue.borrow_mut().push_back((root, item));
        Ok(())
    }

    fn tick_count(&self) -> u64 {
        self.0.tick.get()
    }
}

/// Collects whatever the sink receives.
#[derive(Clone, Default)]
pub struct Recorder(Rc<RefCell<Vec<DropEvent>>>);

impl Recorder {
    pub fn sink(&self) -> impl Fn(DropEvent) + 'static {
        let events = self.0.clone();
        move |event| events.borrow_mut().push(event)
    }

    pub fn events(&self) -> Vec<DropEvent> {
        self.0.borrow().clone()
    }

    pub fn take(&self) -> Vec<DropEvent> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

/// A drop target on [`ROOT`] with default options.
pub fn attached(platform: &MockPlatform) -> (Rc<DropTarget<MockPlatform>>, Recorder) {
    attached_with(platform, Options::default())
}

pub fn attached_with(
    platform: &MockPlatform,
    options: Options,
) -> (Rc<DropTarget<MockPlatform>>, Recorder) {
    let recorder = Recorder::default();
    let target = DropTarget::new(platform.clone(), ROOT, recorder.sink(), options);
    (target, recorder)
}

pub fn entered(x: f64, y: f64) -> DropEvent {
    DropEvent::Entered { x, y }
}

pub fn updated(x: f64, y: f64) -> DropEvent {
    DropEvent::Updated { x, y }
}

pub fn performed(paths: &[&str]) -> DropEvent {
    DropEvent::Performed {
        paths: paths.iter().map(|p| p.to_string()).collect(),
    }
}
