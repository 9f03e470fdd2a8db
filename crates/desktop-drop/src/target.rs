// Copyright 2023-2023 CrabNebula Ltd.
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use std::{
    cell::Cell,
    rc::{Rc, Weak},
};

use crate::{
    effect::negotiate,
    logging::set_logging_enabled,
    platform::{MessageHandler, Platform, RootMessage},
    registrar::{Intercepted, Registrar},
    DragSession, DropEffect, DropEvent, DropEventSink, DropPoint, Error, KeyState, Options, Point,
};

/// The drop target of one top-level window.
///
/// Bridges the OS drag callbacks into [`DropEvent`]s, posts them to the window's own
/// message queue and dispatches them to the sink from there, so the OS drag loop is never
/// blocked by the application. Teardown runs when the last `Rc` is dropped.
pub struct DropTarget<P: Platform> {
    platform: Rc<P>,
    window: P::Window,
    target: P::Target,
    sink: Box<dyn DropEventSink>,
    session: Rc<DragSession>,
    registrar: Registrar<P>,
    options: Options,
    available: Cell<bool>,
    enabled: Cell<bool>,
    owns_object_model: Cell<bool>,
    detached: Cell<bool>,
    this: Weak<Self>,
}

impl<P: Platform> DropTarget<P> {
    /// Registers a drop target on `window` and starts tracking its child windows.
    ///
    /// Never fails. When the OS refuses the registration, [`DropTarget::is_available`]
    /// reports `false` and only legacy drops and child windows are served; when the object
    /// model cannot be initialized, the target stays inert.
    pub fn new(
        platform: P,
        window: P::Window,
        sink: impl DropEventSink + 'static,
        options: Options,
    ) -> Rc<Self> {
        if let Some(enabled) = options.enable_logging {
            set_logging_enabled(enabled);
        }

        let platform = Rc::new(platform);
        let session = Rc::new(DragSession::new());
        let engine = Rc::new_cyclic(|this: &Weak<Self>| {
            let target = platform.create_target(this.clone());
            let registrar = Registrar::new(platform.clone(), session.clone());
            Self {
                platform,
                window,
                target,
                sink: Box::new(sink),
                session,
                registrar,
                options,
                available: Cell::new(false),
                enabled: Cell::new(false),
                owns_object_model: Cell::new(false),
                detached: Cell::new(false),
                this: this.clone(),
            }
        });

        engine.attach();
        engine
    }

    fn attach(&self) {
        let registered = match self.platform.register_drop_target(self.window, &self.target) {
            Ok(outcome) => {
                diag!("drop target on {:?}: {outcome:?}", self.window);
                true
            }
            Err(e) => {
                diag!(
                    "registering {:?} failed: {e}, initializing object model",
                    self.window
                );
                match self.register_after_initializing() {
                    Some(registered) => registered,
                    None => {
                        diag!("drop support unavailable for {:?}", self.window);
                        return;
                    }
                }
            }
        };

        if !registered {
            diag!("no drop target on {:?}, relying on legacy drops", self.window);
        }
        self.available.set(registered);
        self.enabled.set(true);
        self.platform.set_accept_files(self.window, true);
        self.start();
    }

    /// `None` when the object model cannot be initialized at all, otherwise whether the
    /// retried registration went through.
    fn register_after_initializing(&self) -> Option<bool> {
        if let Err(e) = self.platform.initialize_object_model() {
            diag!("object model initialization failed: {e}");
            return None;
        }

        match self.platform.register_drop_target(self.window, &self.target) {
            Ok(outcome) => {
                diag!("retry on {:?}: {outcome:?}", self.window);
                self.owns_object_model.set(true);
                Some(true)
            }
            Err(e) => {
                diag!("retry on {:?} failed: {e}", self.window);
                self.platform.uninitialize_object_model();
                Some(false)
            }
        }
    }

    /// Starts tracking the window tree. Called on construction; call again after
    /// [`DropTarget::stop`] to repopulate registrations from the live window tree.
    pub fn start(&self) {
        if !self.enabled.get() || self.detached.get() {
            return;
        }
        let handler: Weak<dyn MessageHandler<P>> = self.this.clone();
        self.registrar.start(self.window, self.target.clone(), handler);
    }

    /// Stops tracking the window tree and revokes every child registration.
    pub fn stop(&self) {
        self.registrar.stop();
    }

    pub fn drag_enter(
        &self,
        data: Option<&P::DataObject>,
        keys: KeyState,
        screen: Point,
        effect: &mut DropEffect,
    ) {
        self.session.begin();
        *effect = negotiate(keys, *effect);

        self.registrar.ensure_registered_under_point(screen);

        let has_files = data.is_some_and(|data| self.platform.has_file_list(data));
        diag!("drag enter at {screen:?} keys={keys:?} effect={effect:?} files={has_files}");

        let client = self.platform.screen_to_client(self.window, screen);
        self.registrar.post_event(DropEvent::Entered {
            x: client.x.into(),
            y: client.y.into(),
        });
    }

    pub fn drag_over(&self, keys: KeyState, screen: Point, effect: &mut DropEffect) {
        *effect = negotiate(keys, *effect);

        let client = self.platform.screen_to_client(self.window, screen);
        self.registrar.post_event(DropEvent::Updated {
            x: client.x.into(),
            y: client.y.into(),
        });
    }

    pub fn drag_leave(&self) {
        diag!("drag leave");
        self.session.end();

        self.registrar.post_event(DropEvent::Exited);

        self.registrar.on_session_end();
        self.session.record_drop(self.platform.tick_count());
    }

    pub fn drag_drop(
        &self,
        data: Option<&P::DataObject>,
        keys: KeyState,
        screen: Point,
        effect: &mut DropEffect,
    ) {
        *effect = negotiate(keys, *effect);
        diag!("drop at {screen:?} keys={keys:?} effect={effect:?}");

        let paths = data
            .ok_or(Error::NoFileList)
            .and_then(|data| self.platform.file_paths(data))
            .unwrap_or_else(|e| {
                diag!("no files extracted: {e}");
                Vec::new()
            });
        for path in &paths {
            diag!("dropped {path}");
        }

        self.registrar.post_event(DropEvent::Performed { paths });
        self.registrar.post_event(DropEvent::Exited);

        self.session.end();
        self.registrar.on_session_end();
        self.session.record_drop(self.platform.tick_count());
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_active()
    }

    /// Legacy drop-files path. Ignored while an OLE drag is in progress, or right after a
    /// drop, when the same physical drop arrives through both channels.
    pub fn handle_legacy_drop(&self, drop: P::DropHandle) {
        if self.is_dragging() {
            diag!("legacy drop ignored, drag session active");
            return;
        }

        let now = self.platform.tick_count();
        let debounce = u64::try_from(self.options.legacy_debounce.as_millis()).unwrap_or(u64::MAX);
        if self.session.within_debounce(now, debounce) {
            diag!(
                "legacy drop ignored, {}ms after the last drop",
                now.saturating_sub(self.session.last_drop_ms())
            );
            return;
        }

        let client = match self.platform.drop_point(drop) {
            DropPoint::Client(point) => point,
            DropPoint::Screen(point) => self.platform.screen_to_client(self.window, point),
        };
        self.registrar.post_event(DropEvent::Entered {
            x: client.x.into(),
            y: client.y.into(),
        });

        let paths = self.platform.drop_files(drop);
        diag!("legacy drop with {} file(s)", paths.len());
        for path in &paths {
            diag!("dropped {path}");
        }
        self.registrar.post_event(DropEvent::Performed { paths });
        self.registrar.post_event(DropEvent::Exited);

        diag!("legacy drop seen, requesting re-registration");
        self.registrar.request_full_re_registration();

        self.session.record_drop(self.platform.tick_count());
    }

    /// Revokes everything and restores the window procedure. Runs at most once; also runs
    /// on drop.
    pub fn detach(&self) {
        if self.detached.replace(true) {
            return;
        }

        self.registrar.stop();
        let result = self.platform.revoke_drop_target(self.window);
        diag!("teardown revoke {:?}: {result:?}", self.window);

        if self.owns_object_model.replace(false) {
            diag!("uninitializing object model");
            self.platform.uninitialize_object_model();
        }
    }

    fn deliver(&self, event: DropEvent) {
        self.sink.dispatch(event);
    }

    pub fn window(&self) -> P::Window {
        self.window
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn session(&self) -> &DragSession {
        &self.session
    }

    pub fn registrar(&self) -> &Registrar<P> {
        &self.registrar
    }

    /// Whether the OS accepted the drop target on the window at construction.
    pub fn is_available(&self) -> bool {
        self.available.get()
    }

    pub fn owns_object_model(&self) -> bool {
        self.owns_object_model.get()
    }
}

impl<P: Platform> MessageHandler<P> for DropTarget<P> {
    fn handle_message(&self, message: RootMessage<P>) {
        match self.registrar.intercept(message) {
            Intercepted::Handled => {}
            Intercepted::Deliver(event) => self.deliver(*event),
            Intercepted::LegacyDrop(drop) => {
                self.handle_legacy_drop(drop);
                self.platform.finish_drop(drop);
            }
        }
    }
}

impl<P: Platform> Drop for DropTarget<P> {
    fn drop(&mut self) {
        self.detach();
    }
}
