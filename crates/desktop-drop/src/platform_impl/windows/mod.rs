// Copyright 2023-2023 CrabNebula Ltd.
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use raw_window_handle::{HasWindowHandle, RawWindowHandle};

use crate::{
    platform::{MessageHandler, Platform, Registration, WorkItem},
    DropEventSink, DropPoint, DropTarget, Error, Options, Point,
};

use std::{
    ffi::c_void,
    rc::{Rc, Weak},
};
use windows::{
    core::BOOL,
    Win32::{
        Foundation::{
            CO_E_NOTINITIALIZED, DRAGDROP_E_ALREADYREGISTERED, HWND, LPARAM, POINT, S_OK, WPARAM,
        },
        Graphics::Gdi::ScreenToClient,
        System::{
            Com::{IDataObject, DVASPECT_CONTENT, FORMATETC, TYMED_HGLOBAL},
            Memory::{GlobalLock, GlobalUnlock},
            Ole::{
                IDropTarget, OleInitialize, OleUninitialize, RegisterDragDrop, ReleaseStgMedium,
                RevokeDragDrop, CF_HDROP,
            },
            SystemInformation::GetTickCount64,
        },
        UI::{
            Shell::{DragAcceptFiles, DragFinish, DragQueryPoint, HDROP},
            WindowsAndMessaging::{EnumChildWindows, IsWindow, PostMessageW, WindowFromPoint},
        },
    },
};

mod ole;
mod subclass;
mod utils;

/// A window handle that can live in hash sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hwnd(pub isize);

impl Hwnd {
    pub fn raw(self) -> HWND {
        HWND(self.0 as *mut c_void)
    }
}

impl From<HWND> for Hwnd {
    fn from(hwnd: HWND) -> Self {
        Self(hwnd.0 as isize)
    }
}

/// The `HDROP` carried by `WM_DROPFILES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hdrop(pub isize);

impl Hdrop {
    pub fn raw(self) -> HDROP {
        HDROP(self.0 as *mut c_void)
    }
}

/// Win32 and OLE calls behind the drop engine.
#[derive(Debug, Default)]
pub struct Win32Platform;

fn hdrop_format() -> FORMATETC {
    FORMATETC {
        cfFormat: CF_HDROP.0,
        ptd: std::ptr::null_mut(),
        dwAspect: DVASPECT_CONTENT.0,
        lindex: -1,
        tymed: TYMED_HGLOBAL.0 as u32,
    }
}

unsafe extern "system" fn collect_child(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let children = &mut *(lparam.0 as *mut Vec<Hwnd>);
    children.push(hwnd.into());
    true.into()
}

impl Platform for Win32Platform {
    type Window = Hwnd;
    type DropHandle = Hdrop;
    type DataObject = IDataObject;
    type Target = IDropTarget;

    fn create_target(&self, engine: Weak<DropTarget<Self>>) -> IDropTarget {
        ole::OleDropTarget::new(engine).into()
    }

    fn initialize_object_model(&self) -> crate::Result<()> {
        unsafe { OleInitialize(None) }.map_err(Into::into)
    }

    fn uninitialize_object_model(&self) {
        unsafe { OleUninitialize() }
    }

    fn register_drop_target(
        &self,
        window: Hwnd,
        target: &IDropTarget,
    ) -> crate::Result<Registration> {
        match unsafe { RegisterDragDrop(window.raw(), target) } {
            Ok(()) => Ok(Registration::Registered),
            Err(e) if e.code() == DRAGDROP_E_ALREADYREGISTERED => {
                Ok(Registration::AlreadyRegistered)
            }
            Err(e) if e.code() == CO_E_NOTINITIALIZED => Err(Error::NotInitialized),
            Err(e) => Err(e.into()),
        }
    }

    fn revoke_drop_target(&self, window: Hwnd) -> crate::Result<()> {
        unsafe { RevokeDragDrop(window.raw()) }.map_err(Into::into)
    }

    fn set_accept_files(&self, window: Hwnd, accept: bool) {
        unsafe { DragAcceptFiles(window.raw(), accept.into()) }
    }

    fn child_windows(&self, root: Hwnd) -> Vec<Hwnd> {
        let mut children: Vec<Hwnd> = Vec::new();
        unsafe {
            let _ = EnumChildWindows(
                Some(root.raw()),
                Some(collect_child),
                LPARAM(&mut children as *mut Vec<Hwnd> as isize),
            );
        }
        children
    }

    fn window_from_point(&self, screen: Point) -> Option<Hwnd> {
        let hwnd = unsafe {
            WindowFromPoint(POINT {
                x: screen.x,
                y: screen.y,
            })
        };
        (!hwnd.is_invalid()).then(|| hwnd.into())
    }

    fn screen_to_client(&self, window: Hwnd, screen: Point) -> Point {
        let mut point = POINT {
            x: screen.x,
            y: screen.y,
        };
        let _ = unsafe { ScreenToClient(window.raw(), &mut point) };
        Point::new(point.x, point.y)
    }

    fn is_window(&self, window: Hwnd) -> bool {
        unsafe { IsWindow(Some(window.raw())) }.as_bool()
    }

    fn has_file_list(&self, data: &IDataObject) -> bool {
        unsafe { data.QueryGetData(&hdrop_format()) == S_OK }
    }

    fn file_paths(&self, data: &IDataObject) -> crate::Result<Vec<String>> {
        let format = hdrop_format();
        unsafe {
            if data.QueryGetData(&format) != S_OK {
                return Err(Error::NoFileList);
            }

            let mut medium = data.GetData(&format)?;
            let hglobal = medium.u.hGlobal;
            let result = if GlobalLock(hglobal).is_null() {
                Err(Error::LockFailed)
            } else {
                let paths = utils::query_files(HDROP(hglobal.0));
                let _ = GlobalUnlock(hglobal);
                Ok(paths)
            };
            ReleaseStgMedium(&mut medium);
            result
        }
    }

    fn drop_point(&self, drop: Hdrop) -> DropPoint {
        let mut point = POINT::default();
        let in_client = unsafe { DragQueryPoint(drop.raw(), &mut point) }.as_bool();
        let point = Point::new(point.x, point.y);
        if in_client {
            DropPoint::Client(point)
        } else {
            DropPoint::Screen(point)
        }
    }

    fn drop_files(&self, drop: Hdrop) -> Vec<String> {
        unsafe { utils::query_files(drop.raw()) }
    }

    fn finish_drop(&self, drop: Hdrop) {
        unsafe { DragFinish(drop.raw()) }
    }

    fn install_interception(
        &self,
        root: Hwnd,
        handler: Weak<dyn MessageHandler<Self>>,
    ) -> crate::Result<()> {
        subclass::install(root, handler)
    }

    fn remove_interception(&self, root: Hwnd) {
        subclass::remove(root)
    }

    fn post(&self, root: Hwnd, item: WorkItem) -> std::result::Result<(), WorkItem> {
        match item {
            WorkItem::ReRegister => unsafe {
                PostMessageW(
                    Some(root.raw()),
                    subclass::WM_DO_REREGISTER,
                    WPARAM(0),
                    LPARAM(0),
                )
            }
            .map_err(|_| WorkItem::ReRegister),
            WorkItem::Event(event) => {
                let raw = Box::into_raw(event);
                unsafe {
                    PostMessageW(
                        Some(root.raw()),
                        subclass::WM_FIRE_EVENT,
                        WPARAM(raw as usize),
                        LPARAM(0),
                    )
                }
                // the message never made it into the queue, so the payload is still ours
                .map_err(|_| WorkItem::Event(unsafe { Box::from_raw(raw) }))
            }
        }
    }

    fn tick_count(&self) -> u64 {
        unsafe { GetTickCount64() }
    }
}

/// Accepts dropped files on `window` and on every child window it creates.
///
/// Drop support lasts as long as the returned `Rc` is alive. Must be called on the thread
/// that owns the window.
pub fn attach<W: HasWindowHandle>(
    window: &W,
    sink: impl DropEventSink + 'static,
    options: Options,
) -> crate::Result<Rc<DropTarget<Win32Platform>>> {
    let handle = window
        .window_handle()
        .map_err(|_| Error::UnsupportedWindowHandle)?;

    if let RawWindowHandle::Win32(w) = handle.as_raw() {
        Ok(DropTarget::new(
            Win32Platform,
            Hwnd(w.hwnd.get()),
            sink,
            options,
        ))
    } else {
        Err(Error::UnsupportedWindowHandle)
    }
}
