// Copyright 2023-2023 CrabNebula Ltd.
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Root window procedure interception.
//!
//! A per-thread directory maps each intercepted root to its previous window procedure and
//! to the engine handling its messages, so one `extern "system"` trampoline serves every
//! root owned by the thread.

use std::{cell::RefCell, collections::HashMap, rc::Weak};

use windows::Win32::{
    Foundation::{HWND, LPARAM, LRESULT, WPARAM},
    UI::{
        Shell::DragFinish,
        WindowsAndMessaging::{
            CallWindowProcW, DefWindowProcW, IsWindow, PeekMessageW, GWLP_WNDPROC, MSG,
            PM_REMOVE, WM_APP, WM_CREATE, WM_DESTROY, WM_DROPFILES, WM_PARENTNOTIFY, WNDPROC,
        },
    },
};

#[cfg(target_pointer_width = "64")]
use windows::Win32::UI::WindowsAndMessaging::SetWindowLongPtrW;
#[cfg(target_pointer_width = "32")]
use windows::Win32::UI::WindowsAndMessaging::SetWindowLongW as SetWindowLongPtrW;

use super::{Hdrop, Hwnd, Win32Platform};
use crate::{platform::MessageHandler, DropEvent, Error, RootMessage};

pub(crate) const WM_DO_REREGISTER: u32 = WM_APP + 0x501;
/// `wParam` carries a `Box<DropEvent>` turned into a raw pointer.
pub(crate) const WM_FIRE_EVENT: u32 = WM_APP + 0x502;

struct Subclass {
    previous: isize,
    handler: Weak<dyn MessageHandler<Win32Platform>>,
}

thread_local! {
    static DIRECTORY: RefCell<HashMap<Hwnd, Subclass>> = RefCell::new(HashMap::new());
}

/// Fails when `root` is already intercepted; the handler in place keeps the root.
pub(crate) fn install(
    root: Hwnd,
    handler: Weak<dyn MessageHandler<Win32Platform>>,
) -> crate::Result<()> {
    if DIRECTORY.with(|d| d.borrow().contains_key(&root)) {
        return Err(Error::InterceptionFailed);
    }

    #[allow(clippy::fn_to_numeric_cast)]
    let previous =
        unsafe { SetWindowLongPtrW(root.raw(), GWLP_WNDPROC, root_proc as isize as _) } as isize;
    if previous == 0 {
        return Err(Error::InterceptionFailed);
    }

    DIRECTORY.with(|d| d.borrow_mut().insert(root, Subclass { previous, handler }));
    Ok(())
}

pub(crate) fn remove(root: Hwnd) {
    let Some(subclass) = DIRECTORY.with(|d| d.borrow_mut().remove(&root)) else {
        return;
    };

    unsafe {
        if IsWindow(Some(root.raw())).as_bool() {
            SetWindowLongPtrW(root.raw(), GWLP_WNDPROC, subclass.previous as _);
        }
        reclaim_pending(root);
    }
}

/// Frees the event payloads still queued for `root`. Nothing would ever read them once
/// the trampoline is gone.
unsafe fn reclaim_pending(root: Hwnd) {
    let mut msg = MSG::default();
    while PeekMessageW(
        &mut msg,
        Some(root.raw()),
        WM_DO_REREGISTER,
        WM_FIRE_EVENT,
        PM_REMOVE,
    )
    .as_bool()
    {
        if msg.message == WM_FIRE_EVENT && msg.wParam.0 != 0 {
            drop(Box::from_raw(msg.wParam.0 as *mut DropEvent));
        }
    }
}

unsafe fn decode(
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> Option<RootMessage<Win32Platform>> {
    match msg {
        WM_DO_REREGISTER => Some(RootMessage::ReRegister),
        WM_FIRE_EVENT if wparam.0 != 0 => Some(RootMessage::Event(Box::from_raw(
            wparam.0 as *mut DropEvent,
        ))),
        WM_DROPFILES => Some(RootMessage::DropFiles(Hdrop(wparam.0 as isize))),
        WM_PARENTNOTIFY => {
            let child = Hwnd(lparam.0);
            match (wparam.0 & 0xFFFF) as u32 {
                WM_CREATE => Some(RootMessage::ChildCreated(child)),
                WM_DESTROY => Some(RootMessage::ChildDestroyed(child)),
                _ => None,
            }
        }
        _ => None,
    }
}

unsafe fn call_previous(
    previous: isize,
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let previous: WNDPROC = std::mem::transmute(previous);
    CallWindowProcW(previous, hwnd, msg, wparam, lparam)
}

unsafe extern "system" fn root_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let entry = DIRECTORY.with(|d| {
        d.borrow()
            .get(&Hwnd::from(hwnd))
            .map(|s| (s.previous, s.handler.clone()))
    });
    let Some((previous, handler)) = entry else {
        return DefWindowProcW(hwnd, msg, wparam, lparam);
    };

    let Some(message) = decode(msg, wparam, lparam) else {
        return call_previous(previous, hwnd, msg, wparam, lparam);
    };

    match handler.upgrade() {
        Some(handler) => handler.handle_message(message),
        // the engine is gone: release the drop handle, event payloads are freed here
        None => {
            if let RootMessage::DropFiles(drop) = message {
                DragFinish(drop.raw());
            }
        }
    }

    // WM_PARENTNOTIFY is informational, the previous procedure still sees it
    if msg == WM_PARENTNOTIFY {
        return call_previous(previous, hwnd, msg, wparam, lparam);
    }
    LRESULT(0)
}
