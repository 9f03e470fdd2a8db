// Copyright 2023-2023 CrabNebula Ltd.
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use std::rc::Weak;

use windows::{
    core::implement,
    Win32::{
        Foundation::POINTL,
        System::{
            Com::IDataObject,
            Ole::{IDropTarget, IDropTarget_Impl, DROPEFFECT},
            SystemServices::MODIFIERKEYS_FLAGS,
        },
    },
};
use windows_core::Ref;

use super::Win32Platform;
use crate::{DropEffect, DropTarget, KeyState, Point};

/// The COM object handed to `RegisterDragDrop`.
///
/// One instance is shared by the root and all of its descendants. Once the engine is gone
/// every callback refuses the drop.
#[implement(IDropTarget)]
pub(crate) struct OleDropTarget {
    engine: Weak<DropTarget<Win32Platform>>,
}

impl OleDropTarget {
    pub(crate) fn new(engine: Weak<DropTarget<Win32Platform>>) -> Self {
        Self { engine }
    }
}

/// Runs `f` over the effect the source offers and writes back what it picked.
fn negotiate_with(pdweffect: *mut DROPEFFECT, f: impl FnOnce(&mut DropEffect)) {
    let offered = unsafe { pdweffect.as_ref() }.map(|e| DropEffect(e.0));
    let mut effect = offered.unwrap_or(DropEffect::NONE);
    f(&mut effect);
    if let Some(out) = unsafe { pdweffect.as_mut() } {
        *out = DROPEFFECT(effect.0);
    }
}

fn point(pt: &POINTL) -> Point {
    Point::new(pt.x, pt.y)
}

#[allow(non_snake_case)]
impl IDropTarget_Impl for OleDropTarget_Impl {
    fn DragEnter(
        &self,
        pdataobj: Ref<'_, IDataObject>,
        grfkeystate: MODIFIERKEYS_FLAGS,
        pt: &POINTL,
        pdweffect: *mut DROPEFFECT,
    ) -> windows_core::Result<()> {
        match self.engine.upgrade() {
            Some(engine) => negotiate_with(pdweffect, |effect| {
                engine.drag_enter(pdataobj.as_ref(), KeyState(grfkeystate.0), point(pt), effect)
            }),
            None => negotiate_with(pdweffect, |effect| *effect = DropEffect::NONE),
        }
        Ok(())
    }

    fn DragOver(
        &self,
        grfkeystate: MODIFIERKEYS_FLAGS,
        pt: &POINTL,
        pdweffect: *mut DROPEFFECT,
    ) -> windows_core::Result<()> {
        match self.engine.upgrade() {
            Some(engine) => negotiate_with(pdweffect, |effect| {
                engine.drag_over(KeyState(grfkeystate.0), point(pt), effect)
            }),
            None => negotiate_with(pdweffect, |effect| *effect = DropEffect::NONE),
        }
        Ok(())
    }

    fn DragLeave(&self) -> windows_core::Result<()> {
        if let Some(engine) = self.engine.upgrade() {
            engine.drag_leave();
        }
        Ok(())
    }

    fn Drop(
        &self,
        pdataobj: Ref<'_, IDataObject>,
        grfkeystate: MODIFIERKEYS_FLAGS,
        pt: &POINTL,
        pdweffect: *mut DROPEFFECT,
    ) -> windows_core::Result<()> {
        match self.engine.upgrade() {
            Some(engine) => negotiate_with(pdweffect, |effect| {
                engine.drag_drop(pdataobj.as_ref(), KeyState(grfkeystate.0), point(pt), effect)
            }),
            None => negotiate_with(pdweffect, |effect| *effect = DropEffect::NONE),
        }
        Ok(())
    }
}
