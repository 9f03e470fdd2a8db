// Copyright 2023-2023 CrabNebula Ltd.
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use std::ops::{BitAnd, BitOr};

/// Drop effect bit mask. Bit values match the OLE `DROPEFFECT_*` constants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DropEffect(pub u32);

impl DropEffect {
    pub const NONE: Self = Self(0);
    pub const COPY: Self = Self(1);
    pub const MOVE: Self = Self(2);
    pub const LINK: Self = Self(4);

    /// What a drag source allows when it does not say.
    pub const ANY: Self = Self(Self::COPY.0 | Self::MOVE.0 | Self::LINK.0);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for DropEffect {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for DropEffect {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// Modifier and mouse button state. Bit values match the Win32 `MK_*` constants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KeyState(pub u32);

impl KeyState {
    pub const NONE: Self = Self(0);
    pub const SHIFT: Self = Self(0x0004);
    pub const CONTROL: Self = Self(0x0008);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for KeyState {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Picks copy, then link, then move out of `allowed`.
pub fn choose_allowed_effect(allowed: DropEffect) -> DropEffect {
    [DropEffect::COPY, DropEffect::LINK, DropEffect::MOVE]
        .into_iter()
        .find(|effect| allowed.intersects(*effect))
        .unwrap_or(DropEffect::NONE)
}

/// Maps the held modifiers to the effect the user asks for, the way Explorer does:
/// ctrl+shift links, ctrl copies, shift moves. Falls back to [`choose_allowed_effect`]
/// when nothing is held or the requested effect is not allowed.
pub fn effect_from_key_state(keys: KeyState, allowed: DropEffect) -> DropEffect {
    let control = keys.contains(KeyState::CONTROL);
    let shift = keys.contains(KeyState::SHIFT);

    let wanted = match (control, shift) {
        (true, true) => DropEffect::LINK,
        (true, false) => DropEffect::COPY,
        (false, true) => DropEffect::MOVE,
        (false, false) => choose_allowed_effect(allowed),
    };

    if wanted.intersects(allowed) {
        wanted
    } else {
        choose_allowed_effect(allowed)
    }
}

/// Effect to report back for an offered mask; an empty offer counts as "anything".
pub(crate) fn negotiate(keys: KeyState, offered: DropEffect) -> DropEffect {
    let allowed = if offered.is_empty() {
        DropEffect::ANY
    } else {
        offered
    };
    effect_from_key_state(keys, allowed)
}
