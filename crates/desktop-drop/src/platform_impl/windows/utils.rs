// Copyright 2023-2023 CrabNebula Ltd.
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use std::{ffi::OsString, os::windows::ffi::OsStringExt, path::Path};

use windows::Win32::UI::Shell::{DragQueryFileW, HDROP};

/// Turns a UTF-16 path from the shell into a `String`. UNC-prefixed paths
/// ("\\?\C:\path\to\file.txt") are simplified when they have a plain equivalent, since
/// most consumers cannot open them.
pub(crate) fn decode_path(wide: &[u16]) -> String {
    let path = OsString::from_wide(wide);
    dunce::simplified(Path::new(&path))
        .to_string_lossy()
        .into_owned()
}

/// Every path in the drop, in the order the shell lists them. Entries that cannot be
/// queried are skipped.
pub(crate) unsafe fn query_files(hdrop: HDROP) -> Vec<String> {
    let count = DragQueryFileW(hdrop, u32::MAX, None);
    (0..count)
        .filter_map(|index| {
            let len = DragQueryFileW(hdrop, index, None) as usize;
            if len == 0 {
                return None;
            }
            let mut buffer = vec![0u16; len + 1];
            let written = DragQueryFileW(hdrop, index, Some(&mut buffer)) as usize;
            Some(decode_path(&buffer[..written.min(len)]))
        })
        .collect()
}
