// Copyright 2023-2023 CrabNebula Ltd.
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Method calls an embedding application may send over its bridge.

use crate::{
    logging::{logging_enabled, set_logging_enabled},
    Error, Result,
};

pub const SET_LOGGING_ENABLED: &str = "setLoggingEnabled";
pub const GET_LOGGING_ENABLED: &str = "getLoggingEnabled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "method", content = "arguments", rename_all = "camelCase")
)]
pub enum ControlCall {
    SetLoggingEnabled(bool),
    GetLoggingEnabled,
}

impl ControlCall {
    /// A set call without a boolean argument turns logging off.
    pub fn parse(method: &str, argument: Option<bool>) -> Result<Self> {
        match method {
            SET_LOGGING_ENABLED => Ok(Self::SetLoggingEnabled(argument.unwrap_or(false))),
            GET_LOGGING_ENABLED => Ok(Self::GetLoggingEnabled),
            other => {
                diag!("method call: {other}");
                Err(Error::NotImplemented(other.to_string()))
            }
        }
    }

    /// Runs the call and returns the reply value.
    pub fn apply(self) -> bool {
        match self {
            Self::SetLoggingEnabled(enabled) => {
                set_logging_enabled(enabled);
                true
            }
            Self::GetLoggingEnabled => logging_enabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_methods() {
        assert_eq!(
            ControlCall::parse("setLoggingEnabled", Some(true)).unwrap(),
            ControlCall::SetLoggingEnabled(true)
        );
        assert_eq!(
            ControlCall::parse("setLoggingEnabled", None).unwrap(),
            ControlCall::SetLoggingEnabled(false)
        );
        assert_eq!(
            ControlCall::parse("getLoggingEnabled", Some(true)).unwrap(),
            ControlCall::GetLoggingEnabled
        );
    }

    #[test]
    fn unknown_method_is_not_implemented() {
        let err = ControlCall::parse("startDrag", None).unwrap_err();
        assert!(matches!(err, Error::NotImplemented(ref name) if name == "startDrag"));
        assert_eq!(err.to_string(), "method `startDrag` is not implemented");
    }

    // the only unit test that touches the process-wide toggle
    #[test]
    fn set_then_get_round_trips_through_toggle() {
        let initial = logging_enabled();

        assert!(ControlCall::SetLoggingEnabled(true).apply());
        assert!(ControlCall::GetLoggingEnabled.apply());

        assert!(ControlCall::SetLoggingEnabled(false).apply());
        assert!(!ControlCall::GetLoggingEnabled.apply());

        crate::logging::desktop_drop_set_logging_enabled(1);
        assert!(logging_enabled());

        set_logging_enabled(initial);
    }
}
