use hook_shared::{MessageIds, TrayNotification};
use serde::Serialize;

use crate::error::HostResult;

/// Something a relay delivered to the controller window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ControllerEvent {
    LanguageChanged { wparam: usize, lparam: isize },
    TrayIcon(TrayNotification),
}

impl ControllerEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::LanguageChanged { .. } => "language-changed",
            Self::TrayIcon(_) => "tray-icon",
        }
    }

    /// Recognise the shell relay's message; parameters are kept verbatim.
    pub fn from_shell_message(
        ids: &MessageIds,
        msg: u32,
        wparam: usize,
        lparam: isize,
    ) -> Option<Self> {
        (ids.shell != 0 && msg == ids.shell).then_some(Self::LanguageChanged { wparam, lparam })
    }

    /// Recognise a tray payload forwarded as WM_COPYDATA.
    pub fn from_copy_data(tag: usize, payload: &[u8]) -> Option<Self> {
        TrayNotification::parse(tag, payload).map(Self::TrayIcon)
    }

    pub fn to_json(&self) -> HostResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(target_os = "windows")]
impl ControllerEvent {
    /// Decode a message received by the controller's window procedure.
    ///
    /// # Safety
    /// For WM_COPYDATA, `lparam` must be the `COPYDATASTRUCT` pointer the
    /// system passed to the window procedure.
    pub unsafe fn decode(ids: &MessageIds, msg: u32, wparam: usize, lparam: isize) -> Option<Self> {
        use hook_shared::relay::WM_COPYDATA;
        use windows::Win32::System::DataExchange::COPYDATASTRUCT;

        if msg != WM_COPYDATA {
            return Self::from_shell_message(ids, msg, wparam, lparam);
        }
        if lparam == 0 {
            return None;
        }
        let data = &*(lparam as *const COPYDATASTRUCT);
        if data.lpData.is_null() || data.cbData == 0 {
            return None;
        }
        let payload = std::slice::from_raw_parts(data.lpData as *const u8, data.cbData as usize);
        Self::from_copy_data(data.dwData, payload)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use hook_shared::config::{SHELL_TRAY_MAGIC, SH_TRAY_DATA};
    use hook_shared::relay::WM_COPYDATA;
    use hook_shared::TrayAction;

    const IDS: MessageIds = MessageIds {
        start: 0xC010,
        stop: 0xC011,
        shell: 0xC012,
    };

    fn tray_payload() -> Vec<u8> {
        let mut bytes = Vec::new();
        for value in [SHELL_TRAY_MAGIC, 0, 956, 0x1234, 7, 0x3, 0x8010, 0x99] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes.extend_from_slice(&[0u8; 256]);
        bytes
    }

    #[test]
    fn test_language_event_keeps_parameters() {
        let event = ControllerEvent::from_shell_message(&IDS, IDS.shell, 5, 7).unwrap();
        assert_eq!(
            event,
            ControllerEvent::LanguageChanged {
                wparam: 5,
                lparam: 7
            }
        );
        assert_eq!(event.event_name(), "language-changed");
    }

    #[test]
    fn test_other_messages_ignored() {
        assert!(ControllerEvent::from_shell_message(&IDS, IDS.start, 5, 7).is_none());
        assert!(ControllerEvent::from_shell_message(&IDS, WM_COPYDATA, 5, 7).is_none());
        let unset = MessageIds::default();
        assert!(ControllerEvent::from_shell_message(&unset, 0, 5, 7).is_none());
    }

    #[test]
    fn test_tray_event_from_copy_data() {
        let event = ControllerEvent::from_copy_data(SH_TRAY_DATA, &tray_payload()).unwrap();
        let ControllerEvent::TrayIcon(note) = &event else {
            panic!("expected tray event, got {:?}", event);
        };
        assert_eq!(note.action, TrayAction::Add);
        assert_eq!(note.window, 0x1234);
        assert_eq!(note.id, 7);
        assert_eq!(note.tip, None);
        assert_eq!(event.event_name(), "tray-icon");
    }

    #[test]
    fn test_foreign_copy_data_ignored() {
        assert!(ControllerEvent::from_copy_data(0x42, &tray_payload()).is_none());
        assert!(ControllerEvent::from_copy_data(SH_TRAY_DATA, b"not a tray block").is_none());
    }

    #[test]
    fn test_event_serialization() {
        let event = ControllerEvent::LanguageChanged {
            wparam: 5,
            lparam: 7,
        };
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "LanguageChanged");
        assert_eq!(json["data"]["wparam"], 5);
        assert_eq!(json["data"]["lparam"], 7);
    }
}
