//! `Shell_NotifyIcon` payloads as they travel to the tray window.
//!
//! The shell copies a `SHELLTRAYDATA` block with `WM_COPYDATA`:
//!
//! ```text
//! offset  size  field
//!      0     4  dwHz        (magic, 0x34753423)
//!      4     4  dwMessage   (NIM_*)
//!      8   ...  NOTIFYICONDATAW with 32-bit handles
//!                 +0  cbSize   +4  hWnd   +8  uID   +12 uFlags
//!                 +16 uCallbackMessage    +20 hIcon +24 szTip[128]
//! ```
//!
//! The icon data always uses 32-bit handle fields, even from 64-bit callers.

use serde::Serialize;

use crate::config::{SHELL_TRAY_MAGIC, SH_TRAY_DATA};

pub const NIF_MESSAGE: u32 = 0x1;
pub const NIF_ICON: u32 = 0x2;
pub const NIF_TIP: u32 = 0x4;

const ICON_DATA_OFFSET: usize = 8;
const TIP_OFFSET: usize = ICON_DATA_OFFSET + 24;
const TIP_CHARS: usize = 128;
const HEADER_LEN: usize = TIP_OFFSET;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TrayAction {
    Add,
    Modify,
    Delete,
    SetFocus,
    SetVersion,
    Unknown(u32),
}

impl From<u32> for TrayAction {
    fn from(value: u32) -> Self {
        match value {
            0 => Self::Add,
            1 => Self::Modify,
            2 => Self::Delete,
            3 => Self::SetFocus,
            4 => Self::SetVersion,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrayNotification {
    pub action: TrayAction,
    /// Owner window of the icon, as a 32-bit handle value.
    pub window: u32,
    pub id: u32,
    pub flags: u32,
    pub callback_message: u32,
    pub icon: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip: Option<String>,
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// Does a `WM_COPYDATA` block carry tray icon data?
pub fn is_tray_payload(tag: usize, payload: &[u8]) -> bool {
    tag == SH_TRAY_DATA && read_u32(payload, 0) == Some(SHELL_TRAY_MAGIC)
}

impl TrayNotification {
    pub fn parse(tag: usize, payload: &[u8]) -> Option<Self> {
        if !is_tray_payload(tag, payload) || payload.len() < HEADER_LEN {
            return None;
        }

        let field = |n: usize| read_u32(payload, ICON_DATA_OFFSET + 4 * n);
        let flags = field(3)?;
        let tip = if flags & NIF_TIP != 0 {
            read_tip(payload)
        } else {
            None
        };

        Some(Self {
            action: TrayAction::from(read_u32(payload, 4)?),
            window: field(1)?,
            id: field(2)?,
            flags,
            callback_message: field(4)?,
            icon: field(5)?,
            tip,
        })
    }
}

fn read_tip(payload: &[u8]) -> Option<String> {
    let end = (TIP_OFFSET + TIP_CHARS * 2).min(payload.len());
    let units: Vec<u16> = payload
        .get(TIP_OFFSET..end)?
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();
    Some(String::from_utf16_lossy(&units))
}

// ============================================================================
// Tests
// ============================================================================
