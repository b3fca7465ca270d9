use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::settings::ConfigError;

// Raw mouse message codes as delivered by the Win32 hooks. Kept as plain
// numbers so the decoding logic is identical on every target.
pub const WM_MOUSEMOVE: u32 = 0x0200;
pub const WM_LBUTTONDOWN: u32 = 0x0201;
pub const WM_LBUTTONUP: u32 = 0x0202;
pub const WM_RBUTTONDOWN: u32 = 0x0204;
pub const WM_RBUTTONUP: u32 = 0x0205;
pub const WM_MBUTTONDOWN: u32 = 0x0207;
pub const WM_MBUTTONUP: u32 = 0x0208;
pub const WM_MOUSEWHEEL: u32 = 0x020A;
pub const WM_MOUSEHWHEEL: u32 = 0x020E;
pub const WM_NCMOUSEMOVE: u32 = 0x00A0;
pub const WM_NCLBUTTONDOWN: u32 = 0x00A1;
pub const WM_NCLBUTTONUP: u32 = 0x00A2;
pub const WM_NCRBUTTONDOWN: u32 = 0x00A4;
pub const WM_NCRBUTTONUP: u32 = 0x00A5;
pub const WM_NCMBUTTONDOWN: u32 = 0x00A7;
pub const WM_NCMBUTTONUP: u32 = 0x00A8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    /// Compact encoding used by the atomics in [`SharedState`](super::SharedState).
    /// `0` is reserved for "no button".
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            MouseButton::Left => 1,
            MouseButton::Middle => 2,
            MouseButton::Right => 3,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(MouseButton::Left),
            2 => Some(MouseButton::Middle),
            3 => Some(MouseButton::Right),
            _ => None,
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MouseButton::Left => write!(f, "left"),
            MouseButton::Middle => write!(f, "middle"),
            MouseButton::Right => write!(f, "right"),
        }
    }
}

impl FromStr for MouseButton {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "lmb" => Ok(MouseButton::Left),
            "middle" | "mmb" => Ok(MouseButton::Middle),
            "right" | "rmb" => Ok(MouseButton::Right),
            _ => Err(ConfigError::UnknownButton(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset_from(self, origin: Point) -> (i32, i32) {
        (self.x - origin.x, self.y - origin.y)
    }
}

/// Opaque top-level window identifier.
///
/// Holds the raw handle value rather than a pointer so it can live inside
/// [`SharedState`](super::SharedState) atomics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WindowId(pub isize);

impl WindowId {
    pub const NONE: WindowId = WindowId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// A mouse message exactly as the hook saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMouseMessage {
    pub code: u32,
    pub point: Point,
    pub mouse_data: u32,
}

impl RawMouseMessage {
    pub fn new(code: u32, point: Point) -> Self {
        Self {
            code,
            point,
            mouse_data: 0,
        }
    }

    pub fn with_mouse_data(mut self, mouse_data: u32) -> Self {
        self.mouse_data = mouse_data;
        self
    }

    pub fn kind(&self) -> Option<RawMouseKind> {
        RawMouseKind::from_code(self.code)
    }

    /// Signed wheel delta stored in the high word of the mouse data.
    pub fn wheel_delta(&self) -> i16 {
        ((self.mouse_data >> 16) & 0xFFFF) as u16 as i16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawMouseKind {
    ButtonDown(MouseButton),
    ButtonUp(MouseButton),
    Move,
    Wheel(WheelAxis),
}

impl RawMouseKind {
    pub fn from_code(code: u32) -> Option<Self> {
        let kind = match code {
            WM_LBUTTONDOWN | WM_NCLBUTTONDOWN => RawMouseKind::ButtonDown(MouseButton::Left),
            WM_MBUTTONDOWN | WM_NCMBUTTONDOWN => RawMouseKind::ButtonDown(MouseButton::Middle),
            WM_RBUTTONDOWN | WM_NCRBUTTONDOWN => RawMouseKind::ButtonDown(MouseButton::Right),
            WM_LBUTTONUP | WM_NCLBUTTONUP => RawMouseKind::ButtonUp(MouseButton::Left),
            WM_MBUTTONUP | WM_NCMBUTTONUP => RawMouseKind::ButtonUp(MouseButton::Middle),
            WM_RBUTTONUP | WM_NCRBUTTONUP => RawMouseKind::ButtonUp(MouseButton::Right),
            WM_MOUSEMOVE | WM_NCMOUSEMOVE => RawMouseKind::Move,
            WM_MOUSEWHEEL => RawMouseKind::Wheel(WheelAxis::Vertical),
            WM_MOUSEHWHEEL => RawMouseKind::Wheel(WheelAxis::Horizontal),
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelAxis {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseDown {
    pub button: MouseButton,
    pub point: Point,
    pub window: WindowId,
    /// Whether the interceptor swallowed this press. Only such presses may
    /// open a drag session.
    pub intercepted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseUp {
    pub button: MouseButton,
    pub point: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseMove {
    pub point: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseWheel {
    pub delta: i16,
    pub axis: WheelAxis,
    pub point: Point,
    pub window: WindowId,
}

/// A mouse event with the platform bit layout already stripped away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEvent {
    Down(MouseDown),
    Up(MouseUp),
    Move(MouseMove),
    Wheel(MouseWheel),
}

impl MouseEvent {
    pub fn point(&self) -> Point {
        match self {
            MouseEvent::Down(ev) => ev.point,
            MouseEvent::Up(ev) => ev.point,
            MouseEvent::Move(ev) => ev.point,
            MouseEvent::Wheel(ev) => ev.point,
        }
    }
}
