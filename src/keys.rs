//! Virtual-key names and modifier tracking helpers.

pub const VK_SHIFT: u32 = 0x10;
pub const VK_CONTROL: u32 = 0x11;
pub const VK_MENU: u32 = 0x12;
pub const VK_LSHIFT: u32 = 0xA0;
pub const VK_RSHIFT: u32 = 0xA1;
pub const VK_LCONTROL: u32 = 0xA2;
pub const VK_RCONTROL: u32 = 0xA3;
pub const VK_LMENU: u32 = 0xA4;
pub const VK_RMENU: u32 = 0xA5;
pub const VK_LWIN: u32 = 0x5B;
pub const VK_RWIN: u32 = 0x5C;

/// Resolve a key name such as `"Alt"`, `"RightCtrl"` or `"F13"` to its
/// virtual-key code.
pub fn virtual_key_from_string(key: &str) -> Option<u32> {
    let upper = key.trim().to_uppercase();

    if let Some(n) = upper.strip_prefix('F').and_then(|n| n.parse::<u32>().ok()) {
        return (1..=24).contains(&n).then(|| 0x70 + n - 1);
    }
    if upper.len() == 1 {
        let c = upper.as_bytes()[0];
        if c.is_ascii_uppercase() || c.is_ascii_digit() {
            return Some(c as u32);
        }
    }

    match upper.as_str() {
        "ALT" | "MENU" => Some(VK_MENU),
        "CTRL" | "CONTROL" => Some(VK_CONTROL),
        "SHIFT" => Some(VK_SHIFT),
        "WIN" | "LEFTWIN" | "LWIN" => Some(VK_LWIN),
        "RIGHTWIN" | "RWIN" => Some(VK_RWIN),
        "LEFTALT" | "LALT" => Some(VK_LMENU),
        "RIGHTALT" | "RALT" | "ALTGR" => Some(VK_RMENU),
        "LEFTCTRL" | "LCTRL" => Some(VK_LCONTROL),
        "RIGHTCTRL" | "RCTRL" => Some(VK_RCONTROL),
        "LEFTSHIFT" | "LSHIFT" => Some(VK_LSHIFT),
        "RIGHTSHIFT" | "RSHIFT" => Some(VK_RSHIFT),
        "CAPSLOCK" => Some(0x14),
        "SCROLLLOCK" => Some(0x91),
        "PAUSE" => Some(0x13),
        "APPS" | "MENUKEY" => Some(0x5D),
        "SPACE" => Some(0x20),
        "TAB" => Some(0x09),
        "ESCAPE" => Some(0x1B),
        "INSERT" => Some(0x2D),
        _ => None,
    }
}

/// Every virtual key that counts as "the modifier" for the configured key.
///
/// Low-level keyboard hooks report the sided codes (`VK_LMENU`, `VK_RMENU`)
/// while users configure the generic one, so the generic keys expand to both
/// sides.
pub fn modifier_variants(modifier: u32) -> &'static [u32] {
    match modifier {
        VK_MENU => &[VK_LMENU, VK_RMENU],
        VK_CONTROL => &[VK_LCONTROL, VK_RCONTROL],
        VK_SHIFT => &[VK_LSHIFT, VK_RSHIFT],
        _ => &[],
    }
}

pub fn is_modifier_key(modifier: u32, vk: u32) -> bool {
    vk == modifier || modifier_variants(modifier).contains(&vk)
}

/// Modifier state after a key event, or `None` if the event is for some other
/// key.
///
/// `is_pressed` is a point-in-time query of the physical key state. It is only
/// consulted for the keys *other* than the one in the event, because the state
/// of the event's own key has not been updated yet while the hook runs.
pub fn modifier_state_after<F>(modifier: u32, vk: u32, key_down: bool, is_pressed: F) -> Option<bool>
where
    F: Fn(u32) -> bool,
{
    if !is_modifier_key(modifier, vk) {
        return None;
    }
    if key_down {
        return Some(true);
    }
    let other_side_down = modifier_variants(modifier)
        .iter()
        .filter(|&&variant| variant != vk)
        .any(|&variant| is_pressed(variant));
    Some(other_side_down)
}
