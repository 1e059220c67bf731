//! Keysyms and modifier masks.
//!
//! The backend translates keycodes; the core only compares symbols. Only the names
//! bindings actually use are known here.

use std::fmt;

use bitflags::bitflags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Keysym(pub u32);

impl Keysym {
    pub const NONE: Keysym = Keysym(0);
    pub const SPACE: Keysym = Keysym(0x0020);
    pub const BACKSPACE: Keysym = Keysym(0xff08);
    pub const TAB: Keysym = Keysym(0xff09);
    pub const RETURN: Keysym = Keysym(0xff0d);
    pub const ESCAPE: Keysym = Keysym(0xff1b);
    pub const HOME: Keysym = Keysym(0xff50);
    pub const LEFT: Keysym = Keysym(0xff51);
    pub const UP: Keysym = Keysym(0xff52);
    pub const RIGHT: Keysym = Keysym(0xff53);
    pub const DOWN: Keysym = Keysym(0xff54);
    pub const END: Keysym = Keysym(0xff57);
    pub const PRINT: Keysym = Keysym(0xff61);
    pub const DELETE: Keysym = Keysym(0xffff);
    pub const F1: Keysym = Keysym(0xffbe);
    /// `XF86Switch_VT_1`; VT n is `SWITCH_VT_1 + n - 1` for n in 1..=12.
    pub const SWITCH_VT_1: Keysym = Keysym(0x1008_fe01);

    /// Target VT of an `XF86Switch_VT_n` keysym.
    pub fn switch_vt(self) -> Option<u32> {
        let base = Self::SWITCH_VT_1.0;
        (base..base + 12).contains(&self.0).then(|| self.0 - base + 1)
    }

    /// Lowercase letters map to their Latin-1 codes; uppercase letters do too, so
    /// `"a"` and `"A"` name the same unshifted key.
    pub fn from_name(name: &str) -> Option<Keysym> {
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_alphabetic() {
                return Some(Keysym(u32::from(c.to_ascii_lowercase())));
            }
            if c.is_ascii_graphic() {
                return Some(Keysym(u32::from(c)));
            }
        }

        if let Some(n) = name.strip_prefix('F').and_then(|n| n.parse::<u32>().ok()) {
            if (1..=12).contains(&n) {
                return Some(Keysym(Self::F1.0 + n - 1));
            }
        }
        if let Some(n) = name
            .strip_prefix("XF86Switch_VT_")
            .and_then(|n| n.parse::<u32>().ok())
        {
            if (1..=12).contains(&n) {
                return Some(Keysym(Self::SWITCH_VT_1.0 + n - 1));
            }
        }

        let sym = match name.to_ascii_lowercase().as_str() {
            "space" => Self::SPACE,
            "backspace" => Self::BACKSPACE,
            "tab" => Self::TAB,
            "return" | "enter" => Self::RETURN,
            "escape" | "esc" => Self::ESCAPE,
            "home" => Self::HOME,
            "left" => Self::LEFT,
            "up" => Self::UP,
            "right" => Self::RIGHT,
            "down" => Self::DOWN,
            "end" => Self::END,
            "print" => Self::PRINT,
            "delete" => Self::DELETE,
            _ => return None,
        };
        Some(sym)
    }
}

impl fmt::Display for Keysym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match char::from_u32(self.0) {
            Some(c) if c.is_ascii_graphic() => write!(f, "{c}"),
            _ => write!(f, "0x{:x}", self.0),
        }
    }
}

bitflags! {
    /// Modifier mask, using the X11 bit assignment.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 1;
        const CAPS_LOCK = 1 << 1;
        const CTRL = 1 << 2;
        const ALT = 1 << 3;
        const NUM_LOCK = 1 << 4;
        const MOD3 = 1 << 5;
        const LOGO = 1 << 6;
        const MOD5 = 1 << 7;
    }
}

impl Modifiers {
    /// Mask used for binding comparison: lock modifiers never affect a match.
    pub fn stripped(self) -> Self {
        self - (Modifiers::CAPS_LOCK | Modifiers::NUM_LOCK)
    }

    /// Parses one modifier name, accepting the X11 aliases (`mod1`, `mod4`, ...).
    pub fn parse_name(name: &str) -> Option<Self> {
        let m = match name.to_ascii_lowercase().as_str() {
            "shift" => Modifiers::SHIFT,
            "lock" | "caps" => Modifiers::CAPS_LOCK,
            "control" | "ctrl" => Modifiers::CTRL,
            "alt" | "mod1" => Modifiers::ALT,
            "mod2" | "numlock" => Modifiers::NUM_LOCK,
            "mod3" => Modifiers::MOD3,
            "super" | "logo" | "mod4" => Modifiers::LOGO,
            "mod5" => Modifiers::MOD5,
            _ => return None,
        };
        Some(m)
    }

    /// Parses a list of names; the first unknown name is returned as the error.
    pub fn parse_names<S: AsRef<str>>(names: &[S]) -> Result<Self, String> {
        names.iter().try_fold(Modifiers::empty(), |acc, name| {
            Modifiers::parse_name(name.as_ref())
                .map(|m| acc | m)
                .ok_or_else(|| name.as_ref().to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_names_ignore_case() {
        assert_eq!(Keysym::from_name("a"), Some(Keysym(0x61)));
        assert_eq!(Keysym::from_name("A"), Some(Keysym(0x61)));
        assert_eq!(Keysym::from_name("1"), Some(Keysym(0x31)));
        assert_eq!(Keysym::from_name("Return"), Some(Keysym::RETURN));
        assert_eq!(Keysym::from_name("F12"), Some(Keysym(0xffc9)));
        assert_eq!(Keysym::from_name("Hyper"), None);
    }

    #[test]
    fn test_switch_vt_range() {
        let vt3 = Keysym::from_name("XF86Switch_VT_3").unwrap();
        assert_eq!(vt3.switch_vt(), Some(3));
        assert_eq!(Keysym::RETURN.switch_vt(), None);
        assert_eq!(Keysym(Keysym::SWITCH_VT_1.0 + 12).switch_vt(), None);
    }

    #[test]
    fn test_stripped_drops_lock_modifiers() {
        let mods = Modifiers::LOGO | Modifiers::NUM_LOCK | Modifiers::CAPS_LOCK;
        assert_eq!(mods.stripped(), Modifiers::LOGO);
    }

    #[test]
    fn test_modifier_names() {
        assert_eq!(
            Modifiers::parse_names(&["Super", "shift"][..]),
            Ok(Modifiers::LOGO | Modifiers::SHIFT)
        );
        assert_eq!(Modifiers::parse_names(&["meta"][..]), Err("meta".to_string()));
    }

    #[test]
    fn test_parse_name_accepts_x11_aliases() {
        assert_eq!(Modifiers::parse_name("Mod4"), Some(Modifiers::LOGO));
        assert_eq!(Modifiers::parse_name("ctrl"), Some(Modifiers::CTRL));
        // The generated flag-name lookup stays available alongside.
        assert_eq!(Modifiers::from_name("LOGO"), Some(Modifiers::LOGO));
        assert_eq!(Modifiers::from_name("mod4"), None);
    }
}
