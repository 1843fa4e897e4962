//! Virtual key codes and key events.
//!
//! Numbering follows the window server's virtual keycode table, which is
//! layout-independent hardware position, not the typed character. The
//! [`KeyCode::label_char`] mapping is what ties a key press back to a label
//! character during an active session.

use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Down,
    Up,
}

/// One intercepted keyboard event. Carries the raw code so that keys
/// outside [`KeyCode`] still participate in chord tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: u16,
    pub kind: KeyEventKind,
}

impl KeyEvent {
    pub fn down(key: KeyCode) -> KeyEvent { KeyEvent { code: key.code(), kind: KeyEventKind::Down } }

    pub fn up(key: KeyCode) -> KeyEvent { KeyEvent { code: key.code(), kind: KeyEventKind::Up } }

    pub fn raw(code: u16, kind: KeyEventKind) -> KeyEvent { KeyEvent { code, kind } }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, Display, EnumIter, EnumString,
)]
#[repr(u16)]
#[strum(ascii_case_insensitive)]
pub enum KeyCode {
    A = 0x00,
    S = 0x01,
    D = 0x02,
    F = 0x03,
    H = 0x04,
    G = 0x05,
    Z = 0x06,
    X = 0x07,
    C = 0x08,
    V = 0x09,
    B = 0x0B,
    Q = 0x0C,
    W = 0x0D,
    E = 0x0E,
    R = 0x0F,
    Y = 0x10,
    T = 0x11,
    #[strum(serialize = "1")]
    Num1 = 0x12,
    #[strum(serialize = "2")]
    Num2 = 0x13,
    #[strum(serialize = "3")]
    Num3 = 0x14,
    #[strum(serialize = "4")]
    Num4 = 0x15,
    #[strum(serialize = "6")]
    Num6 = 0x16,
    #[strum(serialize = "5")]
    Num5 = 0x17,
    Equal = 0x18,
    #[strum(serialize = "9")]
    Num9 = 0x19,
    #[strum(serialize = "7")]
    Num7 = 0x1A,
    Minus = 0x1B,
    #[strum(serialize = "8")]
    Num8 = 0x1C,
    #[strum(serialize = "0")]
    Num0 = 0x1D,
    RightBracket = 0x1E,
    O = 0x1F,
    U = 0x20,
    LeftBracket = 0x21,
    I = 0x22,
    P = 0x23,
    Return = 0x24,
    L = 0x25,
    J = 0x26,
    Quote = 0x27,
    K = 0x28,
    Semicolon = 0x29,
    Backslash = 0x2A,
    Comma = 0x2B,
    Slash = 0x2C,
    N = 0x2D,
    M = 0x2E,
    Period = 0x2F,
    Tab = 0x30,
    Space = 0x31,
    Grave = 0x32,
    Delete = 0x33,
    Escape = 0x35,
    RightCommand = 0x36,
    #[strum(to_string = "command", serialize = "cmd")]
    Command = 0x37,
    Shift = 0x38,
    CapsLock = 0x39,
    #[strum(to_string = "option", serialize = "alt")]
    Option = 0x3A,
    #[strum(to_string = "control", serialize = "ctrl")]
    Control = 0x3B,
    RightShift = 0x3C,
    RightOption = 0x3D,
    RightControl = 0x3E,
    Function = 0x3F,
    F17 = 0x40,
    F18 = 0x4F,
    F19 = 0x50,
    F5 = 0x60,
    F6 = 0x61,
    F7 = 0x62,
    F3 = 0x63,
    F8 = 0x64,
    F9 = 0x65,
    F11 = 0x67,
    F13 = 0x69,
    F16 = 0x6A,
    F14 = 0x6B,
    F10 = 0x6D,
    F12 = 0x6F,
    F15 = 0x71,
    Help = 0x72,
    Home = 0x73,
    PageUp = 0x74,
    ForwardDelete = 0x75,
    F4 = 0x76,
    End = 0x77,
    F2 = 0x78,
    PageDown = 0x79,
    F1 = 0x7A,
    Left = 0x7B,
    Right = 0x7C,
    Down = 0x7D,
    Up = 0x7E,
}

impl KeyCode {
    pub fn code(self) -> u16 { self as u16 }

    /// The uppercase character this key contributes to a typed label, if
    /// any. Modifier, function and navigation keys contribute none.
    pub fn label_char(self) -> Option<char> {
        use KeyCode::*;
        let ch = match self {
            A => 'A',
            B => 'B',
            C => 'C',
            D => 'D',
            E => 'E',
            F => 'F',
            G => 'G',
            H => 'H',
            I => 'I',
            J => 'J',
            K => 'K',
            L => 'L',
            M => 'M',
            N => 'N',
            O => 'O',
            P => 'P',
            Q => 'Q',
            R => 'R',
            S => 'S',
            T => 'T',
            U => 'U',
            V => 'V',
            W => 'W',
            X => 'X',
            Y => 'Y',
            Z => 'Z',
            Num0 => '0',
            Num1 => '1',
            Num2 => '2',
            Num3 => '3',
            Num4 => '4',
            Num5 => '5',
            Num6 => '6',
            Num7 => '7',
            Num8 => '8',
            Num9 => '9',
            _ => return None,
        };
        Some(ch)
    }

    /// Inverse of [`label_char`](Self::label_char) for validating configured
    /// alphabets.
    pub fn for_label_char(needle: char) -> Option<KeyCode> {
        use strum::IntoEnumIterator;
        KeyCode::iter().find(|key| key.label_char() == Some(needle))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn raw_codes_round_trip() {
        assert_eq!(KeyCode::try_from(0x06u16).ok(), Some(KeyCode::Z));
        assert_eq!(KeyCode::Z.code(), 0x06);
        assert!(KeyCode::try_from(0x0Au16).is_err());
    }

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!(KeyCode::from_str("space"), Ok(KeyCode::Space));
        assert_eq!(KeyCode::from_str("Control"), Ok(KeyCode::Control));
        assert_eq!(KeyCode::from_str("ctrl"), Ok(KeyCode::Control));
        assert_eq!(KeyCode::from_str("alt"), Ok(KeyCode::Option));
        assert_eq!(KeyCode::from_str("7"), Ok(KeyCode::Num7));
        assert!(KeyCode::from_str("hyperspace").is_err());
    }

    #[test]
    fn label_chars_cover_letters_and_digits() {
        assert_eq!(KeyCode::A.label_char(), Some('A'));
        assert_eq!(KeyCode::Num0.label_char(), Some('0'));
        assert_eq!(KeyCode::Escape.label_char(), None);
        assert_eq!(KeyCode::Shift.label_char(), None);
    }

    #[test]
    fn every_label_char_maps_to_exactly_one_key() {
        use strum::IntoEnumIterator;
        for key in KeyCode::iter() {
            if let Some(ch) = key.label_char() {
                assert_eq!(KeyCode::for_label_char(ch), Some(key));
            }
        }
        assert_eq!(KeyCode::for_label_char('!'), None);
    }
}
