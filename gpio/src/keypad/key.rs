use std::fmt::{Display, Formatter};

/// Represents the keys on a 4x4 keypad.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum KeypadKey {
    /// The `1` key.
    Key1,
    /// The `2` key.
    Key2,
    /// The `3` key.
    Key3,
    /// The `4` key.
    Key4,
    /// The `5` key.
    Key5,
    /// The `6` key.
    Key6,
    /// The `7` key.
    Key7,
    /// The `8` key.
    Key8,
    /// The `9` key.
    Key9,
    /// The `0` key.
    Key0,
    /// The `*` key.
    KeyAsterisk,
    /// The `#` key.
    KeyHash,
    /// The `A` key.
    KeyA,
    /// The `B` key.
    KeyB,
    /// The `C` key.
    KeyC,
    /// The `D` key.
    KeyD,
}

impl KeypadKey {
    /// Converts the [KeypadKey] to its corresponding character.
    pub fn to_char(self) -> char {
        use KeypadKey::*;

        match self {
            Key1 => '1',
            Key2 => '2',
            Key3 => '3',
            Key4 => '4',
            Key5 => '5',
            Key6 => '6',
            Key7 => '7',
            Key8 => '8',
            Key9 => '9',
            Key0 => '0',
            KeyAsterisk => '*',
            KeyHash => '#',
            KeyA => 'A',
            KeyB => 'B',
            KeyC => 'C',
            KeyD => 'D',
        }
    }

    /// Parses a key from its printed character. Letters are accepted in either case.
    pub fn from_char(c: char) -> Option<KeypadKey> {
        use KeypadKey::*;

        let key = match c.to_ascii_uppercase() {
            '1' => Key1,
            '2' => Key2,
            '3' => Key3,
            '4' => Key4,
            '5' => Key5,
            '6' => Key6,
            '7' => Key7,
            '8' => Key8,
            '9' => Key9,
            '0' => Key0,
            '*' => KeyAsterisk,
            '#' => KeyHash,
            'A' => KeyA,
            'B' => KeyB,
            'C' => KeyC,
            'D' => KeyD,
            _ => return None,
        };
        Some(key)
    }
}

impl Display for KeypadKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// Physical arrangement of the symbols on a 4x4 membrane keypad, as seen
/// from the (row, column) order the lines are wired in.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum KeypadLayout {
    /// `1 2 3 A` on the first row, columns wired left to right.
    Standard,
    /// Columns wired right to left, so the first row reads `A 3 2 1`.
    #[default]
    Mirrored,
}

impl KeypadLayout {
    /// Gets the (row, column) to key table for this layout.
    pub fn keymap(self) -> [[KeypadKey; 4]; 4] {
        use KeypadKey::*;

        const STANDARD: [[KeypadKey; 4]; 4] = [
            [ Key1, Key2, Key3, KeyA, ],
            [ Key4, Key5, Key6, KeyB, ],
            [ Key7, Key8, Key9, KeyC, ],
            [ KeyAsterisk, Key0, KeyHash, KeyD, ],
        ];

        match self {
            KeypadLayout::Standard => STANDARD,
            KeypadLayout::Mirrored => STANDARD.map(|mut row| {
                row.reverse();
                row
            }),
        }
    }

    /// Finds where `key` sits in this layout.
    pub fn position(self, key: KeypadKey) -> Option<(usize, usize)> {
        self.keymap().iter().enumerate().find_map(|(row, keys)| {
            keys.iter().position(|&k| k == key).map(|col| (row, col))
        })
    }
}
