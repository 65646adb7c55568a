//! Passcode entry: collects keys until the passcode length is reached, then judges the attempt.

use roomlock_gpio::keypad::KeypadKey;
use crate::config::ConfigError;

/// The result of a complete attempt.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Verdict {
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SessionState {
    /// No key entered yet.
    Idle,
    /// Some keys entered, fewer than the passcode length.
    Accumulating(usize),
}

#[derive(Debug, Clone)]
pub struct PasscodeSession {
    secret: Vec<KeypadKey>,
    entered: Vec<KeypadKey>,
}

impl PasscodeSession {
    pub fn new(secret: Vec<KeypadKey>) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::EmptyPassword);
        }
        let entered = Vec::with_capacity(secret.len());
        Ok(PasscodeSession { secret, entered })
    }

    /// Appends a key. Once as many keys as the passcode has are entered, the attempt
    /// is compared key by key, the entry is cleared and the verdict returned.
    pub fn push(&mut self, key: KeypadKey) -> Option<Verdict> {
        self.entered.push(key);
        if self.entered.len() < self.secret.len() {
            return None;
        }

        let verdict = if self.entered == self.secret {
            Verdict::Granted
        } else {
            Verdict::Denied
        };
        self.reset();
        Some(verdict)
    }

    /// Gets the number of keys entered in the current attempt.
    pub fn cursor(&self) -> usize {
        self.entered.len()
    }

    pub fn passcode_len(&self) -> usize {
        self.secret.len()
    }

    pub fn state(&self) -> SessionState {
        match self.entered.len() {
            0 => SessionState::Idle,
            n => SessionState::Accumulating(n),
        }
    }

    /// Drops the keys entered so far.
    pub fn reset(&mut self) {
        self.entered.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(s: &str) -> Vec<KeypadKey> {
        s.chars().map(|c| KeypadKey::from_char(c).unwrap()).collect()
    }

    fn session(secret: &str) -> PasscodeSession {
        PasscodeSession::new(keys(secret)).unwrap()
    }

    #[test]
    fn grants_matching_attempt() {
        let mut session = session("123A");
        let mut verdicts = keys("123A").into_iter().map(|key| session.push(key));
        assert_eq!(verdicts.next(), Some(None));
        assert_eq!(verdicts.next(), Some(None));
        assert_eq!(verdicts.next(), Some(None));
        assert_eq!(verdicts.next(), Some(Some(Verdict::Granted)));
        drop(verdicts);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn denies_on_last_key_and_starts_over() {
        let mut session = session("123A");
        for key in keys("123") {
            assert_eq!(session.push(key), None);
        }
        assert_eq!(session.state(), SessionState::Accumulating(3));
        assert_eq!(session.push(KeypadKey::KeyB), Some(Verdict::Denied));
        assert_eq!(session.cursor(), 0);

        let verdicts: Vec<_> = keys("123A").into_iter().filter_map(|key| session.push(key)).collect();
        assert_eq!(verdicts, [Verdict::Granted]);
    }

    #[test]
    fn wrong_early_key_only_judged_at_full_length() {
        let mut session = session("123A");
        assert_eq!(session.push(KeypadKey::Key9), None);
        assert_eq!(session.push(KeypadKey::Key2), None);
        assert_eq!(session.push(KeypadKey::Key3), None);
        assert_eq!(session.push(KeypadKey::KeyA), Some(Verdict::Denied));
    }

    #[test]
    fn single_key_passcode() {
        let mut session = session("#");
        assert_eq!(session.push(KeypadKey::KeyHash), Some(Verdict::Granted));
        assert_eq!(session.push(KeypadKey::KeyAsterisk), Some(Verdict::Denied));
    }

    #[test]
    fn reset_discards_partial_entry() {
        let mut session = session("12");
        session.push(KeypadKey::Key1);
        session.reset();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.push(KeypadKey::Key1), None);
        assert_eq!(session.push(KeypadKey::Key2), Some(Verdict::Granted));
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(matches!(PasscodeSession::new(Vec::new()), Err(ConfigError::EmptyPassword)));
    }
}
