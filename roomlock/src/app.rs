//! The main loop state: drains the key queue, runs the passcode session and drives the feedback LED.

use log::{debug, info, trace, warn};
use time::OffsetDateTime;
use roomlock_gpio::debounce::KeyGate;
use roomlock_gpio::GpioResult;
use roomlock_gpio::keypad::KeypadKey;
use roomlock_gpio::queue::{Consumer, Producer, RingBuffer};
use roomlock_gpio::tick::Clock;
use roomlock_gpio::timed::TimedOutput;
use crate::config::{Config, ConfigError};
use crate::session::{PasscodeSession, Verdict};

/// Number of keystrokes that can wait between the scanner and the main loop.
pub const KEY_QUEUE_CAPACITY: usize = 16;

pub type KeyQueue = RingBuffer<KeypadKey, KEY_QUEUE_CAPACITY>;
pub type KeyProducer<'q> = Producer<'q, KeypadKey, KEY_QUEUE_CAPACITY>;
pub type KeyConsumer<'q> = Consumer<'q, KeypadKey, KEY_QUEUE_CAPACITY>;

/// What happened to a key taken from the queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum KeyOutcome {
    /// Came too soon after the previous key and was ignored.
    Debounced,
    /// Added to the attempt, which now holds `entered` keys.
    Accepted { entered: usize },
    Granted,
    Denied,
}

pub struct App<'a, 'q> {
    config: Config,
    session: PasscodeSession,
    gate: KeyGate,
    /// The LED, with its pending switch-off deadline.
    feedback: TimedOutput<'a>,
    keys: KeyConsumer<'q>,
    clock: &'a dyn Clock,
    last_granted: Option<OffsetDateTime>,
}

impl<'a, 'q> App<'a, 'q> {
    pub fn new(
        config: Config,
        feedback: TimedOutput<'a>,
        keys: KeyConsumer<'q>,
        clock: &'a dyn Clock,
    ) -> Result<App<'a, 'q>, ConfigError> {
        let session = PasscodeSession::new(config.secret()?)?;
        let gate = KeyGate::new(config.debounce());
        Ok(App {
            config,
            session,
            gate,
            feedback,
            keys,
            clock,
            last_granted: None,
        })
    }

    /// Puts the LED in a known state and greets the user.
    pub fn start(&mut self) -> GpioResult<()> {
        self.feedback.led().init()?;
        info!("Keypad lock ready.");
        self.prompt();
        Ok(())
    }

    /// Runs one main loop iteration: handles at most one queued key, then lets the
    /// feedback deadline expire.
    pub fn update(&mut self) -> GpioResult<Option<KeyOutcome>> {
        let outcome = match self.keys.read() {
            Some(key) => Some(self.process_key(key)?),
            None => None,
        };

        if self.feedback.poll()? {
            trace!("Feedback LED off.");
        }

        Ok(outcome)
    }

    pub fn process_key(&mut self, key: KeypadKey) -> GpioResult<KeyOutcome> {
        if !self.gate.accept(self.clock.now_ms()) {
            debug!("Ignoring {} (bounce).", key);
            return Ok(KeyOutcome::Debounced);
        }

        self.feedback.request(self.config.keypress_feedback())?;
        info!("Key pressed: {}", key);

        match self.session.push(key) {
            None => {
                debug!("Session {:?}.", self.session.state());
                Ok(KeyOutcome::Accepted { entered: self.session.cursor() })
            }
            Some(Verdict::Granted) => {
                self.feedback.request(self.config.granted_feedback())?;
                let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
                match self.last_granted.replace(now) {
                    Some(previous) => info!("Access granted ({}, previously {}).", now, previous),
                    None => info!("Access granted ({}).", now),
                }
                self.prompt();
                Ok(KeyOutcome::Granted)
            }
            Some(Verdict::Denied) => {
                self.feedback.force_off()?;
                warn!("Access denied.");
                self.prompt();
                Ok(KeyOutcome::Denied)
            }
        }
    }

    fn prompt(&self) {
        info!("Enter the {}-symbol passcode:", self.session.passcode_len());
    }

    #[cfg(test)]
    pub fn session(&self) -> &PasscodeSession {
        &self.session
    }

    #[cfg(test)]
    pub fn feedback(&self) -> &TimedOutput<'a> {
        &self.feedback
    }

    /// Gets the time access was last granted, if ever.
    #[cfg(test)]
    pub fn last_granted(&self) -> Option<OffsetDateTime> {
        self.last_granted
    }
}
