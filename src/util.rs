use crate::display::{Frame, Screen};
use anyhow::anyhow;
use embedded_hal::digital::{ErrorType, InputPin};
use log::trace;
use std::{cell::Cell, convert::Infallible, fmt::Debug, rc::Rc};

/// Driver error types (display-interface, u8g2-fonts, GPIO) don't implement
/// Error so we have to map manually
pub fn map_error<E: Debug>(error: E) -> anyhow::Error {
    anyhow!("{error:?}")
}

/// An input pin whose level is set from code. Clones share the same level,
/// so a test can keep one handle and give the other to a [Button].
///
/// [Button]: crate::button::Button
#[derive(Clone, Debug, Default)]
pub struct MockPin(Rc<Cell<bool>>);

impl MockPin {
    pub fn set_high(&self, high: bool) {
        self.0.set(high);
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.get())
    }
}

/// A [Screen] that remembers what it was asked to show instead of drawing it
#[derive(Debug, Default)]
pub struct MockScreen {
    pub clears: usize,
    pub frames: Vec<Frame>,
}

impl MockScreen {
    /// The most recently committed frame
    pub fn last(&self) -> Option<&Frame> {
        self.frames.last()
    }
}

impl Screen for MockScreen {
    fn clear(&mut self) -> anyhow::Result<()> {
        trace!("Mock screen cleared");
        self.clears += 1;
        Ok(())
    }

    fn commit(&mut self, frame: &Frame) -> anyhow::Result<()> {
        trace!("Mock screen showing {:?}", frame.texts().collect::<Vec<_>>());
        self.frames.push(frame.clone());
        Ok(())
    }
}

#[cfg(test)]
pub use self::testing::*;
