use crate::util::map_error;
use embedded_hal::digital::InputPin;
use log::trace;

/// An active-HIGH momentary button that reports each press exactly once.
///
/// There is no time-based debouncing: the first HIGH sample after a LOW one
/// counts as the press, and the button stays latched until a LOW sample is
/// seen. Poll this every loop iteration, otherwise a short press can fall
/// entirely between two samples.
pub struct Button<P> {
    name: &'static str,
    pin: P,
    latch: EdgeLatch,
}

impl<P: InputPin> Button<P> {
    pub fn new(name: &'static str, pin: P) -> Self {
        Self {
            name,
            pin,
            latch: EdgeLatch::default(),
        }
    }

    /// Sample the pin. Return true if this sample is the rising edge of a new
    /// press.
    pub fn poll_pressed(&mut self) -> anyhow::Result<bool> {
        self.poll_armed(true)
    }

    /// Sample the pin, but only accept a press while `armed`. A LOW sample
    /// always releases the latch, so a button that is pressed and released
    /// while disarmed is never reported. One held down while disarmed is
    /// reported on the first armed sample.
    pub fn poll_armed(&mut self, armed: bool) -> anyhow::Result<bool> {
        let level = self.pin.is_high().map_err(map_error)?;
        let pressed = self.latch.update(level, armed);
        if pressed {
            trace!("Button {} pressed", self.name);
        }
        Ok(pressed)
    }
}

/// Rising-edge detector over a stream of level samples. `held` is true iff
/// the last sample was HIGH and the press has already been reported.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct EdgeLatch {
    held: bool,
}

impl EdgeLatch {
    /// Feed one sample. Return true if it's a press that hasn't been reported
    /// yet and `armed` allows reporting it now.
    pub fn update(&mut self, level: bool, armed: bool) -> bool {
        if !level {
            self.held = false;
            false
        } else if !self.held && armed {
            self.held = true;
            true
        } else {
            false
        }
    }
}
