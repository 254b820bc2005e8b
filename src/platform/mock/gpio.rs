//! Mock GPIO implementation for testing

use crate::platform::traits::GpioInterface;
use crate::platform::Result;

/// Mock GPIO output pin
///
/// Records the current level and how many times it changed.
#[derive(Debug, Default)]
pub struct MockGpio {
    high: bool,
    transitions: u32,
}

impl MockGpio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    pub fn transitions(&self) -> u32 {
        self.transitions
    }
}

impl GpioInterface for MockGpio {
    fn set_high(&mut self) -> Result<()> {
        if !self.high {
            self.transitions += 1;
        }
        self.high = true;
        Ok(())
    }

    fn set_low(&mut self) -> Result<()> {
        if self.high {
            self.transitions += 1;
        }
        self.high = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_gpio_counts_transitions() {
        let mut pin = MockGpio::new();
        pin.set_high().unwrap();
        pin.set_high().unwrap();
        pin.set_low().unwrap();
        assert!(!pin.is_high());
        assert_eq!(pin.transitions(), 2);
    }
}
