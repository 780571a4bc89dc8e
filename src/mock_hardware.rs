use weatherbox::{
    config::Config,
    util::{MockPin, MockScreen},
};

/// Mock hardware, to allow compiling/running on machines without the Pi's
/// header. The buttons are never pressed.
pub struct Hardware {
    pub screen: MockScreen,
    pub settings_pin: MockPin,
    pub set_pin: MockPin,
}

impl Hardware {
    pub fn new(_: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            screen: MockScreen::default(),
            settings_pin: MockPin::default(),
            set_pin: MockPin::default(),
        })
    }
}
