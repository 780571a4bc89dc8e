/// Which screen the device is currently showing
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum DisplayState {
    /// Weather for the selected city, paged with the Set button
    #[default]
    Main,
    /// Read-only WiFi status
    Network,
    /// WiFi connect/disconnect control
    NetworkSettings,
}

impl DisplayState {
    /// Every state, in the order the Settings button cycles through them
    pub const ALL: &'static [Self] =
        &[Self::Main, Self::Network, Self::NetworkSettings];

    /// The state that follows this one when the Settings button is pressed.
    /// The cycle wraps back around to [DisplayState::Main].
    pub fn next(self) -> Self {
        match self {
            Self::Main => Self::Network,
            Self::Network => Self::NetworkSettings,
            Self::NetworkSettings => Self::Main,
        }
    }
}
