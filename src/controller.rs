//! The device's main loop logic: button handling, screen state, and the
//! per-screen periodic work

use crate::{
    button::Button,
    config::{Config, Credentials, CITIES},
    display::Screen,
    network::{self, Radio},
    state::DisplayState,
    ticker::Ticker,
    weather::{HttpClient, Weather},
};
use embedded_hal::digital::InputPin;
use log::{info, trace};

/// Owns every piece of mutable state and every collaborator. Everything runs
/// on the caller's thread; [Controller::step] is one iteration of the loop.
pub struct Controller<S, R, H, P> {
    state: DisplayState,
    /// Cycles through screens
    settings_button: Button<P>,
    /// Pages cities on the weather screen, toggles WiFi on the settings
    /// screen
    set_button: Button<P>,
    /// Shared 1 Hz gate for the two network screens
    ticker: Ticker,
    /// Index into [CITIES]
    city_index: usize,
    credentials: Credentials,
    screen: S,
    radio: R,
    weather: Weather<H>,
}

impl<S, R, H, P> Controller<S, R, H, P>
where
    S: Screen,
    R: Radio,
    H: HttpClient,
    P: InputPin,
{
    pub fn new(
        config: &Config,
        screen: S,
        radio: R,
        http: H,
        settings_pin: P,
        set_pin: P,
    ) -> Self {
        Self {
            state: DisplayState::default(),
            settings_button: Button::new("Settings", settings_pin),
            set_button: Button::new("Set", set_pin),
            ticker: Ticker::default(),
            city_index: 0,
            credentials: config.wifi.clone(),
            screen,
            radio,
            weather: Weather::new(config, http),
        }
    }

    /// Blank the screen and kick off the first WiFi connection. Doesn't wait
    /// for the connection to come up.
    pub fn start(&mut self) -> anyhow::Result<()> {
        self.screen.clear()?;
        info!("Connecting to WiFi network {:?}", self.credentials.ssid);
        self.radio.connect(&self.credentials)
    }

    /// Run one loop iteration. `now_secs` is whole seconds of uptime, and is
    /// allowed to wrap.
    pub fn step(&mut self, now_secs: u32) -> anyhow::Result<()> {
        if self.settings_button.poll_pressed()? {
            self.state = self.state.next();
            info!("Switching to screen {:?}", self.state);
            self.screen.clear()?;
        }

        // The Set button is sampled on every iteration so releases are never
        // missed, but what counts as a press depends on the screen
        match self.state {
            DisplayState::Main => {
                if self.set_button.poll_pressed()? {
                    self.city_index = (self.city_index + 1) % CITIES.len();
                    self.show_weather()?;
                }
            }
            DisplayState::Network => {
                self.set_button.poll_armed(false)?;
                if self.ticker.should_run(now_secs) {
                    trace!("Refreshing network info");
                    let frame = network::show_network_info(&mut self.radio);
                    self.screen.commit(&frame)?;
                }
            }
            DisplayState::NetworkSettings => {
                let status = network::read_status(&mut self.radio);
                self.screen
                    .commit(&network::network_settings_frame(status))?;
                // Presses only count on a tick, so holding the button can't
                // toggle the radio back and forth
                let tick = self.ticker.should_run(now_secs);
                if self.set_button.poll_armed(tick)? {
                    network::toggle_connection(
                        &mut self.radio,
                        status,
                        &self.credentials,
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Fetch and draw weather for the current city. A failed fetch leaves
    /// the screen as it was.
    fn show_weather(&mut self) -> anyhow::Result<()> {
        let connected = network::read_status(&mut self.radio).is_connected();
        if let Some(frame) = self.weather.show(self.city(), connected) {
            self.screen.commit(&frame)?;
        }
        Ok(())
    }

    pub fn state(&self) -> DisplayState {
        self.state
    }

    pub fn city_index(&self) -> usize {
        self.city_index
    }

    pub fn city(&self) -> &'static str {
        CITIES[self.city_index]
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut S {
        &mut self.screen
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    #[cfg(test)]
    fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn weather(&self) -> &Weather<H> {
        &self.weather
    }
}
