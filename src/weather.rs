use crate::{
    config::Config,
    display::{FontSize, Frame, SCREEN_WIDTH},
};
use anyhow::Context;
use itertools::Itertools;
use log::{error, info, trace, warn};
use serde_json::Value;
use std::time::Duration;

/// Gotta know weather or not it's gonna rain
pub struct Weather<H> {
    host: String,
    token: String,
    client: H,
}

impl<H: HttpClient> Weather<H> {
    const PATH: &'static str = "/data/2.5/weather";
    const COUNTRY: &'static str = "HU";

    pub fn new(config: &Config, client: H) -> Self {
        Self {
            host: config.api_host.clone(),
            token: config.api_token.clone(),
            client,
        }
    }

    /// Current conditions URL for a city. The city goes in as-is; the HTTP
    /// client takes care of percent-encoding.
    pub fn url(&self, city: &str) -> String {
        let query = [
            ("q", format!("{city},{}", Self::COUNTRY)),
            ("units", "metric".into()),
            ("lang", "hu".into()),
            ("appid", self.token.clone()),
        ]
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .join("&");
        format!("{}{}?{query}", self.host, Self::PATH)
    }

    /// Build the weather screen for a city. This blocks on the network.
    ///
    /// Returns `None` when the fetch failed, in which case the failure has
    /// already been logged and the screen should be left alone.
    pub fn show(&mut self, city: &str, connected: bool) -> Option<Frame> {
        if !connected {
            return Some(no_connection_frame());
        }

        info!("Fetching weather for {city}");
        match self.client.get(&self.url(city)) {
            Ok(response) if response.status == 200 => {
                let snapshot = WeatherSnapshot::parse(&response.body);
                trace!("Weather for {city}: {snapshot:?}");
                Some(weather_frame(city, &snapshot))
            }
            Ok(response) => {
                error!(
                    "Weather request for {city} returned HTTP {}",
                    response.status
                );
                None
            }
            Err(err) => {
                error!("Error fetching weather for {city}: {err:#}");
                None
            }
        }
    }

    pub fn client(&self) -> &H {
        &self.client
    }
}

/// Blocking HTTP, isolated so tests can hand back canned responses
pub trait HttpClient {
    /// Issue a GET. Any response the server sends back is `Ok`, whatever its
    /// status; `Err` means the request never completed (DNS, connect, TLS,
    /// timeout, ...).
    fn get(&mut self, url: &str) -> anyhow::Result<HttpResponse>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// [HttpClient] on top of a ureq agent
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl HttpClient for UreqClient {
    fn get(&mut self, url: &str) -> anyhow::Result<HttpResponse> {
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            // ureq treats 4xx/5xx as errors, but we want to report the code
            Err(ureq::Error::Status(_, response)) => response,
            Err(err) => return Err(err).context("Error sending request"),
        };
        let status = response.status();
        let body = response
            .into_string()
            .context("Error reading response body")?;
        Ok(HttpResponse { status, body })
    }
}

/// The six fields we show from a current-conditions response. Each is the
/// field's text as it appeared in the JSON, or `None` if the key was missing
/// or didn't hold a scalar.
///
/// https://openweathermap.org/current#fields_json
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeatherSnapshot {
    /// °C
    pub temperature: Option<String>,
    /// Cloud cover, %
    pub cloud_cover: Option<String>,
    pub description: Option<String>,
    pub wind_speed: Option<String>,
    /// Relative humidity, %
    pub humidity: Option<String>,
    /// hPa
    pub pressure: Option<String>,
}

impl WeatherSnapshot {
    /// Parse a response body. Never fails: a body that isn't JSON gives an
    /// all-blank snapshot.
    pub fn parse(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(document) => Self::from_document(&document),
            Err(err) => {
                warn!("Weather response is not valid JSON: {err}");
                Self::default()
            }
        }
    }

    pub fn from_document(document: &Value) -> Self {
        let field = |pointer: &str| document.pointer(pointer).and_then(scalar);
        Self {
            temperature: field("/main/temp"),
            cloud_cover: field("/clouds/all"),
            description: field("/weather/0/description"),
            wind_speed: field("/wind/speed"),
            humidity: field("/main/humidity"),
            pressure: field("/main/pressure"),
        }
    }
}

/// Text of a JSON scalar. Numbers keep their JSON formatting.
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Lay out a weather snapshot. Missing fields are left blank.
pub fn weather_frame(city: &str, snapshot: &WeatherSnapshot) -> Frame {
    let blank = |field: &Option<String>| field.clone().unwrap_or_default();
    let mut frame = Frame::new();
    frame
        .hline((0, 15), SCREEN_WIDTH as u32 - 1)
        .text(
            format!("{city}: {} °C", blank(&snapshot.temperature)),
            (0, 10),
            FontSize::Small,
        )
        .text(
            format!(
                "{}% - {}",
                blank(&snapshot.cloud_cover),
                blank(&snapshot.description)
            ),
            (0, 30),
            FontSize::Large,
        )
        .text(
            format!(
                "{} km/h, P: {}%",
                blank(&snapshot.wind_speed),
                blank(&snapshot.humidity)
            ),
            (0, 45),
            FontSize::Large,
        )
        .text(
            format!("Légnyomás: {} hPa", blank(&snapshot.pressure)),
            (0, 60),
            FontSize::Large,
        );
    frame
}

/// Shown instead of the weather when there's no WiFi
pub fn no_connection_frame() -> Frame {
    let mut frame = Frame::new();
    frame
        .text("Nincs internetkapcsolat!", (0, 10), FontSize::Small)
        .text("Ellenőrizze a beállításokat!", (0, 30), FontSize::Small);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::MockHttp;

    const FULL_BODY: &str = r#"{
        "weather": [{"id": 803, "main": "Clouds", "description": "erős felhőzet"}],
        "main": {"temp": 21.5, "pressure": 1016, "humidity": 48},
        "wind": {"speed": 3.6, "deg": 310},
        "clouds": {"all": 75},
        "name": "Budapest"
    }"#;

    fn new_weather(client: MockHttp) -> Weather<MockHttp> {
        let config = Config {
            api_token: "TOKEN".into(),
            ..Config::default()
        };
        Weather::new(&config, client)
    }

    fn lines(frame: &Frame) -> Vec<&str> {
        frame.texts().collect()
    }

    #[test]
    fn test_url() {
        let weather = new_weather(MockHttp::default());
        assert_eq!(
            weather.url("Budapest"),
            "https://api.openweathermap.org/data/2.5/weather\
            ?q=Budapest,HU&units=metric&lang=hu&appid=TOKEN"
        );
    }

    #[test]
    fn test_render_full() {
        let mut weather = new_weather(MockHttp::with_response(200, FULL_BODY));
        let frame = weather.show("Budapest", true).unwrap();
        assert_eq!(
            lines(&frame),
            vec![
                "Budapest: 21.5 °C",
                "75% - erős felhőzet",
                "3.6 km/h, P: 48%",
                "Légnyomás: 1016 hPa",
            ]
        );
        assert_eq!(weather.client().requests.len(), 1);
        assert!(weather.client().requests[0].contains("q=Budapest,HU"));
    }

    #[test]
    fn test_missing_wind_speed() {
        let body = r#"{
            "weather": [{"description": "derült égbolt"}],
            "main": {"temp": 18, "pressure": 1020, "humidity": 60},
            "wind": {"deg": 90},
            "clouds": {"all": 0}
        }"#;
        let mut weather = new_weather(MockHttp::with_response(200, body));
        let frame = weather.show("Kecskemét", true).unwrap();
        assert_eq!(
            lines(&frame),
            vec![
                "Kecskemét: 18 °C",
                "0% - derült égbolt",
                " km/h, P: 60%",
                "Légnyomás: 1020 hPa",
            ]
        );
    }

    #[test]
    fn test_malformed_body() {
        let mut weather = new_weather(MockHttp::with_response(200, "<html>"));
        let frame = weather.show("Budapest", true).unwrap();
        assert_eq!(
            lines(&frame),
            vec!["Budapest:  °C", "% - ", " km/h, P: %", "Légnyomás:  hPa"]
        );
    }

    #[test]
    fn test_wrong_types_blank() {
        let snapshot = WeatherSnapshot::parse(
            r#"{"main": "nope", "weather": {"description": "x"}, "clouds": {"all": null}}"#,
        );
        assert_eq!(snapshot, WeatherSnapshot::default());
    }

    #[test]
    fn test_no_connection() {
        let mut weather = new_weather(MockHttp::with_response(200, FULL_BODY));
        let frame = weather.show("Budapest", false).unwrap();
        assert_eq!(
            lines(&frame),
            vec!["Nincs internetkapcsolat!", "Ellenőrizze a beállításokat!"]
        );
        assert!(weather.client().requests.is_empty());
    }

    #[test]
    fn test_failures_leave_screen() {
        let mut weather = new_weather(MockHttp::with_response(401, "{}"));
        assert_eq!(weather.show("Budapest", true), None);

        let mut weather = new_weather(MockHttp::failing());
        assert_eq!(weather.show("Budapest", true), None);
        assert_eq!(weather.client().requests.len(), 1);
    }
}
