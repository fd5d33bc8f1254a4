//! OpenWeatherMap "current weather" client

use crate::{FetchError, FetchResult, WeatherProvider};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;
use wxwatch_core::{kelvin_to_celsius, Observation, Timestamp};

pub const DEFAULT_BASE_URL: &str = "http://api.openweathermap.org/data/2.5/weather";

/// Response body; every block is optional so absence maps to a typed error
#[derive(Debug, Deserialize)]
pub struct CurrentWeatherResponse {
    pub main: Option<MainBlock>,
    pub wind: Option<WindBlock>,
    pub weather: Option<Vec<ConditionEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct MainBlock {
    /// Kelvin
    pub temp: Option<f64>,
    /// Kelvin
    pub feels_like: Option<f64>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct WindBlock {
    pub speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ConditionEntry {
    pub main: String,
}

pub struct OpenWeatherClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        if api_key.is_empty() {
            anyhow::bail!("OpenWeatherMap API key is empty");
        }
        let base_url = Url::parse(base_url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn request_url(&self, location: &str) -> Url {
        // No `units` parameter: the provider answers in Kelvin
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("q", location)
            .append_pair("appid", &self.api_key);
        url
    }
}

/// Turn a decoded response into a °C observation
pub fn observation_from_response(
    location: &str,
    body: CurrentWeatherResponse,
    observed_at: Timestamp,
) -> FetchResult<Observation> {
    let missing = |what: &str| FetchError::MalformedResponse(format!("{} missing for {}", what, location));

    let main = body.main.ok_or_else(|| missing("main block"))?;
    let wind = body.wind.ok_or_else(|| missing("wind block"))?;
    let condition = body
        .weather
        .and_then(|list| list.into_iter().next())
        .ok_or_else(|| missing("weather condition list"))?;

    let temp = main.temp.ok_or_else(|| missing("main.temp"))?;
    let feels_like = main.feels_like.ok_or_else(|| missing("main.feels_like"))?;
    let humidity = main.humidity.ok_or_else(|| missing("main.humidity"))?;
    let wind_speed = wind.speed.ok_or_else(|| missing("wind.speed"))?;

    Ok(Observation {
        location: location.to_string(),
        temperature: kelvin_to_celsius(temp),
        feels_like: kelvin_to_celsius(feels_like),
        humidity: humidity.round() as i32,
        wind_speed,
        condition: condition.main,
        observed_at,
    })
}

#[async_trait::async_trait]
impl WeatherProvider for OpenWeatherClient {
    fn name(&self) -> &str {
        "openweathermap"
    }

    async fn fetch_current(&self, location: &str) -> FetchResult<Observation> {
        let resp = self
            .client
            .get(self.request_url(location))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Network(format!("request timed out: {}", e))
                } else {
                    FetchError::Network(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Network(format!("HTTP status {}", status)));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let body: CurrentWeatherResponse = serde_json::from_slice(&bytes)
            .map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

        debug!(location, "provider response decoded");
        observation_from_response(location, body, chrono::Utc::now().timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> CurrentWeatherResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_converts_kelvin_fields() {
        let body = decode(
            r#"{
                "name": "Delhi",
                "cod": 200,
                "main": {"temp": 303.25, "feels_like": 306.15, "humidity": 48},
                "wind": {"speed": 3.6, "deg": 270},
                "weather": [{"id": 721, "main": "Haze", "description": "haze"}]
            }"#,
        );
        let obs = observation_from_response("Delhi", body, 1_700_000_000).unwrap();
        assert_eq!(obs.location, "Delhi");
        assert_eq!(obs.temperature, 303.25 - 273.15);
        assert_eq!(obs.feels_like, 306.15 - 273.15);
        assert_eq!(obs.humidity, 48);
        assert_eq!(obs.wind_speed, 3.6);
        assert_eq!(obs.condition, "Haze");
        assert_eq!(obs.observed_at, 1_700_000_000);
    }

    #[test]
    fn test_missing_blocks_are_malformed() {
        let no_main = decode(r#"{"wind":{"speed":1.0},"weather":[{"main":"Clear"}]}"#);
        let err = observation_from_response("Pune", no_main, 0).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"Malformed response: main block missing for Pune");

        let no_wind = decode(
            r#"{"main":{"temp":290.0,"feels_like":290.0,"humidity":10},"weather":[{"main":"Clear"}]}"#,
        );
        assert!(matches!(
            observation_from_response("Pune", no_wind, 0),
            Err(FetchError::MalformedResponse(_))
        ));

        let empty_conditions = decode(
            r#"{"main":{"temp":290.0,"feels_like":290.0,"humidity":10},"wind":{"speed":1.0},"weather":[]}"#,
        );
        assert!(matches!(
            observation_from_response("Pune", empty_conditions, 0),
            Err(FetchError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_request_url() {
        let client = OpenWeatherClient::new(
            DEFAULT_BASE_URL,
            "k3y".to_string(),
            Duration::from_secs(10),
        )
        .unwrap();
        let url = client.request_url("New Delhi");
        assert_eq!(url.host_str(), Some("api.openweathermap.org"));
        assert_eq!(url.query(), Some("q=New+Delhi&appid=k3y"));
    }

    /// Serve `app` on an ephemeral local port; returns a client pointed at it
    async fn local_client(app: axum::Router, timeout: Duration) -> OpenWeatherClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        OpenWeatherClient::new(&format!("http://{}/weather", addr), "k".to_string(), timeout).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_decodes_provider_reply() {
        let app = axum::Router::new().route(
            "/weather",
            axum::routing::get(|| async {
                r#"{"main":{"temp":283.15,"feels_like":280.15,"humidity":71},"wind":{"speed":5.1},"weather":[{"main":"Rain"}]}"#
            }),
        );
        let client = local_client(app, Duration::from_secs(5)).await;

        let obs = client.fetch_current("Bergen").await.unwrap();
        assert_eq!(obs.location, "Bergen");
        assert!((obs.temperature - 10.0).abs() < 1e-9);
        assert_eq!(obs.condition, "Rain");
    }

    #[tokio::test]
    async fn test_error_status_is_network_error() {
        let app = axum::Router::new().route(
            "/weather",
            axum::routing::get(|| async {
                (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "upstream down")
            }),
        );
        let client = local_client(app, Duration::from_secs(5)).await;

        match client.fetch_current("Delhi").await {
            Err(FetchError::Network(msg)) => assert!(msg.contains("500"), "{}", msg),
            other => panic!("expected network error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let app = axum::Router::new().route("/weather", axum::routing::get(|| async { "garbage" }));
        let client = local_client(app, Duration::from_secs(5)).await;

        assert!(matches!(
            client.fetch_current("Delhi").await,
            Err(FetchError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_stalled_provider_times_out() {
        let app = axum::Router::new().route(
            "/weather",
            axum::routing::get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "{}"
            }),
        );
        let client = local_client(app, Duration::from_millis(100)).await;

        match client.fetch_current("Delhi").await {
            Err(FetchError::Network(msg)) => assert!(msg.starts_with("request timed out"), "{}", msg),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_api_key_rejected() {
        assert!(OpenWeatherClient::new(DEFAULT_BASE_URL, String::new(), Duration::from_secs(1)).is_err());
    }
}
