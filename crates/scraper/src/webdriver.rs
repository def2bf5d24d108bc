use std::path::Path;
use std::time::{Duration, Instant};

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

/// W3C element identifier key in find-element responses.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Poll interval for [`WebDriver::wait_for_css`].
const WAIT_POLL: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum WebDriverError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webdriver protocol error: {error}: {message}")]
    Protocol { error: String, message: String },

    #[error("unexpected response shape: {0}")]
    Shape(String),

    #[error("timed out after {0:?} waiting for '{1}'")]
    WaitTimeout(Duration, String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Browser cookie, serialised as-is into the on-disk jar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, rename = "httpOnly", skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
}

/// Handle to an element within the current session.
#[derive(Debug, Clone)]
pub struct Element {
    id: String,
}

/// Minimal blocking client for a remote WebDriver (Selenium hub).
///
/// Covers exactly what the TradingView adapter needs: sessions, navigation,
/// CSS/XPath lookup, text/attributes, cookies, page source, screenshots.
/// Runs on the scraper's dedicated thread, so the blocking reqwest client
/// is the right tool.
pub struct WebDriver {
    http: reqwest::blocking::Client,
    session_url: String,
}

impl WebDriver {
    /// Open a new browser session on the hub.
    pub fn new_session(hub_url: &str) -> Result<Self, WebDriverError> {
        let http = reqwest::blocking::Client::new();
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": [
                            "--disable-blink-features=AutomationControlled",
                            "--no-sandbox",
                            "--disable-gpu",
                        ]
                    }
                }
            }
        });

        let value = Self::unwrap_value(
            http.post(format!("{hub_url}/session"))
                .json(&capabilities)
                .send()?,
        )?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| WebDriverError::Shape("missing sessionId".into()))?
            .to_string();

        debug!(session_id = %session_id, "webdriver session created");
        Ok(Self {
            session_url: format!("{hub_url}/session/{session_id}"),
            http,
        })
    }

    /// Unwrap the `{"value": ...}` envelope, mapping protocol errors.
    fn unwrap_value(response: reqwest::blocking::Response) -> Result<Value, WebDriverError> {
        let status = response.status();
        let body: Value = response.json()?;
        let value = body.get("value").cloned().unwrap_or(Value::Null);
        if !status.is_success() {
            let error = value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Err(WebDriverError::Protocol { error, message });
        }
        Ok(value)
    }

    fn get(&self, path: &str) -> Result<Value, WebDriverError> {
        Self::unwrap_value(self.http.get(format!("{}{path}", self.session_url)).send()?)
    }

    fn post(&self, path: &str, body: Value) -> Result<Value, WebDriverError> {
        Self::unwrap_value(
            self.http
                .post(format!("{}{path}", self.session_url))
                .json(&body)
                .send()?,
        )
    }

    pub fn goto(&self, url: &str) -> Result<(), WebDriverError> {
        self.post("/url", json!({"url": url}))?;
        Ok(())
    }

    pub fn refresh(&self) -> Result<(), WebDriverError> {
        self.post("/refresh", json!({}))?;
        Ok(())
    }

    pub fn page_source(&self) -> Result<String, WebDriverError> {
        self.get("/source")?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WebDriverError::Shape("page source is not a string".into()))
    }

    fn parse_elements(value: Value) -> Result<Vec<Element>, WebDriverError> {
        value
            .as_array()
            .ok_or_else(|| WebDriverError::Shape("elements response is not an array".into()))?
            .iter()
            .map(|entry| {
                entry
                    .get(ELEMENT_KEY)
                    .and_then(Value::as_str)
                    .map(|id| Element { id: id.to_string() })
                    .ok_or_else(|| WebDriverError::Shape("missing element id".into()))
            })
            .collect()
    }

    /// Find all elements matching a CSS selector.
    pub fn find_css(&self, selector: &str) -> Result<Vec<Element>, WebDriverError> {
        let value = self.post(
            "/elements",
            json!({"using": "css selector", "value": selector}),
        )?;
        Self::parse_elements(value)
    }

    /// Find all elements matching an XPath expression.
    pub fn find_xpath(&self, xpath: &str) -> Result<Vec<Element>, WebDriverError> {
        let value = self.post("/elements", json!({"using": "xpath", "value": xpath}))?;
        Self::parse_elements(value)
    }

    /// Find elements matching a CSS selector within another element.
    pub fn find_css_within(
        &self,
        parent: &Element,
        selector: &str,
    ) -> Result<Vec<Element>, WebDriverError> {
        let value = self.post(
            &format!("/element/{}/elements", parent.id),
            json!({"using": "css selector", "value": selector}),
        )?;
        Self::parse_elements(value)
    }

    pub fn text(&self, element: &Element) -> Result<String, WebDriverError> {
        self.get(&format!("/element/{}/text", element.id))?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WebDriverError::Shape("element text is not a string".into()))
    }

    pub fn attribute(
        &self,
        element: &Element,
        name: &str,
    ) -> Result<Option<String>, WebDriverError> {
        Ok(self
            .get(&format!("/element/{}/attribute/{name}", element.id))?
            .as_str()
            .map(str::to_string))
    }

    pub fn click(&self, element: &Element) -> Result<(), WebDriverError> {
        self.post(&format!("/element/{}/click", element.id), json!({}))?;
        Ok(())
    }

    pub fn send_keys(&self, element: &Element, text: &str) -> Result<(), WebDriverError> {
        self.post(&format!("/element/{}/value", element.id), json!({"text": text}))?;
        Ok(())
    }

    /// Poll until at least one element matches the selector.
    pub fn wait_for_css(&self, selector: &str, timeout: Duration) -> Result<Element, WebDriverError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(element) = self.find_css(selector)?.into_iter().next() {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(WebDriverError::WaitTimeout(timeout, selector.to_string()));
            }
            std::thread::sleep(WAIT_POLL);
        }
    }

    pub fn cookies(&self) -> Result<Vec<Cookie>, WebDriverError> {
        let value = self.get("/cookie")?;
        serde_json::from_value(value)
            .map_err(|e| WebDriverError::Shape(format!("cookie list: {e}")))
    }

    pub fn add_cookie(&self, cookie: &Cookie) -> Result<(), WebDriverError> {
        self.post("/cookie", json!({"cookie": cookie}))?;
        Ok(())
    }

    /// Save a PNG screenshot of the current page.
    pub fn save_screenshot(&self, path: &Path) -> Result<(), WebDriverError> {
        let encoded = self
            .get("/screenshot")?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WebDriverError::Shape("screenshot is not a string".into()))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| WebDriverError::Shape(format!("screenshot decode: {e}")))?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// End the session. Consumes the driver; errors are returned so the
    /// caller can log them, but there is nothing to retry.
    pub fn quit(self) -> Result<(), WebDriverError> {
        Self::unwrap_value(self.http.delete(&self.session_url).send()?)?;
        debug!("webdriver session closed");
        Ok(())
    }
}
