use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{error, info, warn};

use newsflow_core::{ArticleMessage, UrlDedupe};

use crate::fetcher::{FetchError, PageFetcher};
use crate::html;
use crate::webdriver::WebDriver;

const NEWS_FLOW_URL: &str = "https://www.tradingview.com/news-flow/";
const SIGNIN_URL: &str = "https://www.tradingview.com/#signin";

const CARD_SELECTOR: &str = ".card-DmjQR0Aa";
const CARD_TITLE_SELECTOR: &str = ".title-e7vDzPX4";
const FILTERS_BAR_SELECTOR: &str = ".filtersBar-YXVzia8q";
const DASHBOARD_SELECTOR: &str = ".tv-lightweight-charts";
const ARTICLE_TITLE_CLASS: &str = "title-KX2tCBZq";
const ARTICLE_BODY_CLASS: &str = "body-KX2tCBZq";

/// TradingView news-flow adapter driving a remote browser.
///
/// Logs in with the saved cookie jar when one exists, falling back to the
/// credential form. Fetched items are deduped by `(url, title)` before the
/// article page is even loaded, so a reappearing headline costs nothing.
pub struct TradingViewFetcher {
    hub_url: String,
    username: String,
    password: String,
    cookies_path: PathBuf,
    output_dir: PathBuf,
    driver: Option<WebDriver>,
    dedupe: UrlDedupe,
}

impl TradingViewFetcher {
    pub fn new(
        hub_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        cookies_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            hub_url: hub_url.into(),
            username: username.into(),
            password: password.into(),
            cookies_path: cookies_path.into(),
            output_dir: output_dir.into(),
            driver: None,
            dedupe: UrlDedupe::default(),
        }
    }

    fn driver(&self) -> Result<&WebDriver, FetchError> {
        self.driver.as_ref().ok_or(FetchError::NoSession)
    }

    fn start_driver(&mut self) -> Result<(), FetchError> {
        if self.driver.is_none() {
            info!(hub = %self.hub_url, "starting browser session");
            self.driver = Some(WebDriver::new_session(&self.hub_url)?);
        }
        Ok(())
    }

    fn drop_driver(&mut self) {
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.quit() {
                warn!(error = %e, "failed to close browser session");
            }
        }
    }

    fn save_cookies(&self) -> Result<(), FetchError> {
        let driver = self.driver()?;
        let cookies = driver.cookies()?;
        if let Some(parent) = self.cookies_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec(&cookies)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.cookies_path, bytes)?;
        info!(path = %self.cookies_path.display(), "cookies saved");
        Ok(())
    }

    fn load_cookies(&self) -> Result<(), FetchError> {
        let driver = self.driver()?;
        let raw = std::fs::read_to_string(&self.cookies_path)?;
        let cookies: Vec<crate::webdriver::Cookie> = serde_json::from_str(&raw)
            .map_err(|e| FetchError::Login(format!("corrupt cookie jar: {e}")))?;
        for cookie in &cookies {
            driver.add_cookie(cookie)?;
        }
        Ok(())
    }

    /// Try to reuse the saved cookie jar.
    fn login_with_cookies(&mut self) -> Result<bool, FetchError> {
        self.start_driver()?;
        let driver = self.driver()?;
        driver.goto(NEWS_FLOW_URL)?;
        self.load_cookies()?;
        let driver = self.driver()?;
        driver.refresh()?;
        match driver.wait_for_css(FILTERS_BAR_SELECTOR, Duration::from_secs(20)) {
            Ok(_) => {
                info!("logged in using saved cookies");
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "cookie login failed, falling back to form login");
                self.drop_driver();
                Ok(false)
            }
        }
    }

    /// Fresh login through the credential form.
    fn login_with_form(&mut self) -> Result<bool, FetchError> {
        self.start_driver()?;
        let driver = self.driver()?;
        driver.goto(SIGNIN_URL)?;

        let result = (|| -> Result<(), FetchError> {
            info!("waiting for email button");
            let email_button = driver.wait_for_css("button[name='Email']", Duration::from_secs(10))?;
            driver.click(&email_button)?;

            info!("waiting for username field");
            let username = driver.wait_for_css("#id_username", Duration::from_secs(10))?;
            driver.send_keys(&username, &self.username)?;
            let password = driver.wait_for_css("#id_password", Duration::from_secs(10))?;
            driver.send_keys(&password, &self.password)?;

            info!("submitting sign-in form");
            let sign_in = driver
                .find_xpath("//button[.//span[text()='Sign in']]")?
                .into_iter()
                .next()
                .ok_or_else(|| FetchError::Login("sign-in button not found".into()))?;
            driver.click(&sign_in)?;

            info!("waiting for dashboard");
            driver.wait_for_css(DASHBOARD_SELECTOR, Duration::from_secs(20))?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                self.save_cookies()?;
                info!("logged in successfully");
                Ok(true)
            }
            Err(e) => {
                error!(error = %e, "login failed");
                self.drop_driver();
                Ok(false)
            }
        }
    }

    fn slugify(title: &str, max_length: usize) -> String {
        static SLUG_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\s,\.]"#).expect("slug regex"));
        let slug = SLUG_RE.replace_all(title.trim_matches('\''), "_").to_string();
        slug.chars().take(max_length).collect()
    }

    /// Load one article page and convert it to a message.
    fn process_article(&self, link: &str, title: &str) -> Result<ArticleMessage, FetchError> {
        info!(title, link, "reading new article");
        let driver = self.driver()?;
        driver.goto(link)?;
        driver.wait_for_css(&format!(".{ARTICLE_BODY_CLASS}"), Duration::from_secs(5))?;

        let source = driver.page_source()?;

        // Keep the raw page on disk for debugging bad extractions.
        std::fs::create_dir_all(&self.output_dir)?;
        let html_path = self.output_dir.join(format!("{}.html", Self::slugify(title, 100)));
        std::fs::write(&html_path, &source)?;
        info!(path = %html_path.display(), "saved article html");

        let extracted_title = html::section_by_class(&source, "h1", ARTICLE_TITLE_CLASS)
            .map(html::strip_tags)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "No Title".to_string());
        let content = html::section_by_class(&source, "div", ARTICLE_BODY_CLASS)
            .map(html::paragraphs_text)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "No Content".to_string());

        Ok(ArticleMessage::new(extracted_title, content))
    }

    fn screenshot_on_error(&self) {
        if let Ok(driver) = self.driver() {
            let path = self.output_dir.join("scrape_error.png");
            if let Err(e) = std::fs::create_dir_all(&self.output_dir)
                .map_err(crate::webdriver::WebDriverError::Io)
                .and_then(|_| driver.save_screenshot(&path))
            {
                warn!(error = %e, "failed to save error screenshot");
            }
        }
    }
}

impl PageFetcher for TradingViewFetcher {
    fn login(&mut self) -> Result<bool, FetchError> {
        if self.cookies_path.exists() {
            if self.login_with_cookies()? {
                return Ok(true);
            }
        }
        self.login_with_form()
    }

    fn fetch_news(&mut self, limit: usize) -> Result<Vec<ArticleMessage>, FetchError> {
        info!("starting new scan (www.tradingview.com)");
        let driver = self.driver()?;
        driver.goto(NEWS_FLOW_URL)?;
        driver.wait_for_css(CARD_SELECTOR, Duration::from_secs(15))?;

        let mut items = Vec::new();
        for card in driver.find_css(CARD_SELECTOR)? {
            let Some(link) = driver.attribute(&card, "href")? else {
                continue;
            };
            let title = match driver.find_css_within(&card, CARD_TITLE_SELECTOR)?.first() {
                Some(title_el) => driver.text(title_el)?,
                None => continue,
            };
            items.push((link, title));
        }

        let mut articles = Vec::new();
        for (link, title) in items.into_iter().take(limit) {
            if self.dedupe.seen(&link, &title) {
                continue;
            }
            match self.process_article(&link, &title) {
                Ok(article) => {
                    self.dedupe.insert(&link, &title);
                    articles.push(article);
                }
                Err(e) => {
                    error!(title = %title, error = %e, "failed to read article");
                    self.screenshot_on_error();
                }
            }
        }

        info!(count = articles.len(), "scan complete");
        Ok(articles)
    }
}

impl Drop for TradingViewFetcher {
    fn drop(&mut self) {
        self.drop_driver();
    }
}
