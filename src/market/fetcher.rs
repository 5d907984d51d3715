// src/market/fetcher.rs
//! Browser-driven posting acquisition with human-like pacing.

use super::session::{SessionCookie, SessionStore, StoredSession};
use super::types::Posting;
use crate::config::ScrapeConfig;
use crate::error::AcquisitionError;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::page::Page;
use futures::StreamExt;
use rand::Rng;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Hard ceiling on postings per search. Deliberate anti-bot and cost
/// control, not a relevance decision.
pub const MAX_POSTINGS: usize = 5;

/// Pacing between network-driving actions. Injectable so tests can run
/// with zero delay without changing control flow.
#[async_trait]
pub trait DelayPolicy: Send + Sync {
    async fn pause(&self);
}

/// Production pacing: a uniformly random wait from a configured range.
#[derive(Debug, Clone)]
pub struct HumanPacing {
    min_ms: u64,
    max_ms: u64,
}

impl HumanPacing {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: max_ms.max(min_ms),
        }
    }

    fn sample_ms(&self) -> u64 {
        rand::thread_rng().gen_range(self.min_ms..=self.max_ms)
    }
}

#[async_trait]
impl DelayPolicy for HumanPacing {
    async fn pause(&self) {
        let wait = self.sample_ms();
        debug!("Pacing delay: {}ms", wait);
        tokio::time::sleep(Duration::from_millis(wait)).await;
    }
}

/// Zero-delay policy for tests.
#[derive(Debug, Clone, Default)]
pub struct NoDelay;

#[async_trait]
impl DelayPolicy for NoDelay {
    async fn pause(&self) {}
}

/// A launched browser scoped to one acquisition. Closed on every exit path;
/// never reused across requests.
struct BrowserSession {
    browser: Browser,
    handler_task: tokio::task::JoinHandle<()>,
}

impl BrowserSession {
    async fn launch() -> Result<Self, AcquisitionError> {
        let config = BrowserConfig::builder()
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .build()
            .map_err(AcquisitionError::Browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AcquisitionError::Browser(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser,
            handler_task,
        })
    }

    async fn new_page(&self) -> Result<Page, AcquisitionError> {
        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| AcquisitionError::Browser(format!("failed to open page: {e}")))
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Browser did not close cleanly: {}", e);
        }
        self.handler_task.abort();
    }
}

/// Retrieves posting-search results and posting pages through a real
/// browser session, pacing every step and persisting login state via the
/// [`SessionStore`].
pub struct StealthFetcher {
    config: ScrapeConfig,
    sessions: SessionStore,
    delay: Arc<dyn DelayPolicy>,
}

impl StealthFetcher {
    pub fn new(config: ScrapeConfig, sessions: SessionStore) -> Self {
        let delay = Arc::new(HumanPacing::new(config.min_delay_ms, config.max_delay_ms));
        Self {
            config,
            sessions,
            delay,
        }
    }

    pub fn with_delay_policy(mut self, delay: Arc<dyn DelayPolicy>) -> Self {
        self.delay = delay;
        self
    }

    /// Search for postings matching the role and location.
    ///
    /// Returns a finite batch capped at [`MAX_POSTINGS`]. Any transport
    /// error, detection signal, or timeout fails the whole call; partial or
    /// garbled batches are never returned.
    pub async fn search(
        &self,
        role: &str,
        location: &str,
        max_results: usize,
    ) -> Result<Vec<Posting>, AcquisitionError> {
        if !self.config.enabled {
            return Err(AcquisitionError::Disabled);
        }

        let cap = max_results.min(self.config.max_postings).min(MAX_POSTINGS);
        info!(
            "Starting live acquisition for '{}' in '{}' (cap {})",
            role, location, cap
        );

        let session = BrowserSession::launch().await?;
        let result = self.run_search(&session, role, location, cap).await;
        session.close().await;

        match &result {
            Ok(postings) => info!("Live acquisition collected {} postings", postings.len()),
            Err(e) => warn!("Live acquisition failed: {}", e),
        }
        result
    }

    async fn run_search(
        &self,
        session: &BrowserSession,
        role: &str,
        location: &str,
        cap: usize,
    ) -> Result<Vec<Posting>, AcquisitionError> {
        let page = session.new_page().await?;

        if let Some(stored) = self.sessions.load() {
            self.restore_cookies(&page, &stored).await;
        }

        let search_url = self.search_url(role, location)?;

        self.delay.pause().await;
        let mut final_url = self.navigate(&page, &search_url).await?;

        if is_detection_url(&final_url) {
            // One re-authentication attempt per call, never a loop.
            self.authenticate(&page).await?;
            self.delay.pause().await;
            final_url = self.navigate(&page, &search_url).await?;
            if is_detection_url(&final_url) {
                return Err(AcquisitionError::Detection { url: final_url });
            }
        }

        let html = self.page_html(&page).await?;
        let cards = parse_search_results(&html);
        if cards.is_empty() {
            return Err(AcquisitionError::EmptyResults);
        }
        debug!("Search page yielded {} job cards", cards.len());

        let mut postings = Vec::with_capacity(cap);
        for card in cards.into_iter().take(cap) {
            self.delay.pause().await;
            postings.push(self.fetch_posting(&page, card).await?);
        }

        Ok(postings)
    }

    fn search_url(&self, role: &str, location: &str) -> Result<String, AcquisitionError> {
        let url = Url::parse_with_params(
            &self.config.search_url,
            &[("keywords", role), ("location", location)],
        )
        .map_err(|e| AcquisitionError::Navigation {
            url: self.config.search_url.clone(),
            reason: e.to_string(),
        })?;
        Ok(url.into())
    }

    async fn navigate(&self, page: &Page, url: &str) -> Result<String, AcquisitionError> {
        let budget = Duration::from_secs(self.config.step_timeout_secs);
        let started = std::time::Instant::now();

        let outcome = tokio::time::timeout(budget, page.goto(url)).await;
        match outcome {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(AcquisitionError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(AcquisitionError::Timeout {
                    step: "navigation",
                    seconds: self.config.step_timeout_secs,
                })
            }
        }

        // Best effort: some pages settle without a dedicated navigation
        // event. The settle wait spends only what the goto left of this
        // step's budget, so one step never exceeds it.
        let remaining = remaining_budget(budget, started.elapsed());
        if !remaining.is_zero() {
            let _ = tokio::time::timeout(remaining, page.wait_for_navigation()).await;
        }

        let current = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());
        Ok(current)
    }

    async fn page_html(&self, page: &Page) -> Result<String, AcquisitionError> {
        let timeout = Duration::from_secs(self.config.step_timeout_secs);
        match tokio::time::timeout(timeout, page.content()).await {
            Ok(Ok(html)) => Ok(html),
            Ok(Err(e)) => Err(AcquisitionError::Browser(format!(
                "failed to read page content: {e}"
            ))),
            Err(_) => Err(AcquisitionError::Timeout {
                step: "page content",
                seconds: self.config.step_timeout_secs,
            }),
        }
    }

    async fn restore_cookies(&self, page: &Page, stored: &StoredSession) {
        let params: Vec<CookieParam> = stored
            .cookies
            .iter()
            .filter_map(|c| {
                CookieParam::builder()
                    .name(c.name.clone())
                    .value(c.value.clone())
                    .domain(c.domain.clone())
                    .path(c.path.clone())
                    .build()
                    .ok()
            })
            .collect();

        if params.is_empty() {
            return;
        }
        match page.set_cookies(params).await {
            Ok(_) => debug!("Restored {} session cookies", stored.cookies.len()),
            Err(e) => warn!("Failed to restore session cookies: {}", e),
        }
    }

    /// Credential login. Attempted at most once per search call.
    async fn authenticate(&self, page: &Page) -> Result<(), AcquisitionError> {
        let (email, password) =
            self.config
                .credentials()
                .ok_or_else(|| AcquisitionError::AuthFailed {
                    reason: "no credentials configured".to_string(),
                })?;

        info!("Session not authenticated, attempting credential login");
        self.delay.pause().await;
        self.navigate(page, &self.config.login_url).await?;

        let typed = self.fill_login_form(page, &email, &password).await;
        if let Err(e) = typed {
            return Err(AcquisitionError::AuthFailed {
                reason: format!("login form interaction failed: {e}"),
            });
        }

        self.delay.pause().await;
        let _ = page.wait_for_navigation().await;
        let landed = page.url().await.ok().flatten().unwrap_or_default();

        if is_logged_in_url(&landed) {
            info!("Credential login succeeded");
            self.persist_session(page).await;
            Ok(())
        } else {
            self.sessions.invalidate().ok();
            Err(AcquisitionError::AuthFailed {
                reason: format!("login did not reach an authenticated page ({landed})"),
            })
        }
    }

    async fn fill_login_form(
        &self,
        page: &Page,
        email: &str,
        password: &str,
    ) -> Result<(), chromiumoxide::error::CdpError> {
        page.find_element("input#username")
            .await?
            .click()
            .await?
            .type_str(email)
            .await?;
        page.find_element("input#password")
            .await?
            .click()
            .await?
            .type_str(password)
            .await?;
        page.find_element("button[type='submit']")
            .await?
            .click()
            .await?;
        Ok(())
    }

    async fn persist_session(&self, page: &Page) {
        let cookies = match page.get_cookies().await {
            Ok(cookies) => cookies,
            Err(e) => {
                warn!("Could not read cookies after login: {}", e);
                return;
            }
        };

        let stored = StoredSession::new(
            cookies
                .into_iter()
                .map(|c| SessionCookie {
                    name: c.name,
                    value: c.value,
                    domain: c.domain,
                    path: c.path,
                })
                .collect(),
        );

        if let Err(e) = self.sessions.save(&stored) {
            warn!("Failed to persist session: {}", e);
        }
    }

    async fn fetch_posting(
        &self,
        page: &Page,
        card: JobCard,
    ) -> Result<Posting, AcquisitionError> {
        let final_url = self.navigate(page, &card.url).await?;
        if is_detection_url(&final_url) {
            return Err(AcquisitionError::Detection { url: final_url });
        }

        let html = self.page_html(page).await?;
        Ok(parse_posting(&html, card))
    }
}

/// A search-result card before its detail page is fetched.
#[derive(Debug, Clone)]
pub(crate) struct JobCard {
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
}

/// URL patterns that mean the session is being challenged rather than
/// served results.
pub(crate) fn is_detection_url(url: &str) -> bool {
    ["/login", "/checkpoint", "/authwall", "/uas/"]
        .iter()
        .any(|marker| url.contains(marker))
}

pub(crate) fn is_logged_in_url(url: &str) -> bool {
    ["/feed", "/mynetwork", "/jobs"]
        .iter()
        .any(|marker| url.contains(marker))
}

pub(crate) fn parse_search_results(html: &str) -> Vec<JobCard> {
    let document = Html::parse_document(html);

    let card_selectors = [
        "li[data-occludable-job-id]",
        "div.base-card",
        "li.jobs-search-results__list-item",
    ];

    let mut cards = Vec::new();
    for selector_str in &card_selectors {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for element in document.select(&selector) {
            let fragment = Html::parse_fragment(&element.html());
            let title = find_text_by_selectors(
                &fragment,
                &[
                    "a.job-card-list__title",
                    "h3.base-search-card__title",
                    "a.base-card__full-link",
                ],
            );
            let url = find_attr_by_selectors(
                &fragment,
                &["a[href*='/jobs/view/']", "a.base-card__full-link"],
                "href",
            );
            let (Some(title), Some(url)) = (title, url) else {
                continue;
            };

            cards.push(JobCard {
                title,
                company: find_text_by_selectors(
                    &fragment,
                    &[
                        "h4.base-search-card__subtitle",
                        "span.job-card-container__primary-description",
                        "a.hidden-nested-link",
                    ],
                )
                .unwrap_or_default(),
                location: find_text_by_selectors(
                    &fragment,
                    &[
                        "span.job-search-card__location",
                        "li.job-card-container__metadata-item",
                    ],
                )
                .unwrap_or_default(),
                url,
            });
        }
        if !cards.is_empty() {
            break;
        }
    }

    cards
}

pub(crate) fn parse_posting(html: &str, card: JobCard) -> Posting {
    let document = Html::parse_document(html);

    let description = find_text_by_selectors(
        &document,
        &[
            "div.jobs-description__container",
            "div.jobs-box__html-content",
            "div.show-more-less-html__markup",
            "[data-test-id='job-description']",
        ],
    )
    .unwrap_or_default();

    let salary_text = find_text_by_selectors(
        &document,
        &[
            "span.job-details-jobs-unified-top-card__salary",
            "div.salary.compensation__salary",
        ],
    )
    .filter(|t| t.contains('$'));

    let seniority = find_text_by_selectors(
        &document,
        &["span.description__job-criteria-text--criteria"],
    )
    .or_else(|| {
        insight_texts(&document)
            .into_iter()
            .find(|t| looks_like_seniority(t))
    });

    let posted = find_text_by_selectors(
        &document,
        &[
            "span.posted-time-ago__text",
            "span.job-details-jobs-unified-top-card__posted-date",
        ],
    );

    Posting {
        title: card.title,
        company: card.company,
        location: card.location,
        description,
        posted,
        salary_text,
        seniority,
        url: card.url,
    }
}

fn insight_texts(document: &Html) -> Vec<String> {
    let Ok(selector) =
        Selector::parse("span.job-details-jobs-unified-top-card__job-insight")
    else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(|el| clean_text(&el.text().collect::<Vec<_>>().join(" ")))
        .filter(|t| !t.is_empty())
        .collect()
}

pub(crate) fn looks_like_seniority(text: &str) -> bool {
    let lower = text.to_lowercase();
    ["entry", "junior", "associate", "mid", "senior", "lead", "principal", "director"]
        .iter()
        .any(|level| lower.contains(level))
}

fn find_text_by_selectors(document: &Html, selectors: &[&str]) -> Option<String> {
    for selector_str in selectors {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                let text = clean_text(&element.text().collect::<Vec<_>>().join(" "));
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    None
}

fn find_attr_by_selectors(document: &Html, selectors: &[&str], attr: &str) -> Option<String> {
    for selector_str in selectors {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                if let Some(value) = element.value().attr(attr) {
                    if !value.is_empty() {
                        return Some(value.to_string());
                    }
                }
            }
        }
    }
    None
}

fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// What is left of a per-step time budget after part of it was spent.
fn remaining_budget(total: Duration, elapsed: Duration) -> Duration {
    total.saturating_sub(elapsed)
}
