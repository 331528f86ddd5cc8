// Channel handle resolution
// Turns creator-supplied handles (@name, bare names, channel URLs) into stable
// UC... channel ids by scraping the public channel page.

use crate::models::youtube::ResolvedChannel;
use futures::FutureExt;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

const DEFAULT_PAGE_BASE: &str = "https://www.youtube.com";
const PLATFORM_DOMAINS: [&str; 2] = ["youtube.com", "youtu.be"];
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

lazy_static! {
    static ref CANONICAL_LINK: Regex =
        Regex::new(r"https://www\.youtube\.com/channel/(UC[\w-]{22})").unwrap();
    static ref EXTERNAL_ID: Regex = Regex::new(r#""externalId":"(UC[\w-]{22})""#).unwrap();
    static ref CHANNEL_ID: Regex = Regex::new(r"^UC[\w-]{22}$").unwrap();
}

/// True for a bare stable channel identifier (`UC` + 22 chars)
pub fn is_channel_id(input: &str) -> bool {
    CHANNEL_ID.is_match(input.trim())
}

/// Find the channel id embedded in a channel page body. The canonical link
/// is preferred over the `externalId` metadata field.
pub fn extract_channel_id(body: &str) -> Option<String> {
    CANONICAL_LINK
        .captures(body)
        .or_else(|| EXTERNAL_ID.captures(body))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[derive(Debug, Clone)]
pub struct ChannelResolver {
    client: Client,
    page_base: String,
}

impl ChannelResolver {
    pub fn new(request_timeout: Duration) -> Self {
        Self::with_base_url(DEFAULT_PAGE_BASE, request_timeout)
    }

    pub fn with_base_url(page_base: &str, request_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build resolver HTTP client ({}), using defaults", e);
                Client::new()
            });

        Self {
            client,
            page_base: page_base.trim_end_matches('/').to_string(),
        }
    }

    /// Work out which page to fetch for a raw handle.
    pub fn page_url(&self, raw: &str) -> String {
        let input = raw.trim();

        if PLATFORM_DOMAINS.iter().any(|d| input.contains(d)) {
            let is_handle_link =
                input.contains('@') && !input.contains("channel/") && !input.contains("c/");
            if is_handle_link {
                if let Some(handle) = handle_from_url(input) {
                    return self.handle_url(&handle);
                }
            }
            return input.to_string();
        }

        if is_channel_id(input) {
            return format!("{}/channel/{}", self.page_base, input);
        }

        let handle = if input.starts_with('@') {
            input.to_string()
        } else {
            format!("@{}", input)
        };
        self.handle_url(&handle)
    }

    fn handle_url(&self, handle: &str) -> String {
        let name = handle.trim_start_matches('@');
        format!("{}/@{}", self.page_base, urlencoding::encode(name))
    }

    /// Resolve a single handle. Never fails: every problem becomes `success=false`.
    pub async fn resolve(&self, handle: &str) -> ResolvedChannel {
        let url = self.page_url(handle);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Channel page request failed for {}: {}", handle, e);
                return ResolvedChannel::failed(handle.to_string(), url);
            }
        };

        if response.status() != reqwest::StatusCode::OK {
            tracing::warn!("Channel page for {} returned {}", handle, response.status());
            return ResolvedChannel::failed(handle.to_string(), url);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Failed to read channel page for {}: {}", handle, e);
                return ResolvedChannel::failed(handle.to_string(), url);
            }
        };

        match extract_channel_id(&body) {
            Some(channel_id) => {
                tracing::debug!("Resolved {} -> {}", handle, channel_id);
                ResolvedChannel::resolved(handle.to_string(), channel_id, url)
            }
            None => {
                tracing::warn!("No channel id found on page for {}", handle);
                ResolvedChannel::failed(handle.to_string(), url)
            }
        }
    }

    /// Resolve many handles concurrently with at most `max_workers` requests in
    /// flight. Every distinct input handle gets exactly one entry in the result.
    /// When `deadline` elapses, outstanding lookups are aborted and recorded as
    /// failures.
    pub async fn resolve_many(
        &self,
        handles: &[String],
        max_workers: usize,
        deadline: Option<Duration>,
    ) -> ResolutionSet {
        let resolver = self.clone();
        self.resolve_many_with(handles, max_workers, deadline, move |handle| {
            let resolver = resolver.clone();
            async move { resolver.resolve(&handle).await }
        })
        .await
    }

    /// `resolve_many` with the per-handle lookup supplied by the caller.
    async fn resolve_many_with<F, Fut>(
        &self,
        handles: &[String],
        max_workers: usize,
        deadline: Option<Duration>,
        lookup: F,
    ) -> ResolutionSet
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = ResolvedChannel> + Send + 'static,
    {
        let mut seen = HashSet::new();
        let order: Vec<String> = handles
            .iter()
            .filter(|h| seen.insert(h.as_str()))
            .cloned()
            .collect();

        let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
        let mut workers = JoinSet::new();

        for handle in &order {
            let semaphore = semaphore.clone();
            let task = lookup(handle.clone());
            let handle = handle.clone();
            workers.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = AssertUnwindSafe(task).catch_unwind().await;
                (handle, outcome)
            });
        }

        let mut results: HashMap<String, ResolvedChannel> = HashMap::with_capacity(order.len());

        let collect = async {
            while let Some(joined) = workers.join_next().await {
                match joined {
                    Ok((handle, Ok(resolved))) => {
                        results.insert(handle, resolved);
                    }
                    Ok((handle, Err(_))) => {
                        tracing::error!("Resolver worker panicked while resolving {}", handle);
                        let url = self.page_url(&handle);
                        results.insert(handle.clone(), ResolvedChannel::failed(handle, url));
                    }
                    Err(e) => tracing::error!("Resolver worker failed to join: {}", e),
                }
            }
        };

        match deadline {
            Some(limit) => {
                if tokio::time::timeout(limit, collect).await.is_err() {
                    tracing::warn!(
                        "Channel resolution deadline of {:?} reached, aborting outstanding lookups",
                        limit
                    );
                }
            }
            None => collect.await,
        }
        workers.abort_all();

        let mut set = ResolutionSet::with_order(order);
        for handle in set.order.clone() {
            let resolved = results.remove(&handle).unwrap_or_else(|| {
                let url = self.page_url(&handle);
                ResolvedChannel::failed(handle.clone(), url)
            });
            set.by_handle.insert(handle, resolved);
        }

        tracing::info!(
            "Resolved {}/{} channels",
            set.successful().count(),
            set.len()
        );
        set
    }
}

fn handle_from_url(url: &str) -> Option<String> {
    let after_domain = url.split("youtube.com/").nth(1)?;
    let segment = after_domain.split('?').next()?.trim_end_matches('/');
    if segment.is_empty() {
        return None;
    }
    Some(if segment.starts_with('@') {
        segment.to_string()
    } else {
        format!("@{}", segment)
    })
}

/// Resolver results keyed by handle, remembering the order handles were given in.
#[derive(Debug, Clone, Default)]
pub struct ResolutionSet {
    order: Vec<String>,
    by_handle: HashMap<String, ResolvedChannel>,
}

impl ResolutionSet {
    fn with_order(order: Vec<String>) -> Self {
        Self {
            by_handle: HashMap::with_capacity(order.len()),
            order,
        }
    }

    pub fn len(&self) -> usize {
        self.by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_handle.is_empty()
    }

    pub fn get(&self, handle: &str) -> Option<&ResolvedChannel> {
        self.by_handle.get(handle)
    }

    /// All entries in input order
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedChannel> {
        self.order.iter().filter_map(|h| self.by_handle.get(h))
    }

    pub fn successful(&self) -> impl Iterator<Item = &ResolvedChannel> {
        self.iter().filter(|r| r.success)
    }

    pub fn unresolved_count(&self) -> usize {
        self.by_handle.values().filter(|r| !r.success).count()
    }

    /// Ids of successfully resolved channels, in input order
    pub fn channel_ids(&self) -> Vec<String> {
        self.successful()
            .filter_map(|r| r.channel_id.clone())
            .collect()
    }
}

impl FromIterator<ResolvedChannel> for ResolutionSet {
    fn from_iter<I: IntoIterator<Item = ResolvedChannel>>(iter: I) -> Self {
        let mut set = ResolutionSet::default();
        for resolved in iter {
            if !set.by_handle.contains_key(&resolved.handle) {
                set.order.push(resolved.handle.clone());
            }
            set.by_handle.insert(resolved.handle.clone(), resolved);
        }
        set
    }
}
