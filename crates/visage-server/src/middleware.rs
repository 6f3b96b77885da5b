use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::AppState;

/// Length of the fixed admission window.
const WINDOW: Duration = Duration::from_secs(60);

/// Entry count that triggers eviction of expired windows.
const EVICTION_THRESHOLD: usize = 10_000;

/// In-memory rate limiter state, keyed by client address.
///
/// Uses a simple fixed window counter.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    state: Arc<Mutex<HashMap<IpAddr, (u32, Instant)>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check if the request is allowed.
    ///
    /// Returns `true` if allowed, `false` once `limit` requests have been
    /// admitted for this address within the current window.
    pub fn check(&self, addr: IpAddr, limit: u32) -> bool {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // Lock poisoned by a panicked thread; accept the stale state
                // rather than refusing every request from here on.
                tracing::error!("rate limiter lock poisoned, recovering with stale state");
                poisoned.into_inner()
            }
        };
        let now = Instant::now();

        // Periodic cleanup to prevent unbounded growth. Evict only entries
        // whose window has expired; a blanket clear would reset active
        // windows and let a burst through.
        if state.len() > EVICTION_THRESHOLD {
            state.retain(|_, (_, start)| now.duration_since(*start) <= WINDOW);
        }

        let (count, start) = state.entry(addr).or_insert((0, now));

        if now.duration_since(*start) > WINDOW {
            // Reset window
            *count = 1;
            *start = now;
            true
        } else {
            *count += 1;
            *count <= limit
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Rate limiting middleware for the chat endpoint.
///
/// Only `/api/chat` is admission-controlled; audio delivery and health
/// checks pass through uncounted.
pub async fn rate_limit_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    if req.uri().path() != "/api/chat" {
        return Ok(next.run(req).await);
    }

    let state = req
        .extensions()
        .get::<Arc<AppState>>()
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?
        .clone();

    // ConnectInfo is installed by `into_make_service_with_connect_info`;
    // tests inject it manually. A request without it is a wiring bug, so
    // fail safe instead of admitting unattributed traffic.
    let addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    if !state.rate_limiter.check(addr, state.chat_limit) {
        let body = axum::Json(serde_json::json!({
            "error": "Too many requests, please try again later"
        }));
        let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
        response.headers_mut().insert(
            axum::http::header::RETRY_AFTER,
            axum::http::HeaderValue::from_static("60"),
        );
        return Ok(response);
    }

    Ok(next.run(req).await)
}
