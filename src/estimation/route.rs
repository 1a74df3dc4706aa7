//! Route lookup against an OSRM server, with a great-circle fallback.
//!
//! `RouteDistanceProvider::get_route` is total: any routing failure is
//! absorbed into the `Fallback` variant so callers never see an error.

use crate::geo::{self, Coordinates};
use crate::state::RouteSource;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_OSRM_URL: &str = "http://router.project-osrm.org";
pub const DEFAULT_OSRM_PROFILE: &str = "driving";

#[derive(Debug, Clone, PartialEq)]
pub enum RouteResult {
    External {
        distance_meters: f64,
        duration_seconds: f64,
    },
    Fallback {
        distance_meters: f64,
        implied_duration_seconds: f64,
    },
}

impl RouteResult {
    pub fn distance_km(&self) -> f64 {
        match self {
            RouteResult::External {
                distance_meters, ..
            }
            | RouteResult::Fallback {
                distance_meters, ..
            } => distance_meters / 1000.0,
        }
    }

    pub fn source(&self) -> RouteSource {
        match self {
            RouteResult::External { .. } => RouteSource::External,
            RouteResult::Fallback { .. } => RouteSource::Fallback,
        }
    }
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("routing request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("routing service returned HTTP {0}")]
    Status(u16),
    #[error("routing service rejected query: {0}")]
    Rejected(String),
    #[error("routing response contained no routes")]
    EmptyRoutes,
}

/// One leg as reported by the routing service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteLeg {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

#[async_trait]
pub trait RoutingApi: Send + Sync {
    async fn fetch_route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteLeg, RouteError>;
}

#[derive(Debug, Clone)]
pub struct RoutingParams {
    pub server_url: String,
    pub profile: String,
    /// Overall budget for the routing query, retries included.
    pub timeout: Duration,
    pub max_retries: u32,
    /// Urban speed used to derive the implied fallback duration.
    pub fallback_speed_kmh: f64,
}

impl Default for RoutingParams {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_OSRM_URL.to_string(),
            profile: DEFAULT_OSRM_PROFILE.to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
            fallback_speed_kmh: 20.0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
}

pub struct OsrmClient {
    http: reqwest::Client,
    server_url: String,
    profile: String,
}

impl OsrmClient {
    pub fn new(params: &RoutingParams) -> Result<Self, RouteError> {
        let http = reqwest::Client::builder()
            .timeout(params.timeout)
            .build()?;
        Ok(Self {
            http,
            server_url: params.server_url.trim_end_matches('/').to_string(),
            profile: params.profile.clone(),
        })
    }
}

#[async_trait]
impl RoutingApi for OsrmClient {
    async fn fetch_route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteLeg, RouteError> {
        // OSRM expects longitude,latitude pairs.
        let url = format!(
            "{}/route/v1/{}/{},{};{},{}",
            self.server_url,
            self.profile,
            origin.longitude,
            origin.latitude,
            destination.longitude,
            destination.latitude,
        );
        let response = self
            .http
            .get(&url)
            .query(&[
                ("overview", "false"),
                ("steps", "false"),
                ("alternatives", "false"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RouteError::Status(status.as_u16()));
        }

        let body: OsrmResponse = response.json().await?;
        if body.code != "Ok" {
            return Err(RouteError::Rejected(body.code));
        }
        let route = body.routes.first().ok_or(RouteError::EmptyRoutes)?;
        Ok(RouteLeg {
            distance_meters: route.distance,
            duration_seconds: route.duration,
        })
    }
}

pub struct RouteDistanceProvider {
    api: Arc<dyn RoutingApi>,
    params: RoutingParams,
}

impl RouteDistanceProvider {
    pub fn new(api: Arc<dyn RoutingApi>, params: RoutingParams) -> Self {
        Self { api, params }
    }

    /// Resolves a route, falling back to a haversine estimate on any failure.
    /// Attempts stay within one overall timeout budget; exhausting the budget
    /// triggers the fallback immediately instead of queuing more retries.
    pub async fn get_route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> RouteResult {
        let deadline = Instant::now() + self.params.timeout;
        let attempts = self.params.max_retries.max(1);

        for attempt in 1..=attempts {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(attempt, "Routing budget exhausted, using fallback");
                break;
            }
            match tokio::time::timeout(remaining, self.api.fetch_route(origin, destination)).await
            {
                Ok(Ok(leg)) => {
                    debug!(
                        distance_meters = leg.distance_meters,
                        duration_seconds = leg.duration_seconds,
                        "Routing query succeeded"
                    );
                    return RouteResult::External {
                        distance_meters: leg.distance_meters,
                        duration_seconds: leg.duration_seconds,
                    };
                }
                Ok(Err(err)) => {
                    warn!(attempt, error = %err, "Routing query failed");
                }
                Err(_) => {
                    warn!(attempt, "Routing query timed out, using fallback");
                    break;
                }
            }
        }

        self.fallback(origin, destination)
    }

    fn fallback(&self, origin: Coordinates, destination: Coordinates) -> RouteResult {
        let distance_km = geo::haversine_km(origin, destination);
        let implied_duration_seconds =
            distance_km / self.params.fallback_speed_kmh * 3600.0;
        RouteResult::Fallback {
            distance_meters: distance_km * 1000.0,
            implied_duration_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::mock::MockRoutingApi;
    use crate::state::RouteSource;

    fn provider(api: MockRoutingApi) -> RouteDistanceProvider {
        RouteDistanceProvider::new(Arc::new(api), RoutingParams::default())
    }

    fn origin() -> Coordinates {
        Coordinates::new(-8.0630, -34.8710).expect("valid origin")
    }

    fn destination() -> Coordinates {
        Coordinates::new(-8.1264, -34.9176).expect("valid destination")
    }

    #[tokio::test]
    async fn successful_query_returns_external_route() {
        let api = MockRoutingApi::success(RouteLeg {
            distance_meters: 8800.0,
            duration_seconds: 1500.0,
        });
        let provider = provider(api);

        let route = provider.get_route(origin(), destination()).await;

        assert_eq!(
            route,
            RouteResult::External {
                distance_meters: 8800.0,
                duration_seconds: 1500.0,
            }
        );
        assert_eq!(route.source(), RouteSource::External);
    }

    #[tokio::test]
    async fn failing_query_falls_back_to_haversine() {
        let api = MockRoutingApi::unavailable();
        let calls = api.calls();
        let provider = provider(api);

        let route = provider.get_route(origin(), destination()).await;

        match route {
            RouteResult::Fallback {
                distance_meters,
                implied_duration_seconds,
            } => {
                let distance_km = distance_meters / 1000.0;
                assert!(distance_km > 8.5 && distance_km < 9.0, "got {distance_km}");
                // 20 km/h fallback speed.
                let expected = distance_km / 20.0 * 3600.0;
                assert!((implied_duration_seconds - expected).abs() < 1e-6);
            }
            other => panic!("expected fallback, got {other:?}"),
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn recovers_on_retry_after_transient_failure() {
        let api = MockRoutingApi::fail_then_succeed(
            1,
            RouteLeg {
                distance_meters: 9000.0,
                duration_seconds: 1600.0,
            },
        );
        let provider = provider(api);

        let route = provider.get_route(origin(), destination()).await;

        assert_eq!(route.source(), RouteSource::External);
    }

    #[tokio::test]
    async fn zero_distance_fallback_has_zero_duration() {
        let provider = provider(MockRoutingApi::unavailable());

        let route = provider.get_route(origin(), origin()).await;

        assert_eq!(
            route,
            RouteResult::Fallback {
                distance_meters: 0.0,
                implied_duration_seconds: 0.0,
            }
        );
    }
}
