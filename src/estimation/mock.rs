//! Mock routing API for tests and offline runs.

use crate::estimation::route::{RouteError, RouteLeg, RoutingApi};
use crate::geo::Coordinates;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
enum MockBehavior {
    Success(RouteLeg),
    Unavailable,
    /// Fail the first `n` calls, then succeed.
    FailThenSucceed(usize, RouteLeg),
}

#[derive(Debug)]
pub struct MockRoutingApi {
    behavior: MockBehavior,
    calls: Arc<AtomicUsize>,
}

impl MockRoutingApi {
    pub fn success(leg: RouteLeg) -> Self {
        Self {
            behavior: MockBehavior::Success(leg),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            behavior: MockBehavior::Unavailable,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fail_then_succeed(failures: usize, leg: RouteLeg) -> Self {
        Self {
            behavior: MockBehavior::FailThenSucceed(failures, leg),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared call counter, usable after the mock is moved into a provider.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl RoutingApi for MockRoutingApi {
    async fn fetch_route(
        &self,
        _origin: Coordinates,
        _destination: Coordinates,
    ) -> Result<RouteLeg, RouteError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MockBehavior::Success(leg) => Ok(*leg),
            MockBehavior::Unavailable => Err(RouteError::Status(503)),
            MockBehavior::FailThenSucceed(failures, leg) => {
                if call < *failures {
                    Err(RouteError::EmptyRoutes)
                } else {
                    Ok(*leg)
                }
            }
        }
    }
}
