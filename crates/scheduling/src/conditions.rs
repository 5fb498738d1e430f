//! Condition checks gating bookings.
//!
//! The slot aggregate knows nothing about weather. Callers ask a
//! [`ConditionsService`] first and only send the booking on approval.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Verdict for one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionsReport {
    pub slot_id: String,
    pub meets_requirements: bool,
    pub summary: String,
}

impl ConditionsReport {
    pub fn approved(slot_id: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            slot_id: slot_id.into(),
            meets_requirements: true,
            summary: summary.into(),
        }
    }

    pub fn rejected(slot_id: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            slot_id: slot_id.into(),
            meets_requirements: false,
            summary: summary.into(),
        }
    }
}

/// Failures to reach a verdict. None of these mean "conditions are bad".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionsError {
    #[error("Conditions service is rate limited")]
    RateLimited,

    #[error("Conditions check timed out")]
    Timeout,

    #[error("Conditions tool '{tool}' failed: {reason}")]
    ToolError { tool: String, reason: String },
}

/// Decides whether conditions permit flying in a slot.
#[async_trait]
pub trait ConditionsService: Send + Sync {
    async fn evaluate(&self, slot_id: &str) -> Result<ConditionsReport, ConditionsError>;
}

#[async_trait]
impl<T: ConditionsService + ?Sized> ConditionsService for Arc<T> {
    async fn evaluate(&self, slot_id: &str) -> Result<ConditionsReport, ConditionsError> {
        (**self).evaluate(slot_id).await
    }
}

/// Forecast for one slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub wind_knots: u32,
    pub gust_knots: u32,
    pub visibility_sm: f64,
    pub ceiling_ft: u32,
}

/// Limits a training flight must stay within.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightMinima {
    pub max_wind_knots: u32,
    pub max_gust_knots: u32,
    pub min_visibility_sm: f64,
    pub min_ceiling_ft: u32,
}

impl Default for FlightMinima {
    fn default() -> Self {
        Self {
            max_wind_knots: 20,
            max_gust_knots: 25,
            min_visibility_sm: 5.0,
            min_ceiling_ft: 3000,
        }
    }
}

impl FlightMinima {
    /// Lists every limit the forecast breaks. Empty means flyable.
    pub fn violations(&self, forecast: &Forecast) -> Vec<String> {
        let mut violations = Vec::new();
        if forecast.wind_knots > self.max_wind_knots {
            violations.push(format!(
                "wind {} kt exceeds {} kt",
                forecast.wind_knots, self.max_wind_knots
            ));
        }
        if forecast.gust_knots > self.max_gust_knots {
            violations.push(format!(
                "gusts {} kt exceed {} kt",
                forecast.gust_knots, self.max_gust_knots
            ));
        }
        if forecast.visibility_sm < self.min_visibility_sm {
            violations.push(format!(
                "visibility {} SM below {} SM",
                forecast.visibility_sm, self.min_visibility_sm
            ));
        }
        if forecast.ceiling_ft < self.min_ceiling_ft {
            violations.push(format!(
                "ceiling {} ft below {} ft",
                forecast.ceiling_ft, self.min_ceiling_ft
            ));
        }
        violations
    }
}

/// Tool name reported when a forecast lookup fails.
pub const WEATHER_FORECAST_TOOL: &str = "weather_forecast";

#[derive(Debug, Default)]
struct ForecastState {
    forecasts: HashMap<String, Forecast>,
    rate_limited: bool,
}

/// Judges slots against a table of forecasts.
#[derive(Debug, Clone, Default)]
pub struct ForecastConditionsService {
    minima: FlightMinima,
    state: Arc<RwLock<ForecastState>>,
}

impl ForecastConditionsService {
    /// Creates a service using the default minima.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service with custom minima.
    pub fn with_minima(minima: FlightMinima) -> Self {
        Self {
            minima,
            state: Arc::default(),
        }
    }

    pub fn minima(&self) -> &FlightMinima {
        &self.minima
    }

    /// Records (or replaces) the forecast for a slot.
    pub async fn set_forecast(&self, slot_id: impl Into<String>, forecast: Forecast) {
        self.state
            .write()
            .await
            .forecasts
            .insert(slot_id.into(), forecast);
    }

    /// While set, every evaluation fails with [`ConditionsError::RateLimited`].
    pub async fn set_rate_limited(&self, rate_limited: bool) {
        self.state.write().await.rate_limited = rate_limited;
    }
}

#[async_trait]
impl ConditionsService for ForecastConditionsService {
    #[tracing::instrument(skip(self))]
    async fn evaluate(&self, slot_id: &str) -> Result<ConditionsReport, ConditionsError> {
        let state = self.state.read().await;
        if state.rate_limited {
            return Err(ConditionsError::RateLimited);
        }

        let forecast = state
            .forecasts
            .get(slot_id)
            .ok_or_else(|| ConditionsError::ToolError {
                tool: WEATHER_FORECAST_TOOL.to_string(),
                reason: format!("no forecast for slot {slot_id}"),
            })?;

        let violations = self.minima.violations(forecast);
        let report = if violations.is_empty() {
            ConditionsReport::approved(
                slot_id,
                format!(
                    "wind {} kt gusting {} kt, visibility {} SM, ceiling {} ft",
                    forecast.wind_knots,
                    forecast.gust_knots,
                    forecast.visibility_sm,
                    forecast.ceiling_ft
                ),
            )
        } else {
            ConditionsReport::rejected(slot_id, violations.join("; "))
        };

        tracing::debug!(
            meets_requirements = report.meets_requirements,
            summary = %report.summary,
            "conditions evaluated"
        );
        Ok(report)
    }
}

#[derive(Debug, Default)]
struct InMemoryConditionsState {
    verdicts: HashMap<String, bool>,
    failure: Option<ConditionsError>,
    delay: Option<Duration>,
    calls: usize,
}

/// Scriptable conditions service. Approves every slot unless told otherwise.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConditionsService {
    state: Arc<RwLock<InMemoryConditionsState>>,
}

impl InMemoryConditionsService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the verdict for a slot.
    pub async fn set_verdict(&self, slot_id: impl Into<String>, meets_requirements: bool) {
        self.state
            .write()
            .await
            .verdicts
            .insert(slot_id.into(), meets_requirements);
    }

    /// Makes every evaluation fail with `failure` until cleared with `None`.
    pub async fn set_failure(&self, failure: Option<ConditionsError>) {
        self.state.write().await.failure = failure;
    }

    /// Delays every evaluation, for exercising caller timeouts.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        self.state.write().await.delay = delay;
    }

    /// Number of evaluations requested so far.
    pub async fn call_count(&self) -> usize {
        self.state.read().await.calls
    }
}

#[async_trait]
impl ConditionsService for InMemoryConditionsService {
    async fn evaluate(&self, slot_id: &str) -> Result<ConditionsReport, ConditionsError> {
        let (verdict, failure, delay) = {
            let mut state = self.state.write().await;
            state.calls += 1;
            (
                state.verdicts.get(slot_id).copied().unwrap_or(true),
                state.failure.clone(),
                state.delay,
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(failure) = failure {
            return Err(failure);
        }

        Ok(if verdict {
            ConditionsReport::approved(slot_id, "approved")
        } else {
            ConditionsReport::rejected(slot_id, "rejected")
        })
    }
}
