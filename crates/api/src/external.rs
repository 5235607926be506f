// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Client for collaborating organisations' reservation services.
//!
//! A federated exam may be taken in another organisation's room. The
//! booking is then made over HTTP by the central federation host and only
//! a snapshot of the result is stored locally.
//!
//! Endpoints, relative to the federation host:
//!
//! - `POST /api/organisations/{org}/facilities/{room}/reservations`
//! - `DELETE /api/organisations/{org}/facilities/{room}/reservations/{ref}`
//! - `GET /api/organisations/{org}/facilities/{room}/slots`

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use exam_slots_domain::{ExternalReservation, Interval, PrecomputedSlot};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ExternalServiceError;

/// Time allowed for one remote call.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// A booking to make in another organisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteReservationRequest {
    pub org_ref: String,
    pub room_ref: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Identity of the student as sent to the remote side.
    pub user_ref: String,
}

/// Slot query against another organisation's room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSlotQuery {
    pub org_ref: String,
    pub room_ref: String,
    /// First day to search.
    pub date: NaiveDate,
    /// Exam period start.
    pub start: DateTime<Utc>,
    /// Exam period end.
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
}

/// Seam to a collaborating organisation's reservation service.
pub trait ExternalReservationService: Send + Sync {
    /// Books a machine remotely and returns the snapshot to store.
    fn create_reservation(
        &self,
        request: &RemoteReservationRequest,
    ) -> impl Future<Output = Result<ExternalReservation, ExternalServiceError>> + Send;

    /// Cancels a remote booking. Succeeds only when the remote side confirms.
    fn cancel_reservation(
        &self,
        org_ref: &str,
        room_ref: &str,
        external_ref: &str,
    ) -> impl Future<Output = Result<(), ExternalServiceError>> + Send;

    /// Fetches slots with machine counts computed by the remote side.
    fn fetch_slots(
        &self,
        query: &RemoteSlotQuery,
    ) -> impl Future<Output = Result<Vec<PrecomputedSlot>, ExternalServiceError>> + Send;
}

/// No configured service means delegation is disabled.
impl<S: ExternalReservationService> ExternalReservationService for Option<S> {
    async fn create_reservation(
        &self,
        request: &RemoteReservationRequest,
    ) -> Result<ExternalReservation, ExternalServiceError> {
        match self {
            Some(service) => service.create_reservation(request).await,
            None => Err(ExternalServiceError::Disabled),
        }
    }

    async fn cancel_reservation(
        &self,
        org_ref: &str,
        room_ref: &str,
        external_ref: &str,
    ) -> Result<(), ExternalServiceError> {
        match self {
            Some(service) => {
                service
                    .cancel_reservation(org_ref, room_ref, external_ref)
                    .await
            }
            None => Err(ExternalServiceError::Disabled),
        }
    }

    async fn fetch_slots(
        &self,
        query: &RemoteSlotQuery,
    ) -> Result<Vec<PrecomputedSlot>, ExternalServiceError> {
        match self {
            Some(service) => service.fetch_slots(query).await,
            None => Err(ExternalServiceError::Disabled),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateReservationBody<'a> {
    requesting_org: &'a str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    user: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteRoom {
    name: String,
    room_code: Option<String>,
    local_timezone: String,
    building_name: Option<String>,
    campus: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteMachine {
    name: String,
    room: RemoteRoom,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteReservation {
    id: String,
    org_name: Option<String>,
    org_code: Option<String>,
    machine: RemoteMachine,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteSlot {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    available_machines: i64,
}

#[derive(Debug, Deserialize)]
struct RemoteErrorBody {
    message: String,
}

impl RemoteReservation {
    fn into_snapshot(self, org_ref: &str, room_ref: &str) -> ExternalReservation {
        ExternalReservation {
            external_ref: self.id,
            org_ref: org_ref.to_string(),
            room_ref: room_ref.to_string(),
            org_name: self.org_name,
            org_code: self.org_code,
            machine_name: self.machine.name,
            room_name: self.machine.room.name,
            room_code: self.machine.room.room_code,
            room_timezone: self.machine.room.local_timezone,
            building_name: self.machine.room.building_name,
            campus: self.machine.room.campus,
        }
    }
}

fn into_precomputed(slots: Vec<RemoteSlot>) -> Result<Vec<PrecomputedSlot>, ExternalServiceError> {
    slots
        .into_iter()
        .map(|slot| {
            let interval: Interval = Interval::new(slot.start, slot.end)
                .map_err(|e| ExternalServiceError::InvalidResponse(e.to_string()))?;
            Ok(PrecomputedSlot {
                interval,
                available_machines: slot.available_machines,
            })
        })
        .collect()
}

/// HTTP client for the federation host.
#[derive(Debug, Clone)]
pub struct HttpExternalReservationService {
    client: reqwest::Client,
    base_url: String,
    home_organisation: String,
}

impl HttpExternalReservationService {
    /// Creates a client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The federation host, e.g. `https://federation.example.org`
    /// * `home_organisation` - This organisation's reference at the host
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, home_organisation: &str) -> Result<Self, ExternalServiceError> {
        let client: reqwest::Client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ExternalServiceError::Transport {
                url: base_url.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            home_organisation: home_organisation.to_string(),
        })
    }

    fn facility_url(&self, org_ref: &str, room_ref: &str) -> String {
        format!(
            "{}/api/organisations/{org_ref}/facilities/{room_ref}",
            self.base_url
        )
    }

    async fn rejection(url: &str, response: reqwest::Response) -> ExternalServiceError {
        let status: u16 = response.status().as_u16();
        let body: String = response.text().await.unwrap_or_default();
        let message: String = serde_json::from_str::<RemoteErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);
        warn!(url, status, message = %message, "Remote reservation service refused request");
        ExternalServiceError::Rejected { status, message }
    }
}

fn transport_error(url: &str, err: &reqwest::Error) -> ExternalServiceError {
    ExternalServiceError::Transport {
        url: url.to_string(),
        message: err.to_string(),
    }
}

impl ExternalReservationService for HttpExternalReservationService {
    async fn create_reservation(
        &self,
        request: &RemoteReservationRequest,
    ) -> Result<ExternalReservation, ExternalServiceError> {
        let url: String = format!(
            "{}/reservations",
            self.facility_url(&request.org_ref, &request.room_ref)
        );
        let body: CreateReservationBody<'_> = CreateReservationBody {
            requesting_org: &self.home_organisation,
            start: request.start,
            end: request.end,
            user: &request.user_ref,
        };
        debug!(url = %url, "Requesting remote reservation");

        let response: reqwest::Response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&url, &e))?;
        if response.status() != reqwest::StatusCode::CREATED {
            return Err(Self::rejection(&url, response).await);
        }
        let remote: RemoteReservation = response
            .json()
            .await
            .map_err(|e| ExternalServiceError::InvalidResponse(e.to_string()))?;
        Ok(remote.into_snapshot(&request.org_ref, &request.room_ref))
    }

    async fn cancel_reservation(
        &self,
        org_ref: &str,
        room_ref: &str,
        external_ref: &str,
    ) -> Result<(), ExternalServiceError> {
        let url: String = format!(
            "{}/reservations/{external_ref}",
            self.facility_url(org_ref, room_ref)
        );
        debug!(url = %url, "Cancelling remote reservation");

        let response: reqwest::Response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| transport_error(&url, &e))?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(Self::rejection(&url, response).await);
        }
        Ok(())
    }

    async fn fetch_slots(
        &self,
        query: &RemoteSlotQuery,
    ) -> Result<Vec<PrecomputedSlot>, ExternalServiceError> {
        let url: String = format!(
            "{}/slots",
            self.facility_url(&query.org_ref, &query.room_ref)
        );
        let params: [(&str, String); 4] = [
            ("date", query.date.format("%Y-%m-%d").to_string()),
            ("startAt", query.start.to_rfc3339()),
            ("endAt", query.end.to_rfc3339()),
            ("duration", query.duration_minutes.to_string()),
        ];

        let response: reqwest::Response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| transport_error(&url, &e))?;
        if !response.status().is_success() {
            return Err(Self::rejection(&url, response).await);
        }
        let slots: Vec<RemoteSlot> = response
            .json()
            .await
            .map_err(|e| ExternalServiceError::InvalidResponse(e.to_string()))?;
        into_precomputed(slots)
    }
}
