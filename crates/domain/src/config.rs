// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use chrono_tz::Tz;

/// Number of days into the future that slots may be searched by default.
pub const DEFAULT_RESERVATION_WINDOW_DAYS: i64 = 30;

/// Upper bound on the search window, roughly ten years.
pub const MAX_RESERVATION_WINDOW_DAYS: i64 = 3_660;

/// Zone used when none is configured.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Helsinki;

/// Scheduling settings passed explicitly into every engine entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingConfig {
    reservation_window_days: i64,
    default_timezone: Tz,
}

impl SchedulingConfig {
    /// Creates a configuration.
    ///
    /// # Arguments
    ///
    /// * `reservation_window_days` - How far ahead slots may be searched
    /// * `default_timezone` - IANA zone identifier
    ///
    /// # Errors
    ///
    /// Returns an error if the window is not between 1 and
    /// `MAX_RESERVATION_WINDOW_DAYS` or the zone is unknown.
    pub fn new(reservation_window_days: i64, default_timezone: &str) -> Result<Self, DomainError> {
        if !(1..=MAX_RESERVATION_WINDOW_DAYS).contains(&reservation_window_days) {
            return Err(DomainError::InvalidReservationWindow(
                reservation_window_days,
            ));
        }
        let tz: Tz = default_timezone
            .parse()
            .map_err(|_| DomainError::InvalidTimezone(default_timezone.to_string()))?;
        Ok(Self {
            reservation_window_days,
            default_timezone: tz,
        })
    }

    #[must_use]
    pub const fn reservation_window_days(&self) -> i64 {
        self.reservation_window_days
    }

    #[must_use]
    pub const fn default_timezone(&self) -> Tz {
        self.default_timezone
    }
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            reservation_window_days: DEFAULT_RESERVATION_WINDOW_DAYS,
            default_timezone: DEFAULT_TIMEZONE,
        }
    }
}
