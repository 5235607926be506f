// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::CoreError;
use crate::request::ExternalTarget;
use exam_slots_domain::{Exam, ExamHosting};

/// How a booking request is fulfilled. Chosen once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationStrategy {
    /// Pick a machine in a local room.
    Local,
    /// Ask a collaborating organisation to book one of its machines.
    Delegated(ExternalTarget),
}

impl AllocationStrategy {
    /// Selects the strategy for an exam and an optional external target.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::DelegationNotAllowed` if an external target is
    /// given for an exam that is not federated.
    pub fn select(exam: &Exam, target: Option<&ExternalTarget>) -> Result<Self, CoreError> {
        match (target, exam.hosting) {
            (None, _) => Ok(Self::Local),
            (Some(target), ExamHosting::Federated) => Ok(Self::Delegated(target.clone())),
            (Some(_), ExamHosting::Local) => Err(CoreError::DelegationNotAllowed {
                exam_id: exam.exam_id,
            }),
        }
    }

    #[must_use]
    pub const fn is_delegated(&self) -> bool {
        matches!(self, Self::Delegated(_))
    }
}
