// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Machine eligibility for an exam and an accessibility requirement set.

use crate::types::{Exam, Machine, Room};
use std::collections::BTreeSet;

/// Returns `true` if the machine satisfies the accessibility requirement.
///
/// The blanket `accessible` flag satisfies any requirement; otherwise the
/// machine's tag set must contain every required id.
#[must_use]
pub fn is_accessibility_satisfied(machine: &Machine, required: &BTreeSet<i64>) -> bool {
    machine.accessible || machine.accessibility_ids.is_superset(required)
}

/// Returns `true` if the room offers every requested accessibility tag.
#[must_use]
pub fn is_room_accessibility_satisfied(room: &Room, required: &BTreeSet<i64>) -> bool {
    room.accessibility_ids.is_superset(required)
}

/// Returns `true` if the machine has every software package the exam requires.
#[must_use]
pub fn is_software_satisfied(machine: &Machine, exam: &Exam) -> bool {
    machine.software_ids.is_superset(&exam.required_software)
}

/// Filters the machines that qualify for an exam in a room.
///
/// A machine qualifies iff it belongs to the room, is neither out of service
/// nor archived, has a name and network address, satisfies the accessibility
/// requirement and carries all required software.
///
/// An empty result is not an error; it means no slot can be offered.
#[must_use]
pub fn eligible_machines(
    room: &Room,
    machines: &[Machine],
    exam: &Exam,
    required_accessibility: &BTreeSet<i64>,
) -> Vec<Machine> {
    machines
        .iter()
        .filter(|m| m.room_id == room.room_id)
        .filter(|m| !m.out_of_service && !m.archived)
        .filter(|m| m.has_identity())
        .filter(|m| is_accessibility_satisfied(m, required_accessibility))
        .filter(|m| is_software_satisfied(m, exam))
        .cloned()
        .collect()
}
