// Removal of dropped conditions after augmentation

use crate::filter::tree::{Condition, FilterGroup};

/// Drop `Absent` slots bottom-up; a group left without conditions becomes
/// `Absent` itself. Bare nodes are returned unchanged.
pub fn prune(condition: Condition) -> Condition {
    match condition {
        Condition::Group(group) => {
            let conditions: Vec<Condition> = group
                .conditions
                .into_iter()
                .filter(|c| !c.is_absent())
                .map(prune)
                .filter(|c| !c.is_absent())
                .collect();
            if conditions.is_empty() {
                Condition::Absent
            } else {
                Condition::Group(FilterGroup { conditions, ..group })
            }
        }
        other => other,
    }
}
