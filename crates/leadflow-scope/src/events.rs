//! Event visibility

use leadflow_model::{Event, User};

/// Whether `user` may see `event`
///
/// Organization-wide roles see all events. Everyone else sees events they
/// created and events targeting a group they belong to, lead or manage.
#[must_use]
pub fn can_see_event(user: &User, event: &Event) -> bool {
    user.role.sees_all()
        || event.created_by == user.id
        || event
            .target_group_ids
            .iter()
            .any(|g| user.is_affiliated_with(g))
}

/// Events visible to `user`, in input order
#[must_use]
pub fn visible_events(user: &User, events: &[Event]) -> Vec<Event> {
    events
        .iter()
        .filter(|e| can_see_event(user, e))
        .cloned()
        .collect()
}
