//! Event to topic routing

use super::events::DomainEvent;

/// Topic a domain event is delivered to
///
/// Every event targets the slug of the group it originated from.
pub fn route(event: &DomainEvent) -> &str {
    event.slug()
}
