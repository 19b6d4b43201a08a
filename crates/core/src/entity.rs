//! Entity trait: identity + continuity across state changes.

/// Persistent record with a stable identifier.
///
/// Users, roles and permissions are all entities: a role keeps its identity
/// when its label, priority or permission set change.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
