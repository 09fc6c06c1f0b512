use kernel::id::Id;

/// Authenticated principal; opaque to the session gate
pub struct UserMarker;
pub type UserId = Id<UserMarker>;
