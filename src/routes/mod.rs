/// Router Module Index
///
/// Routing is split by access level so the admin gate is applied to a whole router at
/// once instead of per handler.

/// Routes accessible to anyone. Read-only, active plans only, never cached.
pub mod public;

/// Admin login plus the token-protected catalog management routes.
pub mod admin;
