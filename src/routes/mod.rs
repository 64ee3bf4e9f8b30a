/// Router Module Index
///
/// Routes are grouped by who may reach them. Access checks themselves live in the
/// handlers (via the `Session` extractor and the ownership guard), so a route that
/// moves between groups keeps its protection.

/// Routes usable by anonymous visitors: landing, register, login, logout, health.
pub mod public;

/// Routes that act on a user or a feedback item and need a signed-in session.
pub mod members;
