// handlers/public/mod.rs - endpoints reachable without a token
//
// Login, the public bulletin feed and the public image gallery. Inputs are
// validated like any other body; nothing here reads `AuthUser`.

pub mod archivos;
pub mod auth;
pub mod carteleras;
