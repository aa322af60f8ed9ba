//! The four peer protocols.
//!
//! Chat and presence ride the pub/sub topics; vouching and key exchange are
//! one-shot unicasts. Each protocol holds non-owning references to the
//! shared node state, the transport handle, and the event bus; inbound
//! handlers treat crypto failures, allowlist rejections, and malformed
//! envelopes as local drops and never raise them.

pub mod chat;
pub mod keyex;
pub mod presence;
pub mod vouch;
