//! Network layer subsystem.
//!
//! TLS is optional: presence of certificate/key paths in the listener
//! config switches the gateway to HTTPS and starts the redirect responder.

pub mod tls;
