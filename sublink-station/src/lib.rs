//! sublink-station: the operator side of a sublink vehicle link
//!
//! A station runs one worker per vehicle link (video, logging, telemetry,
//! pilot), a router that moves messages between them and the presentation
//! layer, and a negotiator that asks the vehicle which links to serve.

pub mod activation;
pub mod cli;
pub mod config;
pub mod negotiator;
pub mod presentation;
pub mod router;
pub mod station;
pub mod worker;

pub use activation::{activation_plan, link_enabled, LinkEndpoints};
pub use negotiator::{Ack, NegotiationOutcome, Negotiator};
pub use presentation::{LinkStatus, StatusBoard};
pub use router::{Mailbox, Router, RouterBuilder, RouterError};
pub use station::Station;
