//! Shared application state.

use std::sync::{Arc, Mutex};

use inkwell_core::actor::ActorDirectory;
use inkwell_core::clock::Clock;
use inkwell_core::repository::EventRepository;
use inkwell_core::rng::DeterministicRng;
use inkwell_identity::application::ports::{NotificationDispatcher, OtpStore};
use inkwell_identity::domain::code::VerificationPolicy;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock for expiry and event timestamps.
    pub clock: Arc<dyn Clock + Send + Sync>,
    /// Code generator randomness.
    pub rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    /// Order event streams.
    pub event_repository: Arc<dyn EventRepository>,
    /// One-time code records.
    pub otp_store: Arc<dyn OtpStore>,
    /// Actor lookups for writer assignment.
    pub actor_directory: Arc<dyn ActorDirectory>,
    /// Code delivery.
    pub dispatcher: Arc<dyn NotificationDispatcher>,
    /// Bypass configuration.
    pub policy: Arc<VerificationPolicy>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock + Send + Sync>,
        rng: Arc<Mutex<dyn DeterministicRng + Send>>,
        event_repository: Arc<dyn EventRepository>,
        otp_store: Arc<dyn OtpStore>,
        actor_directory: Arc<dyn ActorDirectory>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        policy: VerificationPolicy,
    ) -> Self {
        Self {
            clock,
            rng,
            event_repository,
            otp_store,
            actor_directory,
            dispatcher,
            policy: Arc::new(policy),
        }
    }
}
