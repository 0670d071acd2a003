//! Shared test utilities for the paygate crates.

pub mod clock;
pub mod helpers;
pub mod mock_facilitator;
pub mod mock_transport;

pub use clock::ManualClock;
pub use helpers::*;
pub use mock_facilitator::MockFacilitator;
pub use mock_transport::MockTransport;
