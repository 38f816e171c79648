pub mod donation;
pub mod rate_limit;
pub mod validation;

pub use donation::DonationService;
pub use rate_limit::{Decision, RateLimiter};
pub use validation::{validate, ValidationError};
