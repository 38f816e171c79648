pub mod donation;

pub use donation::{DonationEvent, DonationRow, RawDonationEvent};
