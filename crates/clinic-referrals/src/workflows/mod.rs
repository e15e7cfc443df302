pub mod commission;
pub mod intake;
pub mod matching;
pub mod payout;
