pub mod error;

pub use error::{PaymentProofError, Result};
