pub mod models;
pub mod payment_reader;
pub mod processing;
pub mod utils;
pub mod validation;

pub use payment_reader::PaymentProofReader;
