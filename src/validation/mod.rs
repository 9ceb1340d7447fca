pub mod payment;

pub use payment::PaymentValidator;
