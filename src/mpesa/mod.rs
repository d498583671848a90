pub mod client;

pub use client::{stk_password, timestamp, MpesaClient, MpesaError};
