mod controller;

pub use controller::{ChatSession, SendOutcome, SessionConfig, SessionEvent};
