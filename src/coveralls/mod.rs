mod client;
mod submitter;
mod webhook;

pub use client::{CoverallsClient, DEFAULT_ENDPOINT};
pub use submitter::{submit_coverage, SubmitParams};
