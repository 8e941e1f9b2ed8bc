//! HTTP access for the database download.

mod client;

pub use client::{Fetch, HttpClient, HttpClientConfig, HttpError};
