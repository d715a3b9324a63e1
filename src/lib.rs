//! vinted-scraper - Client for the Vinted marketplace's web API
//!
//! Bootstraps an anonymous session cookie from the site root, replays it on
//! JSON API calls, refreshes it when the API answers 401, and projects the
//! responses into typed records. Async by default; see [`vinted::blocking`]
//! for the blocking clients.

pub mod commands;
pub mod config;
pub mod error;
pub mod vinted;

pub use config::ClientConfig;
pub use error::{Error, Result};
pub use vinted::blocking;
pub use vinted::models::{Brand, BundleDiscount, Discount, HighResolution, Image, Item, Media, User};
pub use vinted::{
    Credential, ItemEndpoint, Params, SessionManager, Sleeper, TokioSleeper, VintedApi,
    VintedClient, VintedScraper,
};
