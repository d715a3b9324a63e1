//! Vinted-specific modules: session bootstrap, request execution, typed models.

pub mod blocking;
pub mod client;
pub mod endpoints;
pub mod headers;
pub mod models;
pub mod scraper;
pub mod session;
pub mod user_agents;

pub use client::{VintedApi, VintedClient};
pub use endpoints::{ApiRequest, ItemEndpoint, Params};
pub use models::{Brand, BundleDiscount, Discount, HighResolution, Image, Item, Media, User};
pub use scraper::VintedScraper;
pub use session::{Credential, SessionManager, Sleeper, TokioSleeper};
