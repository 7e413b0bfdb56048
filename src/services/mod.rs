//! External collaborator contracts and their production clients
//!
//! Each collaborator is a narrow trait; pipeline code only ever sees the
//! trait, so tests substitute scripted implementations. The production
//! clients are thin reqwest wrappers that degrade rather than propagate:
//! geocoding returns `None` on any failure, weather falls back to a
//! constant, and store writes are fire-and-forget at their call sites.

mod geo;
mod store;
mod weather;

pub use geo::{GeoService, GoogleMapsClient, ResolvedPlace};
pub use store::{JourneyStore, StoreError, SupabaseStore};
pub use weather::{OpenWeatherClient, WeatherService};
