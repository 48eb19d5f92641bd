//! # ibclient - transport HTTP des players InfoBerry
//!
//! - [`InfoBerryClient`] : appels `register`, `snapshot`, `ping` sur le serveur
//! - [`SnapshotSource`] : abstraction utilisée par le poller
//! - [`Poller`] : tâche qui transmet chaque résultat de poll au moteur
//!
//! Les erreurs HTTP sont converties en [`ibengine::FetchError`] : jamais
//! fatales, le moteur garde son dernier état valide.

pub mod client;
pub mod error;
pub mod poller;
pub mod source;

pub use client::{ClientBuilder, InfoBerryClient};
pub use error::{Error, Result};
pub use poller::Poller;
pub use source::SnapshotSource;
