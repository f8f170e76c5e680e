//! `velo-network` — road network, versioned edge state, cost, and routing.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                        |
//! |-------------|-----------------------------------------------------------------|
//! | [`network`] | `RoadNetwork` (forward/reverse CSR + R-tree), `RoadNetworkBuilder` |
//! | [`version`] | `GraphVersion`, `VersionDraft`, `VersionTable`, `EdgeState`     |
//! | [`cost`]    | `CostModel`: length × traffic × class penalty, `∞` if closed    |
//! | [`router`]  | `Router` trait, `Route`, `DijkstraRouter`, `SearchDeadline`     |
//! | [`loader`]  | `load_network_csv`, `load_network_reader`                       |
//! | [`error`]   | `NetworkError`, `NetworkResult<T>`                              |

pub mod cost;
pub mod error;
pub mod loader;
pub mod network;
pub mod router;
pub mod version;


pub use cost::CostModel;
pub use error::{NetworkError, NetworkResult};
pub use loader::{LoadedNetwork, load_network_csv, load_network_reader};
pub use network::{EdgeSpec, RoadNetwork, RoadNetworkBuilder, default_safety_score};
pub use router::{DijkstraRouter, Route, Router, SearchDeadline};
pub use version::{EdgeState, GraphVersion, VersionDraft, VersionTable};
