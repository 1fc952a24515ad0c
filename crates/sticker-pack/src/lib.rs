//! Sticker Pack - project workflow from theme to exported archive
//!
//! Drives a project through draft generation, image generation,
//! background removal and export. Generated artifacts are normalized onto
//! a fixed transparent canvas before they are stored, and exports are
//! written as ZIP archives of `NN.png` entries.

pub mod canvas;
pub mod credentials;
pub mod export;
pub mod fetch;
pub mod model;
pub mod repository;
pub mod workflow;

pub use canvas::{Canvas, Placement, STICKER_HEIGHT, STICKER_WIDTH};
pub use credentials::{CredentialStore, Credentials};
pub use export::{ExportArtifact, ExportBundler};
pub use fetch::{ArtifactFetcher, HttpFetcher};
pub use model::*;
pub use repository::{MemoryRepository, Repository};
pub use workflow::{ExportOutcome, ProjectLocks, Workflow};
