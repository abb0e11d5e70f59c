// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::too_many_lines)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Volume and segmentation data pipeline for progressive EM and bioimage
//! viewing.
//!
//! volseg talks to a volume server, decodes density volumes and lattice
//! segmentations, and keeps a scene graph in sync with what the user
//! selected: lattice segments, mesh segments or z-score threshold masks.
//!
//! # Key entry points
//!
//! - [`session::Session`] - loads entries and applies segment selections
//! - [`api::VolumeServer`] - the server collaborator, with an HTTP
//!   implementation behind the `http` feature
//! - [`scene::SceneGraph`] - the scene collaborator, with
//!   [`scene::HeadlessScene`] as an in-memory graph
//! - [`options::Options`] - runtime configuration (API, volume, segments,
//!   image, loading)
//!
//! # Architecture
//!
//! Loads are split into a fetch phase that does every request and decode
//! without touching the session, and an apply phase that commits one scene
//! batch per branch. A [`session::EntryLoader`] runs the fetch phase on a
//! background thread; load generations make sure only the newest load is
//! applied, and only once.

pub mod api;
pub mod entry;
pub mod error;
pub mod metadata;
pub mod options;
pub mod scene;
pub mod segmentation;
pub mod session;
pub mod table;
pub mod util;
pub mod volume;

pub use entry::{EntryId, Source};
pub use error::VolsegError;
pub use session::{LoadMode, SegmentFilter, Session, ViewState};
