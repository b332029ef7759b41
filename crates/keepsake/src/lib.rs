//! Local storage for shared moments.
//!
//! - [`MediaStore`]: content-addressed stills and clips on disk
//! - [`MomentLedger`]: the moment records with their likes and comments, one JSON file
//! - [`LocalSink`]: the [`shutter::SubmissionSink`] that ties them together
//!   and optionally cross-posts through a [`CrossPoster`]
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use keepsake::{Author, LocalSink, MediaStore, MomentLedger, DEFAULT_FEED_SIZE};
//!
//! # fn demo() -> keepsake::Result<()> {
//! let media = Arc::new(MediaStore::open("/var/lib/moments/media")?);
//! let ledger = Arc::new(MomentLedger::open("/var/lib/moments/moments.json")?);
//! let sink = LocalSink::new(media, ledger.clone()).with_author(Author::new("u1", "River"));
//!
//! for moment in ledger.recent(DEFAULT_FEED_SIZE) {
//!     println!("{} ({}s) {}", moment.caption, moment.capture_seconds, moment.media);
//! }
//! # let _ = sink;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod hash;
pub mod ledger;
pub mod sink;
pub mod store;

pub use error::{Result, StoreError};
pub use hash::{HashError, MediaHash};
pub use ledger::{Author, Comment, Moment, MomentLedger, DEFAULT_FEED_SIZE};
pub use sink::{CrossPostError, CrossPoster, ExternalRef, LocalSink};
pub use store::{MediaMetadata, MediaStore, StoredMedia};
