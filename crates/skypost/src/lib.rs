//! Text cross-posts to Bluesky over XRPC.
//!
//! ```rust,no_run
//! use skypost::{BlueskyClient, Credentials};
//!
//! # async fn demo() -> Result<(), skypost::BlueskyError> {
//! let creds = Credentials::new("river.bsky.social", "xxxx-xxxx-xxxx-xxxx");
//! let client = BlueskyClient::new("https://bsky.social").with_credentials(creds.clone());
//!
//! let account = client.verify(&creds).await?;
//! let post = client.post("caught the last light").await?;
//! println!("{} posted {}", account.handle, post.uri);
//! # Ok(())
//! # }
//! ```

mod client;
mod text;

pub use client::{Account, BlueskyClient, BlueskyError, Credentials, PostRef};
pub use text::truncate_text;
