//! Local mirror of the crawled site
//!
//! - [`LinkRewriter`] maps links found inside HTML and CSS to mirror paths
//! - [`MirrorWriter`] stores resources at paths derived from their URL
//! - [`MirrorFs`] is the filesystem seam, with [`LocalFs`] as the default
//!
//! The HTML rewrite rule and [`local_path`] share their query and index
//! handling, so a rewritten link to an extensionless page names the file the
//! writer produces for it.

mod fs;
mod rewrite;
mod writer;

pub use fs::{LocalFs, MirrorFs};
pub use rewrite::{Link, LinkRewriter};
pub use writer::{dated_store_path, local_path, MirrorWriter};
