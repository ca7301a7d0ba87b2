//! Output generation for the processed post list.
//!
//! # Submodules
//!
//! - [`json`]: Writes the summary and full post lists as JSON
//! - [`markdown`]: Renders the same two views as Markdown pages
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! ├── recent.json   # first N posts (summary view)
//! └── posts.json    # every post
//!
//! markdown_output_dir/
//! ├── index.md      # first N posts (summary view)
//! └── posts.md      # every post
//! ```

pub mod json;
pub mod markdown;
