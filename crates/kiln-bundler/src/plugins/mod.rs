//! Output plugins: favicons and generated pages.
//!
//! Stylesheet extraction has no module here; the compiler concatenates what
//! the `css-extract` step collected per bundle.

pub mod favicon;
pub mod html;

pub use favicon::Favicons;
pub use html::PageAssets;
