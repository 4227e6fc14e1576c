pub mod short_url;
pub mod visit;

pub use short_url::{NewShortUrl, ShortUrl};
pub use visit::{NewVisit, Visit};
