pub mod url_service;
pub mod visit_service;

pub use url_service::UrlService;
pub use visit_service::VisitService;
