pub mod short_url_repository;
pub mod visit_repository;

pub use short_url_repository::ShortUrlRepository;
pub use visit_repository::VisitRepository;

#[cfg(test)]
pub use short_url_repository::MockShortUrlRepository;
#[cfg(test)]
pub use visit_repository::MockVisitRepository;
