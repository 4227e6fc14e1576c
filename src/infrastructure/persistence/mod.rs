pub mod pg_short_url_repository;
pub mod pg_visit_repository;

pub use pg_short_url_repository::PgShortUrlRepository;
pub use pg_visit_repository::PgVisitRepository;
