pub mod api;
pub mod backoff;
pub mod calendar;
pub mod config;
pub mod cpf;
pub mod entities;
pub mod error;
pub mod finance;
pub mod integrations;
pub mod metrics;
pub mod migrator;
pub mod onboarding;
pub mod routes;
pub mod telemetry;
pub mod validation;
pub mod worker;

pub use sea_orm;
