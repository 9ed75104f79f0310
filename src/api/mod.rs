pub mod appointment;
pub mod auth;
pub mod calendar;
pub mod crud;
pub mod customer;
pub mod finance;
pub mod hospitalization;
pub mod medical_record;
pub mod middleware;
pub mod onboarding;
pub mod pet;
pub mod product;
pub mod sale;
pub mod support;
pub mod tenant;
pub mod transport;
pub mod user;
