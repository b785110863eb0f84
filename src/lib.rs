pub mod configuration;
pub mod domain;
pub mod realtime;
pub mod repository;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod thread_view;
pub mod utils;
