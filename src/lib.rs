pub mod audio;
pub mod auth;
pub mod aws_clients;
pub mod config;
pub mod domain;
pub mod edit;
pub mod errors;
pub mod handlers;
pub mod ids;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod startup;
pub mod state;
pub mod storage;
pub mod validation;
