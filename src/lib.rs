pub mod bootstrap;
pub mod chat;
pub mod cli;
pub mod config;
pub mod doctor;
pub mod embedding;
pub mod error;
pub mod index;
pub mod model;
pub mod participant;
pub mod profiles;
pub mod provider;
pub mod responder;
pub mod retrieval;
pub mod retry;
pub mod runner;
pub mod scheduler;
pub mod telemetry;
