pub mod models;
pub mod service;

mod repository;
