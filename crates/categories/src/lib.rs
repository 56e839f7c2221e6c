pub mod handler;
pub mod models;
pub mod service;

mod goal_repository;
mod repository;
