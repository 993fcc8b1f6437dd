pub mod db;
pub mod news;
pub mod server;
pub mod services;
pub mod web;
