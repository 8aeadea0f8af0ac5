//! Request handlers

pub mod audit;
pub mod campaigns;
pub mod health;
pub mod organizations;
pub mod templates;
pub mod track;
pub mod training;
