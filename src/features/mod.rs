pub mod api;
pub mod auth;
pub mod dashboard;
pub mod overlay;
pub mod pages;
pub mod pdf;
pub mod placement;
pub mod signature;
pub mod storage;
