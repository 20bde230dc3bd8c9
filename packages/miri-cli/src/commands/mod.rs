pub mod capture;
pub mod info;
