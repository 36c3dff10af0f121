pub mod reports;
pub mod resolve;
pub mod run;
