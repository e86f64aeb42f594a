pub mod authorize;
pub mod check;
pub mod run;
