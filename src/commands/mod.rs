pub mod run;
pub mod single;
