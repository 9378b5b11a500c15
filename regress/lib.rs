#![deny(dead_code)]
#![deny(unused_imports)]

pub mod basis;
pub mod compare;
pub mod cv;
pub mod data;
pub mod family;
pub mod fit;
pub mod loess;
pub mod pipeline;
pub mod report;
pub mod smoothing;

#[cfg(test)]
mod test_fixtures;
