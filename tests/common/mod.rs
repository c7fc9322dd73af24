#![allow(dead_code)]

pub use test_interface::*;

mod test_interface;
