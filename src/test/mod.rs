pub mod utils;

mod stats;
