//! Statistical hypothesis testing for differential abundance.


pub use two_sample::{average_ranks, TestStatistic, TwoSampleTest};
