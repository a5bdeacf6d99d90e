//! Shared fixtures for the DevAIntArt workspace benchmarks and end-to-end
//! tests.
pub mod bench_support;
pub mod harness;

pub use bench_support::QuotaBenchFixture;
pub use harness::{find_free_port, random_artist_name, svg_of_size, GalleryHarness};
