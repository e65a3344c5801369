mod common;
mod repository_tests;
mod sync_tests;
