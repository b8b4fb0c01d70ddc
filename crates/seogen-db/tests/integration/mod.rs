pub mod common;
mod page_store_tests;
