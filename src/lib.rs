//! Hashtag feed scraper.
//!
//! Drives a headless browser through a social-media hashtag feed, harvests
//! post tiles, and visits each post to read its timestamp, popularity count
//! and media type.

pub mod browser;
pub mod collector;
pub mod config;
pub mod constants;
