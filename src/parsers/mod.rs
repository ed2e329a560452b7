//! Offline parsing of page sources captured by the browser.
//!
//! Everything here works on strings so it can be exercised without a
//! WebDriver server.

pub mod html;
pub mod manifest;
pub mod text;

#[cfg(test)]
mod tests;
