//! Browser automation module
//!
//! Headless Chromium control through ChromiumOxide: session lifecycle,
//! page loading and settling, challenge detection, and screenshots.

pub mod capture;
pub mod controller;
pub mod navigation;
pub mod stealth;
pub mod verification;

pub use capture::{ScreenshotCapturer, Screenshots};
pub use controller::{with_session, BrowserConfig, BrowserController, PageHandle};
pub use navigation::{normalize_url, PageSettler, SettleOptions, SettleResult, WaitUntil};
pub use stealth::StealthMode;
