// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Textwerk: collaborator abstractions and platform bridges.
//!
//! The scan pipeline reaches every device feature through the traits in
//! [`traits`]. This crate also ships the bridges that implement them outside
//! a phone SDK: a desktop bridge, a stub that reports everything unavailable,
//! a local file writer, and (with the `mock` feature) scripted fakes for tests.

pub mod fs;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod stub;
pub mod traits;

#[cfg(not(any(target_os = "ios", target_os = "android")))]
pub mod desktop;

pub use fs::LocalFileWriter;
pub use traits::*;

/// Bridge type selected for the build target.
#[cfg(not(any(target_os = "ios", target_os = "android")))]
pub type NativeBridge = desktop::DesktopBridge;

/// Bridge type selected for the build target. Mobile SDK bindings live out of
/// tree; in-tree mobile builds degrade to the stub.
#[cfg(any(target_os = "ios", target_os = "android"))]
pub type NativeBridge = stub::StubBridge;

/// Construct the bridge for the target operating system.
///
/// `pictures_dir` is where the desktop bridge copies saved images.
pub fn platform_bridge(pictures_dir: std::path::PathBuf) -> NativeBridge {
    #[cfg(not(any(target_os = "ios", target_os = "android")))]
    {
        desktop::DesktopBridge::new(pictures_dir)
    }
    #[cfg(any(target_os = "ios", target_os = "android"))]
    {
        let _ = pictures_dir;
        stub::StubBridge
    }
}
