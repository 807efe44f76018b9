//! # autobuild - Go build automation
//!
//! autobuild finds every Go program in a source tree, then tests,
//! cross-compiles and checksums each one against a project-local Go
//! toolchain.
//!
//! ## Quick Start
//!
//! ```bash
//! # Build everything under the current directory with the default profile
//! autobuild
//!
//! # Use the `release` profile from autobuild.yaml
//! autobuild --profile release path/to/tree
//! ```
//!
//! ## Module Organization
//!
//! - [`walker`] - Discovery of `main.go` entry points and their modules
//! - [`build`] - Concurrent test, cross-build and checksum orchestration
//! - [`config`] - Configuration parsing (`autobuild.yaml`)
//! - [`toolchain`] - Go download, install and tool packages

/// Concurrent stage orchestration.
pub mod build;

/// Profiles and environment files.
pub mod config;

pub mod project;

/// Project-local Go toolchain.
pub mod toolchain;

/// Console output and summary tables.
pub mod ui;

/// Source tree discovery.
pub mod walker;
