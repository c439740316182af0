// ─── Lambda Loader Core ───
// Resolves, verifies and caches Lambda Client builds from a Maven repository,
// and keeps the loader itself up to date.
//
// Architecture:
//   core/
//     maven/      — Artifact identity, metadata parsing, repository resolver
//     downloader/ — `Fetch` trait + reqwest-backed downloader
//     cache/      — MD5-verified single-slot artifact cache
//     version/    — Channel-aware version controller (resolve + cache)
//     update/     — Self-update with backup/restore
//     host/       — fabric.mod.json, nested jars, host bootstrap
//     startup     — Update check → client load sequence
//     config      — modules.json settings + runtime options

pub mod cache;
pub mod config;
pub mod downloader;
pub mod error;
pub mod host;
pub mod http;
pub mod logging;
pub mod maven;
pub mod startup;
pub mod update;
pub mod version;
