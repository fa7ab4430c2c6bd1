//! # notesync
//!
//! Note synchronization and publish reconciliation for editors acting as
//! clients of a remote note service.
//!
//! notesync keeps an in-memory picture of the account (notebooks, note
//! metadata, tag names), renders notes as markdown documents with a small
//! front-matter header, tracks attachments staged against open documents,
//! and decides on publish whether a document creates a new note or updates
//! the one it came from, merging local and server attachments.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────────────────┐   ┌──────────────┐
//! │ EditorHost   │──▶│ Workbench (commands)         │──▶│ NoteService  │
//! │ pickers/docs │   │  Session                     │   │ (remote)     │
//! └──────────────┘   │   ├─ SyncCache               │   └──────────────┘
//!                    │   ├─ BindingRegistry         │
//!                    │   └─ publish reconciler      │──▶ ContentCodec
//!                    └──────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy and command outcomes |
//! | [`models`] | Notebook, note, tag and attachment types |
//! | [`frontmatter`] | Document header parsing and rendering |
//! | [`codec`] | Body ↔ markup conversion seam and resource references |
//! | [`service`] | Remote note service seam |
//! | [`memory`] | In-memory note service |
//! | [`cache`] | Synchronization cache |
//! | [`bindings`] | Document bindings and attachment staging |
//! | [`publish`] | Create-vs-update reconciliation |
//! | [`session`] | Session-scoped context |
//! | [`host`] | Editor host seam |
//! | [`commands`] | Editor commands |

pub mod bindings;
pub mod cache;
pub mod codec;
pub mod commands;
pub mod config;
pub mod error;
pub mod frontmatter;
pub mod host;
pub mod memory;
pub mod models;
pub mod publish;
pub mod service;
pub mod session;
