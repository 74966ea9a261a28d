//! Folio Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `LocalFolder`, `LocalDocument`, `RequestContext`
//! - **Use cases** - `BrowseRemoteUseCase`, `ManageFoldersUseCase`, `ManageDocumentsUseCase`
//! - **Port definitions** - Traits for adapters: `IRemoteStorage`, `IFolderStore`,
//!   `IDocumentStorage`, `ICredentialStore`, `ITextExtractor`
//! - **Configuration** - The YAML-backed [`config::Config`] passed to every adapter
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
