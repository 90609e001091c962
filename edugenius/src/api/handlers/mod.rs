//! HTTP request handlers.
//!
//! Handlers only deal with extraction and response shaping; the request flows live in
//! [`crate::conversation`]. They return [`crate::errors::Error`], which converts into a JSON
//! `{ "detail": ... }` body with the matching status code.
//!
//! - [`chat`]: text chat
//! - [`voice`]: voice transcription
//! - [`documents`]: questions about an uploaded document
//! - [`pages`]: landing page and embedded static assets

pub mod chat;
pub mod documents;
pub mod multipart;
pub mod pages;
pub mod voice;
