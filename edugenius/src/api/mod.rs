//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for the conversation endpoints and the landing page
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - `POST /chat`: multi-turn text chat answered with text and speech
//! - `POST /voice-input`: transcription of a recorded clip
//! - `POST /document-chat`: a question about an uploaded image or document
//!
//! All endpoints are documented with `utoipa`; the Scalar UI is served at `/docs`.

pub mod handlers;
pub mod models;
