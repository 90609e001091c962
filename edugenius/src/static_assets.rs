//! Embedded frontend: the landing page template and the scripts and styles it loads.

use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "static/"]
pub struct Assets;

#[derive(RustEmbed)]
#[folder = "templates/"]
pub struct Templates;
