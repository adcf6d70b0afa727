//! Sun Study: a small viewer for studying sunlight on a tiled city model.
//!
//! - Loads a glTF/GLB model from a list of candidate paths, falling back in order
//! - Recolors the model's collections into base, context and site tiers
//! - Moves a point-light sun along a day circle driven by the time of day
//! - Free-fly camera (WASD/arrows, Q/E) with damped orbit controls

mod app;
mod assets;
mod config;
mod render;
mod scene;
mod ui;

fn main() {
    app::run();
}
