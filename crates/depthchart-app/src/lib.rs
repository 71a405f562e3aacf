// Depth chart application: configuration, the league session, text views
// and the interactive command loop behind the `depthchart` binary.

pub mod app;
pub mod config;
pub mod render;
pub mod session;
