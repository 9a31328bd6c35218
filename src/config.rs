//! Command-line configuration.

use std::path::PathBuf;

use clap::Parser;

/// Logical width of the window.
pub const WINDOW_WIDTH: u32 = 640;

/// Logical height of the window.
pub const WINDOW_HEIGHT: u32 = 480;

/// Title shown in the window decoration.
pub const WINDOW_TITLE: &str = "Scene Viewer";

/// Renders a textured pyramid and cube and lets you fly around them.
///
/// W/A/S/D move, the mouse looks around, the wheel zooms and Escape quits.
#[derive(Debug, Clone, PartialEq, Parser)]
#[command(version)]
pub struct SceneConfig {
    /// Filepath of the first texture, applied to the pyramid.
    #[arg(long = "texture1_filepath", default_value = "texture1.bmp")]
    pub texture1_filepath: PathBuf,

    /// Filepath of the second texture, applied to the cube.
    #[arg(long = "texture2_filepath", default_value = "texture2.bmp")]
    pub texture2_filepath: PathBuf,

    /// Render filled polygons instead of wireframe.
    #[arg(long)]
    pub fill: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            texture1_filepath: PathBuf::from("texture1.bmp"),
            texture2_filepath: PathBuf::from("texture2.bmp"),
            fill: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_bare_invocation() {
        let config = SceneConfig::try_parse_from(["scene-viewer"]).unwrap();
        assert_eq!(config, SceneConfig::default());
    }

    #[test]
    fn texture_paths_and_fill_are_parsed() {
        let config = SceneConfig::try_parse_from([
            "scene-viewer",
            "--texture1_filepath",
            "assets/brick.bmp",
            "--texture2_filepath=assets/stone.png",
            "--fill",
        ])
        .unwrap();
        assert_eq!(config.texture1_filepath, PathBuf::from("assets/brick.bmp"));
        assert_eq!(config.texture2_filepath, PathBuf::from("assets/stone.png"));
        assert!(config.fill);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(SceneConfig::try_parse_from(["scene-viewer", "--resizable"]).is_err());
    }

    #[test]
    fn command_definition_is_consistent() {
        use clap::CommandFactory;
        SceneConfig::command().debug_assert();
    }
}
