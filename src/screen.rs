//! Screen sampling via ImageMagick `import`.

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use image::DynamicImage;

use crate::config::Region;
use crate::subprocess;

/// Source of status-region frames.
pub trait ScreenSource {
    fn capture(&self, region: &Region) -> Result<DynamicImage>;
}

/// `import -window root -crop WxH+X+Y png:-` on the X11 root window.
pub struct ImportGrabber {
    timeout: Duration,
}

impl Default for ImportGrabber {
    fn default() -> Self {
        ImportGrabber {
            timeout: Duration::from_secs(5),
        }
    }
}

/// ImageMagick geometry string for a region.
pub fn crop_geometry(region: &Region) -> String {
    format!(
        "{}x{}{:+}{:+}",
        region.width, region.height, region.left, region.top
    )
}

impl ScreenSource for ImportGrabber {
    fn capture(&self, region: &Region) -> Result<DynamicImage> {
        let out = subprocess::run_checked(
            Command::new("import")
                .args(["-silent", "-window", "root", "-crop"])
                .arg(crop_geometry(region))
                .arg("+repage")
                .arg("png:-"),
            self.timeout,
        )
        .context("screen capture failed")?;
        image::load_from_memory(&out.stdout).context("capture was not a decodable PNG")
    }
}
