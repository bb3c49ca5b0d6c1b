/// `<_image>`: rasterize pixel data into plain groups at compile time
use base64::Engine;
use image::imageops::FilterType;
use image::{DynamicImage, Rgba};
use std::path::Path;

use crate::compiler::node::{format_number, ComponentNode, PropertyValue};
use crate::compiler::registry::Attributes;
use crate::error::{Error, Result};

/// Largest grid the rasterizer emits per side when no size is given.
pub const MAX_CELLS: u32 = 64;
/// Hard limit per side, explicit sizes included.
pub const MAX_GRID_SIDE: u32 = MAX_CELLS * 4;
const DEFAULT_PIXEL_SIZE: f64 = 4.0;

/// Build a `Group` tree reproducing the image referenced by the `src`
/// attribute. Relative paths resolve against `base_dir`.
pub fn rasterize(attributes: &Attributes, base_dir: Option<&Path>) -> Result<ComponentNode> {
    let src = attributes.get("src").map(String::as_str).unwrap_or_default();
    let image_error = |message: String| Error::Image {
        src: truncate(src),
        message,
    };
    if src.is_empty() {
        return Err(image_error("missing src attribute".to_string()));
    }

    let decoded = load(src, base_dir).map_err(image_error)?;
    let (width, height) = grid_size(attributes, decoded.width(), decoded.height())
        .map_err(image_error)?;
    let pixel_size = match attributes.get("pixel-size") {
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|size| *size > 0.0)
            .ok_or_else(|| image_error(format!("invalid pixel-size {:?}", raw)))?,
        None => DEFAULT_PIXEL_SIZE,
    };

    let pixels = image::imageops::resize(&decoded.to_rgba8(), width, height, FilterType::Nearest);
    log::debug!("rasterizing {}x{} image at {}px per cell", width, height, pixel_size);

    let mut root = ComponentNode::new("Group")
        .with_property(
            "Anchor",
            anchor(Some(f64::from(width) * pixel_size), f64::from(height) * pixel_size),
        )
        .with_property("LayoutMode", PropertyValue::Expression("Top".to_string()));

    for y in 0..height {
        let mut row = ComponentNode::new("Group")
            .with_property("Anchor", anchor(None, pixel_size))
            .with_property("LayoutMode", PropertyValue::Expression("Left".to_string()));

        let mut x = 0;
        while x < width {
            let color = *pixels.get_pixel(x, y);
            let mut run = 1;
            while x + run < width && *pixels.get_pixel(x + run, y) == color {
                run += 1;
            }

            let mut cell = ComponentNode::new("Group")
                .with_property("Anchor", anchor(Some(f64::from(run) * pixel_size), pixel_size));
            if color[3] > 0 {
                cell.set_property("Background", PropertyValue::Color(hex_color(color)));
            }
            row.add_child(cell);
            x += run;
        }

        root.add_child(row);
    }

    Ok(root)
}

fn anchor(width: Option<f64>, height: f64) -> PropertyValue {
    let mut entries = Vec::new();
    if let Some(width) = width {
        entries.push(("Width", PropertyValue::Number(width)));
    }
    entries.push(("Height", PropertyValue::Number(height)));
    PropertyValue::object(entries)
}

fn load(src: &str, base_dir: Option<&Path>) -> std::result::Result<DynamicImage, String> {
    if let Some(data) = src.strip_prefix("data:") {
        let (_, payload) = data
            .split_once("base64,")
            .ok_or_else(|| "only base64 data URIs are supported".to_string())?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| format!("invalid base64 payload: {}", e))?;
        return image::load_from_memory(&bytes).map_err(|e| e.to_string());
    }

    let path = match base_dir {
        Some(dir) if Path::new(src).is_relative() => dir.join(src),
        _ => Path::new(src).to_path_buf(),
    };
    image::open(&path).map_err(|e| format!("{}: {}", path.display(), e))
}

/// Target grid size. A single given dimension keeps the aspect ratio; with
/// neither given the native size is used, scaled down to [`MAX_CELLS`].
/// Anything larger than [`MAX_GRID_SIDE`] per side is rejected.
fn grid_size(
    attributes: &Attributes,
    native_width: u32,
    native_height: u32,
) -> std::result::Result<(u32, u32), String> {
    let dimension = |name: &str| -> std::result::Result<Option<u32>, String> {
        match attributes.get(name) {
            Some(raw) => raw
                .trim()
                .trim_end_matches("px")
                .parse::<u32>()
                .ok()
                .filter(|v| *v > 0)
                .map(Some)
                .ok_or_else(|| format!("invalid {} {:?}", name, raw)),
            None => Ok(None),
        }
    };

    let native_width = native_width.max(1);
    let native_height = native_height.max(1);
    let scaled = |value: u32, from: u32, to: u32| -> u32 {
        let cells = ((u64::from(value) * u64::from(to)) / u64::from(from)).max(1);
        u32::try_from(cells).unwrap_or(u32::MAX)
    };

    let size = match (dimension("width")?, dimension("height")?) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, scaled(w, native_width, native_height)),
        (None, Some(h)) => (scaled(h, native_height, native_width), h),
        (None, None) => {
            let longest = native_width.max(native_height);
            if longest <= MAX_CELLS {
                (native_width, native_height)
            } else {
                (
                    scaled(MAX_CELLS, longest, native_width),
                    scaled(MAX_CELLS, longest, native_height),
                )
            }
        }
    };

    if size.0 > MAX_GRID_SIDE || size.1 > MAX_GRID_SIDE {
        return Err(format!(
            "{}x{} cells exceeds the {}x{} limit",
            size.0, size.1, MAX_GRID_SIDE, MAX_GRID_SIDE
        ));
    }
    Ok(size)
}

fn hex_color(Rgba([r, g, b, a]): Rgba<u8>) -> String {
    if a == 255 {
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    } else {
        let alpha = (f64::from(a) / 255.0 * 100.0).round() / 100.0;
        format!("#{:02x}{:02x}{:02x}({})", r, g, b, format_number(alpha))
    }
}

fn truncate(src: &str) -> String {
    if src.len() > 48 {
        let cut = (0..=48).rev().find(|i| src.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &src[..cut])
    } else {
        src.to_string()
    }
}
