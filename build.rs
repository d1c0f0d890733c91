use image::GenericImageView;
use std::env;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Sprite height on the panel; width follows the aspect ratio
const SPRITE_HEIGHT: u32 = 200;
/// Portrait panel width, the widest a sprite may get
const SPRITE_MAX_WIDTH: u32 = 480;
/// Pixels darker than this become ink
const THRESHOLD: u8 = 128;

/// File stem in `sprites/` and constant name in the generated table
const SPRITES: [(&str, &str); 8] = [
    ("sleeping", "SLEEPING"),
    ("idle", "IDLE"),
    ("alert", "ALERT"),
    ("thinking", "THINKING"),
    ("talking", "TALKING"),
    ("working", "WORKING"),
    ("excited", "EXCITED"),
    ("error", "ERROR"),
];

/// Packed 1-bit bitmap, MSB first, bit set = ink
struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Bitmap {
    fn blank(width: u32, height: u32) -> Self {
        let data = vec![0u8; (width.div_ceil(8) * height) as usize];
        Self {
            width,
            height,
            data,
        }
    }

    fn set(&mut self, x: u32, y: u32) {
        let byte_index = (y * self.width.div_ceil(8) + x / 8) as usize;
        self.data[byte_index] |= 0x80 >> (x % 8);
    }
}

/// Convert a PNG to a 1-bit bitmap, scaled to `SPRITE_HEIGHT`
fn convert_image_to_binary(input_path: &Path) -> Result<Bitmap, Box<dyn std::error::Error>> {
    let img = image::open(input_path)?;
    let (orig_width, orig_height) = img.dimensions();
    if orig_width == 0 || orig_height == 0 {
        return Err(format!("{} is empty", input_path.display()).into());
    }

    // Fit to height, preserving aspect ratio, never wider than the panel
    let ratio = orig_width as f32 / orig_height as f32;
    let mut new_height = SPRITE_HEIGHT;
    let mut new_width = ((SPRITE_HEIGHT as f32 * ratio).round() as u32).max(1);
    if new_width > SPRITE_MAX_WIDTH {
        new_width = SPRITE_MAX_WIDTH;
        new_height = ((SPRITE_MAX_WIDTH as f32 / ratio).round() as u32).max(1);
    }

    let resized = img.resize_exact(
        new_width,
        new_height,
        image::imageops::FilterType::Lanczos3,
    );

    // Transparent pixels count as white background
    let rgba = resized.to_rgba8();
    let mut bitmap = Bitmap::blank(new_width, new_height);
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let luma = (u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114) / 1000;
        let alpha = u32::from(a);
        let composited = (luma * alpha + 255 * (255 - alpha)) / 255;
        if composited < u32::from(THRESHOLD) {
            bitmap.set(x, y);
        }
    }
    Ok(bitmap)
}

/// Framed square with a cross, used when a sprite PNG is missing
fn placeholder() -> Bitmap {
    let size = SPRITE_HEIGHT;
    let border = 4;
    let mut bitmap = Bitmap::blank(size, size);
    for y in 0..size {
        for x in 0..size {
            let edge = x < border || y < border || x >= size - border || y >= size - border;
            let diagonal = x.abs_diff(y) < 2 || (x + y).abs_diff(size - 1) < 2;
            if edge || diagonal {
                bitmap.set(x, y);
            }
        }
    }
    bitmap
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }

    let out_dir = env::var("OUT_DIR")?;
    let manifest_dir = env::var("CARGO_MANIFEST_DIR")?;
    let sprite_dir = Path::new(&manifest_dir).join("sprites");
    println!("cargo:rerun-if-changed={}", sprite_dir.display());

    let mut table = String::new();
    writeln!(table, "// Generated by build.rs from sprites/*.png")?;

    for (stem, const_name) in SPRITES {
        let input = sprite_dir.join(format!("{stem}.png"));
        println!("cargo:rerun-if-changed={}", input.display());

        let bitmap = if input.exists() {
            match convert_image_to_binary(&input) {
                Ok(bitmap) => bitmap,
                Err(e) => {
                    println!("cargo:warning=Failed to convert {}: {}", input.display(), e);
                    placeholder()
                }
            }
        } else {
            println!(
                "cargo:warning=Sprite '{}' not found, using placeholder",
                input.display()
            );
            placeholder()
        };

        let output = Path::new(&out_dir).join(format!("sprite_{stem}.bin"));
        File::create(&output)?.write_all(&bitmap.data)?;

        writeln!(
            table,
            "pub const {const_name}: SpriteAsset = SpriteAsset {{ data: include_bytes!({:?}), width: {}, height: {} }};",
            output.display().to_string(),
            bitmap.width,
            bitmap.height,
        )?;
    }

    fs::write(Path::new(&out_dir).join("sprites.rs"), table)?;
    Ok(())
}
