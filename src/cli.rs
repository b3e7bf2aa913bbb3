use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::color::Hsv;
use crate::compose::Region;
use crate::filters::DEFAULT_BLUR_SIGMA;
use crate::geometry::{Point, TargetSize};
use crate::session::parse_point;
use crate::shapes::{DEFAULT_EPSILON_FACTOR, DEFAULT_MIN_AREA};

#[derive(Parser, Debug)]
#[command(name = "cv-demos")]
#[command(version, about = "Shape classification, perspective warping and filter demos")]
pub struct Cli {
    /// Show processing details
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Detect contours and label them by shape
    Shapes(ShapesArgs),
    /// Warp a picked quadrilateral onto a rectangle
    Warp(WarpArgs),
    /// Blur, Canny, dilate and erode an image
    Edges(EdgesArgs),
    /// Keep only pixels inside an HSV range
    Mask(MaskArgs),
    /// Tile several images into one grid
    Grid(GridArgs),
    /// Resize, crop and draw on an image
    Ops(OpsArgs),
}

#[derive(Args, Debug)]
pub struct ShapesArgs {
    /// Input image path
    #[arg(required = true)]
    pub input: PathBuf,

    /// Annotated output path [default: input_shapes.png]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Contours enclosing at most this many px² are ignored
    #[arg(long, default_value_t = DEFAULT_MIN_AREA)]
    pub min_area: f64,

    /// Polygon approximation tolerance as a fraction of the perimeter
    #[arg(long, default_value_t = DEFAULT_EPSILON_FACTOR)]
    pub epsilon: f64,
}

#[derive(Args, Debug)]
pub struct WarpArgs {
    /// Input image path
    #[arg(required = true)]
    pub input: PathBuf,

    /// Source corner as X,Y; give four, in order top-left, top-right,
    /// bottom-left, bottom-right
    #[arg(short, long = "point", value_parser = parse_point, conflicts_with = "interactive")]
    pub points: Vec<Point>,

    /// Read picks and commands from stdin (x,y | w | r | l | q)
    #[arg(short, long)]
    pub interactive: bool,

    /// Output size as WIDTHxHEIGHT
    #[arg(short, long, default_value = "500x500", value_parser = parse_size)]
    pub size: TargetSize,

    /// Use bicubic instead of bilinear resampling
    #[arg(long)]
    pub bicubic: bool,

    /// Output path [default: input_warped.png]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also save the source image with the picked points marked
    #[arg(long)]
    pub preview: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EdgesArgs {
    /// Input image path
    #[arg(required = true)]
    pub input: PathBuf,

    /// Directory for the stage images [default: next to the input]
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Gaussian blur sigma
    #[arg(long, default_value_t = DEFAULT_BLUR_SIGMA)]
    pub blur_sigma: f32,
}

#[derive(Args, Debug)]
pub struct MaskArgs {
    /// Input image path
    #[arg(required = true)]
    pub input: PathBuf,

    /// Lower HSV bound as H,S,V (H 0-179)
    #[arg(long, default_value = "0,0,0", value_parser = parse_hsv)]
    pub lower: Hsv,

    /// Upper HSV bound as H,S,V (H 0-179)
    #[arg(long, default_value = "179,255,255", value_parser = parse_hsv)]
    pub upper: Hsv,

    /// Masked output path [default: input_masked.png]
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct GridArgs {
    /// Images in row-major order; the first sets the cell size
    #[arg(required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    #[arg(long)]
    pub rows: usize,

    #[arg(long)]
    pub cols: usize,

    /// Output path [default: first input_grid.png]
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct OpsArgs {
    /// Input image path
    #[arg(required = true)]
    pub input: PathBuf,

    /// Resize target as WIDTHxHEIGHT
    #[arg(long, default_value = "300x200", value_parser = parse_size)]
    pub size: TargetSize,

    /// Crop region as X,Y,WIDTH,HEIGHT
    #[arg(long, default_value = "100,50,200,150", value_parser = parse_region)]
    pub crop: Region,

    /// Directory for the result images [default: next to the input]
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

/// `<dir>/<stem>_<suffix>.png`, where `dir` defaults to the input's directory
pub fn derived_path(input: &Path, dir: Option<&Path>, suffix: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let parent: &Path = match dir {
        Some(dir) => dir,
        None => input.parent().unwrap_or(Path::new(".")),
    };
    parent.join(format!("{}_{}.png", stem, suffix))
}

fn parse_size(s: &str) -> Result<TargetSize, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("Invalid size format '{}', expected WIDTHxHEIGHT", s))?;

    let width: u32 = w
        .trim()
        .parse()
        .map_err(|_| format!("Invalid width value: {}", w))?;
    let height: u32 = h
        .trim()
        .parse()
        .map_err(|_| format!("Invalid height value: {}", h))?;

    TargetSize::new(width, height).map_err(|e| e.to_string())
}

fn parse_region(s: &str) -> Result<Region, String> {
    let values: Vec<u32> = s
        .split(',')
        .map(|part| {
            part.trim()
                .parse()
                .map_err(|_| format!("Invalid region value: {}", part))
        })
        .collect::<Result<_, _>>()?;

    match values[..] {
        [x, y, width, height] => Ok(Region::new(x, y, width, height)),
        _ => Err(format!("Invalid region format '{}', expected X,Y,WIDTH,HEIGHT", s)),
    }
}

fn parse_hsv(s: &str) -> Result<Hsv, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("Invalid HSV format '{}', expected H,S,V", s));
    }

    let channel = |name: &str, value: &str, max: u8| -> Result<u8, String> {
        let v: u8 = value
            .parse()
            .map_err(|_| format!("Invalid {} value: {}", name, value))?;
        if v > max {
            return Err(format!("{} must be at most {}", name, max));
        }
        Ok(v)
    };

    Ok(Hsv::new(
        channel("hue", parts[0], 179)?,
        channel("saturation", parts[1], 255)?,
        channel("value", parts[2], 255)?,
    ))
}
