use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use image::DynamicImage;
use tracing_subscriber::EnvFilter;

use cv_demos::cli::{
    derived_path, Command, EdgesArgs, GridArgs, MaskArgs, OpsArgs, ShapesArgs, WarpArgs,
};
use cv_demos::detection::to_grayscale;
use cv_demos::{
    annotate_points, annotate_shapes, apply_mask, create_grid, crop, draw_primitives, edge_map,
    in_range, load_image, resize, run_filter_chain, save_image, warp_perspective, Cli, EdgeOptions,
    HsvRange, Interpolation, PointCollector, ShapeClassifier, WarpSession,
};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();
}

fn load(path: &Path) -> Result<DynamicImage> {
    load_image(path).with_context(|| format!("Failed to load input: {:?}", path))
}

fn save(img: DynamicImage, path: &Path) -> Result<()> {
    save_image(&img, path).with_context(|| format!("Failed to save output: {:?}", path))
}

fn run_shapes(args: &ShapesArgs) -> Result<()> {
    let img = load(&args.input)?;

    let edges = edge_map(&img, &EdgeOptions::default());
    let classifier = ShapeClassifier::new(args.min_area, args.epsilon);
    let shapes = classifier.classify_edges(&edges);

    for shape in &shapes {
        println!(
            "{:<10} at ({}, {}) {}x{}  corners={} area={:.0}",
            shape.label,
            shape.bounds.x,
            shape.bounds.y,
            shape.bounds.width,
            shape.bounds.height,
            shape.polygon.len(),
            shape.area
        );
    }

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| derived_path(&args.input, None, "shapes"));
    let annotated = annotate_shapes(&img.to_rgba8(), &shapes);
    save(DynamicImage::ImageRgba8(annotated), &output_path)?;

    eprintln!("Found {} shapes", shapes.len());
    eprintln!("Saved annotated image: {:?}", output_path);
    Ok(())
}

fn run_warp(args: &WarpArgs) -> Result<()> {
    let img = load(&args.input)?;
    let rgba = img.to_rgba8();
    let interpolation = if args.bicubic {
        Interpolation::Bicubic
    } else {
        Interpolation::Bilinear
    };
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| derived_path(&args.input, None, "warped"));

    let picked = if args.interactive {
        eprintln!("Enter 4 corners as x,y (top-left, top-right, bottom-left, bottom-right).");
        eprintln!("Commands: 'w' warp, 'r' reset, 'l' list, 'q' quit.");

        let mut session = WarpSession::new(&rgba, args.size, interpolation);
        let stdin = io::stdin();
        let warps = session.run(stdin.lock(), |warped| {
            save(DynamicImage::ImageRgba8(warped.clone()), &output_path)?;
            eprintln!("Warp applied, saved: {:?}", output_path);
            Ok(())
        })?;

        if warps == 0 {
            eprintln!("No warp applied");
        }
        session.collector().points().to_vec()
    } else {
        let mut collector = PointCollector::new();
        for point in &args.points {
            collector
                .add_point(*point)
                .context("Too many --point arguments")?;
        }

        let warped = warp_perspective(&rgba, collector.points(), args.size, interpolation)
            .context("Failed to warp image")?;
        save(DynamicImage::ImageRgba8(warped), &output_path)?;

        eprintln!(
            "Saved warped image: {:?} ({}x{})",
            output_path, args.size.width, args.size.height
        );
        collector.points().to_vec()
    };

    if let Some(preview_path) = &args.preview {
        let marked = annotate_points(&rgba, &picked);
        save(DynamicImage::ImageRgba8(marked), preview_path)?;
        eprintln!("Saved point preview: {:?}", preview_path);
    }

    Ok(())
}

fn run_edges(args: &EdgesArgs) -> Result<()> {
    let img = load(&args.input)?;
    let gray = to_grayscale(&img.to_rgba8());
    let stages = run_filter_chain(&img.to_rgb8(), &gray, args.blur_sigma);

    let dir = args.out_dir.as_deref();
    let outputs = [
        ("blurred", DynamicImage::ImageRgb8(stages.blurred)),
        ("canny", DynamicImage::ImageLuma8(stages.edges)),
        ("dilated", DynamicImage::ImageLuma8(stages.dilated)),
        ("eroded", DynamicImage::ImageLuma8(stages.eroded)),
    ];

    for (suffix, stage) in outputs {
        let path = derived_path(&args.input, dir, suffix);
        save(stage, &path)?;
        eprintln!("Saved {}: {:?}", suffix, path);
    }

    Ok(())
}

fn run_mask(args: &MaskArgs) -> Result<()> {
    let img = load(&args.input)?;
    let rgb = img.to_rgb8();

    let range = HsvRange::new(args.lower, args.upper);
    let mask = in_range(&rgb, &range);
    let result = apply_mask(&rgb, &mask);

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| derived_path(&args.input, None, "masked"));
    let mask_path = derived_path(&output_path, None, "mask");

    save(DynamicImage::ImageLuma8(mask), &mask_path)?;
    save(DynamicImage::ImageRgb8(result), &output_path)?;

    eprintln!("Saved mask: {:?}", mask_path);
    eprintln!("Saved masked image: {:?}", output_path);
    Ok(())
}

fn run_grid(args: &GridArgs) -> Result<()> {
    let images = args
        .inputs
        .iter()
        .map(|path| load(path))
        .collect::<Result<Vec<_>>>()?;

    let grid = create_grid(&images, args.rows, args.cols).context("Failed to build grid")?;

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| derived_path(&args.inputs[0], None, "grid"));
    save(DynamicImage::ImageRgb8(grid), &output_path)?;

    eprintln!("Saved grid: {:?}", output_path);
    Ok(())
}

fn run_ops(args: &OpsArgs) -> Result<()> {
    let img = load(&args.input)?.to_rgb8();
    eprintln!("Image size: {}x{}", img.width(), img.height());

    let roi = crop(&img, args.crop).context("Failed to crop image")?;

    let dir = args.out_dir.as_deref();
    let outputs = [
        ("resized", resize(&img, args.size)),
        ("roi", roi),
        ("drawn", draw_primitives(&img)),
    ];

    for (suffix, result) in outputs {
        let path = derived_path(&args.input, dir, suffix);
        save(DynamicImage::ImageRgb8(result), &path)?;
        eprintln!("Saved {}: {:?}", suffix, path);
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Shapes(args) => run_shapes(args),
        Command::Warp(args) => run_warp(args),
        Command::Edges(args) => run_edges(args),
        Command::Mask(args) => run_mask(args),
        Command::Grid(args) => run_grid(args),
        Command::Ops(args) => run_ops(args),
    }
}
