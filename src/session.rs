use std::io::BufRead;
use std::str::FromStr;

use anyhow::{Context, Result};
use image::RgbaImage;
use tracing::{info, warn};

use crate::error::VisionError;
use crate::geometry::{Point, TargetSize};
use crate::points::PointCollector;
use crate::transform::{warp_perspective, Interpolation};

/// One line of input to an interactive warp session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Pick a point (`x,y`, `x y` or `p x y`)
    Pick(Point),
    Warp,
    Reset,
    List,
    Quit,
}

impl FromStr for SessionCommand {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let line = s.trim();
        match line.to_ascii_lowercase().as_str() {
            "w" | "warp" => return Ok(SessionCommand::Warp),
            "r" | "reset" => return Ok(SessionCommand::Reset),
            "l" | "list" => return Ok(SessionCommand::List),
            "q" | "quit" => return Ok(SessionCommand::Quit),
            _ => {}
        }

        let coords = line
            .strip_prefix("p ")
            .or_else(|| line.strip_prefix("P "))
            .unwrap_or(line);
        parse_point(coords).map(SessionCommand::Pick)
    }
}

/// Parse `x,y` or `x y` into a point
pub fn parse_point(s: &str) -> std::result::Result<Point, String> {
    let parts: Vec<&str> = s
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 2 {
        return Err(format!("Invalid point '{}', expected X,Y", s.trim()));
    }

    let x: i32 = parts[0]
        .parse()
        .map_err(|_| format!("Invalid x coordinate: {}", parts[0]))?;
    let y: i32 = parts[1]
        .parse()
        .map_err(|_| format!("Invalid y coordinate: {}", parts[1]))?;

    Ok(Point::new(x, y))
}

/// What a handled command produced
#[derive(Debug)]
pub enum SessionEvent {
    PointAdded { count: usize },
    Reset,
    Listed(Vec<Point>),
    Warped(RgbaImage),
    Quit,
}

/// Pick-then-warp loop over a single source image.
///
/// Owns its point collector; points survive a successful warp so the same
/// quadrilateral can be re-applied, and are only cleared by an explicit reset.
pub struct WarpSession<'a> {
    image: &'a RgbaImage,
    collector: PointCollector,
    target: TargetSize,
    interpolation: Interpolation,
}

impl<'a> WarpSession<'a> {
    pub fn new(image: &'a RgbaImage, target: TargetSize, interpolation: Interpolation) -> Self {
        Self {
            image,
            collector: PointCollector::new(),
            target,
            interpolation,
        }
    }

    pub fn collector(&self) -> &PointCollector {
        &self.collector
    }

    pub fn handle(&mut self, command: SessionCommand) -> crate::error::Result<SessionEvent> {
        match command {
            SessionCommand::Pick(point) => {
                let count = self.collector.add_point(point)?;
                Ok(SessionEvent::PointAdded { count })
            }
            SessionCommand::Reset => {
                self.collector.reset();
                Ok(SessionEvent::Reset)
            }
            SessionCommand::List => Ok(SessionEvent::Listed(self.collector.points().to_vec())),
            SessionCommand::Warp => warp_perspective(
                self.image,
                self.collector.points(),
                self.target,
                self.interpolation,
            )
            .map(SessionEvent::Warped),
            SessionCommand::Quit => Ok(SessionEvent::Quit),
        }
    }

    /// Read commands line by line until `quit` or end of input.
    ///
    /// Every warped image is handed to `on_warp`. Unparseable lines and
    /// recoverable errors are reported and the loop continues. Returns the
    /// number of warps produced.
    pub fn run<R, F>(&mut self, input: R, mut on_warp: F) -> Result<usize>
    where
        R: BufRead,
        F: FnMut(&RgbaImage) -> Result<()>,
    {
        let mut warps = 0;

        for line in input.lines() {
            let line = line.context("Failed to read session input")?;
            if line.trim().is_empty() {
                continue;
            }

            let command = match line.parse::<SessionCommand>() {
                Ok(command) => command,
                Err(msg) => {
                    eprintln!("{} (commands: x,y | w | r | l | q)", msg);
                    continue;
                }
            };

            match self.handle(command) {
                Ok(SessionEvent::PointAdded { count }) => {
                    eprintln!("Point added ({}/4)", count);
                }
                Ok(SessionEvent::Reset) => eprintln!("Points reset"),
                Ok(SessionEvent::Listed(points)) => {
                    for (i, p) in points.iter().enumerate() {
                        eprintln!("  {}: ({}, {})", i + 1, p.x, p.y);
                    }
                }
                Ok(SessionEvent::Warped(warped)) => {
                    warps += 1;
                    on_warp(&warped)?;
                }
                Ok(SessionEvent::Quit) => break,
                Err(err @ VisionError::CapacityExceeded { .. }) => {
                    warn!("{}", err);
                    eprintln!("Already have 4 points. Enter 'r' to reset.");
                }
                Err(err @ VisionError::InsufficientPoints { .. }) => {
                    warn!("{}", err);
                    eprintln!("Need 4 points to warp. Currently: {}", self.collector.count());
                }
                Err(err) => {
                    warn!("{}", err);
                    eprintln!("Error during warp: {}", err);
                }
            }
        }

        info!(warps, "Warp session finished");
        Ok(warps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::io::Cursor;

    #[test]
    fn test_parse_commands() {
        let parse = |s: &str| s.parse::<SessionCommand>();
        assert_eq!(parse("w"), Ok(SessionCommand::Warp));
        assert_eq!(parse(" Reset "), Ok(SessionCommand::Reset));
        assert_eq!(parse("q"), Ok(SessionCommand::Quit));
        assert_eq!(parse("12,34"), Ok(SessionCommand::Pick(Point::new(12, 34))));
        assert_eq!(parse("p 5 6"), Ok(SessionCommand::Pick(Point::new(5, 6))));
        assert!(parse("hello").is_err());
        assert!(parse("1,2,3").is_err());
    }

    #[test]
    fn test_session_warps_and_keeps_points() {
        let img = RgbaImage::from_pixel(100, 100, Rgba([1, 2, 3, 255]));
        let target = TargetSize::new(40, 30).unwrap();
        let mut session = WarpSession::new(&img, target, Interpolation::Bilinear);

        let input = Cursor::new("w\n10,10\n90,12\n8,88\n92,90\n95,95\nw\nw\nq\n20,20\n");
        let mut sizes = Vec::new();
        let warps = session
            .run(input, |warped| {
                sizes.push(warped.dimensions());
                Ok(())
            })
            .unwrap();

        assert_eq!(warps, 2);
        assert_eq!(sizes, vec![(40, 30), (40, 30)]);
        // Fifth pick rejected, lines after quit ignored
        assert_eq!(session.collector().count(), 4);
    }

    #[test]
    fn test_reset_then_insufficient() {
        let img = RgbaImage::new(10, 10);
        let mut session = WarpSession::new(&img, TargetSize::default(), Interpolation::Bilinear);
        session.handle(SessionCommand::Pick(Point::new(1, 1))).unwrap();
        session.handle(SessionCommand::Reset).unwrap();
        assert_eq!(session.collector().count(), 0);

        let err = session.handle(SessionCommand::Warp).unwrap_err();
        assert!(matches!(err, VisionError::InsufficientPoints { have: 0 }));
    }
}
