// ============================================================================
// pdf-overlay CLI: headless inspection and scripted editing of one page
// ============================================================================
//
// Usage examples:
//   pdf-overlay inspect report.pdf --page 2 --json
//   pdf-overlay inspect report.pdf --zoom 1.5 --raster page.png
//   pdf-overlay edit report.pdf --replace text-3="Q4 totals" --delete text-7
//   pdf-overlay edit report.pdf --add-text 120,80,"Approved" --shape arrow:10,10,200,90

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use regex::Regex;
use simplelog::LevelFilter;

use pdf_overlay::overlay::{ElementId, Point, ShapeKind};

#[derive(Parser, Debug)]
#[command(
    name = "pdf-overlay",
    version,
    about = "Inspect and edit the text overlay of a rendered PDF page"
)]
pub struct CliArgs {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log file location
    #[arg(long, global = true, default_value = "pdf-overlay.log", value_name = "FILE")]
    pub log_file: PathBuf,

    /// Log level: off, error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "debug", value_name = "LEVEL")]
    pub log_level: LevelFilter,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Render a page and print its overlay
    Inspect {
        file: PathBuf,

        #[command(flatten)]
        view: ViewArgs,

        /// Save the rendered page as PNG
        #[arg(long, value_name = "OUT.png")]
        raster: Option<PathBuf>,

        /// Print the overlay snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply overlay edits to a page and write the edit manifest
    Edit {
        file: PathBuf,

        #[command(flatten)]
        view: ViewArgs,

        /// Place free text: X,Y,TEXT
        #[arg(long = "add-text", value_name = "X,Y,TEXT")]
        add_text: Vec<TextPlacement>,

        /// Draw a shape: [KIND:]X1,Y1,X2,Y2 (kind defaults to the configured one)
        #[arg(long = "shape", value_name = "[KIND:]X1,Y1,X2,Y2")]
        shapes: Vec<ShapeSpec>,

        /// Replace a run's text: ID=TEXT
        #[arg(long = "replace", value_name = "ID=TEXT")]
        replace: Vec<Replacement>,

        /// Drag an element to a new top-left corner: ID=X,Y
        #[arg(long = "move", value_name = "ID=X,Y")]
        moves: Vec<MoveSpec>,

        /// Clear a run's text
        #[arg(long = "delete", value_name = "ID")]
        delete: Vec<String>,

        /// Output path (defaults to `<name>-edited.json` next to the input)
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug, Clone, Copy)]
pub struct ViewArgs {
    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Zoom factor (1.0 = fit width)
    #[arg(long)]
    pub zoom: Option<f32>,
}

static TEXT_PLACEMENT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*,(.*)$").ok());

static SHAPE_SPEC: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:([A-Za-z]+)\s*:)?\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*$",
    )
    .ok()
});

static MOVE_SPEC: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^\s*([^=\s]+)\s*=\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*$").ok()
});

fn captures<'a>(re: &LazyLock<Option<Regex>>, s: &'a str) -> Result<regex::Captures<'a>> {
    let re = re
        .as_ref()
        .ok_or_else(|| anyhow!("argument pattern failed to compile"))?;
    re.captures(s)
        .ok_or_else(|| anyhow!("malformed argument '{s}'"))
}

fn number(caps: &regex::Captures<'_>, index: usize) -> Result<f32> {
    let raw = caps
        .get(index)
        .map(|m| m.as_str())
        .ok_or_else(|| anyhow!("missing coordinate"))?;
    raw.parse()
        .with_context(|| format!("invalid coordinate '{raw}'"))
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextPlacement {
    pub at: Point,
    pub text: String,
}

impl FromStr for TextPlacement {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let caps = captures(&TEXT_PLACEMENT, s)?;
        let text = caps.get(3).map_or("", |m| m.as_str()).to_string();
        if text.trim().is_empty() {
            bail!("text for '{s}' is empty");
        }
        Ok(Self {
            at: Point::new(number(&caps, 1)?, number(&caps, 2)?),
            text,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeSpec {
    pub kind: Option<ShapeKind>,
    pub start: Point,
    pub end: Point,
}

impl FromStr for ShapeSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let caps = captures(&SHAPE_SPEC, s)?;
        let kind = caps
            .get(1)
            .map(|m| m.as_str().parse::<ShapeKind>().map_err(|e| anyhow!(e)))
            .transpose()?;
        Ok(Self {
            kind,
            start: Point::new(number(&caps, 2)?, number(&caps, 3)?),
            end: Point::new(number(&caps, 4)?, number(&caps, 5)?),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    pub id: ElementId,
    pub text: String,
}

impl FromStr for Replacement {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (id, text) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected ID=TEXT, got '{s}'"))?;
        let id = id.trim();
        if id.is_empty() {
            bail!("missing element id in '{s}'");
        }
        Ok(Self {
            id: ElementId::from(id),
            text: text.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveSpec {
    pub id: ElementId,
    pub to: Point,
}

impl FromStr for MoveSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let caps = captures(&MOVE_SPEC, s)?;
        Ok(Self {
            id: ElementId::from(caps.get(1).map_or("", |m| m.as_str())),
            to: Point::new(number(&caps, 2)?, number(&caps, 3)?),
        })
    }
}
