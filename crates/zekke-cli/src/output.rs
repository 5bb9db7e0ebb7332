//! Text and JSON rendering for command results.

use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;
use zekke_lib::{Place, Route};

/// Output format selected with `--format`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON document.
    Json,
}

#[derive(Serialize)]
struct RouteView<'a> {
    distance: f64,
    hops: usize,
    path: &'a [Place],
}

pub fn render_route<W: Write>(out: &mut W, route: &Route, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Json => write_json(
            out,
            &RouteView {
                distance: route.distance(),
                hops: route.hop_count(),
                path: route.path(),
            },
        ),
        OutputFormat::Text => {
            writeln!(
                out,
                "Route: {:.2} m in {} hop{}",
                route.distance(),
                route.hop_count(),
                if route.hop_count() == 1 { "" } else { "s" }
            )?;
            for (index, place) in route.path().iter().enumerate() {
                writeln!(out, "{:>3}. {}", index + 1, place_line(place))?;
            }
            Ok(())
        }
    }
}

pub fn render_place<W: Write>(out: &mut W, place: &Place, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Json => write_json(out, place),
        OutputFormat::Text => writeln!(out, "{}", place_line(place)),
    }
}

pub fn render_places<W: Write>(
    out: &mut W,
    places: &[Place],
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => write_json(out, &places),
        OutputFormat::Text => {
            for place in places {
                writeln!(out, "{}", place_line(place))?;
            }
            Ok(())
        }
    }
}

/// Names from an area search. Text output notes an empty result.
pub fn render_names<W: Write>(out: &mut W, names: &[String], format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Json => write_json(out, &names),
        OutputFormat::Text if names.is_empty() => writeln!(out, "No matching places."),
        OutputFormat::Text => {
            for name in names {
                writeln!(out, "{name}")?;
            }
            Ok(())
        }
    }
}

fn place_line(place: &Place) -> String {
    format!("{} [{}] {}", place.name(), place.id(), place.position())
}

fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}
