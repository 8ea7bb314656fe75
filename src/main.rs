// main.rs      gifmux command
//
// Copyright (c) 2019-2023  Douglas Lau
//
#![forbid(unsafe_code)]

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use gifmux::{ColorMap, Config, Muxer, PixelFormat};
use std::error::Error;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::str::FromStr;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Crate version
const VERSION: &'static str = std::env!("CARGO_PKG_VERSION");

/// Main entry point
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::builder().format_timestamp(None).init();
    let mut out = StandardStream::stdout(ColorChoice::Auto);
    let res = match create_app().get_matches().subcommand() {
        ("encode", Some(matches)) => encode(&mut out, matches),
        ("demo", Some(matches)) => demo(&mut out, matches),
        _ => unreachable!(),
    };
    if let Err(e) = &res {
        let mut red = ColorSpec::new();
        red.set_fg(Some(Color::Red)).set_intense(true);
        out.set_color(&red)?;
        writeln!(out, "error: {}", e)?;
    }
    out.reset()?;
    res
}

/// Create clap App
fn create_app() -> App<'static, 'static> {
    App::new("gifmux")
        .version(VERSION)
        .setting(AppSettings::GlobalVersion)
        .about("Animated GIF encoder")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("encode")
                .about("Encode raw pixel files (one frame each) into a GIF")
                .arg(output_arg())
                .arg(
                    Arg::with_name("width")
                        .short("W")
                        .long("width")
                        .takes_value(true)
                        .required(true)
                        .help("frame width"),
                )
                .arg(
                    Arg::with_name("height")
                        .short("H")
                        .long("height")
                        .takes_value(true)
                        .required(true)
                        .help("frame height"),
                )
                .arg(
                    Arg::with_name("format")
                        .short("f")
                        .long("format")
                        .takes_value(true)
                        .default_value("rgb24")
                        .possible_values(&["bgr24", "rgb24", "bgra32", "rgba32"])
                        .help("pixel format"),
                )
                .arg(quality_arg())
                .arg(
                    Arg::with_name("delay")
                        .short("d")
                        .long("delay")
                        .takes_value(true)
                        .default_value("10")
                        .help("frame delay (centiseconds)"),
                )
                .arg(loops_arg())
                .arg(global_arg())
                .arg(
                    Arg::with_name("frames")
                        .required(true)
                        .min_values(1)
                        .help("raw frame file(s)"),
                ),
        )
        .subcommand(
            SubCommand::with_name("demo")
                .about("Write a generated color cycling animation")
                .arg(output_arg())
                .arg(quality_arg())
                .arg(loops_arg())
                .arg(global_arg()),
        )
}

fn output_arg() -> Arg<'static, 'static> {
    Arg::with_name("output")
        .short("o")
        .long("output")
        .takes_value(true)
        .required(true)
        .help("output GIF file")
}

fn quality_arg() -> Arg<'static, 'static> {
    Arg::with_name("quality")
        .short("q")
        .long("quality")
        .takes_value(true)
        .default_value("10")
        .help("quantizer quality: 1 (best) to 30 (fastest)")
}

fn loops_arg() -> Arg<'static, 'static> {
    Arg::with_name("loops")
        .short("l")
        .long("loops")
        .takes_value(true)
        .default_value("0")
        .help("loop count (0 = forever)")
}

fn global_arg() -> Arg<'static, 'static> {
    Arg::with_name("global")
        .short("g")
        .long("global")
        .help("use one global color map for all frames")
}

/// Parse a required (or defaulted) argument value
fn value<T>(matches: &ArgMatches, name: &str) -> Result<T, Box<dyn Error>>
where
    T: FromStr,
    T::Err: Error + 'static,
{
    let v = matches
        .value_of(name)
        .ok_or_else(|| format!("missing {}", name))?;
    Ok(v.parse::<T>()?)
}

/// Build config from common arguments
fn config(matches: &ArgMatches, width: u16, height: u16)
    -> Result<Config, Box<dyn Error>>
{
    let color_map = if matches.is_present("global") {
        ColorMap::Global
    } else {
        ColorMap::Local
    };
    Ok(Config::new(width, height)
        .with_quality(value(matches, "quality")?)
        .with_loop_count(value(matches, "loops")?)
        .with_color_map(color_map))
}

/// Handle encode subcommand
fn encode(out: &mut StandardStream, matches: &ArgMatches)
    -> Result<(), Box<dyn Error>>
{
    let width: u16 = value(matches, "width")?;
    let height: u16 = value(matches, "height")?;
    let format: PixelFormat = value(matches, "format")?;
    let delay: u16 = value(matches, "delay")?;
    let path = matches.value_of_os("output").ok_or("missing output")?;
    let config = config(matches, width, height)?
        .with_prealloc_hint(gifmux::canonical_bytes(width, height));
    let mut mux: Muxer<BufWriter<File>> = Muxer::new();
    mux.open(path, &config)?;
    let files = matches.values_of_os("frames").ok_or("missing frames")?;
    for file in files {
        let pixels = fs::read(file)?;
        mux.push(format, &pixels, width, height, delay)?;
    }
    let n_frames = mux.frame_count();
    mux.close()?;
    summary(out, &path.to_string_lossy(), &config, n_frames)
}

/// Handle demo subcommand
fn demo(out: &mut StandardStream, matches: &ArgMatches)
    -> Result<(), Box<dyn Error>>
{
    const SIZE: u16 = 64;
    const STEPS: usize = 16;
    let path = matches.value_of_os("output").ok_or("missing output")?;
    let config = config(matches, SIZE, SIZE)?;
    let mut mux: Muxer<BufWriter<File>> = Muxer::new();
    mux.open(path, &config)?;
    for step in 0..STEPS {
        let pixels = demo_frame(SIZE, step * 256 / STEPS);
        mux.push(PixelFormat::Rgb24, &pixels, SIZE, SIZE, 8)?;
    }
    mux.close()?;
    summary(out, &path.to_string_lossy(), &config, STEPS)
}

/// Render one demo frame: a hue gradient shifted by `phase`
fn demo_frame(size: u16, phase: usize) -> Vec<u8> {
    let size = usize::from(size);
    let mut pixels = Vec::with_capacity(size * size * 3);
    for y in 0..size {
        for x in 0..size {
            let h = (x * 256 / size + phase) % 256;
            let v = 128 + y * 127 / size;
            pixels.push((h * v / 255) as u8);
            pixels.push(((255 - h) * v / 255) as u8);
            pixels.push((y * 255 / size) as u8);
        }
    }
    pixels
}

/// Print a summary of an encoded file
fn summary(out: &mut StandardStream, path: &str, config: &Config,
    n_frames: usize) -> Result<(), Box<dyn Error>>
{
    let mut magenta = ColorSpec::new();
    magenta.set_fg(Some(Color::Magenta));
    let mut bold = ColorSpec::new();
    bold.set_fg(Some(Color::White))
        .set_intense(true)
        .set_bold(true);
    let mut yellow = ColorSpec::new();
    yellow.set_fg(Some(Color::Yellow)).set_intense(true);
    out.set_color(&magenta)?;
    writeln!(out, "{}", path)?;
    out.set_color(&bold)?;
    write!(out, "GIF89a {}x{}, frames: {}", config.width(), config.height(),
        n_frames)?;
    write!(out, ", repeat: ")?;
    if config.loop_count() == 0 {
        writeln!(out, "∞")?;
    } else {
        writeln!(out, "{}", config.loop_count())?;
    }
    out.set_color(&yellow)?;
    writeln!(out, " {:?} color map, quality {}", config.color_map(),
        config.quality())?;
    Ok(())
}
