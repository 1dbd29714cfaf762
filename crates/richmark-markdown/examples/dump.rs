use richmark_core::convert::{to_plain_text, to_portable_markup_with, to_rich_text};
use richmark_markdown::{MarkdownSession, ParseOptions, StyleConfig};
use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Plain,
    Html,
    Rtf,
    Layout,
}

fn main() -> io::Result<()> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_help();
        return Ok(());
    }

    let mut format = Format::Plain;
    let mut width: Option<f32> = None;
    let mut base_url: Option<String> = None;
    let mut config = StyleConfig::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--format" => {
                let v = parse_string(&args, &mut i, "--format")?;
                format = match v.as_str() {
                    "plain" => Format::Plain,
                    "html" => Format::Html,
                    "rtf" => Format::Rtf,
                    "layout" => Format::Layout,
                    other => {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidInput,
                            format!("unknown format: {other}"),
                        ));
                    }
                };
            }
            "--width" => {
                width = Some(parse_f32(&args, &mut i, "--width")?);
            }
            "--base-url" => {
                base_url = Some(parse_string(&args, &mut i, "--base-url")?);
            }
            "--config" => {
                let path = parse_string(&args, &mut i, "--config")?;
                config = StyleConfig::load(Path::new(&path)).map_err(io::Error::other)?;
            }
            _ => break,
        }
    }

    let input = if i < args.len() {
        let path = &args[i];
        let input = fs::read_to_string(path)?;
        if base_url.is_none()
            && let Some(parent) = Path::new(path).parent()
        {
            let abs = fs::canonicalize(parent).unwrap_or_else(|_| parent.to_path_buf());
            base_url = Some(format!("{}/", abs.display()));
        }
        input
    } else {
        let mut s = String::new();
        io::stdin().read_to_string(&mut s)?;
        s
    };

    let config = Arc::new(config);
    let mut session =
        MarkdownSession::new(config.clone()).with_parse_options(ParseOptions { base_url });
    session.set_markdown(&input);

    match format {
        Format::Plain => println!("{}", to_plain_text(session.buffer())),
        Format::Html => println!(
            "{}",
            to_portable_markup_with(session.buffer(), &config.decoration_options())
        ),
        Format::Rtf => {
            let rtf = to_rich_text(session.buffer()).map_err(io::Error::other)?;
            println!("{rtf}");
        }
        Format::Layout => {
            let text = session.buffer().text();
            let geometry = session.layout(width);
            for line in &geometry.lines {
                let r = line.rect;
                println!(
                    "{:>8.1} {:>8.1} {:>8.1} {:>6.1}  {:?}",
                    r.x,
                    r.y,
                    r.width,
                    r.height,
                    text.get(line.range.clone()).unwrap_or_default()
                );
            }
            let decorations = session.decorations(width);
            for region in &decorations.regions {
                println!("{:?} {:?}", region.kind, region.rect);
            }
            println!("required height: {:.1}", decorations.required_height);
        }
    }

    Ok(())
}

fn print_help() {
    eprintln!(
        "Usage: dump [options] [path]\n\
\n\
Options:\n\
  --format <plain|html|rtf|layout>  Output format (default: plain)\n\
  --width <n>                       Wrap width in points for --format layout\n\
  --base-url <url>                  Resolve relative links/images against this base\n\
  --config <path>                   Style configuration (TOML)\n\
  -h, --help                        Show this help\n\
\n\
If [path] is omitted, reads Markdown from stdin."
    );
}

fn parse_f32(args: &[String], i: &mut usize, flag: &str) -> io::Result<f32> {
    let v = parse_string(args, i, flag)?;
    v.parse::<f32>().map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{flag} invalid number: {e}"),
        )
    })
}

fn parse_string(args: &[String], i: &mut usize, flag: &str) -> io::Result<String> {
    let Some(v) = args.get(*i + 1) else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{flag} expects a value"),
        ));
    };
    *i += 2;
    Ok(v.to_string())
}
