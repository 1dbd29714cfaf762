use super::ConvertError;
use crate::buffer::{NodeTag, StyledBuffer};
use crate::style::color_to_rgb;
use std::fmt::Write;

/// Rich text (RTF) with a font table and a colour table built from the runs' styles.
pub fn to_rich_text(buffer: &StyledBuffer) -> Result<String, ConvertError> {
    let mut fonts: Vec<&str> = Vec::new();
    let mut colors: Vec<(u8, u8, u8)> = Vec::new();
    for run in buffer.runs() {
        if !fonts.contains(&run.style.font_family.as_str()) {
            fonts.push(&run.style.font_family);
        }
        for rgb in [run.style.color, run.style.background.unwrap_or_default()]
            .into_iter()
            .filter_map(color_to_rgb)
        {
            if !colors.contains(&rgb) {
                colors.push(rgb);
            }
        }
    }

    let mut out = String::new();
    out.push_str("{\\rtf1\\ansi\\ansicpg1252\\deff0\n{\\fonttbl");
    for (i, family) in fonts.iter().enumerate() {
        write!(out, "{{\\f{i}\\fnil {};}}", escape(family))?;
    }
    out.push_str("}\n{\\colortbl;");
    for (r, g, b) in &colors {
        write!(out, "\\red{r}\\green{g}\\blue{b};")?;
    }
    out.push_str("}\n");

    let color_index = |rgb: Option<(u8, u8, u8)>| {
        rgb.and_then(|rgb| colors.iter().position(|c| *c == rgb))
            .map(|i| i + 1)
    };

    for run in buffer.runs() {
        let style = &run.style;
        let font = fonts
            .iter()
            .position(|f| *f == style.font_family)
            .unwrap_or(0);
        write!(out, "{{\\f{font}\\fs{}", (style.font_size * 2.0).round() as i64)?;
        if style.is_bold() {
            out.push_str("\\b");
        }
        if style.is_italic() {
            out.push_str("\\i");
        }
        if style.underline {
            out.push_str("\\ul");
        }
        if let Some(i) = color_index(color_to_rgb(style.color)) {
            write!(out, "\\cf{i}")?;
        }
        if let Some(i) = color_index(style.background.and_then(color_to_rgb)) {
            write!(out, "\\cb{i}")?;
        }
        out.push(' ');

        let hard_break = run.node() == Some(NodeTag::LineBreak { hard: true });
        for ch in run.display_text().chars() {
            match ch {
                '\n' if hard_break => out.push_str("\\line "),
                '\n' => out.push_str("\\par\n"),
                _ => push_escaped_char(&mut out, ch),
            }
        }
        out.push('}');
    }
    out.push_str("}\n");
    Ok(out)
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        push_escaped_char(&mut out, ch);
    }
    out
}

fn push_escaped_char(out: &mut String, ch: char) {
    match ch {
        '\\' => out.push_str("\\\\"),
        '{' => out.push_str("\\{"),
        '}' => out.push_str("\\}"),
        '\t' => out.push_str("\\tab "),
        c if c.is_ascii() => out.push(c),
        c => {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{}?", *unit as i16));
            }
        }
    }
}
