use crate::buffer::StyledBuffer;

/// Rendered text with styling dropped; attachments become their alt text or expression.
pub fn to_plain_text(buffer: &StyledBuffer) -> String {
    let mut out = String::with_capacity(buffer.len());
    for run in buffer.runs() {
        out.push_str(run.display_text());
    }
    out
}
