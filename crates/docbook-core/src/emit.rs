use crate::element::{Content, ContentModel, Element};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EmitOptions {
    /// Lay block content out one element per line with 2-space indentation.
    /// When false the tree is written without any inserted whitespace.
    pub indent: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self { indent: true }
    }
}

/// Serializes `element` and its subtree.
pub fn emit_xml(element: &Element, options: &EmitOptions) -> String {
    // Deterministic formatting: sorted attributes, 2-space indentation and LF newlines.
    let mut writer = XmlWriter::new(options.indent);
    emit_element(&mut writer, element);
    writer.finish()
}

/// Serializes only the children of `element`, as fragments.
pub fn emit_children(element: &Element, options: &EmitOptions) -> String {
    let mut writer = XmlWriter::new(options.indent);
    for child in &element.children {
        match child {
            Content::Element(child) => emit_element(&mut writer, child),
            Content::Text(text) => writer.line(&escape_xml(text)),
        }
    }
    writer.finish()
}

struct XmlWriter {
    out: String,
    indent: usize,
    pretty: bool,
}

impl XmlWriter {
    fn new(pretty: bool) -> Self {
        Self {
            out: String::new(),
            indent: 0,
            pretty,
        }
    }

    fn line(&mut self, line: &str) {
        if !self.pretty {
            self.out.push_str(line);
            return;
        }
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(line);
        self.out.push('\n');
    }

    fn finish(mut self) -> String {
        if self.out.ends_with('\n') {
            self.out.pop();
        }
        self.out
    }
}

fn emit_element(writer: &mut XmlWriter, element: &Element) {
    if element.children.is_empty() {
        writer.line(&empty_tag(element));
        return;
    }

    let one_line = !writer.pretty
        || match element.rule().content {
            ContentModel::Inline | ContentModel::Empty => true,
            ContentModel::Mixed => element.has_only_inline_children(),
            ContentModel::Block => false,
        };
    if one_line {
        let mut out = String::new();
        render_inline(element, &mut out);
        writer.line(&out);
        return;
    }

    writer.line(&open_tag(element));
    writer.indent += 1;
    for child in &element.children {
        match child {
            Content::Element(child) => emit_element(writer, child),
            Content::Text(text) => {
                // Stray text between blocks of mixed content; its surrounding
                // whitespace carries no meaning there.
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    writer.line(&escape_xml(trimmed));
                }
            }
        }
    }
    writer.indent -= 1;
    writer.line(&format!("</{}>", element.tag));
}

fn render_inline(element: &Element, out: &mut String) {
    if element.children.is_empty() {
        out.push_str(&empty_tag(element));
        return;
    }
    out.push_str(&open_tag(element));
    for child in &element.children {
        match child {
            Content::Text(text) => out.push_str(&escape_xml(text)),
            Content::Element(child) => render_inline(child, out),
        }
    }
    out.push_str("</");
    out.push_str(&element.tag);
    out.push('>');
}

fn open_tag(element: &Element) -> String {
    format!("<{}{}>", element.tag, attrs(element))
}

fn empty_tag(element: &Element) -> String {
    format!("<{}{}/>", element.tag, attrs(element))
}

fn attrs(element: &Element) -> String {
    let mut out = String::new();
    for (key, value) in &element.attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_xml(value));
        out.push('"');
    }
    out
}

/// Escapes the five XML-special characters. Used for text and attribute values alike.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(text: &str) -> Element {
        let mut para = Element::new("para");
        para.append_text(text).unwrap();
        para
    }

    #[test]
    fn escapes_all_five_specials() {
        assert_eq!(
            escape_xml(r#"a & b < c > d " e ' f"#),
            "a &amp; b &lt; c &gt; d &quot; e &apos; f"
        );
    }

    #[test]
    fn block_content_is_indented_and_inline_content_is_not() {
        let mut section = Element::new("section");
        let mut title = Element::new("title");
        title.append_text("Intro").unwrap();
        section.append_child(title).unwrap();
        let mut p = para("Hello ");
        p.append_child(Element::new("emphasis").with_attr("role", "strong"))
            .unwrap();
        section.append_child(p).unwrap();

        let xml = emit_xml(&section, &EmitOptions::default());
        assert_eq!(
            xml,
            "<section>\n  <title>Intro</title>\n  <para>Hello <emphasis role=\"strong\"/></para>\n</section>"
        );
    }

    #[test]
    fn compact_output_has_no_inserted_whitespace() {
        let mut note = Element::new("note");
        note.append_child(para("x")).unwrap();
        let xml = emit_xml(&note, &EmitOptions { indent: false });
        assert_eq!(xml, "<note><para>x</para></note>");
    }

    #[test]
    fn verbatim_text_is_kept_exactly() {
        let mut listing = Element::new("programlisting");
        listing.append_text("fn main() {\n    println!(\"hi\");\n}\n").unwrap();
        let xml = emit_xml(&listing, &EmitOptions::default());
        assert_eq!(
            xml,
            "<programlisting>fn main() {\n    println!(&quot;hi&quot;);\n}\n</programlisting>"
        );
    }
}
