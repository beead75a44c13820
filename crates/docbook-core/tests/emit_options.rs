use docbook_core::{ConvertOptions, EmitOptions, NodeKind, SourceNode, convert_document};

fn sample() -> SourceNode {
    let title = SourceNode::with_children(NodeKind::Title, vec![SourceNode::text("Pictures")]);
    let image = SourceNode::new(NodeKind::Image {
        uri: "a\"b&c.png".into(),
        alt: Some("it's <here>".into()),
        align: Some("bottom".into()),
        scale: Some("50".into()),
    });
    let section = SourceNode::with_children(NodeKind::Section { level: 1, id: None }, vec![title, image]);
    SourceNode::with_children(NodeKind::Document, vec![section])
}

#[test]
fn pretty_output_indents_block_content() {
    let result = convert_document(&sample(), &ConvertOptions::default()).unwrap();
    let expected = "<section>\n  <title>Pictures</title>\n  <mediaobject>\n    <imageobject>\n      <imagedata fileref=\"a&quot;b&amp;c.png\" scale=\"50\" valign=\"bottom\"/>\n    </imageobject>\n    <textobject><phrase>it&apos;s &lt;here&gt;</phrase></textobject>\n  </mediaobject>\n</section>\n";
    assert!(result.xml.ends_with(expected), "unexpected output:\n{}", result.xml);
}

#[test]
fn compact_output_inserts_no_whitespace() {
    let options = ConvertOptions {
        emit: EmitOptions { indent: false },
        ..ConvertOptions::default()
    };
    let result = convert_document(&sample(), &options).unwrap();
    let expected = "<section><title>Pictures</title><mediaobject><imageobject><imagedata fileref=\"a&quot;b&amp;c.png\" scale=\"50\" valign=\"bottom\"/></imageobject><textobject><phrase>it&apos;s &lt;here&gt;</phrase></textobject></mediaobject></section>\n";
    assert!(result.xml.ends_with(expected), "unexpected output:\n{}", result.xml);
}
